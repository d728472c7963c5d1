//! Shared registry of named forms.

use std::sync::Arc;

use dashmap::DashMap;

use crate::driver;
use crate::driver::FormHost;
use crate::error::ConfigError;
use crate::field::FieldStatus;
use crate::form::FormRecord;
use crate::options::ValidationOptions;
use crate::result::Errors;
use crate::result::FormResult;
use crate::rule::RuleSet;
use crate::subscription::Subscribers;
use crate::subscription::Subscription;
use crate::value::Value;
use crate::value::Values;

/// Registry of named forms with a single change channel.
///
/// The registry is a cheap-to-clone handle; clones share the same forms and
/// subscribers. Create one per application (or per test) and pass it to
/// whatever needs it.
///
/// Every operation on an unknown form id is a no-op or returns an empty
/// result, so consumers may come and go in any order.
///
/// Each form lives behind its own map shard lock; subscribers are always
/// called after that lock is released.
///
/// # Example
///
/// ```
/// use formaflex::{FormRegistry, Rule, RuleSet, ValidationOptions, values};
///
/// let registry = FormRegistry::new();
/// registry
///     .initialize_form(
///         "demo",
///         values([("email", "")]),
///         RuleSet::new().field("email", [Rule::required(), Rule::email()]),
///         ValidationOptions::on_change(),
///     )
///     .unwrap();
///
/// registry.set_field("demo", "email", "not-an-email");
/// assert_eq!(registry.get_error("demo", "email").as_deref(), Some("Invalid email"));
/// assert!(!registry.is_valid("demo"));
/// ```
#[derive(Clone, Default)]
pub struct FormRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    forms: DashMap<String, FormRecord>,
    subscribers: Arc<Subscribers>,
}

/// One registry form, as seen by the scheduler.
#[derive(Clone)]
struct RegisteredForm {
    registry: FormRegistry,
    form_id: Arc<str>,
}

impl FormHost for RegisteredForm {
    fn with_record<R>(&self, epoch: u64, f: impl FnOnce(&mut FormRecord) -> R) -> Option<R> {
        let mut entry = self.registry.inner.forms.get_mut(&*self.form_id)?;
        if entry.epoch() != epoch {
            log::debug!(
                "Form '{}' was re-initialized; dropping work for the old instance",
                self.form_id
            );
            return None;
        }
        Some(f(entry.value_mut()))
    }

    fn publish(&self) {
        self.registry.notify();
    }
}

impl FormRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces a form.
    ///
    /// Replacing discards the old form's timers and in-flight validations.
    /// Subscribers are notified once.
    pub fn initialize_form(
        &self,
        form_id: impl Into<String>,
        initial: Values,
        rules: RuleSet,
        options: ValidationOptions,
    ) -> Result<(), ConfigError> {
        let form_id = form_id.into();
        let record = FormRecord::new(initial, rules, options)?;
        let replaced = self.inner.forms.insert(form_id.clone(), record);
        if replaced.is_some() {
            log::debug!("Re-initialized form '{}'", form_id);
        } else {
            log::debug!("Initialized form '{}'", form_id);
        }
        drop(replaced);
        self.notify();
        Ok(())
    }

    /// Removes a form. Returns `false` (and stays silent) if it did not exist.
    pub fn remove_form(&self, form_id: &str) -> bool {
        let removed = self.inner.forms.remove(form_id).is_some();
        if removed {
            log::debug!("Removed form '{}'", form_id);
            self.notify();
        }
        removed
    }

    /// Returns `true` if the form exists.
    pub fn contains_form(&self, form_id: &str) -> bool {
        self.inner.forms.contains_key(form_id)
    }

    /// Ids of all registered forms, sorted.
    pub fn form_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .inner
            .forms
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Sets a field value and validates it according to the form's options.
    ///
    /// `key` may be a dotted path into nested records. Unknown forms are
    /// ignored without notifying anyone.
    pub fn set_field(&self, form_id: &str, key: &str, value: impl Into<Value>) {
        let value = value.into();
        let written = self.inner.forms.get_mut(form_id).map(|mut record| {
            let generation = record.write(key, value);
            (record.epoch(), generation, record.options().clone())
        });
        let Some((epoch, generation, options)) = written else {
            log::trace!("set_field on unknown form '{}' ignored", form_id);
            return;
        };

        let host = self.host(form_id);
        driver::field_written(&host, epoch, key, generation, &options);
        self.notify();
    }

    /// Validates one field immediately, regardless of the form's options.
    pub fn validate_field(&self, form_id: &str, key: &str) {
        let Some(epoch) = self.inner.forms.get_mut(form_id).map(|mut record| {
            record.touch(key);
            record.epoch()
        }) else {
            return;
        };

        driver::validate_now(&self.host(form_id), epoch, key);
        self.notify();
    }

    /// Validates one field if the form has `validate_on_blur` set.
    pub fn blur_field(&self, form_id: &str, key: &str) {
        let on_blur = self
            .inner
            .forms
            .get(form_id)
            .is_some_and(|record| record.options().validate_on_blur);
        if on_blur {
            self.validate_field(form_id, key);
        }
    }

    /// Validates every ruled field of a form.
    ///
    /// Async rules keep running in the background; if any are outstanding
    /// and nothing failed yet, the result is [`FormResult::Pending`]. An
    /// unknown form validates vacuously.
    pub fn validate_form(&self, form_id: &str) -> FormResult {
        let Some(epoch) = self.epoch(form_id) else {
            return FormResult::Success(Values::new());
        };
        let result = driver::sweep(&self.host(form_id), epoch);
        self.notify();
        result.unwrap_or_else(|| FormResult::Success(Values::new()))
    }

    /// Validates every ruled field of a form, waiting for async rules.
    pub async fn validate_form_async(&self, form_id: &str) -> FormResult {
        let Some(epoch) = self.epoch(form_id) else {
            return FormResult::Success(Values::new());
        };
        let result = driver::sweep_settled(&self.host(form_id), epoch).await;
        self.notify();
        result.unwrap_or_else(|| FormResult::Success(Values::new()))
    }

    /// Snapshot of a form's values; empty for unknown forms.
    pub fn get_values(&self, form_id: &str) -> Values {
        self.inner
            .forms
            .get(form_id)
            .map(|record| record.values().clone())
            .unwrap_or_default()
    }

    /// One value of a form, following dotted paths.
    pub fn get_value(&self, form_id: &str, key: &str) -> Option<Value> {
        self.inner
            .forms
            .get(form_id)
            .and_then(|record| record.field_value(key).cloned())
    }

    /// Snapshot of a form's errors; empty for unknown forms.
    pub fn get_errors(&self, form_id: &str) -> Errors {
        self.inner
            .forms
            .get(form_id)
            .map(|record| record.errors())
            .unwrap_or_default()
    }

    /// The current error message of one field.
    pub fn get_error(&self, form_id: &str, key: &str) -> Option<String> {
        self.inner
            .forms
            .get(form_id)
            .and_then(|record| record.error(key))
    }

    /// Validation state of one field.
    pub fn field_status(&self, form_id: &str, key: &str) -> FieldStatus {
        self.inner
            .forms
            .get(form_id)
            .map(|record| record.status(key))
            .unwrap_or_default()
    }

    /// `true` iff no field has an error or is still validating.
    ///
    /// Unknown forms are vacuously valid.
    pub fn is_valid(&self, form_id: &str) -> bool {
        self.inner
            .forms
            .get(form_id)
            .is_none_or(|record| record.is_valid())
    }

    /// Registers a callback for changes to any form.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.subscribers.add(Arc::new(callback));
        Subscription::new(id, &self.inner.subscribers)
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    fn epoch(&self, form_id: &str) -> Option<u64> {
        self.inner.forms.get(form_id).map(|record| record.epoch())
    }

    fn host(&self, form_id: &str) -> RegisteredForm {
        RegisteredForm {
            registry: self.clone(),
            form_id: Arc::from(form_id),
        }
    }

    fn notify(&self) {
        self.inner.subscribers.notify();
    }
}

impl std::fmt::Debug for FormRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormRegistry")
            .field("forms", &self.form_ids())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
