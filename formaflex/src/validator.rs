//! Standalone form validator for single-owner forms.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use tokio::sync::Notify;

use crate::driver;
use crate::driver::FormHost;
use crate::error::ConfigError;
use crate::field::FieldStatus;
use crate::form::FormRecord;
use crate::options::ValidationOptions;
use crate::result::Errors;
use crate::result::FormResult;
use crate::rule::RuleSet;
use crate::value::Value;
use crate::value::Values;

/// A form owned by a single consumer, with no registry or subscribers.
///
/// The owner observes changes through [`version`](Self::version),
/// [`is_dirty`](Self::is_dirty) or [`changed`](Self::changed). Clones share
/// the same form, which lets spawned debounce timers and async rules write
/// their results back.
///
/// # Example
///
/// ```
/// use formaflex::{FormValidator, Rule, RuleSet, ValidationOptions, values};
///
/// let form = FormValidator::new(
///     values([("email", ""), ("password", "")]),
///     RuleSet::new()
///         .field("email", [Rule::required().with_message("Email is required"), Rule::email()])
///         .field("password", [Rule::required(), Rule::min_length(8)]),
///     ValidationOptions::on_change(),
/// )
/// .unwrap();
///
/// form.set_field("email", "jane@example.com");
/// let result = form.validate_form();
/// assert!(result.is_failure());
/// assert_eq!(form.error("password").as_deref(), Some("Required"));
/// ```
#[derive(Clone)]
pub struct FormValidator {
    inner: Arc<ValidatorInner>,
}

struct ValidatorInner {
    record: Mutex<FormRecord>,
    version: AtomicU64,
    dirty: AtomicBool,
    notify: Notify,
}

impl FormHost for FormValidator {
    fn with_record<R>(&self, _epoch: u64, f: impl FnOnce(&mut FormRecord) -> R) -> Option<R> {
        let mut record = self
            .inner
            .record
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Some(f(&mut record))
    }

    fn publish(&self) {
        self.inner.version.fetch_add(1, Ordering::SeqCst);
        self.inner.dirty.store(true, Ordering::SeqCst);
        self.inner.notify.notify_one();
    }
}

impl FormValidator {
    /// Create a new validator with initial values, rules and options.
    pub fn new(
        initial: Values,
        rules: RuleSet,
        options: ValidationOptions,
    ) -> Result<Self, ConfigError> {
        let record = FormRecord::new(initial, rules, options)?;
        Ok(Self {
            inner: Arc::new(ValidatorInner {
                record: Mutex::new(record),
                version: AtomicU64::new(0),
                dirty: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        })
    }

    /// Sets a field value.
    ///
    /// With `validate_on_change`, the field is validated right away or,
    /// when debounced, once edits to it pause for the debounce delay.
    pub fn set_field(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        let (epoch, generation, options) = self.record(|record| {
            let generation = record.write(key, value);
            (record.epoch(), generation, record.options().clone())
        });

        driver::field_written(self, epoch, key, generation, &options);
        self.publish();
    }

    /// Validates one field immediately, regardless of the options.
    pub fn validate_field(&self, key: &str) {
        let epoch = self.record(|record| {
            record.touch(key);
            record.epoch()
        });
        driver::validate_now(self, epoch, key);
        self.publish();
    }

    /// Validates one field if `validate_on_blur` is set.
    pub fn blur_field(&self, key: &str) {
        if self.record(|record| record.options().validate_on_blur) {
            self.validate_field(key);
        }
    }

    /// Rebuilds every error from scratch and classifies the form.
    ///
    /// Ignores debounce. Async rules keep running in the background and
    /// yield [`FormResult::Pending`] while no other field has failed; use
    /// [`validate_form_async`](Self::validate_form_async) to wait for them.
    pub fn validate_form(&self) -> FormResult {
        let epoch = self.record(|record| record.epoch());
        let result = driver::sweep(self, epoch);
        self.publish();
        result.unwrap_or_else(|| self.record(|record| record.result()))
    }

    /// Like [`validate_form`](Self::validate_form), but waits for async rules.
    pub async fn validate_form_async(&self) -> FormResult {
        let epoch = self.record(|record| record.epoch());
        let result = driver::sweep_settled(self, epoch).await;
        self.publish();
        result.unwrap_or_else(|| self.record(|record| record.result()))
    }

    /// Snapshot of all values.
    pub fn values(&self) -> Values {
        self.record(|record| record.values().clone())
    }

    /// One value, following dotted paths.
    pub fn value(&self, key: &str) -> Option<Value> {
        self.record(|record| record.field_value(key).cloned())
    }

    /// Snapshot of all errors.
    pub fn errors(&self) -> Errors {
        self.record(|record| record.errors())
    }

    /// The current error message of one field.
    pub fn error(&self, key: &str) -> Option<String> {
        self.record(|record| record.error(key))
    }

    /// Validation state of one field.
    pub fn field_status(&self, key: &str) -> FieldStatus {
        self.record(|record| record.status(key))
    }

    /// `true` iff no field has an error or is still validating.
    pub fn is_valid(&self) -> bool {
        self.record(|record| record.is_valid())
    }

    /// Counts state changes since creation.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::SeqCst)
    }

    /// Check if the state has been modified since last check
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.load(Ordering::SeqCst)
    }

    /// Clear the dirty flag
    pub fn clear_dirty(&self) {
        self.inner.dirty.store(false, Ordering::SeqCst);
    }

    /// Waits for the next state change.
    ///
    /// A change that happened since the last call completes immediately.
    pub async fn changed(&self) {
        self.inner.notify.notified().await;
    }

    fn record<R>(&self, f: impl FnOnce(&mut FormRecord) -> R) -> R {
        let mut record = self
            .inner
            .record
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut record)
    }
}

impl std::fmt::Debug for FormValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormValidator")
            .field("values", &self.values())
            .field("errors", &self.errors())
            .field("version", &self.version())
            .finish()
    }
}
