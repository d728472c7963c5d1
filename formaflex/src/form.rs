//! State of a single form instance.

use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use tokio::task::AbortHandle;

use crate::engine::Outcome;
use crate::engine::PendingValidation;
use crate::engine::Verdict;
use crate::engine::evaluate_field;
use crate::error::ConfigError;
use crate::field::FieldStatus;
use crate::field::FieldTracker;
use crate::options::ValidationOptions;
use crate::result::Errors;
use crate::result::FormResult;
use crate::rule::Rule;
use crate::rule::RuleSet;
use crate::value::Value;
use crate::value::Values;
use crate::value::get_path;
use crate::value::set_path;

static NEXT_EPOCH: AtomicU64 = AtomicU64::new(1);

/// An evaluation that suspended on an async rule.
///
/// Carries everything needed to apply its verdict later, provided the
/// record and the field generation are still the ones it started from.
#[derive(Debug)]
pub(crate) struct PendingJob {
    pub(crate) epoch: u64,
    pub(crate) key: String,
    pub(crate) generation: u64,
    pub(crate) validation: PendingValidation,
}

/// A field's rules and inputs, taken out of the record so predicates run
/// while the record is not locked.
pub(crate) struct FieldCheck {
    key: String,
    generation: u64,
    rules: Vec<Rule>,
    candidate: Value,
    siblings: Values,
}

impl FieldCheck {
    pub(crate) fn run(&self) -> Outcome {
        evaluate_field(&self.rules, &self.candidate, &self.siblings)
    }
}

/// Values, rules, options and per-field state of one form.
#[derive(Debug)]
pub(crate) struct FormRecord {
    epoch: u64,
    values: Values,
    rules: RuleSet,
    options: ValidationOptions,
    fields: HashMap<String, FieldTracker>,
}

impl FormRecord {
    pub(crate) fn new(
        values: Values,
        rules: RuleSet,
        options: ValidationOptions,
    ) -> Result<Self, ConfigError> {
        rules.check_targets(&values)?;
        Ok(Self {
            epoch: NEXT_EPOCH.fetch_add(1, Ordering::Relaxed),
            values,
            rules,
            options,
            fields: HashMap::new(),
        })
    }

    /// Identifies this incarnation; a re-initialized form gets a new one.
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn values(&self) -> &Values {
        &self.values
    }

    pub(crate) fn options(&self) -> &ValidationOptions {
        &self.options
    }

    pub(crate) fn field_value(&self, key: &str) -> Option<&Value> {
        get_path(&self.values, key)
    }

    pub(crate) fn status(&self, key: &str) -> FieldStatus {
        self.fields
            .get(key)
            .map(|field| field.status.clone())
            .unwrap_or_default()
    }

    pub(crate) fn generation(&self, key: &str) -> u64 {
        self.fields.get(key).map_or(0, FieldTracker::generation)
    }

    pub(crate) fn errors(&self) -> Errors {
        self.fields
            .iter()
            .filter_map(|(key, field)| match &field.status {
                FieldStatus::Untouched => None,
                FieldStatus::Validating | FieldStatus::Valid => Some((key.clone(), None)),
                FieldStatus::Invalid(msg) => Some((key.clone(), Some(msg.clone()))),
            })
            .collect()
    }

    pub(crate) fn error(&self, key: &str) -> Option<String> {
        self.status(key).error().map(str::to_string)
    }

    /// No field failed and none is still validating.
    pub(crate) fn is_valid(&self) -> bool {
        self.fields
            .values()
            .all(|field| matches!(field.status, FieldStatus::Untouched | FieldStatus::Valid))
    }

    /// Stores a value and starts a new generation for the field.
    pub(crate) fn write(&mut self, key: &str, value: Value) -> u64 {
        set_path(&mut self.values, key, value);
        self.touch(key)
    }

    /// Starts a new generation, superseding in-flight work for the field.
    pub(crate) fn touch(&mut self, key: &str) -> u64 {
        self.fields.entry(key.to_string()).or_default().bump()
    }

    /// Keeps a debounce timer for `generation`, or aborts it if stale.
    pub(crate) fn arm_timer(&mut self, key: &str, generation: u64, timer: AbortHandle) {
        match self.fields.get_mut(key) {
            Some(field) if field.generation() == generation => field.arm(timer),
            _ => timer.abort(),
        }
    }

    /// Claims a fired debounce timer; `false` if it was superseded.
    pub(crate) fn claim_timer(&mut self, key: &str, generation: u64) -> bool {
        match self.fields.get_mut(key) {
            Some(field) if field.generation() == generation => {
                field.disarm();
                true
            }
            _ => false,
        }
    }

    /// Marks a field as waiting on its debounce timer.
    pub(crate) fn mark_validating(&mut self, key: &str) {
        if self.rules.has_rules(key) {
            self.fields.entry(key.to_string()).or_default().status = FieldStatus::Validating;
        }
    }

    /// Drops a `Validating` status left behind by a superseded evaluation.
    ///
    /// Used when a write is not followed by any evaluation of its own.
    pub(crate) fn clear_validating(&mut self, key: &str) {
        let stuck = self.fields.get_mut(key).filter(|field| field.status.is_validating());
        if let Some(field) = stuck {
            field.status = FieldStatus::Untouched;
        }
    }

    /// Takes out what evaluating the field needs, at its current generation.
    ///
    /// Fields without rules yield nothing and stay untouched, so error keys
    /// remain a subset of rule keys.
    pub(crate) fn prepare(&self, key: &str) -> Option<FieldCheck> {
        let rules = self.rules.get(key);
        if rules.is_empty() {
            return None;
        }

        Some(FieldCheck {
            key: key.to_string(),
            generation: self.generation(key),
            rules: rules.to_vec(),
            candidate: get_path(&self.values, key).cloned().unwrap_or_default(),
            siblings: self.values.clone(),
        })
    }

    /// Records the outcome of a check unless the field moved on meanwhile.
    ///
    /// Returns the job still to drive when an async rule suspended.
    pub(crate) fn apply(&mut self, check: FieldCheck, outcome: Outcome) -> Option<PendingJob> {
        let FieldCheck { key, generation, .. } = check;
        if self.generation(&key) != generation {
            log::debug!(
                "Discarding stale evaluation of '{}' (generation {})",
                key,
                generation
            );
            return None;
        }

        let field = self.fields.entry(key.clone()).or_default();
        match outcome {
            Outcome::Valid => {
                field.status = FieldStatus::Valid;
                None
            }
            Outcome::Invalid(msg) => {
                field.status = FieldStatus::Invalid(msg);
                None
            }
            Outcome::Pending(validation) => {
                field.status = FieldStatus::Validating;
                Some(PendingJob {
                    epoch: self.epoch,
                    key,
                    generation,
                    validation,
                })
            }
        }
    }

    /// Applies an async verdict if its generation is still current.
    pub(crate) fn settle(&mut self, key: &str, generation: u64, verdict: Verdict) -> bool {
        match self.fields.get_mut(key) {
            Some(field) if field.generation() == generation => {
                field.status = verdict.into();
                true
            }
            _ => {
                log::debug!(
                    "Discarding stale validation of '{}' (generation {})",
                    key,
                    generation
                );
                false
            }
        }
    }

    /// Prepares checks for every ruled field from scratch.
    ///
    /// Every ruled field starts a new generation, so older in-flight results
    /// and debounce timers can no longer overwrite the sweep.
    pub(crate) fn sweep(&mut self) -> Vec<FieldCheck> {
        let keys: Vec<String> = self.rules.keys().map(str::to_string).collect();
        for key in &keys {
            self.touch(key);
        }
        keys.iter().filter_map(|key| self.prepare(key)).collect()
    }

    /// Classifies the current field states.
    pub(crate) fn result(&self) -> FormResult {
        let mut validating: Vec<String> = Vec::new();
        let mut failed = false;
        for (key, field) in &self.fields {
            match field.status {
                FieldStatus::Invalid(_) => failed = true,
                FieldStatus::Validating => validating.push(key.clone()),
                FieldStatus::Untouched | FieldStatus::Valid => {}
            }
        }

        if failed {
            FormResult::Failure(self.errors())
        } else if !validating.is_empty() {
            validating.sort();
            FormResult::Pending(validating)
        } else {
            FormResult::Success(self.values.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Predicate;
    use crate::value::values;

    fn evaluate(form: &mut FormRecord, key: &str) -> Option<PendingJob> {
        let check = form.prepare(key)?;
        let outcome = check.run();
        form.apply(check, outcome)
    }

    fn sweep(form: &mut FormRecord) -> Vec<PendingJob> {
        form.sweep()
            .into_iter()
            .filter_map(|check| {
                let outcome = check.run();
                form.apply(check, outcome)
            })
            .collect()
    }

    fn signup() -> FormRecord {
        FormRecord::new(
            values([("email", ""), ("nickname", "")]),
            RuleSet::new().field("email", [Rule::required(), Rule::email()]),
            ValidationOptions::on_change(),
        )
        .unwrap()
    }

    #[test]
    fn test_unruled_field_never_errors() {
        let mut form = signup();
        form.write("nickname", Value::from(""));

        assert!(form.prepare("nickname").is_none());
        assert!(form.errors().is_empty());
        assert_eq!(form.status("nickname"), FieldStatus::Untouched);
    }

    #[test]
    fn test_write_bumps_generation() {
        let mut form = signup();
        assert_eq!(form.write("email", Value::from("a")), 1);
        assert_eq!(form.write("email", Value::from("ab")), 2);
        assert_eq!(form.generation("email"), 2);
        assert_eq!(form.generation("nickname"), 0);
    }

    #[test]
    fn test_stale_settle_is_discarded() {
        let mut form = FormRecord::new(
            values([("name", "")]),
            RuleSet::new().field(
                "name",
                [Rule::custom(Predicate::from_async(|_| async { true }))],
            ),
            ValidationOptions::on_change(),
        )
        .unwrap();

        form.write("name", Value::from("v1"));
        let job = evaluate(&mut form, "name").unwrap();
        form.write("name", Value::from("v2"));

        assert!(!form.settle(&job.key, job.generation, Verdict::Invalid("late".into())));
        assert_eq!(form.error("name"), None);
    }

    #[test]
    fn test_sweep_validates_untouched_fields() {
        let mut form = signup();
        assert!(sweep(&mut form).is_empty());

        assert_eq!(form.error("email"), Some("Required".into()));
        assert!(form.result().is_failure());
        assert!(!form.is_valid());
    }

    #[test]
    fn test_outcome_for_superseded_generation_is_dropped() {
        let mut form = signup();
        form.write("email", Value::from("nope"));
        let check = form.prepare("email").unwrap();
        let outcome = check.run();
        form.write("email", Value::from("jane@example.com"));

        assert!(form.apply(check, outcome).is_none());
        assert_eq!(form.status("email"), FieldStatus::Untouched);
    }

    #[test]
    fn test_clear_validating_only_resets_pending_fields() {
        let mut form = signup();
        form.mark_validating("email");
        form.clear_validating("email");
        assert_eq!(form.status("email"), FieldStatus::Untouched);

        form.write("email", Value::from("nope"));
        evaluate(&mut form, "email");
        form.clear_validating("email");
        assert_eq!(form.error("email"), Some("Invalid email".into()));
    }
}
