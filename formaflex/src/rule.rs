//! Validation rules and rule sets.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::value::Value;
use crate::value::Values;
use crate::value::get_path;

/// Type alias for boxed futures used in async validation.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Error a fallible custom predicate may return.
pub type PredicateError = Box<dyn std::error::Error + Send + Sync>;

/// What a custom predicate produces: pass, fail, or fault.
pub type PredicateResult = Result<bool, PredicateError>;

type SyncCheck = dyn Fn(&Value, &Values) -> PredicateResult + Send + Sync;
type AsyncCheck = dyn Fn(Value, Values) -> BoxFuture<'static, PredicateResult> + Send + Sync;

/// Message used by `required` rules without their own message.
pub const DEFAULT_REQUIRED_MESSAGE: &str = "Required";
/// Message used by `email` rules without their own message.
pub const DEFAULT_EMAIL_MESSAGE: &str = "Invalid email";
/// Message used by `custom` rules without their own message.
pub const DEFAULT_CUSTOM_MESSAGE: &str = "Invalid value";
/// Message used by `confirm` rules without their own message.
pub const DEFAULT_CONFIRM_MESSAGE: &str = "Fields must match";

/// A user-supplied check behind a `custom` rule.
///
/// Predicates receive the candidate value and a snapshot of all form values,
/// so they can implement cross-field logic. They run while the form is not
/// locked and may read the registry or validator that owns it.
#[derive(Clone)]
pub enum Predicate {
    /// Runs to completion on the calling thread.
    Sync(Arc<SyncCheck>),
    /// Suspends; the field stays `Validating` until it resolves.
    Async(Arc<AsyncCheck>),
}

impl Predicate {
    /// A synchronous check on the candidate value alone.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(move |value, _| Ok(f(value))))
    }

    /// A synchronous check that can also read sibling values.
    pub fn with_values<F>(f: F) -> Self
    where
        F: Fn(&Value, &Values) -> bool + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(move |value, values| Ok(f(value, values))))
    }

    /// A synchronous check that may fault.
    ///
    /// A fault fails the rule like a `false` result would.
    pub fn fallible<F, E>(f: F) -> Self
    where
        F: Fn(&Value, &Values) -> Result<bool, E> + Send + Sync + 'static,
        E: Into<PredicateError>,
    {
        Self::Sync(Arc::new(move |value, values| f(value, values).map_err(Into::into)))
    }

    /// An asynchronous check on the candidate value alone.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        Self::Async(Arc::new(move |value, _| {
            let fut = f(value);
            Box::pin(async move { Ok(fut.await) })
        }))
    }

    /// An asynchronous check that may fault and can read sibling values.
    pub fn fallible_async<F, Fut, E>(f: F) -> Self
    where
        F: Fn(Value, Values) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, E>> + Send + 'static,
        E: Into<PredicateError>,
    {
        Self::Async(Arc::new(move |value, values| {
            let fut = f(value, values);
            Box::pin(async move { fut.await.map_err(Into::into) })
        }))
    }

    /// Returns `true` if evaluating this predicate suspends.
    pub fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }
}

impl std::fmt::Debug for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sync(_) => write!(f, "Predicate::Sync"),
            Self::Async(_) => write!(f, "Predicate::Async"),
        }
    }
}

/// A single declarative check applied to one field's value.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Fails when the value is absent or blank.
    Required {
        /// Message override.
        message: Option<String>,
    },
    /// Fails when a non-empty value is not shaped like an email address.
    Email {
        /// Message override.
        message: Option<String>,
    },
    /// Fails when a non-empty value is shorter than `length` characters.
    MinLength {
        /// Minimum length in characters.
        length: usize,
        /// Message override.
        message: Option<String>,
    },
    /// Fails when the predicate returns `false` or faults.
    Custom {
        /// The check to run.
        predicate: Predicate,
        /// Message override.
        message: Option<String>,
    },
    /// Fails when the value differs from the sibling field `field`.
    Confirm {
        /// Key of the field to match.
        field: String,
        /// Message override.
        message: Option<String>,
    },
}

impl Rule {
    /// A `required` rule with the default message.
    pub fn required() -> Self {
        Self::Required { message: None }
    }

    /// An `email` rule with the default message.
    pub fn email() -> Self {
        Self::Email { message: None }
    }

    /// A `minLength` rule with the default message.
    pub fn min_length(length: usize) -> Self {
        Self::MinLength {
            length,
            message: None,
        }
    }

    /// A `custom` rule with the default message.
    pub fn custom(predicate: Predicate) -> Self {
        Self::Custom {
            predicate,
            message: None,
        }
    }

    /// A `confirm` rule matching the given sibling field.
    pub fn confirm(field: impl Into<String>) -> Self {
        Self::Confirm {
            field: field.into(),
            message: None,
        }
    }

    /// Replace the message reported when this rule fails.
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        let slot = match &mut self {
            Self::Required { message }
            | Self::Email { message }
            | Self::MinLength { message, .. }
            | Self::Custom { message, .. }
            | Self::Confirm { message, .. } => message,
        };
        *slot = Some(msg.into());
        self
    }

    /// The rule kind as it appears in rule definitions.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Required { .. } => "required",
            Self::Email { .. } => "email",
            Self::MinLength { .. } => "minLength",
            Self::Custom { .. } => "custom",
            Self::Confirm { .. } => "confirm",
        }
    }

    /// The custom message, if one was given.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Required { message }
            | Self::Email { message }
            | Self::MinLength { message, .. }
            | Self::Custom { message, .. }
            | Self::Confirm { message, .. } => message.as_deref(),
        }
    }

    /// The message reported when this rule fails.
    pub fn failure_message(&self) -> String {
        if let Some(message) = self.message() {
            return message.to_string();
        }
        match self {
            Self::Required { .. } => DEFAULT_REQUIRED_MESSAGE.to_string(),
            Self::Email { .. } => DEFAULT_EMAIL_MESSAGE.to_string(),
            Self::MinLength { length, .. } => format!("Min length {}", length),
            Self::Custom { .. } => DEFAULT_CUSTOM_MESSAGE.to_string(),
            Self::Confirm { .. } => DEFAULT_CONFIRM_MESSAGE.to_string(),
        }
    }
}

/// Ordered rule sequences per field key.
///
/// Keys are opaque paths: `"address.city"` matches exactly the value that
/// `set_field("address.city", ..)` writes.
///
/// # Example
///
/// ```
/// use formaflex::{Rule, RuleSet};
///
/// let rules = RuleSet::new()
///     .field("email", [Rule::required(), Rule::email()])
///     .field("password", [Rule::required(), Rule::min_length(6)]);
///
/// assert_eq!(rules.get("email").len(), 2);
/// assert!(rules.get("unknown").is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    fields: BTreeMap<String, Vec<Rule>>,
}

impl RuleSet {
    /// Creates an empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rules of a field, replacing any earlier ones.
    pub fn field(mut self, key: impl Into<String>, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.insert(key, rules);
        self
    }

    /// Sets the rules of a field in place.
    pub fn insert(&mut self, key: impl Into<String>, rules: impl IntoIterator<Item = Rule>) {
        self.fields.insert(key.into(), rules.into_iter().collect());
    }

    /// Rules for a field in declaration order; empty if the field has none.
    pub fn get(&self, key: &str) -> &[Rule] {
        self.fields.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns `true` if the field has at least one rule.
    pub fn has_rules(&self, key: &str) -> bool {
        !self.get(key).is_empty()
    }

    /// Keys that have a rule sequence.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Iterates over `(key, rules)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Rule])> {
        self.fields
            .iter()
            .map(|(key, rules)| (key.as_str(), rules.as_slice()))
    }

    /// Number of fields with a rule sequence.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if no field has rules.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Checks that every `confirm` rule points at a field the form knows.
    pub(crate) fn check_targets(&self, values: &Values) -> Result<(), ConfigError> {
        for (key, rules) in &self.fields {
            for rule in rules {
                let Rule::Confirm { field, .. } = rule else {
                    continue;
                };
                if get_path(values, field).is_none() && !self.fields.contains_key(field) {
                    return Err(ConfigError::UnknownConfirmTarget {
                        field: key.clone(),
                        target: field.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::values;

    #[test]
    fn test_default_messages() {
        assert_eq!(Rule::required().failure_message(), "Required");
        assert_eq!(Rule::email().failure_message(), "Invalid email");
        assert_eq!(Rule::min_length(6).failure_message(), "Min length 6");
        assert_eq!(
            Rule::custom(Predicate::new(|_| true)).failure_message(),
            "Invalid value"
        );
        assert_eq!(Rule::confirm("password").failure_message(), "Fields must match");
    }

    #[test]
    fn test_message_override() {
        let rule = Rule::min_length(8).with_message("Min 8 characters");
        assert_eq!(rule.failure_message(), "Min 8 characters");
        assert_eq!(rule.kind(), "minLength");
    }

    #[test]
    fn test_confirm_target_must_exist() {
        let rules = RuleSet::new().field("confirmPassword", [Rule::confirm("password")]);

        let err = rules
            .check_targets(&values([("confirmPassword", "")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownConfirmTarget { .. }));

        assert!(
            rules
                .check_targets(&values([("password", ""), ("confirmPassword", "")]))
                .is_ok()
        );
    }
}
