//! Validation timing options.

use std::time::Duration;

use serde::Deserialize;

/// When a form re-validates its fields.
///
/// Deserializes from the camelCase option objects used by rule documents,
/// with `debounce` given in milliseconds.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use formaflex::ValidationOptions;
///
/// let options = ValidationOptions::on_change().with_debounce(Duration::from_millis(300));
/// assert!(options.validate_on_change);
/// assert_eq!(options.debounce, Duration::from_millis(300));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationOptions {
    /// Re-run a field's rules after every `set_field`.
    ///
    /// Default: off. Fields stay untouched until an explicit sweep.
    pub validate_on_change: bool,

    /// Wait this long after the last edit of a field before validating it.
    ///
    /// Default: zero (validate immediately).
    #[serde(with = "millis")]
    pub debounce: Duration,

    /// Let `blur_field` re-validate a field.
    ///
    /// Default: off.
    pub validate_on_blur: bool,
}

impl ValidationOptions {
    /// Creates options with everything off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options that validate on every change.
    pub fn on_change() -> Self {
        Self {
            validate_on_change: true,
            ..Default::default()
        }
    }

    /// Sets whether fields validate on change.
    pub fn with_validate_on_change(mut self, enabled: bool) -> Self {
        self.validate_on_change = enabled;
        self
    }

    /// Sets the debounce delay.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Sets whether `blur_field` validates.
    pub fn with_validate_on_blur(mut self, enabled: bool) -> Self {
        self.validate_on_blur = enabled;
        self
    }

    /// Returns `true` if edits wait before validating.
    pub fn is_debounced(&self) -> bool {
        !self.debounce.is_zero()
    }
}

mod millis {
    use std::time::Duration;

    use serde::Deserialize;
    use serde::Deserializer;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_off() {
        let options = ValidationOptions::default();
        assert!(!options.validate_on_change);
        assert!(!options.validate_on_blur);
        assert!(!options.is_debounced());
    }

    #[test]
    fn test_deserialize_camel_case() {
        let options: ValidationOptions =
            serde_json::from_str(r#"{ "validateOnChange": true, "debounce": 500 }"#).unwrap();

        assert_eq!(
            options,
            ValidationOptions::on_change().with_debounce(Duration::from_millis(500))
        );
    }
}
