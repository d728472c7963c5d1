//! Whole-form validation results.

use std::collections::BTreeMap;

use crate::value::Values;

/// Error snapshot of a form: field key to message, `None` when the field
/// passed. Fields that were never validated are absent.
pub type Errors = BTreeMap<String, Option<String>>;

/// Result of validating a whole form.
#[derive(Debug, Clone, PartialEq)]
pub enum FormResult {
    /// Every field passed; carries the values that were validated.
    Success(Values),
    /// At least one field failed; carries the error snapshot.
    Failure(Errors),
    /// No field failed, but these fields still wait on async rules.
    Pending(Vec<String>),
}

impl FormResult {
    /// Check if all fields passed validation.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Check if any field failed validation.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Check if the result is still waiting on async rules.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// The validated values, on success.
    pub fn values(&self) -> Option<&Values> {
        match self {
            Self::Success(values) => Some(values),
            _ => None,
        }
    }

    /// The error snapshot, on failure.
    pub fn errors(&self) -> Option<&Errors> {
        match self {
            Self::Failure(errors) => Some(errors),
            _ => None,
        }
    }

    /// The first failing field and its message (in key order).
    pub fn first_error(&self) -> Option<(&str, &str)> {
        self.errors()?
            .iter()
            .find_map(|(key, msg)| msg.as_deref().map(|msg| (key.as_str(), msg)))
    }
}
