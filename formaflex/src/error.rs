//! Configuration errors and predicate fault helpers.

use std::any::Any;

use thiserror::Error;

/// Errors raised while setting up a form or its rules.
///
/// Validation failures are never reported through this type; they surface
/// as per-field messages instead.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A rule definition names a kind this crate does not know.
    #[error("Unknown rule kind '{kind}' for field '{field}'")]
    UnknownRuleKind {
        /// Field the rule belongs to.
        field: String,
        /// The unrecognized `type` value.
        kind: String,
    },

    /// A rule definition has no `type` entry.
    #[error("Rule for field '{field}' has no 'type'")]
    MissingRuleKind {
        /// Field the rule belongs to.
        field: String,
    },

    /// A `custom` rule definition names a predicate that was never registered.
    #[error("Unknown predicate '{name}' referenced by field '{field}'")]
    UnknownPredicate {
        /// Field the rule belongs to.
        field: String,
        /// Predicate name from the definition.
        name: String,
    },

    /// A `confirm` rule points at a field the form knows nothing about.
    #[error("Field '{field}' must match '{target}', which has no value or rules")]
    UnknownConfirmTarget {
        /// Field carrying the confirm rule.
        field: String,
        /// The sibling it should match.
        target: String,
    },

    /// A rule definition of a known kind is malformed.
    #[error("Invalid rule for field '{field}': {source}")]
    InvalidRule {
        /// Field the rule belongs to.
        field: String,
        /// Underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },

    /// The rule document as a whole has the wrong shape.
    #[error("Invalid rule definition: {0}")]
    InvalidDefinition(String),
}

/// Extract a human-readable message from a panic payload.
///
/// Panics can contain either `&str` or `String` payloads. This function
/// attempts to extract either, falling back to a generic message.
pub fn extract_panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
