//! Declarative rule definitions.
//!
//! Rules can be described as JSON documents of the form
//!
//! ```json
//! {
//!   "email": [
//!     { "type": "required", "message": "Email is required" },
//!     { "type": "email" }
//!   ],
//!   "username": [
//!     { "type": "custom", "validate": "usernameAvailable", "message": "Taken" }
//!   ],
//!   "confirmPassword": [{ "type": "confirm", "field": "password" }]
//! }
//! ```
//!
//! `custom` entries name a predicate that must be registered in a
//! [`PredicateTable`].

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::rule::Predicate;
use crate::rule::Rule;
use crate::rule::RuleSet;

const KNOWN_KINDS: [&str; 5] = ["required", "email", "minLength", "custom", "confirm"];

/// Named predicates available to `custom` rule definitions.
#[derive(Debug, Clone, Default)]
pub struct PredicateTable {
    predicates: HashMap<String, Predicate>,
}

impl PredicateTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a predicate under `name`.
    pub fn register(mut self, name: impl Into<String>, predicate: Predicate) -> Self {
        self.insert(name, predicate);
        self
    }

    /// Registers a predicate under `name` in place.
    pub fn insert(&mut self, name: impl Into<String>, predicate: Predicate) {
        self.predicates.insert(name.into(), predicate);
    }

    /// Looks up a predicate by name.
    pub fn get(&self, name: &str) -> Option<&Predicate> {
        self.predicates.get(name)
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum RuleDefinition {
    Required {
        message: Option<String>,
    },
    Email {
        message: Option<String>,
    },
    MinLength {
        length: usize,
        message: Option<String>,
    },
    Custom {
        validate: String,
        message: Option<String>,
    },
    Confirm {
        field: String,
        message: Option<String>,
    },
}

impl RuleSet {
    /// Builds a rule set from a JSON rule document.
    ///
    /// Rule order within each field is preserved.
    pub fn from_json(
        json: &serde_json::Value,
        predicates: &PredicateTable,
    ) -> Result<Self, ConfigError> {
        let fields = json.as_object().ok_or_else(|| {
            ConfigError::InvalidDefinition("expected an object of field rules".into())
        })?;

        let mut rules = RuleSet::new();
        for (field, entries) in fields {
            let entries = entries.as_array().ok_or_else(|| {
                ConfigError::InvalidDefinition(format!("rules for '{}' must be an array", field))
            })?;
            let parsed = entries
                .iter()
                .map(|entry| parse_rule(field, entry, predicates))
                .collect::<Result<Vec<_>, _>>()?;
            rules.insert(field.clone(), parsed);
        }
        Ok(rules)
    }

    /// Builds a rule set from a JSON rule document in text form.
    pub fn from_json_str(json: &str, predicates: &PredicateTable) -> Result<Self, ConfigError> {
        let document: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| ConfigError::InvalidDefinition(e.to_string()))?;
        Self::from_json(&document, predicates)
    }
}

fn parse_rule(
    field: &str,
    entry: &serde_json::Value,
    predicates: &PredicateTable,
) -> Result<Rule, ConfigError> {
    let kind = entry
        .get("type")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| ConfigError::MissingRuleKind {
            field: field.to_string(),
        })?;

    if !KNOWN_KINDS.contains(&kind) {
        return Err(ConfigError::UnknownRuleKind {
            field: field.to_string(),
            kind: kind.to_string(),
        });
    }

    let definition: RuleDefinition =
        serde_json::from_value(entry.clone()).map_err(|source| ConfigError::InvalidRule {
            field: field.to_string(),
            source,
        })?;

    let rule = match definition {
        RuleDefinition::Required { message } => Rule::Required { message },
        RuleDefinition::Email { message } => Rule::Email { message },
        RuleDefinition::MinLength { length, message } => Rule::MinLength { length, message },
        RuleDefinition::Custom { validate, message } => {
            let predicate =
                predicates
                    .get(&validate)
                    .cloned()
                    .ok_or_else(|| ConfigError::UnknownPredicate {
                        field: field.to_string(),
                        name: validate.clone(),
                    })?;
            Rule::Custom { predicate, message }
        }
        RuleDefinition::Confirm { field, message } => Rule::Confirm { field, message },
    };
    Ok(rule)
}
