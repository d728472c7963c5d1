//! Reactive form validation store.
//!
//! FormaFlex keeps form values and per-field validation state, runs
//! declarative rules on every change, and tells observers when something
//! changed.
//!
//! - [`FormRegistry`]: named forms shared between consumers, with one
//!   subscription channel for all of them.
//! - [`FormValidator`]: a single form owned by one consumer.
//! - [`evaluate_field`]: the rule engine both are built on.
//!
//! Rules run in declaration order and the first failure wins. Only `custom`
//! rules with async predicates suspend; a per-field generation counter makes
//! sure a slow result for an old value never overwrites a newer one.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! use formaflex::prelude::*;
//!
//! let registry = FormRegistry::new();
//! let renders = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&renders);
//! let subscription = registry.subscribe(move || {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! registry
//!     .initialize_form(
//!         "demo",
//!         values([("password", "")]),
//!         RuleSet::new().field("password", [Rule::required(), Rule::min_length(6)]),
//!         ValidationOptions::on_change(),
//!     )
//!     .unwrap();
//! registry.set_field("demo", "password", "ab");
//!
//! assert_eq!(registry.get_error("demo", "password").as_deref(), Some("Min length 6"));
//! assert_eq!(renders.load(Ordering::SeqCst), 2);
//! subscription.unsubscribe();
//! ```

pub mod definition;
pub mod engine;
pub mod error;
pub mod field;
pub mod options;
pub mod registry;
pub mod result;
pub mod rule;
pub mod subscription;
pub mod validator;
pub mod value;

mod driver;
mod form;

pub use definition::PredicateTable;
pub use engine::{Outcome, PendingValidation, Verdict, evaluate_field, resolve_field};
pub use error::ConfigError;
pub use field::FieldStatus;
pub use options::ValidationOptions;
pub use registry::FormRegistry;
pub use result::{Errors, FormResult};
pub use rule::{Predicate, PredicateError, PredicateResult, Rule, RuleSet};
pub use subscription::{SubscriberId, Subscription};
pub use validator::FormValidator;
pub use value::{Value, Values, values};

pub mod prelude {
    pub use crate::definition::PredicateTable;
    pub use crate::engine::{Outcome, Verdict, evaluate_field};
    pub use crate::error::ConfigError;
    pub use crate::field::FieldStatus;
    pub use crate::options::ValidationOptions;
    pub use crate::registry::FormRegistry;
    pub use crate::result::{Errors, FormResult};
    pub use crate::rule::{Predicate, Rule, RuleSet};
    pub use crate::subscription::Subscription;
    pub use crate::validator::FormValidator;
    pub use crate::value::{Value, Values, values};
}
