//! Rule evaluation.
//!
//! [`evaluate_field`] runs a field's rules in declaration order and stops at
//! the first failure. Every built-in rule is synchronous; only a `custom`
//! rule with an async predicate suspends, in which case the remaining rules
//! run after it resolves and the caller gets [`Outcome::Pending`].

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::LazyLock;
use std::task::Context;
use std::task::Poll;

use futures::FutureExt;
use regex::Regex;

use crate::error::extract_panic_message;
use crate::rule::BoxFuture;
use crate::rule::Predicate;
use crate::rule::PredicateResult;
use crate::rule::Rule;
use crate::value::Value;
use crate::value::Values;
use crate::value::get_path;

static EMAIL_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex pattern"));

/// Returns `true` if `s` looks like `local@domain.tld`.
pub fn is_email_shaped(s: &str) -> bool {
    EMAIL_SHAPE.is_match(s)
}

/// Settled result of evaluating a field's rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Every rule passed.
    Valid,
    /// The first failing rule's message.
    Invalid(String),
}

impl Verdict {
    /// The failure message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Valid => None,
            Self::Invalid(msg) => Some(msg),
        }
    }
}

/// Result of [`evaluate_field`].
#[derive(Debug)]
pub enum Outcome {
    /// Every rule passed.
    Valid,
    /// The first failing rule's message.
    Invalid(String),
    /// An async rule is running; await the handle for the verdict.
    Pending(PendingValidation),
}

impl Outcome {
    /// Returns `true` if the outcome still has to resolve.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Waits for the verdict, resolving a pending outcome if necessary.
    pub async fn settle(self) -> Verdict {
        match self {
            Self::Valid => Verdict::Valid,
            Self::Invalid(msg) => Verdict::Invalid(msg),
            Self::Pending(pending) => pending.await,
        }
    }
}

impl From<Verdict> for Outcome {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Valid => Self::Valid,
            Verdict::Invalid(msg) => Self::Invalid(msg),
        }
    }
}

/// Handle to an evaluation suspended on an async `custom` rule.
///
/// Resolves to the verdict of the whole rule sequence, not only of the
/// suspended rule.
pub struct PendingValidation {
    future: BoxFuture<'static, Verdict>,
}

impl PendingValidation {
    fn new(future: impl Future<Output = Verdict> + Send + 'static) -> Self {
        Self {
            future: Box::pin(future),
        }
    }
}

impl Future for PendingValidation {
    type Output = Verdict;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Verdict> {
        self.future.as_mut().poll(cx)
    }
}

impl std::fmt::Debug for PendingValidation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingValidation").finish_non_exhaustive()
    }
}

enum Check {
    Pass,
    Fail(String),
    Suspend(BoxFuture<'static, Option<String>>),
}

/// Evaluates `rules` against `candidate`.
///
/// `siblings` is the value snapshot `confirm` and `custom` rules read from.
/// Rules run strictly in the given order and the first failure wins; later
/// rules are never evaluated.
///
/// # Example
///
/// ```
/// use formaflex::{Outcome, Rule, Value, Values, evaluate_field};
///
/// let rules = [Rule::required(), Rule::min_length(6)];
/// let outcome = evaluate_field(&rules, &Value::from("ab"), &Values::new());
/// assert!(matches!(outcome, Outcome::Invalid(msg) if msg == "Min length 6"));
/// ```
pub fn evaluate_field(rules: &[Rule], candidate: &Value, siblings: &Values) -> Outcome {
    for (index, rule) in rules.iter().enumerate() {
        match check(rule, candidate, siblings) {
            Check::Pass => {}
            Check::Fail(msg) => return Outcome::Invalid(msg),
            Check::Suspend(suspended) => {
                let rest = rules[index + 1..].to_vec();
                let candidate = candidate.clone();
                let siblings = siblings.clone();
                return Outcome::Pending(PendingValidation::new(async move {
                    if let Some(msg) = suspended.await {
                        return Verdict::Invalid(msg);
                    }
                    settle_remaining(rest, candidate, siblings).await
                }));
            }
        }
    }
    Outcome::Valid
}

/// Evaluates `rules` and waits for any async rule to resolve.
pub async fn resolve_field(rules: &[Rule], candidate: &Value, siblings: &Values) -> Verdict {
    evaluate_field(rules, candidate, siblings).settle().await
}

async fn settle_remaining(rules: Vec<Rule>, candidate: Value, siblings: Values) -> Verdict {
    for rule in &rules {
        match check(rule, &candidate, &siblings) {
            Check::Pass => {}
            Check::Fail(msg) => return Verdict::Invalid(msg),
            Check::Suspend(suspended) => {
                if let Some(msg) = suspended.await {
                    return Verdict::Invalid(msg);
                }
            }
        }
    }
    Verdict::Valid
}

fn check(rule: &Rule, candidate: &Value, siblings: &Values) -> Check {
    let passed = match rule {
        Rule::Required { .. } => !candidate.is_blank(),
        Rule::Email { .. } => {
            candidate.is_empty() || candidate.as_str().is_some_and(is_email_shaped)
        }
        Rule::MinLength { length, .. } => {
            candidate.is_empty() || candidate.len().is_none_or(|len| len >= *length)
        }
        Rule::Confirm { field, .. } => {
            get_path(siblings, field).unwrap_or(&Value::Null) == candidate
        }
        Rule::Custom {
            predicate: Predicate::Sync(f),
            ..
        } => {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| f(candidate, siblings)))
                .unwrap_or_else(|panic| Err(extract_panic_message(&*panic).into()));
            predicate_passed(result)
        }
        Rule::Custom {
            predicate: Predicate::Async(f),
            ..
        } => {
            let message = rule.failure_message();
            let started = std::panic::catch_unwind(AssertUnwindSafe(|| {
                f(candidate.clone(), siblings.clone())
            }));
            return Check::Suspend(Box::pin(async move {
                let result = match started {
                    Ok(fut) => AssertUnwindSafe(fut)
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|panic| Err(extract_panic_message(&*panic).into())),
                    Err(panic) => Err(extract_panic_message(&*panic).into()),
                };
                if predicate_passed(result) {
                    None
                } else {
                    Some(message)
                }
            }));
        }
    };

    if passed {
        Check::Pass
    } else {
        Check::Fail(rule.failure_message())
    }
}

fn predicate_passed(result: PredicateResult) -> bool {
    match result {
        Ok(passed) => passed,
        Err(e) => {
            log::warn!("Custom validator faulted: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::values;

    fn verdict(rules: &[Rule], candidate: impl Into<Value>) -> Outcome {
        evaluate_field(rules, &candidate.into(), &Values::new())
    }

    fn message(outcome: Outcome) -> Option<String> {
        match outcome {
            Outcome::Valid => None,
            Outcome::Invalid(msg) => Some(msg),
            Outcome::Pending(_) => panic!("unexpected pending outcome"),
        }
    }

    #[test]
    fn test_email_shape() {
        assert!(is_email_shaped("jane@example.com"));
        assert!(is_email_shaped("a@b.c"));
        assert!(!is_email_shaped("jane@example"));
        assert!(!is_email_shaped("ja ne@example.com"));
        assert!(!is_email_shaped("jane@@example.com"));
        assert!(!is_email_shaped("@example.com"));
    }

    #[test]
    fn test_required_trims() {
        let rules = [Rule::required()];
        assert_eq!(message(verdict(&rules, "  ")), Some("Required".into()));
        assert_eq!(message(verdict(&rules, Value::Null)), Some("Required".into()));
        assert_eq!(message(verdict(&rules, "x")), None);
    }

    #[test]
    fn test_empty_value_skips_email_and_min_length() {
        let rules = [Rule::email(), Rule::min_length(3)];
        assert_eq!(message(verdict(&rules, "")), None);
    }

    #[test]
    fn test_first_failure_wins() {
        let rules = [
            Rule::required().with_message("Email is required"),
            Rule::email().with_message("Please enter a valid email"),
        ];
        assert_eq!(
            message(verdict(&rules, "")),
            Some("Email is required".into())
        );
        assert_eq!(
            message(verdict(&rules, "nope")),
            Some("Please enter a valid email".into())
        );
    }

    #[test]
    fn test_min_length_default_message() {
        let rules = [Rule::min_length(6)];
        assert_eq!(message(verdict(&rules, "ab")), Some("Min length 6".into()));
        assert_eq!(message(verdict(&rules, "abcdef")), None);
    }

    #[test]
    fn test_confirm_reads_snapshot() {
        let rules = [Rule::confirm("password")];
        let snapshot = values([("password", "Secret1")]);

        let outcome = evaluate_field(&rules, &Value::from("Secret2"), &snapshot);
        assert_eq!(message(outcome), Some("Fields must match".into()));

        let outcome = evaluate_field(&rules, &Value::from("Secret1"), &snapshot);
        assert_eq!(message(outcome), None);
    }

    #[test]
    fn test_sync_predicate_panic_is_invalid() {
        let rules = [Rule::custom(Predicate::new(|_| panic!("boom"))).with_message("Broken")];
        assert_eq!(message(verdict(&rules, "x")), Some("Broken".into()));
    }

    #[test]
    fn test_sync_predicate_error_is_invalid() {
        let rules = [Rule::custom(Predicate::fallible(|_, _| {
            Err::<bool, _>(std::io::Error::other("offline"))
        }))];
        assert_eq!(message(verdict(&rules, "x")), Some("Invalid value".into()));
    }

    #[test]
    fn test_later_rules_not_evaluated() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let rules = [
            Rule::required(),
            Rule::custom(Predicate::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            })),
        ];

        let _ = verdict(&rules, "");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_async_rule_is_pending() {
        let rules = [
            Rule::required(),
            Rule::custom(Predicate::from_async(|_| async { false })).with_message("Taken"),
            Rule::min_length(100),
        ];

        let outcome = verdict(&rules, "bob");
        assert!(outcome.is_pending());
        assert_eq!(
            futures::executor::block_on(outcome.settle()),
            Verdict::Invalid("Taken".into())
        );
    }

    #[test]
    fn test_rules_after_async_run_once_it_passes() {
        let rules = [
            Rule::custom(Predicate::from_async(|_| async { true })),
            Rule::min_length(100),
        ];

        let verdict = futures::executor::block_on(resolve_field(
            &rules,
            &Value::from("bob"),
            &Values::new(),
        ));
        assert_eq!(verdict, Verdict::Invalid("Min length 100".into()));
    }

    #[test]
    fn test_async_predicate_panic_is_invalid() {
        let rules = [Rule::custom(Predicate::from_async(|value: Value| async move {
            assert!(value.is_null(), "rejected");
            true
        }))];

        let verdict = futures::executor::block_on(resolve_field(
            &rules,
            &Value::from("x"),
            &Values::new(),
        ));
        assert_eq!(verdict, Verdict::Invalid("Invalid value".into()));
    }
}
