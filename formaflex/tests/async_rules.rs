//! Tests for debounced and asynchronous validation ordering.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use formaflex::prelude::*;
use tokio::time::sleep;

/// Async availability check: `slow` values take long and are rejected.
fn availability(slow: &'static str) -> Rule {
    Rule::custom(Predicate::from_async(move |value: Value| async move {
        let is_slow = value.as_str() == Some(slow);
        let delay = if is_slow { 500 } else { 10 };
        sleep(Duration::from_millis(delay)).await;
        !is_slow
    }))
    .with_message("Username not available")
}

fn username_form(registry: &FormRegistry, rules: Vec<Rule>, options: ValidationOptions) {
    registry
        .initialize_form(
            "signup",
            values([("username", "")]),
            RuleSet::new().field("username", rules),
            options,
        )
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_async_rule_marks_field_validating() {
    let registry = FormRegistry::new();
    username_form(&registry, vec![availability("v1")], ValidationOptions::on_change());

    registry.set_field("signup", "username", "v1");
    assert_eq!(
        registry.field_status("signup", "username"),
        FieldStatus::Validating
    );
    assert!(!registry.is_valid("signup"));

    sleep(Duration::from_millis(600)).await;
    assert_eq!(
        registry.get_error("signup", "username").as_deref(),
        Some("Username not available")
    );
}

#[tokio::test(start_paused = true)]
async fn test_stale_async_result_is_discarded() {
    let registry = FormRegistry::new();
    username_form(&registry, vec![availability("v1")], ValidationOptions::on_change());

    registry.set_field("signup", "username", "v1");
    registry.set_field("signup", "username", "v2");

    sleep(Duration::from_millis(50)).await;
    assert_eq!(registry.field_status("signup", "username"), FieldStatus::Valid);

    // v1 resolves (as invalid) long after v2 and must not overwrite it.
    sleep(Duration::from_millis(1000)).await;
    assert_eq!(registry.field_status("signup", "username"), FieldStatus::Valid);
    assert!(registry.is_valid("signup"));
}

#[tokio::test(start_paused = true)]
async fn test_stale_result_never_makes_form_valid_early() {
    let registry = FormRegistry::new();
    username_form(&registry, vec![availability("v2")], ValidationOptions::on_change());

    registry.set_field("signup", "username", "v1");
    registry.set_field("signup", "username", "v2");

    // v1's (valid) result lands first but is stale.
    sleep(Duration::from_millis(50)).await;
    assert_eq!(
        registry.field_status("signup", "username"),
        FieldStatus::Validating
    );
    assert!(!registry.is_valid("signup"));

    sleep(Duration::from_millis(1000)).await;
    assert_eq!(
        registry.get_error("signup", "username").as_deref(),
        Some("Username not available")
    );
}

#[tokio::test(start_paused = true)]
async fn test_async_resolution_notifies_again() {
    let registry = FormRegistry::new();
    username_form(&registry, vec![availability("none")], ValidationOptions::on_change());

    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    let _subscription = registry.subscribe(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    registry.set_field("signup", "username", "bob");
    assert_eq!(count.load(Ordering::SeqCst), 1);

    sleep(Duration::from_millis(100)).await;
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unsubscribe_does_not_cancel_validation() {
    let registry = FormRegistry::new();
    username_form(&registry, vec![availability("v1")], ValidationOptions::on_change());
    let subscription = registry.subscribe(|| {});

    registry.set_field("signup", "username", "v1");
    subscription.unsubscribe();

    sleep(Duration::from_millis(600)).await;
    assert!(registry.field_status("signup", "username").is_settled());
}

#[tokio::test(start_paused = true)]
async fn test_reinitialize_drops_in_flight_results() {
    let registry = FormRegistry::new();
    username_form(&registry, vec![availability("v1")], ValidationOptions::on_change());

    registry.set_field("signup", "username", "v1");
    username_form(&registry, vec![availability("v1")], ValidationOptions::on_change());

    sleep(Duration::from_millis(600)).await;
    assert_eq!(
        registry.field_status("signup", "username"),
        FieldStatus::Untouched
    );
    assert!(registry.get_errors("signup").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rules_after_async_rule_still_run() {
    let registry = FormRegistry::new();
    username_form(
        &registry,
        vec![availability("none"), Rule::min_length(5)],
        ValidationOptions::on_change(),
    );

    registry.set_field("signup", "username", "bob");
    sleep(Duration::from_millis(100)).await;

    assert_eq!(
        registry.get_error("signup", "username").as_deref(),
        Some("Min length 5")
    );
}

#[tokio::test(start_paused = true)]
async fn test_rejected_async_predicate_is_invalid() {
    let registry = FormRegistry::new();
    let rule = Rule::custom(Predicate::fallible_async(|_, _| async {
        Err::<bool, _>(std::io::Error::other("service unavailable"))
    }))
    .with_message("Could not check username");
    username_form(&registry, vec![rule], ValidationOptions::on_change());

    registry.set_field("signup", "username", "bob");
    sleep(Duration::from_millis(10)).await;

    assert_eq!(
        registry.get_error("signup", "username").as_deref(),
        Some("Could not check username")
    );
}

#[tokio::test(start_paused = true)]
async fn test_validate_form_reports_pending() {
    let registry = FormRegistry::new();
    username_form(&registry, vec![availability("none")], ValidationOptions::new());
    registry.set_field("signup", "username", "bob");

    let result = registry.validate_form("signup");
    assert_eq!(result, FormResult::Pending(vec!["username".to_string()]));

    sleep(Duration::from_millis(100)).await;
    assert_eq!(registry.field_status("signup", "username"), FieldStatus::Valid);
}

#[tokio::test(start_paused = true)]
async fn test_validate_form_async_waits_for_rules() {
    let registry = FormRegistry::new();
    username_form(&registry, vec![availability("taken")], ValidationOptions::new());

    registry.set_field("signup", "username", "taken");
    let result = registry.validate_form_async("signup").await;
    assert_eq!(result.first_error(), Some(("username", "Username not available")));

    registry.set_field("signup", "username", "free");
    let result = registry.validate_form_async("signup").await;
    assert!(result.is_success());
}

#[tokio::test(start_paused = true)]
async fn test_registry_debounce_coalesces_edits() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let rule = Rule::custom(Predicate::new(move |value| {
        log.lock().unwrap().push(value.clone());
        true
    }));

    let registry = FormRegistry::new();
    username_form(
        &registry,
        vec![rule],
        ValidationOptions::on_change().with_debounce(Duration::from_millis(300)),
    );

    registry.set_field("signup", "username", "a");
    sleep(Duration::from_millis(100)).await;
    registry.set_field("signup", "username", "ab");
    assert_eq!(
        registry.field_status("signup", "username"),
        FieldStatus::Validating
    );

    sleep(Duration::from_millis(400)).await;
    assert_eq!(*seen.lock().unwrap(), vec![Value::from("ab")]);
    assert_eq!(registry.field_status("signup", "username"), FieldStatus::Valid);
}

#[tokio::test(start_paused = true)]
async fn test_remove_form_cancels_debounce() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let rule = Rule::custom(Predicate::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        true
    }));

    let registry = FormRegistry::new();
    username_form(
        &registry,
        vec![rule],
        ValidationOptions::on_change().with_debounce(Duration::from_millis(300)),
    );

    registry.set_field("signup", "username", "a");
    registry.remove_form("signup");

    sleep(Duration::from_millis(500)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_edit_after_pending_submit_returns_field_to_untouched() {
    let registry = FormRegistry::new();
    username_form(&registry, vec![availability("none")], ValidationOptions::new());

    registry.set_field("signup", "username", "bob");
    assert!(registry.validate_form("signup").is_pending());

    registry.set_field("signup", "username", "bobby");
    sleep(Duration::from_millis(100)).await;

    assert_eq!(
        registry.field_status("signup", "username"),
        FieldStatus::Untouched
    );
    assert!(registry.is_valid("signup"));
    assert!(!registry.validate_form("signup").is_failure());
}
