//! Form definitions used by the demo.

use std::time::Duration;

use formaflex::prelude::*;

/// Usernames the simulated backend already knows about.
const TAKEN_USERNAMES: &[&str] = &["admin", "root"];

/// Email addresses the simulated backend already knows about.
const REGISTERED_EMAILS: &[&str] = &["taken@example.com"];

/// Rule document of the login-style `demo` form.
const DEMO_RULES: &str = r#"{
    "email": [
        { "type": "required", "message": "Email is required" },
        { "type": "email", "message": "Please enter a valid email" }
    ],
    "password": [
        { "type": "required", "message": "Password is required" },
        { "type": "minLength", "length": 6, "message": "Password must be at least 6 characters" }
    ],
    "confirmPassword": [
        { "type": "required", "message": "Please confirm your password" }
    ]
}"#;

/// Registers the `demo` form on `registry`, rules loaded from JSON.
pub fn register_demo(registry: &FormRegistry) -> Result<(), ConfigError> {
    let rules = RuleSet::from_json_str(DEMO_RULES, &PredicateTable::new())?;
    registry.initialize_form(
        "demo",
        values([("email", ""), ("password", ""), ("confirmPassword", "")]),
        rules,
        ValidationOptions::on_change(),
    )
}

/// Builds the registration form with async availability checks.
pub fn registration() -> Result<FormValidator, ConfigError> {
    let rules = RuleSet::new()
        .field(
            "username",
            [
                Rule::required().with_message("Username is required"),
                Rule::min_length(3).with_message("Min 3 characters"),
                Rule::custom(Predicate::from_async(username_available))
                    .with_message("Username not available"),
            ],
        )
        .field(
            "email",
            [
                Rule::required().with_message("Email is required"),
                Rule::email().with_message("Invalid email format"),
                Rule::custom(Predicate::from_async(email_unregistered))
                    .with_message("Email already registered"),
            ],
        )
        .field(
            "password",
            [
                Rule::required().with_message("Password is required"),
                Rule::min_length(8).with_message("Min 8 characters"),
                Rule::custom(Predicate::new(is_strong_password)).with_message(
                    "Password must contain uppercase, lowercase, numbers, and special characters",
                ),
            ],
        )
        .field(
            "confirmPassword",
            [
                Rule::required().with_message("Please confirm password"),
                Rule::confirm("password").with_message("Passwords must match"),
            ],
        );

    FormValidator::new(
        values([
            ("username", ""),
            ("email", ""),
            ("password", ""),
            ("confirmPassword", ""),
        ]),
        rules,
        ValidationOptions::on_change().with_debounce(Duration::from_millis(500)),
    )
}

async fn username_available(value: Value) -> bool {
    tokio::time::sleep(Duration::from_millis(200)).await;
    let name = value.as_str().unwrap_or_default();
    !TAKEN_USERNAMES.contains(&name)
}

async fn email_unregistered(value: Value) -> bool {
    tokio::time::sleep(Duration::from_millis(150)).await;
    let email = value.as_str().unwrap_or_default();
    !REGISTERED_EMAILS.contains(&email)
}

fn is_strong_password(value: &Value) -> bool {
    let password = value.as_str().unwrap_or_default();
    password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| "!@#$%^&*".contains(c))
}
