//! Plain-text rendering of form state.

use formaflex::{Errors, FieldStatus, FormResult, Values};

/// Prints every value with its field status.
pub fn print_form(title: &str, values: &Values, status: impl Fn(&str) -> FieldStatus) {
    println!("== {} ==", title);
    for (key, value) in values {
        let shown = format!("{:?}", value.to_string());
        println!("  {:<16} {:<24} {}", key, shown, describe(&status(key)));
    }
}

/// Prints an error snapshot, one field per line.
pub fn print_errors(errors: &Errors) {
    if errors.is_empty() {
        println!("  (no fields validated yet)");
    }
    for (key, msg) in errors {
        match msg {
            Some(msg) => println!("  {}: {}", key, msg),
            None => println!("  {}: ok", key),
        }
    }
}

/// Prints the outcome of a submit.
pub fn print_result(result: &FormResult) {
    match result {
        FormResult::Success(values) => println!("Submitted {} values", values.len()),
        FormResult::Failure(errors) => {
            println!("Submit blocked:");
            print_errors(errors);
        }
        FormResult::Pending(fields) => println!("Still checking: {}", fields.join(", ")),
    }
}

fn describe(status: &FieldStatus) -> String {
    match status {
        FieldStatus::Untouched => "-".to_string(),
        FieldStatus::Validating => "checking...".to_string(),
        FieldStatus::Valid => "ok".to_string(),
        FieldStatus::Invalid(msg) => format!("error: {}", msg),
    }
}
