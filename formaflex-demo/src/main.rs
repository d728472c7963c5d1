mod forms;
mod render;

use std::error::Error;
use std::fs::File;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use formaflex::{FormRegistry, FormResult, FormValidator};
use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode, WriteLogger,
};

/// Log level for the log file, from `FORMAFLEX_LOG` (default `debug`).
fn log_level() -> LevelFilter {
    std::env::var("FORMAFLEX_LOG")
        .ok()
        .and_then(|level| level.parse().ok())
        .unwrap_or(LevelFilter::Debug)
}

fn init_logging() -> Result<(), Box<dyn Error>> {
    let log_file = File::create("formaflex-demo.log")?;
    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Warn,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(log_level(), Config::default(), log_file),
    ])?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging()?;

    run_demo_form()?;
    run_registration().await?;
    Ok(())
}

/// The login-style form, shared through a registry.
fn run_demo_form() -> Result<(), Box<dyn Error>> {
    let registry = FormRegistry::new();
    let renders = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&renders);
    let subscription = registry.subscribe(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    forms::register_demo(&registry)?;

    let edits = [
        ("email", "jane@"),
        ("email", "jane@example.com"),
        ("password", "hunt"),
        ("confirmPassword", ""),
    ];
    for (key, value) in edits {
        registry.set_field("demo", key, value);
        log::info!("demo: {} = {:?}", key, value);
    }
    print_registry_form(&registry, "demo form after edits");

    render::print_result(&registry.validate_form("demo"));

    registry.set_field("demo", "password", "hunter22");
    registry.set_field("demo", "confirmPassword", "hunter22");
    let result = registry.validate_form("demo");
    render::print_result(&result);
    if let FormResult::Success(values) = &result {
        println!("{}", serde_json::to_string_pretty(values)?);
    }

    println!("Subscribers were notified {} times", renders.load(Ordering::SeqCst));
    subscription.unsubscribe();
    Ok(())
}

/// The registration form with debounced async checks.
async fn run_registration() -> Result<(), Box<dyn Error>> {
    let form = forms::registration()?;

    // Typed quickly: only the last value is checked once the typing pauses.
    for partial in ["a", "ad", "adm", "admin"] {
        form.set_field("username", partial);
        tokio::time::sleep(Duration::from_millis(80)).await;
    }
    print_validator_form(&form, "while typing");
    settle(&form).await;
    print_validator_form(&form, "after the username check");

    form.set_field("username", "ada");
    form.set_field("email", "ada@example.com");
    form.set_field("password", "Secret1!");
    form.set_field("confirmPassword", "Secret2!");
    settle(&form).await;
    print_validator_form(&form, "with mismatched passwords");

    form.set_field("confirmPassword", "Secret1!");
    let result = form.validate_form_async().await;
    print_validator_form(&form, "after submit");
    render::print_result(&result);
    Ok(())
}

/// Waits until no field is waiting on a timer or an async rule.
async fn settle(form: &FormValidator) {
    loop {
        let values = form.values();
        if !values
            .keys()
            .any(|key| form.field_status(key).is_validating())
        {
            return;
        }
        form.changed().await;
    }
}

fn print_registry_form(registry: &FormRegistry, title: &str) {
    render::print_form(title, &registry.get_values("demo"), |key| {
        registry.field_status("demo", key)
    });
    println!("  valid: {}", registry.is_valid("demo"));
}

fn print_validator_form(form: &FormValidator, title: &str) {
    render::print_form(title, &form.values(), |key| form.field_status(key));
    println!("  valid: {}", form.is_valid());
}
