//! Scheduling of debounced and asynchronous validations.
//!
//! Both the registry and the standalone validator own their form records
//! behind a lock. The functions here only ever touch a record through
//! [`FormHost::with_record`], and never hold that lock across an `.await`,
//! while predicates run or while observers are notified.

use std::time::Duration;

use tokio::runtime::Handle;

use crate::form::FieldCheck;
use crate::form::FormRecord;
use crate::form::PendingJob;
use crate::options::ValidationOptions;
use crate::result::FormResult;

/// Owner of a form record.
pub(crate) trait FormHost: Clone + Send + Sync + 'static {
    /// Runs `f` on the record if it still is incarnation `epoch`.
    fn with_record<R>(&self, epoch: u64, f: impl FnOnce(&mut FormRecord) -> R) -> Option<R>;

    /// Signals observers that the record changed.
    fn publish(&self);
}

/// Reacts to a `set_field` according to the form's options.
pub(crate) fn field_written<H: FormHost>(
    host: &H,
    epoch: u64,
    key: &str,
    generation: u64,
    options: &ValidationOptions,
) {
    if !options.validate_on_change {
        host.with_record(epoch, |record| record.clear_validating(key));
        return;
    }
    if !options.is_debounced() || !debounce(host, epoch, key, generation, options.debounce) {
        validate_now(host, epoch, key);
    }
}

/// Evaluates a field right away, spawning the async remainder if any.
pub(crate) fn validate_now<H: FormHost>(host: &H, epoch: u64, key: &str) {
    let Some(Some(check)) = host.with_record(epoch, |record| record.prepare(key)) else {
        return;
    };
    if let Some(job) = apply_all(host, epoch, vec![check]).into_iter().next() {
        drive(host, job);
    }
}

/// Sweeps every ruled field; async rules resolve in the background.
pub(crate) fn sweep<H: FormHost>(host: &H, epoch: u64) -> Option<FormResult> {
    let checks = host.with_record(epoch, FormRecord::sweep)?;
    for job in apply_all(host, epoch, checks) {
        drive(host, job);
    }
    host.with_record(epoch, |record| record.result())
}

/// Sweeps every ruled field and waits for async rules before classifying.
pub(crate) async fn sweep_settled<H: FormHost>(host: &H, epoch: u64) -> Option<FormResult> {
    let checks = host.with_record(epoch, FormRecord::sweep)?;
    let jobs = apply_all(host, epoch, checks);
    let verdicts = futures::future::join_all(jobs.into_iter().map(|job| async move {
        let verdict = job.validation.await;
        (job.key, job.generation, verdict)
    }))
    .await;

    host.with_record(epoch, |record| {
        for (key, generation, verdict) in verdicts {
            record.settle(&key, generation, verdict);
        }
        record.result()
    })
}

/// Runs checks with the record unlocked, then records their outcomes.
///
/// Predicates may therefore read the form or registry they belong to.
fn apply_all<H: FormHost>(host: &H, epoch: u64, checks: Vec<FieldCheck>) -> Vec<PendingJob> {
    let outcomes: Vec<_> = checks
        .into_iter()
        .map(|check| {
            let outcome = check.run();
            (check, outcome)
        })
        .collect();

    host.with_record(epoch, |record| {
        outcomes
            .into_iter()
            .filter_map(|(check, outcome)| record.apply(check, outcome))
            .collect()
    })
    .unwrap_or_default()
}

/// Schedules evaluation after `delay`, replacing the field's previous timer.
///
/// Returns `false` when no Tokio runtime is available to run the timer.
fn debounce<H: FormHost>(
    host: &H,
    epoch: u64,
    key: &str,
    generation: u64,
    delay: Duration,
) -> bool {
    let Ok(runtime) = Handle::try_current() else {
        log::debug!("No async runtime; validating '{}' without debounce", key);
        return false;
    };

    host.with_record(epoch, |record| record.mark_validating(key));

    let timer_host = host.clone();
    let timer_key = key.to_string();
    let task = runtime.spawn(async move {
        tokio::time::sleep(delay).await;
        let claimed = timer_host
            .with_record(epoch, |record| record.claim_timer(&timer_key, generation))
            .unwrap_or(false);
        if claimed {
            validate_now(&timer_host, epoch, &timer_key);
            timer_host.publish();
        } else {
            log::trace!("Debounced validation of '{}' superseded", timer_key);
        }
    });

    host.with_record(epoch, |record| {
        record.arm_timer(key, generation, task.abort_handle())
    });
    true
}

/// Resolves a pending evaluation and applies it unless it went stale.
///
/// Without a runtime the future is driven to completion inline.
fn drive<H: FormHost>(host: &H, job: PendingJob) {
    let PendingJob {
        epoch,
        key,
        generation,
        validation,
    } = job;

    match Handle::try_current() {
        Ok(runtime) => {
            let host = host.clone();
            runtime.spawn(async move {
                let verdict = validation.await;
                let applied = host
                    .with_record(epoch, |record| record.settle(&key, generation, verdict))
                    .unwrap_or(false);
                if applied {
                    host.publish();
                }
            });
        }
        Err(_) => {
            log::debug!("No async runtime; resolving '{}' inline", key);
            let verdict = futures::executor::block_on(validation);
            host.with_record(epoch, |record| record.settle(&key, generation, verdict));
        }
    }
}
