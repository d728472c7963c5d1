//! Per-field validation state.

use tokio::task::AbortHandle;

use crate::engine::Verdict;

/// Where a field is in its validation lifecycle.
///
/// ```text
/// Untouched -> Validating -> Valid | Invalid
///                  ^              |
///                  +--- set_field +
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FieldStatus {
    /// Never validated.
    #[default]
    Untouched,
    /// An evaluation is waiting on an async rule or a debounce timer.
    Validating,
    /// The last evaluation passed.
    Valid,
    /// The last evaluation failed with this message.
    Invalid(String),
}

impl FieldStatus {
    /// The error message, if the field is invalid.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Invalid(msg) => Some(msg),
            _ => None,
        }
    }

    /// Returns `true` while an evaluation is outstanding.
    pub fn is_validating(&self) -> bool {
        matches!(self, Self::Validating)
    }

    /// Returns `true` once the field has a verdict.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Valid | Self::Invalid(_))
    }
}

impl From<Verdict> for FieldStatus {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Valid => Self::Valid,
            Verdict::Invalid(msg) => Self::Invalid(msg),
        }
    }
}

/// Generation counter, status and debounce timer of one field.
#[derive(Debug, Default)]
pub(crate) struct FieldTracker {
    generation: u64,
    pub(crate) status: FieldStatus,
    timer: Option<AbortHandle>,
}

impl FieldTracker {
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Starts a new generation and cancels the pending debounce timer.
    pub(crate) fn bump(&mut self) -> u64 {
        self.cancel_timer();
        self.generation += 1;
        self.generation
    }

    pub(crate) fn arm(&mut self, timer: AbortHandle) {
        self.cancel_timer();
        self.timer = Some(timer);
    }

    /// Forgets the timer without aborting it; used by the timer itself.
    pub(crate) fn disarm(&mut self) {
        self.timer = None;
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            log::trace!("Cancelling debounce timer");
            timer.abort();
        }
    }
}

impl Drop for FieldTracker {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
