//! Upload progress state and its pure reducer.
//!
//! Progress is a 0-100 value driven by a tagged action enum through
//! [`reduce`], independent of any UI concern so it can be tested in
//! isolation. `Failed` is terminal: nothing transitions out of it except a
//! fresh tracker instance.

/// The tracker's view of one attachment's upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadProgress {
    /// No upload activity yet.
    #[default]
    Idle,
    /// Upload underway or complete (100).
    At(u8),
    /// Terminal failure. Replaces any numeric progress.
    Failed,
}

impl UploadProgress {
    pub fn value(&self) -> Option<u8> {
        match self {
            UploadProgress::At(n) => Some(*n),
            UploadProgress::Idle | UploadProgress::Failed => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, UploadProgress::Failed)
    }

    pub fn is_done(&self) -> bool {
        matches!(self, UploadProgress::At(100))
    }
}

/// Actions dispatched through [`reduce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressAction {
    /// Set progress to an absolute value.
    SetTo(u8),
    /// Add to the current value, treating no value as 0.
    Increment(u8),
    /// Terminal failure.
    Fail,
}

/// Whether applying `action` to `state` would move progress backward.
/// Backward moves are a protocol anomaly: accepted, but logged.
pub fn is_backward(state: UploadProgress, action: ProgressAction) -> bool {
    match (state, action) {
        (UploadProgress::At(current), ProgressAction::SetTo(next)) => next < current,
        _ => false,
    }
}

/// Pure progress reduction. Values saturate at 100; `Failed` is sticky.
pub fn reduce(state: UploadProgress, action: ProgressAction) -> UploadProgress {
    if state.is_failed() && !matches!(action, ProgressAction::Fail) {
        // Terminal state: only a fresh tracker restarts an upload.
        return UploadProgress::Failed;
    }

    match action {
        ProgressAction::SetTo(value) => {
            if is_backward(state, action) {
                tracing::warn!(
                    current = ?state.value(),
                    requested = value,
                    "Upload progress moved backward"
                );
            }
            UploadProgress::At(value.min(100))
        }
        ProgressAction::Increment(delta) => {
            let current = state.value().unwrap_or(0);
            UploadProgress::At(current.saturating_add(delta).min(100))
        }
        ProgressAction::Fail => UploadProgress::Failed,
    }
}
