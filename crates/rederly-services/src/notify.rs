//! User notification seam.
//!
//! Services never render UI; they hand success/error messages to whatever
//! sink the embedding view layer provides.

/// A place to surface success/error messages to the user.
pub trait NotificationSink: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Default sink that logs through tracing. Useful for headless callers.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn success(&self, message: &str) {
        tracing::info!(message, "notification");
    }

    fn error(&self, message: &str) {
        tracing::warn!(message, "notification");
    }
}
