//! Rederly Client Services
//!
//! This crate hosts the two client-side state machines: the upload tracker
//! (drives one attachment through the three-step upload protocol with live
//! progress) and the regrade poller (detects regrade-worthy edits, confirms
//! with the user, and polls a running regrade job to completion). Both
//! consume the backend through [`rederly_core::BackendApi`] and surface
//! messages through a [`NotificationSink`].

pub mod notify;
pub mod regrade;
pub mod upload;

pub use notify::{NotificationSink, TracingNotifier};
pub use regrade::{PollerPhase, RegradePoller, RegradePollerConfig};
pub use upload::{UploadTracker, PUT_PROGRESS_SPAN, UPLOAD_URL_PROGRESS};
