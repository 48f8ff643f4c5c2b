//! Rederly Client Core Library
//!
//! This crate provides the domain models, error types, session configuration,
//! and backend abstraction shared by the Rederly client crates. The HTTP
//! implementation lives in rederly-api-client; the upload and regrade state
//! machines live in rederly-services.

pub mod backend;
pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use backend::{BackendApi, ProgressCallback};
pub use config::{Auth, SessionConfig, UserRole};
pub use error::{ApiError, ApiResult, LogLevel};
pub use models::attachment::{
    content_type_for_filename, Attachment, AttachmentMetadata, ConfirmAttachmentRequest, GradeRef,
    LocalFile, UploadUrlResponse,
};
pub use models::progress::{reduce, ProgressAction, UploadProgress};
pub use models::regrade::{RegradeScope, TopicRegradeInfo};
