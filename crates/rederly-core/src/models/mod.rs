//! Domain models shared across the Rederly client crates.

pub mod attachment;
pub mod progress;
pub mod regrade;

pub use attachment::{
    Attachment, AttachmentMetadata, ConfirmAttachmentRequest, GradeRef, LocalFile,
    UploadUrlResponse,
};
pub use progress::{ProgressAction, UploadProgress};
pub use regrade::{RegradeScope, TopicRegradeInfo};
