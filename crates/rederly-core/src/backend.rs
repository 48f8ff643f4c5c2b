//! Backend abstraction trait.
//!
//! The upload tracker and regrade poller consume the Rederly backend through
//! this trait rather than a concrete HTTP client, so the state machines can
//! be exercised against scripted fakes. The reqwest implementation lives in
//! rederly-api-client.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::ApiResult;
use crate::models::attachment::{AttachmentMetadata, ConfirmAttachmentRequest, UploadUrlResponse};
use crate::models::regrade::{RegradeScope, TopicRegradeInfo};

/// Byte-level progress callback for the direct storage PUT:
/// `(loaded_bytes, total_bytes)`, cumulative per invocation.
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Resource-oriented operations against the Rederly backend.
///
/// All application-backend responses are JSON envelopes carrying a `data`
/// payload; implementations unwrap the envelope and construct typed errors
/// at this boundary. `put_bytes` is the exception: it targets the presigned
/// object-storage URL directly, not the application backend.
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Request a one-time upload URL and destination object key.
    async fn request_upload_url(&self) -> ApiResult<UploadUrlResponse>;

    /// Direct binary PUT to the presigned URL with cumulative byte progress.
    async fn put_bytes(
        &self,
        upload_url: &str,
        bytes: Bytes,
        content_type: &str,
        on_progress: ProgressCallback,
    ) -> ApiResult<()>;

    /// Confirm a completed direct upload with the backend.
    async fn confirm_attachment(
        &self,
        request: &ConfirmAttachmentRequest,
    ) -> ApiResult<AttachmentMetadata>;

    /// Delete an attachment (client and server side).
    async fn delete_attachment(&self, id: i64) -> ApiResult<()>;

    /// Fetch current regrade status for a scope.
    async fn check_regrade_status(&self, scope: &RegradeScope) -> ApiResult<TopicRegradeInfo>;

    /// Start a regrade job for a scope.
    async fn start_regrade(&self, scope: &RegradeScope) -> ApiResult<()>;
}
