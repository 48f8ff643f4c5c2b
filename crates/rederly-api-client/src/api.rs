//! Domain methods for the Rederly backend client.
//!
//! Attachment confirmation and regrade status speak to the application
//! backend through the `data` envelope; the direct storage PUT targets the
//! presigned URL with no auth and no envelope, streaming the body in chunks
//! so the caller gets cumulative byte progress.

use async_trait::async_trait;
use bytes::Bytes;

use rederly_core::{
    ApiError, ApiResult, AttachmentMetadata, BackendApi, ConfirmAttachmentRequest,
    ProgressCallback, RegradeScope, TopicRegradeInfo, UploadUrlResponse,
};

use crate::{api_prefix, ApiClient};

/// Chunk size for the streamed storage PUT. Each produced chunk advances the
/// progress callback once.
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

fn regrade_query(scope: &RegradeScope) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(question_id) = scope.question_id {
        query.push(("questionId", question_id.to_string()));
    }
    if let Some(user_id) = scope.user_id {
        query.push(("userId", user_id.to_string()));
    }
    query
}

impl ApiClient {
    /// Request a one-time upload URL and destination object key.
    pub async fn request_upload_url(&self) -> ApiResult<UploadUrlResponse> {
        self.post_json(
            &format!("{}/attachments/upload-url", api_prefix()),
            &serde_json::json!({}),
        )
        .await
    }

    /// Direct binary PUT to a presigned object-storage URL.
    ///
    /// The URL is absolute and outside the application backend: no auth
    /// header is applied and no envelope is expected. The body is streamed
    /// in fixed-size chunks; `on_progress` receives cumulative
    /// `(loaded, total)` as each chunk is handed to the transport.
    pub async fn put_bytes(
        &self,
        upload_url: &str,
        bytes: Bytes,
        content_type: &str,
        on_progress: ProgressCallback,
    ) -> ApiResult<()> {
        let total = bytes.len() as u64;
        let body = futures::stream::unfold(
            (bytes, 0u64),
            move |(mut remaining, loaded)| {
                let on_progress = on_progress.clone();
                async move {
                    if remaining.is_empty() {
                        return None;
                    }
                    let take = remaining.len().min(UPLOAD_CHUNK_BYTES);
                    let chunk = remaining.split_to(take);
                    let loaded = loaded + take as u64;
                    on_progress(loaded, total);
                    Some((Ok::<Bytes, std::io::Error>(chunk), (remaining, loaded)))
                }
            },
        );

        let response = self
            .client()
            .put(upload_url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::CONTENT_LENGTH, total)
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await
            .map_err(|e| ApiError::Network {
                message: format!("Failed to upload file to storage: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Network {
                message: format!("Storage upload failed with status {}: {}", status, body),
            });
        }
        Ok(())
    }

    /// Confirm a completed direct upload with the backend.
    pub async fn confirm_attachment(
        &self,
        request: &ConfirmAttachmentRequest,
    ) -> ApiResult<AttachmentMetadata> {
        self.post_json(&format!("{}/attachments", api_prefix()), request)
            .await
    }

    /// Delete an attachment by backend id.
    pub async fn delete_attachment(&self, id: i64) -> ApiResult<()> {
        self.delete(&format!("{}/attachments/{}", api_prefix(), id))
            .await
    }

    /// Fetch current regrade status for a topic, optionally scoped to a
    /// question and/or a student.
    pub async fn check_regrade_status(&self, scope: &RegradeScope) -> ApiResult<TopicRegradeInfo> {
        self.get(
            &format!("{}/courses/topic/{}/regrade", api_prefix(), scope.topic_id),
            &regrade_query(scope),
        )
        .await
    }

    /// Start a regrade job for a scope.
    pub async fn start_regrade(&self, scope: &RegradeScope) -> ApiResult<()> {
        self.put_unit(
            &format!("{}/courses/topic/{}/regrade", api_prefix(), scope.topic_id),
            &regrade_query(scope),
        )
        .await
    }
}

#[async_trait]
impl BackendApi for ApiClient {
    async fn request_upload_url(&self) -> ApiResult<UploadUrlResponse> {
        ApiClient::request_upload_url(self).await
    }

    async fn put_bytes(
        &self,
        upload_url: &str,
        bytes: Bytes,
        content_type: &str,
        on_progress: ProgressCallback,
    ) -> ApiResult<()> {
        ApiClient::put_bytes(self, upload_url, bytes, content_type, on_progress).await
    }

    async fn confirm_attachment(
        &self,
        request: &ConfirmAttachmentRequest,
    ) -> ApiResult<AttachmentMetadata> {
        ApiClient::confirm_attachment(self, request).await
    }

    async fn delete_attachment(&self, id: i64) -> ApiResult<()> {
        ApiClient::delete_attachment(self, id).await
    }

    async fn check_regrade_status(&self, scope: &RegradeScope) -> ApiResult<TopicRegradeInfo> {
        ApiClient::check_regrade_status(self, scope).await
    }

    async fn start_regrade(&self, scope: &RegradeScope) -> ApiResult<()> {
        ApiClient::start_regrade(self, scope).await
    }
}
