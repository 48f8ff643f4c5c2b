//! Attachment model and wire types for the three-step upload protocol.
//!
//! An attachment is created client-side when the user selects a file, moves
//! through upload (presigned URL, direct PUT, confirm), and is destroyed on
//! explicit delete. Exactly one of `{file present, id absent}` (pending) or
//! `{file absent, id present}` (confirmed) holds at any time; while an upload
//! is in flight the attachment stays pending with a progress value tracked
//! separately by the upload tracker.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// File content selected by the user, held only until the upload is confirmed.
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub bytes: Bytes,
    /// Declared MIME type, if the picker provided one. When absent the
    /// uploader falls back to [`content_type_for_filename`].
    pub content_type: Option<String>,
}

impl LocalFile {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Which gradable artifact an attachment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradeRef {
    #[serde(rename = "gradeId")]
    Grade(i64),
    #[serde(rename = "gradeInstanceId")]
    GradeInstance(i64),
}

/// A user-uploaded file associated with a grade or grade instance.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Client-local correlation key, assigned at creation.
    pub key: Uuid,
    /// Backend-assigned id, present only once confirmed.
    pub id: Option<i64>,
    /// Local file content, present only pre-confirmation.
    pub file: Option<LocalFile>,
    /// Object-storage key, present only post-confirmation.
    pub cloud_filename: Option<String>,
    pub user_local_filename: String,
}

impl Attachment {
    /// Create a pending attachment from a user-selected file.
    pub fn from_local_file(user_local_filename: impl Into<String>, file: LocalFile) -> Self {
        Self {
            key: Uuid::new_v4(),
            id: None,
            file: Some(file),
            cloud_filename: None,
            user_local_filename: user_local_filename.into(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.file.is_some() && self.id.is_none()
    }

    pub fn is_confirmed(&self) -> bool {
        self.file.is_none() && self.id.is_some()
    }

    /// Pending and confirmed are the only legal resting states.
    pub fn invariant_holds(&self) -> bool {
        self.is_pending() || self.is_confirmed()
    }

    /// Replace the transient local file with confirmed cloud metadata.
    pub fn confirm(&mut self, metadata: AttachmentMetadata) {
        self.id = Some(metadata.id);
        self.cloud_filename = Some(metadata.cloud_filename);
        self.file = None;
    }
}

/// Response to the "get upload URL" call: a one-time direct-to-storage
/// upload endpoint plus the destination object key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    #[serde(rename = "uploadURL")]
    pub upload_url: String,
    pub cloud_filename: String,
}

/// Request confirming a completed direct upload with the backend.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmAttachmentRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Cloud filename must be between 1 and 255 characters"
    ))]
    pub cloud_filename: String,
    #[validate(length(
        min = 1,
        max = 255,
        message = "Filename must be between 1 and 255 characters"
    ))]
    pub user_local_filename: String,
    #[serde(flatten)]
    pub grade_ref: GradeRef,
}

/// Confirmed attachment metadata returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentMetadata {
    pub id: i64,
    pub cloud_filename: String,
    pub user_local_filename: String,
}

/// Best-effort MIME type lookup from a filename extension. Used when the
/// file picker did not declare a content type for the direct PUT.
pub fn content_type_for_filename(filename: &str) -> &'static str {
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        // Images
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        // Documents
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_attachment_is_pending() {
        let attachment = Attachment::from_local_file("homework.pdf", LocalFile::new(vec![1, 2, 3]));
        assert!(attachment.is_pending());
        assert!(!attachment.is_confirmed());
        assert!(attachment.invariant_holds());
        assert!(attachment.cloud_filename.is_none());
    }

    #[test]
    fn confirm_clears_file_and_sets_id() {
        let mut attachment =
            Attachment::from_local_file("homework.pdf", LocalFile::new(vec![1, 2, 3]));
        attachment.confirm(AttachmentMetadata {
            id: 42,
            cloud_filename: "abc123.pdf".to_string(),
            user_local_filename: "homework.pdf".to_string(),
        });
        assert!(attachment.is_confirmed());
        assert!(attachment.invariant_holds());
        assert!(attachment.file.is_none());
        assert_eq!(attachment.id, Some(42));
        assert_eq!(attachment.cloud_filename.as_deref(), Some("abc123.pdf"));
    }

    #[test]
    fn confirm_request_serializes_grade_ref_flat() {
        let request = ConfirmAttachmentRequest {
            cloud_filename: "abc123.pdf".to_string(),
            user_local_filename: "homework.pdf".to_string(),
            grade_ref: GradeRef::Grade(7),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["gradeId"], 7);
        assert_eq!(value["cloudFilename"], "abc123.pdf");
        assert!(value.get("gradeRef").is_none());

        let request = ConfirmAttachmentRequest {
            grade_ref: GradeRef::GradeInstance(9),
            ..request
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["gradeInstanceId"], 9);
    }

    #[test]
    fn confirm_request_rejects_empty_filename() {
        use validator::Validate;

        let request = ConfirmAttachmentRequest {
            cloud_filename: "abc123.pdf".to_string(),
            user_local_filename: String::new(),
            grade_ref: GradeRef::Grade(1),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn content_type_lookup_falls_back_to_octet_stream() {
        assert_eq!(content_type_for_filename("work.pdf"), "application/pdf");
        assert_eq!(content_type_for_filename("photo.JPG"), "image/jpeg");
        assert_eq!(
            content_type_for_filename("no_extension"),
            "application/octet-stream"
        );
        assert_eq!(
            content_type_for_filename("weird.xyz"),
            "application/octet-stream"
        );
    }
}
