//! Upload tracker: drives one attachment through the three-step upload
//! protocol with live progress reporting and terminal failure handling.
//!
//! The three network calls run strictly in sequence: request a one-time
//! upload URL, PUT the bytes directly to storage, confirm with the backend.
//! Nothing is persisted until the confirm succeeds, so a failed run leaves
//! the attachment pending with its local file intact; the only path back to
//! uploading is a fresh tracker on a re-selected file.

use std::sync::{Arc, Mutex, MutexGuard};

use validator::Validate;

use rederly_core::{
    content_type_for_filename, reduce, ApiError, ApiResult, Attachment, BackendApi,
    ConfirmAttachmentRequest, GradeRef, ProgressAction, ProgressCallback, UploadProgress,
};

use crate::notify::NotificationSink;

/// Progress once the one-time upload URL has been issued.
pub const UPLOAD_URL_PROGRESS: u8 = 10;
/// Portion of the 0-100 scale spanned by the storage PUT, so byte progress
/// maps into [10, 80] and the confirm step closes out to 100.
pub const PUT_PROGRESS_SPAN: u8 = 70;

type ProgressListener = Arc<dyn Fn(UploadProgress) + Send + Sync>;

fn lock_progress(progress: &Mutex<UploadProgress>) -> MutexGuard<'_, UploadProgress> {
    // A poisoned lock only means a writer panicked mid-update; the value
    // itself is always a valid UploadProgress.
    progress.lock().unwrap_or_else(|e| e.into_inner())
}

/// Drives one attachment's upload. One tracker per attachment; trackers for
/// different attachments are independent.
pub struct UploadTracker {
    backend: Arc<dyn BackendApi>,
    notifier: Arc<dyn NotificationSink>,
    attachment: Attachment,
    grade_ref: GradeRef,
    progress: Arc<Mutex<UploadProgress>>,
    listener: Option<ProgressListener>,
}

impl UploadTracker {
    pub fn new(
        backend: Arc<dyn BackendApi>,
        notifier: Arc<dyn NotificationSink>,
        attachment: Attachment,
        grade_ref: GradeRef,
    ) -> Self {
        Self {
            backend,
            notifier,
            attachment,
            grade_ref,
            progress: Arc::new(Mutex::new(UploadProgress::Idle)),
            listener: None,
        }
    }

    /// Install a callback invoked on every progress change.
    pub fn on_progress(mut self, listener: impl Fn(UploadProgress) + Send + Sync + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    pub fn progress(&self) -> UploadProgress {
        *lock_progress(&self.progress)
    }

    pub fn attachment(&self) -> &Attachment {
        &self.attachment
    }

    pub fn into_attachment(self) -> Attachment {
        self.attachment
    }

    fn apply_to(
        progress: &Mutex<UploadProgress>,
        listener: Option<&ProgressListener>,
        action: ProgressAction,
    ) {
        let next = {
            let mut guard = lock_progress(progress);
            *guard = reduce(*guard, action);
            *guard
        };
        if let Some(listener) = listener {
            listener(next);
        }
    }

    fn apply(&self, action: ProgressAction) {
        Self::apply_to(&self.progress, self.listener.as_ref(), action);
    }

    /// Run the upload to completion. Any failure is terminal for this
    /// tracker: progress moves to the failed sentinel, the error is surfaced
    /// through the notification sink, and no retry is attempted.
    pub async fn run(&mut self) -> ApiResult<()> {
        match self.drive().await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.apply(ProgressAction::Fail);
                if err.is_expected() {
                    tracing::debug!(
                        key = %self.attachment.key,
                        filename = %self.attachment.user_local_filename,
                        error = %err,
                        "Attachment upload rejected"
                    );
                } else {
                    tracing::error!(
                        key = %self.attachment.key,
                        filename = %self.attachment.user_local_filename,
                        error = %err,
                        "Attachment upload failed"
                    );
                }
                self.notifier.error(&err.user_message());
                Err(err)
            }
        }
    }

    async fn drive(&mut self) -> ApiResult<()> {
        let file = self
            .attachment
            .file
            .clone()
            .ok_or_else(|| ApiError::Protocol("attachment has no file to upload".to_string()))?;

        let upload = self.backend.request_upload_url().await?;
        self.apply(ProgressAction::SetTo(UPLOAD_URL_PROGRESS));

        let content_type = file.content_type.clone().unwrap_or_else(|| {
            content_type_for_filename(&self.attachment.user_local_filename).to_string()
        });

        let progress = self.progress.clone();
        let listener = self.listener.clone();
        let callback: ProgressCallback = Arc::new(move |loaded, total| {
            if total == 0 {
                return;
            }
            // A transport reporting loaded > total still tops out at the band.
            let loaded = loaded.min(total);
            let banded = UPLOAD_URL_PROGRESS + ((PUT_PROGRESS_SPAN as u64 * loaded / total) as u8);
            Self::apply_to(&progress, listener.as_ref(), ProgressAction::SetTo(banded));
        });

        self.backend
            .put_bytes(&upload.upload_url, file.bytes.clone(), &content_type, callback)
            .await?;

        let request = ConfirmAttachmentRequest {
            cloud_filename: upload.cloud_filename,
            user_local_filename: self.attachment.user_local_filename.clone(),
            grade_ref: self.grade_ref,
        };
        request.validate()?;

        let metadata = self.backend.confirm_attachment(&request).await?;
        self.attachment.confirm(metadata);
        self.apply(ProgressAction::SetTo(100));

        self.notifier
            .success(&format!("Uploaded {}", self.attachment.user_local_filename));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use rederly_core::{
        AttachmentMetadata, LocalFile, RegradeScope, TopicRegradeInfo, UploadUrlResponse,
    };

    #[derive(Default)]
    struct RecordingNotifier {
        errors: Mutex<Vec<String>>,
        successes: Mutex<Vec<String>>,
    }

    impl NotificationSink for RecordingNotifier {
        fn success(&self, message: &str) {
            self.successes.lock().unwrap().push(message.to_string());
        }

        fn error(&self, message: &str) {
            self.errors.lock().unwrap().push(message.to_string());
        }
    }

    /// Scripted backend: the PUT invokes the progress callback with the
    /// configured `(loaded, total)` pairs, then succeeds or fails.
    struct MockBackend {
        progress_script: Vec<(u64, u64)>,
        fail_put: bool,
        upload_url_calls: AtomicUsize,
        put_calls: AtomicUsize,
        confirm_calls: AtomicUsize,
    }

    impl MockBackend {
        fn new(progress_script: Vec<(u64, u64)>) -> Self {
            Self {
                progress_script,
                fail_put: false,
                upload_url_calls: AtomicUsize::new(0),
                put_calls: AtomicUsize::new(0),
                confirm_calls: AtomicUsize::new(0),
            }
        }

        fn failing_put(mut self) -> Self {
            self.fail_put = true;
            self
        }
    }

    #[async_trait]
    impl BackendApi for MockBackend {
        async fn request_upload_url(&self) -> ApiResult<UploadUrlResponse> {
            self.upload_url_calls.fetch_add(1, Ordering::SeqCst);
            Ok(UploadUrlResponse {
                upload_url: "https://storage.example/u1".to_string(),
                cloud_filename: "abc123.pdf".to_string(),
            })
        }

        async fn put_bytes(
            &self,
            _upload_url: &str,
            _bytes: Bytes,
            _content_type: &str,
            on_progress: ProgressCallback,
        ) -> ApiResult<()> {
            self.put_calls.fetch_add(1, Ordering::SeqCst);
            for (loaded, total) in &self.progress_script {
                on_progress(*loaded, *total);
            }
            if self.fail_put {
                return Err(ApiError::Network {
                    message: "connection reset".to_string(),
                });
            }
            Ok(())
        }

        async fn confirm_attachment(
            &self,
            request: &ConfirmAttachmentRequest,
        ) -> ApiResult<AttachmentMetadata> {
            self.confirm_calls.fetch_add(1, Ordering::SeqCst);
            Ok(AttachmentMetadata {
                id: 42,
                cloud_filename: request.cloud_filename.clone(),
                user_local_filename: request.user_local_filename.clone(),
            })
        }

        async fn delete_attachment(&self, _id: i64) -> ApiResult<()> {
            unreachable!("delete is not exercised by the upload tracker")
        }

        async fn check_regrade_status(
            &self,
            _scope: &RegradeScope,
        ) -> ApiResult<TopicRegradeInfo> {
            unreachable!("regrade status is not exercised by the upload tracker")
        }

        async fn start_regrade(&self, _scope: &RegradeScope) -> ApiResult<()> {
            unreachable!("regrade is not exercised by the upload tracker")
        }
    }

    fn pending_attachment() -> Attachment {
        Attachment::from_local_file("homework.pdf", LocalFile::new(vec![0u8; 1000]))
    }

    #[tokio::test]
    async fn happy_path_progress_and_confirmation() {
        let backend = Arc::new(MockBackend::new(vec![(500, 1000), (1000, 1000)]));
        let notifier = Arc::new(RecordingNotifier::default());
        let observed: Arc<Mutex<Vec<UploadProgress>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = observed.clone();

        let mut tracker = UploadTracker::new(
            backend.clone(),
            notifier.clone(),
            pending_attachment(),
            GradeRef::Grade(7),
        )
        .on_progress(move |p| sink.lock().unwrap().push(p));

        tracker.run().await.unwrap();

        let observed = observed.lock().unwrap();
        let values: Vec<Option<u8>> = observed.iter().map(|p| p.value()).collect();
        assert_eq!(values, vec![Some(10), Some(45), Some(80), Some(100)]);

        let attachment = tracker.attachment();
        assert!(attachment.is_confirmed());
        assert!(attachment.invariant_holds());
        assert_eq!(attachment.id, Some(42));
        assert_eq!(attachment.cloud_filename.as_deref(), Some("abc123.pdf"));
        assert_eq!(backend.confirm_calls.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.successes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn overreported_put_progress_caps_at_band_top() {
        let backend = Arc::new(MockBackend::new(vec![(500, 1000), (10_000, 1000)]));
        let notifier = Arc::new(RecordingNotifier::default());
        let observed: Arc<Mutex<Vec<UploadProgress>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = observed.clone();

        let mut tracker = UploadTracker::new(
            backend,
            notifier,
            pending_attachment(),
            GradeRef::Grade(7),
        )
        .on_progress(move |p| sink.lock().unwrap().push(p));

        tracker.run().await.unwrap();

        let observed = observed.lock().unwrap();
        let values: Vec<Option<u8>> = observed.iter().map(|p| p.value()).collect();
        assert_eq!(values, vec![Some(10), Some(45), Some(80), Some(100)]);
    }

    #[tokio::test]
    async fn put_failure_is_terminal_and_keeps_file() {
        let backend = Arc::new(MockBackend::new(vec![(500, 1000)]).failing_put());
        let notifier = Arc::new(RecordingNotifier::default());

        let mut tracker = UploadTracker::new(
            backend.clone(),
            notifier.clone(),
            pending_attachment(),
            GradeRef::Grade(7),
        );

        let err = tracker.run().await.unwrap_err();
        assert!(matches!(err, ApiError::Network { .. }));

        assert!(tracker.progress().is_failed());
        assert!(tracker.attachment().file.is_some());
        assert!(tracker.attachment().is_pending());
        assert_eq!(backend.confirm_calls.load(Ordering::SeqCst), 0);
        assert_eq!(notifier.errors.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_file_is_protocol_error_with_no_calls() {
        let backend = Arc::new(MockBackend::new(Vec::new()));
        let notifier = Arc::new(RecordingNotifier::default());

        let mut attachment = pending_attachment();
        attachment.file = None;

        let mut tracker = UploadTracker::new(
            backend.clone(),
            notifier.clone(),
            attachment,
            GradeRef::GradeInstance(3),
        );

        let err = tracker.run().await.unwrap_err();
        assert!(matches!(err, ApiError::Protocol(_)));
        assert!(tracker.progress().is_failed());
        assert_eq!(backend.upload_url_calls.load(Ordering::SeqCst), 0);
        assert_eq!(backend.put_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn grade_instance_confirmation_round_trip() {
        let backend = Arc::new(MockBackend::new(vec![(1000, 1000)]));
        let notifier = Arc::new(RecordingNotifier::default());

        let mut tracker = UploadTracker::new(
            backend,
            notifier,
            pending_attachment(),
            GradeRef::GradeInstance(9),
        );

        tracker.run().await.unwrap();
        assert!(tracker.progress().is_done());
        assert!(tracker.into_attachment().is_confirmed());
    }
}
