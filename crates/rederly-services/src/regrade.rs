//! Regrade poller: detects when a topic's grading basis changed server-side,
//! confirms with the user whether to regrade now, and polls a running
//! regrade job to completion.
//!
//! The poller is an explicit object owning its cancellation token: the poll
//! loop holds only a weak reference and stops on scope change, completion,
//! shutdown, or drop. Status responses carry the generation they were
//! fetched under, so a late response for an abandoned scope can never
//! overwrite fresher state.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use rederly_core::{ApiError, ApiResult, BackendApi, RegradeScope, TopicRegradeInfo};

use crate::notify::NotificationSink;

/// How often a running regrade job is re-checked.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Clone, Debug)]
pub struct RegradePollerConfig {
    pub poll_interval: Duration,
    /// Override: the caller knows no regrade applies here (e.g. the topic
    /// uses a grading scheme that never requires one). Hides the control.
    pub no_regrade_needed: bool,
}

impl Default for RegradePollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            no_regrade_needed: false,
        }
    }
}

/// Observable lifecycle of the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollerPhase {
    /// No status fetched for the current scope yet.
    #[default]
    Unchecked,
    /// Status known, no job running, nothing awaiting the user.
    Idle,
    /// New regrade-worthy edits detected; awaiting the user's decision.
    PendingConfirm,
    /// A regrade job is running and being polled.
    Running,
}

struct PollerInner {
    scope: Option<RegradeScope>,
    info: Option<TopicRegradeInfo>,
    /// Last internally observed regrade count (not the displayed one).
    last_count: Option<i64>,
    /// Bumped on every scope change; stale fetches are discarded against it.
    generation: u64,
    poll_cancel: Option<CancellationToken>,
}

/// Watches regrade status for one (topic, question, user) scope.
pub struct RegradePoller {
    backend: Arc<dyn BackendApi>,
    notifier: Arc<dyn NotificationSink>,
    config: RegradePollerConfig,
    inner: Mutex<PollerInner>,
    phase_tx: watch::Sender<PollerPhase>,
}

impl RegradePoller {
    pub fn new(
        backend: Arc<dyn BackendApi>,
        notifier: Arc<dyn NotificationSink>,
        config: RegradePollerConfig,
    ) -> Arc<Self> {
        let (phase_tx, _) = watch::channel(PollerPhase::Unchecked);
        Arc::new(Self {
            backend,
            notifier,
            config,
            inner: Mutex::new(PollerInner {
                scope: None,
                info: None,
                last_count: None,
                generation: 0,
                poll_cancel: None,
            }),
            phase_tx,
        })
    }

    fn lock_inner(&self) -> MutexGuard<'_, PollerInner> {
        // A poisoned lock only means a writer panicked mid-update; the
        // fields are plain data and remain coherent enough to continue.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn phase(&self) -> PollerPhase {
        *self.phase_tx.borrow()
    }

    /// Watch phase transitions (e.g. to surface the confirmation modal).
    pub fn subscribe(&self) -> watch::Receiver<PollerPhase> {
        self.phase_tx.subscribe()
    }

    /// Last-known status. Retained across failed fetches.
    pub fn info(&self) -> Option<TopicRegradeInfo> {
        self.lock_inner().info.clone()
    }

    pub fn scope(&self) -> Option<RegradeScope> {
        self.lock_inner().scope
    }

    /// Point the poller at a new (topic, question, user) triple: any active
    /// poll is torn down, prior info is discarded, and a status fetch is
    /// issued immediately.
    pub async fn set_scope(self: &Arc<Self>, scope: RegradeScope) -> ApiResult<()> {
        {
            let mut inner = self.lock_inner();
            if let Some(token) = inner.poll_cancel.take() {
                token.cancel();
            }
            inner.generation = inner.generation.wrapping_add(1);
            inner.scope = Some(scope);
            inner.info = None;
            inner.last_count = None;
        }
        self.phase_tx.send_replace(PollerPhase::Unchecked);
        self.refresh().await
    }

    /// Fetch current status and fold it into the state machine. Called on
    /// scope changes, external triggers (the owner made an edit that might
    /// require regrading), and every poll tick.
    ///
    /// A failed fetch keeps the last-known info and the current phase; an
    /// active poll loop is left running so the next tick retries.
    pub async fn refresh(self: &Arc<Self>) -> ApiResult<()> {
        let (scope, generation) = {
            let inner = self.lock_inner();
            let scope = inner
                .scope
                .ok_or_else(|| ApiError::Protocol("regrade check requires a scope".to_string()))?;
            (scope, inner.generation)
        };

        match self.backend.check_regrade_status(&scope).await {
            Ok(info) => {
                self.apply_status(generation, info);
                Ok(())
            }
            Err(err) => {
                if err.is_expected() {
                    tracing::debug!(
                        topic_id = scope.topic_id,
                        error = %err,
                        "Regrade status check rejected"
                    );
                } else {
                    tracing::warn!(
                        topic_id = scope.topic_id,
                        error = %err,
                        "Regrade status check failed"
                    );
                }
                self.notifier.error(&err.user_message());
                Err(err)
            }
        }
    }

    /// The user accepted the confirmation prompt: start the regrade, then
    /// immediately re-check status (expected to observe the job running).
    pub async fn accept(self: &Arc<Self>) -> ApiResult<()> {
        let scope = {
            self.lock_inner()
                .scope
                .ok_or_else(|| ApiError::Protocol("regrade requires a scope".to_string()))?
        };

        match self.backend.start_regrade(&scope).await {
            Ok(()) => {
                self.notifier.success("Regrade started");
                // The refresh reports its own failures; the regrade itself
                // has already been accepted by the backend.
                let _ = self.refresh().await;
                Ok(())
            }
            Err(err) => {
                match &err {
                    ApiError::Backend { message, .. } => self.notifier.error(message),
                    _ => self.notifier.error(&err.user_message()),
                }
                if !err.is_expected() {
                    tracing::error!(
                        topic_id = scope.topic_id,
                        error = %err,
                        "Failed to start regrade"
                    );
                }
                Err(err)
            }
        }
    }

    /// The user chose "regrade later": no backend call; the prompt goes away
    /// until the next externally triggered re-check.
    pub fn decline(&self) {
        self.phase_tx.send_if_modified(|phase| {
            if *phase == PollerPhase::PendingConfirm {
                *phase = PollerPhase::Idle;
                true
            } else {
                false
            }
        });
    }

    /// Whether the regrade control should be rendered at all.
    /// `question_grade_count` is view-owned: the number of grades under the
    /// scoped question, when the scope has one.
    pub fn is_visible(&self, question_grade_count: Option<usize>) -> bool {
        if self.config.no_regrade_needed {
            return false;
        }
        let inner = self.lock_inner();
        let Some(info) = inner.info.as_ref() else {
            return false;
        };
        if info.in_flight() {
            return true;
        }
        let question_scoped = inner.scope.is_some_and(|s| s.question_id.is_some());
        if question_scoped && question_grade_count == Some(0) {
            return false;
        }
        !info.grade_ids_that_need_retro.is_empty()
    }

    /// Stop any active poll loop. Phase and info are retained.
    pub fn shutdown(&self) {
        if let Some(token) = self.lock_inner().poll_cancel.take() {
            token.cancel();
        }
    }

    fn apply_status(self: &Arc<Self>, generation: u64, info: TopicRegradeInfo) {
        let phase = {
            let mut inner = self.lock_inner();
            if inner.generation != generation {
                tracing::debug!("Discarding regrade status fetched for an abandoned scope");
                return;
            }

            let new_edits =
                matches!(inner.last_count, Some(prev) if info.regrade_count > prev);
            inner.last_count = Some(info.regrade_count);
            let in_flight = info.in_flight();
            inner.info = Some(info);

            if in_flight {
                if inner.poll_cancel.is_none() {
                    self.start_poll(&mut inner);
                }
            } else if let Some(token) = inner.poll_cancel.take() {
                token.cancel();
            }

            // New edits take precedence: the user must re-confirm even if a
            // prior confirmation was already handled.
            if new_edits {
                PollerPhase::PendingConfirm
            } else if in_flight {
                PollerPhase::Running
            } else {
                PollerPhase::Idle
            }
        };
        self.phase_tx.send_replace(phase);
    }

    fn start_poll(self: &Arc<Self>, inner: &mut PollerInner) {
        let token = CancellationToken::new();
        inner.poll_cancel = Some(token.clone());

        let weak = Arc::downgrade(self);
        let interval = self.config.poll_interval;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        let Some(poller) = weak.upgrade() else { break };
                        // Fetch failures retry on the next tick; completion
                        // cancels the token from apply_status.
                        let _ = poller.refresh().await;
                    }
                }
            }
        });
    }
}

impl Drop for RegradePoller {
    fn drop(&mut self) {
        if let Some(token) = self
            .inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .poll_cancel
            .take()
        {
            token.cancel();
        }
    }
}
