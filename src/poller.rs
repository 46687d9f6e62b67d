//! Cancellable polling of a print-preparation job until it turns terminal.
//!
//! `spawn` returns a handle owning the poll task. The terminal job is
//! delivered exactly once; cancelling (or dropping the handle) aborts the
//! task so no fetch or delivery can happen after teardown.

use crate::jobs::{Job, JobStatus};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Where job payloads come from. The HTTP client implements this; tests
/// substitute a scripted source.
#[async_trait]
pub trait JobSource: Send + Sync + 'static {
    async fn fetch_job(&self, job_id: &str) -> Result<Job>;
}

/// Poll cadence and the optional give-up bound.
#[derive(Clone, Copy, Debug)]
pub struct PollSettings {
    pub interval: Duration,
    /// `None` polls until the job turns terminal or the caller cancels,
    /// matching the shop frontend's behavior.
    pub max_attempts: Option<u32>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(3000),
            max_attempts: None,
        }
    }
}

/// Updates emitted while polling.
#[derive(Clone, Debug)]
pub enum PollUpdate {
    /// Non-terminal tick; carried only for display.
    Progress(JobStatus),
    /// Final job payload. Sent at most once, then the task ends. A job that
    /// reached `failed` arrives here too, carrying its error message.
    Terminal(Box<Job>),
    /// The configured attempt bound ran out before the job turned terminal.
    GaveUp { attempts: u32 },
}

/// Owner of a running poll task. Dropping it cancels the poll.
pub struct PollHandle {
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Stop polling. No fetches or updates are issued after this returns.
    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start polling `job_id`. The first fetch happens immediately; if it is
/// already terminal no interval sleep ever runs.
pub fn spawn(
    source: Arc<dyn JobSource>,
    job_id: String,
    settings: PollSettings,
    updates: mpsc::Sender<PollUpdate>,
) -> PollHandle {
    let task = tokio::spawn(async move {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match source.fetch_job(&job_id).await {
                Ok(job) => {
                    if job.status().is_poll_terminal() {
                        tracing::info!(
                            "job {job_id} terminal ({}) after {attempts} polls",
                            job.status().label()
                        );
                        let _ = updates.send(PollUpdate::Terminal(Box::new(job))).await;
                        return;
                    }
                    let _ = updates.send(PollUpdate::Progress(job.status())).await;
                }
                Err(e) => {
                    // Network blips are tolerated; retry on the next tick.
                    tracing::warn!("poll fetch failed for {job_id}: {e}");
                }
            }
            if let Some(max) = settings.max_attempts {
                if attempts >= max {
                    tracing::warn!("giving up on job {job_id} after {attempts} polls");
                    let _ = updates.send(PollUpdate::GaveUp { attempts }).await;
                    return;
                }
            }
            sleep(settings.interval).await;
        }
    });
    PollHandle { task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{JobResult, JobState, PriceInfo};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn job_with_state(state: JobState) -> Job {
        Job {
            id: "job-1".into(),
            filename: "widget.stl".into(),
            original_filename: "widget.stl".into(),
            material_id: "pla".into(),
            color_id: "white".into(),
            quality_id: None,
            fill_density: 0.15,
            enable_supports: true,
            created_at: None,
            state,
        }
    }

    fn completed_job() -> Job {
        job_with_state(JobState::Completed(JobResult {
            filament_used_g: 10.0,
            estimated_time: "1h".into(),
            has_supports: false,
            size: Default::default(),
            volume_cm3: 5.0,
            fill_density: 0.15,
            price_info: Some(PriceInfo::default()),
        }))
    }

    /// Replays a fixed sequence of responses, counting fetches.
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<Job>>>,
        calls: AtomicU32,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<Job>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JobSource for ScriptedSource {
        async fn fetch_job(&self, _job_id: &str) -> Result<Job> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.responses.lock().unwrap().pop_front() {
                Some(resp) => resp,
                // Exhausted scripts keep reporting a non-terminal job.
                None => Ok(job_with_state(JobState::Pending)),
            }
        }
    }

    fn fast_settings(max_attempts: Option<u32>) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(3000),
            max_attempts,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_terminal_and_delivers_once() {
        let source = ScriptedSource::new(vec![
            Ok(job_with_state(JobState::Pending)),
            Ok(job_with_state(JobState::Pending)),
            Ok(job_with_state(JobState::Processing)),
            Ok(completed_job()),
        ]);
        let (tx, mut rx) = mpsc::channel(16);
        let _handle = spawn(source.clone(), "job-1".into(), fast_settings(None), tx);

        let mut progress = 0;
        let mut terminals = 0;
        while let Some(update) = rx.recv().await {
            match update {
                PollUpdate::Progress(_) => progress += 1,
                PollUpdate::Terminal(job) => {
                    terminals += 1;
                    assert!(matches!(job.state, JobState::Completed(_)));
                }
                PollUpdate::GaveUp { .. } => panic!("unexpected give-up"),
            }
        }
        assert_eq!(source.calls(), 4);
        assert_eq!(progress, 3);
        assert_eq!(terminals, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_on_first_fetch_means_single_poll() {
        let source = ScriptedSource::new(vec![Ok(completed_job())]);
        let (tx, mut rx) = mpsc::channel(16);
        let _handle = spawn(source.clone(), "job-1".into(), fast_settings(None), tx);

        match rx.recv().await {
            Some(PollUpdate::Terminal(_)) => {}
            other => panic!("expected terminal, got {other:?}"),
        }
        assert!(rx.recv().await.is_none());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_is_a_successful_poll_outcome() {
        let source = ScriptedSource::new(vec![Ok(job_with_state(JobState::Failed {
            error: "Mesh not manifold".into(),
        }))]);
        let (tx, mut rx) = mpsc::channel(16);
        let _handle = spawn(source.clone(), "job-1".into(), fast_settings(None), tx);

        match rx.recv().await {
            Some(PollUpdate::Terminal(job)) => match job.state {
                JobState::Failed { error } => assert_eq!(error, "Mesh not manifold"),
                other => panic!("unexpected state: {other:?}"),
            },
            other => panic!("expected terminal, got {other:?}"),
        }
        assert!(rx.recv().await.is_none());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_fetch_error_does_not_abort_polling() {
        let source = ScriptedSource::new(vec![
            Err(anyhow::anyhow!("connection reset")),
            Ok(job_with_state(JobState::Processing)),
            Ok(completed_job()),
        ]);
        let (tx, mut rx) = mpsc::channel(16);
        let _handle = spawn(source.clone(), "job-1".into(), fast_settings(None), tx);

        let mut terminals = 0;
        while let Some(update) = rx.recv().await {
            if let PollUpdate::Terminal(_) = update {
                terminals += 1;
            }
        }
        assert_eq!(terminals, 1);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_fetches_and_delivery() {
        // Script is empty: every fetch reports pending, forever.
        let source = ScriptedSource::new(vec![]);
        let (tx, mut rx) = mpsc::channel(16);
        let handle = spawn(source.clone(), "job-1".into(), fast_settings(None), tx);

        // Let a couple of polls happen.
        assert!(matches!(rx.recv().await, Some(PollUpdate::Progress(_))));
        assert!(matches!(rx.recv().await, Some(PollUpdate::Progress(_))));

        handle.cancel();
        let calls_at_cancel = source.calls();

        // Drain anything already buffered: the channel must close without a
        // terminal update, and no further polls run even as virtual time
        // keeps advancing.
        while let Some(update) = rx.recv().await {
            assert!(matches!(update, PollUpdate::Progress(_)));
        }
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(source.calls() <= calls_at_cancel + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_attempts_gives_up() {
        let source = ScriptedSource::new(vec![]);
        let (tx, mut rx) = mpsc::channel(16);
        let _handle = spawn(source.clone(), "job-1".into(), fast_settings(Some(3)), tx);

        let mut gave_up = None;
        while let Some(update) = rx.recv().await {
            match update {
                PollUpdate::Progress(_) => {}
                PollUpdate::GaveUp { attempts } => gave_up = Some(attempts),
                PollUpdate::Terminal(_) => panic!("unexpected terminal"),
            }
        }
        assert_eq!(gave_up, Some(3));
        assert_eq!(source.calls(), 3);
    }
}
