//! TUI event loop, input dispatch and shared app state.

mod handlers;
mod render;

use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use std::{path::PathBuf, time::Duration};
use tokio::sync::mpsc;

use crate::{
    catalog::CatalogData,
    config::Config,
    events::{Screen, UiState},
    input::InputBoxState,
    jobs::{Job, JobState, JobStatus},
    session::SessionStore,
    shortcuts::Shortcuts,
    ui::Tui,
    worker::{self, WorkerCmd, WorkerEvent},
};

use handlers::{handle_key, is_ctrl_c};
use render::draw;

/// Where the active job currently stands, as seen by the UI.
#[derive(Clone, Debug)]
pub enum JobProgress {
    /// No job in flight.
    Idle,
    /// Upload request sent, waiting for the job id.
    Uploading,
    /// Polling; `pending` and `processing` land here, distinguished only
    /// for display.
    Waiting { job_id: String, status: JobStatus },
    /// Job completed; a quote can be computed.
    Ready(Box<Job>),
    /// Job failed; carries the backend's message (or the fallback).
    Failed { message: String },
    /// Polling hit its configured attempt bound.
    GaveUp { attempts: u32 },
}

/// App state shared between input handling and rendering.
pub struct App {
    /// Path of the persisted config file.
    pub cfg_path: PathBuf,
    /// Current settings in memory.
    pub cfg: Config,
    /// Screen, selection and status-line state.
    pub ui: UiState,
    /// Materials/colors/quality catalog, once loaded.
    pub catalog: Option<CatalogData>,
    /// The upload-to-checkout journey state and the cart.
    pub session: SessionStore,
    /// Active job progress.
    pub progress: JobProgress,
    /// Quantity on the quote screen.
    pub quantity: u32,
    /// Multi-part flag on the quote screen.
    pub is_multi_part: bool,
    /// Whether the current quote was already added to the cart.
    pub added_to_cart: bool,
    /// Admin screen job list.
    pub admin_jobs: Vec<Job>,
    /// Command channel to the worker.
    pub worker_tx: mpsc::Sender<WorkerCmd>,
    /// Event channel from the worker.
    pub worker_rx: mpsc::Receiver<WorkerEvent>,

    /// Model file path being edited on the upload screen.
    pub file_path: String,
    /// Cursor positions in the customize sections.
    pub color_idx: usize,
    pub material_idx: usize,
    pub quality_idx: usize,

    /// Settings screen edit buffers.
    pub base_url_buf: String,
    pub interval_buf: String,
    pub max_attempts_buf: String,

    /// Open input popup, if any.
    pub input_box: Option<InputBoxState>,
    /// Key bindings.
    pub shortcuts: Shortcuts,
}

/// Run the main TUI loop until the user quits.
pub async fn run_app(terminal: &mut Tui) -> Result<()> {
    let cfg_path = PathBuf::from("config.toml");
    let cfg = Config::load_or_default(&cfg_path)?;

    let shortcuts_path = PathBuf::from("shortcut.toml");
    let shortcuts = Shortcuts::load_or_default(&shortcuts_path)?;

    let (tx_cmd, rx_cmd) = mpsc::channel::<WorkerCmd>(64);
    let (tx_ev, rx_ev) = mpsc::channel::<WorkerEvent>(256);

    tokio::spawn(worker::run(rx_cmd, tx_ev, cfg.clone()));

    let mut app = App {
        cfg_path,
        base_url_buf: cfg.backend.base_url.clone(),
        interval_buf: cfg.poll.interval_ms.to_string(),
        max_attempts_buf: cfg
            .poll
            .max_attempts
            .map(|n| n.to_string())
            .unwrap_or_default(),
        cfg,
        ui: UiState::new(Screen::Upload),
        catalog: None,
        session: SessionStore::new(),
        progress: JobProgress::Idle,
        quantity: 1,
        is_multi_part: false,
        added_to_cart: false,
        admin_jobs: vec![],
        worker_tx: tx_cmd,
        worker_rx: rx_ev,
        file_path: String::new(),
        color_idx: 0,
        material_idx: 0,
        quality_idx: 0,
        input_box: None,
        shortcuts,
    };

    // Fetch the catalog right away; the customize screen needs it.
    app.worker_tx.send(WorkerCmd::LoadMaterials).await?;
    app.ui.status = "Loading materials...".into();

    loop {
        terminal.draw(|f| draw(f, &app))?;

        // Drain worker events before handling input.
        while let Ok(ev) = app.worker_rx.try_recv() {
            handle_worker_event(&mut app, ev);
        }

        // Short poll timeout keeps the UI responsive.
        if event::poll(Duration::from_millis(50))?
            && let Event::Key(k) = event::read()?
            && k.kind == KeyEventKind::Press
        {
            // Ctrl+C always quits, whatever the screen.
            if is_ctrl_c(&k) {
                break;
            }
            if handle_key(&mut app, k).await? {
                break;
            }
        }
    }
    Ok(())
}

/// Whether a poll update for `job_id` belongs to the job the UI is still
/// waiting on. Updates buffered before a teardown fail this check.
fn poll_is_active(app: &App, job_id: &str) -> bool {
    matches!(&app.progress, JobProgress::Waiting { job_id: active, .. } if active == job_id)
}

/// Apply a worker event to the UI state.
fn handle_worker_event(app: &mut App, ev: WorkerEvent) {
    match ev {
        WorkerEvent::MaterialsLoaded(data) => {
            app.ui.status = format!("Loaded {} materials", data.materials.len());
            // Park the quality cursor on the default level.
            app.quality_idx = data
                .quality_levels()
                .iter()
                .position(|l| l.id == crate::session::DEFAULT_QUALITY)
                .unwrap_or(0);
            app.catalog = Some(data);
        }
        WorkerEvent::UploadAccepted { job_id, message } => {
            // The user may have left the quote flow while the upload was in
            // flight; the worker will cancel the poll it just started, so
            // the ack must not resurrect the flow here.
            if !matches!(app.progress, JobProgress::Uploading) {
                tracing::debug!("dropping upload ack for abandoned flow: job {job_id}");
                return;
            }
            let model_name = PathBuf::from(&app.file_path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| app.file_path.clone());
            app.session.begin_job(model_name, job_id.clone());
            app.progress = JobProgress::Waiting {
                job_id,
                status: JobStatus::Pending,
            };
            app.ui.status = if message.is_empty() {
                "Upload accepted, preparing quote...".into()
            } else {
                message
            };
        }
        WorkerEvent::PollProgress { job_id, status } => {
            // Updates buffered in the channel when the poll was torn down
            // arrive a frame later; teardown is authoritative.
            if poll_is_active(app, &job_id) {
                app.progress = JobProgress::Waiting { job_id, status };
            }
        }
        WorkerEvent::JobFinished(job) => {
            if !poll_is_active(app, &job.id) {
                tracing::debug!("dropping result for inactive job {}", job.id);
                return;
            }
            match &job.state {
                JobState::Failed { error } => {
                    // The job's own message, verbatim; never a generic one
                    // when a specific one exists.
                    app.ui.error = Some(error.clone());
                    app.progress = JobProgress::Failed {
                        message: error.clone(),
                    };
                }
                _ => {
                    app.ui.status = "Quote ready".into();
                    app.ui.error = None;
                    app.progress = JobProgress::Ready(job);
                }
            }
        }
        WorkerEvent::PollGaveUp { job_id, attempts } => {
            if poll_is_active(app, &job_id) {
                app.ui.error = Some(format!(
                    "gave up waiting for job {job_id} after {attempts} checks"
                ));
                app.progress = JobProgress::GaveUp { attempts };
            }
        }
        WorkerEvent::JobsLoaded(jobs) => {
            app.ui.status = format!("Loaded {} jobs", jobs.len());
            app.admin_jobs = jobs;
            if app.ui.screen == Screen::Admin {
                app.ui.selected = 0;
            }
        }
        WorkerEvent::JobActioned { message, job } => {
            // Swap the updated job into the admin list.
            if let Some(existing) = app.admin_jobs.iter_mut().find(|j| j.id == job.id) {
                *existing = *job;
            }
            app.ui.status = if message.is_empty() {
                "Job updated".into()
            } else {
                message
            };
        }
        WorkerEvent::Log(s) => {
            app.ui.status = s.clone();
            app.ui.log.push(s);
        }
        WorkerEvent::Error(s) => {
            // An upload that never produced a job id must not leave the
            // quote view stuck on "uploading".
            if matches!(app.progress, JobProgress::Uploading) {
                app.progress = JobProgress::Failed { message: s.clone() };
            }
            app.ui.error = Some(s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{JobResult, PriceInfo};

    fn app_for_test() -> App {
        let (worker_tx, _cmd_rx) = mpsc::channel::<WorkerCmd>(8);
        let (_ev_tx, worker_rx) = mpsc::channel::<WorkerEvent>(8);
        let cfg = Config::default();
        App {
            cfg_path: PathBuf::from("config.toml"),
            base_url_buf: cfg.backend.base_url.clone(),
            interval_buf: cfg.poll.interval_ms.to_string(),
            max_attempts_buf: String::new(),
            cfg,
            ui: UiState::new(Screen::Quote),
            catalog: None,
            session: SessionStore::new(),
            progress: JobProgress::Idle,
            quantity: 1,
            is_multi_part: false,
            added_to_cart: false,
            admin_jobs: vec![],
            worker_tx,
            worker_rx,
            file_path: "widget.stl".into(),
            color_idx: 0,
            material_idx: 0,
            quality_idx: 0,
            input_box: None,
            shortcuts: Shortcuts::default(),
        }
    }

    fn completed_job(id: &str) -> Job {
        Job {
            id: id.into(),
            filename: "widget.stl".into(),
            original_filename: "widget.stl".into(),
            material_id: "pla".into(),
            color_id: "white".into(),
            quality_id: None,
            fill_density: 0.15,
            enable_supports: true,
            created_at: None,
            state: JobState::Completed(JobResult {
                filament_used_g: 10.0,
                estimated_time: "1h".into(),
                has_supports: false,
                size: Default::default(),
                volume_cm3: 5.0,
                fill_density: 0.15,
                price_info: Some(PriceInfo::default()),
            }),
        }
    }

    fn waiting(job_id: &str) -> JobProgress {
        JobProgress::Waiting {
            job_id: job_id.into(),
            status: JobStatus::Pending,
        }
    }

    #[test]
    fn test_buffered_updates_after_teardown_are_dropped() {
        let mut app = app_for_test();
        // Teardown already happened: the poll was cancelled and the flow
        // reset, but these events were still sitting in the channel.
        app.progress = JobProgress::Idle;

        handle_worker_event(
            &mut app,
            WorkerEvent::PollProgress {
                job_id: "job-1".into(),
                status: JobStatus::Processing,
            },
        );
        assert!(matches!(app.progress, JobProgress::Idle));

        handle_worker_event(
            &mut app,
            WorkerEvent::JobFinished(Box::new(completed_job("job-1"))),
        );
        assert!(matches!(app.progress, JobProgress::Idle));

        handle_worker_event(
            &mut app,
            WorkerEvent::PollGaveUp {
                job_id: "job-1".into(),
                attempts: 5,
            },
        );
        assert!(matches!(app.progress, JobProgress::Idle));
        assert!(app.ui.error.is_none());
    }

    #[test]
    fn test_upload_ack_after_leaving_the_flow_is_dropped() {
        let mut app = app_for_test();
        app.progress = JobProgress::Idle;

        handle_worker_event(
            &mut app,
            WorkerEvent::UploadAccepted {
                job_id: "job-1".into(),
                message: String::new(),
            },
        );
        assert!(matches!(app.progress, JobProgress::Idle));
        assert!(app.session.job_id.is_none());
    }

    #[test]
    fn test_updates_for_the_waiting_job_apply() {
        let mut app = app_for_test();
        app.progress = waiting("job-1");

        handle_worker_event(
            &mut app,
            WorkerEvent::PollProgress {
                job_id: "job-1".into(),
                status: JobStatus::Processing,
            },
        );
        assert!(matches!(
            app.progress,
            JobProgress::Waiting {
                status: JobStatus::Processing,
                ..
            }
        ));

        handle_worker_event(
            &mut app,
            WorkerEvent::JobFinished(Box::new(completed_job("job-1"))),
        );
        assert!(matches!(app.progress, JobProgress::Ready(_)));
    }

    #[test]
    fn test_update_for_a_different_job_is_ignored() {
        let mut app = app_for_test();
        app.progress = waiting("job-2");

        handle_worker_event(
            &mut app,
            WorkerEvent::PollProgress {
                job_id: "job-1".into(),
                status: JobStatus::Processing,
            },
        );
        handle_worker_event(
            &mut app,
            WorkerEvent::JobFinished(Box::new(completed_job("job-1"))),
        );
        assert!(matches!(
            app.progress,
            JobProgress::Waiting {
                status: JobStatus::Pending,
                ..
            }
        ));
    }
}
