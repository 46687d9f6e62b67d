//! Background worker handling backend API calls and job polling.

use crate::{
    api::{ApiClient, PrintOptions},
    catalog::CatalogData,
    config::Config,
    jobs::{Job, JobStatus},
    poller::{self, PollHandle, PollSettings, PollUpdate},
    validate,
};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::sync::mpsc;

/// Commands sent from the UI to the worker.
#[derive(Debug)]
pub enum WorkerCmd {
    /// Fetch the materials/colors/quality catalog.
    LoadMaterials,
    /// Validate and upload a model, then start polling the new job.
    Upload {
        path: PathBuf,
        options: PrintOptions,
    },
    /// Stop polling the active job (page teardown).
    CancelPoll,
    /// Fetch every job for the admin screen.
    LoadAllJobs,
    /// Approve a completed job (admin).
    ApproveJob(String),
    /// Reject a completed job (admin).
    RejectJob(String),
    /// Download a stored model file to the working directory (admin).
    SaveModelFile { filename: String },
    /// Persist and apply updated settings.
    SaveSettings(Config),
}

/// Events emitted by the worker for UI updates.
#[derive(Clone, Debug)]
pub enum WorkerEvent {
    /// Catalog loaded or reloaded.
    MaterialsLoaded(CatalogData),
    /// Upload accepted; polling has started for this job.
    UploadAccepted { job_id: String, message: String },
    /// Non-terminal poll tick, for display only.
    PollProgress { job_id: String, status: JobStatus },
    /// The polled job turned terminal (completed or failed).
    JobFinished(Box<Job>),
    /// Polling hit the configured attempt bound.
    PollGaveUp { job_id: String, attempts: u32 },
    /// Admin job list loaded.
    JobsLoaded(Vec<Job>),
    /// An approve/reject action went through.
    JobActioned { message: String, job: Box<Job> },
    /// Informational log message.
    Log(String),
    /// User-visible error message.
    Error(String),
}

/// A poll in flight: the handle keeps the task alive, the receiver carries
/// its updates. Dropping the pair cancels the poll.
struct ActivePoll {
    job_id: String,
    handle: PollHandle,
    rx: mpsc::Receiver<PollUpdate>,
}

/// Main worker loop: handle commands sequentially, forwarding poll updates
/// as they arrive.
pub async fn run(mut rx: mpsc::Receiver<WorkerCmd>, tx: mpsc::Sender<WorkerEvent>, mut cfg: Config) {
    let mut api = ApiClient::new(&cfg.backend.base_url);
    let mut active: Option<ActivePoll> = None;
    tracing::info!("worker started");

    loop {
        // Wait on either a UI command or an update from the active poll.
        let poll_update = async {
            match active.as_mut() {
                Some(poll) => poll.rx.recv().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            cmd = rx.recv() => {
                let Some(cmd) = cmd else { break };
                handle_cmd(cmd, &mut api, &mut cfg, &mut active, &tx).await;
            }
            update = poll_update => {
                let job_id = active
                    .as_ref()
                    .map(|p| p.job_id.clone())
                    .unwrap_or_default();
                match update {
                    Some(PollUpdate::Progress(status)) => {
                        let _ = tx.send(WorkerEvent::PollProgress { job_id, status }).await;
                    }
                    Some(PollUpdate::Terminal(job)) => {
                        active = None;
                        let _ = tx.send(WorkerEvent::JobFinished(job)).await;
                    }
                    Some(PollUpdate::GaveUp { attempts }) => {
                        active = None;
                        let _ = tx.send(WorkerEvent::PollGaveUp { job_id, attempts }).await;
                    }
                    // Poll task ended without a terminal update (cancelled).
                    None => active = None,
                }
            }
        }
    }
    tracing::info!("worker stopped");
}

async fn handle_cmd(
    cmd: WorkerCmd,
    api: &mut ApiClient,
    cfg: &mut Config,
    active: &mut Option<ActivePoll>,
    tx: &mpsc::Sender<WorkerEvent>,
) {
    match cmd {
        WorkerCmd::LoadMaterials => {
            tracing::info!("loading materials");
            match api.get_materials().await {
                Ok(data) => {
                    tracing::info!("catalog loaded: {} materials", data.materials.len());
                    let _ = tx.send(WorkerEvent::MaterialsLoaded(data)).await;
                }
                Err(e) => {
                    tracing::error!("materials load failed: {e}");
                    let _ = tx
                        .send(WorkerEvent::Error(format!("failed to load materials: {e}")))
                        .await;
                }
            }
        }

        WorkerCmd::Upload { path, options } => {
            // A fresh upload supersedes any poll still running.
            *active = None;

            if let Err(e) = validate::validate_model_file(&path, cfg.upload.max_file_size_mb) {
                let _ = tx.send(WorkerEvent::Error(e.to_string())).await;
                return;
            }

            tracing::info!("uploading {}", path.display());
            match api.upload_model(&path, &options).await {
                Ok(resp) => {
                    tracing::info!("upload accepted: job {}", resp.job_id);
                    let _ = tx
                        .send(WorkerEvent::UploadAccepted {
                            job_id: resp.job_id.clone(),
                            message: resp.message,
                        })
                        .await;
                    *active = Some(start_poll(api, cfg, resp.job_id));
                }
                Err(e) => {
                    tracing::error!("upload failed: {e}");
                    let _ = tx.send(WorkerEvent::Error(format!("upload failed: {e}"))).await;
                }
            }
        }

        WorkerCmd::CancelPoll => {
            if let Some(poll) = active.take() {
                tracing::info!("poll cancelled for job {}", poll.job_id);
                poll.handle.cancel();
            }
        }

        WorkerCmd::LoadAllJobs => match api.get_jobs().await {
            Ok(jobs) => {
                tracing::info!("job list loaded: {} jobs", jobs.len());
                let _ = tx.send(WorkerEvent::JobsLoaded(jobs)).await;
            }
            Err(e) => {
                tracing::error!("job list failed: {e}");
                let _ = tx.send(WorkerEvent::Error(format!("failed to load jobs: {e}"))).await;
            }
        },

        WorkerCmd::ApproveJob(job_id) => {
            job_action(api.approve_job(&job_id).await, "approve", &job_id, tx).await;
        }

        WorkerCmd::RejectJob(job_id) => {
            job_action(api.reject_job(&job_id).await, "reject", &job_id, tx).await;
        }

        WorkerCmd::SaveModelFile { filename } => match save_model_file(api, &filename).await {
            Ok(saved) => {
                tracing::info!("model file saved: {saved}");
                let _ = tx.send(WorkerEvent::Log(format!("Saved {saved}"))).await;
            }
            Err(e) => {
                tracing::error!("model download failed for {filename}: {e}");
                let _ = tx
                    .send(WorkerEvent::Error(format!("model download failed: {e}")))
                    .await;
            }
        },

        WorkerCmd::SaveSettings(new_cfg) => {
            tracing::info!("settings updated");
            *api = ApiClient::new(&new_cfg.backend.base_url);
            *cfg = new_cfg;
            let _ = tx.send(WorkerEvent::Log("settings updated".into())).await;
        }
    }
}

/// Spawn the poller for a freshly accepted job.
fn start_poll(api: &ApiClient, cfg: &Config, job_id: String) -> ActivePoll {
    let (poll_tx, poll_rx) = mpsc::channel(64);
    let settings = PollSettings {
        interval: Duration::from_millis(cfg.poll.interval_ms),
        max_attempts: cfg.poll.max_attempts,
    };
    let handle = poller::spawn(Arc::new(api.clone()), job_id.clone(), settings, poll_tx);
    ActivePoll {
        job_id,
        handle,
        rx: poll_rx,
    }
}

/// Probe for the stored file (following the `.3mf` conversion) and write a
/// local copy under the name that answered.
async fn save_model_file(api: &ApiClient, filename: &str) -> anyhow::Result<String> {
    let Some(stored) = api.probe_model_file(filename).await? else {
        anyhow::bail!("no stored file found for {filename}");
    };
    let bytes = api.download_model_file(&stored).await?;
    tokio::fs::write(&stored, &bytes).await?;
    Ok(format!("{stored} ({} bytes)", bytes.len()))
}

async fn job_action(
    result: anyhow::Result<(String, Job)>,
    action: &str,
    job_id: &str,
    tx: &mpsc::Sender<WorkerEvent>,
) {
    match result {
        Ok((message, job)) => {
            tracing::info!("{action} ok for job {job_id}");
            let _ = tx
                .send(WorkerEvent::JobActioned {
                    message,
                    job: Box::new(job),
                })
                .await;
        }
        Err(e) => {
            tracing::error!("{action} failed for job {job_id}: {e}");
            let _ = tx
                .send(WorkerEvent::Error(format!("{action} failed: {e}")))
                .await;
        }
    }
}
