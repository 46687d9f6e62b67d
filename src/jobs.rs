//! Job model: wire shape from the backend and the typed lifecycle state.

use anyhow::{Result, bail};
use serde::Deserialize;

/// Fallback shown when a failed job carries no error message of its own.
pub const GENERIC_FAILURE: &str = "Processing failed. Please try again.";

/// Lifecycle status as reported by the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Approved,
    Rejected,
}

impl JobStatus {
    /// Terminal with respect to polling. `approved`/`rejected` never appear
    /// mid-poll, but a re-fetch of an old job may see them.
    pub fn is_poll_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending | JobStatus::Processing)
    }

    /// Short label for tables and the status bar.
    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Approved => "approved",
            JobStatus::Rejected => "rejected",
        }
    }
}

/// Bounding box of the sliced model in millimeters.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct ModelSize {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

/// Server-computed cost components. Every field defaults to 0 when the
/// backend omits it so accumulation never sees a missing number.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct PriceInfo {
    #[serde(default)]
    pub material_cost: f64,
    #[serde(default)]
    pub time_cost: f64,
    #[serde(default)]
    pub color_addon: f64,
    #[serde(default)]
    pub material_modifier: f64,
    #[serde(default)]
    pub quality_modifier: f64,
    #[serde(default)]
    pub base_price: f64,
    #[serde(default)]
    pub base_price_with_markup: f64,
    #[serde(default)]
    pub total_price: f64,
}

/// Slicing output attached to a completed job.
#[derive(Clone, Debug, Deserialize)]
pub struct JobResult {
    #[serde(default)]
    pub filament_used_g: f64,
    #[serde(default)]
    pub estimated_time: String,
    #[serde(default)]
    pub has_supports: bool,
    #[serde(default)]
    pub size: ModelSize,
    #[serde(default)]
    pub volume_cm3: f64,
    #[serde(default)]
    pub fill_density: f64,
    /// Absent on some completed jobs; quoting treats that as a hard error
    /// distinct from a failed job.
    pub price_info: Option<PriceInfo>,
}

/// Flat job payload exactly as the backend serializes it.
#[derive(Clone, Debug, Deserialize)]
pub struct JobWire {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub original_filename: String,
    #[serde(default)]
    pub material_id: String,
    #[serde(default)]
    pub color_id: String,
    #[serde(default)]
    pub quality_id: Option<String>,
    #[serde(default)]
    pub fill_density: f64,
    #[serde(default)]
    pub enable_supports: bool,
    #[serde(default)]
    pub created_at: Option<f64>,
    #[serde(default)]
    pub result: Option<JobResult>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub approved_at: Option<f64>,
    #[serde(default)]
    pub rejected_at: Option<f64>,
}

/// Typed lifecycle state. Only completed-like states carry a result and only
/// `Failed` carries an error, so "completed without a result" cannot be
/// constructed.
#[derive(Clone, Debug)]
pub enum JobState {
    Pending,
    Processing,
    Completed(JobResult),
    Failed {
        error: String,
    },
    Approved {
        result: JobResult,
        approved_at: Option<f64>,
    },
    Rejected {
        rejected_at: Option<f64>,
    },
}

impl JobState {
    pub fn status(&self) -> JobStatus {
        match self {
            JobState::Pending => JobStatus::Pending,
            JobState::Processing => JobStatus::Processing,
            JobState::Completed(_) => JobStatus::Completed,
            JobState::Failed { .. } => JobStatus::Failed,
            JobState::Approved { .. } => JobStatus::Approved,
            JobState::Rejected { .. } => JobStatus::Rejected,
        }
    }
}

/// One submitted model and everything the backend knows about it.
#[derive(Clone, Debug)]
pub struct Job {
    pub id: String,
    pub filename: String,
    pub original_filename: String,
    pub material_id: String,
    pub color_id: String,
    pub quality_id: Option<String>,
    pub fill_density: f64,
    pub enable_supports: bool,
    pub created_at: Option<f64>,
    pub state: JobState,
}

impl Job {
    /// Validate the wire payload into the typed state. A completed job with
    /// no result is a malformed payload, rejected here so downstream code
    /// never has to re-check.
    pub fn from_wire(wire: JobWire) -> Result<Self> {
        let state = match wire.status {
            JobStatus::Pending => JobState::Pending,
            JobStatus::Processing => JobState::Processing,
            JobStatus::Completed => match wire.result {
                Some(result) => JobState::Completed(result),
                None => bail!("job {} reported completed without a result", wire.id),
            },
            JobStatus::Failed => JobState::Failed {
                error: wire.error.unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            },
            JobStatus::Approved => match wire.result {
                Some(result) => JobState::Approved {
                    result,
                    approved_at: wire.approved_at,
                },
                None => bail!("job {} reported approved without a result", wire.id),
            },
            JobStatus::Rejected => JobState::Rejected {
                rejected_at: wire.rejected_at,
            },
        };
        Ok(Job {
            id: wire.id,
            filename: wire.filename,
            original_filename: wire.original_filename,
            material_id: wire.material_id,
            color_id: wire.color_id,
            quality_id: wire.quality_id,
            fill_density: wire.fill_density,
            enable_supports: wire.enable_supports,
            created_at: wire.created_at,
            state,
        })
    }

    pub fn status(&self) -> JobStatus {
        self.state.status()
    }

    /// Result payload for states that carry one.
    pub fn result(&self) -> Option<&JobResult> {
        match &self.state {
            JobState::Completed(r) | JobState::Approved { result: r, .. } => Some(r),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> Result<Job> {
        Job::from_wire(serde_json::from_str::<JobWire>(json).unwrap())
    }

    #[test]
    fn test_completed_job_carries_result() {
        let job = decode(
            r#"{
                "id": "abc", "status": "completed",
                "result": {
                    "filament_used_g": 12.5, "estimated_time": "1h 20m",
                    "has_supports": true, "size": {"x": 10, "y": 20, "z": 5},
                    "volume_cm3": 8.2,
                    "price_info": {"base_price_with_markup": 20.0, "color_addon": 5.0}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(job.status(), JobStatus::Completed);
        let result = job.result().unwrap();
        assert_eq!(result.filament_used_g, 12.5);
        // Omitted price fields default to zero.
        let price = result.price_info.unwrap();
        assert_eq!(price.material_modifier, 0.0);
        assert_eq!(price.base_price_with_markup, 20.0);
    }

    #[test]
    fn test_completed_without_result_is_rejected() {
        let err = decode(r#"{"id": "abc", "status": "completed"}"#).unwrap_err();
        assert!(err.to_string().contains("without a result"));
    }

    #[test]
    fn test_failed_job_keeps_exact_message() {
        let job =
            decode(r#"{"id": "abc", "status": "failed", "error": "Mesh not manifold"}"#).unwrap();
        match &job.state {
            JobState::Failed { error } => assert_eq!(error, "Mesh not manifold"),
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[test]
    fn test_failed_job_without_message_gets_fallback() {
        let job = decode(r#"{"id": "abc", "status": "failed"}"#).unwrap();
        match &job.state {
            JobState::Failed { error } => assert_eq!(error, GENERIC_FAILURE),
            other => panic!("unexpected state: {other:?}"),
        }
    }

    #[test]
    fn test_poll_terminal_states() {
        assert!(!JobStatus::Pending.is_poll_terminal());
        assert!(!JobStatus::Processing.is_poll_terminal());
        assert!(JobStatus::Completed.is_poll_terminal());
        assert!(JobStatus::Failed.is_poll_terminal());
        assert!(JobStatus::Approved.is_poll_terminal());
    }
}
