//! HTTP client for the quote backend.

use crate::catalog::CatalogData;
use crate::jobs::{Job, JobWire};
use crate::poller::JobSource;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use std::path::Path;

/// Response of `POST /api/upload`.
#[derive(Debug, Deserialize)]
pub struct UploadResp {
    pub job_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// Response of the admin catalog update. The backend also sends a `success`
/// flag, but non-2xx handling in [`ApiClient::check`] already covers failure.
#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub struct UpdateResp {
    #[serde(default)]
    pub message: String,
}

/// Response of the admin approve/reject actions.
#[derive(Debug, Deserialize)]
struct ActionResp {
    #[allow(dead_code)]
    success: bool,
    #[serde(default)]
    message: String,
    job: JobWire,
}

/// Error body the backend attaches to non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Print options sent alongside the model file.
#[derive(Clone, Debug)]
pub struct PrintOptions {
    pub material_id: String,
    pub color_id: String,
    pub quality_id: String,
    pub fill_density: f64,
    pub enable_supports: bool,
}

/// Typed access to the backend endpoints. Cheap to clone; all calls share
/// one connection pool.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Surface the backend's own error message when one is present; fall
    /// back to the HTTP status otherwise.
    async fn check(resp: Response) -> Result<Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(e) => Err(anyhow!(e.error)),
            Err(_) => Err(anyhow!("backend returned {status}")),
        }
    }

    /// Upload a model with its print options and get the new job id.
    pub async fn upload_model(&self, path: &Path, options: &PrintOptions) -> Result<UploadResp> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("invalid file name: {}", path.display()))?
            .to_string();

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(filename),
            )
            .text("material_id", options.material_id.clone())
            .text("color_id", options.color_id.clone())
            .text("quality_id", options.quality_id.clone())
            .text("fill_density", options.fill_density.to_string())
            .text("enable_supports", options.enable_supports.to_string());

        let resp = self
            .http
            .post(self.url("/api/upload"))
            .multipart(form)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json::<UploadResp>().await?)
    }

    /// Fetch one job by id.
    pub async fn get_job(&self, job_id: &str) -> Result<Job> {
        let resp = self
            .http
            .get(self.url(&format!("/api/job/{}", urlencoding::encode(job_id))))
            .send()
            .await?;
        let wire = Self::check(resp).await?.json::<JobWire>().await?;
        Job::from_wire(wire)
    }

    /// Fetch the materials/colors/quality catalog.
    pub async fn get_materials(&self) -> Result<CatalogData> {
        let resp = self.http.get(self.url("/api/materials")).send().await?;
        Ok(Self::check(resp).await?.json::<CatalogData>().await?)
    }

    /// Replace the catalog (admin). No screen drives this yet; the endpoint
    /// is part of the backend surface.
    #[allow(dead_code)]
    pub async fn update_materials(&self, data: &CatalogData) -> Result<UpdateResp> {
        let resp = self
            .http
            .post(self.url("/api/materials"))
            .json(data)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json::<UpdateResp>().await?)
    }

    /// Fetch every job (admin). Malformed entries are logged and skipped so
    /// one bad payload cannot blank the whole list.
    pub async fn get_jobs(&self) -> Result<Vec<Job>> {
        let resp = self.http.get(self.url("/api/jobs")).send().await?;
        let wires = Self::check(resp).await?.json::<Vec<JobWire>>().await?;
        Ok(wires
            .into_iter()
            .filter_map(|w| match Job::from_wire(w) {
                Ok(job) => Some(job),
                Err(e) => {
                    tracing::warn!("skipping malformed job payload: {e}");
                    None
                }
            })
            .collect())
    }

    /// Approve a completed job (admin).
    pub async fn approve_job(&self, job_id: &str) -> Result<(String, Job)> {
        self.job_action(job_id, "approve").await
    }

    /// Reject a completed job (admin).
    pub async fn reject_job(&self, job_id: &str) -> Result<(String, Job)> {
        self.job_action(job_id, "reject").await
    }

    async fn job_action(&self, job_id: &str, action: &str) -> Result<(String, Job)> {
        let resp = self
            .http
            .post(self.url(&format!(
                "/api/job/{}/{}",
                urlencoding::encode(job_id),
                action
            )))
            .send()
            .await?;
        let action_resp = Self::check(resp).await?.json::<ActionResp>().await?;
        Ok((action_resp.message, Job::from_wire(action_resp.job)?))
    }

    /// Probe for a stored model file, following the server-side `.3mf` to
    /// `.stl` conversion when the original name is gone. Returns the name
    /// that answered the HEAD request, if any.
    pub async fn probe_model_file(&self, filename: &str) -> Result<Option<String>> {
        if self.head_exists(filename).await? {
            return Ok(Some(filename.to_string()));
        }
        if let Some(converted) = stl_fallback(filename) {
            if self.head_exists(&converted).await? {
                return Ok(Some(converted));
            }
        }
        Ok(None)
    }

    async fn head_exists(&self, filename: &str) -> Result<bool> {
        let resp = self
            .http
            .head(self.url(&format!("/api/file/{}", urlencoding::encode(filename))))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    /// Download the raw model bytes for preview.
    pub async fn download_model_file(&self, filename: &str) -> Result<Vec<u8>> {
        let resp = self
            .http
            .get(self.url(&format!("/api/file/{}", urlencoding::encode(filename))))
            .send()
            .await?;
        Ok(Self::check(resp).await?.bytes().await?.to_vec())
    }
}

#[async_trait]
impl JobSource for ApiClient {
    async fn fetch_job(&self, job_id: &str) -> Result<Job> {
        self.get_job(job_id).await
    }
}

/// Name of the server-converted copy for a `.3mf` upload.
fn stl_fallback(filename: &str) -> Option<String> {
    filename
        .strip_suffix(".3mf")
        .map(|stem| format!("{stem}.stl"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let api = ApiClient::new("http://localhost:5000/");
        assert_eq!(api.url("/api/jobs"), "http://localhost:5000/api/jobs");
    }

    #[test]
    fn test_stl_fallback_only_for_3mf() {
        assert_eq!(stl_fallback("widget.3mf"), Some("widget.stl".into()));
        assert_eq!(stl_fallback("widget.stl"), None);
        assert_eq!(stl_fallback("widget.obj"), None);
    }

    #[test]
    fn test_update_resp_tolerates_extra_backend_fields() {
        let resp: UpdateResp =
            serde_json::from_str(r#"{"success": true, "message": "catalog saved"}"#).unwrap();
        assert_eq!(resp.message, "catalog saved");

        let bare: UpdateResp = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert_eq!(bare.message, "");
    }

    #[test]
    fn test_job_path_encodes_id() {
        let api = ApiClient::new("http://localhost:5000");
        let url = api.url(&format!("/api/job/{}", urlencoding::encode("a b/c")));
        assert_eq!(url, "http://localhost:5000/api/job/a%20b%2Fc");
    }
}
