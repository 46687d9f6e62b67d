//! Config model and persistence helpers.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Top-level configuration stored in `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Quote backend connection settings.
    pub backend: BackendCfg,
    /// Job polling cadence.
    pub poll: PollCfg,
    /// Defaults applied to new uploads.
    pub upload: UploadCfg,
}

/// Where the quote backend lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendCfg {
    /// Base URL without a trailing slash, e.g. `http://localhost:5000`.
    pub base_url: String,
}

/// Polling behavior for submitted jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollCfg {
    /// Milliseconds between status fetches.
    pub interval_ms: u64,
    /// Optional bound on status fetches before giving up; absent means poll
    /// until the job turns terminal or the user navigates away.
    pub max_attempts: Option<u32>,
}

/// Print option defaults for the upload form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadCfg {
    /// Infill fraction, 0–1.
    pub fill_density: f64,
    /// Whether support material generation is requested.
    pub enable_supports: bool,
    /// Upload size ceiling in megabytes.
    pub max_file_size_mb: u64,
}

impl Config {
    /// Load from disk or create defaults when missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let s = fs::read_to_string(path)?;
            Ok(toml::from_str(&s)?)
        } else {
            let cfg = Self::default();
            cfg.save(path)?;
            Ok(cfg)
        }
    }

    /// Persist the config as pretty TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let s = toml::to_string_pretty(self)?;
        fs::write(path, s)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendCfg {
                base_url: "http://localhost:5000".into(),
            },
            poll: PollCfg {
                interval_ms: 3000,
                max_attempts: None,
            },
            upload: UploadCfg {
                fill_density: 0.15,
                enable_supports: true,
                max_file_size_mb: crate::validate::DEFAULT_MAX_FILE_SIZE_MB,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = Config::default();
        cfg.backend.base_url = "http://printfarm.local:5000".into();
        cfg.poll.max_attempts = Some(40);
        cfg.save(&path).unwrap();

        let loaded = Config::load_or_default(&path).unwrap();
        assert_eq!(loaded.backend.base_url, "http://printfarm.local:5000");
        assert_eq!(loaded.poll.interval_ms, 3000);
        assert_eq!(loaded.poll.max_attempts, Some(40));
        assert_eq!(loaded.upload.max_file_size_mb, 50);
    }

    #[test]
    fn test_missing_file_creates_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_or_default(&path).unwrap();
        assert_eq!(cfg.backend.base_url, "http://localhost:5000");
        assert!(path.exists());
    }
}
