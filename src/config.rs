//! Runtime settings assembled from the command line and environment.

use std::{path::PathBuf, time::Duration};

use anyhow::{ensure, Result};

use crate::{
    adjust::AspectRatio,
    gemini::{DEFAULT_API_BASE, DEFAULT_MODEL},
};

pub const DEFAULT_DOWNLOAD_DELAY_MS: u64 = 300;

#[derive(Clone, Debug)]
pub struct EditorConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    /// Per-request timeout. `None` waits as long as the service takes.
    pub timeout_secs: Option<u64>,
    pub crop_on_upload: bool,
    pub aspect_ratio: AspectRatio,
    pub download_dir: PathBuf,
    /// Pause between files when exporting a whole batch.
    pub download_delay: Duration,
    pub recursive: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: None,
            crop_on_upload: false,
            aspect_ratio: AspectRatio::Free,
            download_dir: PathBuf::from("."),
            download_delay: Duration::from_millis(DEFAULT_DOWNLOAD_DELAY_MS),
            recursive: false,
        }
    }
}

impl EditorConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.model.trim().is_empty(), "model name must not be empty");
        ensure!(
            self.api_base.starts_with("http://") || self.api_base.starts_with("https://"),
            "API base must be an http(s) URL, got {}",
            self.api_base
        );
        if let Some(secs) = self.timeout_secs {
            ensure!(secs > 0, "timeout must be at least one second");
        }
        ensure!(
            !self.download_dir.is_file(),
            "download directory {} is a file",
            self.download_dir.display()
        );
        Ok(())
    }

    pub fn has_credential(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }
}
