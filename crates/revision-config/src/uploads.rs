use std::{path::PathBuf, time::Duration};

use serde::Deserialize;

/// Upload body limit (32 MiB)
const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 << 20;

/// Where uploaded images land and how long they stay there
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UploadsConfig {
    /// Directory for persisted uploads, created on startup
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    /// Largest accepted request body in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Age after which uploads are deleted; unset keeps them forever
    #[serde(default)]
    pub retention: Option<String>,
    /// How often the retention sweep runs
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: String,
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            max_upload_bytes: default_max_upload_bytes(),
            retention: None,
            sweep_interval: default_sweep_interval(),
        }
    }
}

impl UploadsConfig {
    /// Parsed retention period, if one is configured
    ///
    /// # Errors
    ///
    /// Returns an error if the retention string is not a valid duration
    pub fn retention_duration(&self) -> anyhow::Result<Option<Duration>> {
        self.retention
            .as_deref()
            .map(|value| crate::parse_duration("uploads.retention", value))
            .transpose()
    }

    /// Parsed sweep interval
    ///
    /// # Errors
    ///
    /// Returns an error if the interval string is not a valid duration
    pub fn sweep_interval_duration(&self) -> anyhow::Result<Duration> {
        crate::parse_duration("uploads.sweep_interval", &self.sweep_interval)
    }
}

fn default_directory() -> PathBuf {
    PathBuf::from("uploads")
}

#[allow(clippy::missing_const_for_fn)]
fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_sweep_interval() -> String {
    "1h".to_string()
}
