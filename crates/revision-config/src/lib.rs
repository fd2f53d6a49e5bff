#![allow(clippy::must_use_candidate)]

pub mod cors;
mod env;
pub mod health;
pub mod inference;
mod loader;
pub mod server;
pub mod telemetry;
pub mod uploads;

use serde::Deserialize;

pub use cors::*;
pub use health::*;
pub use inference::*;
pub use server::*;
pub use telemetry::*;
pub use uploads::*;

/// Top-level ReVision configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Upload directory and retention policy
    #[serde(default)]
    pub uploads: UploadsConfig,
    /// Remote image generation model
    #[serde(default)]
    pub inference: InferenceConfig,
    /// Logging configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Parse a human-readable duration such as `"90s"` or `"24h"`
pub(crate) fn parse_duration(field: &str, value: &str) -> anyhow::Result<std::time::Duration> {
    duration_str::parse(value).map_err(|e| anyhow::anyhow!("invalid duration for {field} '{value}': {e}"))
}
