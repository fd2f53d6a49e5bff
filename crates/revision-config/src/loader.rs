use std::{path::Path, time::Duration};

use crate::{AnyOrArray, Config, ModelReference};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml_str(&raw)
    }

    /// Parse configuration from raw TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if environment variable expansion, parsing, or
    /// validation fails
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if a duration or model reference is malformed,
    /// or a limit is out of range
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_server_config()?;
        self.validate_uploads_config()?;
        self.validate_inference_config()?;
        Ok(())
    }

    fn validate_server_config(&self) -> anyhow::Result<()> {
        if self.server.health.enabled && !self.server.health.path.starts_with('/') {
            anyhow::bail!("server.health.path must start with '/'");
        }

        if let Some(ref cors) = self.server.cors {
            let wildcard = [&cors.origins, &cors.methods, &cors.headers]
                .into_iter()
                .any(|value| *value == AnyOrArray::Any);

            if cors.credentials && wildcard {
                anyhow::bail!("server.cors.credentials requires explicit origins, methods, and headers");
            }
        }

        Ok(())
    }

    fn validate_uploads_config(&self) -> anyhow::Result<()> {
        if self.uploads.max_upload_bytes == 0 {
            anyhow::bail!("uploads.max_upload_bytes must be greater than 0");
        }

        if self.uploads.retention_duration()? == Some(Duration::ZERO) {
            anyhow::bail!("uploads.retention must be greater than 0");
        }

        if self.uploads.sweep_interval_duration()?.is_zero() {
            anyhow::bail!("uploads.sweep_interval must be greater than 0");
        }

        if self.uploads.directory.as_os_str().is_empty() {
            anyhow::bail!("uploads.directory must not be empty");
        }

        Ok(())
    }

    fn validate_inference_config(&self) -> anyhow::Result<()> {
        ModelReference::parse(&self.inference.model).map_err(|e| anyhow::anyhow!("inference.model: {e}"))?;

        self.inference.request_timeout_duration()?;
        self.inference.poll_timeout_duration()?;

        if self.inference.poll_interval_duration()?.is_zero() {
            anyhow::bail!("inference.poll_interval must be greater than 0");
        }

        if self.inference.api_token().is_none() {
            tracing::debug!("no inference API token configured; generation requests will fail until one is set");
        }

        Ok(())
    }
}
