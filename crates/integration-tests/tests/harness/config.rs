//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;
use std::path::Path;

use revision_config::{Config, CorsConfig, InferenceConfig, UploadsConfig};
use secrecy::SecretString;

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Minimal defaults with uploads written under `upload_dir`
    pub fn new(upload_dir: &Path) -> Self {
        let mut config = Config::default();
        config.server.listen_address = Some(SocketAddr::from(([127, 0, 0, 1], 0)));
        config.uploads = UploadsConfig {
            directory: upload_dir.to_path_buf(),
            ..UploadsConfig::default()
        };
        config.inference = InferenceConfig {
            request_timeout: "5s".to_owned(),
            poll_interval: "10ms".to_owned(),
            poll_timeout: "5s".to_owned(),
            ..InferenceConfig::default()
        };

        Self { config }
    }

    /// Point the inference gateway at a mock Replicate backend
    pub fn with_replicate(mut self, base_url: &str) -> Self {
        self.config.inference.base_url = base_url.to_owned();
        self.config.inference.api_token = Some(SecretString::from("r8_test"));
        self
    }

    /// Drop the API token
    pub fn without_token(mut self) -> Self {
        self.config.inference.api_token = None;
        self
    }

    /// Override the model reference
    pub fn with_model(mut self, model: &str) -> Self {
        self.config.inference.model = model.to_owned();
        self
    }

    pub fn with_poll_timeout(mut self, timeout: &str) -> Self {
        self.config.inference.poll_timeout = timeout.to_owned();
        self
    }

    pub fn with_max_upload_bytes(mut self, limit: usize) -> Self {
        self.config.uploads.max_upload_bytes = limit;
        self
    }

    /// Set CORS configuration
    pub fn with_cors(mut self, config: CorsConfig) -> Self {
        self.config.server.cors = Some(config);
        self
    }

    /// Disable health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}
