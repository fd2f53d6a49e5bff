use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Default Replicate API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.replicate.com/v1";

/// Stable Diffusion XL, pinned to the version the frontend was tuned against
pub const DEFAULT_MODEL: &str =
    "stability-ai/sdxl:39ed52f2a78e934b3ba6e2a89f5b1c712de7dfea535525255b1aa35c5565e08b";

/// Remote image generation model configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InferenceConfig {
    /// Replicate API token; checked on first use, not at startup
    #[serde(default)]
    pub api_token: Option<SecretString>,
    /// Base URL override
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model reference in `owner/name[:version]` form
    #[serde(default = "default_model")]
    pub model: String,
    /// Denoising steps sent with every prediction
    #[serde(default = "default_num_inference_steps")]
    pub num_inference_steps: u32,
    /// Classifier-free guidance scale sent with every prediction
    #[serde(default = "default_guidance_scale")]
    pub guidance_scale: f64,
    /// Strength used when a request omits the `strength` field
    #[serde(default = "default_strength")]
    pub default_strength: f64,
    /// Overall timeout for each HTTP call to the provider
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
    /// Delay between prediction status polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,
    /// Give up on a prediction that has not finished after this long
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout: String,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            base_url: default_base_url(),
            model: default_model(),
            num_inference_steps: default_num_inference_steps(),
            guidance_scale: default_guidance_scale(),
            default_strength: default_strength(),
            request_timeout: default_request_timeout(),
            poll_interval: default_poll_interval(),
            poll_timeout: default_poll_timeout(),
        }
    }
}

impl InferenceConfig {
    /// API token, treating an empty value as absent
    pub fn api_token(&self) -> Option<&SecretString> {
        self.api_token
            .as_ref()
            .filter(|token| !token.expose_secret().trim().is_empty())
    }

    /// # Errors
    ///
    /// Returns an error if the value is not a valid duration
    pub fn request_timeout_duration(&self) -> anyhow::Result<Duration> {
        crate::parse_duration("inference.request_timeout", &self.request_timeout)
    }

    /// # Errors
    ///
    /// Returns an error if the value is not a valid duration
    pub fn poll_interval_duration(&self) -> anyhow::Result<Duration> {
        crate::parse_duration("inference.poll_interval", &self.poll_interval)
    }

    /// # Errors
    ///
    /// Returns an error if the value is not a valid duration
    pub fn poll_timeout_duration(&self) -> anyhow::Result<Duration> {
        crate::parse_duration("inference.poll_timeout", &self.poll_timeout)
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_num_inference_steps() -> u32 {
    30
}

#[allow(clippy::missing_const_for_fn)]
fn default_guidance_scale() -> f64 {
    7.5
}

#[allow(clippy::missing_const_for_fn)]
fn default_strength() -> f64 {
    0.6
}

fn default_request_timeout() -> String {
    "120s".to_string()
}

fn default_poll_interval() -> String {
    "1s".to_string()
}

fn default_poll_timeout() -> String {
    "10m".to_string()
}

/// A parsed `owner/name[:version]` model reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReference {
    pub owner: String,
    pub name: String,
    pub version: Option<String>,
}

impl ModelReference {
    /// # Errors
    ///
    /// Returns an error unless the input has a non-empty owner and name,
    /// and a non-empty version when a `:` is present
    pub fn parse(input: &str) -> anyhow::Result<Self> {
        let input = input.trim();
        let (path, version) = match input.split_once(':') {
            Some((path, version)) => (path, Some(version)),
            None => (input, None),
        };

        let Some((owner, name)) = path.split_once('/') else {
            anyhow::bail!("model reference '{input}' must look like 'owner/name[:version]'");
        };

        if owner.is_empty() || name.is_empty() || name.contains('/') {
            anyhow::bail!("model reference '{input}' must look like 'owner/name[:version]'");
        }

        if version.is_some_and(str::is_empty) {
            anyhow::bail!("model reference '{input}' has an empty version");
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
            version: version.map(str::to_string),
        })
    }
}

impl std::fmt::Display for ModelReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)?;
        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }
        Ok(())
    }
}
