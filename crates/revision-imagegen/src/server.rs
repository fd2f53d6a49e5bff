use std::time::Duration;

use revision_config::Config;

use crate::{
    error::{ImageGenError, Result},
    provider::{ImageGenProvider, replicate::ReplicateProvider},
    request::GenerateForm,
    types::{GenerateResponse, GenerationRequest},
    uploads::UploadStore,
};

/// Generation service: validates forms, persists uploads, calls the provider
pub struct Server {
    provider: Box<dyn ImageGenProvider>,
    uploads: UploadStore,
    default_strength: f64,
    num_inference_steps: u32,
    guidance_scale: f64,
    retention: Option<Duration>,
    sweep_interval: Duration,
}

impl Server {
    /// Handle one generation form end to end
    ///
    /// Validation happens before anything touches the disk. The uploaded
    /// file stays in place whether or not the provider call succeeds.
    pub async fn generate(&self, form: GenerateForm) -> Result<GenerateResponse> {
        let form = form.validate()?;
        let strength = parse_strength(form.strength.as_deref(), self.default_strength)?;

        let path = self.uploads.persist(&form.filename, &form.bytes).await?;
        let image = self.uploads.read(&path).await?;

        let request = GenerationRequest {
            image,
            content_type: form.content_type,
            prompt: form.prompt,
            strength,
            num_inference_steps: self.num_inference_steps,
            guidance_scale: self.guidance_scale,
        };

        tracing::debug!(
            provider = self.provider.name(),
            upload = %path.display(),
            strength,
            "calling image generation provider"
        );

        let output = self.provider.generate(&request).await?;

        tracing::info!(result = %output, "generation complete");

        Ok(GenerateResponse { result_url: output })
    }

    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    /// Configured upload retention and sweep interval, if retention is enabled
    pub fn retention_policy(&self) -> Option<(Duration, Duration)> {
        self.retention.map(|retention| (retention, self.sweep_interval))
    }
}

/// Parse the optional `strength` field, falling back to `default`
fn parse_strength(raw: Option<&str>, default: f64) -> Result<f64> {
    let Some(raw) = raw else {
        return Ok(default);
    };

    let invalid = |reason: String| ImageGenError::InvalidStrength {
        value: raw.to_string(),
        reason,
    };

    let strength = raw.trim().parse::<f64>().map_err(|e| invalid(e.to_string()))?;

    // NaN and infinities would serialize as JSON null
    if !strength.is_finite() {
        return Err(invalid("not a finite number".to_string()));
    }

    Ok(strength)
}

/// Builder for constructing the generation service from configuration
pub struct ImageGenServerBuilder<'a> {
    config: &'a Config,
    provider: Option<Box<dyn ImageGenProvider>>,
}

impl<'a> ImageGenServerBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config, provider: None }
    }

    /// Use `provider` instead of the configured Replicate client
    #[must_use]
    pub fn provider(mut self, provider: Box<dyn ImageGenProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn build(self) -> Result<Server> {
        let uploads_config = &self.config.uploads;
        let inference = &self.config.inference;

        let uploads = UploadStore::open(&uploads_config.directory)?;

        let retention = uploads_config
            .retention_duration()
            .map_err(|e| ImageGenError::ConfigError(e.to_string()))?;
        let sweep_interval = uploads_config
            .sweep_interval_duration()
            .map_err(|e| ImageGenError::ConfigError(e.to_string()))?;

        let provider = match self.provider {
            Some(provider) => provider,
            None => Box::new(ReplicateProvider::from_config(inference)?),
        };

        tracing::debug!(
            provider = provider.name(),
            model = %inference.model,
            upload_directory = %uploads.directory().display(),
            "image generation server initialized"
        );

        Ok(Server {
            provider,
            uploads,
            default_strength: inference.default_strength,
            num_inference_steps: inference.num_inference_steps,
            guidance_scale: inference.guidance_scale,
            retention,
            sweep_interval,
        })
    }
}
