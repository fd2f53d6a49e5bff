use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use reqwest::Client;
use revision_config::{InferenceConfig, ModelReference};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::ImageGenProvider;
use crate::{
    error::{ImageGenError, Result},
    http_client::http_client,
    types::GenerationRequest,
};

/// Replicate predictions API provider
pub(crate) struct ReplicateProvider {
    client: Client,
    api_token: Option<SecretString>,
    base_url: String,
    model: ModelReference,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl ReplicateProvider {
    /// Create the provider and its HTTP client from configuration
    pub fn from_config(config: &InferenceConfig) -> Result<Self> {
        let model = ModelReference::parse(&config.model).map_err(|e| ImageGenError::ConfigError(e.to_string()))?;
        let request_timeout = config
            .request_timeout_duration()
            .map_err(|e| ImageGenError::ConfigError(e.to_string()))?;
        let poll_interval = config
            .poll_interval_duration()
            .map_err(|e| ImageGenError::ConfigError(e.to_string()))?;
        let poll_timeout = config
            .poll_timeout_duration()
            .map_err(|e| ImageGenError::ConfigError(e.to_string()))?;

        let client = http_client(request_timeout)
            .map_err(|e| ImageGenError::ConfigError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_token: config.api_token().cloned(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model,
            poll_interval,
            poll_timeout,
        })
    }

    /// Versioned models go through `/predictions`, unversioned ones through
    /// the model's own endpoint
    fn predictions_url(&self) -> String {
        match self.model.version {
            Some(_) => format!("{}/predictions", self.base_url),
            None => format!(
                "{}/models/{}/{}/predictions",
                self.base_url, self.model.owner, self.model.name
            ),
        }
    }

    fn wire_request<'a>(&'a self, request: &'a GenerationRequest) -> CreatePrediction<'a> {
        CreatePrediction {
            version: self.model.version.as_deref(),
            input: PredictionInput {
                image: data_uri(&request.image, request.content_type.as_deref()),
                prompt: &request.prompt,
                image_to_image_strength: request.strength,
                num_inference_steps: request.num_inference_steps,
                guidance_scale: request.guidance_scale,
            },
        }
    }

    /// Poll until the prediction reaches a terminal state or the deadline passes
    async fn settle(&self, mut prediction: Prediction, token: &SecretString) -> Result<Prediction> {
        let deadline = Instant::now() + self.poll_timeout;

        loop {
            match prediction.status {
                PredictionStatus::Succeeded => return Ok(prediction),
                PredictionStatus::Failed | PredictionStatus::Canceled => {
                    return Err(ImageGenError::PredictionFailed(prediction.failure_message()));
                }
                PredictionStatus::Starting | PredictionStatus::Processing | PredictionStatus::Unknown => {}
            }

            let poll_url = prediction
                .urls
                .and_then(|urls| urls.get)
                .ok_or_else(|| ImageGenError::InvalidResponse("prediction is missing a poll URL".to_string()))?;

            if Instant::now() >= deadline {
                tracing::error!(model = %self.model, "prediction polling timed out");
                return Err(ImageGenError::Timeout(self.poll_timeout));
            }

            tokio::time::sleep(self.poll_interval).await;

            tracing::debug!(%poll_url, "polling prediction");

            let response = self
                .client
                .get(&poll_url)
                .bearer_auth(token.expose_secret())
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Replicate poll request failed");
                    ImageGenError::ConnectionError(format!("Failed to poll Replicate prediction: {e}"))
                })?;

            prediction = read_prediction(response).await?;
        }
    }
}

/// Turn a Replicate HTTP response into a prediction or a typed error
async fn read_prediction(response: reqwest::Response) -> Result<Prediction> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        tracing::error!(status = %status, "Replicate API error");

        return Err(match status.as_u16() {
            401 | 403 => ImageGenError::AuthenticationFailed(error_text),
            _ => ImageGenError::ProviderApiError {
                status: status.as_u16(),
                message: error_text,
            },
        });
    }

    response.json::<Prediction>().await.map_err(|e| {
        tracing::error!(error = %e, "failed to parse Replicate prediction");
        ImageGenError::InvalidResponse(format!("unreadable prediction: {e}"))
    })
}

/// Encode image bytes as a `data:` URI, which Replicate accepts for file inputs
fn data_uri(bytes: &[u8], declared: Option<&str>) -> String {
    let mime = sniff_image_mime(bytes)
        .or_else(|| declared.filter(|ct| ct.starts_with("image/")))
        .unwrap_or("application/octet-stream");

    format!("data:{mime};base64,{}", BASE64.encode(bytes))
}

fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

/// Wire format for creating a prediction
#[derive(Serialize)]
struct CreatePrediction<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
    input: PredictionInput<'a>,
}

#[derive(Serialize)]
struct PredictionInput<'a> {
    image: String,
    prompt: &'a str,
    image_to_image_strength: f64,
    num_inference_steps: u32,
    guidance_scale: f64,
}

/// Wire format for a prediction as returned by create and poll calls
#[derive(Deserialize)]
struct Prediction {
    #[serde(default)]
    id: Option<String>,
    status: PredictionStatus,
    #[serde(default)]
    output: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
    #[serde(default)]
    urls: Option<PredictionUrls>,
}

impl Prediction {
    fn failure_message(&self) -> String {
        let id = self.id.as_deref().unwrap_or("unknown");
        let reason = match &self.error {
            Some(serde_json::Value::String(message)) => message.clone(),
            Some(serde_json::Value::Null) | None => format!("status {:?}", self.status),
            Some(other) => other.to_string(),
        };

        format!("prediction {id}: {reason}")
    }
}

#[derive(Deserialize)]
struct PredictionUrls {
    #[serde(default)]
    get: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

#[async_trait]
impl ImageGenProvider for ReplicateProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<serde_json::Value> {
        let token = self.api_token.as_ref().ok_or_else(|| {
            ImageGenError::AuthenticationFailed(
                "no Replicate API token configured (set REPLICATE_API_TOKEN)".to_string(),
            )
        })?;

        let url = self.predictions_url();

        tracing::debug!(
            model = %self.model,
            bytes = request.image.len(),
            strength = request.strength,
            "sending prediction request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token.expose_secret())
            .header("Prefer", "wait")
            .json(&self.wire_request(request))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(model = %self.model, error = %e, "prediction request failed");
                ImageGenError::ConnectionError(format!("Failed to send request to Replicate: {e}"))
            })?;

        let prediction = read_prediction(response).await?;
        let prediction = self.settle(prediction, token).await?;

        tracing::debug!(
            model = %self.model,
            id = prediction.id.as_deref().unwrap_or("unknown"),
            "prediction succeeded"
        );

        Ok(prediction.output.unwrap_or(serde_json::Value::Null))
    }

    fn name(&self) -> &str {
        "replicate"
    }
}
