use serde::{Deserialize, Serialize};

/// Everything the inference gateway needs for one image-to-image call
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Bytes of the persisted upload
    pub image: Vec<u8>,
    /// Content type the client declared for the upload, if any
    pub content_type: Option<String>,
    /// Text description of the desired result
    pub prompt: String,
    /// How far the output may drift from the input image
    pub strength: f64,
    /// Denoising steps
    pub num_inference_steps: u32,
    /// Classifier-free guidance scale
    pub guidance_scale: f64,
}

/// Successful generation response
///
/// `result_url` is whatever the provider produced, usually a URL string or
/// a list of them, relayed without interpretation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub result_url: serde_json::Value,
}
