#![allow(
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions
)]

mod error;
mod http_client;
mod provider;
mod request;
mod server;
mod types;
pub mod uploads;

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::post};

pub use error::{ErrorBody, ImageGenError, Result};
pub use provider::ImageGenProvider;
pub use request::{GenerateForm, UploadedImage};
pub use server::{ImageGenServerBuilder, Server};
pub use types::{GenerateResponse, GenerationRequest};

/// Build the image generation server from configuration
///
/// Creates the upload directory and the provider HTTP client; either
/// failing aborts startup.
///
/// # Errors
///
/// Returns an error if the server fails to initialize
pub fn build_server(config: &revision_config::Config) -> anyhow::Result<Arc<Server>> {
    let server = Arc::new(
        ImageGenServerBuilder::new(config)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to initialize image generation server: {e}"))?,
    );
    Ok(server)
}

/// Create the endpoint router for image generation
pub fn endpoint_router() -> Router<Arc<Server>> {
    Router::new().route("/generate", post(generate))
}

/// Handle image generation requests
async fn generate(State(server): State<Arc<Server>>, form: GenerateForm) -> Result<Json<GenerateResponse>> {
    tracing::debug!("image generation handler called");

    match server.generate(form).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            if e.status_code().is_server_error() {
                tracing::error!(error = %e, "error during generation");
            } else {
                tracing::warn!(error = %e, "rejected generation request");
            }
            Err(e)
        }
    }
}
