pub(crate) mod replicate;

use async_trait::async_trait;

use crate::{error::Result, types::GenerationRequest};

/// Boundary around a remote image-to-image model
///
/// Implementations return the provider's output untouched, typically a URL
/// string or a list of URL strings.
#[async_trait]
pub trait ImageGenProvider: Send + Sync {
    /// Run one generation and return the provider's output
    async fn generate(&self, request: &GenerationRequest) -> Result<serde_json::Value>;

    /// Get the provider name
    fn name(&self) -> &str;
}
