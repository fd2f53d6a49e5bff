use axum::{
    body::Body,
    extract::{FromRequest, Multipart},
    http::{Request, header},
};

use crate::{error::ImageGenError, uploads::sanitize_filename};

/// File part of a generation form
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Filename exactly as the client sent it
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Raw `POST /generate` form, before validation
///
/// Only the first occurrence of each field is kept. A part named `image`
/// without a filename is not a file part and is ignored.
#[derive(Debug, Clone, Default)]
pub struct GenerateForm {
    pub image: Option<UploadedImage>,
    pub prompt: Option<String>,
    pub strength: Option<String>,
}

/// A form that passed validation
#[derive(Debug, Clone)]
pub(crate) struct ValidatedForm {
    /// Final path component of the client filename
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub prompt: String,
    pub strength: Option<String>,
}

impl GenerateForm {
    /// Check the required fields, in order: presence of `image` and
    /// `prompt`, then a non-empty filename
    pub(crate) fn validate(self) -> Result<ValidatedForm, ImageGenError> {
        let (Some(image), Some(prompt)) = (self.image, self.prompt) else {
            return Err(ImageGenError::MissingField);
        };

        let filename = sanitize_filename(&image.filename)
            .ok_or(ImageGenError::EmptyFilename)?
            .to_string();

        Ok(ValidatedForm {
            filename,
            content_type: image.content_type,
            bytes: image.bytes,
            prompt,
            strength: self.strength,
        })
    }
}

impl<S> FromRequest<S> for GenerateForm
where
    S: Send + Sync,
{
    type Rejection = ImageGenError;

    async fn from_request(request: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"));

        // A non-multipart body carries no fields; validation reports them missing
        if !is_multipart {
            return Ok(Self::default());
        }

        let mut multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| ImageGenError::InvalidRequest(format!("Failed to parse multipart form: {}", e.body_text())))?;

        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ImageGenError::InvalidRequest(format!("Failed to parse multipart form: {e}")))?
        {
            let field_name = field.name().unwrap_or_default().to_string();

            match field_name.as_str() {
                "image" if form.image.is_none() => {
                    let Some(filename) = field.file_name().map(str::to_string) else {
                        continue;
                    };
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ImageGenError::InvalidRequest(format!("Failed to read image data: {e}")))?;

                    form.image = Some(UploadedImage {
                        filename,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
                "prompt" if form.prompt.is_none() => {
                    form.prompt = Some(
                        field
                            .text()
                            .await
                            .map_err(|e| ImageGenError::InvalidRequest(format!("Failed to read prompt field: {e}")))?,
                    );
                }
                "strength" if form.strength.is_none() => {
                    form.strength = Some(
                        field
                            .text()
                            .await
                            .map_err(|e| ImageGenError::InvalidRequest(format!("Failed to read strength field: {e}")))?,
                    );
                }
                _ => {
                    // Skip unknown and repeated fields
                }
            }
        }

        Ok(form)
    }
}
