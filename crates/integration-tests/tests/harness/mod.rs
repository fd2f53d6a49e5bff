#![allow(dead_code)]

pub mod config;
pub mod mock_replicate;
pub mod server;

use reqwest::multipart::{Form, Part};

/// PNG signature followed by filler, enough for type sniffing
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nnot-really-pixels";

/// Multipart form with an `image` file part and a `prompt` field
///
/// Filenames are sent as-is, without percent-encoding
pub fn generate_form(filename: &str, prompt: &str) -> Form {
    Form::new()
        .percent_encode_noop()
        .part("image", image_part(filename))
        .text("prompt", prompt.to_owned())
}

pub fn image_part(filename: &str) -> Part {
    Part::bytes(PNG_BYTES.to_vec())
        .file_name(filename.to_owned())
        .mime_str("image/png")
        .unwrap()
}
