//! Cover image naming rules.
//!
//! Every post owns exactly one image named after its slug, so the file name
//! can be derived again from the record alone.

use std::path::Path;

use crate::domain::error::DomainError;

pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];

/// Returns the canonical (lowercase, dotted) extension of an uploaded file
/// name, or an error when it is not on the allow-list.
pub fn image_extension(file_name: &str) -> Result<&'static str, DomainError> {
    let raw = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    let dotted = format!(".{}", raw.to_ascii_lowercase());

    ALLOWED_IMAGE_EXTENSIONS
        .iter()
        .copied()
        .find(|allowed| *allowed == dotted)
        .ok_or(DomainError::ImageExtension {
            extension: if raw.is_empty() {
                String::from("(none)")
            } else {
                format!(".{raw}")
            },
        })
}

pub fn image_file_name(slug: &str, extension: &str) -> String {
    format!("{slug}_image{extension}")
}
