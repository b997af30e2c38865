use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("`{field}` must not be empty")]
    MissingField { field: &'static str },
    #[error("image extension `{extension}` is not allowed; use .jpg, .jpeg, .png or .webp")]
    ImageExtension { extension: String },
    #[error("domain validation failed: {message}")]
    Validation { message: String },
}

impl DomainError {
    pub fn missing(field: &'static str) -> Self {
        Self::MissingField { field }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Rejects values that are empty once surrounding whitespace is removed.
pub fn ensure_present(field: &'static str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        Err(DomainError::missing(field))
    } else {
        Ok(())
    }
}
