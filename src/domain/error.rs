use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("domain validation failed: {message}")]
    Validation { message: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Message suitable for the `errors` list of a validation response.
    pub fn detail(&self) -> &str {
        match self {
            DomainError::Validation { message } => message,
        }
    }
}
