use thiserror::Error;

/// Core error types for catalog input handling
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: &'static str, message: String },

    #[error("Invalid identifier: {0}")]
    InvalidId(#[from] crate::id::IdError),
}

impl CoreError {
    /// Create a new InvalidField error
    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
