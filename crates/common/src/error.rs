use thiserror::Error;

/// Top-level error type for property search operations.
#[derive(Debug, Error)]
pub enum PropSearchError {
    // --- Fatal setup errors ---
    #[error("Configuration error: {0}")]
    Configuration(String),

    // --- Caller errors (request never sent) ---
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Validation error: {0}")]
    Validation(String),

    // --- Listing API errors ---
    #[error("API Error: {status} - {body}")]
    Upstream { status: u16, body: String },

    #[error("An unexpected error occurred: {0}")]
    Transport(String),

    // --- Operational errors ---
    #[error("Not found: {0}")]
    NotFound(String),
}

impl PropSearchError {
    pub fn invalid_argument(field: &str, detail: impl std::fmt::Display) -> Self {
        Self::InvalidArgument(format!("'{}' {}", field, detail))
    }
}

/// Result type alias for property search operations.
pub type Result<T> = std::result::Result<T, PropSearchError>;
