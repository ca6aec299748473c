use thiserror::Error;

/// Main error type for the scanner
#[derive(Error, Debug)]
pub enum PolyedgeError {
    // Configuration errors (disable a capability, not fatal to the process)
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Missing capability: {0}")]
    MissingCapability(String),

    // Network errors (transient; the cycle continues with partial data)
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Collaborator timed out: {0}")]
    Timeout(String),

    #[error("Market data unavailable: {0}")]
    MarketDataUnavailable(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Market data errors (the offending market is skipped)
    #[error("Invalid market data: {0}")]
    InvalidMarketData(String),

    // Order execution errors
    #[error("Execution failed: {0}")]
    Execution(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for PolyedgeError
pub type Result<T> = std::result::Result<T, PolyedgeError>;

impl PolyedgeError {
    /// Transient errors are retried on the next cycle rather than aborting a loop.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PolyedgeError::Http(_)
                | PolyedgeError::Timeout(_)
                | PolyedgeError::MarketDataUnavailable(_)
        )
    }
}
