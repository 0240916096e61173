/// Domain-specific error types for the pricer service.
/// Lookup and Computation failures are caught at the controller boundary
/// and rendered as text. Config errors only occur at startup.
#[derive(Debug, thiserror::Error)]
pub enum PricerError {
    /// Quote retrieval failed: unknown ticker, feed unreachable, empty history.
    #[error("{0}")]
    Lookup(String),

    /// Invalid pricing inputs or a non-finite result.
    #[error("{0}")]
    Computation(String),

    #[error("config error: {0}")]
    Config(String),
}

impl PricerError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Lookup(_) => "lookup",
            Self::Computation(_) => "computation",
            Self::Config(_) => "config",
        }
    }
}

impl From<serde_json::Error> for PricerError {
    fn from(e: serde_json::Error) -> Self {
        PricerError::Lookup(format!("parse: {e}"))
    }
}

pub type PricerResult<T> = Result<T, PricerError>;
