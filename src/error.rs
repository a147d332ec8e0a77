use thiserror::Error;

#[derive(Error, Debug)]
pub enum GachaError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("trial on variant '{variant}' did not reach its target within {cap} draws")]
    NonTerminatingTrial { variant: String, cap: u64 },

    #[error("parallel dispatch failed: {0}")]
    ParallelDispatchFailure(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type GachaResult<T> = Result<T, GachaError>;

impl GachaError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        GachaError::InvalidConfiguration(msg.into())
    }

    pub fn insufficient(msg: impl Into<String>) -> Self {
        GachaError::InsufficientData(msg.into())
    }
}
