use thiserror::Error;

pub type IncentivesResult<T> = Result<T, IncentivesError>;

#[derive(Error, Debug)]
pub enum IncentivesError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid incentives snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IncentivesError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        IncentivesError::InvalidSnapshot(message.into())
    }
}
