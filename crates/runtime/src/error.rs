use crate::model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("no final answer after {rounds} tool-calling rounds")]
    IterationBoundExceeded { rounds: usize },
}

impl Error {
    /// Whether the provider could not be reached or refused service for now.
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Self::Model(ModelError::Network(_) | ModelError::RateLimited(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
