use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProfessorError>;

#[derive(Error, Debug)]
pub enum ProfessorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Failure talking to an external embedding or generation backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    #[error("Authentication rejected by backend (HTTP {0})")]
    Authentication(u16),

    #[error("Rate limited by backend")]
    RateLimited,

    #[error("Backend returned HTTP {0}")]
    Status(u16),

    #[error("Invalid response from backend: {0}")]
    InvalidResponse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<config::ConfigError> for ProfessorError {
    #[inline]
    fn from(error: config::ConfigError) -> Self {
        Self::Config(error.to_string())
    }
}

impl From<ureq::Error> for ProviderError {
    #[inline]
    fn from(error: ureq::Error) -> Self {
        match error {
            ureq::Error::StatusCode(status @ (401 | 403)) => Self::Authentication(status),
            ureq::Error::StatusCode(429) => Self::RateLimited,
            ureq::Error::StatusCode(status) => Self::Status(status),
            other => Self::Unreachable(other.to_string()),
        }
    }
}

pub mod answer;
pub mod commands;
pub mod config;
pub mod database;
pub mod embeddings;
pub mod generation;
pub mod ingest;
pub mod knowledge;
pub mod professor;
pub mod retrieval;

#[cfg(test)]
mod test_support;
