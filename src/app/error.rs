use thiserror::Error;

use crate::config::ConfigError;
use crate::feed::FeedError;

#[derive(Error, Debug)]
pub enum NotestreamError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server not found: {0}")]
    ServerNotFound(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, NotestreamError>;
