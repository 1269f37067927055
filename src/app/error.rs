use thiserror::Error;

use crate::normalizer::syndication::DeserializeError;

#[derive(Error, Debug)]
pub enum NoveltyError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed deserialization error: {0}")]
    Deserialize(#[from] DeserializeError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Feed not found: {0}")]
    FeedNotFound(i64),

    #[error("Article not found: {0}")]
    ArticleNotFound(i64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, NoveltyError>;
