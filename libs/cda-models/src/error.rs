//! Error types for gold models

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("gold model must be a JSON object, got {0}")]
    NotAnObject(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
