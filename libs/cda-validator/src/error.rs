//! Configuration errors
//!
//! Only programmer errors live here; everything a document can do wrong
//! is reported as a `ValidationIssue` value instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("descriptor definition error: {0}")]
    Definition(#[from] aurum_descriptors::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
