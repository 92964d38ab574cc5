//! Error types for descriptor definitions
//!
//! These are programmer errors: a malformed mapping or a lookup of a
//! component that was never registered indicates a schema bug, not a
//! document defect. They are kept strictly apart from the recoverable
//! `ValidationIssue` values the comparison engine accumulates.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("component '{0}' is already registered")]
    DuplicateComponent(String),

    #[error("common fragment '{0}' is already registered")]
    DuplicateCommon(String),

    #[error("descriptor '{parent}' already has a child named '{key}'")]
    DuplicateKey { parent: String, key: String },

    #[error("reference to unknown common fragment '{0}'")]
    UnknownCommon(String),

    #[error("unknown component '{0}'")]
    UnknownComponent(String),

    #[error("repeating section '{0}' declares an empty matches_by key set")]
    EmptyMatchesBy(String),

    #[error("unknown validation kind '{0}'")]
    UnknownValidationKind(String),
}

pub type Result<T> = std::result::Result<T, Error>;
