//! Error types for the locator engine

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Locator parse and evaluation errors.
///
/// These are *recoverable*: the validation layer records them against the
/// offending descriptor and keeps walking the rest of the tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("parse error in locator '{locator}': {message}")]
    Parse { locator: String, message: String },

    #[error("unbound namespace prefix '{0}'")]
    UnboundPrefix(String),

    #[error("'{0}' is only valid as the last step of a locator")]
    MisplacedTerminalStep(String),
}

impl Error {
    pub fn parse(locator: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            locator: locator.into(),
            message: message.into(),
        }
    }
}
