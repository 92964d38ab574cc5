//! Locator engine - the XPath subset CDA descriptors are written in
//!
//! Descriptors address document content through *locators*, strings in a
//! constrained XPath subset. This crate tokenizes, parses, and evaluates
//! them against a `roxmltree` document:
//!
//! ```text
//! Locator String
//!      |
//!   Lexer -> Tokens
//!      |
//!   Parser -> Path (steps + predicates)
//!      |
//! Evaluation -> XmlCursor set
//! ```
//!
//! Supported forms cover everything the component library uses: child and
//! descendant steps, namespace prefixes, attribute and `text()` terminal
//! steps, positional predicates, and attribute-comparison/existence
//! predicates (including the nested `[./cda:templateId[@root = '...']]`
//! template-id lookups).
//!
//! Malformed locators are recoverable by design: parse and evaluation
//! problems surface as [`Error`] values the validation layer converts to
//! reported misses, never as panics.

pub mod ast;
pub mod cursor;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;

pub use ast::{Anchor, NodeTest, Path, Predicate, Step};
pub use cursor::{node_path, XmlCursor};
pub use error::{Error, Result};
pub use eval::{dereference, innermost_resolvable, EvalContext, Namespaces};
pub use parser::parse;

/// Default namespace bindings for CDA documents.
pub const CDA_NS: &str = "urn:hl7-org:v3";
pub const SDTC_NS: &str = "urn:hl7-org:sdtc";
