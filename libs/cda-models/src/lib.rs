//! Gold-model data access for clinical document validation
//!
//! A *gold model* is the trusted reference object describing what a
//! clinical document is expected to contain. The validation engine never
//! reflects on concrete model types; it reads them through the
//! [`GoldModel`] capability trait, and every value crossing the
//! model/document boundary is normalized into a [`FieldValue`] so that
//! comparisons are format-insensitive.
//!
//! Host applications with typed patient models implement [`GoldModel`]
//! directly. For tests, tooling, and the CLI there is a ready-made
//! implementation for `serde_json::Value` plus the [`ValueModel`] loader.

pub mod error;
pub mod model;
pub mod value;

pub use error::{Error, Result};
pub use model::{GoldModel, ValueModel};
pub use value::FieldValue;
