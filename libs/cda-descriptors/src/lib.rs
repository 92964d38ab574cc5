//! Component descriptors - the declarative schema for document mapping
//!
//! This crate is the schema half of the validation engine. A *descriptor*
//! names where a piece of content lives in a CDA document (a locator in
//! the XPath subset of `aurum-locator`) and which gold-model accessor
//! carries the expected value; descriptors form trees, trees are declared
//! through the [`Mapping`] DSL and registered in a read-only [`Registry`]:
//!
//! ```text
//! Mapping DSL declarations
//!      |
//! DescriptorTree per component (arena, definition state)
//!      |
//!   Registry (read-only, shared across runs)
//!      |
//! DescriptorTree::copy per validation run (attachment state)
//! ```
//!
//! The [`c32`] module ships the standard C32/CCD component library.

pub mod builder;
pub mod c32;
pub mod descriptor;
pub mod error;
pub mod options;
pub mod registry;

pub use builder::{Mapping, NodeBuilder};
pub use descriptor::{
    AttachState, CompositeKey, Descriptor, DescriptorId, DescriptorKind, DescriptorTree,
};
pub use error::{Error, Result};
pub use options::{LocateBy, OptionSet, Options, ValidationKind};
pub use registry::{ComponentDefinition, Registry};
