//! Content validation engine - comparing gold models to CDA documents
//!
//! The engine binds a component's descriptor tree to a parsed document
//! (attachment), then walks the gold model against the attached tree
//! (comparison), emitting typed, located [`ValidationIssue`]s:
//!
//! ```text
//! Registry lookup -> DescriptorTree copy
//!      |
//! Attachment (XML or gold model source)
//!      |
//! ComponentScope comparison walk
//!      |
//! Vec<ValidationIssue> (flat, depth-first order)
//! ```
//!
//! Repeating entries are matched by composite identity keys, not by
//! position, so model and document may order them differently. The walk
//! never throws on document content; locator failures degrade to
//! reported issues. Only definition errors (unknown component, malformed
//! mapping) surface as `Err` - they indicate a schema bug, not a
//! document defect.

pub mod attach;
pub mod error;
pub mod issue;
pub mod scope;
pub mod validator;

pub use attach::{attach_model, attach_xml};
pub use error::{Error, Result};
pub use issue::{InspectionKind, IssueKind, Severity, ValidationIssue};
pub use scope::ComponentScope;
pub use validator::{ContentValidator, DocumentValidator};
