//! Parsed locator representation
//!
//! A locator parses into a [`Path`]: an anchor plus a sequence of steps,
//! where each step carries a node test and zero or more predicates.
//! Mirrors the grammar directly; no semantic analysis happens here.

/// Where evaluation of the first step begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// `/...` - the document root.
    Root,
    /// No leading slash - the context node.
    Relative,
}

/// A parsed locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub anchor: Anchor,
    pub steps: Vec<Step>,
}

impl Path {
    /// True when the path selects an attribute or text node.
    pub fn is_value_path(&self) -> bool {
        matches!(
            self.steps.last().map(|s| &s.test),
            Some(NodeTest::Attribute(_)) | Some(NodeTest::Text)
        )
    }
}

/// One location step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub axis: Axis,
    pub test: NodeTest,
    pub predicates: Vec<Predicate>,
}

/// Step axis: `/` selects children, `//` any descendant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Child,
    Descendant,
    /// `.` - stays on the context node.
    SelfNode,
}

/// What a step matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// `name` or `prefix:name`. An unprefixed test matches by local name
    /// regardless of namespace (CDA documents default-namespace every
    /// element; the mapping DSL writes both prefixed and bare forms).
    Element {
        prefix: Option<String>,
        name: String,
    },
    /// `*`
    Wildcard,
    /// `@name` - terminal only.
    Attribute(String),
    /// `text()` - terminal only.
    Text,
}

/// A step predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `[3]` - 1-based position within the step's candidate set.
    Position(usize),
    /// `[cda:templateId[@root='...']]` - a relative path that must match.
    Exists(Path),
    /// `[@code='x']` / `[cda:languageCode/@code='x']` - some match of the
    /// relative path has this string value.
    Equals { path: Path, literal: String },
}
