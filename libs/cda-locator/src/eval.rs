//! Locator evaluation against roxmltree documents
//!
//! Evaluation walks a parsed [`Path`] step by step over element sets.
//! Each step collects its candidates from every current node in document
//! order, then filters through the step's predicates; positional
//! predicates index that merged candidate set (this is what the
//! synthesized per-instance locators `locator[N]` of repeating sections
//! rely on).

use crate::ast::{Anchor, Axis, NodeTest, Path, Predicate};
use crate::cursor::{collect_text, XmlCursor};
use crate::error::{Error, Result};
use crate::parser::parse;
use crate::{CDA_NS, SDTC_NS};
use roxmltree::{Document, Node, NodeId};
use std::collections::BTreeMap;

/// Prefix → namespace URI bindings.
#[derive(Debug, Clone)]
pub struct Namespaces {
    bindings: BTreeMap<String, String>,
}

impl Default for Namespaces {
    fn default() -> Self {
        let mut bindings = BTreeMap::new();
        bindings.insert("cda".to_string(), CDA_NS.to_string());
        bindings.insert("sdtc".to_string(), SDTC_NS.to_string());
        Self { bindings }
    }
}

impl Namespaces {
    pub fn with(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.bindings.insert(prefix.into(), uri.into());
        self
    }

    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }
}

/// One document plus its namespace bindings; evaluation entry points.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a, 'input> {
    pub doc: &'a Document<'input>,
    pub ns: &'a Namespaces,
}

impl<'a, 'input> EvalContext<'a, 'input> {
    pub fn new(doc: &'a Document<'input>, ns: &'a Namespaces) -> Self {
        Self { doc, ns }
    }

    /// All matches of a raw locator string. A blank locator matches
    /// nothing without error.
    pub fn all(&self, locator: &str, context: Option<NodeId>) -> Result<Vec<XmlCursor>> {
        if locator.trim().is_empty() {
            return Ok(Vec::new());
        }
        let path = parse(locator)?;
        self.evaluate(&path, context)
    }

    /// First match of a raw locator string.
    pub fn first(&self, locator: &str, context: Option<NodeId>) -> Result<Option<XmlCursor>> {
        Ok(self.all(locator, context)?.into_iter().next())
    }

    /// Text value of the first match: attribute value or element text.
    pub fn text(&self, locator: &str, context: Option<NodeId>) -> Result<Option<String>> {
        Ok(self
            .first(locator, context)?
            .and_then(|cursor| cursor.value(self.doc)))
    }

    /// Evaluate a parsed path from the given context node (the document
    /// node when absent).
    pub fn evaluate(&self, path: &Path, context: Option<NodeId>) -> Result<Vec<XmlCursor>> {
        let start = match path.anchor {
            Anchor::Root => self.doc.root(),
            Anchor::Relative => match context {
                Some(id) => self
                    .doc
                    .get_node(id)
                    .unwrap_or_else(|| self.doc.root()),
                None => self.doc.root(),
            },
        };

        let mut current = vec![start];
        let mut cursors = Vec::new();

        for (idx, step) in path.steps.iter().enumerate() {
            let terminal = idx + 1 == path.steps.len();

            match &step.test {
                NodeTest::Attribute(name) => {
                    // Attribute axis: reads off the current node set.
                    debug_assert!(terminal);
                    for node in &current {
                        if node.attribute(name.as_str()).is_some() {
                            cursors.push(XmlCursor::attribute(node.id(), name.clone()));
                        }
                    }
                    return Ok(cursors);
                }
                NodeTest::Text => {
                    debug_assert!(terminal);
                    for node in &current {
                        cursors.push(XmlCursor::text(node.id()));
                    }
                    return Ok(cursors);
                }
                _ => {}
            }

            let mut candidates: Vec<Node> = Vec::new();
            for node in &current {
                match step.axis {
                    Axis::SelfNode => candidates.push(*node),
                    Axis::Child => {
                        candidates.extend(node.children().filter(|c| c.is_element()));
                    }
                    Axis::Descendant => {
                        candidates.extend(node.descendants().skip(1).filter(|c| c.is_element()));
                    }
                }
            }

            if let NodeTest::Element { prefix, name } = &step.test {
                let required_ns = match prefix {
                    Some(p) => Some(
                        self.ns
                            .resolve(p)
                            .ok_or_else(|| Error::UnboundPrefix(p.clone()))?,
                    ),
                    None => None,
                };
                candidates.retain(|node| {
                    node.tag_name().name() == name
                        && match required_ns {
                            Some(uri) => node.tag_name().namespace() == Some(uri),
                            // Unprefixed tests match by local name only.
                            None => true,
                        }
                });
            }

            for predicate in &step.predicates {
                match predicate {
                    Predicate::Position(n) => {
                        candidates = match candidates.get(n - 1) {
                            Some(node) => vec![*node],
                            None => Vec::new(),
                        };
                    }
                    Predicate::Exists(inner) => {
                        let mut kept = Vec::new();
                        for node in candidates {
                            if !self.evaluate(inner, Some(node.id()))?.is_empty() {
                                kept.push(node);
                            }
                        }
                        candidates = kept;
                    }
                    Predicate::Equals { path: inner, literal } => {
                        let mut kept = Vec::new();
                        for node in candidates {
                            let matches = self
                                .evaluate(inner, Some(node.id()))?
                                .iter()
                                .any(|c| c.value(self.doc).as_deref() == Some(literal.as_str()));
                            if matches {
                                kept.push(node);
                            }
                        }
                        candidates = kept;
                    }
                }
            }

            current = candidates;
            if current.is_empty() {
                return Ok(Vec::new());
            }
        }

        Ok(current.into_iter().map(|n| XmlCursor::element(n.id())).collect())
    }
}

/// Follow an internal free-text reference from the cursor's element.
///
/// Reads `reference/@value` under the element, strips a leading `#`, and
/// returns the trimmed text of the element anywhere in the document whose
/// `ID` attribute equals the remainder. Free-text display names live
/// outside the structured entry in v2.5 C32 documents; this is how they
/// are read back.
pub fn dereference(doc: &Document, cursor: &XmlCursor) -> Option<String> {
    let element = cursor.resolve(doc)?;
    let pointer = element
        .children()
        .find(|c| c.is_element() && c.tag_name().name() == "reference")?
        .attribute("value")?;
    let id = pointer.trim_start_matches('#');

    let target = doc
        .root()
        .descendants()
        .find(|n| n.is_element() && n.attribute("ID") == Some(id))?;
    collect_text(&target)
}

/// The closest real node a failed locator can be pinned to.
///
/// Walks the locator right-to-left - dropping trailing predicates first,
/// then trailing steps - re-evaluating until something resolves. Falls
/// back to the context node (or the root element) when nothing on the
/// path exists.
pub fn innermost_resolvable(
    ctx: &EvalContext,
    locator: &str,
    context: Option<NodeId>,
) -> Option<XmlCursor> {
    let mut path = match parse(locator) {
        Ok(path) => path,
        Err(_) => return fallback_cursor(ctx, context),
    };

    loop {
        if let Ok(cursors) = ctx.evaluate(&path, context) {
            if let Some(first) = cursors.into_iter().next() {
                return Some(first);
            }
        }

        let reduced = match path.steps.last_mut() {
            Some(last) if !last.predicates.is_empty() => {
                last.predicates.pop();
                true
            }
            Some(_) => {
                path.steps.pop();
                !path.steps.is_empty()
            }
            None => false,
        };

        if !reduced {
            return fallback_cursor(ctx, context);
        }
    }
}

fn fallback_cursor(ctx: &EvalContext, context: Option<NodeId>) -> Option<XmlCursor> {
    let node = context
        .and_then(|id| ctx.doc.get_node(id))
        .filter(Node::is_element)
        .unwrap_or_else(|| ctx.doc.root_element());
    Some(XmlCursor::element(node.id()))
}
