//! Cursors - storable addresses of matched document content
//!
//! Attached descriptor trees outlive any single borrow of the parsed
//! document, so matches are recorded as [`XmlCursor`] values built on
//! `roxmltree::NodeId` rather than borrowed `Node`s. A cursor resolves
//! back to a live node against the document it came from.

use roxmltree::{Document, Node, NodeId};

/// What part of the matched node a cursor addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Element,
    Attribute(String),
    /// The text content of the element (a `text()` terminal step).
    Text,
}

/// Address of an element, attribute, or text value in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlCursor {
    pub node: NodeId,
    pub target: Target,
}

impl XmlCursor {
    pub fn element(node: NodeId) -> Self {
        Self {
            node,
            target: Target::Element,
        }
    }

    pub fn attribute(node: NodeId, name: impl Into<String>) -> Self {
        Self {
            node,
            target: Target::Attribute(name.into()),
        }
    }

    pub fn text(node: NodeId) -> Self {
        Self {
            node,
            target: Target::Text,
        }
    }

    /// The element this cursor lives on.
    pub fn resolve<'a, 'input>(&self, doc: &'a Document<'input>) -> Option<Node<'a, 'input>> {
        doc.get_node(self.node)
    }

    /// The string value at the cursor: attribute value, or the element's
    /// collected text. Empty text reads as absent.
    pub fn value(&self, doc: &Document) -> Option<String> {
        let node = self.resolve(doc)?;
        match &self.target {
            Target::Attribute(name) => node.attribute(name.as_str()).map(str::to_string),
            Target::Element | Target::Text => collect_text(&node),
        }
    }
}

/// Concatenated, trimmed text content of an element subtree.
pub(crate) fn collect_text(node: &Node) -> Option<String> {
    let mut text = String::new();
    for descendant in node.descendants() {
        if descendant.is_text() {
            if let Some(chunk) = descendant.text() {
                text.push_str(chunk);
            }
        }
    }
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// The addressable xpath-of-this-node string used for issue locations.
///
/// Segments are element local names with 1-based sibling indexes wherever
/// the name is not unique among siblings, e.g.
/// `/ClinicalDocument/recordTarget/patientRole/patient/languageCommunication[2]`.
pub fn node_path(doc: &Document, cursor: &XmlCursor) -> String {
    let node = match cursor.resolve(doc) {
        Some(node) => node,
        None => return String::new(),
    };

    let mut segments = Vec::new();
    let mut current = Some(node);
    while let Some(n) = current {
        if n.is_element() {
            segments.push(segment_for(&n));
        }
        current = n.parent();
    }
    segments.reverse();

    let mut path = format!("/{}", segments.join("/"));
    match &cursor.target {
        Target::Attribute(name) => {
            path.push_str("/@");
            path.push_str(name);
        }
        Target::Text => path.push_str("/text()"),
        Target::Element => {}
    }
    path
}

fn segment_for(node: &Node) -> String {
    let name = node.tag_name().name();
    let siblings: Vec<_> = match node.parent() {
        Some(parent) => parent
            .children()
            .filter(|c| c.is_element() && c.tag_name().name() == name)
            .collect(),
        None => Vec::new(),
    };

    if siblings.len() > 1 {
        let index = siblings
            .iter()
            .position(|s| s.id() == node.id())
            .map(|i| i + 1)
            .unwrap_or(1);
        format!("{}[{}]", name, index)
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
        <root>
            <item code="a"><name>First</name></item>
            <item code="b"><name>Second</name></item>
        </root>
    "#;

    #[test]
    fn attribute_cursors_read_values() {
        let doc = Document::parse(DOC).unwrap();
        let item = doc
            .descendants()
            .find(|n| n.has_tag_name("item"))
            .unwrap();
        let cursor = XmlCursor::attribute(item.id(), "code");
        assert_eq!(cursor.value(&doc), Some("a".to_string()));
    }

    #[test]
    fn element_cursors_collect_text() {
        let doc = Document::parse(DOC).unwrap();
        let name = doc
            .descendants()
            .filter(|n| n.has_tag_name("name"))
            .nth(1)
            .unwrap();
        let cursor = XmlCursor::element(name.id());
        assert_eq!(cursor.value(&doc), Some("Second".to_string()));
    }

    #[test]
    fn node_paths_index_repeated_siblings() {
        let doc = Document::parse(DOC).unwrap();
        let second = doc
            .descendants()
            .filter(|n| n.has_tag_name("item"))
            .nth(1)
            .unwrap();
        let cursor = XmlCursor::attribute(second.id(), "code");
        assert_eq!(node_path(&doc, &cursor), "/root/item[2]/@code");

        let name = second
            .children()
            .find(|n| n.has_tag_name("name"))
            .unwrap();
        assert_eq!(
            node_path(&doc, &XmlCursor::element(name.id())),
            "/root/item[2]/name"
        );
    }
}
