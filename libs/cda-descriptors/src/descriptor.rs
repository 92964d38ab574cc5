//! The descriptor tree
//!
//! Descriptors form the declarative schema: each one names where a piece
//! of document content lives (a locator), which gold-model accessor holds
//! the expected value, and how the node behaves (required, repeating,
//! per-version overrides). The whole tree lives in an arena - nodes refer
//! to parents and children by index, so there is no owning back-pointer
//! cycle and a tree copies with a plain `Vec` clone.
//!
//! Attachment state is an explicit enum rather than a nil-means-uncomputed
//! cache: `Unattached` and `Attached` are distinct even when extraction
//! legitimately produced nothing.

use crate::error::{Error, Result};
use crate::options::{LocateBy, Options, ValidationKind};
use aurum_locator::XmlCursor;
use aurum_models::FieldValue;
use heck::ToLowerCamelCase;
use regex::Regex;
use std::sync::OnceLock;

pub type DescriptorId = usize;

/// Descriptor variants. Dispatch is an explicit match on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    Field,
    Section,
    RepeatingSection,
    /// One synthesized occurrence of a repeating section, bound to an
    /// indexed locator.
    RepeatingInstance,
    Component,
}

/// Attachment lifecycle of a descriptor within one validation run.
#[derive(Debug, Clone, Default)]
pub enum AttachState {
    #[default]
    Unattached,
    Attached {
        /// The matched document node, when the source was XML.
        cursor: Option<XmlCursor>,
        /// The extracted value, canonicalized at comparison time.
        value: Option<FieldValue>,
        /// A recoverable locator failure recorded during extraction.
        failure: Option<aurum_locator::Error>,
    },
}

impl AttachState {
    pub fn is_attached(&self) -> bool {
        matches!(self, Self::Attached { .. })
    }

    pub fn value(&self) -> Option<&FieldValue> {
        match self {
            Self::Attached { value, .. } => value.as_ref(),
            Self::Unattached => None,
        }
    }

    pub fn cursor(&self) -> Option<&XmlCursor> {
        match self {
            Self::Attached { cursor, .. } => cursor.as_ref(),
            Self::Unattached => None,
        }
    }

    pub fn failure(&self) -> Option<&aurum_locator::Error> {
        match self {
            Self::Attached { failure, .. } => failure.as_ref(),
            Self::Unattached => None,
        }
    }
}

/// Identity key of a repeating section instance: the sorted
/// `(field, canonical value)` pairs of its `matches_by` fields.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CompositeKey(Vec<(String, String)>);

impl CompositeKey {
    pub fn new(mut pairs: Vec<(String, String)>) -> Self {
        pairs.sort();
        Self(pairs)
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }
}

impl std::fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self
            .0
            .iter()
            .map(|(field, value)| format!("{}={}", field, value))
            .collect();
        write!(f, "{}", rendered.join(", "))
    }
}

/// One schema node.
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub key: String,
    pub kind: DescriptorKind,
    /// Locator given explicitly in the mapping; inference applies when absent.
    pub explicit_locator: Option<String>,
    pub options: Options,
    pub parent: Option<DescriptorId>,
    /// Definition children (for instances: the copied per-instance subtree).
    pub children: Vec<DescriptorId>,
    /// Synthesized instances (repeating sections only).
    pub instances: Vec<DescriptorId>,
    /// Position of this instance among the section's matches.
    pub instance_index: Option<usize>,
    /// Resolved identity of this instance, once all key fields extracted.
    pub composite_key: Option<CompositeKey>,
    pub state: AttachState,
}

impl Descriptor {
    pub fn new(
        key: impl Into<String>,
        kind: DescriptorKind,
        explicit_locator: Option<String>,
        options: Options,
    ) -> Self {
        Self {
            key: key.into(),
            kind,
            explicit_locator,
            options,
            parent: None,
            children: Vec::new(),
            instances: Vec::new(),
            instance_index: None,
            composite_key: None,
            state: AttachState::Unattached,
        }
    }

    /// The gold-model accessor for this descriptor.
    pub fn accessor(&self, kind: ValidationKind) -> String {
        self.options
            .accessor_for(kind)
            .unwrap_or_else(|| self.key.clone())
    }

    /// The locator, explicit or inferred.
    ///
    /// Inference order: template-id section lookup (an explicit
    /// `template_id` option, or a key that is itself an OID), attribute
    /// reference for `locate_by: Attribute`, the key verbatim when it
    /// already reads as XPath, and finally a namespaced element reference.
    /// Deterministic: the same key and options always infer the same
    /// locator.
    pub fn locator(&self, kind: ValidationKind) -> Option<String> {
        if let Some(explicit) = &self.explicit_locator {
            return Some(explicit.clone());
        }

        let template_id = self
            .options
            .template_id_for(kind)
            .or_else(|| looks_like_oid(&self.key).then(|| self.key.clone()));
        if let Some(id) = template_id {
            return Some(format!(
                "//cda:section[./cda:templateId[@root = '{}']]",
                id
            ));
        }

        // A component without an anchor is a transparent grouping: its
        // children locate themselves, it has no node of its own.
        if self.kind == DescriptorKind::Component {
            return None;
        }

        if self.options.locate_by_for(kind) == LocateBy::Attribute {
            return Some(format!("@{}", self.key.to_lower_camel_case()));
        }

        if self.key.chars().any(|c| !c.is_alphanumeric() && c != '_') {
            // The key is already an XPath fragment.
            return Some(self.key.clone());
        }

        Some(format!("cda:{}", self.key.to_lower_camel_case()))
    }

    /// Definition equality: key, locator source, and options. Attachment
    /// state is deliberately not part of a descriptor's identity.
    pub fn definition_eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.kind == other.kind
            && self.explicit_locator == other.explicit_locator
            && self.options == other.options
    }
}

fn looks_like_oid(key: &str) -> bool {
    static OID: OnceLock<Regex> = OnceLock::new();
    OID.get_or_init(|| Regex::new(r"^\d+(\.\d+)+$").expect("static OID pattern"))
        .is_match(key)
}

/// Arena-backed descriptor tree.
///
/// Definition nodes occupy the front of the arena; synthesized repeating
/// instances are appended behind `definition_len` during attachment and
/// sliced off again by [`DescriptorTree::reset`].
#[derive(Debug, Clone)]
pub struct DescriptorTree {
    nodes: Vec<Descriptor>,
    root: DescriptorId,
    definition_len: usize,
}

impl DescriptorTree {
    pub fn new(root: Descriptor) -> Self {
        Self {
            nodes: vec![root],
            root: 0,
            definition_len: 1,
        }
    }

    pub fn root_id(&self) -> DescriptorId {
        self.root
    }

    pub fn get(&self, id: DescriptorId) -> &Descriptor {
        &self.nodes[id]
    }

    pub fn get_mut(&mut self, id: DescriptorId) -> &mut Descriptor {
        &mut self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a definition child, rejecting duplicate keys within the parent.
    pub fn add_child(&mut self, parent: DescriptorId, descriptor: Descriptor) -> Result<DescriptorId> {
        if self.child_by_key(parent, &descriptor.key).is_some() {
            return Err(Error::DuplicateKey {
                parent: self.index_key(parent),
                key: descriptor.key,
            });
        }
        let id = self.push_node(parent, descriptor);
        self.definition_len = self.nodes.len();
        Ok(id)
    }

    fn push_node(&mut self, parent: DescriptorId, mut descriptor: Descriptor) -> DescriptorId {
        let id = self.nodes.len();
        descriptor.parent = Some(parent);
        descriptor.children = Vec::new();
        descriptor.instances = Vec::new();
        self.nodes.push(descriptor);
        self.nodes[parent].children.push(id);
        id
    }

    /// Deep-copy a subtree of another tree under `parent` (used to inline
    /// common fragments at definition time).
    pub fn graft(
        &mut self,
        source_tree: &DescriptorTree,
        source: DescriptorId,
        parent: DescriptorId,
    ) -> Result<DescriptorId> {
        let node = source_tree.get(source);
        let mut copy = node.clone();
        copy.state = AttachState::Unattached;
        copy.composite_key = None;
        let id = self.add_child(parent, copy)?;
        for child in &node.children {
            self.graft(source_tree, *child, id)?;
        }
        Ok(id)
    }

    /// Synthesize one instance of a repeating section: a
    /// `RepeatingInstance` node carrying a copy of the section's
    /// definition subtree, bound to the indexed locator.
    pub fn add_instance(
        &mut self,
        section: DescriptorId,
        index: usize,
        locator: String,
    ) -> DescriptorId {
        let template = self.get(section);
        let mut instance = Descriptor::new(
            format!("{}[{}]", template.key, index + 1),
            DescriptorKind::RepeatingInstance,
            Some(locator),
            template.options.clone(),
        );
        instance.instance_index = Some(index);

        let id = self.nodes.len();
        instance.parent = Some(section);
        self.nodes.push(instance);
        self.nodes[section].instances.push(id);

        for child in self.nodes[section].children.clone() {
            self.copy_definition_subtree(child, id);
        }
        id
    }

    fn copy_definition_subtree(&mut self, source: DescriptorId, parent: DescriptorId) {
        let mut copy = self.nodes[source].clone();
        copy.state = AttachState::Unattached;
        copy.composite_key = None;
        let children: Vec<DescriptorId> = copy.children.drain(..).collect();
        let id = self.nodes.len();
        copy.parent = Some(parent);
        copy.instances = Vec::new();
        self.nodes.push(copy);
        self.nodes[parent].children.push(id);
        for child in children {
            self.copy_definition_subtree(child, id);
        }
    }

    /// Drop all attachment state and synthesized instances, returning the
    /// tree to its definition shape.
    pub fn reset(&mut self) {
        self.nodes.truncate(self.definition_len);
        for node in &mut self.nodes {
            node.state = AttachState::Unattached;
            node.composite_key = None;
            node.instances.clear();
        }
    }

    /// A fresh, fully-unattached copy for one validation run.
    pub fn copy(&self) -> Self {
        let mut copy = self.clone();
        copy.reset();
        copy
    }

    pub fn child_by_key(&self, parent: DescriptorId, key: &str) -> Option<DescriptorId> {
        self.nodes[parent]
            .children
            .iter()
            .copied()
            .find(|id| self.nodes[*id].key == key)
    }

    /// The globally unique dot-joined path of section keys from the root.
    pub fn index_key(&self, id: DescriptorId) -> String {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &self.nodes[node_id];
            segments.push(node.key.clone());
            current = node.parent;
        }
        segments.reverse();
        segments.join(".")
    }

    /// Field descriptors in the definition subtree of `id`, depth-first.
    pub fn field_descendants(&self, id: DescriptorId) -> Vec<DescriptorId> {
        let mut fields = Vec::new();
        self.collect_fields(id, &mut fields);
        fields
    }

    fn collect_fields(&self, id: DescriptorId, out: &mut Vec<DescriptorId>) {
        for child in &self.nodes[id].children {
            let node = &self.nodes[*child];
            if node.kind == DescriptorKind::Field {
                out.push(*child);
            }
            self.collect_fields(*child, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;

    fn field(key: &str) -> Descriptor {
        Descriptor::new(key, DescriptorKind::Field, None, Options::new())
    }

    #[test]
    fn locator_inference_covers_all_rules() {
        let kind = ValidationKind::C32v21;

        // Element reference with camelCase conversion.
        assert_eq!(
            field("language_code").locator(kind).as_deref(),
            Some("cda:languageCode")
        );

        // Attribute reference.
        let attr = Descriptor::new(
            "negation_ind",
            DescriptorKind::Field,
            None,
            Options::new().locate_by(LocateBy::Attribute),
        );
        assert_eq!(attr.locator(kind).as_deref(), Some("@negationInd"));

        // OID-looking keys become template-id section lookups.
        let section = Descriptor::new(
            "2.16.840.1.113883.10.20.1.8",
            DescriptorKind::Section,
            None,
            Options::new(),
        );
        assert_eq!(
            section.locator(kind).as_deref(),
            Some("//cda:section[./cda:templateId[@root = '2.16.840.1.113883.10.20.1.8']]")
        );

        // Keys with path characters pass through verbatim.
        let literal = field("cda:name/cda:suffix");
        assert_eq!(literal.locator(kind).as_deref(), Some("cda:name/cda:suffix"));
    }

    #[test]
    fn locator_inference_is_deterministic() {
        let descriptor = field("language_code");
        assert_eq!(
            descriptor.locator(ValidationKind::C32v21),
            descriptor.locator(ValidationKind::C32v21)
        );
    }

    #[test]
    fn composite_keys_sort_their_pairs() {
        let a = CompositeKey::new(vec![
            ("last_name".into(), "Everyman".into()),
            ("first_name".into(), "Adam".into()),
        ]);
        let b = CompositeKey::new(vec![
            ("first_name".into(), "Adam".into()),
            ("last_name".into(), "Everyman".into()),
        ]);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "first_name=Adam, last_name=Everyman");
    }

    #[test]
    fn index_keys_join_the_path_from_root() {
        let root = Descriptor::new("medications", DescriptorKind::Component, None, Options::new());
        let mut tree = DescriptorTree::new(root);
        let med = tree
            .add_child(
                tree.root_id(),
                Descriptor::new("medication", DescriptorKind::RepeatingSection, None, Options::new()),
            )
            .unwrap();
        let name = tree.add_child(med, field("product_name")).unwrap();
        assert_eq!(tree.index_key(name), "medications.medication.product_name");
    }

    #[test]
    fn duplicate_child_keys_are_definition_errors() {
        let root = Descriptor::new("languages", DescriptorKind::Component, None, Options::new());
        let mut tree = DescriptorTree::new(root);
        tree.add_child(tree.root_id(), field("language_code")).unwrap();
        let err = tree
            .add_child(tree.root_id(), field("language_code"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { .. }));
    }

    #[test]
    fn reset_drops_instances_and_attachment_state() {
        let root = Descriptor::new("languages", DescriptorKind::Component, None, Options::new());
        let mut tree = DescriptorTree::new(root);
        let section = tree
            .add_child(
                tree.root_id(),
                Descriptor::new(
                    "language_communication",
                    DescriptorKind::RepeatingSection,
                    None,
                    Options::new().matches_by(["language_code"]),
                ),
            )
            .unwrap();
        tree.add_child(section, field("language_code")).unwrap();

        let definition_len = tree.len();
        tree.add_instance(section, 0, "cda:languageCommunication[1]".into());
        tree.get_mut(section).state = AttachState::Attached {
            cursor: None,
            value: None,
            failure: None,
        };
        assert!(tree.len() > definition_len);

        tree.reset();
        assert_eq!(tree.len(), definition_len);
        assert!(tree.get(section).instances.is_empty());
        assert!(!tree.get(section).state.is_attached());
    }

    #[test]
    fn copies_are_unattached_but_definition_equal() {
        let root = Descriptor::new("languages", DescriptorKind::Component, None, Options::new());
        let mut tree = DescriptorTree::new(root);
        let section = tree
            .add_child(
                tree.root_id(),
                Descriptor::new(
                    "language_communication",
                    DescriptorKind::RepeatingSection,
                    None,
                    Options::new(),
                ),
            )
            .unwrap();
        tree.get_mut(section).state = AttachState::Attached {
            cursor: None,
            value: Some(aurum_models::FieldValue::text("x")),
            failure: None,
        };

        let copy = tree.copy();
        assert!(!copy.get(section).state.is_attached());
        assert!(copy.get(section).definition_eq(tree.get(section)));
    }
}
