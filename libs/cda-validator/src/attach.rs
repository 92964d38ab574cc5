//! Attachment engine - binding descriptor trees to a source
//!
//! Attachment walks a descriptor tree and extracts values from one
//! source: a parsed XML document or a gold model. Extraction happens at
//! most once per attach cycle; [`aurum_descriptors::DescriptorTree::reset`]
//! runs first, so re-attachment always starts from a clean tree and
//! never merges with prior instances.
//!
//! Locator failures never abort attachment: they are recorded on the
//! offending descriptor and its subtree stays unattached, for the
//! comparison engine to report.

use aurum_descriptors::{
    AttachState, CompositeKey, DescriptorId, DescriptorKind, DescriptorTree, ValidationKind,
};
use aurum_locator::{dereference, EvalContext, Namespaces, XmlCursor};
use aurum_models::{FieldValue, GoldModel};
use roxmltree::{Document, NodeId};

/// Where a descriptor's locator evaluates from.
#[derive(Debug, Clone, Copy)]
enum Scope {
    /// Top of the document (component roots).
    DocumentRoot,
    /// The owning section's matched node.
    Node(NodeId),
    /// The owning section did not match; nothing to extract from.
    Missing,
}

impl Scope {
    fn node(self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(id),
            Self::DocumentRoot | Self::Missing => None,
        }
    }
}

/// Attach a descriptor tree to a parsed document.
pub fn attach_xml(
    tree: &mut DescriptorTree,
    doc: &Document<'_>,
    namespaces: &Namespaces,
    kind: ValidationKind,
) {
    tree.reset();
    let ctx = EvalContext::new(doc, namespaces);
    attach_xml_node(tree, tree.root_id(), &ctx, Scope::DocumentRoot, kind);
}

fn attach_xml_node(
    tree: &mut DescriptorTree,
    id: DescriptorId,
    ctx: &EvalContext<'_, '_>,
    scope: Scope,
    kind: ValidationKind,
) {
    let descriptor = tree.get(id);
    let descriptor_kind = descriptor.kind;
    let locator = descriptor.locator(kind);

    match descriptor_kind {
        DescriptorKind::Field => {
            let dereferences = tree.get(id).options.dereferences(kind);
            let (cursor, value, failure) = extract_first(ctx, scope, locator.as_deref());
            let value = cursor.as_ref().and_then(|cursor| {
                if dereferences {
                    // Fall back to the node's own text when there is no
                    // free-text pointer to follow.
                    dereference(ctx.doc, cursor).or_else(|| value.clone())
                } else {
                    value.clone()
                }
            });
            tree.get_mut(id).state = AttachState::Attached {
                cursor,
                value: value.map(FieldValue::text),
                failure,
            };
        }
        DescriptorKind::Section | DescriptorKind::Component => {
            let (cursor, _, failure) = extract_first(ctx, scope, locator.as_deref());
            let child_scope = match (&cursor, locator.is_some()) {
                (Some(cursor), _) => Scope::Node(cursor.node),
                // Anchorless grouping: children locate from the same scope.
                (None, false) => scope,
                (None, true) => Scope::Missing,
            };
            tree.get_mut(id).state = AttachState::Attached {
                cursor,
                value: None,
                failure,
            };
            for child in tree.get(id).children.clone() {
                attach_xml_node(tree, child, ctx, child_scope, kind);
            }
        }
        DescriptorKind::RepeatingSection => {
            attach_xml_repeating(tree, id, ctx, scope, locator, kind);
        }
        // Instances are synthesized and attached by their section.
        DescriptorKind::RepeatingInstance => {}
    }
}

fn attach_xml_repeating(
    tree: &mut DescriptorTree,
    id: DescriptorId,
    ctx: &EvalContext<'_, '_>,
    scope: Scope,
    locator: Option<String>,
    kind: ValidationKind,
) {
    let matches_by = tree.get(id).options.matches_by_for(kind);

    let locator = match (scope, locator) {
        (Scope::Missing, _) | (_, None) => {
            tree.get_mut(id).state = AttachState::Attached {
                cursor: None,
                value: None,
                failure: None,
            };
            return;
        }
        (_, Some(locator)) => locator,
    };

    let cursors = match ctx.all(&locator, scope.node()) {
        Ok(cursors) => cursors,
        Err(error) => {
            tracing::warn!(locator = %locator, error = %error, "locator failed, subtree unattached");
            tree.get_mut(id).state = AttachState::Attached {
                cursor: None,
                value: None,
                failure: Some(error),
            };
            return;
        }
    };

    tree.get_mut(id).state = AttachState::Attached {
        cursor: None,
        value: None,
        failure: None,
    };

    tracing::debug!(locator = %locator, matches = cursors.len(), "attaching repeating section");

    for (index, cursor) in cursors.into_iter().enumerate() {
        let instance_locator = format!("{}[{}]", locator, index + 1);
        let instance = tree.add_instance(id, index, instance_locator);
        let node = cursor.node;
        tree.get_mut(instance).state = AttachState::Attached {
            cursor: Some(cursor),
            value: None,
            failure: None,
        };
        for child in tree.get(instance).children.clone() {
            attach_xml_node(tree, child, ctx, Scope::Node(node), kind);
        }
        tree.get_mut(instance).composite_key = instance_key(tree, instance, &matches_by);
    }
}

fn extract_first(
    ctx: &EvalContext<'_, '_>,
    scope: Scope,
    locator: Option<&str>,
) -> (Option<XmlCursor>, Option<String>, Option<aurum_locator::Error>) {
    let locator = match (scope, locator) {
        (Scope::Missing, _) | (_, None) => return (None, None, None),
        (_, Some(locator)) => locator,
    };

    match ctx.first(locator, scope.node()) {
        Ok(Some(cursor)) => {
            let value = cursor.value(ctx.doc);
            (Some(cursor), value, None)
        }
        Ok(None) => (None, None, None),
        Err(error) => {
            tracing::warn!(locator = %locator, error = %error, "locator failed, subtree unattached");
            (None, None, Some(error))
        }
    }
}

/// The composite identity of an attached instance, once every
/// `matches_by` field has extracted a value. Instances with unresolvable
/// keys stay unkeyed and cannot be matched.
pub(crate) fn instance_key(
    tree: &DescriptorTree,
    instance: DescriptorId,
    matches_by: &[String],
) -> Option<CompositeKey> {
    let mut pairs = Vec::with_capacity(matches_by.len());
    for field in matches_by {
        let child = tree.child_by_key(instance, field)?;
        let value = tree.get(child).state.value()?.canonical();
        pairs.push((field.clone(), value));
    }
    Some(CompositeKey::new(pairs))
}

/// Attach a descriptor tree to a gold model.
pub fn attach_model(tree: &mut DescriptorTree, model: &dyn GoldModel, kind: ValidationKind) {
    tree.reset();
    attach_model_node(tree, tree.root_id(), Some(model), kind);
}

fn attach_model_node(
    tree: &mut DescriptorTree,
    id: DescriptorId,
    model: Option<&dyn GoldModel>,
    kind: ValidationKind,
) {
    let descriptor = tree.get(id);
    let accessor = descriptor.accessor(kind);

    match descriptor.kind {
        DescriptorKind::Field => {
            let value = model.and_then(|m| m.field(&accessor));
            tree.get_mut(id).state = AttachState::Attached {
                cursor: None,
                value,
                failure: None,
            };
        }
        DescriptorKind::Section | DescriptorKind::Component => {
            // Fall through to the same model when there is no nested
            // object: flat gold models keep section fields at the top.
            let sub = model.map(|m| m.child(&accessor).unwrap_or(m));
            tree.get_mut(id).state = AttachState::Attached {
                cursor: None,
                value: None,
                failure: None,
            };
            for child in tree.get(id).children.clone() {
                attach_model_node(tree, child, sub, kind);
            }
        }
        DescriptorKind::RepeatingSection => {
            let matches_by = tree.get(id).options.matches_by_for(kind);
            let items = model.map(|m| m.children(&accessor)).unwrap_or_default();
            tree.get_mut(id).state = AttachState::Attached {
                cursor: None,
                value: None,
                failure: None,
            };
            let section_key = tree.get(id).key.clone();
            for (index, item) in items.into_iter().enumerate() {
                let instance = tree.add_instance(id, index, format!("{}[{}]", section_key, index + 1));
                tree.get_mut(instance).state = AttachState::Attached {
                    cursor: None,
                    value: None,
                    failure: None,
                };
                for child in tree.get(instance).children.clone() {
                    attach_model_node(tree, child, Some(item), kind);
                }
                tree.get_mut(instance).composite_key = instance_key(tree, instance, &matches_by);
            }
        }
        DescriptorKind::RepeatingInstance => {}
    }
}
