//! Validator plugin contract and the content validator
//!
//! [`DocumentValidator`] is the uniform contract an orchestrating host
//! invokes: every validator - this content engine, XML schema,
//! schematron, terminology checkers - takes a gold model and a parsed
//! document and returns a flat issue list. Results from sibling
//! validators concatenate.
//!
//! [`ContentValidator`] is the implementation this crate provides: per
//! component it copies the registered descriptor tree, attaches the
//! document, and compares the gold model against the attached tree.

use crate::attach::attach_xml;
use crate::error::Result;
use crate::issue::ValidationIssue;
use crate::scope::ComponentScope;
use aurum_descriptors::{ComponentDefinition, Registry, ValidationKind};
use aurum_locator::{EvalContext, Namespaces};
use aurum_models::GoldModel;
use roxmltree::Document;
use std::sync::Arc;

/// Uniform validator contract.
pub trait DocumentValidator {
    fn name(&self) -> &str;

    /// Validate one document against one gold model. Never fails on
    /// document content; everything wrong comes back as issues.
    fn validate(&self, gold: &dyn GoldModel, doc: &Document<'_>) -> Vec<ValidationIssue>;
}

/// Descriptor-driven gold-model content validation.
pub struct ContentValidator {
    registry: Arc<Registry>,
    kind: ValidationKind,
    namespaces: Namespaces,
    /// Restrict validation to these component keys (all when absent).
    components: Option<Vec<String>>,
}

impl ContentValidator {
    pub fn new(registry: Arc<Registry>, kind: ValidationKind) -> Self {
        Self {
            registry,
            kind,
            namespaces: Namespaces::default(),
            components: None,
        }
    }

    /// Restrict the run to a component subset. Unknown keys are
    /// configuration errors, raised here rather than during validation.
    pub fn with_components<I, S>(mut self, keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        for key in &keys {
            self.registry.get(key)?;
        }
        self.components = Some(keys);
        Ok(self)
    }

    pub fn with_namespaces(mut self, namespaces: Namespaces) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn kind(&self) -> ValidationKind {
        self.kind
    }

    fn selected_definitions(&self) -> Vec<&ComponentDefinition> {
        match &self.components {
            Some(keys) => keys
                .iter()
                .filter_map(|key| self.registry.get(key).ok())
                .collect(),
            None => self.registry.definitions().collect(),
        }
    }

    fn validate_component(
        &self,
        definition: &ComponentDefinition,
        gold: &dyn GoldModel,
        doc: &Document<'_>,
    ) -> Vec<ValidationIssue> {
        let ctx = EvalContext::new(doc, &self.namespaces);

        if definition.repeats() {
            let root = definition.tree().root_id();
            let accessor = definition.tree().get(root).accessor(self.kind);
            let instances = gold.children(&accessor);
            let mut issues = Vec::new();
            // Module-level occurrences align positionally: the n-th gold
            // instance validates against the n-th document match.
            for (index, instance) in instances.iter().enumerate() {
                let mut tree = definition.instantiate();
                if let Some(locator) = tree.get(root).locator(self.kind) {
                    tree.get_mut(root).explicit_locator =
                        Some(format!("{}[{}]", locator, index + 1));
                }
                attach_xml(&mut tree, doc, &self.namespaces, self.kind);
                issues.extend(
                    ComponentScope::new(&tree, ctx, self.kind, definition.key(), self.name())
                        .compare(*instance),
                );
            }
            issues
        } else {
            let mut tree = definition.instantiate();
            attach_xml(&mut tree, doc, &self.namespaces, self.kind);
            ComponentScope::new(&tree, ctx, self.kind, definition.key(), self.name()).compare(gold)
        }
    }
}

impl DocumentValidator for ContentValidator {
    fn name(&self) -> &str {
        "content"
    }

    fn validate(&self, gold: &dyn GoldModel, doc: &Document<'_>) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for definition in self.selected_definitions() {
            let component_issues = self.validate_component(definition, gold, doc);
            tracing::debug!(
                component = definition.key(),
                kind = %self.kind,
                issues = component_issues.len(),
                "validated component"
            );
            issues.extend(component_issues);
        }
        issues
    }
}
