//! Comparison engine - walking gold model and attached tree in parallel
//!
//! A [`ComponentScope`] walks one component's attached descriptor tree
//! against the gold model, dispatching on the descriptor kind tag, and
//! accumulates issues in depth-first traversal order. Absent gold values
//! are absent expectations: only values the gold model actually carries
//! can produce an issue.

use crate::issue::ValidationIssue;
use aurum_descriptors::{
    CompositeKey, DescriptorId, DescriptorKind, DescriptorTree, ValidationKind,
};
use aurum_locator::{innermost_resolvable, node_path, EvalContext, XmlCursor};
use aurum_models::GoldModel;
use roxmltree::NodeId;
use std::collections::{BTreeMap, BTreeSet};

/// One component's comparison pass.
pub struct ComponentScope<'a, 'input> {
    tree: &'a DescriptorTree,
    ctx: EvalContext<'a, 'input>,
    kind: ValidationKind,
    /// Component-module key, used as the issue section label.
    component: String,
    validator: String,
    issues: Vec<ValidationIssue>,
}

impl<'a, 'input> ComponentScope<'a, 'input> {
    pub fn new(
        tree: &'a DescriptorTree,
        ctx: EvalContext<'a, 'input>,
        kind: ValidationKind,
        component: impl Into<String>,
        validator: impl Into<String>,
    ) -> Self {
        Self {
            tree,
            ctx,
            kind,
            component: component.into(),
            validator: validator.into(),
            issues: Vec::new(),
        }
    }

    /// Walk the tree against the gold model and return the issue list.
    pub fn compare(mut self, gold: &dyn GoldModel) -> Vec<ValidationIssue> {
        self.walk(self.tree.root_id(), gold, None);
        self.issues
    }

    fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue.with_validator(self.validator.clone()));
    }

    fn walk(&mut self, id: DescriptorId, gold: &dyn GoldModel, context: Option<NodeId>) {
        let descriptor = self.tree.get(id);

        if let Some(failure) = descriptor.state.failure() {
            let mut issue = ValidationIssue::general(self.component.clone(), failure.to_string())
                .with_subsection(descriptor.key.clone());
            if let Some(location) = context.map(|node| self.path_of(XmlCursor::element(node))) {
                issue = issue.with_location(location);
            }
            self.push(issue);
            return;
        }

        match descriptor.kind {
            DescriptorKind::Component | DescriptorKind::Section => {
                self.walk_section(id, gold, context)
            }
            DescriptorKind::RepeatingSection => self.walk_repeating(id, gold, context),
            DescriptorKind::Field => self.walk_field(id, gold, context),
            // Instances are entered through their repeating section.
            DescriptorKind::RepeatingInstance => {}
        }
    }

    fn walk_section(&mut self, id: DescriptorId, gold: &dyn GoldModel, context: Option<NodeId>) {
        let descriptor = self.tree.get(id);
        let accessor = descriptor.accessor(self.kind);
        let sub = gold.child(&accessor);
        let scope_gold = sub.unwrap_or(gold);
        let locator = descriptor.locator(self.kind);
        let cursor = descriptor.state.cursor().cloned();

        if cursor.is_none() {
            if let Some(locator) = locator {
                let expectation = sub.is_some() || self.has_expectation(id, scope_gold);
                if descriptor.options.is_required(self.kind) && expectation {
                    let location = self.nearest_location(&locator, context);
                    self.push(
                        ValidationIssue::section_not_found(self.component.clone(), locator)
                            .with_subsection(descriptor.key.clone())
                            .with_location(location),
                    );
                }
                // Matched nothing: the subtree is unattached either way.
                return;
            }
        }

        let next_context = cursor.map(|c| c.node).or(context);
        for child in &descriptor.children {
            self.walk(*child, scope_gold, next_context);
        }
    }

    fn walk_field(&mut self, id: DescriptorId, gold: &dyn GoldModel, context: Option<NodeId>) {
        let descriptor = self.tree.get(id);
        let accessor = descriptor.accessor(self.kind);

        let expected = match gold.field(&accessor) {
            Some(expected) => expected.canonical(),
            // No expectation, nothing to compare.
            None => return,
        };

        match descriptor.state.value() {
            Some(actual) => {
                let actual = actual.canonical();
                if actual != expected {
                    let location = match descriptor.state.cursor() {
                        Some(cursor) => self.path_of(cursor.clone()),
                        None => self.nearest_location(
                            descriptor.locator(self.kind).as_deref().unwrap_or(""),
                            context,
                        ),
                    };
                    self.push(
                        ValidationIssue::comparison(
                            self.component.clone(),
                            descriptor.key.clone(),
                            expected,
                            Some(actual),
                        )
                        .with_location(location),
                    );
                }
            }
            None => {
                if descriptor.options.is_required(self.kind) {
                    let locator = descriptor.locator(self.kind).unwrap_or_default();
                    let location = self.nearest_location(&locator, context);
                    self.push(
                        ValidationIssue::section_not_found(self.component.clone(), locator)
                            .with_field_name(descriptor.key.clone())
                            .with_location(location),
                    );
                }
            }
        }
    }

    fn walk_repeating(&mut self, id: DescriptorId, gold: &dyn GoldModel, context: Option<NodeId>) {
        let descriptor = self.tree.get(id);
        let accessor = descriptor.accessor(self.kind);
        let matches_by = descriptor.options.matches_by_for(self.kind);
        let gold_instances = gold.children(&accessor);
        if gold_instances.is_empty() {
            return;
        }

        // Attached instances indexed by composite key; on duplicate keys
        // the first instance in document order claims the key.
        let instances = descriptor.instances.clone();
        let mut by_key: BTreeMap<CompositeKey, DescriptorId> = BTreeMap::new();
        for instance in &instances {
            if let Some(key) = &self.tree.get(*instance).composite_key {
                by_key.entry(key.clone()).or_insert(*instance);
            }
        }

        // Match every gold instance first, so unmatched-instance context
        // reflects the full assignment rather than the emission order.
        let mut matched: Vec<Option<DescriptorId>> = Vec::with_capacity(gold_instances.len());
        let mut claimed: BTreeSet<DescriptorId> = BTreeSet::new();
        for gold_instance in &gold_instances {
            let key = self.gold_key(id, *gold_instance, &matches_by);
            let instance = key.and_then(|k| by_key.get(&k)).copied();
            if let Some(instance) = instance {
                claimed.insert(instance);
            }
            matched.push(instance);
        }

        let provided_sections: Vec<BTreeMap<String, String>> = instances
            .iter()
            .filter(|instance| !claimed.contains(*instance))
            .map(|instance| self.flatten_instance(*instance))
            .collect();

        for (gold_instance, instance) in gold_instances.iter().zip(matched) {
            match instance {
                Some(instance) => {
                    let node = self
                        .tree
                        .get(instance)
                        .state
                        .cursor()
                        .map(|c| c.node)
                        .or(context);
                    for child in &self.tree.get(instance).children {
                        self.walk(*child, *gold_instance, node);
                    }
                }
                None => {
                    let expected_section = self.flatten_gold(id, *gold_instance);
                    let locator = self
                        .tree
                        .get(id)
                        .locator(self.kind)
                        .unwrap_or_default();
                    let location = self.nearest_location(&locator, context);
                    self.push(
                        ValidationIssue::no_matching_section(
                            self.component.clone(),
                            self.tree.get(id).key.clone(),
                            expected_section,
                            provided_sections.clone(),
                        )
                        .with_location(location),
                    );
                }
            }
        }
    }

    /// The composite key a gold instance would have, from the same
    /// `matches_by` fields the attached instances were keyed by.
    fn gold_key(
        &self,
        section: DescriptorId,
        gold: &dyn GoldModel,
        matches_by: &[String],
    ) -> Option<CompositeKey> {
        let mut pairs = Vec::with_capacity(matches_by.len());
        for field in matches_by {
            let child = self.tree.child_by_key(section, field)?;
            let accessor = self.tree.get(child).accessor(self.kind);
            let value = gold.field(&accessor)?.canonical();
            pairs.push((field.clone(), value));
        }
        Some(CompositeKey::new(pairs))
    }

    /// Flattened field values of a gold instance, keyed by field name.
    fn flatten_gold(&self, section: DescriptorId, gold: &dyn GoldModel) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        for field in self.tree.field_descendants(section) {
            let descriptor = self.tree.get(field);
            let accessor = descriptor.accessor(self.kind);
            if let Some(value) = gold.field(&accessor) {
                map.insert(descriptor.key.clone(), value.canonical());
            }
        }
        map
    }

    /// Flattened extracted values of an attached instance.
    fn flatten_instance(&self, instance: DescriptorId) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        for field in self.tree.field_descendants(instance) {
            let descriptor = self.tree.get(field);
            if let Some(value) = descriptor.state.value() {
                map.insert(descriptor.key.clone(), value.canonical());
            }
        }
        map
    }

    /// Whether the gold model carries any expectation under `id`: a field
    /// value, a nested section object, or a non-empty repeating
    /// collection.
    fn has_expectation(&self, id: DescriptorId, gold: &dyn GoldModel) -> bool {
        self.tree.get(id).children.iter().any(|child| {
            let descriptor = self.tree.get(*child);
            let accessor = descriptor.accessor(self.kind);
            match descriptor.kind {
                DescriptorKind::Field => gold.field(&accessor).is_some(),
                DescriptorKind::RepeatingSection => !gold.children(&accessor).is_empty(),
                DescriptorKind::Section | DescriptorKind::Component => {
                    gold.child(&accessor).is_some() || self.has_expectation(*child, gold)
                }
                DescriptorKind::RepeatingInstance => false,
            }
        })
    }

    fn nearest_location(&self, locator: &str, context: Option<NodeId>) -> String {
        innermost_resolvable(&self.ctx, locator, context)
            .map(|cursor| self.path_of(cursor))
            .unwrap_or_default()
    }

    fn path_of(&self, cursor: XmlCursor) -> String {
        node_path(self.ctx.doc, &cursor)
    }
}
