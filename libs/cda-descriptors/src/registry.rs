//! Component registry
//!
//! The registry is an explicit value: built once from mapping
//! declarations, then read-only. Validation runs share it behind an `Arc`
//! and never mutate it; per-run state lives in the tree copies handed out
//! by [`ComponentDefinition::instantiate`].

use crate::descriptor::DescriptorTree;
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// A registered component-module descriptor tree.
#[derive(Debug, Clone)]
pub struct ComponentDefinition {
    key: String,
    repeats: bool,
    tree: DescriptorTree,
}

impl ComponentDefinition {
    pub(crate) fn new(key: String, repeats: bool, tree: DescriptorTree) -> Self {
        Self { key, repeats, tree }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the component module itself may occur 0..n times.
    pub fn repeats(&self) -> bool {
        self.repeats
    }

    pub fn tree(&self) -> &DescriptorTree {
        &self.tree
    }

    /// A fresh unattached tree copy for one validation run. Attachment
    /// mutates cached state, so runs must never share a tree.
    pub fn instantiate(&self) -> DescriptorTree {
        self.tree.copy()
    }
}

/// Component-name → definition lookup.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    components: BTreeMap<String, ComponentDefinition>,
}

impl Registry {
    pub(crate) fn insert(&mut self, definition: ComponentDefinition) -> Result<()> {
        if self.components.contains_key(definition.key()) {
            return Err(Error::DuplicateComponent(definition.key().to_string()));
        }
        self.components
            .insert(definition.key().to_string(), definition);
        Ok(())
    }

    /// Look up a component. An unknown key is a programmer error, never a
    /// document defect.
    pub fn get(&self, key: &str) -> Result<&ComponentDefinition> {
        self.components
            .get(key)
            .ok_or_else(|| Error::UnknownComponent(key.to_string()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &ComponentDefinition> {
        self.components.values()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
