//! Mapping DSL - declaring component descriptor trees
//!
//! A [`Mapping`] collects component declarations and shared fragments,
//! then compiles into a read-only [`Registry`]. The original system's
//! three call shapes - `(key)`, `(key, options)`, `({key => locator},
//! options)` - become distinct typed methods (`field`, `field_with`,
//! `field_at`, `field_at_with`), so the ambiguous-arguments class of
//! definition error is unrepresentable here. The errors that remain
//! representable (duplicate keys, unknown fragments) surface at
//! definition time.
//!
//! ```
//! use aurum_descriptors::{Mapping, Options};
//!
//! let mut mapping = Mapping::new();
//! mapping
//!     .component("languages", |c| {
//!         c.repeating_section_at_with(
//!             "language_communication",
//!             "//cda:recordTarget/cda:patientRole/cda:patient/cda:languageCommunication",
//!             Options::new().matches_by(["language_code"]),
//!             |s| {
//!                 s.field_at("language_code", "cda:languageCode/@code")?;
//!                 s.field_at_with(
//!                     "language_ability_mode",
//!                     "cda:modeCode/@code",
//!                     Options::new().required(false),
//!                 )
//!             },
//!         )
//!     })
//!     .unwrap();
//! let registry = mapping.build();
//! assert!(registry.get("languages").is_ok());
//! ```

use crate::descriptor::{Descriptor, DescriptorId, DescriptorKind, DescriptorTree};
use crate::error::{Error, Result};
use crate::options::Options;
use crate::registry::{ComponentDefinition, Registry};
use std::collections::BTreeMap;

/// Collects component and fragment declarations.
#[derive(Debug, Default)]
pub struct Mapping {
    commons: BTreeMap<String, DescriptorTree>,
    registry: Registry,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reusable fragment. `reference` inlines a copy wherever
    /// it is used; fragments never alias.
    pub fn common(
        &mut self,
        key: &str,
        f: impl FnOnce(&mut NodeBuilder) -> Result<()>,
    ) -> Result<&mut Self> {
        self.common_node(key, None, f)
    }

    /// Register a reusable fragment with an explicit locator.
    pub fn common_at(
        &mut self,
        key: &str,
        locator: &str,
        f: impl FnOnce(&mut NodeBuilder) -> Result<()>,
    ) -> Result<&mut Self> {
        self.common_node(key, Some(locator.to_string()), f)
    }

    fn common_node(
        &mut self,
        key: &str,
        locator: Option<String>,
        f: impl FnOnce(&mut NodeBuilder) -> Result<()>,
    ) -> Result<&mut Self> {
        if self.commons.contains_key(key) {
            return Err(Error::DuplicateCommon(key.to_string()));
        }
        let root = Descriptor::new(key, DescriptorKind::Section, locator, Options::new());
        let mut tree = DescriptorTree::new(root);
        {
            let mut builder = NodeBuilder {
                node: tree.root_id(),
                tree: &mut tree,
                commons: &self.commons,
            };
            f(&mut builder)?;
        }
        self.commons.insert(key.to_string(), tree);
        Ok(self)
    }

    /// Declare a single-occurrence component module.
    pub fn component(
        &mut self,
        key: &str,
        f: impl FnOnce(&mut NodeBuilder) -> Result<()>,
    ) -> Result<&mut Self> {
        self.register(key, None, Options::new(), false, f)
    }

    pub fn component_with(
        &mut self,
        key: &str,
        options: Options,
        f: impl FnOnce(&mut NodeBuilder) -> Result<()>,
    ) -> Result<&mut Self> {
        self.register(key, None, options, false, f)
    }

    pub fn component_at(
        &mut self,
        key: &str,
        locator: &str,
        f: impl FnOnce(&mut NodeBuilder) -> Result<()>,
    ) -> Result<&mut Self> {
        self.register(key, Some(locator.to_string()), Options::new(), false, f)
    }

    pub fn component_at_with(
        &mut self,
        key: &str,
        locator: &str,
        options: Options,
        f: impl FnOnce(&mut NodeBuilder) -> Result<()>,
    ) -> Result<&mut Self> {
        self.register(key, Some(locator.to_string()), options, false, f)
    }

    /// Declare a component module that may occur 0..n times.
    pub fn components(
        &mut self,
        key: &str,
        f: impl FnOnce(&mut NodeBuilder) -> Result<()>,
    ) -> Result<&mut Self> {
        self.register(key, None, Options::new(), true, f)
    }

    pub fn components_at_with(
        &mut self,
        key: &str,
        locator: &str,
        options: Options,
        f: impl FnOnce(&mut NodeBuilder) -> Result<()>,
    ) -> Result<&mut Self> {
        self.register(key, Some(locator.to_string()), options, true, f)
    }

    fn register(
        &mut self,
        key: &str,
        locator: Option<String>,
        options: Options,
        repeats: bool,
        f: impl FnOnce(&mut NodeBuilder) -> Result<()>,
    ) -> Result<&mut Self> {
        let root = Descriptor::new(key, DescriptorKind::Component, locator, options);
        let mut tree = DescriptorTree::new(root);
        {
            let mut builder = NodeBuilder {
                node: tree.root_id(),
                tree: &mut tree,
                commons: &self.commons,
            };
            f(&mut builder)?;
        }
        self.registry
            .insert(ComponentDefinition::new(key.to_string(), repeats, tree))?;
        Ok(self)
    }

    /// Compile into the read-only registry.
    pub fn build(self) -> Registry {
        self.registry
    }
}

/// Builder scoped to one descriptor node.
pub struct NodeBuilder<'a> {
    tree: &'a mut DescriptorTree,
    node: DescriptorId,
    commons: &'a BTreeMap<String, DescriptorTree>,
}

impl<'a> NodeBuilder<'a> {
    pub fn field(&mut self, key: &str) -> Result<()> {
        self.add_field(key, None, Options::new())
    }

    pub fn field_at(&mut self, key: &str, locator: &str) -> Result<()> {
        self.add_field(key, Some(locator.to_string()), Options::new())
    }

    pub fn field_with(&mut self, key: &str, options: Options) -> Result<()> {
        self.add_field(key, None, options)
    }

    pub fn field_at_with(&mut self, key: &str, locator: &str, options: Options) -> Result<()> {
        self.add_field(key, Some(locator.to_string()), options)
    }

    fn add_field(&mut self, key: &str, locator: Option<String>, options: Options) -> Result<()> {
        let descriptor = Descriptor::new(key, DescriptorKind::Field, locator, options);
        self.tree.add_child(self.node, descriptor)?;
        Ok(())
    }

    pub fn section(
        &mut self,
        key: &str,
        f: impl FnOnce(&mut NodeBuilder) -> Result<()>,
    ) -> Result<()> {
        self.add_section(key, None, Options::new(), f)
    }

    pub fn section_at(
        &mut self,
        key: &str,
        locator: &str,
        f: impl FnOnce(&mut NodeBuilder) -> Result<()>,
    ) -> Result<()> {
        self.add_section(key, Some(locator.to_string()), Options::new(), f)
    }

    pub fn section_with(
        &mut self,
        key: &str,
        options: Options,
        f: impl FnOnce(&mut NodeBuilder) -> Result<()>,
    ) -> Result<()> {
        self.add_section(key, None, options, f)
    }

    pub fn section_at_with(
        &mut self,
        key: &str,
        locator: &str,
        options: Options,
        f: impl FnOnce(&mut NodeBuilder) -> Result<()>,
    ) -> Result<()> {
        self.add_section(key, Some(locator.to_string()), options, f)
    }

    fn add_section(
        &mut self,
        key: &str,
        locator: Option<String>,
        options: Options,
        f: impl FnOnce(&mut NodeBuilder) -> Result<()>,
    ) -> Result<()> {
        let descriptor = Descriptor::new(key, DescriptorKind::Section, locator, options);
        let id = self.tree.add_child(self.node, descriptor)?;
        let mut builder = NodeBuilder {
            tree: &mut *self.tree,
            node: id,
            commons: self.commons,
        };
        f(&mut builder)
    }

    pub fn repeating_section_with(
        &mut self,
        key: &str,
        options: Options,
        f: impl FnOnce(&mut NodeBuilder) -> Result<()>,
    ) -> Result<()> {
        self.add_repeating(key, None, options, f)
    }

    pub fn repeating_section_at_with(
        &mut self,
        key: &str,
        locator: &str,
        options: Options,
        f: impl FnOnce(&mut NodeBuilder) -> Result<()>,
    ) -> Result<()> {
        self.add_repeating(key, Some(locator.to_string()), options, f)
    }

    fn add_repeating(
        &mut self,
        key: &str,
        locator: Option<String>,
        options: Options,
        f: impl FnOnce(&mut NodeBuilder) -> Result<()>,
    ) -> Result<()> {
        // Without matches_by an instance has no identity to match on.
        let has_key = options
            .base
            .matches_by
            .as_ref()
            .is_some_and(|fields| !fields.is_empty())
            || options
                .overrides
                .values()
                .any(|set| set.matches_by.as_ref().is_some_and(|fields| !fields.is_empty()));
        if !has_key {
            return Err(Error::EmptyMatchesBy(key.to_string()));
        }
        let options = options.repeats(true);
        let descriptor = Descriptor::new(key, DescriptorKind::RepeatingSection, locator, options);
        let id = self.tree.add_child(self.node, descriptor)?;
        let mut builder = NodeBuilder {
            tree: &mut *self.tree,
            node: id,
            commons: self.commons,
        };
        f(&mut builder)
    }

    /// Inline a copy of a registered common fragment.
    pub fn reference(&mut self, key: &str) -> Result<()> {
        let fragment = self
            .commons
            .get(key)
            .ok_or_else(|| Error::UnknownCommon(key.to_string()))?;
        self.tree
            .graft(fragment, fragment.root_id(), self.node)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DescriptorKind;
    use crate::options::ValidationKind;

    #[test]
    fn builds_components_with_nested_sections() {
        let mut mapping = Mapping::new();
        mapping
            .component_with(
                "medications",
                Options::new().template_id("2.16.840.1.113883.10.20.1.8"),
                |c| {
                    c.repeating_section_at_with(
                        "medication",
                        "cda:entry/cda:substanceAdministration",
                        Options::new().matches_by(["product_name"]),
                        |m| m.field_at("product_name", "cda:consumable//cda:name"),
                    )
                },
            )
            .unwrap();

        let registry = mapping.build();
        let definition = registry.get("medications").unwrap();
        assert!(!definition.repeats());

        let tree = definition.tree();
        let root = tree.get(tree.root_id());
        assert_eq!(root.kind, DescriptorKind::Component);
        assert_eq!(
            root.locator(ValidationKind::C32v21).as_deref(),
            Some("//cda:section[./cda:templateId[@root = '2.16.840.1.113883.10.20.1.8']]")
        );

        let section = tree.child_by_key(tree.root_id(), "medication").unwrap();
        assert!(tree.get(section).options.is_repeating(ValidationKind::C32v21));
    }

    #[test]
    fn references_inline_fragment_copies() {
        let mut mapping = Mapping::new();
        mapping
            .common_at("address", "cda:addr", |a| {
                a.field_at("street", "cda:streetAddressLine")?;
                a.field("city")?;
                a.field_with("postal_code", Options::new().required(false))
            })
            .unwrap();
        mapping
            .component_at("personal_information", "//cda:recordTarget/cda:patientRole", |c| {
                c.reference("address")
            })
            .unwrap();

        let registry = mapping.build();
        let tree = registry.get("personal_information").unwrap().tree();
        let address = tree.child_by_key(tree.root_id(), "address").unwrap();
        assert_eq!(tree.get(address).explicit_locator.as_deref(), Some("cda:addr"));
        // Inferred element locator from the snake_case key.
        let city = tree.child_by_key(address, "city").unwrap();
        assert_eq!(
            tree.get(city).locator(ValidationKind::C32v21).as_deref(),
            Some("cda:city")
        );
        assert_eq!(tree.index_key(city), "personal_information.address.city");
    }

    #[test]
    fn unknown_fragment_references_fail_at_definition_time() {
        let mut mapping = Mapping::new();
        let err = mapping
            .component("broken", |c| c.reference("no_such_fragment"))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownCommon(_)));
    }

    #[test]
    fn repeating_sections_require_matches_by() {
        let mut mapping = Mapping::new();
        let err = mapping
            .component("broken", |c| {
                c.repeating_section_with("entry", Options::new(), |e| e.field("code"))
            })
            .unwrap_err();
        assert!(matches!(err, Error::EmptyMatchesBy(_)));
    }

    #[test]
    fn duplicate_components_are_rejected() {
        let mut mapping = Mapping::new();
        mapping.component("languages", |c| c.field("language_code")).unwrap();
        let err = mapping
            .component("languages", |c| c.field("language_code"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateComponent(_)));
    }
}
