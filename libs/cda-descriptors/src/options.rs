//! Descriptor options and per-schema-version overrides
//!
//! One descriptor tree serves every supported document schema variant.
//! Options resolve through [`Options::for_kind`] semantics: the override
//! set registered for the active [`ValidationKind`] is consulted first,
//! then the base set, then the documented default.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The document schema variant a validation run targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValidationKind {
    C32v21,
    C32v25,
    C32v25C83,
    Ccr,
}

impl ValidationKind {
    pub const ALL: [ValidationKind; 4] = [
        Self::C32v21,
        Self::C32v25,
        Self::C32v25C83,
        Self::Ccr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::C32v21 => "c32-v2.1",
            Self::C32v25 => "c32-v2.5",
            Self::C32v25C83 => "c32-v2.5-c83",
            Self::Ccr => "ccr",
        }
    }
}

impl std::fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ValidationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|kind| kind.as_str() == s)
            .copied()
            .ok_or_else(|| Error::UnknownValidationKind(s.to_string()))
    }
}

/// How a missing locator is inferred from the section key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocateBy {
    #[default]
    Element,
    Attribute,
}

/// One layer of option values. Unset fields defer to the layer below.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptionSet {
    pub required: Option<bool>,
    pub repeats: Option<bool>,
    pub template_id: Option<String>,
    pub matches_by: Option<Vec<String>>,
    pub locate_by: Option<LocateBy>,
    pub accessor: Option<String>,
    pub dereference: Option<bool>,
}

impl OptionSet {
    pub fn required(mut self, value: bool) -> Self {
        self.required = Some(value);
        self
    }

    pub fn repeats(mut self, value: bool) -> Self {
        self.repeats = Some(value);
        self
    }

    pub fn template_id(mut self, value: impl Into<String>) -> Self {
        self.template_id = Some(value.into());
        self
    }

    pub fn matches_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.matches_by = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn locate_by(mut self, value: LocateBy) -> Self {
        self.locate_by = Some(value);
        self
    }

    pub fn accessor(mut self, value: impl Into<String>) -> Self {
        self.accessor = Some(value.into());
        self
    }

    pub fn dereference(mut self, value: bool) -> Self {
        self.dereference = Some(value);
        self
    }
}

/// A descriptor's full configuration: base values plus per-kind overrides.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Options {
    pub base: OptionSet,
    pub overrides: BTreeMap<ValidationKind, OptionSet>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, value: bool) -> Self {
        self.base.required = Some(value);
        self
    }

    pub fn repeats(mut self, value: bool) -> Self {
        self.base.repeats = Some(value);
        self
    }

    pub fn template_id(mut self, value: impl Into<String>) -> Self {
        self.base.template_id = Some(value.into());
        self
    }

    pub fn matches_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base.matches_by = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn locate_by(mut self, value: LocateBy) -> Self {
        self.base.locate_by = Some(value);
        self
    }

    pub fn accessor(mut self, value: impl Into<String>) -> Self {
        self.base.accessor = Some(value.into());
        self
    }

    pub fn dereference(mut self, value: bool) -> Self {
        self.base.dereference = Some(value);
        self
    }

    /// Register an override layer for one schema variant.
    pub fn for_kind(mut self, kind: ValidationKind, f: impl FnOnce(OptionSet) -> OptionSet) -> Self {
        let set = self.overrides.remove(&kind).unwrap_or_default();
        self.overrides.insert(kind, f(set));
        self
    }

    fn lookup<T: Clone>(
        &self,
        kind: ValidationKind,
        get: impl Fn(&OptionSet) -> Option<T>,
    ) -> Option<T> {
        self.overrides
            .get(&kind)
            .and_then(&get)
            .or_else(|| get(&self.base))
    }

    /// Required defaults to true unless explicitly disabled.
    pub fn is_required(&self, kind: ValidationKind) -> bool {
        self.lookup(kind, |o| o.required).unwrap_or(true)
    }

    pub fn is_repeating(&self, kind: ValidationKind) -> bool {
        self.lookup(kind, |o| o.repeats).unwrap_or(false)
    }

    pub fn template_id_for(&self, kind: ValidationKind) -> Option<String> {
        self.lookup(kind, |o| o.template_id.clone())
    }

    pub fn matches_by_for(&self, kind: ValidationKind) -> Vec<String> {
        self.lookup(kind, |o| o.matches_by.clone()).unwrap_or_default()
    }

    pub fn locate_by_for(&self, kind: ValidationKind) -> LocateBy {
        self.lookup(kind, |o| o.locate_by).unwrap_or_default()
    }

    pub fn accessor_for(&self, kind: ValidationKind) -> Option<String> {
        self.lookup(kind, |o| o.accessor.clone())
    }

    pub fn dereferences(&self, kind: ValidationKind) -> bool {
        self.lookup(kind, |o| o.dereference).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_win_over_base_values() {
        let options = Options::new()
            .required(true)
            .dereference(false)
            .for_kind(ValidationKind::C32v25, |o| o.dereference(true));

        assert!(!options.dereferences(ValidationKind::C32v21));
        assert!(options.dereferences(ValidationKind::C32v25));
        // Untouched options fall through to the base layer.
        assert!(options.is_required(ValidationKind::C32v25));
    }

    #[test]
    fn required_defaults_to_true() {
        let options = Options::new();
        assert!(options.is_required(ValidationKind::C32v21));
        assert!(!Options::new().required(false).is_required(ValidationKind::C32v21));
    }

    #[test]
    fn validation_kinds_round_trip_through_strings() {
        for kind in ValidationKind::ALL {
            assert_eq!(kind.as_str().parse::<ValidationKind>().unwrap(), kind);
        }
        assert!("c99".parse::<ValidationKind>().is_err());
    }
}
