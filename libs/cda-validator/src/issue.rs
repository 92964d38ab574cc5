//! Validation issue taxonomy
//!
//! Everything the engine finds wrong with a document is a
//! [`ValidationIssue`] value in a flat list - the walk never throws on
//! document content. The `kind` distinguishes structural absence
//! (`SectionNotFound`), value mismatch (`Comparison`), and repeating-
//! identity misses (`NoMatchingSection`); the latter two are flagged for
//! human review since they may reflect legitimate encoding variance
//! rather than a real defect.

use serde_json::Value;
use std::collections::BTreeMap;

/// Individual validation issue
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub inspection: InspectionKind,
    /// Name of the producing validator plugin.
    pub validator: String,
    /// Component-module key the issue belongs to.
    pub section: String,
    pub subsection: Option<String>,
    pub field_name: Option<String>,
    pub message: String,
    /// xpath-of-this-node string of the closest resolvable element.
    pub location: Option<String>,
}

impl ValidationIssue {
    pub fn general(section: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(IssueKind::General, InspectionKind::Content, section, message)
    }

    pub fn comparison(
        section: impl Into<String>,
        field_name: impl Into<String>,
        expected: impl Into<String>,
        provided: Option<String>,
    ) -> Self {
        let expected = expected.into();
        let field_name = field_name.into();
        let message = match &provided {
            Some(provided) => format!(
                "expected {} '{}', got '{}'",
                field_name, expected, provided
            ),
            None => format!("expected {} '{}', got nothing", field_name, expected),
        };
        let mut issue = Self::new(
            IssueKind::Comparison { expected, provided },
            InspectionKind::Content,
            section,
            message,
        );
        issue.field_name = Some(field_name);
        issue
    }

    pub fn no_matching_section(
        section: impl Into<String>,
        subsection: impl Into<String>,
        expected_section: BTreeMap<String, String>,
        provided_sections: Vec<BTreeMap<String, String>>,
    ) -> Self {
        let subsection = subsection.into();
        let message = format!(
            "no {} entry matches the expected values ({} provided)",
            subsection,
            provided_sections.len()
        );
        let mut issue = Self::new(
            IssueKind::NoMatchingSection {
                expected_section,
                provided_sections,
            },
            InspectionKind::Content,
            section,
            message,
        );
        issue.subsection = Some(subsection);
        issue
    }

    pub fn section_not_found(section: impl Into<String>, locator: impl Into<String>) -> Self {
        let locator = locator.into();
        let message = format!("no document content at {}", locator);
        Self::new(
            IssueKind::SectionNotFound { locator },
            InspectionKind::Structure,
            section,
            message,
        )
    }

    fn new(
        kind: IssueKind,
        inspection: InspectionKind,
        section: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            inspection,
            validator: String::new(),
            section: section.into(),
            subsection: None,
            field_name: None,
            message: message.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_subsection(mut self, subsection: impl Into<String>) -> Self {
        self.subsection = Some(subsection.into());
        self
    }

    pub fn with_field_name(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = Some(field_name.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_validator(mut self, validator: impl Into<String>) -> Self {
        self.validator = validator.into();
        self
    }

    /// Whether the issue needs human adjudication. Comparison and
    /// no-matching-section findings may be legitimate encoding variance;
    /// structural absence is a hard miss.
    pub fn reviewable(&self) -> bool {
        matches!(
            self.kind,
            IssueKind::Comparison { .. } | IssueKind::NoMatchingSection { .. }
        )
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn to_json(&self) -> Value {
        let mut issue = serde_json::json!({
            "severity": self.severity.to_string(),
            "inspection": self.inspection.to_string(),
            "validator": self.validator,
            "section": self.section,
            "message": self.message,
            "reviewable": self.reviewable(),
        });

        if let Some(ref subsection) = self.subsection {
            issue["subsection"] = Value::String(subsection.clone());
        }
        if let Some(ref field_name) = self.field_name {
            issue["field"] = Value::String(field_name.clone());
        }
        if let Some(ref location) = self.location {
            issue["location"] = Value::String(location.clone());
        }

        match &self.kind {
            IssueKind::General => {}
            IssueKind::Comparison { expected, provided } => {
                issue["expected"] = Value::String(expected.clone());
                issue["provided"] = match provided {
                    Some(provided) => Value::String(provided.clone()),
                    None => Value::Null,
                };
            }
            IssueKind::NoMatchingSection {
                expected_section,
                provided_sections,
            } => {
                issue["expected_section"] = serde_json::json!(expected_section);
                issue["provided_sections"] = serde_json::json!(provided_sections);
            }
            IssueKind::SectionNotFound { locator } => {
                issue["locator"] = Value::String(locator.clone());
            }
        }

        issue
    }
}

/// What went wrong.
#[derive(Debug, Clone, PartialEq)]
pub enum IssueKind {
    /// Extraction failures and other located problems.
    General,
    /// Field value mismatch.
    Comparison {
        expected: String,
        provided: Option<String>,
    },
    /// No repeating instance carries the expected identity key.
    NoMatchingSection {
        /// Flattened field values of the unmatched gold instance.
        expected_section: BTreeMap<String, String>,
        /// One flattened map per attached-but-unmatched document instance.
        provided_sections: Vec<BTreeMap<String, String>>,
    },
    /// Required content structurally absent.
    SectionNotFound { locator: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectionKind {
    Content,
    Structure,
}

impl std::fmt::Display for InspectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Content => write!(f, "content"),
            Self::Structure => write!(f, "structure"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparison_issues_are_reviewable() {
        let issue = ValidationIssue::comparison(
            "languages",
            "language_code",
            "foo",
            Some("en-US".to_string()),
        );
        assert!(issue.reviewable());
        assert_eq!(issue.field_name.as_deref(), Some("language_code"));
        assert!(issue.message.contains("'foo'"));
    }

    #[test]
    fn section_not_found_is_a_hard_miss() {
        let issue = ValidationIssue::section_not_found("medications", "cda:entry");
        assert!(!issue.reviewable());
        assert_eq!(issue.inspection, InspectionKind::Structure);
    }

    #[test]
    fn issues_serialize_their_diff_context() {
        let mut expected = BTreeMap::new();
        expected.insert("language_code".to_string(), "foo".to_string());
        let mut provided = BTreeMap::new();
        provided.insert("language_code".to_string(), "en-US".to_string());

        let issue = ValidationIssue::no_matching_section(
            "languages",
            "language_communication",
            expected,
            vec![provided],
        )
        .with_validator("content")
        .with_location("/ClinicalDocument/recordTarget");

        let json = issue.to_json();
        assert_eq!(json["severity"], "error");
        assert_eq!(json["expected_section"]["language_code"], "foo");
        assert_eq!(json["provided_sections"][0]["language_code"], "en-US");
        assert_eq!(json["location"], "/ClinicalDocument/recordTarget");
    }
}
