//! Canonical field values
//!
//! Both sources a descriptor can attach to (an XML node or a gold-model
//! accessor) produce a [`FieldValue`]. Comparison happens exclusively on
//! the canonical string form, so `NaiveDate(2010-05-21)` in the model and
//! the HL7 TS literal `"20100521"` in the document compare equal.

use chrono::NaiveDate;

/// A value extracted from a gold model or an XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    Int(i64),
    Bool(bool),
}

impl FieldValue {
    /// The normalized string form used for comparison.
    ///
    /// Dates render as the 8-digit brief form (`"20100521"`); everything
    /// else via plain string coercion. Canonicalization is idempotent:
    /// `FieldValue::text(v.canonical()).canonical() == v.canonical()`.
    pub fn canonical(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Date(d) => d.format("%Y%m%d").to_string(),
            Self::Int(i) => i.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Interpret a raw string from a gold-model source.
    ///
    /// ISO `YYYY-MM-DD` strings become dates; anything else stays text.
    /// Document-side values are never sniffed this way (HL7 TS literals
    /// are already in brief form and compare as text).
    pub fn from_model_text(raw: &str) -> Self {
        match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Self::Date(date),
            Err(_) => Self::Text(raw.to_string()),
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_canonicalize_to_brief_form() {
        let date = FieldValue::Date(NaiveDate::from_ymd_opt(2010, 5, 21).unwrap());
        assert_eq!(date.canonical(), "20100521");
    }

    #[test]
    fn canonicalization_is_idempotent() {
        let date = FieldValue::Date(NaiveDate::from_ymd_opt(2010, 5, 21).unwrap());
        let reparsed = FieldValue::text(date.canonical());
        assert_eq!(reparsed.canonical(), date.canonical());

        let text = FieldValue::text("en-US");
        assert_eq!(FieldValue::text(text.canonical()).canonical(), text.canonical());
    }

    #[test]
    fn iso_dates_recognized_from_model_text() {
        assert_eq!(
            FieldValue::from_model_text("2010-05-21"),
            FieldValue::Date(NaiveDate::from_ymd_opt(2010, 5, 21).unwrap())
        );
        assert_eq!(
            FieldValue::from_model_text("en-US"),
            FieldValue::Text("en-US".to_string())
        );
    }

    #[test]
    fn model_and_document_forms_compare_equal() {
        let model = FieldValue::from_model_text("2010-05-21");
        let document = FieldValue::text("20100521");
        assert_eq!(model.canonical(), document.canonical());
    }
}
