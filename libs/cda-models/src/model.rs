//! The gold-model capability trait
//!
//! The engine reads reference data through this interface only. Accessors
//! are the snake_case names declared by the component descriptors; which
//! accessors exist is mapping data, not something the type system can
//! enumerate up front, so the contract is a string-keyed capability
//! lookup rather than per-component getter traits.

use crate::error::{Error, Result};
use crate::value::FieldValue;
use serde_json::Value;

/// Read access to a reference ("gold") data model.
///
/// `field` answers scalar lookups, `child` a nested single sub-model,
/// `children` a repeating collection. All three return nothing (rather
/// than erroring) for accessors the model does not carry — an absent
/// expectation is not a defect.
pub trait GoldModel {
    fn field(&self, accessor: &str) -> Option<FieldValue>;

    fn child(&self, accessor: &str) -> Option<&dyn GoldModel>;

    fn children(&self, accessor: &str) -> Vec<&dyn GoldModel>;
}

/// `serde_json::Value`-backed gold model.
///
/// Objects are sections, arrays are repeating collections, and JSON
/// scalars are fields. ISO `YYYY-MM-DD` strings surface as dates.
impl GoldModel for Value {
    fn field(&self, accessor: &str) -> Option<FieldValue> {
        match self.get(accessor)? {
            Value::String(s) => Some(FieldValue::from_model_text(s)),
            Value::Bool(b) => Some(FieldValue::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(FieldValue::Int(i)),
                None => Some(FieldValue::text(n.to_string())),
            },
            _ => None,
        }
    }

    fn child(&self, accessor: &str) -> Option<&dyn GoldModel> {
        match self.get(accessor)? {
            value @ Value::Object(_) => Some(value as &dyn GoldModel),
            _ => None,
        }
    }

    fn children(&self, accessor: &str) -> Vec<&dyn GoldModel> {
        match self.get(accessor) {
            Some(Value::Array(items)) => items
                .iter()
                .filter(|item| item.is_object())
                .map(|item| item as &dyn GoldModel)
                .collect(),
            // A single object stands in for a one-element collection.
            Some(value @ Value::Object(_)) => vec![value as &dyn GoldModel],
            _ => Vec::new(),
        }
    }
}

/// Owning loader around a JSON gold model.
#[derive(Debug, Clone)]
pub struct ValueModel {
    value: Value,
}

impl ValueModel {
    pub fn new(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::NotAnObject(value_kind(&value).to_string()));
        }
        Ok(Self { value })
    }

    pub fn from_str(input: &str) -> Result<Self> {
        Self::new(serde_json::from_str(input)?)
    }

    pub fn as_gold(&self) -> &dyn GoldModel {
        &self.value
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_lookup_on_json_models() {
        let model = json!({
            "language_code": "en-US",
            "active": true,
            "dose": 2,
            "birth_date": "1974-12-25"
        });

        assert_eq!(model.field("language_code"), Some(FieldValue::text("en-US")));
        assert_eq!(model.field("active"), Some(FieldValue::Bool(true)));
        assert_eq!(model.field("dose"), Some(FieldValue::Int(2)));
        assert_eq!(
            model.field("birth_date").unwrap().canonical(),
            "19741225"
        );
        assert_eq!(model.field("missing"), None);
    }

    #[test]
    fn children_iterate_arrays_and_lift_single_objects() {
        let model = json!({
            "medications": [
                { "product_name": "Aspirin" },
                { "product_name": "Lisinopril" }
            ],
            "languages": { "language_code": "en-US" }
        });

        let meds = model.children("medications");
        assert_eq!(meds.len(), 2);
        assert_eq!(meds[1].field("product_name"), Some(FieldValue::text("Lisinopril")));

        let languages = model.children("languages");
        assert_eq!(languages.len(), 1);
    }

    #[test]
    fn value_model_rejects_non_objects() {
        assert!(ValueModel::from_str("[1, 2]").is_err());
        assert!(ValueModel::from_str(r#"{"first": "Adam"}"#).is_ok());
    }
}
