//! Typed shape of a form schema as served by the schema endpoint.
//!
//! Wire names follow the endpoint's JSON (`type`, `value`, `fieldId`); the
//! Rust names describe what the values mean.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::form::FieldValue;

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Text,
    Number,
    Select,
    Checkbox,
    Date,
    /// A type this crate has no control for. Rendered as nothing.
    Unsupported(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Select => "select",
            Self::Checkbox => "checkbox",
            Self::Date => "date",
            Self::Unsupported(name) => name,
        }
    }
}

impl From<String> for FieldType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "text" => Self::Text,
            "number" => Self::Number,
            "select" => Self::Select,
            "checkbox" => Self::Checkbox,
            "date" => Self::Date,
            _ => Self::Unsupported(value),
        }
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.as_str().to_string()
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RuleKind {
    Required,
    MinLength,
    MaxLength,
    Min,
    Max,
    Other(String),
}

impl From<String> for RuleKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "required" => Self::Required,
            "minLength" => Self::MinLength,
            "maxLength" => Self::MaxLength,
            "min" => Self::Min,
            "max" => Self::Max,
            _ => Self::Other(value),
        }
    }
}

impl From<RuleKind> for String {
    fn from(value: RuleKind) -> Self {
        match value {
            RuleKind::Required => "required".to_string(),
            RuleKind::MinLength => "minLength".to_string(),
            RuleKind::MaxLength => "maxLength".to_string(),
            RuleKind::Min => "min".to_string(),
            RuleKind::Max => "max".to_string(),
            RuleKind::Other(name) => name,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<RuleKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "value", default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<FieldValue>,
}

impl ValidationRule {
    pub fn new(kind: RuleKind) -> Self {
        Self {
            kind: Some(kind),
            message: None,
            threshold: None,
        }
    }

    pub fn required() -> Self {
        Self::new(RuleKind::Required)
    }

    pub fn min_length(length: i64) -> Self {
        Self::new(RuleKind::MinLength).threshold(length)
    }

    pub fn max_length(length: i64) -> Self {
        Self::new(RuleKind::MaxLength).threshold(length)
    }

    pub fn min(bound: i64) -> Self {
        Self::new(RuleKind::Min).threshold(bound)
    }

    pub fn max(bound: i64) -> Self {
        Self::new(RuleKind::Max).threshold(bound)
    }

    pub fn threshold(mut self, value: impl Into<FieldValue>) -> Self {
        self.threshold = Some(value.into());
        self
    }

    pub fn message(mut self, value: impl Into<String>) -> Self {
        self.message = Some(value.into());
        self
    }

    /// The custom message, ignoring blank ones.
    pub fn custom_message(&self) -> Option<&str> {
        self.message.as_deref().filter(|message| !message.is_empty())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Condition {
    Equals,
    Other(String),
}

impl From<String> for Condition {
    fn from(value: String) -> Self {
        if value == "equals" {
            Self::Equals
        } else {
            Self::Other(value)
        }
    }
}

impl From<Condition> for String {
    fn from(value: Condition) -> Self {
        match value {
            Condition::Equals => "equals".to_string(),
            Condition::Other(name) => name,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConditionalRule {
    pub condition: Condition,
    #[serde(rename = "fieldId", alias = "targetFieldId")]
    pub target_field_id: String,
    #[serde(rename = "value", alias = "expectedValue")]
    pub expected_value: FieldValue,
}

impl ConditionalRule {
    pub fn equals(target_field_id: impl Into<String>, expected: impl Into<FieldValue>) -> Self {
        Self {
            condition: Condition::Equals,
            target_field_id: target_field_id.into(),
            expected_value: expected.into(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub label: String,
    pub value: FieldValue,
}

impl FieldOption {
    pub fn new(label: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// The value a select control submits for this option.
    pub fn value_string(&self) -> String {
        self.value.to_string()
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Presentation hint for controls. Enforcement comes from `validation`.
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation: Vec<ValidationRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<ConditionalRule>,
}

impl FormField {
    pub fn new(id: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            field_type,
            placeholder: None,
            required: false,
            options: Vec::new(),
            validation: Vec::new(),
            depends_on: None,
        }
    }

    pub fn rule(mut self, rule: ValidationRule) -> Self {
        self.validation.push(rule);
        self
    }

    pub fn option(mut self, option: FieldOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn depends_on(mut self, rule: ConditionalRule) -> Self {
        self.depends_on = Some(rule);
        self
    }

    pub fn placeholder_or_label(&self) -> &str {
        self.placeholder.as_deref().unwrap_or(&self.label)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitButton {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loading_text: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub fields: Vec<FormField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit_button: Option<SubmitButton>,
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("malformed schema: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("field at position {index} has an empty id")]
    EmptyFieldId { index: usize },
    #[error("field id `{id}` is declared more than once")]
    DuplicateFieldId { id: String },
}

impl FormSchema {
    pub fn new(fields: Vec<FormField>) -> Self {
        Self {
            title: None,
            fields,
            submit_button: None,
        }
    }

    pub fn title(mut self, value: impl Into<String>) -> Self {
        self.title = Some(value.into());
        self
    }

    pub fn submit_button(mut self, value: SubmitButton) -> Self {
        self.submit_button = Some(value);
        self
    }

    /// Decodes and checks a schema document.
    pub fn from_json(source: &str) -> Result<Self, SchemaError> {
        let schema: Self = serde_json::from_str(source)?;
        schema.check_field_ids()?;
        Ok(schema)
    }

    /// Rejects empty and duplicated field ids; ids are storage keys.
    pub fn check_field_ids(&self) -> Result<(), SchemaError> {
        let mut seen = BTreeSet::new();
        for (index, field) in self.fields.iter().enumerate() {
            if field.id.is_empty() {
                return Err(SchemaError::EmptyFieldId { index });
            }
            if !seen.insert(field.id.as_str()) {
                return Err(SchemaError::DuplicateFieldId {
                    id: field.id.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn field(&self, id: &str) -> Option<&FormField> {
        self.fields.iter().find(|field| field.id == id)
    }
}
