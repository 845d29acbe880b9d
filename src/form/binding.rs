use chrono::{Local, NaiveDate};
use rust_decimal::Decimal;
use tracing::trace;

use super::controller::{FieldChanged, FormController, FormResult};
use super::values::{ErrorMap, FieldValue, FormValues, parse_decimal};
use super::visibility::is_visible_with;
use crate::schema::{FieldType, FormField};

/// What a primitive control reports on user interaction, before coercion.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RawInput {
    Text(String),
    Checked(bool),
}

impl From<&str> for RawInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for RawInput {
    fn from(value: bool) -> Self {
        Self::Checked(value)
    }
}

/// Converts raw control input into the value stored for `field_type`.
///
/// Number input that does not parse collapses to an empty string.
pub fn coerce_input(field_type: &FieldType, raw: RawInput) -> FieldValue {
    match (field_type, raw) {
        (FieldType::Number, RawInput::Text(text)) => parse_decimal(&text)
            .map(FieldValue::Number)
            .unwrap_or_else(FieldValue::empty),
        (FieldType::Number, RawInput::Checked(_)) => FieldValue::empty(),
        (FieldType::Checkbox, RawInput::Checked(checked)) => FieldValue::Bool(checked),
        (FieldType::Checkbox, RawInput::Text(text)) => {
            FieldValue::Bool(matches!(text.as_str(), "true" | "on"))
        }
        (_, RawInput::Text(text)) => FieldValue::Text(text),
        (_, RawInput::Checked(checked)) => FieldValue::Text(checked.to_string()),
    }
}

/// Turns a control's raw input into [`FieldChanged`] events for one field.
#[derive(Clone)]
pub struct ChangeEmitter {
    controller: FormController,
    field_id: String,
    field_type: FieldType,
}

impl ChangeEmitter {
    pub fn field_id(&self) -> &str {
        &self.field_id
    }

    pub fn event(&self, raw: impl Into<RawInput>) -> FieldChanged {
        FieldChanged {
            field_id: self.field_id.clone(),
            value: coerce_input(&self.field_type, raw.into()),
        }
    }

    pub fn emit(&self, raw: impl Into<RawInput>) -> FormResult<()> {
        self.controller.apply(self.event(raw))
    }
}

/// Properties shared by every control.
#[derive(Clone)]
pub struct ControlBase {
    pub id: String,
    pub label: String,
    pub error: Option<String>,
    pub required: bool,
    pub on_change: ChangeEmitter,
}

#[derive(Clone)]
pub struct TextProps {
    pub base: ControlBase,
    pub value: String,
    pub placeholder: String,
}

#[derive(Clone)]
pub struct NumberProps {
    pub base: ControlBase,
    pub value: Option<Decimal>,
    pub placeholder: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SelectChoice {
    pub label: String,
    pub value: String,
}

#[derive(Clone)]
pub struct SelectProps {
    pub base: ControlBase,
    pub value: String,
    /// Label of the empty leading choice.
    pub prompt: String,
    pub options: Vec<SelectChoice>,
}

#[derive(Clone)]
pub struct CheckboxProps {
    pub base: ControlBase,
    pub checked: bool,
}

#[derive(Clone)]
pub struct DateProps {
    pub base: ControlBase,
    pub value: String,
    pub placeholder: String,
    /// Earliest selectable date.
    pub min_date: NaiveDate,
}

/// The primitive controls a form is drawn with.
pub trait FieldControls {
    type Output;

    fn text(&self, props: TextProps) -> Self::Output;
    fn number(&self, props: NumberProps) -> Self::Output;
    fn select(&self, props: SelectProps) -> Self::Output;
    fn checkbox(&self, props: CheckboxProps) -> Self::Output;
    fn date(&self, props: DateProps) -> Self::Output;
}

impl FormController {
    /// Renders `field` unless it is hidden or of an unsupported type.
    pub fn render_field<C>(
        &self,
        controls: &C,
        field: &FormField,
    ) -> FormResult<Option<C::Output>>
    where
        C: FieldControls,
    {
        let values = self.store.values()?;
        let errors = self.errors()?;
        Ok(self.render_with(controls, field, &values, &errors))
    }

    /// Renders every visible field in schema order.
    pub fn render_fields<C>(&self, controls: &C) -> FormResult<Vec<C::Output>>
    where
        C: FieldControls,
    {
        let values = self.store.values()?;
        let errors = self.errors()?;
        Ok(self
            .schema
            .fields
            .iter()
            .filter_map(|field| self.render_with(controls, field, &values, &errors))
            .collect())
    }

    /// Raw input for a field by id, as a control would report it.
    pub fn change_field(&self, field_id: &str, raw: impl Into<RawInput>) -> FormResult<()> {
        let field = self.field(field_id)?;
        self.emitter(field).emit(raw)
    }

    fn emitter(&self, field: &FormField) -> ChangeEmitter {
        ChangeEmitter {
            controller: self.clone(),
            field_id: field.id.clone(),
            field_type: field.field_type.clone(),
        }
    }

    fn render_with<C>(
        &self,
        controls: &C,
        field: &FormField,
        values: &FormValues,
        errors: &ErrorMap,
    ) -> Option<C::Output>
    where
        C: FieldControls,
    {
        if !is_visible_with(field, values, self.options.unknown_condition) {
            return None;
        }

        let value = values.get(&field.id);
        let base = ControlBase {
            id: field.id.clone(),
            label: field.label.clone(),
            error: errors.get(&field.id).cloned(),
            required: field.required,
            on_change: self.emitter(field),
        };
        let text_value = || {
            value
                .and_then(FieldValue::as_text)
                .unwrap_or_default()
                .to_string()
        };

        let output = match &field.field_type {
            FieldType::Text => controls.text(TextProps {
                value: text_value(),
                placeholder: field.placeholder_or_label().to_string(),
                base,
            }),
            FieldType::Number => controls.number(NumberProps {
                value: value.and_then(FieldValue::as_number),
                placeholder: field.placeholder_or_label().to_string(),
                base,
            }),
            FieldType::Select => controls.select(SelectProps {
                value: text_value(),
                prompt: format!("Select {}", field.label),
                options: field
                    .options
                    .iter()
                    .map(|option| SelectChoice {
                        label: option.label.clone(),
                        value: option.value_string(),
                    })
                    .collect(),
                base,
            }),
            FieldType::Checkbox => controls.checkbox(CheckboxProps {
                checked: value.and_then(FieldValue::as_bool).unwrap_or(false),
                base,
            }),
            FieldType::Date => controls.date(DateProps {
                value: text_value(),
                placeholder: field.placeholder_or_label().to_string(),
                min_date: Local::now().date_naive(),
                base,
            }),
            FieldType::Unsupported(name) => {
                trace!(field = %field.id, field_type = %name, "no control for field type");
                return None;
            }
        };
        Some(output)
    }
}
