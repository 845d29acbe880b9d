use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::values::{ErrorMap, FieldValue, FormValues};
use super::visibility::{ConditionFallback, is_visible_with};
use crate::schema::{FieldType, FormField, RuleKind, ValidationRule};

/// Whether submit-time validation looks at fields that are currently hidden.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HiddenFieldPolicy {
    /// Every schema field is validated, visible or not.
    #[default]
    Validate,
    /// Hidden fields are skipped and cannot block submission.
    Skip,
}

/// Returns the message of the first rule `value` violates, in declared order.
pub fn validate_field(field: &FormField, value: Option<&FieldValue>) -> Option<String> {
    field
        .validation
        .iter()
        .find_map(|rule| check_rule(field, rule, value))
}

/// Validates every field of `fields` against `values`.
pub fn validate_all(
    fields: &[FormField],
    values: &FormValues,
    hidden_fields: HiddenFieldPolicy,
    fallback: ConditionFallback,
) -> ErrorMap {
    fields
        .iter()
        .filter(|field| {
            hidden_fields == HiddenFieldPolicy::Validate
                || is_visible_with(field, values, fallback)
        })
        .filter_map(|field| {
            validate_field(field, values.get(&field.id)).map(|message| (field.id.clone(), message))
        })
        .collect()
}

fn check_rule(
    field: &FormField,
    rule: &ValidationRule,
    value: Option<&FieldValue>,
) -> Option<String> {
    let Some(kind) = rule.kind.as_ref() else {
        trace!(field = %field.id, "validation rule without a kind ignored");
        return None;
    };

    let label = &field.label;
    let bound = || {
        rule.threshold
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    };
    let default_message = match kind {
        RuleKind::Required => {
            is_missing(field, value).then(|| format!("{label} is required"))
        }
        RuleKind::MinLength => text_length(value)
            .zip(threshold(rule))
            .is_some_and(|(length, limit)| length < limit)
            .then(|| format!("{label} must be at least {} characters", bound())),
        RuleKind::MaxLength => text_length(value)
            .zip(threshold(rule))
            .is_some_and(|(length, limit)| length > limit)
            .then(|| format!("{label} must be at most {} characters", bound())),
        RuleKind::Min => value
            .and_then(FieldValue::as_number)
            .zip(threshold(rule))
            .is_some_and(|(number, limit)| number < limit)
            .then(|| format!("{label} must be at least {}", bound())),
        RuleKind::Max => value
            .and_then(FieldValue::as_number)
            .zip(threshold(rule))
            .is_some_and(|(number, limit)| number > limit)
            .then(|| format!("{label} must be at most {}", bound())),
        RuleKind::Other(name) => {
            trace!(field = %field.id, rule = %name, "unrecognized validation rule ignored");
            return None;
        }
    }?;

    Some(
        rule.custom_message()
            .map(str::to_string)
            .unwrap_or(default_message),
    )
}

fn is_missing(field: &FormField, value: Option<&FieldValue>) -> bool {
    match value {
        None => true,
        Some(value) if value.is_empty() => true,
        Some(value) => field.field_type == FieldType::Checkbox && value != &FieldValue::Bool(true),
    }
}

fn text_length(value: Option<&FieldValue>) -> Option<Decimal> {
    value
        .and_then(FieldValue::as_text)
        .map(|text| Decimal::from(text.chars().count()))
}

fn threshold(rule: &ValidationRule) -> Option<Decimal> {
    rule.threshold.as_ref().and_then(FieldValue::to_decimal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ConditionalRule;

    fn text_field(rules: Vec<ValidationRule>) -> FormField {
        let mut field = FormField::new("name", "Name", FieldType::Text);
        field.validation = rules;
        field
    }

    #[test]
    fn field_without_rules_is_always_valid() {
        let field = text_field(Vec::new());
        assert_eq!(validate_field(&field, None), None);
        assert_eq!(validate_field(&field, Some(&FieldValue::Null)), None);
    }

    #[test]
    fn required_rejects_absent_null_and_blank() {
        let field = text_field(vec![ValidationRule::required()]);
        for value in [None, Some(FieldValue::Null), Some(FieldValue::empty())] {
            assert_eq!(
                validate_field(&field, value.as_ref()).as_deref(),
                Some("Name is required")
            );
        }
        assert_eq!(validate_field(&field, Some(&"x".into())), None);
        assert_eq!(validate_field(&field, Some(&FieldValue::from(0_i64))), None);
        assert_eq!(validate_field(&field, Some(&FieldValue::Bool(false))), None);
    }

    #[test]
    fn required_checkbox_must_be_checked() {
        let field = FormField::new("terms", "Terms", FieldType::Checkbox)
            .rule(ValidationRule::required().message("Accept the terms"));
        assert_eq!(
            validate_field(&field, Some(&FieldValue::Bool(false))).as_deref(),
            Some("Accept the terms")
        );
        assert_eq!(
            validate_field(&field, Some(&FieldValue::text("true"))).as_deref(),
            Some("Accept the terms")
        );
        assert_eq!(validate_field(&field, Some(&FieldValue::Bool(true))), None);
    }

    #[test]
    fn length_rules_compare_character_counts() {
        let field = text_field(vec![
            ValidationRule::min_length(2),
            ValidationRule::max_length(4),
        ]);
        let check = |text: &str| validate_field(&field, Some(&FieldValue::text(text)));

        assert_eq!(
            check("A").as_deref(),
            Some("Name must be at least 2 characters")
        );
        assert_eq!(check("Al"), None);
        assert_eq!(check("Anna"), None);
        assert_eq!(check("Ännä"), None);
        assert_eq!(
            check("Annie").as_deref(),
            Some("Name must be at most 4 characters")
        );
    }

    #[test]
    fn length_rules_ignore_non_text_values() {
        let field = text_field(vec![ValidationRule::min_length(3)]);
        assert_eq!(validate_field(&field, Some(&FieldValue::from(1_i64))), None);
        assert_eq!(validate_field(&field, Some(&FieldValue::Bool(true))), None);
        assert_eq!(validate_field(&field, None), None);
    }

    #[test]
    fn numeric_bounds_apply_to_numbers_only() {
        let field = FormField::new("age", "Age", FieldType::Number)
            .rule(ValidationRule::min(18))
            .rule(ValidationRule::max(65));
        let check = |value: FieldValue| validate_field(&field, Some(&value));

        assert_eq!(
            check(FieldValue::from(17_i64)).as_deref(),
            Some("Age must be at least 18")
        );
        assert_eq!(check(FieldValue::from(18_i64)), None);
        assert_eq!(check(FieldValue::from(65_i64)), None);
        assert_eq!(
            check(FieldValue::from(66_i64)).as_deref(),
            Some("Age must be at most 65")
        );
        assert_eq!(check(FieldValue::text("5")), None);
        assert_eq!(check(FieldValue::empty()), None);
    }

    #[test]
    fn textual_thresholds_are_read_numerically() {
        let field = FormField::new("qty", "Quantity", FieldType::Number)
            .rule(ValidationRule::new(RuleKind::Min).threshold("10"));
        assert!(validate_field(&field, Some(&FieldValue::from(9_i64))).is_some());

        let inert = FormField::new("qty", "Quantity", FieldType::Number)
            .rule(ValidationRule::new(RuleKind::Min).threshold("ten"))
            .rule(ValidationRule::new(RuleKind::Max));
        assert_eq!(validate_field(&inert, Some(&FieldValue::from(-1_i64))), None);
    }

    #[test]
    fn first_failing_rule_wins() {
        let field = text_field(vec![
            ValidationRule::required().message("first"),
            ValidationRule::min_length(3).message("second"),
        ]);
        assert_eq!(
            validate_field(&field, Some(&FieldValue::empty())).as_deref(),
            Some("first")
        );

        let reordered = text_field(vec![
            ValidationRule::min_length(3).message("length"),
            ValidationRule::max_length(1).message("too long"),
        ]);
        assert_eq!(
            validate_field(&reordered, Some(&FieldValue::text("ab"))).as_deref(),
            Some("length")
        );
    }

    #[test]
    fn unknown_and_kindless_rules_never_fail() {
        let field = text_field(vec![
            ValidationRule::new(RuleKind::Other("pattern".to_string()))
                .threshold("^x$")
                .message("Name must match ^x$"),
            ValidationRule::default(),
        ]);
        assert_eq!(validate_field(&field, None), None);
        assert_eq!(validate_field(&field, Some(&FieldValue::text("nope"))), None);
    }

    #[test]
    fn blank_custom_message_falls_back_to_generated_one() {
        let field = text_field(vec![ValidationRule::required().message("")]);
        assert_eq!(
            validate_field(&field, None).as_deref(),
            Some("Name is required")
        );
    }

    #[test]
    fn validate_all_honours_hidden_field_policy() {
        let fields = vec![
            FormField::new("country", "Country", FieldType::Select),
            FormField::new("state", "State", FieldType::Text)
                .rule(ValidationRule::required())
                .depends_on(ConditionalRule::equals("country", "US")),
        ];
        let values = FormValues::from([("country".to_string(), FieldValue::text("CA"))]);

        let strict = validate_all(
            &fields,
            &values,
            HiddenFieldPolicy::Validate,
            ConditionFallback::Visible,
        );
        assert_eq!(
            strict.get("state").map(String::as_str),
            Some("State is required")
        );

        let lenient = validate_all(
            &fields,
            &values,
            HiddenFieldPolicy::Skip,
            ConditionFallback::Visible,
        );
        assert!(lenient.is_empty());
    }
}
