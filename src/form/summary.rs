use std::fmt::{Display, Formatter};

use super::controller::{FormController, FormResult};
use super::values::{FieldValue, FormValues};
use crate::schema::FormSchema;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SummaryCell {
    Yes,
    No,
    /// Null or empty value, shown as a muted "N/A".
    NotApplicable,
    Value(String),
}

impl SummaryCell {
    pub fn from_value(value: &FieldValue) -> Self {
        match value {
            FieldValue::Bool(true) => Self::Yes,
            FieldValue::Bool(false) => Self::No,
            value if value.is_empty() => Self::NotApplicable,
            value => Self::Value(value.to_string()),
        }
    }
}

impl Display for SummaryCell {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yes => f.write_str("Yes"),
            Self::No => f.write_str("No"),
            Self::NotApplicable => f.write_str("N/A"),
            Self::Value(value) => f.write_str(value),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SummaryRow {
    pub field_id: String,
    pub heading: String,
    pub cell: SummaryCell,
}

/// Read-only table of a submitted snapshot.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SubmissionSummary {
    pub rows: Vec<SummaryRow>,
}

impl SubmissionSummary {
    /// Rows follow schema order; values without a schema field come last.
    pub fn new(schema: &FormSchema, values: &FormValues) -> Self {
        let known = schema
            .fields
            .iter()
            .filter_map(|field| {
                values.get(&field.id).map(|value| SummaryRow {
                    field_id: field.id.clone(),
                    heading: field.label.clone(),
                    cell: SummaryCell::from_value(value),
                })
            });
        let extra = values
            .iter()
            .filter(|(id, _)| schema.field(id).is_none())
            .map(|(id, value)| SummaryRow {
                field_id: id.clone(),
                heading: humanize_key(id),
                cell: SummaryCell::from_value(value),
            });
        Self {
            rows: known.chain(extra).collect(),
        }
    }

    pub fn row(&self, field_id: &str) -> Option<&SummaryRow> {
        self.rows.iter().find(|row| row.field_id == field_id)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FormController {
    /// Summary of the last successful submission, if any.
    pub fn submission_summary(&self) -> FormResult<Option<SubmissionSummary>> {
        Ok(self
            .submitted()?
            .map(|values| SubmissionSummary::new(&self.schema, &values)))
    }
}

/// "firstName" -> "First Name".
pub fn humanize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut word_start = true;
    for ch in key.chars() {
        if ch.is_uppercase() && !out.is_empty() {
            out.push(' ');
            word_start = true;
        }
        if ch == ' ' || ch == '_' {
            out.push(' ');
            word_start = true;
            continue;
        }
        if word_start {
            out.extend(ch.to_uppercase());
            word_start = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldType, FormField};

    #[test]
    fn cells_render_booleans_and_blanks() {
        assert_eq!(SummaryCell::from_value(&FieldValue::Bool(true)).to_string(), "Yes");
        assert_eq!(SummaryCell::from_value(&FieldValue::Bool(false)).to_string(), "No");
        assert_eq!(
            SummaryCell::from_value(&FieldValue::empty()),
            SummaryCell::NotApplicable
        );
        assert_eq!(
            SummaryCell::from_value(&FieldValue::Null).to_string(),
            "N/A"
        );
        assert_eq!(
            SummaryCell::from_value(&FieldValue::from(42_i64)).to_string(),
            "42"
        );
        assert_eq!(
            SummaryCell::from_value(&FieldValue::text("2031-04-01")).to_string(),
            "2031-04-01"
        );
    }

    #[test]
    fn rows_follow_schema_order_then_extra_keys() {
        let schema = FormSchema::new(vec![
            FormField::new("zip", "Zip", FieldType::Text),
            FormField::new("name", "Full name", FieldType::Text),
        ]);
        let values = FormValues::from([
            ("name".to_string(), FieldValue::text("Ann")),
            ("zip".to_string(), FieldValue::empty()),
            ("referralCode".to_string(), FieldValue::text("X1")),
        ]);

        let summary = SubmissionSummary::new(&schema, &values);
        let headings = summary
            .rows
            .iter()
            .map(|row| row.heading.as_str())
            .collect::<Vec<_>>();
        assert_eq!(headings, vec!["Zip", "Full name", "Referral Code"]);
        assert_eq!(
            summary.row("zip").map(|row| &row.cell),
            Some(&SummaryCell::NotApplicable)
        );
    }

    #[test]
    fn humanize_splits_camel_case() {
        assert_eq!(humanize_key("firstName"), "First Name");
        assert_eq!(humanize_key("subscribe"), "Subscribe");
        assert_eq!(humanize_key("home_phone"), "Home Phone");
    }
}
