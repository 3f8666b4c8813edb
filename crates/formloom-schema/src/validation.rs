//! Record validation, before and after expansion.
//!
//! Pre-validation runs on raw rows so an authoring mistake is reported once
//! instead of once per repeat iteration. Post-validation re-reads the fully
//! expanded output and checks the cross-row invariants that only hold after
//! repetition has been materialized. Both passes report soft warnings; the
//! only hard failure is a reused form name when the caller forbids it.

use std::collections::HashMap;
use std::fmt;

use regex::Regex;
use thiserror::Error;

use crate::catalog::{
    Column, CHOICE_FIELD_TYPES, FIELD_TYPES, MAX_IDENTIFIER_LEN, MAX_RADIO_CHOICES,
    TEXT_VALIDATION_TYPES, YES_FLAG_VALUES,
};
use crate::model::RowValues;
use crate::tabular::TableData;

/// One soft validation complaint, attributed to a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub record: String,
    pub message: String,
}

impl Warning {
    pub fn new(record: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            record: record.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "record {} is possibly invalid: {}",
            self.record, self.message
        )
    }
}

/// Hard post-validation failure.
#[derive(Debug, Error)]
pub enum PostValidateError {
    #[error(
        "form '{form}' reappears at row {row} after another form intervened; \
         expanded forms must stay contiguous"
    )]
    FormNotContiguous { form: String, row: usize },
}

// ===== Pre-validation rules =====

/// Check one raw row for authoring problems. Returns every complaint rather
/// than stopping at the first.
pub fn pre_validate(values: &RowValues) -> Vec<Warning> {
    let mut warnings = Vec::new();
    check_id_length(&values.variable, &mut warnings);
    check_choice_fields(values, &mut warnings);
    check_dates_and_times(values, &mut warnings);
    check_choice_pairs(values, &mut warnings);
    warnings
}

fn check_id_length(variable: &str, warnings: &mut Vec<Warning>) {
    if variable.len() > MAX_IDENTIFIER_LEN {
        warnings.push(Warning::new(variable, "variable identifier is too long"));
    }
}

fn check_choice_fields(values: &RowValues, warnings: &mut Vec<Warning>) {
    let record = values.variable.as_str();

    if CHOICE_FIELD_TYPES.contains(&values.field_type.as_str()) {
        if values.choices_calculations.is_empty() {
            warnings.push(Warning::new(
                record,
                "radio / checkbox / dropdown has no choices",
            ));
        }
        if !values.text_validation_type.is_empty() {
            warnings.push(Warning::new(
                record,
                "radio / checkbox / dropdown has text validation",
            ));
        }
        if !values.text_validation_min.is_empty() {
            warnings.push(Warning::new(
                record,
                "radio / checkbox / dropdown has text min",
            ));
        }
        if !values.text_validation_max.is_empty() {
            warnings.push(Warning::new(
                record,
                "radio / checkbox / dropdown has text max",
            ));
        }
    } else if !matches!(values.text_validation_type.as_str(), "number" | "integer")
        && !values.choices_calculations.is_empty()
    {
        warnings.push(Warning::new(
            record,
            "non-choice, non-numeric field has choices or calculation",
        ));
    }
}

fn check_dates_and_times(values: &RowValues, warnings: &mut Vec<Warning>) {
    let record = values.variable.as_str();
    let label = values.field_label.to_lowercase();
    let variable = values.variable.to_lowercase();

    if (label.contains("date") || variable.contains("date"))
        && !values.text_validation_type.contains("date")
    {
        warnings.push(Warning::new(
            record,
            "looks like date but has no date validator",
        ));
    }

    if (label.contains("time") || variable.contains("time"))
        && !values.text_validation_type.contains("time")
    {
        warnings.push(Warning::new(
            record,
            "looks like time but has no time validator",
        ));
    }
}

fn check_choice_pairs(values: &RowValues, warnings: &mut Vec<Warning>) {
    let record = values.variable.as_str();
    let choices = values.choices_calculations.as_str();
    if choices.is_empty() || !choices.contains('|') || !choices.contains(',') {
        return;
    }

    let mut pairs = 0;
    for piece in choices.split('|').map(str::trim) {
        if piece.matches(',').count() != 1 {
            warnings.push(Warning::new(
                record,
                format!("malformed choice string '{piece}'"),
            ));
        } else {
            pairs += 1;
        }
    }

    if values.field_type == "radio" && pairs > MAX_RADIO_CHOICES {
        warnings.push(Warning::new(
            record,
            format!("radio with {pairs} choices is better suited to dropdown"),
        ));
    }
}

// ===== Post-validation =====

/// Options for the post-expansion pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostValidatorOptions {
    /// Treat a reused (non-contiguous) form name as a hard error instead of
    /// a warning.
    pub forbid_reused_form_names: bool,
}

/// The post-expansion validator.
///
/// Accumulator state lives on the instance and is cleared at the top of
/// every [`check`](PostValidator::check) call; an instance must not be
/// shared across concurrent validations of different documents.
pub struct PostValidator {
    options: PostValidatorOptions,
    seen_identifiers: HashMap<String, usize>,
    form_history: Vec<String>,
    defined_variables: HashMap<String, usize>,
    branching_ref: Regex,
}

impl PostValidator {
    pub fn new(options: PostValidatorOptions) -> Self {
        Self {
            options,
            seen_identifiers: HashMap::new(),
            form_history: Vec::new(),
            defined_variables: HashMap::new(),
            // [var] or a checkbox reference like [var(3)]
            branching_ref: Regex::new(r"\[([A-Za-z_][A-Za-z0-9_]*)(?:\(\d+\))?\]").unwrap(),
        }
    }

    /// Check the fully expanded output. Row numbers in complaints are
    /// 1-based data-row positions.
    pub fn check(&mut self, table: &TableData) -> Result<Vec<Warning>, PostValidateError> {
        self.seen_identifiers.clear();
        self.form_history.clear();
        self.defined_variables.clear();

        let mut warnings = Vec::new();

        for (index, record) in table.rows.iter().enumerate() {
            let row = index + 1;
            let cell = |column: Column| {
                record
                    .get(column.header())
                    .map(|v| v.trim())
                    .unwrap_or_default()
            };
            let variable = cell(Column::Variable);

            self.check_row_shape(row, record, &mut warnings);
            self.check_identifier(row, variable, &mut warnings);
            self.check_form_contiguity(row, cell(Column::FormName), &mut warnings)?;
            self.check_enumerations(variable, record, &mut warnings);
            self.check_branching_refs(variable, cell(Column::BranchingLogic), &mut warnings);

            if !variable.is_empty() {
                self.defined_variables.entry(variable.to_string()).or_insert(row);
            }
        }

        Ok(warnings)
    }

    fn check_row_shape(
        &self,
        row: usize,
        record: &HashMap<String, String>,
        warnings: &mut Vec<Warning>,
    ) {
        for mandatory in Column::MANDATORY {
            let empty = record
                .get(mandatory.header())
                .map(|v| v.trim().is_empty())
                .unwrap_or(true);
            if empty {
                warnings.push(Warning::new(
                    format!("row {row}"),
                    format!("mandatory column '{}' is empty", mandatory.header()),
                ));
            }
        }
    }

    fn check_identifier(&mut self, row: usize, variable: &str, warnings: &mut Vec<Warning>) {
        if variable.is_empty() {
            return;
        }

        if variable.len() > MAX_IDENTIFIER_LEN {
            warnings.push(Warning::new(variable, "variable identifier is too long"));
        }

        match self.seen_identifiers.get(variable) {
            Some(first) => warnings.push(Warning::new(
                variable,
                format!("duplicate identifier: rows {first} and {row} both define it"),
            )),
            None => {
                self.seen_identifiers.insert(variable.to_string(), row);
            }
        }
    }

    fn check_form_contiguity(
        &mut self,
        row: usize,
        form: &str,
        warnings: &mut Vec<Warning>,
    ) -> Result<(), PostValidateError> {
        if form.is_empty() {
            return Ok(());
        }

        if self.form_history.last().map(String::as_str) == Some(form) {
            return Ok(());
        }

        if self.form_history.iter().any(|seen| seen == form) {
            if self.options.forbid_reused_form_names {
                return Err(PostValidateError::FormNotContiguous {
                    form: form.to_string(),
                    row,
                });
            }
            warnings.push(Warning::new(
                format!("row {row}"),
                format!("form '{form}' reappears after another form intervened"),
            ));
        }
        self.form_history.push(form.to_string());
        Ok(())
    }

    fn check_enumerations(
        &self,
        variable: &str,
        record: &HashMap<String, String>,
        warnings: &mut Vec<Warning>,
    ) {
        let checks: [(Column, &[&str]); 4] = [
            (Column::FieldType, &FIELD_TYPES),
            (Column::TextValidationType, &TEXT_VALIDATION_TYPES),
            (Column::Identifier, &YES_FLAG_VALUES),
            (Column::RequiredField, &YES_FLAG_VALUES),
        ];

        for (column, allowed) in checks {
            let value = record
                .get(column.header())
                .map(|v| v.trim())
                .unwrap_or_default();
            if !allowed.contains(&value) {
                warnings.push(Warning::new(
                    variable,
                    format!("'{value}' is not a recognised {} value", column.header()),
                ));
            }
        }
    }

    fn check_branching_refs(&self, variable: &str, logic: &str, warnings: &mut Vec<Warning>) {
        if logic.is_empty() {
            return;
        }

        for captures in self.branching_ref.captures_iter(logic) {
            let referenced = &captures[1];
            if !self.defined_variables.contains_key(referenced) {
                warnings.push(Warning::new(
                    variable,
                    format!("branching logic references '{referenced}' before it is defined"),
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tabular::read_table_str;
    use test_case::test_case;

    fn row(field_type: &str, choices: &str, validation: &str) -> RowValues {
        RowValues {
            variable: "field".to_string(),
            form_name: "form".to_string(),
            field_type: field_type.to_string(),
            field_label: "Label".to_string(),
            choices_calculations: choices.to_string(),
            text_validation_type: validation.to_string(),
            ..RowValues::default()
        }
    }

    #[test]
    fn test_long_identifier_flagged() {
        let mut values = row("text", "", "");
        values.variable = "a".repeat(MAX_IDENTIFIER_LEN + 1);
        let warnings = pre_validate(&values);
        assert!(warnings.iter().any(|w| w.message.contains("too long")));

        values.variable = "a".repeat(MAX_IDENTIFIER_LEN);
        assert!(pre_validate(&values).is_empty());
    }

    #[test_case("radio"; "radio")]
    #[test_case("checkbox"; "checkbox")]
    #[test_case("dropdown"; "dropdown")]
    fn test_choice_field_without_choices_flagged(field_type: &str) {
        let warnings = pre_validate(&row(field_type, "", ""));
        assert!(warnings.iter().any(|w| w.message.contains("no choices")));
    }

    #[test]
    fn test_choice_field_with_text_validation_flagged() {
        let mut values = row("radio", "1, A | 2, B", "");
        values.text_validation_min = "0".to_string();
        let warnings = pre_validate(&values);
        assert!(warnings.iter().any(|w| w.message.contains("text min")));
    }

    #[test]
    fn test_plain_field_with_choices_flagged_unless_numeric() {
        let warnings = pre_validate(&row("text", "[weight]*2", ""));
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("choices or calculation")));

        // numeric validation legitimises a calculation cell
        assert!(pre_validate(&row("text", "[weight]*2", "number")).is_empty());
    }

    #[test]
    fn test_date_and_time_suspects() {
        let mut values = row("text", "", "");
        values.variable = "visit_date".to_string();
        let warnings = pre_validate(&values);
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("looks like date")));

        values.variable = "field".to_string();
        values.field_label = "Arrival Time".to_string();
        values.text_validation_type = "time".to_string();
        assert!(pre_validate(&values).is_empty());
    }

    #[test]
    fn test_malformed_choice_pairs_flagged() {
        let warnings = pre_validate(&row("radio", "1, A | 2 | 3, C, extra", ""));
        let malformed: Vec<_> = warnings
            .iter()
            .filter(|w| w.message.contains("malformed choice string"))
            .collect();
        assert_eq!(malformed.len(), 2);
    }

    #[test]
    fn test_radio_with_many_choices_suggests_dropdown() {
        let choices = (1..=9)
            .map(|i| format!("{i}, Option {i}"))
            .collect::<Vec<_>>()
            .join(" | ");
        let warnings = pre_validate(&row("radio", &choices, ""));
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("better suited to dropdown")));
    }

    fn expanded(rows: &str) -> TableData {
        let mut text = crate::tabular::encode_record(
            &Column::OUTPUT.iter().map(|c| c.header()).collect::<Vec<_>>(),
        )
        .unwrap();
        text.push_str(rows);
        read_table_str(&text).unwrap()
    }

    fn data_row(variable: &str, form: &str) -> String {
        let mut values = RowValues::default();
        values.variable = variable.to_string();
        values.form_name = form.to_string();
        values.field_type = "text".to_string();
        values.field_label = "Label".to_string();
        crate::tabular::encode_record(&values.ordered()).unwrap()
    }

    #[test]
    fn test_duplicate_identifier_names_both_rows() {
        let table = expanded(&format!(
            "{}{}{}",
            data_row("a", "f"),
            data_row("b", "f"),
            data_row("a", "f")
        ));
        let mut validator = PostValidator::new(PostValidatorOptions::default());
        let warnings = validator.check(&table).unwrap();
        assert!(warnings
            .iter()
            .any(|w| w.record == "a" && w.message.contains("rows 1 and 3")));
    }

    #[test]
    fn test_form_reuse_warns_by_default_and_fails_when_forbidden() {
        let table = expanded(&format!(
            "{}{}{}",
            data_row("a", "one"),
            data_row("b", "two"),
            data_row("c", "one")
        ));

        let mut validator = PostValidator::new(PostValidatorOptions::default());
        let warnings = validator.check(&table).unwrap();
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("reappears after another form")));

        let mut strict = PostValidator::new(PostValidatorOptions {
            forbid_reused_form_names: true,
        });
        let err = strict.check(&table).unwrap_err();
        assert!(matches!(
            err,
            PostValidateError::FormNotContiguous { ref form, row: 3 } if form == "one"
        ));
    }

    #[test]
    fn test_empty_mandatory_column_flagged() {
        let table = expanded(&data_row("", "f"));
        let mut validator = PostValidator::new(PostValidatorOptions::default());
        let warnings = validator.check(&table).unwrap();
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("'Variable / Field Name' is empty")));
    }

    #[test]
    fn test_unknown_enumeration_value_flagged() {
        let mut values = RowValues::default();
        values.variable = "a".to_string();
        values.form_name = "f".to_string();
        values.field_type = "telepathy".to_string();
        values.field_label = "Label".to_string();
        let line = crate::tabular::encode_record(&values.ordered()).unwrap();

        let table = expanded(&line);
        let mut validator = PostValidator::new(PostValidatorOptions::default());
        let warnings = validator.check(&table).unwrap();
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("'telepathy' is not a recognised")));
    }

    #[test]
    fn test_branching_reference_must_be_defined_earlier() {
        let mut first = RowValues::default();
        first.variable = "a".to_string();
        first.form_name = "f".to_string();
        first.field_type = "text".to_string();
        first.field_label = "Label".to_string();
        first.branching_logic = "[b] = '1'".to_string();

        let mut second = first.clone();
        second.variable = "b".to_string();
        second.branching_logic = "[a(2)] = '1'".to_string();

        let text = format!(
            "{}{}",
            crate::tabular::encode_record(&first.ordered()).unwrap(),
            crate::tabular::encode_record(&second.ordered()).unwrap()
        );
        let table = expanded(&text);

        let mut validator = PostValidator::new(PostValidatorOptions::default());
        let warnings = validator.check(&table).unwrap();
        // forward reference flagged, backward checkbox reference resolves
        assert!(warnings
            .iter()
            .any(|w| w.record == "a" && w.message.contains("references 'b'")));
        assert!(!warnings.iter().any(|w| w.record == "b"));
    }

    #[test]
    fn test_accumulators_reset_between_checks() {
        let table = expanded(&data_row("a", "f"));
        let mut validator = PostValidator::new(PostValidatorOptions::default());
        assert!(validator.check(&table).unwrap().is_empty());
        // a second run over the same document must not see stale identifiers
        assert!(validator.check(&table).unwrap().is_empty());
    }
}
