//! The schema data model.
//!
//! A compact schema parses into a tree exactly four levels deep: forms hold
//! sections (after any ungrouped leading rows), sections hold subsections and
//! rows, subsections hold rows. The whole tree serializes to JSON and loads
//! back without loss, so a dumped tree can be re-expanded later.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::Column;

/// The nesting level a metadata statement applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Form,
    Section,
    Subsection,
    Row,
}

impl Scope {
    /// The qualifier keyword for this scope.
    pub fn keyword(&self) -> &'static str {
        match self {
            Scope::Form => "form",
            Scope::Section => "section",
            Scope::Subsection => "subsection",
            Scope::Row => "row",
        }
    }

    /// Parse a qualifier keyword.
    pub fn from_keyword(keyword: &str) -> Option<Scope> {
        match keyword {
            "form" => Some(Scope::Form),
            "section" => Some(Scope::Section),
            "subsection" => Some(Scope::Subsection),
            "row" => Some(Scope::Row),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// One decoded value list per scope. The ephemeral result of parsing a single
/// metadata string; consumed while the tree is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeMap<T> {
    pub form: Vec<T>,
    pub section: Vec<T>,
    pub subsection: Vec<T>,
    pub row: Vec<T>,
}

impl<T> Default for ScopeMap<T> {
    fn default() -> Self {
        Self {
            form: Vec::new(),
            section: Vec::new(),
            subsection: Vec::new(),
            row: Vec::new(),
        }
    }
}

impl<T> ScopeMap<T> {
    /// The values recorded for a scope.
    pub fn get(&self, scope: Scope) -> &[T] {
        match scope {
            Scope::Form => &self.form,
            Scope::Section => &self.section,
            Scope::Subsection => &self.subsection,
            Scope::Row => &self.row,
        }
    }

    /// Mutable access to one scope's slot.
    pub fn slot_mut(&mut self, scope: Scope) -> &mut Vec<T> {
        match scope {
            Scope::Form => &mut self.form,
            Scope::Section => &mut self.section,
            Scope::Subsection => &mut self.subsection,
            Scope::Row => &mut self.row,
        }
    }

    /// Move one scope's values out, leaving that slot empty.
    pub fn take(&mut self, scope: Scope) -> Vec<T> {
        std::mem::take(self.slot_mut(scope))
    }

    /// True when no scope holds any value.
    pub fn is_empty(&self) -> bool {
        self.form.is_empty()
            && self.section.is_empty()
            && self.subsection.is_empty()
            && self.row.is_empty()
    }
}

/// The output-column values of one row, with a named field per column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowValues {
    pub variable: String,
    pub form_name: String,
    pub section_header: String,
    pub field_type: String,
    pub field_label: String,
    pub choices_calculations: String,
    pub field_note: String,
    pub text_validation_type: String,
    pub text_validation_min: String,
    pub text_validation_max: String,
    pub identifier: String,
    pub branching_logic: String,
    pub required_field: String,
    pub custom_alignment: String,
    pub question_number: String,
    pub matrix_group_name: String,
    pub matrix_ranking: String,
    pub field_annotation: String,
}

impl RowValues {
    /// The value of one output column.
    ///
    /// Panics if asked for a meta column; callers hold an output column by
    /// construction.
    pub fn value(&self, column: Column) -> &str {
        match column {
            Column::Variable => &self.variable,
            Column::FormName => &self.form_name,
            Column::SectionHeader => &self.section_header,
            Column::FieldType => &self.field_type,
            Column::FieldLabel => &self.field_label,
            Column::ChoicesCalculations => &self.choices_calculations,
            Column::FieldNote => &self.field_note,
            Column::TextValidationType => &self.text_validation_type,
            Column::TextValidationMin => &self.text_validation_min,
            Column::TextValidationMax => &self.text_validation_max,
            Column::Identifier => &self.identifier,
            Column::BranchingLogic => &self.branching_logic,
            Column::RequiredField => &self.required_field,
            Column::CustomAlignment => &self.custom_alignment,
            Column::QuestionNumber => &self.question_number,
            Column::MatrixGroupName => &self.matrix_group_name,
            Column::MatrixRanking => &self.matrix_ranking,
            Column::FieldAnnotation => &self.field_annotation,
            meta => panic!("meta column {meta:?} has no output value"),
        }
    }

    /// Set the value of one output column.
    pub fn set(&mut self, column: Column, value: String) {
        match column {
            Column::Variable => self.variable = value,
            Column::FormName => self.form_name = value,
            Column::SectionHeader => self.section_header = value,
            Column::FieldType => self.field_type = value,
            Column::FieldLabel => self.field_label = value,
            Column::ChoicesCalculations => self.choices_calculations = value,
            Column::FieldNote => self.field_note = value,
            Column::TextValidationType => self.text_validation_type = value,
            Column::TextValidationMin => self.text_validation_min = value,
            Column::TextValidationMax => self.text_validation_max = value,
            Column::Identifier => self.identifier = value,
            Column::BranchingLogic => self.branching_logic = value,
            Column::RequiredField => self.required_field = value,
            Column::CustomAlignment => self.custom_alignment = value,
            Column::QuestionNumber => self.question_number = value,
            Column::MatrixGroupName => self.matrix_group_name = value,
            Column::MatrixRanking => self.matrix_ranking = value,
            Column::FieldAnnotation => self.field_annotation = value,
            meta => panic!("meta column {meta:?} has no output value"),
        }
    }

    /// Build from a header-keyed record, trimming every cell and defaulting
    /// absent columns to the empty string.
    pub fn from_record(record: &HashMap<String, String>) -> RowValues {
        let mut values = RowValues::default();
        for column in Column::OUTPUT {
            let cell = record
                .get(column.header())
                .map(|v| v.trim().to_string())
                .unwrap_or_default();
            values.set(column, cell);
        }
        values
    }

    /// The output-column values in their fixed emission order.
    pub fn ordered(&self) -> Vec<&str> {
        Column::OUTPUT.iter().map(|c| self.value(*c)).collect()
    }
}

/// One terminal row of the schema tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub repeat: Vec<i64>,
    pub tags: Vec<String>,
    pub values: RowValues,
}

/// A subsection: a run of rows demarcated inside a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subsection {
    pub name: String,
    pub repeat: Vec<i64>,
    pub tags: Vec<String>,
    pub rows: Vec<Row>,
}

/// A child of a section: a bare row or a subsection group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SectionEntry {
    Row(Row),
    Subsection(Subsection),
}

/// A section of a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub repeat: Vec<i64>,
    pub tags: Vec<String>,
    pub contents: Vec<SectionEntry>,
}

/// A child of a form. The parser emits all `Row` entries before any
/// `Section` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FormEntry {
    Row(Row),
    Section(Section),
}

/// One form of the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    pub name: String,
    pub repeat: Vec<i64>,
    pub tags: Vec<String>,
    pub contents: Vec<FormEntry>,
}
