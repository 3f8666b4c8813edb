//! The compact-schema parser.
//!
//! Consumes ordered row records and groups them into the four-level schema
//! tree. A run of consecutive records sharing a form name is one form; a
//! record with a non-empty section header starts a section that absorbs the
//! headerless records after it; inside a section, a run of records sharing a
//! non-empty subsection label is one subsection. Repeat and tag metadata on
//! a run's first record is claimed by the node for the matching scope.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::Column;
use crate::model::{
    Form, FormEntry, Row, RowValues, Scope, ScopeMap, Section, SectionEntry, Subsection,
};
use crate::qualifier::{self, MetadataSyntaxError};
use crate::tabular::TableData;
use crate::validation::{self, Warning};

/// Structural parse failure. All variants abort the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("mandatory column '{column}' is missing from the input")]
    MissingColumn { column: &'static str },

    #[error("unknown column '{column}' in the input")]
    UnknownColumn { column: String },

    #[error("record {record}: {source}")]
    Metadata {
        record: String,
        #[source]
        source: MetadataSyntaxError,
    },
}

/// A parsed schema: the form tree plus the soft pre-validation complaints
/// gathered along the way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedSchema {
    pub forms: Vec<Form>,
    #[serde(skip)]
    pub warnings: Vec<Warning>,
}

/// A pre-processed record, not yet absorbed into the tree.
struct PendingRow {
    values: RowValues,
    tags: ScopeMap<String>,
    repeat: ScopeMap<i64>,
    subsection: String,
}

/// The compact schema parser.
pub struct CompactSchemaParser {
    allow_extra_columns: bool,
}

impl CompactSchemaParser {
    pub fn new(allow_extra_columns: bool) -> Self {
        Self {
            allow_extra_columns,
        }
    }

    /// Parse a table of compact-schema records into a list of forms.
    pub fn parse(&self, table: &TableData) -> Result<ParsedSchema, ParseError> {
        self.check_columns(&table.columns)?;

        debug!(records = table.rows.len(), "parsing compact schema");

        let mut warnings = Vec::new();
        let mut pending = Vec::with_capacity(table.rows.len());
        for record in &table.rows {
            pending.push(self.pre_process(record)?);
        }

        let mut forms = Vec::new();
        let mut i = 0;
        while i < pending.len() {
            let form_name = pending[i].values.form_name.clone();
            let mut j = i + 1;
            while j < pending.len() && pending[j].values.form_name == form_name {
                j += 1;
            }
            forms.push(self.parse_form(&mut pending[i..j], &mut warnings));
            i = j;
        }

        Ok(ParsedSchema { forms, warnings })
    }

    /// Reject missing mandatory columns and, unless extras are allowed,
    /// any column outside the catalog.
    fn check_columns(&self, columns: &[String]) -> Result<(), ParseError> {
        for mandatory in Column::MANDATORY {
            if !columns.iter().any(|c| c == mandatory.header()) {
                return Err(ParseError::MissingColumn {
                    column: mandatory.header(),
                });
            }
        }

        if !self.allow_extra_columns {
            for column in columns {
                if Column::from_header(column).is_none() {
                    return Err(ParseError::UnknownColumn {
                        column: column.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Trim cells, default absent columns, decode the metadata strings.
    fn pre_process(&self, record: &HashMap<String, String>) -> Result<PendingRow, ParseError> {
        let values = RowValues::from_record(record);

        let meta = |column: Column| {
            record
                .get(column.header())
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };

        let tags = qualifier::parse_tags(&meta(Column::Tags)).map_err(|source| {
            ParseError::Metadata {
                record: values_identifier(&values),
                source,
            }
        })?;
        let repeat = qualifier::parse_repeat(&meta(Column::Repeat)).map_err(|source| {
            ParseError::Metadata {
                record: values_identifier(&values),
                source,
            }
        })?;

        Ok(PendingRow {
            values,
            tags,
            repeat,
            subsection: meta(Column::Subsection),
        })
    }

    fn parse_form(&self, records: &mut [PendingRow], warnings: &mut Vec<Warning>) -> Form {
        let mut form = Form {
            name: records[0].values.form_name.clone(),
            repeat: records[0].repeat.take(Scope::Form),
            tags: records[0].tags.take(Scope::Form),
            contents: Vec::new(),
        };

        // ungrouped leading rows
        let mut i = 0;
        while i < records.len() && records[i].values.section_header.is_empty() {
            if !records[i].subsection.is_empty() {
                warnings.push(Warning::new(
                    values_identifier(&records[i].values),
                    "subsection label outside any section is ignored",
                ));
            }
            form.contents
                .push(FormEntry::Row(self.finalize_row(&mut records[i], warnings)));
            i += 1;
        }

        // the sectioned remainder of the form
        while i < records.len() {
            let start = i;
            i += 1;
            while i < records.len() && records[i].values.section_header.is_empty() {
                i += 1;
            }
            form.contents.push(FormEntry::Section(
                self.parse_section(&mut records[start..i], warnings),
            ));
        }

        form
    }

    fn parse_section(&self, records: &mut [PendingRow], warnings: &mut Vec<Warning>) -> Section {
        let mut section = Section {
            name: records[0].values.section_header.clone(),
            repeat: records[0].repeat.take(Scope::Section),
            tags: records[0].tags.take(Scope::Section),
            contents: Vec::new(),
        };

        let mut i = 0;
        while i < records.len() {
            if records[i].subsection.is_empty() {
                section
                    .contents
                    .push(SectionEntry::Row(self.finalize_row(&mut records[i], warnings)));
                i += 1;
                continue;
            }

            let label = records[i].subsection.clone();
            let start = i;
            while i < records.len() && records[i].subsection == label {
                i += 1;
            }
            section.contents.push(SectionEntry::Subsection(
                self.parse_subsection(label, &mut records[start..i], warnings),
            ));
        }

        section
    }

    fn parse_subsection(
        &self,
        name: String,
        records: &mut [PendingRow],
        warnings: &mut Vec<Warning>,
    ) -> Subsection {
        let mut subsection = Subsection {
            name,
            repeat: records[0].repeat.take(Scope::Subsection),
            tags: records[0].tags.take(Scope::Subsection),
            rows: Vec::new(),
        };

        for record in records {
            subsection.rows.push(self.finalize_row(record, warnings));
        }

        subsection
    }

    /// Keep only the row-scope metadata and run the record validator.
    fn finalize_row(&self, record: &mut PendingRow, warnings: &mut Vec<Warning>) -> Row {
        warnings.extend(validation::pre_validate(&record.values));
        Row {
            repeat: record.repeat.take(Scope::Row),
            tags: record.tags.take(Scope::Row),
            values: std::mem::take(&mut record.values),
        }
    }
}

fn values_identifier(values: &RowValues) -> String {
    if values.variable.is_empty() {
        "<unnamed>".to_string()
    } else {
        values.variable.clone()
    }
}
