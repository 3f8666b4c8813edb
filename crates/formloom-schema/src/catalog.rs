//! The field catalog: every column a compact schema may carry.
//!
//! Columns are partitioned into *meta* columns (control fields consumed
//! during parsing) and *output* columns (emitted to the expanded schema).

use serde::{Deserialize, Serialize};

/// A known compact-schema column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    // Meta columns (never emitted)
    Tags,
    Repeat,
    Subsection,

    // Output columns, in their fixed emission order
    Variable,
    FormName,
    SectionHeader,
    FieldType,
    FieldLabel,
    ChoicesCalculations,
    FieldNote,
    TextValidationType,
    TextValidationMin,
    TextValidationMax,
    Identifier,
    BranchingLogic,
    RequiredField,
    CustomAlignment,
    QuestionNumber,
    MatrixGroupName,
    MatrixRanking,
    FieldAnnotation,
}

impl Column {
    /// All known columns, meta columns first.
    pub const ALL: [Column; 21] = [
        Column::Tags,
        Column::Repeat,
        Column::Subsection,
        Column::Variable,
        Column::FormName,
        Column::SectionHeader,
        Column::FieldType,
        Column::FieldLabel,
        Column::ChoicesCalculations,
        Column::FieldNote,
        Column::TextValidationType,
        Column::TextValidationMin,
        Column::TextValidationMax,
        Column::Identifier,
        Column::BranchingLogic,
        Column::RequiredField,
        Column::CustomAlignment,
        Column::QuestionNumber,
        Column::MatrixGroupName,
        Column::MatrixRanking,
        Column::FieldAnnotation,
    ];

    /// Control columns consumed during parsing.
    pub const META: [Column; 3] = [Column::Tags, Column::Repeat, Column::Subsection];

    /// Columns emitted to the expanded schema, in declared order.
    pub const OUTPUT: [Column; 18] = [
        Column::Variable,
        Column::FormName,
        Column::SectionHeader,
        Column::FieldType,
        Column::FieldLabel,
        Column::ChoicesCalculations,
        Column::FieldNote,
        Column::TextValidationType,
        Column::TextValidationMin,
        Column::TextValidationMax,
        Column::Identifier,
        Column::BranchingLogic,
        Column::RequiredField,
        Column::CustomAlignment,
        Column::QuestionNumber,
        Column::MatrixGroupName,
        Column::MatrixRanking,
        Column::FieldAnnotation,
    ];

    /// Columns that must be present and non-empty.
    pub const MANDATORY: [Column; 4] = [
        Column::Variable,
        Column::FormName,
        Column::FieldType,
        Column::FieldLabel,
    ];

    /// The on-disk header for this column.
    pub fn header(&self) -> &'static str {
        match self {
            Column::Tags => "tags",
            Column::Repeat => "repeat",
            Column::Subsection => "subsection",
            Column::Variable => "Variable / Field Name",
            Column::FormName => "Form Name",
            Column::SectionHeader => "Section Header",
            Column::FieldType => "Field Type",
            Column::FieldLabel => "Field Label",
            Column::ChoicesCalculations => "Choices, Calculations, OR Slider Labels",
            Column::FieldNote => "Field Note",
            Column::TextValidationType => "Text Validation Type OR Show Slider Number",
            Column::TextValidationMin => "Text Validation Min",
            Column::TextValidationMax => "Text Validation Max",
            Column::Identifier => "Identifier?",
            Column::BranchingLogic => "Branching Logic (Show field only if...)",
            Column::RequiredField => "Required Field?",
            Column::CustomAlignment => "Custom Alignment",
            Column::QuestionNumber => "Question Number (surveys only)",
            Column::MatrixGroupName => "Matrix Group Name",
            Column::MatrixRanking => "Matrix Ranking?",
            Column::FieldAnnotation => "Field Annotation",
        }
    }

    /// Look a column up by its on-disk header.
    pub fn from_header(header: &str) -> Option<Column> {
        Column::ALL.iter().copied().find(|c| c.header() == header)
    }

    /// Whether this is a control column consumed during parsing.
    pub fn is_meta(&self) -> bool {
        Column::META.contains(self)
    }
}

/// Field types a choice-bearing field may take.
pub const CHOICE_FIELD_TYPES: [&str; 3] = ["radio", "checkbox", "dropdown"];

/// Every field type the downstream form system accepts.
pub const FIELD_TYPES: [&str; 12] = [
    "text",
    "notes",
    "radio",
    "checkbox",
    "dropdown",
    "calc",
    "file",
    "yesno",
    "truefalse",
    "descriptive",
    "slider",
    "sql",
];

/// Accepted text-validation types (empty means "none").
pub const TEXT_VALIDATION_TYPES: [&str; 16] = [
    "",
    "date_dmy",
    "date_mdy",
    "date_ymd",
    "datetime_dmy",
    "datetime_mdy",
    "datetime_ymd",
    "datetime_seconds_dmy",
    "datetime_seconds_mdy",
    "datetime_seconds_ymd",
    "email",
    "integer",
    "number",
    "phone",
    "time",
    "zipcode",
];

/// Accepted values for the yes-flag columns (identifier, required).
pub const YES_FLAG_VALUES: [&str; 2] = ["", "y"];

/// Longest identifier the downstream system accepts.
pub const MAX_IDENTIFIER_LEN: usize = 26;

/// Choice count above which a radio field is better served by a dropdown.
pub const MAX_RADIO_CHOICES: usize = 8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partitions_cover_catalog() {
        assert_eq!(Column::META.len() + Column::OUTPUT.len(), Column::ALL.len());
        for col in Column::META {
            assert!(col.is_meta());
        }
        for col in Column::OUTPUT {
            assert!(!col.is_meta());
        }
    }

    #[test]
    fn test_headers_round_trip() {
        for col in Column::ALL {
            assert_eq!(Column::from_header(col.header()), Some(col));
        }
        assert_eq!(Column::from_header("No Such Column"), None);
    }

    #[test]
    fn test_mandatory_are_output_columns() {
        for col in Column::MANDATORY {
            assert!(Column::OUTPUT.contains(&col));
        }
    }
}
