//! The directive expander.
//!
//! Walks the schema tree pre-order and emits directive-annotated text for
//! the template host: `iterate` loop blocks for repeated nodes, tag
//! conditionals for tagged nodes when tag filtering is active, and one
//! CSV-encoded literal record per row. The expander never evaluates a
//! directive itself.
//!
//! Every directive closes with `~}}` so the newline that keeps the
//! intermediate template readable is consumed at render time and the
//! rendered table carries no blank lines.

use std::fmt::Write;

use thiserror::Error;

use crate::catalog::Column;
use crate::model::{Form, FormEntry, Row, Section, SectionEntry, Subsection};
use crate::tabular::{self, TabularError};

/// Loop variable bound at each nesting level. Subsections share the
/// section-level convention.
const FORM_ITER: &str = "f_iter";
const SECTION_ITER: &str = "s_iter";
const ROW_ITER: &str = "i_iter";

/// How the global tag selection filters tagged nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagMode {
    /// No filtering; tags are ignored.
    #[default]
    Off,
    /// Keep a tagged node when any of its tags is selected.
    Include,
    /// Drop a tagged node when any of its tags is selected.
    Exclude,
}

impl TagMode {
    fn helper(&self) -> Option<&'static str> {
        match self {
            TagMode::Off => None,
            TagMode::Include => Some("any_tags_selected"),
            TagMode::Exclude => Some("no_tags_selected"),
        }
    }
}

/// Directive emission failure (CSV encoding of a literal record).
#[derive(Debug, Error)]
pub enum ExpandError {
    #[error("failed to encode record: {0}")]
    Encode(#[from] TabularError),
}

/// The directive expander.
pub struct DirectiveExpander {
    mode: TagMode,
}

impl DirectiveExpander {
    pub fn new(mode: TagMode) -> Self {
        Self { mode }
    }

    /// Expand a parsed schema into directive text: the output-column header
    /// followed by loop/conditional-wrapped row literals.
    pub fn expand(&self, forms: &[Form]) -> Result<String, ExpandError> {
        let mut out = String::new();

        let header: Vec<&str> = Column::OUTPUT.iter().map(|c| c.header()).collect();
        out.push_str(&tabular::encode_record(&header)?);

        for form in forms {
            self.expand_form(form, &mut out)?;
        }

        Ok(out)
    }

    fn expand_form(&self, form: &Form, out: &mut String) -> Result<(), ExpandError> {
        self.open_repeat(FORM_ITER, &form.repeat, out);
        self.open_tags(&form.tags, out);

        for entry in &form.contents {
            match entry {
                FormEntry::Row(row) => self.expand_row(row, out)?,
                FormEntry::Section(section) => self.expand_section(section, out)?,
            }
        }

        self.close_tags(&form.tags, out);
        self.close_repeat(&form.repeat, out);
        Ok(())
    }

    fn expand_section(&self, section: &Section, out: &mut String) -> Result<(), ExpandError> {
        self.open_repeat(SECTION_ITER, &section.repeat, out);
        self.open_tags(&section.tags, out);

        for entry in &section.contents {
            match entry {
                SectionEntry::Row(row) => self.expand_row(row, out)?,
                SectionEntry::Subsection(subsection) => {
                    self.expand_subsection(subsection, out)?
                }
            }
        }

        self.close_tags(&section.tags, out);
        self.close_repeat(&section.repeat, out);
        Ok(())
    }

    fn expand_subsection(
        &self,
        subsection: &Subsection,
        out: &mut String,
    ) -> Result<(), ExpandError> {
        self.open_repeat(SECTION_ITER, &subsection.repeat, out);
        self.open_tags(&subsection.tags, out);

        for row in &subsection.rows {
            self.expand_row(row, out)?;
        }

        self.close_tags(&subsection.tags, out);
        self.close_repeat(&subsection.repeat, out);
        Ok(())
    }

    fn expand_row(&self, row: &Row, out: &mut String) -> Result<(), ExpandError> {
        self.open_repeat(ROW_ITER, &row.repeat, out);
        self.open_tags(&row.tags, out);

        out.push_str(&tabular::encode_record(&row.values.ordered())?);

        self.close_tags(&row.tags, out);
        self.close_repeat(&row.repeat, out);
        Ok(())
    }

    fn open_repeat(&self, variable: &str, repeat: &[i64], out: &mut String) {
        if repeat.is_empty() {
            return;
        }
        write!(out, "{{{{#iterate \"{variable}\"").unwrap();
        for value in repeat {
            write!(out, " {value}").unwrap();
        }
        out.push_str("~}}\n");
    }

    fn close_repeat(&self, repeat: &[i64], out: &mut String) {
        if !repeat.is_empty() {
            out.push_str("{{/iterate~}}\n");
        }
    }

    fn open_tags(&self, tags: &[String], out: &mut String) {
        let Some(helper) = self.mode.helper() else {
            return;
        };
        if tags.is_empty() {
            return;
        }
        write!(out, "{{{{#{helper}").unwrap();
        for tag in tags {
            write!(out, " \"{tag}\"").unwrap();
        }
        out.push_str("~}}\n");
    }

    fn close_tags(&self, tags: &[String], out: &mut String) {
        let Some(helper) = self.mode.helper() else {
            return;
        };
        if !tags.is_empty() {
            write!(out, "{{{{/{helper}~}}}}\n").unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RowValues;

    fn plain_row(variable: &str) -> Row {
        let mut values = RowValues::default();
        values.variable = variable.to_string();
        values.form_name = "f".to_string();
        values.field_type = "text".to_string();
        values.field_label = "Label".to_string();
        Row {
            repeat: vec![],
            tags: vec![],
            values,
        }
    }

    fn plain_form(rows: Vec<Row>) -> Form {
        Form {
            name: "f".to_string(),
            repeat: vec![],
            tags: vec![],
            contents: rows.into_iter().map(FormEntry::Row).collect(),
        }
    }

    #[test]
    fn test_header_always_leads() {
        let expander = DirectiveExpander::new(TagMode::Off);
        let text = expander.expand(&[]).unwrap();
        assert!(text.starts_with("Variable / Field Name,Form Name,"));
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_plain_rows_emit_no_directives() {
        let expander = DirectiveExpander::new(TagMode::Off);
        let text = expander
            .expand(&[plain_form(vec![plain_row("a"), plain_row("b")])])
            .unwrap();
        assert!(!text.contains("{{"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_row_repeat_wraps_only_that_row() {
        let mut repeated = plain_row("a");
        repeated.repeat = vec![2, 3, 4];
        let expander = DirectiveExpander::new(TagMode::Off);
        let text = expander
            .expand(&[plain_form(vec![repeated, plain_row("b")])])
            .unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "{{#iterate \"i_iter\" 2 3 4~}}");
        assert!(lines[2].starts_with("a,f,"));
        assert_eq!(lines[3], "{{/iterate~}}");
        assert!(lines[4].starts_with("b,f,"));
    }

    #[test]
    fn test_tags_nest_inside_repeat() {
        let mut form = plain_form(vec![plain_row("a")]);
        form.repeat = vec![1, 2];
        form.tags = vec!["extra".to_string()];

        let expander = DirectiveExpander::new(TagMode::Include);
        let text = expander.expand(&[form]).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[1], "{{#iterate \"f_iter\" 1 2~}}");
        assert_eq!(lines[2], "{{#any_tags_selected \"extra\"~}}");
        assert_eq!(lines[4], "{{/any_tags_selected~}}");
        assert_eq!(lines[5], "{{/iterate~}}");
    }

    #[test]
    fn test_tags_ignored_when_filtering_off() {
        let mut form = plain_form(vec![plain_row("a")]);
        form.tags = vec!["extra".to_string()];

        let text = DirectiveExpander::new(TagMode::Off)
            .expand(&[form])
            .unwrap();
        assert!(!text.contains("any_tags_selected"));
    }

    #[test]
    fn test_exclude_mode_uses_negated_helper() {
        let mut row = plain_row("a");
        row.tags = vec!["highrisk".to_string()];

        let text = DirectiveExpander::new(TagMode::Exclude)
            .expand(&[plain_form(vec![row])])
            .unwrap();
        assert!(text.contains("{{#no_tags_selected \"highrisk\"~}}"));
        assert!(text.contains("{{/no_tags_selected~}}"));
    }

    #[test]
    fn test_section_and_subsection_bind_section_variable() {
        let mut subsection = Subsection {
            name: "panel".to_string(),
            repeat: vec![1, 2],
            tags: vec![],
            rows: vec![plain_row("inner")],
        };
        subsection.rows[0].values.section_header.clear();

        let section = Section {
            name: "S".to_string(),
            repeat: vec![5, 6],
            tags: vec![],
            contents: vec![SectionEntry::Subsection(subsection)],
        };
        let form = Form {
            name: "f".to_string(),
            repeat: vec![],
            tags: vec![],
            contents: vec![FormEntry::Section(section)],
        };

        let text = DirectiveExpander::new(TagMode::Off).expand(&[form]).unwrap();
        assert_eq!(text.matches("{{#iterate \"s_iter\"").count(), 2);
    }

    #[test]
    fn test_sections_emit_no_literal_records() {
        let section = Section {
            name: "S".to_string(),
            repeat: vec![],
            tags: vec![],
            contents: vec![SectionEntry::Row(plain_row("only"))],
        };
        let form = Form {
            name: "f".to_string(),
            repeat: vec![],
            tags: vec![],
            contents: vec![FormEntry::Section(section)],
        };

        let text = DirectiveExpander::new(TagMode::Off).expand(&[form]).unwrap();
        // header plus exactly one data row
        assert_eq!(text.lines().count(), 2);
    }
}
