//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueHint};

use formloom_schema::TagMode;

/// Formloom - compact form-schema expander
///
/// Expand a compact tabular form schema (with repeat and tag metadata) into
/// the full flat schema a form-management system ingests.
#[derive(Debug, Parser)]
#[command(
    name = "formloom",
    author,
    version,
    about,
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Compact schema file to be processed (.csv, .tsv)
    #[arg(value_hint = ValueHint::FilePath)]
    pub infile: PathBuf,

    /// Output path for the expanded schema
    #[arg(
        short,
        long,
        value_hint = ValueHint::FilePath,
        help = "Where to write the expanded schema (default: <infile>.expanded.csv)"
    )]
    pub outfile: Option<PathBuf>,

    /// Keep only nodes carrying one of these tags
    #[arg(
        long = "include-tag",
        value_name = "TAG",
        conflicts_with = "exclude_tags",
        help = "Keep tagged nodes only when they carry one of these tags"
    )]
    pub include_tags: Vec<String>,

    /// Drop nodes carrying one of these tags
    #[arg(
        long = "exclude-tag",
        value_name = "TAG",
        help = "Drop tagged nodes that carry one of these tags"
    )]
    pub exclude_tags: Vec<String>,

    /// External variables file (.json, .yaml, .yml, .ini)
    #[arg(
        long = "vars",
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        help = "Extra named bindings merged into the render variables"
    )]
    pub vars_file: Option<PathBuf>,

    /// Accept input columns outside the known catalog
    #[arg(long, help = "Accept input columns outside the known catalog")]
    pub allow_extra_columns: bool,

    /// Fail when a form name reappears non-contiguously in the output
    #[arg(
        long,
        help = "Treat a reused (non-contiguous) form name as a hard error"
    )]
    pub strict_form_order: bool,

    /// Keep the intermediate schema tree and directive template on disk
    #[arg(
        long,
        help = "Write the parsed tree (.tree.json) and directive template (.hbs) next to the output"
    )]
    pub keep_intermediates: bool,

    /// Increase verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, help = "Increase verbosity level")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(
        short,
        long,
        conflicts_with = "verbose",
        help = "Suppress non-error output"
    )]
    pub quiet: bool,
}

impl Cli {
    /// The tag-filtering mode implied by the tag lists.
    pub fn tag_mode(&self) -> TagMode {
        if !self.include_tags.is_empty() {
            TagMode::Include
        } else if !self.exclude_tags.is_empty() {
            TagMode::Exclude
        } else {
            TagMode::Off
        }
    }

    /// The active tag selection, whichever list is in use.
    pub fn selected_tags(&self) -> &[String] {
        if !self.include_tags.is_empty() {
            &self.include_tags
        } else {
            &self.exclude_tags
        }
    }

    /// The output path, derived from the input when not given.
    pub fn output_path(&self) -> PathBuf {
        match &self.outfile {
            Some(path) => path.clone(),
            None => self.infile.with_extension("expanded.csv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_tag_mode_from_lists() {
        let cli = Cli::parse_from(["formloom", "in.csv"]);
        assert_eq!(cli.tag_mode(), TagMode::Off);

        let cli = Cli::parse_from(["formloom", "in.csv", "--include-tag", "pilot"]);
        assert_eq!(cli.tag_mode(), TagMode::Include);
        assert_eq!(cli.selected_tags(), ["pilot"]);

        let cli = Cli::parse_from(["formloom", "in.csv", "--exclude-tag", "highrisk"]);
        assert_eq!(cli.tag_mode(), TagMode::Exclude);
    }

    #[test]
    fn test_include_and_exclude_conflict() {
        let result = Cli::try_parse_from([
            "formloom",
            "in.csv",
            "--include-tag",
            "a",
            "--exclude-tag",
            "b",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_output_path_is_derived() {
        let cli = Cli::parse_from(["formloom", "schemas/study.csv"]);
        assert_eq!(
            cli.output_path(),
            PathBuf::from("schemas/study.expanded.csv")
        );
    }
}
