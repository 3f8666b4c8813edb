//! The end-to-end expansion pipeline.
//!
//! Read the compact table, parse it into the schema tree, expand the tree
//! into directive text, render against the bindings, post-validate the
//! rendered output, write the expanded schema. Fully synchronous; every
//! stage consumes its input whole before the next starts.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use formloom_schema::{
    extvars, tabular, Bindings, CompactSchemaParser, DirectiveExpander, PostValidator,
    PostValidatorOptions, TemplateHost, Warning,
};

use crate::cli::Cli;
use crate::error::CliError;

pub fn run(cli: &Cli) -> Result<(), CliError> {
    let out_path = cli.output_path();

    // read the compact schema and work out its structure
    info!("reading {}", cli.infile.display());
    let table = tabular::read_table(&cli.infile)?;

    info!(records = table.rows.len(), "parsing compact schema");
    let parser = CompactSchemaParser::new(cli.allow_extra_columns);
    let schema = parser.parse(&table)?;
    report(&schema.warnings);

    // expand the tree into directive text
    let expander = DirectiveExpander::new(cli.tag_mode());
    let template = expander.expand(&schema.forms)?;

    if cli.keep_intermediates {
        let tree = serde_json::to_string_pretty(&schema.forms)
            .map_err(|e| CliError::Other(e.into()))?;
        write_file(&out_path.with_extension("tree.json"), &tree)?;
        write_file(&out_path.with_extension("hbs"), &template)?;
    }

    // render the directives against the bindings
    let bindings = build_bindings(cli)?;
    let host = TemplateHost::new();
    let rendered = host.render(&template, &bindings)?;

    // post-validate the expanded output
    let expanded = tabular::read_table_str(&rendered)?;
    let mut validator = PostValidator::new(PostValidatorOptions {
        forbid_reused_form_names: cli.strict_form_order,
    });
    report(&validator.check(&expanded)?);

    write_file(&out_path, &rendered)?;
    info!(
        rows = expanded.rows.len(),
        "wrote expanded schema to {}",
        out_path.display()
    );

    Ok(())
}

/// Merge the external variables (when given) with the active tag selection.
fn build_bindings(cli: &Cli) -> Result<Bindings, CliError> {
    let mut bindings = match &cli.vars_file {
        Some(path) => extvars::load_vars(path)?,
        None => Bindings::new(),
    };

    let tags: Vec<Value> = cli
        .selected_tags()
        .iter()
        .map(|t| Value::from(t.as_str()))
        .collect();
    bindings.insert("tags".to_string(), Value::Array(tags));

    Ok(bindings)
}

fn report(warnings: &[Warning]) {
    for warning in warnings {
        warn!("{warning}");
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), CliError> {
    fs::write(path, content).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}
