//! External variable files.
//!
//! A side file in JSON, YAML or INI syntax supplies extra named bindings for
//! the render step. The format is selected by file extension through a fixed
//! table, case-insensitively; malformed content fails with a format-specific
//! error quoting the first characters of the offending content.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::rendering::Bindings;

/// How much of the offending content a parse error quotes.
const SNIPPET_LEN: usize = 40;

/// External-variables failures.
#[derive(Debug, Error)]
pub enum ExtVarsError {
    #[error("unrecognised variables file format: {}", path.display())]
    UnrecognizedFormat { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON: '{snippet} ...'")]
    MalformedJson { snippet: String },

    #[error("malformed YAML: '{snippet} ...'")]
    MalformedYaml { snippet: String },

    #[error("malformed INI: '{snippet} ...'")]
    MalformedIni { snippet: String },

    #[error("variables file must hold a mapping at top level")]
    NotAMapping,
}

/// A supported variables-file syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarsFormat {
    Json,
    Yaml,
    Ini,
}

impl VarsFormat {
    /// Select the format from a file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Result<VarsFormat, ExtVarsError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(VarsFormat::Json),
            "yml" | "yaml" => Ok(VarsFormat::Yaml),
            "ini" => Ok(VarsFormat::Ini),
            _ => Err(ExtVarsError::UnrecognizedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Parse variable bindings from text in the given format.
pub fn parse_vars(data: &str, format: VarsFormat) -> Result<Bindings, ExtVarsError> {
    match format {
        VarsFormat::Json => {
            let value: Value =
                serde_json::from_str(data).map_err(|_| ExtVarsError::MalformedJson {
                    snippet: snippet(data),
                })?;
            into_bindings(value)
        }
        VarsFormat::Yaml => {
            let value: Value =
                serde_yaml::from_str(data).map_err(|_| ExtVarsError::MalformedYaml {
                    snippet: snippet(data),
                })?;
            into_bindings(value)
        }
        VarsFormat::Ini => {
            let ini = ini::Ini::load_from_str(data).map_err(|_| ExtVarsError::MalformedIni {
                snippet: snippet(data),
            })?;

            let mut bindings = Bindings::new();
            for (section, properties) in ini.iter() {
                let entries: Bindings = properties
                    .iter()
                    .map(|(key, value)| (key.to_string(), Value::from(value)))
                    .collect();
                match section {
                    // sectionless keys land at top level
                    None => bindings.extend(entries),
                    Some(name) => {
                        bindings.insert(name.to_string(), Value::Object(entries));
                    }
                }
            }
            Ok(bindings)
        }
    }
}

/// Load variable bindings from a file, selecting the format from the
/// extension.
pub fn load_vars(path: &Path) -> Result<Bindings, ExtVarsError> {
    let format = VarsFormat::from_path(path)?;
    let data = fs::read_to_string(path).map_err(|source| ExtVarsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_vars(&data, format)
}

fn into_bindings(value: Value) -> Result<Bindings, ExtVarsError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ExtVarsError::NotAMapping),
    }
}

fn snippet(data: &str) -> String {
    data.chars().take(SNIPPET_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use test_case::test_case;

    #[test_case("vars.json", VarsFormat::Json; "json")]
    #[test_case("vars.YAML", VarsFormat::Yaml; "upper yaml")]
    #[test_case("vars.yml", VarsFormat::Yaml; "yml")]
    #[test_case("vars.Ini", VarsFormat::Ini; "mixed ini")]
    fn test_format_from_extension(name: &str, expected: VarsFormat) {
        assert_eq!(VarsFormat::from_path(Path::new(name)).unwrap(), expected);
    }

    #[test]
    fn test_unknown_extension_fails() {
        let err = VarsFormat::from_path(Path::new("vars.toml")).unwrap_err();
        assert!(matches!(err, ExtVarsError::UnrecognizedFormat { .. }));
    }

    #[test]
    fn test_parse_json_vars() {
        let vars = parse_vars(r#"{"study": "ALPHA", "arms": 3}"#, VarsFormat::Json).unwrap();
        assert_eq!(vars["study"], "ALPHA");
        assert_eq!(vars["arms"], 3);
    }

    #[test]
    fn test_parse_yaml_vars() {
        let vars = parse_vars("study: ALPHA\narms: 3\n", VarsFormat::Yaml).unwrap();
        assert_eq!(vars["study"], "ALPHA");
        assert_eq!(vars["arms"], 3);
    }

    #[test]
    fn test_parse_ini_vars() {
        let text = "study = ALPHA\n[site]\nname = General Hospital\n";
        let vars = parse_vars(text, VarsFormat::Ini).unwrap();
        assert_eq!(vars["study"], "ALPHA");
        assert_eq!(vars["site"]["name"], "General Hospital");
    }

    #[test]
    fn test_malformed_content_quotes_snippet() {
        let data = "{this is not json at all, not even a little bit, no".to_string();
        let err = parse_vars(&data, VarsFormat::Json).unwrap_err();
        match err {
            ExtVarsError::MalformedJson { snippet } => {
                assert_eq!(snippet.chars().count(), SNIPPET_LEN);
                assert!(data.starts_with(&snippet));
            }
            other => panic!("expected malformed JSON, got {other:?}"),
        }
    }

    #[test]
    fn test_top_level_must_be_mapping() {
        let err = parse_vars("[1, 2, 3]", VarsFormat::Json).unwrap_err();
        assert!(matches!(err, ExtVarsError::NotAMapping));
    }

    #[test]
    fn test_load_vars_from_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"study": "BETA"}}"#).unwrap();

        let vars = load_vars(file.path()).unwrap();
        assert_eq!(vars["study"], "BETA");
    }
}
