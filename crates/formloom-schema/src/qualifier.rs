//! The metadata qualifier micro-grammar.
//!
//! A metadata string is a `;`-separated list of statements. Each statement is
//! `scope:value` with scope one of `form` / `section` / `subsection` / `row`,
//! or a bare value that defaults to `row` scope. Tag values are `,`-separated
//! lists; repeat values are either an explicit integer sequence (`1,2,5`) or
//! an inclusive range (`2-6`). Repeat sequences are decoded by a dedicated
//! integer-list parser, never evaluated as expression syntax.

use thiserror::Error;

use crate::model::{Scope, ScopeMap};

/// Malformed metadata string. The caller attaches the owning row's
/// identifier when reporting.
#[derive(Debug, Error)]
pub enum MetadataSyntaxError {
    #[error("unrecognised qualifier '{qualifier}' in '{input}'")]
    UnknownQualifier { qualifier: String, input: String },

    #[error("duplicate {scope} statement in '{input}'")]
    DuplicateScope { scope: Scope, input: String },

    #[error("can't interpret '{value}' as a repeat range or sequence")]
    UninterpretableRepeat { value: String },

    #[error("invalid integer '{token}' in repeat value '{value}'")]
    InvalidInteger { token: String, value: String },
}

/// Split a metadata string into per-scope statements.
///
/// Blank statements are skipped; two statements for the same scope fail.
fn split_statements(input: &str) -> Result<Vec<(Scope, &str)>, MetadataSyntaxError> {
    let mut statements = Vec::new();
    let mut seen: Vec<Scope> = Vec::new();

    for statement in input.split(';') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }

        let (scope, value) = match statement.split_once(':') {
            Some((keyword, value)) => {
                let keyword = keyword.trim();
                let scope = Scope::from_keyword(keyword).ok_or_else(|| {
                    MetadataSyntaxError::UnknownQualifier {
                        qualifier: keyword.to_string(),
                        input: input.to_string(),
                    }
                })?;
                (scope, value.trim())
            }
            None => (Scope::Row, statement),
        };

        if seen.contains(&scope) {
            return Err(MetadataSyntaxError::DuplicateScope {
                scope,
                input: input.to_string(),
            });
        }
        seen.push(scope);
        statements.push((scope, value));
    }

    Ok(statements)
}

/// Decode a `tags` metadata string into per-scope tag lists.
pub fn parse_tags(input: &str) -> Result<ScopeMap<String>, MetadataSyntaxError> {
    let mut map = ScopeMap::default();
    for (scope, value) in split_statements(input)? {
        let tags = value
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        *map.slot_mut(scope) = tags;
    }
    Ok(map)
}

/// Decode a `repeat` metadata string into per-scope integer lists.
pub fn parse_repeat(input: &str) -> Result<ScopeMap<i64>, MetadataSyntaxError> {
    let mut map = ScopeMap::default();
    for (scope, value) in split_statements(input)? {
        if value.is_empty() {
            continue;
        }
        *map.slot_mut(scope) = decode_repeat_value(value)?;
    }
    Ok(map)
}

/// Decode one repeat value: an explicit sequence or an inclusive range.
fn decode_repeat_value(value: &str) -> Result<Vec<i64>, MetadataSyntaxError> {
    if value.contains(',') {
        return value
            .split(',')
            .map(|token| {
                let token = token.trim();
                token
                    .parse::<i64>()
                    .map_err(|_| MetadataSyntaxError::InvalidInteger {
                        token: token.to_string(),
                        value: value.to_string(),
                    })
            })
            .collect();
    }

    if let Some((start, stop)) = value.split_once('-') {
        let parse = |token: &str| {
            token
                .trim()
                .parse::<i64>()
                .map_err(|_| MetadataSyntaxError::InvalidInteger {
                    token: token.trim().to_string(),
                    value: value.to_string(),
                })
        };
        let (start, stop) = (parse(start)?, parse(stop)?);
        return Ok((start..=stop).collect());
    }

    Err(MetadataSyntaxError::UninterpretableRepeat {
        value: value.to_string(),
    })
}
