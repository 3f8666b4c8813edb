//! CLI error handling and exit-code mapping.

use std::path::PathBuf;
use std::process::ExitCode;

use thiserror::Error;

use formloom_schema::{
    ExpandError, ExtVarsError, ParseError, PostValidateError, RenderError, TabularError,
};

use crate::Exit;

/// CLI error type wrapping the pipeline failures.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Input(#[from] TabularError),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Expand(#[from] ExpandError),

    #[error("{0}")]
    Render(#[from] RenderError),

    #[error("{0}")]
    Vars(#[from] ExtVarsError),

    #[error("{0}")]
    Validation(#[from] PostValidateError),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Input(_) | Self::Vars(_) | Self::Write { .. } => Exit::InputError,
            Self::Parse(_) | Self::Expand(_) => Exit::ParseError,
            Self::Render(_) => Exit::RenderError,
            Self::Validation(_) => Exit::ValidationError,
            Self::Other(_) => Exit::GeneralError,
        }
        .into()
    }
}
