//! CLI support for the rules binary
//!
//! Exposes the `check` flow programmatically so other tools can embed it.

mod check;
mod convert;
mod docs;

pub use check::{CheckOptions, CheckResult, execute_check};
pub use convert::{Payload, parse_params, parse_payload};
pub use docs::{DocCategory, get_doc_category, get_docs_overview};

use std::io;

use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Compile error: {0}")]
    Compile(#[from] crate::CompileError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] crate::EvalError),

    #[error("{0}")]
    Registry(#[from] crate::RegistryError),

    #[error("{0}")]
    Config(#[from] crate::ConfigError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid --param `{0}`: expected name=value")]
    InvalidParam(String),

    #[error("Invalid `now` in payload: `{0}`")]
    InvalidNow(String),

    #[error("No input provided. Use --input or pipe JSON to stdin.")]
    NoInput,

    #[error("Nothing to check: give a filter or --collection")]
    NoFilter,

    #[error("Collection `{0}` is not defined in the payload")]
    UnknownCollection(String),

    #[error("Unknown action `{0}`; expected list, view, create, update, delete, manage or auth")]
    UnknownAction(String),

    #[error("Unknown category: '{0}'\nRun 'rules docs' to see available categories.")]
    UnknownCategory(String),
}
