//! Error types shared by the import and erase workflows.

use std::path::PathBuf;

use aws_sdk_cloudformation::error::ProvideErrorMetadata;
use aws_sdk_dynamodb::error::{BuildError, DisplayErrorContext};
use thiserror::Error;

/// Exit code used for every unrecoverable failure.
pub const FAILURE_EXIT_CODE: u8 = 42;

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, AppError>;

/// Errors that can end a `dynamocli` run.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{service} error: {message}")]
    Service {
        service: &'static str,
        code: Option<String>,
        message: String,
    },

    #[error("Table '{table_name}' not found")]
    TableNotFound { table_name: String },

    #[error("Table {table_name} not found in the {stack_name} stack")]
    TableNotInTemplate {
        table_name: String,
        stack_name: String,
    },

    #[error("Template of the {stack_name} stack is neither JSON nor YAML: {reason}")]
    InvalidTemplate { stack_name: String, reason: String },

    #[error(
        "Not supported file format: {}. Only supported file formats are: {supported:?}",
        path.display()
    )]
    UnsupportedFormat {
        path: PathBuf,
        supported: &'static [&'static str],
    },

    #[error("Row {row}, column '{column}': '{value}' is not an integer")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Stack {stack_name} update ended with status {status}")]
    StackUpdateFailed { stack_name: String, status: String },

    #[error("Timed out after {waited_secs}s waiting for {what}")]
    PollTimeout { what: String, waited_secs: u64 },

    #[error("Interrupted")]
    Interrupted,

    #[error("Failed to build request: {0}")]
    Build(#[from] BuildError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Wraps an SDK error, keeping the service-provided code and message.
    ///
    /// Failures that never reached the service (dispatch, timeout,
    /// credentials) carry no message and are described with their causes.
    pub fn service<E>(service: &'static str, err: E) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error,
    {
        let message = err
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
        Self::Service {
            service,
            code: err.code().map(str::to_string),
            message,
        }
    }

    /// Returns true for a CloudFormation/DynamoDB `ValidationError`.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Service { code: Some(code), .. } if code == "ValidationError")
    }

    pub fn exit_code(&self) -> u8 {
        FAILURE_EXIT_CODE
    }
}
