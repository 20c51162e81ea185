pub mod completions;
pub mod config;
pub mod rank;
pub mod resolve;
pub mod score;

use agency_core::config::{ProjectConfig, RetryConfig, load_project_config};
use agency_core::error::ErrorCode;
use agency_core::model::Dataset;
use agency_core::throttle::{RetryPolicy, retry};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// A command failure that maps to a stable [`ErrorCode`].
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct CodedError {
    pub code: ErrorCode,
    pub message: String,
}

impl CodedError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Load `.agency/config.toml` under `project_root`.
///
/// # Errors
///
/// Returns a [`CodedError`] when the file exists but cannot be read or parsed.
pub fn project_config(project_root: &Path) -> anyhow::Result<ProjectConfig> {
    load_project_config(project_root).map_err(|err| {
        CodedError::new(ErrorCode::ConfigParseError, format!("{err:#}")).into()
    })
}

fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Read `input` into `buf`, or `stdin` when `input` is `-`.
///
/// Stream bytes consumed before a failed read stay in `buf`, so a retry
/// continues where the last attempt stopped. Files are re-read from the start.
fn read_source(input: &Path, stdin: &mut dyn Read, buf: &mut Vec<u8>) -> io::Result<()> {
    if input.as_os_str() == "-" {
        stdin.read_to_end(buf)?;
    } else {
        buf.clear();
        File::open(input)?.read_to_end(buf)?;
    }
    Ok(())
}

/// Load a JSON dataset from `input`, or stdin when `input` is `-`.
///
/// Transient read failures are retried with the project's retry policy.
///
/// # Errors
///
/// Returns a [`CodedError`] when the input cannot be read or parsed.
pub fn load_dataset(input: &Path, retry_config: &RetryConfig) -> anyhow::Result<Dataset> {
    let policy = RetryPolicy::from(retry_config);
    let label = if input.as_os_str() == "-" {
        "<stdin>".to_string()
    } else {
        input.display().to_string()
    };

    let mut buf = Vec::new();
    let mut stdin = io::stdin().lock();
    retry(&policy, is_transient, |_| read_source(input, &mut stdin, &mut buf)).map_err(|err| {
        CodedError::new(
            ErrorCode::InputUnreadable,
            format!("failed to read {label}: {}", err.into_inner()),
        )
    })?;
    let content = String::from_utf8(buf).map_err(|err| {
        CodedError::new(
            ErrorCode::InputUnreadable,
            format!("failed to read {label}: {err}"),
        )
    })?;

    let dataset = Dataset::from_json(&content).map_err(|err| {
        CodedError::new(
            ErrorCode::InputParseError,
            format!("failed to parse {label}: {err:#}"),
        )
    })?;
    tracing::debug!(input = %label, "loaded dataset");
    Ok(dataset)
}
