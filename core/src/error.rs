use std::{io, path::PathBuf};

use crate::sandbox::RunStatus;

pub type Result<T> = ::std::result::Result<T, Error>;

/// Errors that abort a grading run.
///
/// Anything the student is responsible for (a crash, a wrong answer, a slow
/// run, an illegal test file) is not an error: it is scored as a value.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Invalid runtime scale token '{token}': {reason}")]
    InvalidScale { token: String, reason: &'static str },

    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,

        #[source]
        source: io::Error,
    },

    #[error("Cannot open redirection target '{path}': {source}")]
    Redirect {
        path: PathBuf,

        #[source]
        source: io::Error,
    },

    #[error("Command failed ({status}): '{command}'")]
    CommandFailed { command: String, status: RunStatus },

    #[error("Sandbox at '{0}' has no resource limits but a limited run was requested")]
    MissingLimits(PathBuf),

    #[error("Judge crashed ({status}) when running command '{command}'")]
    JudgeCrashed { command: String, status: RunStatus },

    #[error("Judge returned success and printed output, but the first line was not a ratio: {line:?}. Fix your judge executable!")]
    MalformedRatio { line: String },

    #[error("Ratio {0} was not between 0 and 1")]
    RatioOutOfRange(f64),

    #[error("No judge found for test {0}")]
    NoJudge(String),

    #[error("Multiple judges found for test {test}: {judges:?}")]
    AmbiguousJudge { test: String, judges: Vec<String> },

    #[error("No integration tests were found")]
    NoIntegrationTests,

    #[error("No benchmark data for test {test} (expected '{path}')")]
    MissingBenchmark { test: String, path: PathBuf },

    #[error("Malformed benchmark artifact '{path}': {reason}")]
    MalformedBenchmark { path: PathBuf, reason: String },

    #[error("Flags command crashed ({status}): '{command}'")]
    FlagsCommandCrashed { command: String, status: RunStatus },

    #[error("Test suite solution crashed ({status}): {test_file}")]
    ReferenceCrashed { test_file: String, status: RunStatus },

    #[error("Cannot create temporary file: {0}")]
    TempFile(#[source] io::Error),

    #[error(transparent)]
    Fs(#[from] fsutil::Error),
}
