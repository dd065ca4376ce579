// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    config::ConfigParseError,
    exit_codes::TpsExitCode,
    output::{NO_HEADING, StderrStyles},
};
use atf_tps::errors::PreambleError;
use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;

// The Display impls on ExpectedError are short; the main way to present these
// errors is with the display_to_stderr method, which colorizes errors.

/// An error that the `atf-tps` command expects to be able to report.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not read current directory")]
    CurrentDirFailed { err: std::io::Error },
    #[error("current directory is not valid UTF-8")]
    CurrentDirInvalidUtf8 { path: std::path::PathBuf },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("failed to open input")]
    InputOpenError { input: String, err: std::io::Error },
    #[error("invalid preamble")]
    PreambleError { input: String, err: PreambleError },
    #[error("report had parse diagnostics")]
    ParseDiagnostics { input: String, count: usize },
    #[error("test run failed")]
    TestRunFailed,
    #[error("error writing output")]
    WriteOutputError { err: std::io::Error },
    #[error("failed to create output file")]
    OutputFileCreateError { path: Utf8PathBuf, err: std::io::Error },
    #[error("failed to serialize JUnit report")]
    JunitSerializeError {
        err: Box<dyn Error + Send + Sync>,
    },
}

impl ExpectedError {
    pub(crate) fn input_open_error(input: impl Into<String>, err: std::io::Error) -> Self {
        Self::InputOpenError {
            input: input.into(),
            err,
        }
    }

    pub(crate) fn preamble_error(input: impl Into<String>, err: PreambleError) -> Self {
        Self::PreambleError {
            input: input.into(),
            err,
        }
    }

    pub(crate) fn parse_diagnostics(input: impl Into<String>, count: usize) -> Self {
        Self::ParseDiagnostics {
            input: input.into(),
            count,
        }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirFailed { .. }
            | Self::CurrentDirInvalidUtf8 { .. }
            | Self::ConfigParseError { .. }
            | Self::InputOpenError { .. } => TpsExitCode::SETUP_ERROR,
            Self::PreambleError { .. } => TpsExitCode::PREAMBLE_ERROR,
            Self::ParseDiagnostics { .. } => TpsExitCode::PARSE_DIAGNOSTICS,
            Self::TestRunFailed => TpsExitCode::TEST_RUN_FAILED,
            Self::WriteOutputError { .. }
            | Self::OutputFileCreateError { .. }
            | Self::JunitSerializeError { .. } => TpsExitCode::WRITE_OUTPUT_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::CurrentDirFailed { err } => {
                error!("could not read current directory");
                Some(err as &dyn Error)
            }
            Self::CurrentDirInvalidUtf8 { path } => {
                error!(
                    "current directory `{}` is not valid UTF-8",
                    path.display().style(styles.bold)
                );
                None
            }
            Self::ConfigParseError { err } => {
                // The config parse error's Display includes the file name;
                // print out the underlying error.
                error!("{err}");
                Some(err.kind() as &dyn Error)
            }
            Self::InputOpenError { input, err } => {
                error!("failed to open input `{}`", input.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::PreambleError { input, err } => {
                error!(
                    "failed to read atf-tps report from `{}`",
                    input.style(styles.bold)
                );
                Some(err as &dyn Error)
            }
            Self::ParseDiagnostics { input, count } => {
                error!(
                    "report `{}` had {} {}",
                    input.style(styles.bold),
                    count.style(styles.bold),
                    if *count == 1 {
                        "parse diagnostic"
                    } else {
                        "parse diagnostics"
                    },
                );
                None
            }
            Self::TestRunFailed => {
                error!("test run failed");
                None
            }
            Self::WriteOutputError { err } => {
                error!("error writing output");
                Some(err as &dyn Error)
            }
            Self::OutputFileCreateError { path, err } => {
                error!(
                    "failed to create output file `{}`",
                    path.style(styles.bold)
                );
                Some(err as &dyn Error)
            }
            Self::JunitSerializeError { err } => {
                error!("failed to serialize JUnit report");
                Some(&**err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
