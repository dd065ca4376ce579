// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced while reading an atf-tps stream.

use crate::token::TokenKind;
use miette::Diagnostic;
use std::{error::Error as StdError, fmt, io};
use thiserror::Error;

/// A fatal error in the preamble (header block) of a stream.
///
/// If this is returned, no body events were delivered.
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum PreambleError {
    /// Reading the header block failed.
    #[error("failed to read header block")]
    #[diagnostic(code(atf_tps::preamble::read))]
    Read(#[source] io::Error),

    /// The stream ended before the blank line terminating the header block.
    #[error("unexpected end of stream in header block (line {line})")]
    #[diagnostic(code(atf_tps::preamble::unexpected_eof))]
    UnexpectedEof {
        /// The line on which the stream ended.
        line: usize,
    },

    /// A header line did not have the form `Name: value[; attr=value]*`.
    #[error("malformed header on line {line}: {message}")]
    #[diagnostic(code(atf_tps::preamble::malformed))]
    Malformed {
        /// The line of the malformed header.
        line: usize,
        /// What was wrong with it.
        message: String,
    },

    /// No `Content-Type` header was present.
    #[error("could not determine content type")]
    #[diagnostic(
        code(atf_tps::preamble::missing_content_type),
        help("atf-tps streams start with `Content-Type: application/X-atf-tps; version=\"2\"`")
    )]
    MissingContentType,

    /// The `Content-Type` header named a different format.
    #[error("mismatched content type: expected `{expected}` but got `{actual}`")]
    #[diagnostic(code(atf_tps::preamble::content_type_mismatch))]
    ContentTypeMismatch {
        /// The content type that was required.
        expected: String,
        /// The content type that was declared.
        actual: String,
    },

    /// The `Content-Type` header had no `version` attribute.
    #[error("could not determine version")]
    #[diagnostic(code(atf_tps::preamble::missing_version))]
    MissingVersion,

    /// The `version` attribute did not match.
    #[error("mismatched version: expected `{expected}` but got `{actual}`")]
    #[diagnostic(code(atf_tps::preamble::version_mismatch))]
    VersionMismatch {
        /// The version that was required.
        expected: String,
        /// The version that was declared.
        actual: String,
    },
}

/// The free-form field that was required to be non-empty.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReasonContext {
    /// The reason after `tp-end: <name>,`.
    FailedProgram,
    /// The reason after `failed,`.
    FailedCase,
    /// The reason after `skipped,`.
    SkippedCase,
}

impl fmt::Display for ReasonContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FailedProgram => write!(f, "failed test program"),
            Self::FailedCase => write!(f, "failed test case result"),
            Self::SkippedCase => write!(f, "skipped test case result"),
        }
    }
}

/// The kind of entity whose count was declared.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EntityKind {
    /// Test programs, declared by `tps-count`.
    TestProgram,
    /// Test cases, declared by `tp-start`.
    TestCase,
}

impl EntityKind {
    fn plural(self) -> &'static str {
        match self {
            Self::TestProgram => "test programs",
            Self::TestCase => "test cases",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TestProgram => write!(f, "test program"),
            Self::TestCase => write!(f, "test case"),
        }
    }
}

/// A recoverable error recorded while reading the body of a stream.
///
/// Each error is attached to the line on which it was detected. After
/// recording one of these, the reader resynchronizes at the next record
/// boundary and keeps going.
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum ParseError {
    /// A token of an unexpected kind was found.
    #[error("line {line}: unexpected {found}; expected {expected}")]
    #[diagnostic(code(atf_tps::unexpected_token))]
    UnexpectedToken {
        /// The line of the offending token.
        line: usize,
        /// A description of the offending token.
        found: String,
        /// The kind of the offending token.
        found_kind: TokenKind,
        /// What the grammar expected at this point.
        expected: &'static str,
    },

    /// A `tp-end` or `tc-end` record restated a different name.
    #[error(
        "line {line}: {kind} name used in terminator does not match opening \
         (opened as `{opening}`, closed as `{closing}`)"
    )]
    #[diagnostic(code(atf_tps::name_mismatch))]
    NameMismatch {
        /// The line of the terminator.
        line: usize,
        /// Whether a program or a case was being closed.
        kind: EntityKind,
        /// The name in the opening record.
        opening: String,
        /// The name in the terminator.
        closing: String,
    },

    /// A reason that must be non-empty was empty.
    #[error("line {line}: empty reason for {context}")]
    #[diagnostic(code(atf_tps::empty_reason))]
    EmptyReason {
        /// The line of the record.
        line: usize,
        /// Which reason was empty.
        context: ReasonContext,
    },

    /// A count was not a non-negative integer.
    #[error("line {line}: invalid number of {}: `{text}`", .kind.plural())]
    #[diagnostic(code(atf_tps::invalid_count))]
    InvalidCount {
        /// The line of the count.
        line: usize,
        /// What was being counted.
        kind: EntityKind,
        /// The text that failed to parse.
        text: String,
    },

    /// Fewer entities were present than declared, and nothing else explains
    /// the difference.
    #[error("line {line}: expected {expected} {} but found {found}", .kind.plural())]
    #[diagnostic(code(atf_tps::count_shortfall))]
    CountShortfall {
        /// The line on which the enclosing loop stopped.
        line: usize,
        /// What was being counted.
        kind: EntityKind,
        /// The declared count.
        expected: usize,
        /// The number of entities successfully read.
        found: usize,
    },

    /// An event sink rejected an event.
    #[error("line {line}: event sink error")]
    #[diagnostic(code(atf_tps::sink))]
    Sink {
        /// The line of the last token consumed before the event.
        line: usize,
        /// The error returned by the sink.
        #[source]
        error: SinkError,
    },

    /// Reading from the underlying stream failed, ending it.
    #[error("line {line}: failed to read stream")]
    #[diagnostic(code(atf_tps::read))]
    Read {
        /// The line the reader was on.
        line: usize,
        /// The underlying error.
        #[source]
        error: io::Error,
    },
}

impl ParseError {
    /// Returns the line this error is attached to.
    pub fn line(&self) -> usize {
        match self {
            Self::UnexpectedToken { line, .. }
            | Self::NameMismatch { line, .. }
            | Self::EmptyReason { line, .. }
            | Self::InvalidCount { line, .. }
            | Self::CountShortfall { line, .. }
            | Self::Sink { line, .. }
            | Self::Read { line, .. } => *line,
        }
    }
}

/// An error returned by an [`EventSink`](crate::sink::EventSink) hook.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SinkError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl SinkError {
    /// Creates a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new error with the given message, caused by `source`.
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the message for this error.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<io::Error> for SinkError {
    fn from(error: io::Error) -> Self {
        Self::with_source("I/O error", error)
    }
}

/// Displays an error along with the chain of errors that caused it.
pub struct DisplayErrorChain<E> {
    error: E,
}

impl<E: StdError> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self { error }
    }
}

impl<E: StdError> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        let mut source = self.error.source();
        while let Some(error) = source {
            write!(f, "\n  caused by: {error}")?;
            source = error.source();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let error = ParseError::NameMismatch {
            line: 12,
            kind: EntityKind::TestCase,
            opening: "t1".to_owned(),
            closing: "t2".to_owned(),
        };
        assert_eq!(error.line(), 12);
        assert_eq!(
            error.to_string(),
            "line 12: test case name used in terminator does not match opening \
             (opened as `t1`, closed as `t2`)"
        );

        let error = ParseError::CountShortfall {
            line: 3,
            kind: EntityKind::TestProgram,
            expected: 3,
            found: 2,
        };
        assert_eq!(
            error.to_string(),
            "line 3: expected 3 test programs but found 2"
        );
    }

    #[test]
    fn error_chain() {
        let error = ParseError::Sink {
            line: 4,
            error: SinkError::with_source("failed to write event", io::Error::other("pipe closed")),
        };
        assert_eq!(
            DisplayErrorChain::new(&error).to_string(),
            "line 4: event sink error\n  \
             caused by: failed to write event\n  \
             caused by: pipe closed"
        );

        let error = ParseError::Sink {
            line: 5,
            error: SinkError::new("rejected"),
        };
        assert_eq!(
            DisplayErrorChain::new(&error).to_string(),
            "line 5: event sink error\n  caused by: rejected"
        );
    }
}
