// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{errors::SinkError, result::TestCaseResult, sink::EventSink};
use serde::Serialize;
use std::fmt;

/// An owned copy of a single event delivered to an [`EventSink`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum TpsEvent {
    /// See [`EventSink::info`].
    Info {
        /// The property name.
        name: String,
        /// The property value.
        value: String,
    },

    /// See [`EventSink::program_count`].
    ProgramCount {
        /// The declared number of test programs.
        count: usize,
    },

    /// See [`EventSink::program_start`].
    #[serde(rename_all = "kebab-case")]
    ProgramStart {
        /// The name of the test program.
        name: String,
        /// The declared number of test cases.
        case_count: usize,
    },

    /// See [`EventSink::program_end`].
    ProgramEnd {
        /// The failure reason, or empty.
        reason: String,
    },

    /// See [`EventSink::case_start`].
    CaseStart {
        /// The name of the test case.
        name: String,
    },

    /// See [`EventSink::case_stdout_line`].
    CaseStdoutLine {
        /// The captured line.
        line: String,
    },

    /// See [`EventSink::case_stderr_line`].
    CaseStderrLine {
        /// The captured line.
        line: String,
    },

    /// See [`EventSink::case_end`].
    CaseEnd {
        /// The verdict.
        result: TestCaseResult,
    },

    /// See [`EventSink::end_of_stream`].
    EndOfStream,
}

impl TpsEvent {
    /// Delivers this event to `sink`.
    pub fn deliver<S: EventSink + ?Sized>(&self, sink: &mut S) -> Result<(), SinkError> {
        match self {
            Self::Info { name, value } => sink.info(name, value),
            Self::ProgramCount { count } => sink.program_count(*count),
            Self::ProgramStart { name, case_count } => sink.program_start(name, *case_count),
            Self::ProgramEnd { reason } => sink.program_end(reason),
            Self::CaseStart { name } => sink.case_start(name),
            Self::CaseStdoutLine { line } => sink.case_stdout_line(line),
            Self::CaseStderrLine { line } => sink.case_stderr_line(line),
            Self::CaseEnd { result } => sink.case_end(result),
            Self::EndOfStream => sink.end_of_stream(),
        }
    }
}

/// A compact, one-line rendering used for transcripts.
impl fmt::Display for TpsEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info { name, value } => write!(f, "info({name}, {value})"),
            Self::ProgramCount { count } => write!(f, "program-count({count})"),
            Self::ProgramStart { name, case_count } => {
                write!(f, "program-start({name}, {case_count})")
            }
            Self::ProgramEnd { reason } => write!(f, "program-end({reason})"),
            Self::CaseStart { name } => write!(f, "case-start({name})"),
            Self::CaseStdoutLine { line } => write!(f, "stdout({line})"),
            Self::CaseStderrLine { line } => write!(f, "stderr({line})"),
            Self::CaseEnd { result } => write!(f, "case-end({result})"),
            Self::EndOfStream => write!(f, "end-of-stream"),
        }
    }
}

/// An [`EventSink`] that keeps every event it receives.
#[derive(Clone, Debug, Default)]
pub struct EventRecorder {
    events: Vec<TpsEvent>,
}

impl EventRecorder {
    /// Creates a new, empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the events recorded so far.
    pub fn events(&self) -> &[TpsEvent] {
        &self.events
    }

    /// Consumes `self`, returning the recorded events.
    pub fn into_events(self) -> Vec<TpsEvent> {
        self.events
    }

    fn push(&mut self, event: TpsEvent) -> Result<(), SinkError> {
        self.events.push(event);
        Ok(())
    }
}

impl EventSink for EventRecorder {
    fn info(&mut self, name: &str, value: &str) -> Result<(), SinkError> {
        self.push(TpsEvent::Info {
            name: name.to_owned(),
            value: value.to_owned(),
        })
    }

    fn program_count(&mut self, count: usize) -> Result<(), SinkError> {
        self.push(TpsEvent::ProgramCount { count })
    }

    fn program_start(&mut self, name: &str, case_count: usize) -> Result<(), SinkError> {
        self.push(TpsEvent::ProgramStart {
            name: name.to_owned(),
            case_count,
        })
    }

    fn program_end(&mut self, reason: &str) -> Result<(), SinkError> {
        self.push(TpsEvent::ProgramEnd {
            reason: reason.to_owned(),
        })
    }

    fn case_start(&mut self, name: &str) -> Result<(), SinkError> {
        self.push(TpsEvent::CaseStart {
            name: name.to_owned(),
        })
    }

    fn case_stdout_line(&mut self, line: &str) -> Result<(), SinkError> {
        self.push(TpsEvent::CaseStdoutLine {
            line: line.to_owned(),
        })
    }

    fn case_stderr_line(&mut self, line: &str) -> Result<(), SinkError> {
        self.push(TpsEvent::CaseStderrLine {
            line: line.to_owned(),
        })
    }

    fn case_end(&mut self, result: &TestCaseResult) -> Result<(), SinkError> {
        self.push(TpsEvent::CaseEnd {
            result: result.clone(),
        })
    }

    fn end_of_stream(&mut self) -> Result<(), SinkError> {
        self.push(TpsEvent::EndOfStream)
    }
}
