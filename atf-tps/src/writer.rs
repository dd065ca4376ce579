// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::SinkError,
    header::{TPS_CONTENT_TYPE, TPS_VERSION},
    result::TestCaseResult,
    sink::EventSink,
    token::TokenKind,
};
use std::{fmt, io::Write};

/// An [`EventSink`] that writes events back out as a well-formed atf-tps
/// stream.
///
/// The preamble is written before the first event. Names must be valid tokens
/// (non-empty, not a keyword, with no whitespace, `:` or `,`) and free-form
/// fields must fit on a single line; anything else is rejected with a
/// [`SinkError`], as is any failure to write.
#[derive(Debug)]
pub struct TpsWriter<W> {
    output: W,
    preamble_written: bool,
    program: Option<String>,
    case: Option<String>,
}

impl<W: Write> TpsWriter<W> {
    /// Creates a new writer.
    pub fn new(output: W) -> Self {
        Self {
            output,
            preamble_written: false,
            program: None,
            case: None,
        }
    }

    /// Consumes `self`, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.output
    }

    fn record(&mut self, args: fmt::Arguments<'_>) -> Result<(), SinkError> {
        if !self.preamble_written {
            write!(
                self.output,
                "Content-Type: {TPS_CONTENT_TYPE}; version=\"{TPS_VERSION}\"\n\n"
            )?;
            self.preamble_written = true;
        }
        self.output.write_fmt(args)?;
        Ok(())
    }

    fn write_output(&mut self, keyword: &str, line: &str) -> Result<(), SinkError> {
        if line.is_empty() {
            self.record(format_args!("{keyword}:\n"))
        } else {
            self.record(format_args!("{keyword}: {line}\n"))
        }
    }
}

impl<W: Write> EventSink for TpsWriter<W> {
    fn info(&mut self, name: &str, value: &str) -> Result<(), SinkError> {
        check_name("info property", name)?;
        check_single_line("info value", value)?;
        self.record(format_args!("info: {name}, {value}\n"))
    }

    fn program_count(&mut self, count: usize) -> Result<(), SinkError> {
        self.record(format_args!("tps-count: {count}\n"))
    }

    fn program_start(&mut self, name: &str, case_count: usize) -> Result<(), SinkError> {
        check_name("test program", name)?;
        if let Some(open) = &self.program {
            return Err(SinkError::new(format!(
                "test program `{name}` started while `{open}` is still open"
            )));
        }
        self.record(format_args!("tp-start: {name}, {case_count}\n"))?;
        self.program = Some(name.to_owned());
        Ok(())
    }

    fn program_end(&mut self, reason: &str) -> Result<(), SinkError> {
        check_single_line("test program failure reason", reason)?;
        let name = self
            .program
            .take()
            .ok_or_else(|| SinkError::new("test program ended without being started"))?;
        if reason.trim().is_empty() {
            self.record(format_args!("tp-end: {name}\n"))
        } else {
            self.record(format_args!("tp-end: {name}, {reason}\n"))
        }
    }

    fn case_start(&mut self, name: &str) -> Result<(), SinkError> {
        check_name("test case", name)?;
        if self.program.is_none() {
            return Err(SinkError::new(format!(
                "test case `{name}` started outside of a test program"
            )));
        }
        self.record(format_args!("tc-start: {name}\n"))?;
        self.case = Some(name.to_owned());
        Ok(())
    }

    fn case_stdout_line(&mut self, line: &str) -> Result<(), SinkError> {
        check_single_line("captured stdout line", line)?;
        self.write_output("tc-so", line)
    }

    fn case_stderr_line(&mut self, line: &str) -> Result<(), SinkError> {
        check_single_line("captured stderr line", line)?;
        self.write_output("tc-se", line)
    }

    fn case_end(&mut self, result: &TestCaseResult) -> Result<(), SinkError> {
        if let Some(reason) = result.reason() {
            check_single_line("test case reason", reason.as_str())?;
        }
        let name = self
            .case
            .take()
            .ok_or_else(|| SinkError::new("test case ended without being started"))?;
        self.record(format_args!("tc-end: {name}, {result}\n"))
    }

    fn end_of_stream(&mut self) -> Result<(), SinkError> {
        self.output.flush()?;
        Ok(())
    }
}

fn check_name(what: &str, name: &str) -> Result<(), SinkError> {
    if name.is_empty() || name.contains(|c: char| c.is_whitespace() || c == ':' || c == ',') {
        return Err(SinkError::new(format!("invalid {what} name `{name}`")));
    }
    if TokenKind::from_keyword(name).is_some() {
        return Err(SinkError::new(format!(
            "{what} name `{name}` is a reserved keyword"
        )));
    }
    Ok(())
}

fn check_single_line(what: &str, text: &str) -> Result<(), SinkError> {
    if text.contains(['\n', '\r']) {
        return Err(SinkError::new(format!("{what} spans multiple lines")));
    }
    Ok(())
}
