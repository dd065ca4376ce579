// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The consumer-facing side of the reader.

use crate::{errors::SinkError, result::TestCaseResult};

/// Receives events from a [`TpsReader`](crate::TpsReader) as constructs are
/// recognized.
///
/// Every hook has a default implementation that does nothing, so a sink only
/// needs to implement the events it cares about. Events are delivered in stream
/// order and none of the arguments outlive the call.
///
/// A hook may reject an event by returning an error. The reader records it as
/// a diagnostic against the current line and resynchronizes at the next
/// record, exactly as it would for a syntax error.
pub trait EventSink {
    /// An `info` record, either before the program count or after the last
    /// test program.
    fn info(&mut self, name: &str, value: &str) -> Result<(), SinkError> {
        let _ = (name, value);
        Ok(())
    }

    /// The `tps-count` record.
    fn program_count(&mut self, count: usize) -> Result<(), SinkError> {
        let _ = count;
        Ok(())
    }

    /// A `tp-start` record.
    fn program_start(&mut self, name: &str, case_count: usize) -> Result<(), SinkError> {
        let _ = (name, case_count);
        Ok(())
    }

    /// A `tp-end` record. `reason` is empty unless the program itself failed.
    fn program_end(&mut self, reason: &str) -> Result<(), SinkError> {
        let _ = reason;
        Ok(())
    }

    /// A `tc-start` record.
    fn case_start(&mut self, name: &str) -> Result<(), SinkError> {
        let _ = name;
        Ok(())
    }

    /// A `tc-so` record.
    fn case_stdout_line(&mut self, line: &str) -> Result<(), SinkError> {
        let _ = line;
        Ok(())
    }

    /// A `tc-se` record.
    fn case_stderr_line(&mut self, line: &str) -> Result<(), SinkError> {
        let _ = line;
        Ok(())
    }

    /// A `tc-end` record.
    fn case_end(&mut self, result: &TestCaseResult) -> Result<(), SinkError> {
        let _ = result;
        Ok(())
    }

    /// The end of the stream was reached.
    fn end_of_stream(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn info(&mut self, name: &str, value: &str) -> Result<(), SinkError> {
        (**self).info(name, value)
    }

    fn program_count(&mut self, count: usize) -> Result<(), SinkError> {
        (**self).program_count(count)
    }

    fn program_start(&mut self, name: &str, case_count: usize) -> Result<(), SinkError> {
        (**self).program_start(name, case_count)
    }

    fn program_end(&mut self, reason: &str) -> Result<(), SinkError> {
        (**self).program_end(reason)
    }

    fn case_start(&mut self, name: &str) -> Result<(), SinkError> {
        (**self).case_start(name)
    }

    fn case_stdout_line(&mut self, line: &str) -> Result<(), SinkError> {
        (**self).case_stdout_line(line)
    }

    fn case_stderr_line(&mut self, line: &str) -> Result<(), SinkError> {
        (**self).case_stderr_line(line)
    }

    fn case_end(&mut self, result: &TestCaseResult) -> Result<(), SinkError> {
        (**self).case_end(result)
    }

    fn end_of_stream(&mut self) -> Result<(), SinkError> {
        (**self).end_of_stream()
    }
}

/// Forwards every event to two sinks in turn.
///
/// If the first sink rejects an event, the second does not see it.
#[derive(Debug)]
pub struct Tee<A, B> {
    first: A,
    second: B,
}

impl<A, B> Tee<A, B> {
    /// Creates a new `Tee`.
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    /// Returns the two sinks.
    pub fn into_inner(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: EventSink, B: EventSink> EventSink for Tee<A, B> {
    fn info(&mut self, name: &str, value: &str) -> Result<(), SinkError> {
        self.first.info(name, value)?;
        self.second.info(name, value)
    }

    fn program_count(&mut self, count: usize) -> Result<(), SinkError> {
        self.first.program_count(count)?;
        self.second.program_count(count)
    }

    fn program_start(&mut self, name: &str, case_count: usize) -> Result<(), SinkError> {
        self.first.program_start(name, case_count)?;
        self.second.program_start(name, case_count)
    }

    fn program_end(&mut self, reason: &str) -> Result<(), SinkError> {
        self.first.program_end(reason)?;
        self.second.program_end(reason)
    }

    fn case_start(&mut self, name: &str) -> Result<(), SinkError> {
        self.first.case_start(name)?;
        self.second.case_start(name)
    }

    fn case_stdout_line(&mut self, line: &str) -> Result<(), SinkError> {
        self.first.case_stdout_line(line)?;
        self.second.case_stdout_line(line)
    }

    fn case_stderr_line(&mut self, line: &str) -> Result<(), SinkError> {
        self.first.case_stderr_line(line)?;
        self.second.case_stderr_line(line)
    }

    fn case_end(&mut self, result: &TestCaseResult) -> Result<(), SinkError> {
        self.first.case_end(result)?;
        self.second.case_end(result)
    }

    fn end_of_stream(&mut self) -> Result<(), SinkError> {
        self.first.end_of_stream()?;
        self.second.end_of_stream()
    }
}
