// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The atf-tps grammar and its error recovery.
//!
//! Parsing is a push parse: nothing is accumulated, and every construct is
//! handed to an [`EventSink`] as soon as it has been recognized.
//!
//! Every grammar function returns `Err` on the first structural problem it
//! runs into. The loops over test programs and test cases catch these errors,
//! record them, skip to the end of the current line and try again at the same
//! position. Recovery only ever discards input, so parsing always makes
//! progress.

use crate::{
    errors::{EntityKind, ParseError, PreambleError, ReasonContext, SinkError},
    header::read_tps_preamble,
    lexer::Lexer,
    result::{Reason, TestCaseResult},
    sink::EventSink,
    token::{Token, TokenKind},
};
use std::{io::BufRead, slice};
use tracing::{debug, trace};

type PResult<T> = Result<T, ParseError>;

/// Tokens that end the test program loop. A stray `info` record while
/// programs are still expected is discarded as one error.
const PROGRAM_LOOP_STOP: &[TokenKind] = &[TokenKind::Eof];

/// Tokens that end the test case loop inside a test program.
const CASE_LOOP_STOP: &[TokenKind] = &[
    TokenKind::Eof,
    TokenKind::Info,
    TokenKind::TpsCount,
    TokenKind::TpStart,
    TokenKind::TpEnd,
];

/// Records that are left unread if they show up inside a test case, so that
/// an enclosing loop can pick them up.
const CASE_BODY_RESYNC: &[TokenKind] = &[
    TokenKind::Eof,
    TokenKind::TcStart,
    TokenKind::TpStart,
    TokenKind::TpEnd,
];

/// Records that are left unread if they show up where `tp-end` was expected.
const PROGRAM_END_RESYNC: &[TokenKind] = &[TokenKind::Eof, TokenKind::TpStart];

/// Controls whether events are delivered after a structural error.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum EventPolicy {
    /// Keep delivering events for every construct that parses, even after
    /// errors elsewhere in the stream.
    #[default]
    Always,

    /// Stop delivering events once any error has been recorded. Parsing still
    /// continues so that every diagnostic is collected.
    UntilFirstError,
}

/// Options for a [`TpsReader`].
#[derive(Clone, Debug, Default)]
pub struct ReaderOptions {
    event_policy: EventPolicy,
}

impl ReaderOptions {
    /// Creates a new set of options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the event policy.
    pub fn set_event_policy(&mut self, event_policy: EventPolicy) -> &mut Self {
        self.event_policy = event_policy;
        self
    }

    /// Returns the event policy.
    pub fn event_policy(&self) -> EventPolicy {
        self.event_policy
    }
}

/// The recoverable errors recorded while reading a stream, in the order they
/// were found.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<ParseError>,
}

impl Diagnostics {
    /// Returns true if the stream was read without any errors.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns the errors as a slice.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Iterates over the errors.
    pub fn iter(&self) -> slice::Iter<'_, ParseError> {
        self.errors.iter()
    }

    /// Consumes `self`, returning the errors.
    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a ParseError;
    type IntoIter = slice::Iter<'a, ParseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

/// Reads an atf-tps stream and reports what it finds to an [`EventSink`].
#[derive(Debug)]
pub struct TpsReader<R> {
    input: R,
    options: ReaderOptions,
}

impl<R: BufRead> TpsReader<R> {
    /// Creates a new reader with default options.
    pub fn new(input: R) -> Self {
        Self::with_options(input, ReaderOptions::default())
    }

    /// Creates a new reader with the given options.
    pub fn with_options(input: R, options: ReaderOptions) -> Self {
        Self { input, options }
    }

    /// Reads the whole stream, delivering events to `sink`.
    ///
    /// A bad preamble is fatal and reported as `Err`. Everything after the
    /// preamble is read on a best-effort basis: problems are collected in the
    /// returned [`Diagnostics`] and never abort the read.
    pub fn read<S: EventSink + ?Sized>(self, sink: &mut S) -> Result<Diagnostics, PreambleError> {
        let Self { mut input, options } = self;

        let (body_line, headers) = read_tps_preamble(&mut input)?;
        debug!(
            body_line,
            header_count = headers.len(),
            "read atf-tps preamble"
        );

        let mut parser = Parser::new(Lexer::new(input, body_line), options.event_policy);
        if let Err(error) = parser.read_report(sink) {
            parser.recover(error);
        }

        debug!(errors = parser.errors.len(), "finished reading atf-tps stream");
        Ok(Diagnostics {
            errors: parser.errors,
        })
    }
}

#[derive(Copy, Clone, Debug)]
enum OutputOrigin {
    Stdout,
    Stderr,
}

struct Parser<R> {
    lexer: Lexer<R>,
    peeked: Option<Token>,
    last_kind: TokenKind,
    last_line: usize,
    errors: Vec<ParseError>,
    event_policy: EventPolicy,
}

impl<R: BufRead> Parser<R> {
    fn new(lexer: Lexer<R>, event_policy: EventPolicy) -> Self {
        let last_line = lexer.line();
        Self {
            lexer,
            peeked: None,
            // The preamble ends on a line boundary.
            last_kind: TokenKind::Newline,
            last_line,
            errors: Vec::new(),
            event_policy,
        }
    }

    // ---
    // Grammar
    // ---

    fn read_report<S: EventSink + ?Sized>(&mut self, sink: &mut S) -> PResult<()> {
        loop {
            let token = self.expect(
                &[TokenKind::TpsCount, TokenKind::Info],
                "tps-count or info field",
            )?;
            if token.kind == TokenKind::TpsCount {
                break;
            }
            self.read_info(sink)?;
        }

        self.expect(&[TokenKind::Colon], "`:`")?;
        let count = self.expect_count(EntityKind::TestProgram)?;
        self.notify(sink, |sink| sink.program_count(count))?;
        self.expect(&[TokenKind::Newline], "new line")?;

        self.read_entities(
            sink,
            EntityKind::TestProgram,
            count,
            PROGRAM_LOOP_STOP,
            Self::read_program,
        );

        loop {
            let token = self.expect(
                &[TokenKind::Eof, TokenKind::Info],
                "end of stream or info field",
            )?;
            if token.kind == TokenKind::Eof {
                break;
            }
            self.read_info(sink)?;
        }

        self.notify(sink, |sink| sink.end_of_stream())
    }

    // Called with the `info` keyword already consumed.
    fn read_info<S: EventSink + ?Sized>(&mut self, sink: &mut S) -> PResult<()> {
        self.expect(&[TokenKind::Colon], "`:`")?;
        let name = self.expect(&[TokenKind::Text], "info property name")?;
        self.expect(&[TokenKind::Comma], "`,`")?;
        let value = self.rest_of_line();
        self.notify(sink, |sink| sink.info(&name.text, value.trim()))?;
        self.expect(&[TokenKind::Newline], "new line")?;
        Ok(())
    }

    fn read_program<S: EventSink + ?Sized>(&mut self, sink: &mut S) -> PResult<()> {
        self.expect(&[TokenKind::TpStart], "start of test program")?;
        self.expect(&[TokenKind::Colon], "`:`")?;
        let name = self.expect(&[TokenKind::Text], "test program name")?.text;
        self.expect(&[TokenKind::Comma], "`,`")?;
        let case_count = self.expect_count(EntityKind::TestCase)?;
        self.expect(&[TokenKind::Newline], "new line")?;
        self.notify(sink, |sink| sink.program_start(&name, case_count))?;

        self.read_entities(
            sink,
            EntityKind::TestCase,
            case_count,
            CASE_LOOP_STOP,
            Self::read_case,
        );

        self.expect_record(
            &[TokenKind::TpEnd],
            PROGRAM_END_RESYNC,
            "end of test program",
        )?;
        self.expect(&[TokenKind::Colon], "`:`")?;
        let closing = self.expect(&[TokenKind::Text], "test program name")?;
        if closing.text != name {
            return Err(ParseError::NameMismatch {
                line: closing.line,
                kind: EntityKind::TestProgram,
                opening: name,
                closing: closing.text,
            });
        }

        let token = self.expect(&[TokenKind::Newline, TokenKind::Comma], "new line or `,`")?;
        let reason = if token.kind == TokenKind::Comma {
            let reason = self.rest_as_reason(token.line, ReasonContext::FailedProgram)?;
            self.expect(&[TokenKind::Newline], "new line")?;
            reason.to_string()
        } else {
            String::new()
        };

        self.notify(sink, |sink| sink.program_end(&reason))
    }

    fn read_case<S: EventSink + ?Sized>(&mut self, sink: &mut S) -> PResult<()> {
        self.expect(&[TokenKind::TcStart], "start of test case")?;
        self.expect(&[TokenKind::Colon], "`:`")?;
        let name = self.expect(&[TokenKind::Text], "test case name")?.text;
        // The case is announced before its header line is known to be complete.
        self.notify(sink, |sink| sink.case_start(&name))?;
        self.expect(&[TokenKind::Newline], "new line")?;

        loop {
            let token = self.expect_record(
                &[TokenKind::TcEnd, TokenKind::TcSo, TokenKind::TcSe],
                CASE_BODY_RESYNC,
                "end of test case or test case's stdout/stderr line",
            )?;
            let origin = match token.kind {
                TokenKind::TcSo => OutputOrigin::Stdout,
                TokenKind::TcSe => OutputOrigin::Stderr,
                _ => break,
            };

            self.expect(&[TokenKind::Colon], "`:`")?;
            let line = self.rest_of_line();
            // The space after the colon separates the keyword from the line.
            let line = line.strip_prefix(' ').unwrap_or(&line);
            match origin {
                OutputOrigin::Stdout => self.notify(sink, |sink| sink.case_stdout_line(line))?,
                OutputOrigin::Stderr => self.notify(sink, |sink| sink.case_stderr_line(line))?,
            }
            self.expect(&[TokenKind::Newline], "new line")?;
        }

        self.expect(&[TokenKind::Colon], "`:`")?;
        let closing = self.expect(&[TokenKind::Text], "test case name")?;
        if closing.text != name {
            return Err(ParseError::NameMismatch {
                line: closing.line,
                kind: EntityKind::TestCase,
                opening: name,
                closing: closing.text,
            });
        }
        self.expect(&[TokenKind::Comma], "`,`")?;

        let verdict = self.expect(
            &[TokenKind::Passed, TokenKind::Failed, TokenKind::Skipped],
            "passed, failed or skipped",
        )?;
        let result = match verdict.kind {
            TokenKind::Failed => {
                let comma = self.expect(&[TokenKind::Comma], "`,`")?;
                TestCaseResult::Failed(self.rest_as_reason(comma.line, ReasonContext::FailedCase)?)
            }
            TokenKind::Skipped => {
                let comma = self.expect(&[TokenKind::Comma], "`,`")?;
                TestCaseResult::Skipped(
                    self.rest_as_reason(comma.line, ReasonContext::SkippedCase)?,
                )
            }
            _ => TestCaseResult::Passed,
        };

        self.notify(sink, |sink| sink.case_end(&result))?;
        self.expect(&[TokenKind::Newline], "new line")?;
        Ok(())
    }

    /// Attempts to read `count` entities with `read_one`, recovering from
    /// errors in between.
    ///
    /// A failed attempt does not count towards `count`. The loop stops early
    /// if the next token is in `stop`; a shortfall is recorded unless an error
    /// was already recorded by this loop.
    fn read_entities<S: EventSink + ?Sized>(
        &mut self,
        sink: &mut S,
        kind: EntityKind,
        count: usize,
        stop: &[TokenKind],
        read_one: fn(&mut Self, &mut S) -> PResult<()>,
    ) {
        let mut found = 0;
        let mut recovered = false;

        while found < count {
            let next = self.peek().clone();
            if !self.good() || stop.contains(&next.kind) {
                debug!(%kind, expected = count, found, stopped_at = ?next.kind, "stopping early");
                if !recovered {
                    self.errors.push(ParseError::CountShortfall {
                        line: next.line,
                        kind,
                        expected: count,
                        found,
                    });
                }
                return;
            }

            match read_one(self, sink) {
                Ok(()) => found += 1,
                Err(error) => {
                    recovered = true;
                    self.recover(error);
                }
            }
        }
    }

    // ---
    // Recovery
    // ---

    /// Records `error` and skips to the start of the next record.
    fn recover(&mut self, error: ParseError) {
        debug!(line = error.line(), %error, "recovering from structural error");
        self.errors.push(error);
        self.skip_to_line_end();
    }

    /// Discards tokens up to and including the next newline. Does nothing if
    /// the last token consumed was already a newline, or the end of the
    /// stream.
    fn skip_to_line_end(&mut self) {
        while !matches!(self.last_kind, TokenKind::Newline | TokenKind::Eof) {
            self.next();
        }
    }

    // ---
    // Token-level helpers
    // ---

    fn good(&self) -> bool {
        !self.lexer.is_exhausted()
    }

    fn peek(&mut self) -> &Token {
        let Self {
            lexer,
            peeked,
            errors,
            ..
        } = self;
        peeked.get_or_insert_with(|| pull(lexer, errors))
    }

    fn next(&mut self) -> Token {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => pull(&mut self.lexer, &mut self.errors),
        };
        trace!(kind = ?token.kind, line = token.line, text = %token.text, "token");
        self.last_kind = token.kind;
        self.last_line = token.line;
        token
    }

    fn rest_of_line(&mut self) -> String {
        debug_assert!(
            self.peeked.is_none(),
            "rest_of_line is only called right after a delimiter"
        );
        self.lexer.rest_of_line()
    }

    fn rest_as_reason(&mut self, line: usize, context: ReasonContext) -> PResult<Reason> {
        let text = self.rest_of_line();
        Reason::new(&text).ok_or(ParseError::EmptyReason { line, context })
    }

    /// Consumes the next token, failing if it is not one of `accepted`.
    fn expect(&mut self, accepted: &[TokenKind], expected: &'static str) -> PResult<Token> {
        let token = self.next();
        if accepted.contains(&token.kind) {
            Ok(token)
        } else {
            Err(unexpected(&token, expected))
        }
    }

    /// Like `expect`, but for the first token of a record: if the token is not
    /// acceptable but is in `resync`, it is left unread for an enclosing loop.
    fn expect_record(
        &mut self,
        accepted: &[TokenKind],
        resync: &[TokenKind],
        expected: &'static str,
    ) -> PResult<Token> {
        let kind = self.peek().kind;
        if accepted.contains(&kind) {
            return Ok(self.next());
        }
        if resync.contains(&kind) {
            return Err(unexpected(self.peek(), expected));
        }
        let token = self.next();
        Err(unexpected(&token, expected))
    }

    fn expect_count(&mut self, kind: EntityKind) -> PResult<usize> {
        let expected = match kind {
            EntityKind::TestProgram => "number of test programs",
            EntityKind::TestCase => "number of test cases",
        };
        let token = self.expect(&[TokenKind::Text], expected)?;
        token.text.parse().map_err(|_| ParseError::InvalidCount {
            line: token.line,
            kind,
            text: token.text.clone(),
        })
    }

    /// Delivers an event, folding a sink error into a structural error.
    fn notify<S: EventSink + ?Sized>(
        &mut self,
        sink: &mut S,
        event: impl FnOnce(&mut S) -> Result<(), SinkError>,
    ) -> PResult<()> {
        if self.event_policy == EventPolicy::UntilFirstError && !self.errors.is_empty() {
            return Ok(());
        }
        event(sink).map_err(|error| ParseError::Sink {
            line: self.last_line,
            error,
        })
    }
}

/// Reads the next token, recording a read error if it ended the stream.
fn pull<R: BufRead>(lexer: &mut Lexer<R>, errors: &mut Vec<ParseError>) -> Token {
    let token = lexer.next_token();
    if token.kind == TokenKind::Eof
        && let Some(error) = lexer.take_read_error()
    {
        errors.push(ParseError::Read {
            line: token.line,
            error,
        });
    }
    token
}

fn unexpected(token: &Token, expected: &'static str) -> ParseError {
    ParseError::UnexpectedToken {
        line: token.line,
        found: token.describe(),
        found_kind: token.kind,
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::EventRecorder;

    fn parser(body: &str) -> Parser<&[u8]> {
        Parser::new(Lexer::new(body.as_bytes(), 3), EventPolicy::Always)
    }

    #[test]
    fn skip_to_line_end_is_idempotent() {
        let mut parser = parser("tc-so: a b c\ntc-end: t1, passed\n");
        assert_eq!(parser.next().kind, TokenKind::TcSo);
        parser.skip_to_line_end();
        assert_eq!(parser.last_kind, TokenKind::Newline);

        parser.skip_to_line_end();
        parser.skip_to_line_end();
        assert_eq!(parser.next().kind, TokenKind::TcEnd);
    }

    #[test]
    fn skip_to_line_end_stops_at_eof() {
        let mut parser = parser("tc-so: no newline");
        assert_eq!(parser.next().kind, TokenKind::TcSo);
        parser.skip_to_line_end();
        assert_eq!(parser.last_kind, TokenKind::Eof);
        assert!(!parser.good());
    }

    #[test]
    fn expect_record_leaves_resync_tokens_unread() {
        let mut parser = parser("tp-end: p1\n");
        let error = parser
            .expect_record(&[TokenKind::TcEnd], CASE_BODY_RESYNC, "end of test case")
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "line 3: unexpected `tp-end`; expected end of test case"
        );
        assert_eq!(parser.last_kind, TokenKind::Newline, "nothing was consumed");
        assert_eq!(parser.next().kind, TokenKind::TpEnd);
    }

    #[test]
    fn expect_record_consumes_junk() {
        let mut parser = parser("garbage\n");
        parser
            .expect_record(&[TokenKind::TcEnd], CASE_BODY_RESYNC, "end of test case")
            .unwrap_err();
        assert_eq!(parser.last_kind, TokenKind::Text);
        parser.skip_to_line_end();
        assert_eq!(parser.next().kind, TokenKind::Eof);
    }

    #[test]
    fn until_first_error_suppresses_events() {
        let mut parser = Parser::new(
            Lexer::new("".as_bytes(), 3),
            EventPolicy::UntilFirstError,
        );
        let mut recorder = EventRecorder::new();

        parser
            .notify(&mut recorder, |sink| sink.program_count(1))
            .unwrap();
        parser.recover(ParseError::CountShortfall {
            line: 3,
            kind: EntityKind::TestProgram,
            expected: 1,
            found: 0,
        });
        parser
            .notify(&mut recorder, |sink| sink.end_of_stream())
            .unwrap();

        assert_eq!(recorder.events().len(), 1);
    }
}
