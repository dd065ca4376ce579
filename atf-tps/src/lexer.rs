// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tokenizer for the body of an atf-tps stream.
//!
//! The lexer works on bytes: every delimiter in the protocol is ASCII, and text
//! is decoded (lossily) only once a token is complete.

use crate::token::{Token, TokenKind};
use std::io::{self, BufRead};

/// Converts a buffered byte stream into [`Token`]s, one call at a time.
///
/// The lexer never fails: once the input is exhausted, or reading from it
/// produces an error, every further call returns an end-of-stream token. A read
/// error is retained and can be retrieved with [`Lexer::take_read_error`].
#[derive(Debug)]
pub struct Lexer<R> {
    input: R,
    line: usize,
    // A delimiter or newline that terminated the previous text token.
    pending: Option<Token>,
    exhausted: bool,
    failed: bool,
    read_error: Option<io::Error>,
}

impl<R: BufRead> Lexer<R> {
    /// Creates a new lexer. `first_line` is the line number of the first byte
    /// `input` will produce.
    pub fn new(input: R, first_line: usize) -> Self {
        Self {
            input,
            line: first_line,
            pending: None,
            exhausted: false,
            failed: false,
            read_error: None,
        }
    }

    /// Returns the line the lexer is currently positioned on.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Returns true once an end-of-stream token has been produced.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Returns the error that ended the stream, if reading failed.
    pub fn take_read_error(&mut self) -> Option<io::Error> {
        self.read_error.take()
    }

    /// Produces the next token.
    pub fn next_token(&mut self) -> Token {
        if let Some(token) = self.pending.take() {
            return self.finish(token);
        }

        let line = self.line;
        let mut text = Vec::new();
        let token = loop {
            let Some(byte) = self.peek_byte() else {
                if text.is_empty() {
                    break Token::new(TokenKind::Eof, "", line);
                }
                break text_token(&text, line);
            };
            self.bump();

            let delimiter = match byte {
                b':' => Token::new(TokenKind::Colon, ":", line),
                b',' => Token::new(TokenKind::Comma, ",", line),
                b'\n' => Token::new(TokenKind::Newline, "", line),
                b' ' | b'\t' | b'\r' => {
                    if text.is_empty() {
                        continue;
                    }
                    break text_token(&text, line);
                }
                _ => {
                    text.push(byte);
                    continue;
                }
            };

            if text.is_empty() {
                break delimiter;
            }
            self.pending = Some(delimiter);
            break text_token(&text, line);
        };

        self.finish(token)
    }

    /// Returns everything up to, but not including, the next newline.
    ///
    /// This is used for free-form fields (reasons, info values and captured
    /// output) which may themselves contain delimiters. A trailing carriage
    /// return is dropped.
    pub fn rest_of_line(&mut self) -> String {
        let mut bytes = Vec::new();
        match self.pending.take() {
            Some(token) if token.kind == TokenKind::Newline => {
                self.pending = Some(token);
                return String::new();
            }
            Some(token) => bytes.extend_from_slice(token.text.as_bytes()),
            None => {}
        }

        while let Some(byte) = self.peek_byte() {
            if byte == b'\n' {
                break;
            }
            self.bump();
            bytes.push(byte);
        }
        if bytes.last() == Some(&b'\r') {
            bytes.pop();
        }

        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn finish(&mut self, token: Token) -> Token {
        match token.kind {
            TokenKind::Newline => self.line += 1,
            TokenKind::Eof => self.exhausted = true,
            _ => {}
        }
        token
    }

    fn peek_byte(&mut self) -> Option<u8> {
        if self.failed {
            return None;
        }
        loop {
            match self.input.fill_buf() {
                Ok(buf) => return buf.first().copied(),
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => {
                    self.failed = true;
                    self.read_error = Some(error);
                    return None;
                }
            }
        }
    }

    fn bump(&mut self) {
        self.input.consume(1);
    }
}

fn text_token(bytes: &[u8], line: usize) -> Token {
    let text = String::from_utf8_lossy(bytes).into_owned();
    let kind = TokenKind::from_keyword(&text).unwrap_or(TokenKind::Text);
    Token::new(kind, text, line)
}
