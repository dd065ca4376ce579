// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lexical categories of the atf-tps protocol.

use std::fmt;

/// The kind of a [`Token`].
///
/// Keywords are recognized from text tokens whose entire contents match one of
/// the protocol's reserved words.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// The input is exhausted, or could not be read any further.
    Eof,
    /// A line terminator. Records are one per line.
    Newline,
    /// Free text between delimiters.
    Text,
    /// The `:` delimiter.
    Colon,
    /// The `,` delimiter.
    Comma,
    /// `tps-count`
    TpsCount,
    /// `tp-start`
    TpStart,
    /// `tp-end`
    TpEnd,
    /// `tc-start`
    TcStart,
    /// `tc-so`
    TcSo,
    /// `tc-se`
    TcSe,
    /// `tc-end`
    TcEnd,
    /// `passed`
    Passed,
    /// `failed`
    Failed,
    /// `skipped`
    Skipped,
    /// `info`
    Info,
}

impl TokenKind {
    const KEYWORDS: &'static [(&'static str, TokenKind)] = &[
        ("tps-count", TokenKind::TpsCount),
        ("tp-start", TokenKind::TpStart),
        ("tp-end", TokenKind::TpEnd),
        ("tc-start", TokenKind::TcStart),
        ("tc-so", TokenKind::TcSo),
        ("tc-se", TokenKind::TcSe),
        ("tc-end", TokenKind::TcEnd),
        ("passed", TokenKind::Passed),
        ("failed", TokenKind::Failed),
        ("skipped", TokenKind::Skipped),
        ("info", TokenKind::Info),
    ];

    /// Returns the keyword kind for `text`, if `text` is a reserved word.
    pub fn from_keyword(text: &str) -> Option<Self> {
        Self::KEYWORDS
            .iter()
            .find_map(|&(keyword, kind)| (keyword == text).then_some(kind))
    }

    /// Returns the reserved word for this kind, if it is a keyword.
    pub fn keyword(self) -> Option<&'static str> {
        Self::KEYWORDS
            .iter()
            .find_map(|&(keyword, kind)| (kind == self).then_some(keyword))
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eof => write!(f, "end of stream"),
            Self::Newline => write!(f, "new line"),
            Self::Text => write!(f, "text"),
            Self::Colon => write!(f, "`:`"),
            Self::Comma => write!(f, "`,`"),
            other => {
                // Every remaining kind is a keyword.
                let keyword = other.keyword().unwrap_or("<unknown>");
                write!(f, "`{keyword}`")
            }
        }
    }
}

/// A single token produced by the [`Lexer`](crate::lexer::Lexer).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// The category of this token.
    pub kind: TokenKind,

    /// The text this token was built from. Empty for end-of-stream and newline
    /// tokens.
    pub text: String,

    /// The 1-based line on which this token started.
    pub line: usize,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
        }
    }

    /// Describes this token for use in diagnostics.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Text => format!("`{}`", self.text),
            kind => kind.to_string(),
        }
    }
}
