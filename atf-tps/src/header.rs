// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reading and validating the MIME-like header block at the start of a
//! stream.
//!
//! A header block is a sequence of lines of the form
//! `Name: value[; attr=value]*`, terminated by a blank line. Attribute values
//! may be double-quoted.

use crate::errors::PreambleError;
use indexmap::IndexMap;
use std::io::BufRead;

/// The content type that identifies an atf-tps stream.
pub const TPS_CONTENT_TYPE: &str = "application/X-atf-tps";

/// The version of the atf-tps format understood by this crate.
pub const TPS_VERSION: u32 = 2;

/// A single header line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderEntry {
    name: String,
    value: String,
    attributes: IndexMap<String, String>,
}

impl HeaderEntry {
    /// Returns the name of this header, as written.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the value of this header, without attributes.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the value of an attribute, with any quotes removed.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Iterates over the attributes in the order they were written.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

/// The headers read from a header block.
///
/// Header names are matched case-insensitively. If a header is repeated, the
/// last occurrence wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers {
    entries: IndexMap<String, HeaderEntry>,
}

impl Headers {
    /// Looks up a header by name.
    pub fn get(&self, name: &str) -> Option<&HeaderEntry> {
        self.entries.get(&name.to_ascii_lowercase())
    }

    /// Returns the number of distinct headers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the header block was empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the headers in the order they were first written.
    pub fn iter(&self) -> impl Iterator<Item = &HeaderEntry> {
        self.entries.values()
    }

    fn insert(&mut self, entry: HeaderEntry) {
        self.entries.insert(entry.name.to_ascii_lowercase(), entry);
    }
}

/// Reads a header block from `input`.
///
/// `first_line` is the line number of the first header line. On success,
/// returns the line number on which the body starts along with the headers.
pub fn read_headers<R: BufRead + ?Sized>(
    input: &mut R,
    first_line: usize,
) -> Result<(usize, Headers), PreambleError> {
    let mut headers = Headers::default();
    let mut line = first_line;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        input
            .read_until(b'\n', &mut buf)
            .map_err(PreambleError::Read)?;
        if buf.pop() != Some(b'\n') {
            return Err(PreambleError::UnexpectedEof { line });
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }

        if buf.is_empty() {
            return Ok((line + 1, headers));
        }

        let text = String::from_utf8_lossy(&buf);
        headers.insert(parse_header(&text, line)?);
        line += 1;
    }
}

/// Checks that `headers` declare the given content type and version.
pub fn validate_content_type(
    headers: &Headers,
    content_type: &str,
    version: u32,
) -> Result<(), PreambleError> {
    let entry = headers
        .get("Content-Type")
        .ok_or(PreambleError::MissingContentType)?;

    if entry.value() != content_type {
        return Err(PreambleError::ContentTypeMismatch {
            expected: content_type.to_owned(),
            actual: entry.value().to_owned(),
        });
    }

    let expected = version.to_string();
    match entry.attribute("version") {
        Some(actual) if actual == expected => Ok(()),
        Some(actual) => Err(PreambleError::VersionMismatch {
            expected,
            actual: actual.to_owned(),
        }),
        None => Err(PreambleError::MissingVersion),
    }
}

/// Reads the header block at the very start of an atf-tps stream and checks
/// that it declares the supported content type and version.
pub fn read_tps_preamble<R: BufRead + ?Sized>(
    input: &mut R,
) -> Result<(usize, Headers), PreambleError> {
    let (body_line, headers) = read_headers(input, 1)?;
    validate_content_type(&headers, TPS_CONTENT_TYPE, TPS_VERSION)?;
    Ok((body_line, headers))
}

fn parse_header(text: &str, line: usize) -> Result<HeaderEntry, PreambleError> {
    let malformed = |message: &str| PreambleError::Malformed {
        line,
        message: message.to_owned(),
    };

    let (name, rest) = text
        .split_once(':')
        .ok_or_else(|| malformed("expected `name: value`"))?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(malformed("invalid header name"));
    }

    let mut parts = split_unquoted(rest, ';').map_err(|()| malformed("unterminated quote"))?;
    // split_unquoted always returns at least one element.
    let value = parts.remove(0).trim().to_owned();
    if value.is_empty() {
        return Err(malformed("empty header value"));
    }

    let mut attributes = IndexMap::new();
    for part in parts {
        let (attr, attr_value) = part
            .split_once('=')
            .ok_or_else(|| malformed("expected `attribute=value`"))?;
        let attr = attr.trim();
        if attr.is_empty() {
            return Err(malformed("empty attribute name"));
        }
        attributes.insert(attr.to_owned(), unquote(attr_value.trim()).to_owned());
    }

    Ok(HeaderEntry {
        name: name.to_owned(),
        value,
        attributes,
    })
}

fn split_unquoted(text: &str, separator: char) -> Result<Vec<&str>, ()> {
    let mut parts = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    for (index, ch) in text.char_indices() {
        if ch == '"' {
            quoted = !quoted;
        } else if ch == separator && !quoted {
            parts.push(&text[start..index]);
            start = index + ch.len_utf8();
        }
    }
    if quoted {
        return Err(());
    }
    parts.push(&text[start..]);
    Ok(parts)
}

fn unquote(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|text| text.strip_suffix('"'))
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use test_case::test_case;

    #[test]
    fn reads_header_block() {
        let mut input = indoc! {r#"
            Content-Type: application/X-atf-tps; version="2"
            X-Extra: some value; a=1; b="x; y"

            tps-count: 0
        "#}
        .as_bytes();

        let (body_line, headers) = read_headers(&mut input, 1).unwrap();
        assert_eq!(body_line, 4);
        assert_eq!(headers.len(), 2);

        let content_type = headers.get("content-type").unwrap();
        assert_eq!(content_type.name(), "Content-Type");
        assert_eq!(content_type.value(), TPS_CONTENT_TYPE);
        assert_eq!(content_type.attribute("version"), Some("2"));

        let extra = headers.get("X-Extra").unwrap();
        assert_eq!(extra.value(), "some value");
        assert_eq!(
            extra.attributes().collect::<Vec<_>>(),
            vec![("a", "1"), ("b", "x; y")]
        );

        // The body is left unread.
        assert_eq!(input, b"tps-count: 0\n");
    }

    #[test]
    fn empty_header_block() {
        let mut input = &b"\ntps-count: 0\n"[..];
        let (body_line, headers) = read_headers(&mut input, 1).unwrap();
        assert_eq!(body_line, 2);
        assert!(headers.is_empty());
    }

    #[test]
    fn crlf_line_endings() {
        let mut input = &b"Content-Type: application/X-atf-tps; version=\"2\"\r\n\r\n"[..];
        let (body_line, headers) = read_tps_preamble(&mut input).unwrap();
        assert_eq!(body_line, 3);
        assert_eq!(headers.len(), 1);
    }

    #[test_case("Content-Type: application/X-atf-tps; version=\"2\"\n" ; "no blank line")]
    #[test_case("" ; "empty input")]
    #[test_case("Content-Type: application/X-atf-tps; version=\"2\"" ; "no newline")]
    fn unexpected_eof(input: &str) {
        let mut input = input.as_bytes();
        let error = read_headers(&mut input, 1).unwrap_err();
        assert!(
            matches!(error, PreambleError::UnexpectedEof { .. }),
            "unexpected error: {error:?}"
        );
    }

    #[test_case("no colon here", "expected `name: value`")]
    #[test_case(": value", "invalid header name")]
    #[test_case("Two Words: value", "invalid header name")]
    #[test_case("Name:   ", "empty header value")]
    #[test_case("Name: value; broken", "expected `attribute=value`")]
    #[test_case("Name: value; =1", "empty attribute name")]
    #[test_case("Name: value; a=\"open", "unterminated quote")]
    fn malformed(line: &str, expected_message: &str) {
        let input = format!("First: ok\n{line}\n\n");
        let error = read_headers(&mut input.as_bytes(), 1).unwrap_err();
        match error {
            PreambleError::Malformed { line, message } => {
                assert_eq!(line, 2);
                assert_eq!(message, expected_message);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test_case(
        "Content-Type: application/X-atf-tcs; version=\"1\"\n\n",
        "mismatched content type: expected `application/X-atf-tps` but got `application/X-atf-tcs`"
        ; "wrong content type"
    )]
    #[test_case(
        "Content-Type: application/X-atf-tps; version=\"3\"\n\n",
        "mismatched version: expected `2` but got `3`"
        ; "wrong version"
    )]
    #[test_case(
        "Content-Type: application/X-atf-tps\n\n",
        "could not determine version"
        ; "missing version"
    )]
    #[test_case(
        "X-Other: text/plain\n\n",
        "could not determine content type"
        ; "missing content type"
    )]
    fn validation_errors(input: &str, expected: &str) {
        let error = read_tps_preamble(&mut input.as_bytes()).unwrap_err();
        assert_eq!(error.to_string(), expected);
    }
}
