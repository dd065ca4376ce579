// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! An error-tolerant, streaming reader for the atf-tps test report protocol.
//!
//! atf-tps is the line-oriented format produced when running ATF test
//! programs. A stream starts with a header block declaring
//! `Content-Type: application/X-atf-tps; version="2"`, followed by a body
//! such as:
//!
//! ```text
//! tps-count: 1
//! tp-start: p1, 1
//! tc-start: t1
//! tc-so: hello
//! tc-end: t1, passed
//! tp-end: p1
//! ```
//!
//! [`TpsReader`] turns a stream into calls on an [`EventSink`]. Structural
//! problems in the body are recorded in the returned [`Diagnostics`] rather
//! than aborting the read, so one corrupt record does not hide the rest of
//! the report.
//!
//! # Examples
//!
//! ```
//! use atf_tps::{EventRecorder, TpsEvent, TpsReader};
//!
//! let input = "Content-Type: application/X-atf-tps; version=\"2\"\n\n\
//!              tps-count: 1\n\
//!              tp-start: p1, 1\n\
//!              tc-start: t1\n\
//!              tc-so: hello\n\
//!              tc-end: t1, passed\n\
//!              tp-end: p1\n";
//!
//! let mut recorder = EventRecorder::new();
//! let diagnostics = TpsReader::new(input.as_bytes()).read(&mut recorder)?;
//!
//! assert!(diagnostics.is_empty());
//! assert_eq!(
//!     recorder.events()[3],
//!     TpsEvent::CaseStdoutLine { line: "hello".to_owned() },
//! );
//! # Ok::<(), atf_tps::errors::PreambleError>(())
//! ```

pub mod errors;
pub mod header;
pub mod lexer;
mod reader;
mod recorder;
mod result;
mod sink;
mod tally;
pub mod token;
mod writer;

pub use reader::*;
pub use recorder::*;
pub use result::*;
pub use sink::*;
pub use tally::*;
pub use writer::*;
