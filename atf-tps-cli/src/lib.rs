// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Summarize atf-tps test reports and convert them to JUnit XML.
//!
//! This crate provides the `atf-tps` binary. The reading itself is done by
//! the [`atf_tps`] library; this crate adds configuration, logging and the
//! output formats.

#![warn(missing_docs)]

mod config;
mod dispatch;
mod errors;
mod exit_codes;
mod junit;
mod output;
mod summary;

pub use config::{
    ConfigParseError, ConfigParseErrorKind, ConfigWarnings, DefaultConfigWarnings, JunitConfig,
    ReportConfig, TpsConfig,
};
#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
pub use exit_codes::TpsExitCode;
#[doc(hidden)]
pub use output::OutputWriter;
