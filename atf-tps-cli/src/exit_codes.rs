// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `atf-tps` failures.
///
/// `atf-tps` runs might fail for a variety of reasons. This enum documents the
/// exit codes it can return, so that scripts can tell them apart.
pub enum TpsExitCode {}

impl TpsExitCode {
    /// The report was read and nothing went wrong.
    pub const OK: i32 = 0;

    /// An error was encountered while setting up `atf-tps`, for example while
    /// loading configuration or opening the input.
    pub const SETUP_ERROR: i32 = 96;

    /// The report was read cleanly, but one or more test programs or test
    /// cases failed.
    pub const TEST_RUN_FAILED: i32 = 100;

    /// Problems were found while parsing the body of the report, and
    /// `fail-on-diagnostics` is enabled.
    pub const PARSE_DIAGNOSTICS: i32 = 101;

    /// The input did not start with a valid atf-tps header block.
    pub const PREAMBLE_ERROR: i32 = 102;

    /// Writing output failed.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
