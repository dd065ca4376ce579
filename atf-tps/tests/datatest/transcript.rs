// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use atf_tps::{EventRecorder, TpsReader};
use camino::Utf8Path;
use pretty_assertions::assert_eq;
use std::fmt::Write as _;

/// Renders the outcome of reading `contents`: one line per event, then one
/// `error:` line per diagnostic.
fn render(contents: &str) -> String {
    let mut recorder = EventRecorder::new();
    let mut out = String::new();

    match TpsReader::new(contents.as_bytes()).read(&mut recorder) {
        Ok(diagnostics) => {
            for event in recorder.events() {
                writeln!(out, "{event}").expect("writing to a String is infallible");
            }
            for error in &diagnostics {
                writeln!(out, "error: {error}").expect("writing to a String is infallible");
            }
        }
        Err(error) => {
            assert!(
                recorder.events().is_empty(),
                "no events are delivered if the preamble is invalid"
            );
            writeln!(out, "preamble error: {error}").expect("writing to a String is infallible");
        }
    }

    out
}

pub(crate) fn check_transcript(path: &Utf8Path, contents: String) -> datatest_stable::Result<()> {
    let expected_path = path.with_extension("events");
    let expected = std::fs::read_to_string(&expected_path)
        .map_err(|error| format!("failed to read {expected_path}: {error}"))?;

    assert_eq!(
        render(&contents),
        expected,
        "transcript for {path} matches {expected_path}"
    );
    Ok(())
}
