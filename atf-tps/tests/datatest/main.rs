// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data-driven tests.
//!
//! Every `tests/fixtures/*.tps` stream is read with an event recorder, and the
//! resulting transcript is compared against the sibling `.events` file.

mod transcript;

datatest_stable::harness! {
    {
        test = transcript::check_transcript,
        root = "tests/fixtures",
        pattern = r"^.*\.tps$",
    },
}
