// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::SummaryStyles;
use atf_tps::{CaseCounts, ProgramTally, TallySink};
use owo_colors::OwoColorize;
use swrite::{SWrite, swrite};

/// Renders a human-readable summary of a tally: one line per test program,
/// followed by totals.
pub(crate) fn summary_str(tally: &TallySink, styles: &SummaryStyles) -> String {
    let mut out = String::new();

    for program in tally.programs() {
        write_program_line(&mut out, program, styles);
    }

    let program_count = tally.programs().len();
    swrite!(
        out,
        "{}: {} {} run: ",
        "Summary".style(styles.count),
        program_count.style(styles.count),
        plural(program_count, "program", "programs"),
    );
    write_counts(&mut out, &tally.cases(), styles);

    let failed_programs = tally.failed_programs();
    if failed_programs > 0 {
        swrite!(
            out,
            "; {} {} failed",
            failed_programs.style(styles.fail),
            plural(failed_programs, "program", "programs"),
        );
    }
    if let Some(declared) = tally.declared_programs()
        && declared != program_count
    {
        swrite!(out, " ({declared} declared)");
    }
    out.push('\n');

    out
}

fn write_program_line(out: &mut String, program: &ProgramTally, styles: &SummaryStyles) {
    let status = if program.has_failures() {
        "FAIL".style(styles.fail)
    } else {
        "PASS".style(styles.pass)
    };
    swrite!(out, "{status} {}: ", program.name.style(styles.program));
    write_counts(out, &program.cases, styles);

    let finished_cases = program.cases.total();
    if finished_cases != program.declared_cases {
        swrite!(
            out,
            " ({finished_cases} of {} declared cases)",
            program.declared_cases
        );
    }
    if let Some(reason) = &program.failure {
        swrite!(out, "; program failed: {reason}");
    }
    if !program.finished {
        swrite!(out, "; did not finish");
    }
    out.push('\n');
}

fn write_counts(out: &mut String, counts: &CaseCounts, styles: &SummaryStyles) {
    swrite!(
        out,
        "{} passed, {} failed, {} skipped",
        counts.passed.style(styles.pass),
        counts.failed.style(styles.fail),
        counts.skipped.style(styles.skip),
    );
}

fn plural(count: usize, singular: &'static str, plural: &'static str) -> &'static str {
    if count == 1 { singular } else { plural }
}
