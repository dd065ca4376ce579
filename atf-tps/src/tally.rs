// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{errors::SinkError, result::TestCaseResult, sink::EventSink};

/// Counts of test case verdicts.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CaseCounts {
    /// The number of test cases that passed.
    pub passed: usize,
    /// The number of test cases that failed.
    pub failed: usize,
    /// The number of test cases that were skipped.
    pub skipped: usize,
}

impl CaseCounts {
    /// Returns the number of test cases that finished.
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }

    fn add(&mut self, result: &TestCaseResult) {
        match result {
            TestCaseResult::Passed => self.passed += 1,
            TestCaseResult::Failed(_) => self.failed += 1,
            TestCaseResult::Skipped(_) => self.skipped += 1,
        }
    }
}

/// What was seen of a single test program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramTally {
    /// The name of the test program.
    pub name: String,
    /// The number of test cases the program declared.
    pub declared_cases: usize,
    /// The verdicts of its test cases.
    pub cases: CaseCounts,
    /// Whether a matching `tp-end` record was seen.
    pub finished: bool,
    /// The reason the program itself failed, if it did.
    pub failure: Option<String>,
}

impl ProgramTally {
    /// Returns true if the program failed or any of its test cases failed.
    pub fn has_failures(&self) -> bool {
        self.failure.is_some() || self.cases.failed > 0
    }
}

/// An [`EventSink`] that keeps per-program counts of verdicts.
#[derive(Clone, Debug, Default)]
pub struct TallySink {
    declared_programs: Option<usize>,
    programs: Vec<ProgramTally>,
    // Verdicts delivered outside of any program; only possible for sinks
    // driven by hand.
    orphaned: CaseCounts,
}

impl TallySink {
    /// Creates a new, empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of test programs declared by `tps-count`, if it was
    /// seen.
    pub fn declared_programs(&self) -> Option<usize> {
        self.declared_programs
    }

    /// Returns the test programs that were started, in stream order.
    pub fn programs(&self) -> &[ProgramTally] {
        &self.programs
    }

    /// Returns the number of test programs that failed as a whole.
    pub fn failed_programs(&self) -> usize {
        self.programs
            .iter()
            .filter(|program| program.failure.is_some())
            .count()
    }

    /// Returns verdict counts across all test programs.
    pub fn cases(&self) -> CaseCounts {
        self.programs
            .iter()
            .fold(self.orphaned, |mut acc, program| {
                acc.passed += program.cases.passed;
                acc.failed += program.cases.failed;
                acc.skipped += program.cases.skipped;
                acc
            })
    }

    /// Returns true if any test program or test case failed.
    pub fn has_failures(&self) -> bool {
        self.orphaned.failed > 0 || self.programs.iter().any(ProgramTally::has_failures)
    }
}

impl EventSink for TallySink {
    fn program_count(&mut self, count: usize) -> Result<(), SinkError> {
        self.declared_programs = Some(count);
        Ok(())
    }

    fn program_start(&mut self, name: &str, case_count: usize) -> Result<(), SinkError> {
        self.programs.push(ProgramTally {
            name: name.to_owned(),
            declared_cases: case_count,
            cases: CaseCounts::default(),
            finished: false,
            failure: None,
        });
        Ok(())
    }

    fn program_end(&mut self, reason: &str) -> Result<(), SinkError> {
        if let Some(program) = self.programs.last_mut() {
            program.finished = true;
            if !reason.is_empty() {
                program.failure = Some(reason.to_owned());
            }
        }
        Ok(())
    }

    fn case_end(&mut self, result: &TestCaseResult) -> Result<(), SinkError> {
        match self.programs.last_mut() {
            Some(program) => program.cases.add(result),
            None => self.orphaned.add(result),
        }
        Ok(())
    }
}
