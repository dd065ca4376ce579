// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Code to generate JUnit XML reports from atf-tps events.

use crate::config::JunitConfig;
use atf_tps::{EventSink, TestCaseResult, errors::SinkError};
use quick_junit::{NonSuccessKind, Report, TestCase, TestCaseStatus, TestSuite};
use tracing::debug;

static CASE_NOT_FINISHED: &str = "test case did not finish";
static PROGRAM_FAILED_TYPE: &str = "test program failure";

/// An [`EventSink`] that builds a JUnit report.
///
/// Each test program becomes a test suite, and each test case a test case
/// within it. A test program that fails as a whole gets an extra test case,
/// named after the program, with an error status. `info` properties are
/// attached to every suite.
#[derive(Debug)]
pub(crate) struct JunitSink<'cfg> {
    config: &'cfg JunitConfig,
    properties: Vec<(String, String)>,
    test_suites: Vec<TestSuite>,
    current_suite: Option<TestSuite>,
    current_case: Option<CaseInProgress>,
}

#[derive(Debug)]
struct CaseInProgress {
    name: String,
    stdout: String,
    stderr: String,
}

impl<'cfg> JunitSink<'cfg> {
    pub(crate) fn new(config: &'cfg JunitConfig) -> Self {
        Self {
            config,
            properties: Vec::new(),
            test_suites: Vec::new(),
            current_suite: None,
            current_case: None,
        }
    }

    /// Consumes the sink and returns the finished report.
    ///
    /// A test case or test program that never saw its terminator is closed
    /// here, with the test case recorded as an error.
    pub(crate) fn finish(mut self) -> Report {
        self.close_unfinished_case();
        if let Some(suite) = self.current_suite.take() {
            self.test_suites.push(suite);
        }

        for suite in &mut self.test_suites {
            for (name, value) in &self.properties {
                suite.add_property((name.as_str(), value.as_str()));
            }
        }

        let mut report = Report::new(self.config.report_name());
        report.add_test_suites(self.test_suites);
        report
    }

    /// Records the open test case, if any, as an error. Called whenever the
    /// stream moves on without a `tc-end` for it.
    fn close_unfinished_case(&mut self) {
        if let Some(case) = self.current_case.take() {
            debug!("test case `{}` did not finish", case.name);
            let mut status = TestCaseStatus::non_success(NonSuccessKind::Error);
            status.set_message(CASE_NOT_FINISHED);
            let store_output = self.config.store_failure_output();
            self.add_case(case, status, store_output);
        }
    }

    fn add_case(&mut self, case: CaseInProgress, status: TestCaseStatus, store_output: bool) {
        let Some(suite) = &mut self.current_suite else {
            debug!("dropping test case `{}` outside of a test program", case.name);
            return;
        };

        let mut testcase = TestCase::new(case.name, status);
        testcase.set_classname(suite.name.as_str());
        if store_output {
            if !case.stdout.is_empty() {
                testcase.set_system_out(case.stdout);
            }
            if !case.stderr.is_empty() {
                testcase.set_system_err(case.stderr);
            }
        }
        suite.add_test_case(testcase);
    }

    fn current_case(&mut self) -> Result<&mut CaseInProgress, SinkError> {
        self.current_case
            .as_mut()
            .ok_or_else(|| SinkError::new("captured output outside of a test case"))
    }
}

impl EventSink for JunitSink<'_> {
    fn info(&mut self, name: &str, value: &str) -> Result<(), SinkError> {
        self.properties.push((name.to_owned(), value.to_owned()));
        Ok(())
    }

    fn program_start(&mut self, name: &str, _case_count: usize) -> Result<(), SinkError> {
        self.close_unfinished_case();
        if let Some(suite) = self.current_suite.replace(TestSuite::new(name)) {
            self.test_suites.push(suite);
        }
        Ok(())
    }

    fn program_end(&mut self, reason: &str) -> Result<(), SinkError> {
        self.close_unfinished_case();
        let Some(mut suite) = self.current_suite.take() else {
            return Err(SinkError::new("test program ended without being started"));
        };

        if !reason.is_empty() {
            let mut status = TestCaseStatus::non_success(NonSuccessKind::Error);
            status.set_message(reason).set_type(PROGRAM_FAILED_TYPE);
            let mut testcase = TestCase::new(suite.name.as_str(), status);
            testcase.set_classname(suite.name.as_str());
            suite.add_test_case(testcase);
        }

        self.test_suites.push(suite);
        Ok(())
    }

    fn case_start(&mut self, name: &str) -> Result<(), SinkError> {
        self.close_unfinished_case();
        self.current_case = Some(CaseInProgress {
            name: name.to_owned(),
            stdout: String::new(),
            stderr: String::new(),
        });
        Ok(())
    }

    fn case_stdout_line(&mut self, line: &str) -> Result<(), SinkError> {
        let case = self.current_case()?;
        case.stdout.push_str(line);
        case.stdout.push('\n');
        Ok(())
    }

    fn case_stderr_line(&mut self, line: &str) -> Result<(), SinkError> {
        let case = self.current_case()?;
        case.stderr.push_str(line);
        case.stderr.push('\n');
        Ok(())
    }

    fn case_end(&mut self, result: &TestCaseResult) -> Result<(), SinkError> {
        let Some(case) = self.current_case.take() else {
            return Err(SinkError::new("test case ended without being started"));
        };

        let (status, store_output) = match result {
            TestCaseResult::Passed => (
                TestCaseStatus::success(),
                self.config.store_success_output(),
            ),
            TestCaseResult::Failed(reason) => {
                let mut status = TestCaseStatus::non_success(NonSuccessKind::Failure);
                status.set_message(reason.as_str());
                (status, self.config.store_failure_output())
            }
            TestCaseResult::Skipped(reason) => {
                let mut status = TestCaseStatus::skipped();
                status.set_message(reason.as_str());
                (status, self.config.store_success_output())
            }
        };

        self.add_case(case, status, store_output);
        Ok(())
    }
}
