// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The outcome of a single test case.

use serde::Serialize;
use std::fmt;

/// A non-empty, trimmed explanation attached to a failure or skip.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Reason(String);

impl Reason {
    /// Creates a new reason from `text`, trimming surrounding whitespace.
    ///
    /// Returns `None` if nothing is left after trimming.
    pub fn new(text: &str) -> Option<Self> {
        let text = text.trim();
        (!text.is_empty()).then(|| Self(text.to_owned()))
    }

    /// Returns the reason as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Reason {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The verdict for a test case, as reported by its `tc-end` record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "kebab-case")]
pub enum TestCaseResult {
    /// The test case passed.
    Passed,
    /// The test case failed.
    Failed(Reason),
    /// The test case was skipped.
    Skipped(Reason),
}

impl TestCaseResult {
    /// Returns the reason for a failed or skipped test case.
    pub fn reason(&self) -> Option<&Reason> {
        match self {
            Self::Passed => None,
            Self::Failed(reason) | Self::Skipped(reason) => Some(reason),
        }
    }

    /// Returns true if the test case passed.
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Returns true if the test case failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns true if the test case was skipped.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }

    /// Returns the keyword used for this verdict on the wire.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed(_) => "failed",
            Self::Skipped(_) => "skipped",
        }
    }
}

impl fmt::Display for TestCaseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason() {
            Some(reason) => write!(f, "{}, {reason}", self.keyword()),
            None => f.write_str(self.keyword()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("", None ; "empty")]
    #[test_case(" \t ", None ; "whitespace only")]
    #[test_case("  disk full ", Some("disk full") ; "trimmed")]
    #[test_case("a, b: c", Some("a, b: c") ; "delimiters kept")]
    fn reason_new(input: &str, expected: Option<&str>) {
        assert_eq!(Reason::new(input).as_ref().map(Reason::as_str), expected);
    }

    #[test]
    fn display() {
        let reason = Reason::new("timed out").unwrap();
        assert_eq!(TestCaseResult::Passed.to_string(), "passed");
        assert_eq!(
            TestCaseResult::Failed(reason.clone()).to_string(),
            "failed, timed out"
        );
        assert_eq!(
            TestCaseResult::Skipped(reason).to_string(),
            "skipped, timed out"
        );
    }

    #[test]
    fn predicates() {
        let reason = Reason::new("nope").unwrap();
        assert!(TestCaseResult::Passed.is_passed());
        assert!(TestCaseResult::Passed.reason().is_none());
        assert!(TestCaseResult::Failed(reason.clone()).is_failed());
        assert!(TestCaseResult::Skipped(reason.clone()).is_skipped());
        assert_eq!(
            TestCaseResult::Skipped(reason).reason().map(Reason::as_str),
            Some("nope")
        );
    }
}
