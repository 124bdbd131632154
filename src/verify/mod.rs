//! Verification of a single engine response.
//!
//! Two modes: lenient (ordered rule pipeline, used with the projecting
//! strategy) and strict (polar truthfulness, used with the strict strategy).

pub mod rules;
pub mod tables;
pub mod timeline;

pub use rules::{evaluate, lenient_rules, strict_verdict, Rule, RuleContext};
pub use tables::{ConfidenceMismatch, ConfidenceTable, TimezoneTable, VerifierTables};
pub use timeline::{FlagScope, OrderingViolation, Timeline, TimelineError, MINUTES_PER_DAY};

use crate::engine::{EngineResponse, Strategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Verdict severity, ordered PASS < WARN < FAIL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Pass,
    Warn,
    Fail,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Warn => write!(f, "WARN"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub severity: Severity,
    pub reason: String,
}

impl Verdict {
    pub fn pass(reason: impl Into<String>) -> Self {
        Self { severity: Severity::Pass, reason: reason.into() }
    }

    pub fn warn(reason: impl Into<String>) -> Self {
        Self { severity: Severity::Warn, reason: reason.into() }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self { severity: Severity::Fail, reason: reason.into() }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.reason)
    }
}

/// PASS/WARN/FAIL counters. Merging is order-independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub pass: usize,
    pub warn: usize,
    pub fail: usize,
}

impl Tally {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Pass => self.pass += 1,
            Severity::Warn => self.warn += 1,
            Severity::Fail => self.fail += 1,
        }
    }

    pub fn merge(&mut self, other: &Tally) {
        self.pass += other.pass;
        self.warn += other.warn;
        self.fail += other.fail;
    }

    pub fn total(&self) -> usize {
        self.pass + self.warn + self.fail
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PASS={} WARN={} FAIL={}", self.pass, self.warn, self.fail)
    }
}

/// Rule engine over engine responses.
pub struct Verifier {
    tables: VerifierTables,
    rules: Vec<Rule>,
}

impl Verifier {
    pub fn new(tables: VerifierTables) -> Self {
        Self { tables, rules: lenient_rules() }
    }

    pub fn tables(&self) -> &VerifierTables {
        &self.tables
    }

    /// Lenient mode.
    pub fn verify(&self, response: &EngineResponse, strategy: Strategy) -> Verdict {
        let ctx = RuleContext::new(response, strategy, &self.tables);
        evaluate(&self.rules, &ctx)
    }

    /// Strict mode.
    pub fn verify_strict(&self, response: &EngineResponse) -> Verdict {
        strict_verdict(response)
    }
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new(VerifierTables::default())
    }
}
