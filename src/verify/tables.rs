//! Fixed lookup tables injected into the verifier.

use crate::engine::{EventMethod, EventRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Expected confidence per derivation method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceTable {
    pub expected: HashMap<EventMethod, f64>,
    pub tolerance: f64,
}

impl Default for ConfidenceTable {
    fn default() -> Self {
        let expected = HashMap::from([
            (EventMethod::Standard, 1.0),
            (EventMethod::Virtual, 0.7),
            (EventMethod::Projected, 0.5),
            (EventMethod::None, 0.0),
        ]);
        Self { expected, tolerance: 0.01 }
    }
}

/// A reported confidence that disagrees with its method.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidenceMismatch {
    pub method: EventMethod,
    pub reported: f64,
    pub expected: f64,
}

impl std::fmt::Display for ConfidenceMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}, expected {}", self.method, self.reported, self.expected)
    }
}

impl ConfidenceTable {
    pub fn expected(&self, method: EventMethod) -> Option<f64> {
        self.expected.get(&method).copied()
    }

    /// Mismatch only when both method and confidence are reported and the
    /// method is in the table.
    pub fn check(&self, record: &EventRecord) -> Option<ConfidenceMismatch> {
        let method = record.method?;
        let reported = record.confidence?;
        let expected = self.expected(method)?;
        if (reported - expected).abs() > self.tolerance {
            Some(ConfidenceMismatch { method, reported, expected })
        } else {
            None
        }
    }
}

/// Country code → accepted timezone-region prefixes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimezoneTable {
    pub regions: BTreeMap<String, Vec<String>>,
}

impl Default for TimezoneTable {
    fn default() -> Self {
        let entries: &[(&str, &[&str])] = &[
            ("SA", &["Asia"]),
            ("AE", &["Asia"]),
            ("QA", &["Asia"]),
            ("US", &["America", "Pacific"]),
            ("CA", &["America"]),
            ("GB", &["Europe"]),
            ("FR", &["Europe"]),
            ("DE", &["Europe"]),
            ("AU", &["Australia"]),
            ("JP", &["Asia"]),
            ("CN", &["Asia"]),
        ];
        let regions = entries
            .iter()
            .map(|(cc, prefixes)| (cc.to_string(), prefixes.iter().map(|p| p.to_string()).collect()))
            .collect();
        Self { regions }
    }
}

impl TimezoneTable {
    /// Expected prefixes when `timezone` does not fit `country_code`.
    /// Unknown country codes never mismatch.
    pub fn mismatch(&self, country_code: &str, timezone: &str) -> Option<&[String]> {
        let expected = self.regions.get(country_code)?;
        let region = timezone.split_once('/').map(|(r, _)| r).unwrap_or("");
        if expected.iter().any(|e| e == region) {
            None
        } else {
            Some(expected)
        }
    }
}

/// Everything the verifier needs besides the response itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierTables {
    pub confidence: ConfidenceTable,
    pub timezones: TimezoneTable,
}
