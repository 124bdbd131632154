//! Minute-of-day timeline for Dhuhr → Asr → Maghrib → Isha.
//!
//! Times are mapped onto one continuous axis: explicit `next_day` flags add
//! a day, and optionally a decrease relative to the predecessor is read as
//! an unflagged midnight crossing (also +1440). The implicit rule is a
//! heuristic: an event at exactly the predecessor's minute is left alone
//! and then fails strict ordering.

use crate::engine::{hms_to_minutes, Events};

pub const MINUTES_PER_DAY: f64 = 1440.0;

/// Which events honour the explicit `next_day` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagScope {
    /// Asr, Maghrib and Isha only.
    AfterDhuhr,
    /// All four events.
    All,
}

/// Why a timeline could not be built.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineError {
    /// At least one of the four events has no time.
    Incomplete,
    /// A present time is not `HH:MM:SS`.
    Malformed { event: &'static str, raw: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    points: [(&'static str, f64); 4],
}

impl Timeline {
    /// Parse the four ordered events and apply explicit rollover flags.
    pub fn from_events(events: &Events, scope: FlagScope) -> Result<Self, TimelineError> {
        let mut points = [("", 0.0); 4];
        let mut missing = false;
        for (i, (name, record)) in events.ordered().into_iter().enumerate() {
            let Some(raw) = record.time.as_deref() else {
                missing = true;
                points[i] = (name, f64::NAN);
                continue;
            };
            let mut minutes = hms_to_minutes(raw)
                .ok_or_else(|| TimelineError::Malformed { event: name, raw: raw.to_string() })?;
            let flagged = match scope {
                FlagScope::AfterDhuhr => i > 0 && record.next_day,
                FlagScope::All => record.next_day,
            };
            if flagged {
                minutes += MINUTES_PER_DAY;
            }
            points[i] = (name, minutes);
        }
        if missing {
            return Err(TimelineError::Incomplete);
        }
        Ok(Self { points })
    }

    /// Scan Asr → Maghrib → Isha; any value below its (already adjusted)
    /// predecessor gains a day.
    pub fn infer_implicit_rollover(mut self) -> Self {
        for i in 1..self.points.len() {
            if self.points[i].1 < self.points[i - 1].1 {
                self.points[i].1 += MINUTES_PER_DAY;
            }
        }
        self
    }

    /// First adjacent pair that is not strictly increasing.
    pub fn first_violation(&self) -> Option<OrderingViolation> {
        self.points.windows(2).find(|w| w[0].1 >= w[1].1).map(|w| OrderingViolation {
            earlier: w[0].0,
            earlier_minutes: w[0].1,
            later: w[1].0,
            later_minutes: w[1].1,
        })
    }

    pub fn minutes(&self, event: &str) -> Option<f64> {
        self.points.iter().find(|(name, _)| *name == event).map(|(_, m)| *m)
    }

    pub fn maghrib(&self) -> f64 {
        self.points[2].1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderingViolation {
    pub earlier: &'static str,
    pub earlier_minutes: f64,
    pub later: &'static str,
    pub later_minutes: f64,
}

impl std::fmt::Display for OrderingViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({:.0}) >= {}({:.0})",
            capitalize(self.earlier),
            self.earlier_minutes,
            capitalize(self.later),
            self.later_minutes
        )
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
