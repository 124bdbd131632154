//! Coordinate fuzzing.
//!
//! Draws pseudorandom lat/lon pairs from a fixed seed, runs the engine at
//! each point in UTC under the projecting strategy and checks a reduced
//! invariant set. Ordering is checked on explicit `next_day` flags only;
//! violations poleward of the tolerance latitude are downgraded to WARN.

use crate::config::FuzzConfig;
use crate::engine::{BridgeError, Engine, EngineResponse, Invocation, Strategy};
use crate::verify::{ConfidenceTable, FlagScope, Tally, Timeline, TimelineError, Verdict};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FuzzSample {
    pub index: usize,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FuzzOutcome {
    pub sample: FuzzSample,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FuzzReport {
    pub outcomes: Vec<FuzzOutcome>,
    pub tally: Tally,
}

#[derive(Debug, Clone)]
pub struct FuzzGenerator {
    config: FuzzConfig,
    confidence: ConfidenceTable,
    strategy: Strategy,
}

impl FuzzGenerator {
    pub fn new(config: FuzzConfig, confidence: ConfidenceTable) -> Self {
        Self { config, confidence, strategy: Strategy::Projected45 }
    }

    /// All samples, drawn up front in one pass over the generator.
    pub fn samples(&self) -> Vec<FuzzSample> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let max_lat = self.config.max_latitude;
        let max_lon = self.config.max_longitude;
        (0..self.config.samples)
            .map(|index| {
                let lat = rng.gen_range(-max_lat..=max_lat);
                let lon = rng.gen_range(-max_lon..=max_lon);
                FuzzSample { index, lat, lon }
            })
            .collect()
    }

    pub fn invocation(&self, sample: &FuzzSample) -> Invocation {
        Invocation::coordinates(sample.lat, sample.lon, self.config.timezone.clone(), self.config.date, self.strategy)
    }

    /// Classify one sample's engine result.
    pub fn classify(&self, sample: &FuzzSample, result: Result<EngineResponse, BridgeError>) -> Verdict {
        let response = match result {
            Ok(r) => r,
            Err(e) => return Verdict::fail(format!("engine error: {}", e)),
        };
        let events = &response.events;

        let non_finite = events
            .all()
            .into_iter()
            .find(|(_, e)| e.confidence.is_some_and(|c| !c.is_finite()));
        if let Some((name, _)) = non_finite {
            return Verdict::fail(format!("NaN/Inf confidence in {}", name));
        }

        if events.maghrib.time.is_none() {
            return Verdict::fail(format!("Maghrib None under {}", self.strategy));
        }

        let mismatch = events
            .all()
            .into_iter()
            .find_map(|(name, e)| self.confidence.check(e).map(|m| (name, m)));
        if let Some((name, m)) = mismatch {
            return Verdict::fail(format!("{} conf mismatch ({})", name, m));
        }

        match Timeline::from_events(events, FlagScope::All) {
            Ok(timeline) => {
                if let Some(violation) = timeline.first_violation() {
                    if sample.lat.abs() > self.config.polar_tolerance_latitude {
                        return Verdict::warn(format!(
                            "ordering violation at extreme latitude (expected for {}): {}",
                            self.strategy, violation
                        ));
                    }
                    return Verdict::fail(format!("ordering violation {}", violation));
                }
            }
            Err(TimelineError::Malformed { event, raw }) => {
                return Verdict::fail(format!("unparsable {} time '{}'", event, raw));
            }
            Err(TimelineError::Incomplete) => {}
        }

        Verdict::pass("invariants hold")
    }

    /// Run every sample once, in order. Each sample runs on its own task so
    /// a panic while processing it is recorded as a FAIL for that sample.
    pub async fn run(&self, engine: Arc<dyn Engine>) -> FuzzReport {
        let mut report = FuzzReport::default();

        for sample in self.samples() {
            let invocation = self.invocation(&sample);
            let generator = self.clone();
            let engine = Arc::clone(&engine);
            let handle = tokio::spawn(async move {
                let result = engine.invoke(&invocation).await;
                generator.classify(&sample, result)
            });

            let verdict = match handle.await {
                Ok(verdict) => verdict,
                Err(e) => Verdict::fail(format!("exception: {}", join_error_message(e))),
            };
            log::debug!("fuzz lat={:.2} lon={:.2}: {}", sample.lat, sample.lon, verdict);

            report.tally.record(verdict.severity);
            report.outcomes.push(FuzzOutcome { sample, verdict });
        }

        report
    }
}

fn join_error_message(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "task panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{DayState, EventMethod, EventRecord, Events, LocationInfo};
    use crate::verify::Severity;
    use async_trait::async_trait;

    fn projected(time: &str) -> EventRecord {
        EventRecord {
            time: Some(time.to_string()),
            method: Some(EventMethod::Projected),
            confidence: Some(0.5),
            next_day: false,
        }
    }

    fn response(dhuhr: &str, asr: &str, maghrib: &str, isha: &str) -> EngineResponse {
        EngineResponse {
            location: LocationInfo { latitude: 0.0, country_code: None, timezone: "UTC".into(), source: "Manual".into() },
            state: DayState::Normal,
            events: Events {
                fajr: projected("03:00:00"),
                sunrise: projected("05:00:00"),
                dhuhr: projected(dhuhr),
                asr: projected(asr),
                maghrib: projected(maghrib),
                isha: projected(isha),
            },
        }
    }

    fn generator() -> FuzzGenerator {
        FuzzGenerator::new(FuzzConfig::default(), ConfidenceTable::default())
    }

    fn sample(lat: f64) -> FuzzSample {
        FuzzSample { index: 0, lat, lon: 10.0 }
    }

    #[test]
    fn test_samples_deterministic_and_bounded() {
        let g = generator();
        let a = g.samples();
        let b = g.samples();
        assert_eq!(a, b);
        assert_eq!(a.len(), 20);
        assert!(a.iter().all(|s| s.lat.abs() <= 89.9 && s.lon.abs() <= 179.9));
    }

    #[test]
    fn test_samples_change_with_seed() {
        let mut config = FuzzConfig::default();
        config.seed = 7;
        let other = FuzzGenerator::new(config, ConfidenceTable::default());
        assert_ne!(generator().samples(), other.samples());
    }

    #[test]
    fn test_invocation_uses_fixed_utc_and_date() {
        let inv = generator().invocation(&FuzzSample { index: 0, lat: 12.5, lon: -45.25 });
        let args = inv.args();
        assert!(args.windows(2).any(|w| w[0] == "--tz" && w[1] == "UTC"));
        assert!(args.windows(2).any(|w| w[0] == "--date" && w[1] == "2026-02-14"));
        assert!(args.windows(2).any(|w| w[0] == "--strategy" && w[1] == "projected45"));
    }

    #[test]
    fn test_clean_sample_passes() {
        let v = generator().classify(&sample(30.0), Ok(response("12:00:00", "15:00:00", "18:00:00", "19:30:00")));
        assert_eq!(v.severity, Severity::Pass);
    }

    #[test]
    fn test_ordering_violation_severity_split() {
        let bad = || Ok(response("12:00:00", "15:00:00", "14:00:00", "19:30:00"));
        let polar = generator().classify(&sample(80.0), bad());
        assert_eq!(polar.severity, Severity::Warn, "{}", polar);
        let south_polar = generator().classify(&sample(-80.0), bad());
        assert_eq!(south_polar.severity, Severity::Warn);
        let mid = generator().classify(&sample(50.0), bad());
        assert_eq!(mid.severity, Severity::Fail, "{}", mid);
    }

    #[test]
    fn test_no_implicit_rollover() {
        // Isha after midnight without a next_day flag is a violation here.
        let v = generator().classify(&sample(30.0), Ok(response("12:00:00", "15:00:00", "18:00:00", "00:30:00")));
        assert_eq!(v.severity, Severity::Fail);

        let mut flagged = response("12:00:00", "15:00:00", "18:00:00", "00:30:00");
        flagged.events.isha.next_day = true;
        assert_eq!(generator().classify(&sample(30.0), Ok(flagged)).severity, Severity::Pass);
    }

    #[test]
    fn test_non_finite_confidence_fails() {
        let mut resp = response("12:00:00", "15:00:00", "18:00:00", "19:30:00");
        resp.events.sunrise.confidence = Some(f64::NAN);
        let v = generator().classify(&sample(30.0), Ok(resp));
        assert_eq!(v.severity, Severity::Fail);
        assert!(v.reason.contains("sunrise"), "{}", v.reason);
    }

    #[test]
    fn test_null_maghrib_fails() {
        let mut resp = response("12:00:00", "15:00:00", "18:00:00", "19:30:00");
        resp.events.maghrib.time = None;
        assert_eq!(generator().classify(&sample(85.0), Ok(resp)).severity, Severity::Fail);
    }

    #[test]
    fn test_confidence_mismatch_any_event_fails() {
        let mut resp = response("12:00:00", "15:00:00", "18:00:00", "19:30:00");
        resp.events.fajr.method = Some(EventMethod::Virtual);
        let v = generator().classify(&sample(30.0), Ok(resp));
        assert_eq!(v.severity, Severity::Fail);
        assert!(v.reason.starts_with("fajr conf mismatch"), "{}", v.reason);
    }

    #[test]
    fn test_engine_error_fails() {
        let v = generator().classify(&sample(30.0), Err(BridgeError::EmptyOutput));
        assert_eq!(v.severity, Severity::Fail);
        assert!(v.reason.contains("empty stdout"));
    }

    /// Answers by latitude: panics near the equator, breaks ordering in the
    /// north, behaves elsewhere.
    struct LatitudeEngine;

    #[async_trait]
    impl Engine for LatitudeEngine {
        async fn invoke(&self, invocation: &Invocation) -> Result<EngineResponse, BridgeError> {
            let lat = match &invocation.target {
                crate::engine::Target::Coordinates { lat, .. } => *lat,
                crate::engine::Target::City(_) => 0.0,
            };
            if lat.abs() < 5.0 {
                panic!("engine exploded at {:.2}", lat);
            }
            if lat > 0.0 {
                Ok(response("12:00:00", "11:00:00", "18:00:00", "19:30:00"))
            } else {
                Ok(response("12:00:00", "15:00:00", "18:00:00", "19:30:00"))
            }
        }
    }

    #[tokio::test]
    async fn test_run_counts_every_sample() {
        let g = generator();
        let samples = g.samples();
        let report = g.run(Arc::new(LatitudeEngine)).await;

        assert_eq!(report.outcomes.len(), samples.len());
        assert_eq!(report.tally.total(), samples.len());

        for outcome in &report.outcomes {
            let lat = outcome.sample.lat;
            let expected = if lat.abs() < 5.0 {
                Severity::Fail
            } else if lat > 70.0 {
                Severity::Warn
            } else if lat > 0.0 {
                Severity::Fail
            } else {
                Severity::Pass
            };
            assert_eq!(outcome.verdict.severity, expected, "lat={} {}", lat, outcome.verdict);
        }
    }

    #[tokio::test]
    async fn test_panicking_sample_is_caught() {
        let mut config = FuzzConfig::default();
        config.max_latitude = 1.0;
        config.samples = 3;
        let g = FuzzGenerator::new(config, ConfidenceTable::default());
        let report = g.run(Arc::new(LatitudeEngine)).await;
        assert_eq!(report.tally.fail, 3);
        assert!(report.outcomes[0].verdict.reason.contains("engine exploded"), "{}", report.outcomes[0].verdict);
    }
}
