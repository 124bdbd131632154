//! Run sequencing and aggregation.
//!
//! One run is: select cities once, sweep them for today and for each
//! extreme date, re-run a handful under the strict strategy, then fuzz
//! coordinates. Every verdict lands in a [`Tally`]; any FAIL anywhere makes
//! the exit code 1.

use crate::cities::{CityPool, Region};
use crate::config::HarnessConfig;
use crate::engine::{Engine, EngineResponse, Invocation, Strategy};
use crate::fuzz::{FuzzGenerator, FuzzReport};
use crate::selector::{seed_from_str, Selection, SelectionOutcome, Selector};
use crate::verify::{Tally, Verdict, Verifier};
use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Serialize, Serializer};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn as_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// One city invocation and its verdict.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub city: String,
    pub region: Region,
    pub approx_latitude: f64,
    pub response: Option<EngineResponse>,
    #[serde(serialize_with = "as_secs")]
    pub elapsed: Duration,
    pub error: Option<String>,
    /// The engine never ran (missing binary, permission denied).
    pub external: bool,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub label: String,
    pub date: NaiveDate,
    pub results: Vec<RunResult>,
    pub tally: Tally,
    #[serde(serialize_with = "as_secs")]
    pub elapsed: Duration,
    pub cache_hits: usize,
    pub nominatim_hits: usize,
}

impl SweepReport {
    pub fn average(&self) -> Duration {
        if self.results.is_empty() {
            Duration::ZERO
        } else {
            self.elapsed / self.results.len() as u32
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StrictCheck {
    pub city: String,
    pub response: Option<EngineResponse>,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StrictReport {
    pub checks: Vec<StrictCheck>,
    pub tally: Tally,
}

/// Per-run inputs that do not belong in the config file.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// The "today" sweep date.
    pub today: NaiveDate,
    /// Full seed string; defaults to the date plus the configured salt.
    pub seed: Option<String>,
    pub fuzz: bool,
}

/// Banner data, available before any sweep runs.
#[derive(Debug, Clone, Serialize)]
pub struct RunHeader {
    pub engine_version: String,
    pub today: NaiveDate,
    pub seed: String,
    pub extreme_dates: Vec<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectionSummary {
    pub cities: Vec<String>,
    pub outcome: SelectionOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Clean,
    Warnings,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub header: RunHeader,
    pub selection: SelectionSummary,
    pub sweeps: Vec<SweepReport>,
    pub strict: StrictReport,
    pub fuzz: Option<FuzzReport>,
    pub totals: Tally,
}

impl RunSummary {
    pub fn status(&self) -> RunStatus {
        if self.totals.fail > 0 {
            RunStatus::Failed
        } else if self.totals.warn > 0 {
            RunStatus::Warnings
        } else {
            RunStatus::Clean
        }
    }

    /// 1 iff any FAIL was recorded; warnings never fail the run.
    pub fn exit_code(&self) -> i32 {
        match self.status() {
            RunStatus::Failed => 1,
            RunStatus::Warnings | RunStatus::Clean => 0,
        }
    }
}

/// Progress callbacks, in run order. All default to no-ops.
pub trait Reporter {
    fn on_start(&mut self, _header: &RunHeader) {}
    fn on_selection(&mut self, _selection: &Selection, _high_latitude: f64) {}
    fn on_sweep_start(&mut self, _label: &str, _date: NaiveDate) {}
    fn on_result(&mut self, _index: usize, _total: usize, _result: &RunResult) {}
    fn on_sweep_end(&mut self, _sweep: &SweepReport) {}
    fn on_strict(&mut self, _report: &StrictReport) {}
    fn on_fuzz_start(&mut self, _samples: usize) {}
    fn on_fuzz(&mut self, _report: &FuzzReport) {}
    fn on_summary(&mut self, _summary: &RunSummary) {}
}

/// Reports nothing. Used for `--json` output and in tests.
pub struct SilentReporter;

impl Reporter for SilentReporter {}

pub struct Orchestrator {
    engine: Arc<dyn Engine>,
    config: HarnessConfig,
    verifier: Verifier,
    pool: CityPool,
}

impl Orchestrator {
    pub fn new(engine: Arc<dyn Engine>, config: HarnessConfig) -> Self {
        let verifier = Verifier::new(config.tables.clone());
        Self { engine, config, verifier, pool: CityPool::builtin() }
    }

    pub fn with_pool(mut self, pool: CityPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn select(&self, seed: &str) -> Selection {
        Selector::new(self.config.selection.clone())
            .with_max_attempts(self.config.max_attempts)
            .select(&self.pool, seed_from_str(seed))
    }

    /// Run every selected city once for `date` under the projecting strategy.
    pub async fn run_sweep(
        &self,
        label: &str,
        cities: &Selection,
        date: NaiveDate,
        reporter: &mut dyn Reporter,
    ) -> SweepReport {
        reporter.on_sweep_start(label, date);
        let start = Instant::now();
        let total = cities.len();
        let mut sweep = SweepReport {
            label: label.to_string(),
            date,
            results: Vec::with_capacity(total),
            tally: Tally::default(),
            elapsed: Duration::ZERO,
            cache_hits: 0,
            nominatim_hits: 0,
        };

        for (i, city) in cities.cities.iter().enumerate() {
            let invocation = Invocation::city(&city.name, Strategy::Projected45)
                .with_date(date)
                .with_confidence(true);
            let call_start = Instant::now();
            let outcome = self.engine.invoke(&invocation).await;
            let elapsed = call_start.elapsed();

            let result = match outcome {
                Ok(response) => {
                    match response.location.source.as_str() {
                        "Cache" => sweep.cache_hits += 1,
                        "Nominatim" => sweep.nominatim_hits += 1,
                        _ => {}
                    }
                    let verdict = self.verifier.verify(&response, Strategy::Projected45);
                    RunResult {
                        city: city.name.clone(),
                        region: city.region,
                        approx_latitude: city.latitude,
                        response: Some(response),
                        elapsed,
                        error: None,
                        external: false,
                        verdict,
                    }
                }
                Err(e) => {
                    log::warn!("{} on {}: {}", city.name, date, e);
                    RunResult {
                        city: city.name.clone(),
                        region: city.region,
                        approx_latitude: city.latitude,
                        response: None,
                        elapsed,
                        error: Some(e.to_string()),
                        external: e.is_external(),
                        verdict: Verdict::fail(format!("Engine error: {}", e)),
                    }
                }
            };

            sweep.tally.record(result.verdict.severity);
            reporter.on_result(i + 1, total, &result);
            sweep.results.push(result);
        }

        sweep.elapsed = start.elapsed();
        log::info!("{} [{}]: {}", label, date, sweep.tally);
        reporter.on_sweep_end(&sweep);
        sweep
    }

    /// Most extreme-latitude city first (whether or not it succeeded), then
    /// a seeded shuffle of the other cities that returned a response.
    pub fn strict_candidates<'a>(&self, results: &'a [RunResult]) -> Vec<&'a RunResult> {
        let size = self.config.strict.sample_size;
        let mut extreme: Option<usize> = None;
        for (i, r) in results.iter().enumerate() {
            let beats = match extreme {
                Some(j) => r.approx_latitude.abs() > results[j].approx_latitude.abs(),
                None => true,
            };
            if beats {
                extreme = Some(i);
            }
        }
        let Some(extreme) = extreme else {
            return Vec::new();
        };
        if size == 0 {
            return Vec::new();
        }

        let mut remaining: Vec<&RunResult> = results
            .iter()
            .enumerate()
            .filter(|(i, r)| *i != extreme && r.response.is_some())
            .map(|(_, r)| r)
            .collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.strict.shuffle_seed);
        remaining.shuffle(&mut rng);

        let mut picked = vec![&results[extreme]];
        picked.extend(remaining.into_iter().take(size - 1));
        picked
    }

    pub async fn run_strict(&self, today: &[RunResult], date: NaiveDate) -> StrictReport {
        let mut report = StrictReport::default();
        for candidate in self.strict_candidates(today) {
            let invocation = Invocation::city(&candidate.city, Strategy::Strict).with_date(date);
            let check = match self.engine.invoke(&invocation).await {
                Ok(response) => StrictCheck {
                    city: candidate.city.clone(),
                    verdict: self.verifier.verify_strict(&response),
                    response: Some(response),
                },
                Err(e) => {
                    log::warn!("strict {}: {}", candidate.city, e);
                    StrictCheck {
                        city: candidate.city.clone(),
                        response: None,
                        verdict: Verdict::fail(format!("Strict run error: {}", e)),
                    }
                }
            };
            report.tally.record(check.verdict.severity);
            report.checks.push(check);
        }
        report
    }

    pub async fn run_fuzz(&self) -> FuzzReport {
        let generator = FuzzGenerator::new(self.config.fuzz.clone(), self.config.tables.confidence.clone());
        generator.run(Arc::clone(&self.engine)).await
    }

    pub async fn run(&self, options: &RunOptions, reporter: &mut dyn Reporter) -> RunSummary {
        let seed = options
            .seed
            .clone()
            .unwrap_or_else(|| self.config.seed_string(options.today));
        let engine_version = self.engine.version().await.unwrap_or_else(|| "unknown".to_string());
        let header = RunHeader {
            engine_version,
            today: options.today,
            seed,
            extreme_dates: self.config.extreme_dates.clone(),
        };
        reporter.on_start(&header);

        let selection = self.select(&header.seed);
        reporter.on_selection(&selection, self.config.selection.high_latitude);

        let mut totals = Tally::default();
        let mut sweeps = Vec::with_capacity(1 + self.config.extreme_dates.len());

        let today = self.run_sweep("Today", &selection, options.today, reporter).await;
        totals.merge(&today.tally);
        sweeps.push(today);

        for &date in &self.config.extreme_dates {
            let sweep = self.run_sweep("Extreme", &selection, date, reporter).await;
            totals.merge(&sweep.tally);
            sweeps.push(sweep);
        }

        let strict = self.run_strict(&sweeps[0].results, options.today).await;
        totals.merge(&strict.tally);
        reporter.on_strict(&strict);

        let fuzz = if options.fuzz {
            reporter.on_fuzz_start(self.config.fuzz.samples);
            let fuzz = self.run_fuzz().await;
            totals.merge(&fuzz.tally);
            reporter.on_fuzz(&fuzz);
            Some(fuzz)
        } else {
            None
        };

        let summary = RunSummary {
            header,
            selection: SelectionSummary {
                cities: selection.cities.iter().map(|c| c.name.clone()).collect(),
                outcome: selection.outcome.clone(),
            },
            sweeps,
            strict,
            fuzz,
            totals,
        };
        log::info!("run finished: {}", summary.totals);
        reporter.on_summary(&summary);
        summary
    }
}
