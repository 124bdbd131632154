//! Console rendering of a run.

use crate::fuzz::FuzzReport;
use crate::orchestrator::{Reporter, RunHeader, RunResult, RunStatus, RunSummary, StrictReport, SweepReport};
use crate::selector::{Selection, SelectionOutcome};
use crate::verify::Severity;
use chrono::NaiveDate;
use colored::{ColoredString, Colorize};

const WIDTH: usize = 72;

fn rule(c: char) -> String {
    std::iter::repeat(c).take(WIDTH).collect()
}

fn icon(severity: Severity) -> ColoredString {
    match severity {
        Severity::Pass => "✓".green(),
        Severity::Warn => "⚠".yellow(),
        Severity::Fail => "✗".red(),
    }
}

fn section(title: &str) {
    println!();
    println!("{}", rule('='));
    println!("  {}", title.bold());
    println!("{}", rule('-'));
}

/// Human-readable progress on stdout.
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn on_start(&mut self, header: &RunHeader) {
        let dates: Vec<String> = header.extreme_dates.iter().map(|d| d.to_string()).collect();

        println!("{}", rule('='));
        println!("  {}", "POLARIS CHRONOS — Global Maghrib Audit".bright_cyan().bold());
        println!("{}", rule('='));
        println!("  Engine:   {}", header.engine_version);
        println!("  Date:     {} (machine local)", header.today);
        println!("  Seed:     SHA256({:?})", header.seed);
        println!("  Dates:    today + {}", dates.join(", "));
    }

    fn on_selection(&mut self, selection: &Selection, high_latitude: f64) {
        let regions: Vec<String> = selection
            .region_counts()
            .iter()
            .map(|(region, n)| format!("{}: {}", region, n))
            .collect();
        println!();
        println!("  Selected: {} cities", selection.len());
        println!("  Regions:  {}", regions.join(", "));
        println!(
            "  Southern: {} | Above {:.0}°: {}",
            selection.southern_count(),
            high_latitude,
            selection.high_latitude_count(high_latitude)
        );
        if let SelectionOutcome::AcceptedUnmet { attempts, .. } = &selection.outcome {
            println!("  {}", format!("Constraints unmet after {} attempts", attempts).yellow());
        }
    }

    fn on_sweep_start(&mut self, label: &str, date: NaiveDate) {
        if label == "Today" {
            section(&format!("PROJECTED45 — TODAY ({})", date));
        } else {
            section(&format!("PROJECTED45 — {}", date));
        }
    }

    fn on_result(&mut self, index: usize, total: usize, result: &RunResult) {
        let tag = format!("[{:2}/{}]", index, total);
        let mark = icon(result.verdict.severity);

        let Some(response) = &result.response else {
            let err = result.error.as_deref().unwrap_or("no response");
            let kind = if result.external { "ENGINE UNAVAILABLE" } else { "ERROR" };
            println!("  {} {} {:20} — {}: {}", tag, mark, result.city, kind, err);
            return;
        };

        let maghrib = &response.events.maghrib;
        let time = maghrib.time.as_deref().unwrap_or("N/A");
        let next = if maghrib.next_day { " (+1d)" } else { "" };
        let conf = maghrib.confidence.map(|c| c.to_string()).unwrap_or_else(|| "?".to_string());
        println!(
            "  {} {} {:20} | {:30} | {:12} | {}{:6} [{:9} {}] | {:.2}s",
            tag,
            mark,
            result.city,
            response.location.timezone,
            response.state.to_string(),
            time,
            next,
            maghrib.method_label(),
            conf,
            result.elapsed.as_secs_f64()
        );
        if result.verdict.severity != Severity::Pass {
            println!("           {}", result.verdict.reason.dimmed());
        }
    }

    fn on_sweep_end(&mut self, sweep: &SweepReport) {
        println!();
        println!(
            "  {} [{}]: {} ({:.1}s, avg {:.2}s, cache {}, nominatim {})",
            sweep.label,
            sweep.date,
            sweep.tally,
            sweep.elapsed.as_secs_f64(),
            sweep.average().as_secs_f64(),
            sweep.cache_hits,
            sweep.nominatim_hits
        );
    }

    fn on_strict(&mut self, report: &StrictReport) {
        section(&format!("STRICT SANITY CHECK (x{})", report.checks.len()));
        for check in &report.checks {
            let mark = icon(check.verdict.severity);
            match &check.response {
                Some(response) => {
                    let maghrib = &response.events.maghrib;
                    println!(
                        "  {} {:20} | {:12} | Maghrib: {:8} [{}] — {}",
                        mark,
                        check.city,
                        response.state.to_string(),
                        maghrib.time.as_deref().unwrap_or("N/A"),
                        maghrib.method_label(),
                        check.verdict.reason
                    );
                }
                None => println!("  {} {:20} — {}", mark, check.city, check.verdict.reason),
            }
        }
        println!();
        println!("  Strict: {}", report.tally);
    }

    fn on_fuzz_start(&mut self, samples: usize) {
        section(&format!("FUZZ TEST ({} random lat/lon, projected45)", samples));
    }

    fn on_fuzz(&mut self, report: &FuzzReport) {
        for outcome in &report.outcomes {
            if outcome.verdict.severity == Severity::Pass {
                continue;
            }
            println!(
                "    {}: lat={:.2} lon={:.2} — {}",
                outcome.verdict.severity,
                outcome.sample.lat,
                outcome.sample.lon,
                outcome.verdict.reason
            );
        }
        println!();
        println!("  Fuzz: {}", report.tally);
    }

    fn on_summary(&mut self, summary: &RunSummary) {
        let totals = summary.totals;
        println!();
        println!("{}", rule('='));
        match summary.status() {
            RunStatus::Failed => println!(
                "  OVERALL: {}",
                format!("✗ FAIL ({} failure(s), {} warning(s))", totals.fail, totals.warn).red().bold()
            ),
            RunStatus::Warnings => println!(
                "  OVERALL: {}",
                format!("✓ PASS with {} warning(s)", totals.warn).yellow().bold()
            ),
            RunStatus::Clean => println!("  OVERALL: {}", "✓ PASS — all tests clean".green().bold()),
        }
        println!("{}", rule('='));
    }
}
