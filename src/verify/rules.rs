//! Ordered rule pipeline for lenient verification, and the strict check.
//!
//! Each rule is an independent predicate with a fixed severity. Rules are
//! evaluated in list order: the first matching FAIL wins, otherwise the
//! first matching WARN, otherwise PASS.

use super::tables::VerifierTables;
use super::timeline::{FlagScope, Timeline, TimelineError};
use super::{Severity, Verdict};
use crate::engine::{hms_to_minutes, DayState, EngineResponse, EventMethod, Strategy};

/// Inputs shared by every rule; the timeline is built once.
pub struct RuleContext<'a> {
    pub response: &'a EngineResponse,
    pub strategy: Strategy,
    pub tables: &'a VerifierTables,
    pub timeline: Result<Timeline, TimelineError>,
}

impl<'a> RuleContext<'a> {
    pub fn new(response: &'a EngineResponse, strategy: Strategy, tables: &'a VerifierTables) -> Self {
        let timeline = Timeline::from_events(&response.events, FlagScope::AfterDhuhr)
            .map(Timeline::infer_implicit_rollover);
        Self { response, strategy, tables, timeline }
    }

    /// Maghrib minute-of-day: normalized when the timeline is complete,
    /// raw otherwise.
    fn maghrib_minutes(&self) -> Option<f64> {
        match &self.timeline {
            Ok(t) => Some(t.maghrib()),
            Err(_) => self.response.events.maghrib.time.as_deref().and_then(hms_to_minutes),
        }
    }
}

/// One predicate with its severity. `check` returns the reason on a match.
pub struct Rule {
    pub name: &'static str,
    pub severity: Severity,
    check: fn(&RuleContext<'_>) -> Option<String>,
}

impl Rule {
    pub fn new(name: &'static str, severity: Severity, check: fn(&RuleContext<'_>) -> Option<String>) -> Self {
        Self { name, severity, check }
    }

    pub fn apply(&self, ctx: &RuleContext<'_>) -> Option<String> {
        (self.check)(ctx)
    }
}

/// First FAIL, else first WARN, else PASS.
pub fn evaluate(rules: &[Rule], ctx: &RuleContext<'_>) -> Verdict {
    let mut first_warn: Option<Verdict> = None;
    for rule in rules {
        let Some(reason) = rule.apply(ctx) else { continue };
        log::trace!("rule {} matched: {}", rule.name, reason);
        match rule.severity {
            Severity::Fail => return Verdict::fail(reason),
            Severity::Warn if first_warn.is_none() => first_warn = Some(Verdict::warn(reason)),
            _ => {}
        }
    }
    first_warn.unwrap_or_else(|| Verdict::pass("All checks passed"))
}

/// The lenient rule list in precedence order.
pub fn lenient_rules() -> Vec<Rule> {
    vec![
        Rule::new("structural", Severity::Fail, structural),
        Rule::new("confidence-consistency", Severity::Fail, confidence_consistency),
        Rule::new("well-formed-times", Severity::Fail, well_formed_times),
        Rule::new("ordering", Severity::Fail, ordering),
        Rule::new("state-plausibility", Severity::Warn, state_plausibility),
        Rule::new("sanity-window", Severity::Warn, sanity_window),
        Rule::new("timezone-plausibility", Severity::Warn, timezone_plausibility),
        Rule::new("low-latitude-rollover", Severity::Warn, low_latitude_rollover),
    ]
}

fn structural(ctx: &RuleContext<'_>) -> Option<String> {
    if !ctx.strategy.guarantees_projection() {
        return None;
    }
    let maghrib = &ctx.response.events.maghrib;
    if maghrib.time.is_none() {
        return Some(format!("Maghrib is null under {}", ctx.strategy));
    }
    if maghrib.has_no_method() {
        return Some(format!("Maghrib method is {} under {}", maghrib.method_label(), ctx.strategy));
    }
    None
}

fn confidence_consistency(ctx: &RuleContext<'_>) -> Option<String> {
    ctx.tables
        .confidence
        .check(&ctx.response.events.maghrib)
        .map(|m| format!("Confidence mismatch: {}", m))
}

fn well_formed_times(ctx: &RuleContext<'_>) -> Option<String> {
    match &ctx.timeline {
        Err(TimelineError::Malformed { event, raw }) => Some(format!("Unparsable {} time '{}'", event, raw)),
        _ => None,
    }
}

fn ordering(ctx: &RuleContext<'_>) -> Option<String> {
    let timeline = ctx.timeline.as_ref().ok()?;
    timeline.first_violation().map(|v| format!("Ordering: {}", v))
}

fn state_plausibility(ctx: &RuleContext<'_>) -> Option<String> {
    let state = ctx.response.state;
    if state.is_polar() && ctx.response.events.maghrib.method == Some(EventMethod::Standard) {
        return Some(format!("Standard Maghrib in {} state (unusual)", state));
    }
    None
}

fn sanity_window(ctx: &RuleContext<'_>) -> Option<String> {
    let maghrib = &ctx.response.events.maghrib;
    if maghrib.next_day {
        return None;
    }
    let minutes = ctx.maghrib_minutes()?;
    let time = maghrib.time.as_deref().unwrap_or("?");

    match maghrib.method {
        Some(EventMethod::Standard) if ctx.response.state == DayState::Normal => {
            let lat = ctx.response.location.latitude;
            let earliest = if lat.abs() > 55.0 { 14.0 * 60.0 } else { 15.0 * 60.0 };
            if minutes < earliest || minutes >= 24.0 * 60.0 {
                return Some(format!(
                    "Maghrib at {} seems outside {:.0}:00-24:00 range (lat={:.1})",
                    time,
                    earliest / 60.0,
                    lat
                ));
            }
            None
        }
        Some(EventMethod::Projected | EventMethod::Virtual) if minutes < 12.0 * 60.0 => {
            Some(format!("Projected/Virtual Maghrib at {} seems early", time))
        }
        _ => None,
    }
}

fn timezone_plausibility(ctx: &RuleContext<'_>) -> Option<String> {
    let location = &ctx.response.location;
    let tz = location.timezone.as_str();
    if tz.is_empty() {
        return None;
    }
    if tz.parse::<chrono_tz::Tz>().is_err() {
        return Some(format!("Unknown IANA timezone '{}'", tz));
    }
    let cc = location.country_code.as_deref().filter(|cc| !cc.is_empty())?;
    ctx.tables
        .timezones
        .mismatch(cc, tz)
        .map(|expected| format!("TZ mismatch: {} expected {:?} but got {}", cc, expected, tz))
}

fn low_latitude_rollover(ctx: &RuleContext<'_>) -> Option<String> {
    let lat = ctx.response.location.latitude;
    if lat.abs() < 40.0 && ctx.response.events.maghrib.next_day {
        return Some(format!("next_day Maghrib at lat {:.1} (unusual for low latitudes)", lat));
    }
    None
}

/// Strict-strategy check: polar states must not report a Maghrib, normal
/// days must report a Standard one.
pub fn strict_verdict(response: &EngineResponse) -> Verdict {
    let state = response.state;
    let maghrib = &response.events.maghrib;

    if state.is_polar() {
        if maghrib.time.is_none() || maghrib.method == Some(EventMethod::None) {
            Verdict::pass(format!("Strict: Maghrib correctly None in {}", state))
        } else {
            Verdict::warn(format!("Strict: Maghrib present in {} ({})", state, maghrib.method_label()))
        }
    } else if maghrib.time.is_none() {
        Verdict::fail("Strict: Maghrib None in Normal state")
    } else if maghrib.method == Some(EventMethod::Standard) {
        Verdict::pass("Strict: Standard Maghrib in Normal state")
    } else {
        Verdict::warn(format!("Strict: {} Maghrib in Normal state", maghrib.method_label()))
    }
}
