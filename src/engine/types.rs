//! Response schema emitted by the engine on stdout.
//!
//! Field names and enum spellings mirror the engine's JSON exactly. Anything
//! the harness does not inspect (notes, solar info, gap_strategy) is ignored.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The state of the solar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayState {
    Normal,
    MidnightSun,
    PolarNight,
}

impl DayState {
    pub fn is_polar(self) -> bool {
        matches!(self, Self::MidnightSun | Self::PolarNight)
    }
}

impl fmt::Display for DayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayState::Normal => write!(f, "Normal"),
            DayState::MidnightSun => write!(f, "MidnightSun"),
            DayState::PolarNight => write!(f, "PolarNight"),
        }
    }
}

/// How the engine derived an event time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventMethod {
    Standard,
    Virtual,
    Projected,
    None,
}

impl fmt::Display for EventMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "Standard"),
            Self::Virtual => write!(f, "Virtual"),
            Self::Projected => write!(f, "Projected"),
            Self::None => write!(f, "None"),
        }
    }
}

/// A single event as reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventRecord {
    /// Local time (HH:MM:SS) or null if the event does not exist.
    pub time: Option<String>,
    pub method: Option<EventMethod>,
    pub confidence: Option<f64>,
    /// The local time belongs to the day after the requested date.
    pub next_day: bool,
}

impl EventRecord {
    /// Method is absent or explicitly `None`.
    pub fn has_no_method(&self) -> bool {
        matches!(self.method, Option::None | Some(EventMethod::None))
    }

    pub fn method_label(&self) -> String {
        self.method.map(|m| m.to_string()).unwrap_or_else(|| "null".to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Events {
    pub fajr: EventRecord,
    pub sunrise: EventRecord,
    pub dhuhr: EventRecord,
    pub asr: EventRecord,
    pub maghrib: EventRecord,
    pub isha: EventRecord,
}

impl Events {
    /// All six events in day order, with their JSON names.
    pub fn all(&self) -> [(&'static str, &EventRecord); 6] {
        [
            ("fajr", &self.fajr),
            ("sunrise", &self.sunrise),
            ("dhuhr", &self.dhuhr),
            ("asr", &self.asr),
            ("maghrib", &self.maghrib),
            ("isha", &self.isha),
        ]
    }

    /// The four events whose ordering is checked.
    pub fn ordered(&self) -> [(&'static str, &EventRecord); 4] {
        [
            ("dhuhr", &self.dhuhr),
            ("asr", &self.asr),
            ("maghrib", &self.maghrib),
            ("isha", &self.isha),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationInfo {
    pub latitude: f64,
    pub country_code: Option<String>,
    pub timezone: String,
    /// Resolution provenance (Cache, Nominatim, Fallback, Manual, ...).
    pub source: String,
}

/// Full engine response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineResponse {
    pub location: LocationInfo,
    pub state: DayState,
    pub events: Events,
}

/// Parse `HH:MM:SS` into fractional minutes of the day.
pub fn hms_to_minutes(hms: &str) -> Option<f64> {
    let parts: Vec<&str> = hms.trim().split(':').collect();
    if parts.len() != 3 {
        return None;
    }
    let h: u32 = parts[0].parse().ok()?;
    let m: u32 = parts[1].parse().ok()?;
    let s: u32 = parts[2].parse().ok()?;
    if h >= 24 || m >= 60 || s >= 60 {
        return None;
    }
    Some(f64::from(h * 60 + m) + f64::from(s) / 60.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SAMPLE: &str = r#"{
        "location": {
            "name": "Tromso",
            "latitude": 69.6492,
            "longitude": 18.9553,
            "timezone": "Europe/Oslo",
            "tz_label": "Europe/Oslo (Local Time)",
            "source": "Fallback",
            "country_code": "NO",
            "formatted_coords": "69.6492N, 18.9553E",
            "resolved_confidence": 1.0
        },
        "date": "2026-06-21",
        "state": "MidnightSun",
        "gap_strategy": "Projected45",
        "events": {
            "fajr": {"time": "02:10:00", "method": "Projected", "confidence": 0.5, "note": "projected"},
            "sunrise": {"time": null, "method": "None", "confidence": 0.0},
            "dhuhr": {"time": "12:44:10", "method": "Standard", "confidence": 1.0},
            "asr": {"time": "17:01:00", "method": "Virtual", "confidence": 0.7},
            "maghrib": {"time": "22:38:00", "method": "Projected", "confidence": 0.5},
            "isha": {"time": "00:15:00", "method": "Projected", "confidence": 0.5, "next_day": true}
        }
    }"#;

    #[test]
    fn test_deserialize_engine_output() {
        let resp: EngineResponse = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(resp.state, DayState::MidnightSun);
        assert_eq!(resp.location.country_code.as_deref(), Some("NO"));
        assert_eq!(resp.location.source, "Fallback");
        assert_eq!(resp.events.maghrib.method, Some(EventMethod::Projected));
        assert!(resp.events.isha.next_day);
        assert!(!resp.events.asr.next_day, "next_day defaults to false");
        assert!(resp.events.sunrise.time.is_none());
    }

    #[test]
    fn test_null_method_and_missing_event() {
        let json = r#"{
            "location": {"latitude": 10.0, "timezone": "UTC", "source": "Manual"},
            "state": "Normal",
            "events": {"maghrib": {"time": null, "method": null, "confidence": null}}
        }"#;
        let resp: EngineResponse = serde_json::from_str(json).unwrap();
        assert!(resp.events.maghrib.has_no_method());
        assert_eq!(resp.events.maghrib.method_label(), "null");
        assert_eq!(resp.events.isha, EventRecord::default());
        assert!(resp.location.country_code.is_none());
    }

    #[test]
    fn test_unknown_state_rejected() {
        let json = r#"{"location": {}, "state": "Twilight", "events": {}}"#;
        assert!(serde_json::from_str::<EngineResponse>(json).is_err());
    }

    #[test]
    fn test_hms_to_minutes() {
        assert_relative_eq!(hms_to_minutes("23:50:00").unwrap(), 1430.0);
        assert_relative_eq!(hms_to_minutes("00:10:30").unwrap(), 10.5);
        assert!(hms_to_minutes("24:00:00").is_none());
        assert!(hms_to_minutes("12:30").is_none());
        assert!(hms_to_minutes("ab:cd:ef").is_none());
    }

    #[test]
    fn test_day_state_polar() {
        assert!(DayState::PolarNight.is_polar());
        assert!(DayState::MidnightSun.is_polar());
        assert!(!DayState::Normal.is_polar());
    }
}
