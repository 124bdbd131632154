//! Command-line forms accepted by the engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Gap strategy passed to the engine for polar states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Strategy {
    /// Never emits a null Maghrib; missing events are projected.
    #[default]
    Projected45,
    /// Emits null for events that do not physically occur.
    Strict,
}

impl Strategy {
    /// The value given to `--strategy`.
    pub fn as_arg(self) -> &'static str {
        match self {
            Strategy::Projected45 => "projected45",
            Strategy::Strict => "strict",
        }
    }

    /// The engine guarantees a non-null Maghrib under this strategy.
    pub fn guarantees_projection(self) -> bool {
        matches!(self, Strategy::Projected45)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Strict => write!(f, "Strict"),
            Strategy::Projected45 => write!(f, "Projected45"),
        }
    }
}

/// Where the engine should compute for.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Resolved by the engine's own geocoder.
    City(String),
    Coordinates { lat: f64, lon: f64, tz: String },
}

/// One engine call.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub target: Target,
    pub date: Option<NaiveDate>,
    pub strategy: Strategy,
    pub show_confidence: bool,
}

impl Invocation {
    pub fn city(name: impl Into<String>, strategy: Strategy) -> Self {
        Self { target: Target::City(name.into()), date: None, strategy, show_confidence: false }
    }

    pub fn coordinates(lat: f64, lon: f64, tz: impl Into<String>, date: NaiveDate, strategy: Strategy) -> Self {
        Self {
            target: Target::Coordinates { lat, lon, tz: tz.into() },
            date: Some(date),
            strategy,
            show_confidence: false,
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_confidence(mut self, show: bool) -> Self {
        self.show_confidence = show;
        self
    }

    pub fn is_coordinates(&self) -> bool {
        matches!(self.target, Target::Coordinates { .. })
    }

    /// Arguments after the engine binary.
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        match &self.target {
            Target::City(name) => {
                args.push(name.clone());
                args.push("--strategy".to_string());
                args.push(self.strategy.as_arg().to_string());
                if let Some(date) = self.date {
                    args.push("--date".to_string());
                    args.push(date.format("%Y-%m-%d").to_string());
                }
                if self.show_confidence {
                    args.push("--show-confidence".to_string());
                }
            }
            Target::Coordinates { lat, lon, tz } => {
                args.push("--lat".to_string());
                args.push(format!("{:.4}", lat));
                args.push("--lon".to_string());
                args.push(format!("{:.4}", lon));
                args.push("--tz".to_string());
                args.push(tz.clone());
                if let Some(date) = self.date {
                    args.push("--date".to_string());
                    args.push(date.format("%Y-%m-%d").to_string());
                }
                args.push("--strategy".to_string());
                args.push(self.strategy.as_arg().to_string());
            }
        }
        args
    }

    /// Short human label for logs.
    pub fn label(&self) -> String {
        match &self.target {
            Target::City(name) => name.clone(),
            Target::Coordinates { lat, lon, .. } => format!("lat={:.2} lon={:.2}", lat, lon),
        }
    }
}
