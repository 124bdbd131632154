//! Polaris Audit: validation harness for the Polaris Maghrib engine.
//!
//! Drives the engine binary as a black box: samples a diverse city set,
//! sweeps it across dates, checks every response against cross-field
//! invariants, spot-checks the strict strategy and fuzzes raw coordinates.

pub mod cities;
pub mod config;
pub mod engine;
pub mod fuzz;
pub mod orchestrator;
pub mod report;
pub mod selector;
pub mod verify;
