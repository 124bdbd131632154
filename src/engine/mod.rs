//! Black-box boundary to the prayer time engine.
//!
//! Builds CLI invocations, runs the engine with a timeout and parses its
//! JSON response. Nothing here assumes more about the engine than the
//! documented response schema.

pub mod bridge;
pub mod invocation;
pub mod types;

pub use bridge::{parse_response, BridgeError, Engine, EngineBridge, Timeouts};
pub use invocation::{Invocation, Strategy, Target};
pub use types::{hms_to_minutes, DayState, EngineResponse, EventMethod, EventRecord, Events, LocationInfo};
