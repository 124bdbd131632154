//! Process boundary to the engine binary.
//!
//! One call = one child process with a hard timeout. Stdout is parsed as
//! JSON; if leading diagnostic text precedes the document, parsing restarts
//! at the first line beginning with `{`.

use super::invocation::Invocation;
use super::types::EngineResponse;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Per-call timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub city: Duration,
    pub coordinates: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { city: Duration::from_secs(30), coordinates: Duration::from_secs(15) }
    }
}

/// Engine call failures.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The process could not be started (missing binary, permission denied).
    #[error("cannot run engine '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("engine timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),
    #[error("engine exited with {}: {stderr}", exit_label(.code))]
    ExitStatus { code: Option<i32>, stderr: String },
    #[error("empty stdout")]
    EmptyOutput,
    #[error("JSON parse error: {0}")]
    MalformedJson(String),
}

impl BridgeError {
    /// Failure outside the engine's output (it never ran).
    pub fn is_external(&self) -> bool {
        matches!(self, Self::Spawn { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Spawn { .. } => "spawn",
            Self::Timeout(_) => "timeout",
            Self::ExitStatus { .. } => "exit-status",
            Self::EmptyOutput => "empty-output",
            Self::MalformedJson(_) => "malformed-json",
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {}", c),
        None => "signal".to_string(),
    }
}

/// Anything that can answer an [`Invocation`] with an engine response.
#[async_trait]
pub trait Engine: Send + Sync {
    async fn invoke(&self, invocation: &Invocation) -> Result<EngineResponse, BridgeError>;

    /// Engine version string, if it can be queried.
    async fn version(&self) -> Option<String> {
        None
    }
}

/// The real engine, driven through its CLI.
#[derive(Debug, Clone)]
pub struct EngineBridge {
    binary: PathBuf,
    timeouts: Timeouts,
}

impl EngineBridge {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into(), timeouts: Timeouts::default() }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn timeout_for(&self, invocation: &Invocation) -> Duration {
        if invocation.is_coordinates() {
            self.timeouts.coordinates
        } else {
            self.timeouts.city
        }
    }

    async fn run(&self, args: &[String], timeout: Duration) -> Result<std::process::Output, BridgeError> {
        let child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(timeout, child).await {
            Ok(result) => result.map_err(|source| BridgeError::Spawn {
                binary: self.binary.display().to_string(),
                source,
            }),
            Err(_) => Err(BridgeError::Timeout(timeout)),
        }
    }
}

#[async_trait]
impl Engine for EngineBridge {
    async fn invoke(&self, invocation: &Invocation) -> Result<EngineResponse, BridgeError> {
        let args = invocation.args();
        log::debug!("engine {} {}", self.binary.display(), args.join(" "));

        let output = self.run(&args, self.timeout_for(invocation)).await?;
        if !output.status.success() {
            return Err(BridgeError::ExitStatus {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_response(&String::from_utf8_lossy(&output.stdout))
    }

    async fn version(&self) -> Option<String> {
        let output = self.run(&["--version".to_string()], self.timeouts.city).await.ok()?;
        if !output.status.success() {
            return None;
        }
        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() { None } else { Some(text) }
    }
}

/// Parse engine stdout, tolerating diagnostic lines before the JSON document.
pub fn parse_response(stdout: &str) -> Result<EngineResponse, BridgeError> {
    let text = stdout.trim();
    if text.is_empty() {
        return Err(BridgeError::EmptyOutput);
    }

    match serde_json::from_str(text) {
        Ok(response) => Ok(response),
        Err(first) => {
            let lines: Vec<&str> = text.lines().collect();
            let Some(start) = lines.iter().position(|l| l.trim_start().starts_with('{')) else {
                return Err(BridgeError::MalformedJson(first.to_string()));
            };
            serde_json::from_str(&lines[start..].join("\n"))
                .map_err(|e| BridgeError::MalformedJson(e.to_string()))
        }
    }
}
