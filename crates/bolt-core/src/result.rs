use crate::cli::CliOutput;
use crate::job::JobStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Version stamped into every result so files written by older builds can be rejected.
pub const RESULT_SCHEMA_VERSION: u32 = 1;

/// Decoded outcome of one Bolt invocation, stored as `<log_dir>/<job-id>.json`.
///
/// With `--format json`, a task run prints its report on stdout:
///
/// ```json
/// { "items": [ { "target": "host1", "action": "task", "object": "pkg",
///                "status": "success", "value": { ... } } ],
///   "target_count": 1, "elapsed_time": 3 }
/// ```
///
/// and its log on stderr.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobResult {
    pub command: Option<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub log: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    pub schema: u32,
}

impl JobResult {
    /// Interpret the raw output of `command`.
    pub fn decode(command: &str, output: &CliOutput) -> Self {
        let CliOutput {
            stdout,
            stderr,
            exit_code,
        } = output;
        let command = Some(command.to_string());

        // Anything other than 0 (all targets ok) or 1 (some targets failed)
        // means Bolt itself could not finish.
        if *exit_code != 0 && *exit_code != 1 {
            return Self {
                command,
                status: JobStatus::Exception,
                value: Value::String(format!("stderr:\n{}\nstdout:\n{}", stderr, stdout)),
                log: None,
                message: Some(format!("Command unexpectedly exited with code {}", exit_code)),
                schema: RESULT_SCHEMA_VERSION,
            };
        }

        // Errors raised before any target ran are printed as plain text.
        if *exit_code == 1 && !stdout.starts_with('{') {
            return Self {
                command,
                status: JobStatus::Failure,
                value: Value::String(stdout.clone()),
                log: Some(stderr.clone()),
                message: None,
                schema: RESULT_SCHEMA_VERSION,
            };
        }

        match serde_json::from_str::<Value>(stdout) {
            Ok(value) => Self {
                command,
                status: if *exit_code == 0 {
                    JobStatus::Success
                } else {
                    JobStatus::Failure
                },
                value,
                log: Some(stderr.clone()),
                message: None,
                schema: RESULT_SCHEMA_VERSION,
            },
            Err(e) => Self {
                command,
                status: JobStatus::Exception,
                value: Value::String(format!("{:?}", e)),
                log: Some(stderr.clone()),
                message: Some(e.to_string()),
                schema: RESULT_SCHEMA_VERSION,
            },
        }
    }

    /// Result recorded when the proxy itself failed while running a job.
    pub fn internal_error(command: Option<String>, error: &str) -> Self {
        Self {
            command,
            status: JobStatus::Exception,
            value: Value::String(error.to_string()),
            log: None,
            message: Some(error.to_string()),
            schema: RESULT_SCHEMA_VERSION,
        }
    }

    /// Per-target items of a decoded report, if stdout was one.
    pub fn items(&self) -> Option<&Vec<Value>> {
        self.value.get("items").and_then(Value::as_array)
    }

    pub fn target_count(&self) -> Option<u64> {
        self.value.get("target_count").and_then(Value::as_u64)
    }

    pub fn elapsed_time(&self) -> Option<f64> {
        self.value.get("elapsed_time").and_then(Value::as_f64)
    }

    /// Write the result to `path`, creating its directory if needed.
    pub fn write_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }

    /// Read a persisted result back. Missing, unreadable, foreign-schema or
    /// malformed files all come back as `None`.
    pub fn read_from_file(path: &Path) -> Option<Self> {
        let data = std::fs::read_to_string(path).ok()?;
        let raw: Value = match serde_json::from_str(&data) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("Ignoring unparseable result file {}: {}", path.display(), e);
                return None;
            }
        };

        let schema = raw.get("schema").and_then(Value::as_u64);
        if schema != Some(u64::from(RESULT_SCHEMA_VERSION)) {
            debug!(
                "Ignoring result file {} with schema {:?}",
                path.display(),
                schema
            );
            return None;
        }

        match serde_json::from_value(raw) {
            Ok(result) => Some(result),
            Err(e) => {
                debug!("Ignoring malformed result file {}: {}", path.display(), e);
                None
            }
        }
    }
}
