use crate::job::JobStatus;
use crate::result::JobResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

const REPORT_SOURCE: &str = "Bolt";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReportStatus {
    pub applied: u32,
    pub failed: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReportLog {
    pub source: &'static str,
    pub message: String,
    pub level: &'static str,
}

/// One report per target of a task run, in the shape a configuration
/// management server ingests.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TargetReport {
    pub host: String,
    pub reported_at: DateTime<Utc>,
    pub status: ReportStatus,
    pub logs: Vec<ReportLog>,
}

fn log_line(message: String, level: &'static str) -> ReportLog {
    ReportLog {
        source: REPORT_SOURCE,
        message,
        level,
    }
}

/// Expand a decoded run into per-target reports.
/// Returns an empty list unless the job ran and produced a report.
pub fn target_reports(result: &JobResult, reported_at: DateTime<Utc>) -> Vec<TargetReport> {
    if !matches!(result.status, JobStatus::Success | JobStatus::Failure) {
        return Vec::new();
    }
    let Some(items) = result.items() else {
        return Vec::new();
    };

    items
        .iter()
        .map(|item| item_report(result, item, reported_at))
        .collect()
}

fn item_report(result: &JobResult, item: &Value, reported_at: DateTime<Utc>) -> TargetReport {
    let host = item
        .get("target")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let status = item.get("status").and_then(Value::as_str).unwrap_or_default();
    let data = item.get("value").cloned().unwrap_or(Value::Null);

    let mut logs = Vec::new();
    if let Some(command) = &result.command {
        logs.push(log_line(format!("Command: {}", command), "info"));
    }

    if let Some(err) = data.get("_error") {
        let field = |name: &str| {
            err.get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        logs.push(log_line(format!("Error kind: {}", field("kind")), "error"));
        logs.push(log_line(format!("Error message: {}", field("msg")), "error"));
        logs.push(log_line(
            format!("Error issue code: {}", field("issue_code")),
            "error",
        ));
    }

    logs.push(log_line(format!("Result: {}", data), "info"));
    if let Some(log) = result.log.as_deref().filter(|l| !l.is_empty()) {
        logs.push(log_line(format!("Task run log: {}", log), "info"));
    }
    if let Some(message) = item.get("message").and_then(Value::as_str) {
        logs.push(log_line(format!("Message: {}", message), "info"));
    }

    TargetReport {
        host,
        reported_at,
        status: ReportStatus {
            applied: u32::from(status == "success"),
            failed: u32::from(status == "failure"),
        },
        logs,
    }
}
