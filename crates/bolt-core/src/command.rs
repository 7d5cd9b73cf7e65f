//! Builds the `bolt task run` invocation for a validated request.
//!
//! Token shapes here are what Bolt expects on its command line; keep them stable.

use crate::cli::CommandLine;
use crate::config::Config;
use crate::options::{
    is_sensitive, OptionValue, FLAG_NAMESPACE_PREFIX, LOG_LEVEL_OPTION, NO_NEGATION_OPTION,
};
use crate::validator::ValidatedRun;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// `bolt task run <name> --targets <csv> ... --format json [options] [parameters]`
pub fn task_run_command(run: &ValidatedRun, config: &Config) -> CommandLine {
    let mut command = CommandLine::new(&config.bolt_path)
        .arg("task")
        .arg("run")
        .arg(&run.name)
        .arg("--targets")
        .arg(run.targets.join(","))
        .arg("--no-save-rerun")
        .arg(format!("--concurrency={}", config.concurrency))
        .arg(format!("--connect-timeout={}", config.connect_timeout))
        .arg("--project")
        .arg(config.environment_path.display().to_string())
        .arg("--format")
        .arg("json")
        .arg("--no-color");

    for (key, value) in &run.options {
        for flag in flags_for(key, value) {
            if is_sensitive(key) {
                command.push_sensitive(flag);
            } else {
                command.push(flag);
            }
        }
    }
    for param in parameter_tokens(&run.parameters) {
        command.push(param);
    }

    command
}

/// Render run options as Bolt flags, in key order.
pub fn option_flags(options: &BTreeMap<String, OptionValue>) -> Vec<String> {
    options
        .iter()
        .flat_map(|(key, value)| flags_for(key, value))
        .collect()
}

fn flags_for(key: &str, value: &OptionValue) -> Vec<String> {
    if key == NO_NEGATION_OPTION && *value == OptionValue::Bool(false) {
        return Vec::new();
    }
    let flag = key.strip_prefix(FLAG_NAMESPACE_PREFIX).unwrap_or(key);
    match value {
        OptionValue::Bool(true) => vec![format!("--{}", flag)],
        OptionValue::Bool(false) => vec![format!("--no-{}", flag)],
        OptionValue::Str(s) => {
            let mut flags = vec![format!("--{}={}", flag, s)];
            // Bolt has both `--log-level trace` and `--trace`; only the former is exposed.
            if key == LOG_LEVEL_OPTION && s == "trace" {
                flags.push("--trace".to_string());
            }
            flags
        }
    }
}

/// Render task parameters as `key=value` tokens.
pub fn parameter_tokens(parameters: &Map<String, Value>) -> Vec<String> {
    parameters
        .iter()
        .map(|(key, value)| match value {
            Value::Array(items) => format!("{}='{}'", key, array_text(items)),
            Value::Object(_) => format!("{}='{}'", key, value),
            Value::String(s) => format!("{}={}", key, s),
            other => format!("{}={}", key, other),
        })
        .collect()
}

/// `[e1, e2]` with each element JSON-encoded.
fn array_text(items: &[Value]) -> String {
    let inner: Vec<String> = items.iter().map(Value::to_string).collect();
    format!("[{}]", inner.join(", "))
}
