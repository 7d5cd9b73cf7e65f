//! Cached task metadata fetched from `bolt task show`.
//!
//! The cache is replaced wholesale on every successful reload. A reload that
//! fails part way leaves the previous snapshot untouched.

use crate::cli::{BoltCli, CommandLine};
use crate::config::Config;
use crate::error::{CliInvocationError, ProxyError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub type TaskMap = BTreeMap<String, Task>;

fn default_parameter_type() -> String {
    "Any".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    #[serde(skip)]
    pub name: String,
    pub description: String,
    pub parameters: BTreeMap<String, TaskParameter>,
}

/// One entry of a task's parameter schema, as declared in its metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskParameter {
    #[serde(rename = "type", default = "default_parameter_type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Anything else the metadata declares (sensitive, default, ...), passed through.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskParameter {
    pub fn is_optional(&self) -> bool {
        self.type_name.starts_with("Optional[")
    }
}

impl Task {
    /// Declared parameters the caller must supply, in name order.
    pub fn required_parameters(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(|(_, p)| !p.is_optional())
            .map(|(name, _)| name.as_str())
    }
}

#[derive(Deserialize)]
struct TaskListing {
    tasks: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
struct TaskDetail {
    #[serde(default)]
    metadata: Option<TaskMetadata>,
}

#[derive(Deserialize)]
struct TaskMetadata {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<BTreeMap<String, TaskParameter>>,
}

pub struct TaskCatalog {
    cli: Arc<dyn BoltCli>,
    program: String,
    project: PathBuf,
    cached: Mutex<Option<Arc<TaskMap>>>,
    /// Bumped after every successful reload, while the lock is still held.
    generation: AtomicU64,
}

impl TaskCatalog {
    pub fn new(cli: Arc<dyn BoltCli>, config: &Config) -> Self {
        Self {
            cli,
            program: config.bolt_path.clone(),
            project: config.environment_path.clone(),
            cached: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Return the cached catalog, loading it if it is absent or `force_reload` is set.
    ///
    /// The lock is held for the whole reload. A forced caller that queued up
    /// behind a reload which completed while it waited adopts that result
    /// instead of fetching again.
    pub async fn get(&self, force_reload: bool) -> Result<Arc<TaskMap>, ProxyError> {
        let observed = self.generation.load(Ordering::Acquire);
        let mut cached = self.cached.lock().await;

        if let Some(tasks) = cached.as_ref() {
            let reloaded_while_waiting = self.generation.load(Ordering::Acquire) != observed;
            if !force_reload || reloaded_while_waiting {
                return Ok(Arc::clone(tasks));
            }
        }

        let tasks = Arc::new(self.fetch_all().await?);
        *cached = Some(Arc::clone(&tasks));
        self.generation.fetch_add(1, Ordering::AcqRel);
        Ok(tasks)
    }

    /// Number of successful reloads since construction.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    async fn fetch_all(&self) -> Result<TaskMap, ProxyError> {
        info!("Reloading task catalog from {}", self.project.display());

        let command = self.show_command(None);
        let stdout = self
            .query(&command, "Error occurred when fetching tasks names.")
            .await?;
        let names = parse_task_names(&stdout, &command)?;
        debug!("Found {} tasks", names.len());

        let mut tasks = TaskMap::new();
        for name in names {
            let command = self.show_command(Some(&name));
            let message = format!("Error occurred when fetching task information for {}", name);
            let stdout = self.query(&command, &message).await?;
            let task = parse_task_metadata(&name, &stdout, &command)?;
            tasks.insert(name, task);
        }

        info!("Task catalog loaded with {} tasks", tasks.len());
        Ok(tasks)
    }

    fn show_command(&self, name: Option<&str>) -> CommandLine {
        let mut command = CommandLine::new(&self.program).arg("task").arg("show");
        if let Some(name) = name {
            command.push(name);
        }
        command
            .arg("--project")
            .arg(self.project.display().to_string())
            .arg("--format")
            .arg("json")
    }

    async fn query(&self, command: &CommandLine, message: &str) -> Result<String, ProxyError> {
        let output = self.cli.run(command).await?;
        if output.exit_code != 0 {
            warn!("{} ({} exited {})", message, command, output.exit_code);
            return Err(CliInvocationError {
                message: message.to_string(),
                exitcode: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
                command: command.to_string(),
            }
            .into());
        }
        Ok(output.stdout)
    }
}

fn parse_task_names(stdout: &str, command: &CommandLine) -> Result<Vec<String>, ProxyError> {
    let parse_error = |detail: String| ProxyError::Parse {
        message: "Error occurred when parsing 'bolt task show' output.".into(),
        detail,
        command: command.to_string(),
    };

    let listing: TaskListing =
        serde_json::from_str(stdout).map_err(|e| parse_error(e.to_string()))?;

    listing
        .tasks
        .iter()
        .map(|entry| {
            entry
                .first()
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| parse_error(format!("unexpected task entry {}", Value::from(entry.clone()))))
        })
        .collect()
}

fn parse_task_metadata(
    name: &str,
    stdout: &str,
    command: &CommandLine,
) -> Result<Task, ProxyError> {
    let detail: TaskDetail = serde_json::from_str(stdout).map_err(|e| ProxyError::Parse {
        message: format!("Error occurred when parsing 'bolt task show {}' output.", name),
        detail: e.to_string(),
        command: command.to_string(),
    })?;

    let metadata = detail.metadata.ok_or_else(|| ProxyError::Parse {
        message: format!("Invalid metadata found for task {}", name),
        detail: stdout.to_string(),
        command: command.to_string(),
    })?;

    Ok(Task {
        name: name.to_string(),
        description: metadata.description.unwrap_or_default(),
        parameters: metadata.parameters.unwrap_or_default(),
    })
}
