use crate::cli::BoltCli;
use crate::command::task_run_command;
use crate::config::Config;
use crate::error::ProxyError;
use crate::options::scrub;
use crate::result::JobResult;
use crate::validator::ValidatedRun;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct JobId(pub String);

impl JobId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

/// `pending -> running -> success | failure | exception`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for a worker.
    Pending,
    Running,
    /// Every target succeeded.
    Success,
    /// Bolt ran, but at least one target failed.
    Failure,
    /// Bolt could not run, or its output could not be understood.
    Exception,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Failure | JobStatus::Exception
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Success => write!(f, "success"),
            JobStatus::Failure => write!(f, "failure"),
            JobStatus::Exception => write!(f, "exception"),
        }
    }
}

/// What a worker needs to run a job.
#[derive(Clone)]
pub struct JobContext {
    pub config: Arc<Config>,
    pub cli: Arc<dyn BoltCli>,
}

/// The kind-specific part of a job.
#[async_trait]
pub trait JobKind: Send + Sync {
    /// Short label used in logs.
    fn describe(&self) -> String;

    /// Run to completion. An `Err` is a bug or an environment problem, not a
    /// task outcome; task outcomes are carried in the returned result.
    async fn execute(&self, ctx: &JobContext) -> Result<JobResult, ProxyError>;

    /// Redacted command text, recorded on results even when `execute` fails.
    fn command_text(&self, _ctx: &JobContext) -> Option<String> {
        None
    }
}

/// Runs one Bolt task against a set of targets.
#[derive(Debug, Clone)]
pub struct TaskJob {
    pub run: ValidatedRun,
}

impl TaskJob {
    pub fn new(run: ValidatedRun) -> Self {
        Self { run }
    }
}

#[async_trait]
impl JobKind for TaskJob {
    fn describe(&self) -> String {
        format!(
            "task {} on {} target(s) with options {}",
            self.run.name,
            self.run.targets.len(),
            scrub(&self.run.options)
        )
    }

    async fn execute(&self, ctx: &JobContext) -> Result<JobResult, ProxyError> {
        let command = task_run_command(&self.run, &ctx.config);
        let command_text = command.redacted();
        info!("Running: {}", command_text);

        let output = ctx.cli.run(&command).await?;
        Ok(JobResult::decode(&command_text, &output))
    }

    fn command_text(&self, ctx: &JobContext) -> Option<String> {
        Some(task_run_command(&self.run, &ctx.config).redacted())
    }
}

#[derive(Debug, Clone)]
struct JobState {
    status: JobStatus,
    result: Option<Arc<JobResult>>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

/// A submitted job. Status and result change together under one lock, so a
/// reader never sees a terminal status without its result or vice versa.
pub struct Job {
    id: JobId,
    kind: Box<dyn JobKind>,
    submitted_at: DateTime<Utc>,
    state: Mutex<JobState>,
}

/// Point-in-time copy of a job's state.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(id: JobId, kind: Box<dyn JobKind>) -> Self {
        Self {
            id,
            kind,
            submitted_at: Utc::now(),
            state: Mutex::new(JobState {
                status: JobStatus::Pending,
                result: None,
                started_at: None,
                finished_at: None,
            }),
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn status(&self) -> JobStatus {
        self.state.lock().status
    }

    /// Present only once the job is terminal.
    pub fn result(&self) -> Option<Arc<JobResult>> {
        self.state.lock().result.clone()
    }

    /// Status and result read together.
    pub fn outcome(&self) -> (JobStatus, Option<Arc<JobResult>>) {
        let state = self.state.lock();
        (state.status, state.result.clone())
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let state = self.state.lock();
        JobSnapshot {
            id: self.id.clone(),
            status: state.status,
            submitted_at: self.submitted_at,
            started_at: state.started_at,
            finished_at: state.finished_at,
        }
    }

    pub fn describe(&self) -> String {
        self.kind.describe()
    }

    pub fn command_text(&self, ctx: &JobContext) -> Option<String> {
        self.kind.command_text(ctx)
    }

    /// Move `pending -> running`. Returns false if the job already left `pending`.
    pub fn mark_running(&self) -> bool {
        let mut state = self.state.lock();
        if state.status != JobStatus::Pending {
            return false;
        }
        state.status = JobStatus::Running;
        state.started_at = Some(Utc::now());
        true
    }

    /// Record the terminal result. The status is taken from the result.
    /// Returns false if the job was already terminal.
    pub fn finish(&self, result: JobResult) -> bool {
        let mut state = self.state.lock();
        if state.status.is_terminal() {
            return false;
        }
        state.status = if result.status.is_terminal() {
            result.status
        } else {
            JobStatus::Exception
        };
        state.result = Some(Arc::new(result));
        state.finished_at = Some(Utc::now());
        true
    }

    /// Worker entry point: run the job and persist its result.
    pub async fn process(&self, ctx: &JobContext) {
        if !self.mark_running() {
            warn!("Job {} picked up twice, skipping", self.id);
            return;
        }
        info!("Job {} running {}", self.id, self.kind.describe());

        let result = match self.kind.execute(ctx).await {
            Ok(result) => result,
            Err(e) => {
                error!("Job {} failed internally: {}", self.id, e);
                JobResult::internal_error(self.command_text(ctx), &e.to_string())
            }
        };

        self.complete(&ctx.config, result);
    }

    /// Persist then publish the terminal result.
    pub fn complete(&self, config: &Config, result: JobResult) {
        if let Err(e) = result.write_to(&config.result_path(self.id.as_str())) {
            warn!("Failed to persist result of job {}: {}", self.id, e);
        }
        let status = result.status;
        if self.finish(result) {
            info!("Job {} finished: {}", self.id, status);
        }
    }
}
