use crate::cli::BoltCli;
use crate::config::Config;
use crate::error::ProxyError;
use crate::job::{Job, JobContext, JobId, JobKind, JobSnapshot, JobStatus};
use crate::result::JobResult;
use dashmap::DashMap;
use parking_lot::Mutex;
use regex::Regex;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

static JOB_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-fA-F0-9-]+$").expect("job id pattern is valid"));

/// Job ids are uuids; anything else must never reach the filesystem.
pub fn is_valid_job_id(id: &str) -> bool {
    JOB_ID_PATTERN.is_match(id)
}

type JobQueue = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Arc<Job>>>>;

#[derive(Default)]
struct Counters {
    queued: AtomicUsize,
    running: AtomicUsize,
    completed: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ExecutorStats {
    /// Workers currently busy with a job.
    pub running: usize,
    /// Jobs submitted but not yet picked up.
    pub queued: usize,
    /// Jobs finished since start.
    pub completed: usize,
    /// Still accepting submissions.
    pub accepting: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted { job_id: String, path: PathBuf },
    NotFound { job_id: String },
}

/// Fixed-size worker pool plus the registry of every job it has been given.
///
/// Submission never waits on execution. The queue is unbounded unless
/// `queue_capacity` is configured.
pub struct Executor {
    ctx: JobContext,
    jobs: DashMap<JobId, Arc<Job>>,
    sender: Mutex<Option<mpsc::UnboundedSender<Arc<Job>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl Executor {
    /// Start `config.workers` workers. Must be called from within a tokio runtime.
    pub fn new(config: Arc<Config>, cli: Arc<dyn BoltCli>) -> Self {
        let ctx = JobContext { config, cli };
        let (sender, receiver) = mpsc::unbounded_channel();
        let queue: JobQueue = Arc::new(tokio::sync::Mutex::new(receiver));
        let counters = Arc::new(Counters::default());

        let worker_count = ctx.config.workers.max(1);
        let workers = (0..worker_count)
            .map(|n| {
                tokio::spawn(worker_loop(
                    n,
                    Arc::clone(&queue),
                    ctx.clone(),
                    Arc::clone(&counters),
                ))
            })
            .collect();
        info!("Executor started with {} workers", worker_count);

        Self {
            ctx,
            jobs: DashMap::new(),
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            counters,
        }
    }

    /// Register and enqueue a job, returning its freshly assigned id.
    pub fn add_job(&self, kind: Box<dyn JobKind>) -> Result<JobId, ProxyError> {
        let sender = self.sender.lock();
        let sender = sender.as_ref().ok_or(ProxyError::ShuttingDown)?;

        if let Some(capacity) = self.ctx.config.queue_capacity {
            let queued = self.counters.queued.load(Ordering::Acquire);
            if queued >= capacity {
                warn!("Rejecting job, {} already queued", queued);
                return Err(ProxyError::QueueFull(queued));
            }
        }

        let id = JobId::new();
        let job = Arc::new(Job::new(id.clone(), kind));
        self.jobs.insert(id.clone(), Arc::clone(&job));
        self.counters.queued.fetch_add(1, Ordering::AcqRel);

        if sender.send(Arc::clone(&job)).is_err() {
            self.jobs.remove(&id);
            self.counters.queued.fetch_sub(1, Ordering::AcqRel);
            return Err(ProxyError::ShuttingDown);
        }

        info!("Queued job {}: {}", id, job.describe());
        Ok(id)
    }

    /// Registry lookup, then the persisted result file. `None` means unknown.
    pub fn status(&self, id: &str) -> Option<JobStatus> {
        if let Some(job) = self.jobs.get(&JobId::from_string(id.to_string())) {
            return Some(job.status());
        }
        self.read_persisted(id).map(|result| result.status)
    }

    /// The terminal result of a job. `None` while it is still pending or
    /// running, or when the id is unknown.
    pub fn result(&self, id: &str) -> Option<Arc<JobResult>> {
        if let Some(job) = self.jobs.get(&JobId::from_string(id.to_string())) {
            return job.result();
        }
        self.read_persisted(id).map(Arc::new)
    }

    /// Current status together with the result, if there is one yet.
    pub fn lookup(&self, id: &str) -> Option<(JobStatus, Option<Arc<JobResult>>)> {
        if let Some(job) = self.jobs.get(&JobId::from_string(id.to_string())) {
            return Some(job.outcome());
        }
        self.read_persisted(id)
            .map(|result| (result.status, Some(Arc::new(result))))
    }

    /// Timestamps and status of a job still held in memory.
    pub fn snapshot(&self, id: &str) -> Option<JobSnapshot> {
        self.jobs
            .get(&JobId::from_string(id.to_string()))
            .map(|job| job.snapshot())
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            running: self.counters.running.load(Ordering::Acquire),
            queued: self.counters.queued.load(Ordering::Acquire),
            completed: self.counters.completed.load(Ordering::Acquire),
            accepting: self.is_accepting(),
        }
    }

    pub fn is_accepting(&self) -> bool {
        self.sender.lock().is_some()
    }

    /// Remove the persisted result of a finished job.
    pub fn delete_artifacts(&self, id: &str) -> Result<DeleteOutcome, ProxyError> {
        if !is_valid_job_id(id) {
            return Err(ProxyError::InvalidJobId(id.to_string()));
        }

        let path = self.ctx.config.result_path(id);
        if !path.exists() {
            warn!("Artifacts not found for job {}", id);
            return Ok(DeleteOutcome::NotFound {
                job_id: id.to_string(),
            });
        }

        let real_path = path.canonicalize()?;
        let log_dir = self.ctx.config.log_dir.canonicalize()?;
        if real_path == log_dir || !real_path.starts_with(&log_dir) {
            return Err(ProxyError::InvalidPath(real_path.display().to_string()));
        }

        std::fs::remove_file(&path)?;
        self.jobs
            .remove_if(&JobId::from_string(id.to_string()), |_, job| {
                job.status().is_terminal()
            });
        info!("Deleted artifacts for job {}", id);

        Ok(DeleteOutcome::Deleted {
            job_id: id.to_string(),
            path,
        })
    }

    /// Stop accepting jobs and wait up to `timeout` for queued and running jobs
    /// to finish. Returns whether everything finished in time. Work still
    /// outstanding afterwards keeps running in the background.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        drop(self.sender.lock().take());
        let workers = std::mem::take(&mut *self.workers.lock());
        info!("Shutting down executor, waiting up to {:?}", timeout);

        let drained = tokio::time::timeout(timeout, async move {
            for worker in workers {
                if let Err(e) = worker.await {
                    error!("Worker ended abnormally: {}", e);
                }
            }
        })
        .await
        .is_ok();

        if !drained {
            warn!(
                "Shutdown timed out with {} running and {} queued jobs",
                self.counters.running.load(Ordering::Acquire),
                self.counters.queued.load(Ordering::Acquire)
            );
        }
        drained
    }

    fn read_persisted(&self, id: &str) -> Option<JobResult> {
        if !is_valid_job_id(id) {
            return None;
        }
        JobResult::read_from_file(&self.ctx.config.result_path(id))
    }
}

async fn worker_loop(n: usize, queue: JobQueue, ctx: JobContext, counters: Arc<Counters>) {
    loop {
        let next = queue.lock().await.recv().await;
        let Some(job) = next else {
            break;
        };
        counters.queued.fetch_sub(1, Ordering::AcqRel);
        counters.running.fetch_add(1, Ordering::AcqRel);

        run_contained(&job, &ctx).await;

        counters.running.fetch_sub(1, Ordering::AcqRel);
        counters.completed.fetch_add(1, Ordering::AcqRel);
    }
    debug!("Worker {} exiting", n);
}

/// Run the job on its own task so a panic marks the job instead of killing the worker.
async fn run_contained(job: &Arc<Job>, ctx: &JobContext) {
    let task_job = Arc::clone(job);
    let task_ctx = ctx.clone();
    let handle = tokio::spawn(async move { task_job.process(&task_ctx).await });

    if let Err(e) = handle.await {
        error!("Job {} panicked: {}", job.id(), e);
        job.complete(
            &ctx.config,
            JobResult::internal_error(job.command_text(ctx), &format!("job panicked: {}", e)),
        );
    }
}
