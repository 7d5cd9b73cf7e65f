//! The request/response surface a transport layer (HTTP, CLI) calls into.

use crate::catalog::{TaskCatalog, TaskMap};
use crate::cli::BoltCli;
use crate::config::Config;
use crate::error::ProxyError;
use crate::executor::{DeleteOutcome, Executor, ExecutorStats};
use crate::job::{JobId, JobStatus, TaskJob};
use crate::options::{option_schema, OptionSchema};
use crate::result::JobResult;
use crate::validator::RequestValidator;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Status reported for ids that are neither in memory nor on disk.
pub const NOT_FOUND: &str = "invalid";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SubmitResponse {
    pub id: JobId,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ResultResponse {
    Found(JobResult),
    /// Known job that has not finished yet.
    Unfinished { status: JobStatus },
    NotFound { status: &'static str },
}

impl ResultResponse {
    pub fn found(&self) -> Option<&JobResult> {
        match self {
            ResultResponse::Found(result) => Some(result),
            ResultResponse::Unfinished { .. } | ResultResponse::NotFound { .. } => None,
        }
    }
}

pub struct BoltService {
    config: Arc<Config>,
    catalog: Arc<TaskCatalog>,
    validator: RequestValidator,
    executor: Executor,
}

impl BoltService {
    /// Build the catalog, validator and executor. Starts the worker pool, so
    /// this must run inside a tokio runtime.
    pub fn new(config: Config, cli: Arc<dyn BoltCli>) -> Result<Self, ProxyError> {
        config.validate()?;
        let config = Arc::new(config);
        let catalog = Arc::new(TaskCatalog::new(Arc::clone(&cli), &config));
        let validator = RequestValidator::new(Arc::clone(&catalog));
        let executor = Executor::new(Arc::clone(&config), cli);

        Ok(Self {
            config,
            catalog,
            validator,
            executor,
        })
    }

    /// Load the catalog in the background so the first listing does not pay for it.
    pub fn warm_catalog(&self) {
        let catalog = Arc::clone(&self.catalog);
        tokio::spawn(async move {
            if let Err(e) = catalog.get(false).await {
                warn!("Initial task catalog load failed: {}", e);
            }
        });
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<TaskCatalog> {
        &self.catalog
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub async fn tasks(&self, reload: bool) -> Result<Arc<TaskMap>, ProxyError> {
        self.catalog.get(reload).await
    }

    /// Task catalog as structured data.
    pub async fn list_tasks(&self, reload: bool) -> Result<Value, ProxyError> {
        let tasks = self.tasks(reload).await?;
        Ok(serde_json::to_value(&*tasks)?)
    }

    /// Recognised run options, sorted by name.
    pub fn list_options(&self) -> &'static OptionSchema {
        option_schema()
    }

    /// Validate a run request and hand it to the executor.
    pub async fn submit(&self, request: &Value) -> Result<SubmitResponse, ProxyError> {
        let run = self.validator.validate(request).await?;
        let id = self.executor.add_job(Box::new(TaskJob::new(run)))?;
        Ok(SubmitResponse { id })
    }

    pub fn status(&self, id: &str) -> StatusResponse {
        let status = match self.executor.status(id) {
            Some(status) => status.to_string(),
            None => {
                debug!("Status requested for unknown job {}", id);
                NOT_FOUND.to_string()
            }
        };
        StatusResponse { status }
    }

    pub fn result(&self, id: &str) -> ResultResponse {
        match self.executor.lookup(id) {
            Some((_, Some(result))) => ResultResponse::Found((*result).clone()),
            Some((status, None)) => ResultResponse::Unfinished { status },
            None => ResultResponse::NotFound { status: NOT_FOUND },
        }
    }

    pub fn delete_artifacts(&self, id: &str) -> Result<DeleteOutcome, ProxyError> {
        self.executor.delete_artifacts(id)
    }

    pub fn stats(&self) -> ExecutorStats {
        self.executor.stats()
    }

    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.executor.shutdown(timeout).await
    }
}
