pub mod catalog;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod executor;
pub mod job;
pub mod options;
pub mod reports;
pub mod result;
pub mod service;
pub mod validator;

pub use catalog::{Task, TaskCatalog, TaskMap};
pub use cli::{BoltCli, CliOutput, CommandLine, MockBolt, RealBolt};
pub use config::Config;
pub use error::{CliInvocationError, ProxyError, ValidationError};
pub use executor::{DeleteOutcome, Executor, ExecutorStats};
pub use job::{Job, JobId, JobKind, JobStatus, TaskJob};
pub use result::JobResult;
pub use service::{BoltService, ResultResponse, StatusResponse, SubmitResponse};
pub use validator::{RequestValidator, ValidatedRun};
