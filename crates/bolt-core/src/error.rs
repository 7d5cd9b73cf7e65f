use serde_json::{json, Map, Value};
use thiserror::Error;

/// Rejection reasons for an incoming run request. Raised before any job exists.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("You must provide values for 'name', 'parameters', 'targets', and 'options'. Missing: {0:?}")]
    MissingFields(Vec<String>),

    #[error("You must provide a value for 'name'.")]
    EmptyName,

    #[error("Task {0} not found.")]
    UnknownTask(String),

    #[error("The 'parameters' value should be a hash.")]
    ParametersNotMapping,

    #[error("Missing required parameters: {0:?}")]
    MissingParameters(Vec<String>),

    #[error("Unknown parameters: {0:?}")]
    UnknownParameters(Vec<String>),

    #[error("The 'targets' value should be a string or an array.")]
    InvalidTargets,

    #[error("The 'targets' value should not be empty.")]
    EmptyTargets,

    #[error("The 'options' value should be a hash.")]
    OptionsNotMapping,

    #[error("Invalid options specified: {0:?}")]
    UnknownOptions(Vec<String>),

    #[error("Option {option} must be a boolean 'true' or 'false'. Current value: {value}")]
    InvalidBoolean { option: String, value: String },

    #[error("Option {option} must be a string.")]
    NotAString { option: String },

    #[error("Option {option} must have a value when the option is specified.")]
    EmptyOption { option: String },

    #[error("Option {option} must have one of the following values: {allowed:?}")]
    NotInSet { option: String, allowed: Vec<String> },
}

/// The external tool ran but reported a non-zero exit during a metadata query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (exit code {exitcode})")]
pub struct CliInvocationError {
    pub message: String,
    pub exitcode: i32,
    pub stdout: String,
    pub stderr: String,
    pub command: String,
}

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Cli(#[from] CliInvocationError),

    #[error("{message}: {detail}")]
    Parse {
        message: String,
        detail: String,
        command: String,
    },

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid job ID format")]
    InvalidJobId(String),

    #[error("Invalid file path")]
    InvalidPath(String),

    #[error("Job queue is full ({0} jobs waiting)")]
    QueueFull(usize),

    #[error("Executor is shutting down and no longer accepts jobs")]
    ShuttingDown,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProxyError {
    /// Uniform `{"error": {...}}` envelope handed back to callers.
    pub fn to_envelope(&self) -> Value {
        let mut details = Map::new();
        details.insert("message".into(), Value::String(self.to_string()));
        match self {
            ProxyError::Validation(_) => {
                details.insert("kind".into(), json!("validation"));
            }
            ProxyError::Cli(e) => {
                details.insert("kind".into(), json!("cli"));
                details.insert("exitcode".into(), json!(e.exitcode));
                details.insert("stdout".into(), json!(e.stdout));
                details.insert("stderr".into(), json!(e.stderr));
                details.insert("command".into(), json!(e.command));
            }
            ProxyError::Parse { command, detail, .. } => {
                details.insert("kind".into(), json!("parse"));
                details.insert("exception".into(), json!(detail));
                details.insert("command".into(), json!(command));
            }
            ProxyError::InvalidJobId(id) => {
                details.insert("kind".into(), json!("invalid_job_id"));
                details.insert("job_id".into(), json!(id));
            }
            ProxyError::InvalidPath(path) => {
                details.insert("kind".into(), json!("invalid_path"));
                details.insert("path".into(), json!(path));
            }
            _ => {
                details.insert("kind".into(), json!("internal"));
            }
        }
        json!({ "error": details })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ProxyError::Validation(_))
    }
}
