use crate::error::ProxyError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Service-wide settings.
/// Loaded from ~/.config/bolt-proxy/settings.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_bolt_path")]
    pub bolt_path: String,
    /// Bolt project directory passed as `--project`.
    #[serde(default = "default_environment_path")]
    pub environment_path: PathBuf,
    /// Size of the worker pool.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Value of Bolt's `--concurrency` for every task run.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
    /// Value of Bolt's `--connect-timeout` in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u32,
    /// Directory holding one `<job-id>.json` result file per job.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Maximum number of queued (not yet started) jobs. Unbounded when absent.
    #[serde(default)]
    pub queue_capacity: Option<usize>,
    /// Seconds to wait for in-flight jobs on shutdown.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout: u64,
}

fn default_bolt_path() -> String {
    "bolt".to_string()
}

fn default_environment_path() -> PathBuf {
    PathBuf::from("/etc/puppetlabs/code/environments/production")
}

fn default_workers() -> usize {
    20
}

fn default_concurrency() -> u32 {
    100
}

fn default_connect_timeout() -> u32 {
    30
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/var/log/bolt-proxy")
}

fn default_shutdown_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bolt_path: default_bolt_path(),
            environment_path: default_environment_path(),
            workers: default_workers(),
            concurrency: default_concurrency(),
            connect_timeout: default_connect_timeout(),
            log_dir: default_log_dir(),
            queue_capacity: None,
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

impl Config {
    /// Load config from the default path, falling back to defaults when absent.
    pub fn load_default() -> anyhow::Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("bolt-proxy")
            .join("settings.yaml")
    }

    pub fn validate(&self) -> Result<(), ProxyError> {
        if self.workers == 0 {
            return Err(ProxyError::Config("'workers' must be at least 1".into()));
        }
        if self.queue_capacity == Some(0) {
            return Err(ProxyError::Config(
                "'queue_capacity' must be at least 1 when set".into(),
            ));
        }
        Ok(())
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }

    /// Where the persisted result of a job lives.
    pub fn result_path(&self, job_id: &str) -> PathBuf {
        self.log_dir.join(format!("{}.json", job_id))
    }
}
