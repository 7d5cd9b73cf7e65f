pub mod mock;
pub mod real;

use crate::error::ProxyError;
use async_trait::async_trait;
use std::fmt;

pub use mock::MockBolt;
pub use real::RealBolt;

/// Replacement text for sensitive values in anything rendered for humans.
pub const REDACTED: &str = "*****";

/// A fully built invocation of the external tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    /// Indices into `args` of `--name=value` tokens whose value is masked
    /// in logs and stored command text.
    pub sensitive: Vec<usize>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            sensitive: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn push(&mut self, arg: impl Into<String>) {
        self.args.push(arg.into());
    }

    /// Append an argument whose value must not be shown.
    pub fn push_sensitive(&mut self, arg: impl Into<String>) {
        self.sensitive.push(self.args.len());
        self.args.push(arg.into());
    }

    /// Command text with the value of every sensitive argument masked.
    pub fn redacted(&self) -> String {
        let mut text = self.program.clone();
        for (i, arg) in self.args.iter().enumerate() {
            text.push(' ');
            if !self.sensitive.contains(&i) {
                text.push_str(arg);
                continue;
            }
            match arg.split_once('=') {
                Some((name, _)) => {
                    text.push_str(name);
                    text.push('=');
                    text.push_str(REDACTED);
                }
                None => text.push_str(REDACTED),
            }
        }
        text
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CliOutput {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }
}

/// Bolt CLI abstraction.
#[async_trait]
pub trait BoltCli: Send + Sync {
    /// Run the command to completion, capturing stdout, stderr and exit code together.
    async fn run(&self, command: &CommandLine) -> Result<CliOutput, ProxyError>;
}
