use super::{BoltCli, CliOutput, CommandLine};
use crate::error::ProxyError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

/// Scripted Bolt for tests: answers from rules matched against the command text.
pub struct MockBolt {
    /// (needle, output); the first rule whose needle occurs in the command wins.
    rules: Mutex<Vec<(String, CliOutput)>>,
    /// Every command received, in order.
    pub calls: Mutex<Vec<CommandLine>>,
    delay: Option<Duration>,
}

impl Default for MockBolt {
    fn default() -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }
}

impl MockBolt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every invocation, to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer any command containing `needle` with the given output.
    pub fn respond(&self, needle: &str, stdout: &str, stderr: &str, exit_code: i32) {
        self.rules
            .lock()
            .push((needle.to_string(), CliOutput::new(stdout, stderr, exit_code)));
    }

    /// Drop every rule.
    pub fn clear(&self) {
        self.rules.lock().clear();
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of recorded commands containing `needle`.
    pub fn calls_matching(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.to_string().contains(needle))
            .count()
    }

    pub fn last_call(&self) -> Option<CommandLine> {
        self.calls.lock().last().cloned()
    }
}

#[async_trait]
impl BoltCli for MockBolt {
    async fn run(&self, command: &CommandLine) -> Result<CliOutput, ProxyError> {
        self.calls.lock().push(command.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let text = command.to_string();
        let rules = self.rules.lock();
        let output = rules
            .iter()
            .find(|(needle, _)| text.contains(needle.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| CliOutput::new("", "mock: no response configured", 1));
        Ok(output)
    }
}
