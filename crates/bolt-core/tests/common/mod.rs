#![allow(dead_code)]

use bolt_core::{BoltService, Config, JobStatus, MockBolt};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const TASK_LIST: &str = r#"{
  "tasks": [
    ["package", "Manage and inspect the state of packages"],
    ["service::restart", null]
  ],
  "modulepath": ["/srv/project/modules"]
}"#;

pub const PACKAGE_TASK: &str = r#"{
  "name": "package",
  "metadata": {
    "description": "Manage and inspect the state of packages",
    "parameters": {
      "action": { "type": "Enum[install, status, uninstall, upgrade]", "description": "The operation" },
      "name": { "type": "String[1]" },
      "version": { "type": "Optional[String[1]]" },
      "settings": { "type": "Optional[Hash]" },
      "extra_args": { "type": "Optional[Array[String]]" }
    }
  },
  "files": []
}"#;

pub const RESTART_TASK: &str = r#"{
  "name": "service::restart",
  "metadata": {
    "parameters": {
      "p": { "type": "String" }
    }
  }
}"#;

pub const RUN_SUCCESS: &str = r#"{"items":[{"target":"web1.example.com","action":"task","object":"package","status":"success","value":{"status":"installed","version":"1.2.3"}}],"target_count":1,"elapsed_time":2}"#;

pub const RUN_FAILURE: &str = r#"{"items":[{"target":"web1.example.com","action":"task","object":"package","status":"success","value":{"status":"installed"}},{"target":"web2.example.com","action":"task","object":"package","status":"failure","value":{"_error":{"kind":"puppetlabs.tasks/task-error","msg":"package not found","issue_code":"TASK_ERROR"}}}],"target_count":2,"elapsed_time":3}"#;

pub fn test_config(log_dir: &Path) -> Config {
    Config {
        environment_path: "/srv/project".into(),
        log_dir: log_dir.to_path_buf(),
        workers: 2,
        ..Config::default()
    }
}

/// A Bolt that knows the `package` and `service::restart` tasks.
pub fn catalog_bolt() -> MockBolt {
    let bolt = MockBolt::new();
    add_catalog_responses(&bolt);
    bolt
}

pub fn add_catalog_responses(bolt: &MockBolt) {
    bolt.respond("task show package", PACKAGE_TASK, "", 0);
    bolt.respond("task show service::restart", RESTART_TASK, "", 0);
    bolt.respond("task show --project", TASK_LIST, "", 0);
}

pub fn package_request() -> serde_json::Value {
    serde_json::json!({
        "name": "package",
        "parameters": { "action": "install", "name": "nginx" },
        "targets": "web1.example.com",
        "options": {}
    })
}

/// Poll until the job is terminal, panicking after five seconds.
pub async fn wait_for_terminal(service: &BoltService, id: &str) -> JobStatus {
    for _ in 0..500 {
        if let Some(status) = service.executor().status(id) {
            if status.is_terminal() {
                return status;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} did not finish in time", id);
}

pub fn service_with(bolt: Arc<MockBolt>, log_dir: &Path) -> BoltService {
    BoltService::new(test_config(log_dir), bolt).unwrap()
}
