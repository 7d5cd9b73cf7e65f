mod common;

#[cfg(test)]
mod tests {
    use super::common::{
        catalog_bolt, package_request, service_with, wait_for_terminal, RUN_FAILURE, RUN_SUCCESS,
    };
    use bolt_core::reports::target_reports;
    use bolt_core::service::NOT_FOUND;
    use bolt_core::{JobResult, JobStatus, ProxyError, ResultResponse};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_submit_runs_task_to_success() {
        let dir = tempfile::tempdir().unwrap();
        let bolt = Arc::new(catalog_bolt());
        bolt.respond("task run package", RUN_SUCCESS, "Started on web1.example.com...", 0);
        let service = service_with(bolt.clone(), dir.path());

        let submitted = service.submit(&package_request()).await.unwrap();
        let id = submitted.id.as_str();
        assert_eq!(
            serde_json::to_value(&submitted).unwrap(),
            json!({ "id": id })
        );

        assert_eq!(wait_for_terminal(&service, id).await, JobStatus::Success);
        assert_eq!(
            serde_json::to_value(service.status(id)).unwrap(),
            json!({ "status": "success" })
        );

        let response = service.result(id);
        let result = response.found().unwrap();
        assert_eq!(result.status, JobStatus::Success);
        assert_eq!(result.value["items"][0]["target"], "web1.example.com");
        assert_eq!(result.log.as_deref(), Some("Started on web1.example.com..."));
        assert_eq!(result.schema, 1);

        let command = bolt.last_call().unwrap().to_string();
        assert!(command.starts_with("bolt task run package --targets web1.example.com"));
        assert!(command.contains("--project /srv/project"));
        assert!(command.ends_with("action=install name=nginx"));
    }

    #[tokio::test]
    async fn test_partial_failure_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let bolt = Arc::new(catalog_bolt());
        bolt.respond("task run package", RUN_FAILURE, "", 1);
        let service = service_with(bolt, dir.path());

        let mut request = package_request();
        request["targets"] = json!(["web1.example.com", "web2.example.com"]);
        let id = service.submit(&request).await.unwrap().id;

        assert_eq!(
            wait_for_terminal(&service, id.as_str()).await,
            JobStatus::Failure
        );
        let response = service.result(id.as_str());
        let result = response.found().unwrap();
        assert_eq!(result.target_count(), Some(2));

        let reports = target_reports(result, chrono::Utc::now());
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].host, "web2.example.com");
        assert_eq!(reports[1].status.failed, 1);
    }

    #[tokio::test]
    async fn test_bolt_crash_is_exception() {
        let dir = tempfile::tempdir().unwrap();
        let bolt = Arc::new(catalog_bolt());
        bolt.respond("task run package", "", "segfault", 139);
        let service = service_with(bolt, dir.path());

        let id = service.submit(&package_request()).await.unwrap().id;
        assert_eq!(
            wait_for_terminal(&service, id.as_str()).await,
            JobStatus::Exception
        );
        let response = service.result(id.as_str());
        let result = response.found().unwrap();
        assert_eq!(
            result.message.as_deref(),
            Some("Command unexpectedly exited with code 139")
        );
    }

    #[tokio::test]
    async fn test_unknown_job_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(Arc::new(catalog_bolt()), dir.path());

        for id in ["0123abcd-0000-4000-8000-000000000000", "not-a-job", "../etc"] {
            assert_eq!(service.status(id).status, NOT_FOUND);
            let response = service.result(id);
            assert!(response.found().is_none());
            assert_eq!(
                serde_json::to_value(&response).unwrap(),
                json!({ "status": "invalid" })
            );
        }
    }

    #[tokio::test]
    async fn test_unfinished_job_reports_its_status() {
        let dir = tempfile::tempdir().unwrap();
        let bolt = Arc::new(catalog_bolt().with_delay(Duration::from_millis(300)));
        bolt.respond("task run package", RUN_SUCCESS, "", 0);
        let service = service_with(bolt, dir.path());

        let id = service.submit(&package_request()).await.unwrap().id;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(service.status(id.as_str()).status, "running");
        let response = service.result(id.as_str());
        assert!(response.found().is_none());
        assert_eq!(
            response,
            ResultResponse::Unfinished {
                status: JobStatus::Running
            }
        );
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({ "status": "running" })
        );

        assert_eq!(
            wait_for_terminal(&service, id.as_str()).await,
            JobStatus::Success
        );
        assert!(service.result(id.as_str()).found().is_some());
    }

    #[tokio::test]
    async fn test_rejected_submit_creates_no_job() {
        let dir = tempfile::tempdir().unwrap();
        let bolt = Arc::new(catalog_bolt());
        let service = service_with(bolt.clone(), dir.path());

        let mut request = package_request();
        request.as_object_mut().unwrap().remove("targets");
        let err = service.submit(&request).await.unwrap_err();
        assert!(err.is_validation());

        let mut request = package_request();
        request["name"] = json!("nope");
        let err = service.submit(&request).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(
            err.to_envelope()["error"]["message"],
            "Task nope not found."
        );

        assert_eq!(service.executor().job_count(), 0);
        assert_eq!(bolt.calls_matching("task run"), 0);
    }

    #[tokio::test]
    async fn test_persisted_result_matches_memory() {
        let dir = tempfile::tempdir().unwrap();
        let bolt = Arc::new(catalog_bolt());
        bolt.respond("task run package", RUN_SUCCESS, "", 0);
        let service = service_with(bolt, dir.path());

        let id = service.submit(&package_request()).await.unwrap().id;
        wait_for_terminal(&service, id.as_str()).await;

        let response = service.result(id.as_str());
        let in_memory = response.found().unwrap();
        let on_disk =
            JobResult::read_from_file(&service.config().result_path(id.as_str())).unwrap();
        assert_eq!(on_disk.schema, in_memory.schema);
        assert_eq!(on_disk.status, in_memory.status);
        assert_eq!(on_disk.value, in_memory.value);

        // A fresh service reading the same directory answers from disk.
        let restarted = service_with(Arc::new(catalog_bolt()), dir.path());
        assert_eq!(restarted.status(id.as_str()).status, "success");
        assert_eq!(restarted.result(id.as_str()), response);
    }

    #[tokio::test]
    async fn test_secrets_stay_out_of_results() {
        let dir = tempfile::tempdir().unwrap();
        let bolt = Arc::new(catalog_bolt());
        bolt.respond("task run package", RUN_SUCCESS, "", 0);
        let service = service_with(bolt.clone(), dir.path());

        let mut request = package_request();
        request["options"] = json!({ "user": "deploy", "password": "hunter2" });
        let id = service.submit(&request).await.unwrap().id;
        wait_for_terminal(&service, id.as_str()).await;

        let call = bolt.last_call().unwrap();
        assert!(call.args.contains(&"--password=hunter2".to_string()));

        let response = service.result(id.as_str());
        let command = response.found().unwrap().command.clone().unwrap();
        assert!(command.contains("--password=*****"));
        assert!(command.contains("--user=deploy"));

        let file = std::fs::read_to_string(service.config().result_path(id.as_str())).unwrap();
        assert!(!file.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_delete_then_status_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let bolt = Arc::new(catalog_bolt());
        bolt.respond("task run package", RUN_SUCCESS, "", 0);
        let service = service_with(bolt, dir.path());

        let id = service.submit(&package_request()).await.unwrap().id;
        wait_for_terminal(&service, id.as_str()).await;

        let outcome = service.delete_artifacts(id.as_str()).unwrap();
        assert_eq!(serde_json::to_value(&outcome).unwrap()["status"], "deleted");
        assert_eq!(service.status(id.as_str()).status, NOT_FOUND);

        let again = service.delete_artifacts(id.as_str()).unwrap();
        assert_eq!(serde_json::to_value(&again).unwrap()["status"], "not_found");

        assert!(matches!(
            service.delete_artifacts("../../etc/passwd"),
            Err(ProxyError::InvalidJobId(_))
        ));
    }

    #[tokio::test]
    async fn test_list_tasks_and_options() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(Arc::new(catalog_bolt()), dir.path());

        let tasks = service.list_tasks(false).await.unwrap();
        assert_eq!(
            tasks["package"]["description"],
            "Manage and inspect the state of packages"
        );
        assert_eq!(tasks["service::restart"]["parameters"]["p"]["type"], "String");

        let options = service.list_options();
        let names: Vec<_> = options.keys().copied().collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(options["password"].sensitive);

        let rendered = serde_json::to_value(options).unwrap();
        assert_eq!(rendered["transport"]["type"], json!(["ssh", "winrm"]));
        assert_eq!(rendered["transport"]["default"], "ssh");
        assert_eq!(rendered["noop"]["type"], "boolean");
    }

    #[tokio::test]
    async fn test_stats_and_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let bolt = Arc::new(catalog_bolt());
        bolt.respond("task run package", RUN_SUCCESS, "", 0);
        let service = service_with(bolt, dir.path());

        let id = service.submit(&package_request()).await.unwrap().id;
        wait_for_terminal(&service, id.as_str()).await;
        assert!(service.shutdown(Duration::from_secs(5)).await);

        let stats = service.stats();
        assert_eq!(stats.completed, 1);
        assert!(!stats.accepting);
        assert!(matches!(
            service.submit(&package_request()).await,
            Err(ProxyError::ShuttingDown)
        ));
    }
}
