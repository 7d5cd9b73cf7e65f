mod common;

#[cfg(test)]
mod tests {
    use super::common::{catalog_bolt, package_request, test_config};
    use bolt_core::options::OptionValue;
    use bolt_core::{ProxyError, RequestValidator, TaskCatalog, ValidatedRun, ValidationError};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn validator() -> RequestValidator {
        let config = test_config(&std::env::temp_dir());
        let catalog = TaskCatalog::new(Arc::new(catalog_bolt()), &config);
        RequestValidator::new(Arc::new(catalog))
    }

    async fn validate(request: Value) -> Result<ValidatedRun, ProxyError> {
        validator().validate(&request).await
    }

    async fn rejection(request: Value) -> ValidationError {
        match validate(request).await {
            Err(ProxyError::Validation(e)) => e,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_valid_request_is_normalized() {
        let run = validate(json!({
            "name": "package",
            "parameters": { "action": " install ", "name": "nginx", "version": "" },
            "targets": " web1.example.com , web2.example.com ",
            "options": { "noop": "TRUE", "user": " admin ", "tmpdir": "  " }
        }))
        .await
        .unwrap();

        assert_eq!(run.name, "package");
        assert_eq!(run.parameters["action"], json!("install"));
        assert!(!run.parameters.contains_key("version"));
        assert_eq!(run.targets, vec!["web1.example.com", "web2.example.com"]);
        assert_eq!(run.options["noop"], OptionValue::Bool(true));
        assert_eq!(run.options["user"], OptionValue::Str("admin".into()));
        assert!(!run.options.contains_key("tmpdir"));
        // Declared default filled in.
        assert_eq!(run.options["transport"], OptionValue::Str("ssh".into()));
    }

    #[tokio::test]
    async fn test_missing_top_level_field() {
        for field in ["name", "parameters", "targets", "options"] {
            let mut request = package_request();
            request.as_object_mut().unwrap().remove(field);
            assert_eq!(
                rejection(request).await,
                ValidationError::MissingFields(vec![field.to_string()])
            );
        }
        assert_eq!(rejection(json!([1, 2])).await, ValidationError::NotAnObject);
    }

    #[tokio::test]
    async fn test_name_must_be_known() {
        let mut request = package_request();
        request["name"] = json!("");
        assert_eq!(rejection(request.clone()).await, ValidationError::EmptyName);

        request["name"] = json!("nope");
        assert_eq!(
            rejection(request).await,
            ValidationError::UnknownTask("nope".into())
        );
    }

    #[tokio::test]
    async fn test_missing_required_parameter_is_named() {
        let request = json!({
            "name": "service::restart",
            "parameters": {},
            "targets": "web1",
            "options": {}
        });
        assert_eq!(
            rejection(request).await,
            ValidationError::MissingParameters(vec!["p".into()])
        );
    }

    #[tokio::test]
    async fn test_all_missing_and_unknown_parameters_are_listed() {
        let mut request = package_request();
        request["parameters"] = json!({});
        assert_eq!(
            rejection(request.clone()).await,
            ValidationError::MissingParameters(vec!["action".into(), "name".into()])
        );

        request["parameters"] = json!({"action": "install", "name": "x", "foo": 1, "bar": 2});
        assert_eq!(
            rejection(request.clone()).await,
            ValidationError::UnknownParameters(vec!["bar".into(), "foo".into()])
        );

        request["parameters"] = json!("action=install");
        assert_eq!(
            rejection(request).await,
            ValidationError::ParametersNotMapping
        );
    }

    #[tokio::test]
    async fn test_targets_forms() {
        let mut request = package_request();
        request["targets"] = json!(["web1", "web2, web3", " "]);
        let run = validate(request.clone()).await.unwrap();
        assert_eq!(run.targets, vec!["web1", "web2", "web3"]);

        request["targets"] = json!(" , ");
        assert_eq!(rejection(request.clone()).await, ValidationError::EmptyTargets);

        request["targets"] = json!([]);
        assert_eq!(rejection(request.clone()).await, ValidationError::EmptyTargets);

        request["targets"] = json!(42);
        assert_eq!(rejection(request).await, ValidationError::InvalidTargets);
    }

    #[tokio::test]
    async fn test_unknown_options_are_listed() {
        let mut request = package_request();
        request["options"] = json!({"noop": true, "color": "red", "bogus": 1});
        assert_eq!(
            rejection(request.clone()).await,
            ValidationError::UnknownOptions(vec!["bogus".into(), "color".into()])
        );

        request["options"] = json!("noop");
        assert_eq!(rejection(request).await, ValidationError::OptionsNotMapping);
    }

    #[tokio::test]
    async fn test_boolean_option_coercion() {
        let mut request = package_request();
        request["options"] = json!({"noop": "bogus"});
        assert_eq!(
            rejection(request.clone()).await,
            ValidationError::InvalidBoolean {
                option: "noop".into(),
                value: "bogus".into()
            }
        );

        request["options"] = json!({"noop": false, "verbose": "False"});
        let run = validate(request).await.unwrap();
        assert_eq!(run.options["noop"], OptionValue::Bool(false));
        assert_eq!(run.options["verbose"], OptionValue::Bool(false));
    }

    #[tokio::test]
    async fn test_string_and_enum_options() {
        let mut request = package_request();
        request["options"] = json!({"user": 7});
        assert_eq!(
            rejection(request.clone()).await,
            ValidationError::NotAString {
                option: "user".into()
            }
        );

        request["options"] = json!({"transport": "telnet"});
        assert!(matches!(
            rejection(request.clone()).await,
            ValidationError::NotInSet { ref option, .. } if option == "transport"
        ));

        request["options"] = json!({"transport": " winrm ", "log-level": "trace"});
        let run = validate(request.clone()).await.unwrap();
        assert_eq!(run.options["transport"], OptionValue::Str("winrm".into()));
        assert_eq!(run.options["log-level"], OptionValue::Str("trace".into()));

        // A blank transport is "not provided", so the default applies.
        request["options"] = json!({"transport": ""});
        let run = validate(request).await.unwrap();
        assert_eq!(run.options["transport"], OptionValue::Str("ssh".into()));
    }

    #[tokio::test]
    async fn test_null_parameters_and_options_are_empty() {
        let request = json!({
            "name": "package",
            "parameters": null,
            "targets": "web1",
            "options": null
        });
        assert_eq!(
            rejection(request).await,
            ValidationError::MissingParameters(vec!["action".into(), "name".into()])
        );
    }

    #[tokio::test]
    async fn test_catalog_failure_is_not_a_validation_error() {
        let config = test_config(&std::env::temp_dir());
        let bolt = bolt_core::MockBolt::new();
        bolt.respond("task show --project", "", "no project", 1);
        let validator = RequestValidator::new(Arc::new(TaskCatalog::new(Arc::new(bolt), &config)));

        let err = validator.validate(&package_request()).await.unwrap_err();
        assert!(matches!(err, ProxyError::Cli(_)));
        assert!(!err.is_validation());
    }
}
