use bolt_core::reports::target_reports;
use bolt_core::Config;
use serde_json::{json, Map, Value};
use tracing::info;

pub async fn run(
    config: Config,
    name: String,
    targets: String,
    params: Vec<String>,
    options: Vec<String>,
) -> anyhow::Result<()> {
    let request = json!({
        "name": name,
        "targets": targets,
        "parameters": key_values(&params, parse_value)?,
        "options": key_values(&options, |raw| Value::String(raw.to_string()))?,
    });

    let shutdown_timeout = config.shutdown_timeout();
    let service = super::service(config)?;
    let submitted = service.submit(&request).await?;
    super::print_json(&submitted)?;

    // Closing the queue lets the single job drain before we read it back.
    if !service.shutdown(shutdown_timeout).await {
        anyhow::bail!(
            "Job {} did not finish within {:?}",
            submitted.id,
            shutdown_timeout
        );
    }

    let response = service.result(submitted.id.as_str());
    if let Some(result) = response.found() {
        for report in target_reports(result, chrono::Utc::now()) {
            info!(
                "{}: applied={} failed={}",
                report.host, report.status.applied, report.status.failed
            );
        }
    }
    super::print_json(&response)
}

fn key_values(pairs: &[String], parse: impl Fn(&str) -> Value) -> anyhow::Result<Map<String, Value>> {
    let mut map = Map::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Expected key=value, got '{}'", pair))?;
        map.insert(key.trim().to_string(), parse(raw));
    }
    Ok(map)
}

/// `count=3` is a number and `tags=["a","b"]` an array; anything that is
/// not valid JSON is taken as a plain string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("3"), json!(3));
        assert_eq!(parse_value("[\"a\",\"b\"]"), json!(["a", "b"]));
        assert_eq!(parse_value("nginx"), json!("nginx"));
        assert_eq!(parse_value("true"), json!(true));
    }

    #[test]
    fn test_key_values() {
        let pairs = vec!["action=install".to_string(), "version=1.2=beta".to_string()];
        let map = key_values(&pairs, parse_value).unwrap();
        assert_eq!(map["action"], "install");
        assert_eq!(map["version"], "1.2=beta");

        assert!(key_values(&["oops".to_string()], parse_value).is_err());
    }
}
