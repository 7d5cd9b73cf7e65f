use bolt_core::Config;
use std::path::Path;

const SAMPLE_CONFIG: &str = r#"# bolt-proxy configuration

# Bolt executable, resolved on PATH when not absolute
bolt_path: bolt

# Bolt project directory passed as --project
environment_path: /etc/puppetlabs/code/environments/production

# Jobs run at the same time
workers: 20

# Passed to Bolt as --concurrency and --connect-timeout
concurrency: 100
connect_timeout: 30

# Where job results are written as <job-id>.json
log_dir: /var/log/bolt-proxy

# Reject submissions once this many jobs are waiting (unbounded when unset)
# queue_capacity: 1000

# Seconds to wait for running jobs on shutdown
shutdown_timeout: 30
"#;

pub fn run(explicit: Option<&Path>, path: bool, init: bool) -> anyhow::Result<()> {
    let config_path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::default_path);

    if path {
        println!("{}", config_path.display());
        return Ok(());
    }

    if init {
        if config_path.exists() {
            println!("Config already exists at: {}", config_path.display());
            println!("Remove it first if you want to reinitialize.");
            return Ok(());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&config_path, SAMPLE_CONFIG)?;
        println!("Sample config written to: {}", config_path.display());
        return Ok(());
    }

    println!("Config path: {}", config_path.display());
    if !config_path.exists() {
        println!("Status:      not found, using defaults");
        println!("Run `bolt-proxy config --init` to create one.");
    }
    let config = if config_path.exists() {
        Config::load_from(&config_path)?
    } else {
        Config::default()
    };
    println!("{}", serde_yaml::to_string(&config)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_matches_defaults() {
        let parsed: Config = serde_yaml::from_str(SAMPLE_CONFIG).unwrap();
        let defaults = Config::default();
        assert_eq!(parsed.bolt_path, defaults.bolt_path);
        assert_eq!(parsed.environment_path, defaults.environment_path);
        assert_eq!(parsed.workers, defaults.workers);
        assert_eq!(parsed.log_dir, defaults.log_dir);
        assert_eq!(parsed.queue_capacity, None);
        assert!(parsed.validate().is_ok());
    }
}
