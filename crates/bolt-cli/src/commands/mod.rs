pub mod config;
pub mod delete;
pub mod options;
pub mod result;
pub mod run;
pub mod status;
pub mod tasks;

use bolt_core::{BoltService, Config, RealBolt};
use std::path::Path;
use std::sync::Arc;

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load_default(),
    }
}

pub fn service(config: Config) -> anyhow::Result<BoltService> {
    Ok(BoltService::new(config, Arc::new(RealBolt::new()))?)
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
