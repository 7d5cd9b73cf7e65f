use bolt_core::Config;
use tracing::info;

pub async fn run(config: Config, reload: bool) -> anyhow::Result<()> {
    let service = super::service(config)?;
    let tasks = service.list_tasks(reload).await?;
    info!(
        "{} tasks (catalog generation {})",
        tasks.as_object().map_or(0, |t| t.len()),
        service.catalog().generation()
    );
    super::print_json(&tasks)
}
