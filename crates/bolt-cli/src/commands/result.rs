use bolt_core::Config;

pub fn run(config: Config, job_id: &str) -> anyhow::Result<()> {
    let service = super::service(config)?;
    super::print_json(&service.result(job_id))
}
