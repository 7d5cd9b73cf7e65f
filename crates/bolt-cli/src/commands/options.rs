use bolt_core::options::option_schema;

pub fn run() -> anyhow::Result<()> {
    super::print_json(option_schema())
}
