use anyhow::Result;
use bolt_core::ProxyError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "bolt-proxy")]
#[command(about = "Run Bolt tasks as asynchronous jobs", long_about = None)]
struct Cli {
    /// Config file (defaults to the per-user settings.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tasks Bolt knows about
    Tasks {
        /// Ask Bolt again instead of using the cached catalog
        #[arg(short, long)]
        reload: bool,
    },

    /// List the recognised run options
    Options,

    /// Run a task and wait for its result
    Run {
        /// Task name, e.g. package or service::restart
        name: String,

        /// Comma-separated target list
        #[arg(short, long)]
        targets: String,

        /// Task parameter as key=value; JSON values are parsed
        #[arg(short, long = "param")]
        params: Vec<String>,

        /// Run option as key=value
        #[arg(short, long = "option")]
        options: Vec<String>,
    },

    /// Show the status of a job
    Status {
        job_id: String,
    },

    /// Show the result of a finished job
    Result {
        job_id: String,
    },

    /// Delete the persisted result of a job
    Delete {
        job_id: String,
    },

    /// Show or create the config file
    Config {
        /// Print the config file path only
        #[arg(long)]
        path: bool,

        /// Write a sample config file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bolt_proxy=info,bolt_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = dispatch(cli).await {
        let envelope = match e.downcast_ref::<ProxyError>() {
            Some(err) => err.to_envelope(),
            None => serde_json::json!({ "error": { "message": e.to_string() } }),
        };
        println!("{}", envelope);
        std::process::exit(1);
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Config { path, init } => commands::config::run(config_path, path, init),
        Commands::Tasks { reload } => {
            commands::tasks::run(commands::load_config(config_path)?, reload).await
        }
        Commands::Options => commands::options::run(),
        Commands::Run {
            name,
            targets,
            params,
            options,
        } => {
            let config = commands::load_config(config_path)?;
            commands::run::run(config, name, targets, params, options).await
        }
        Commands::Status { job_id } => {
            commands::status::run(commands::load_config(config_path)?, &job_id)
        }
        Commands::Result { job_id } => {
            commands::result::run(commands::load_config(config_path)?, &job_id)
        }
        Commands::Delete { job_id } => {
            commands::delete::run(commands::load_config(config_path)?, &job_id)
        }
    }
}
