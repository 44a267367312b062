//! lakeform CLI tool.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "lakeform")]
#[command(about = "Deploys and configures a cloud analytics environment", long_about = None)]
struct Cli {
    /// Control-plane API base URL
    #[arg(long, env = "LAKEFORM_API_URL", default_value = "http://localhost:8080")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply resources in dependency order, then run post-deployment steps
    Deploy {
        /// Path to the deployment configuration
        #[arg(default_value = "deploy.kdl")]
        config: String,
        /// Skip resources whose deployments already succeeded
        #[arg(long)]
        skip_if_applied: bool,
        /// Append-only run log file
        #[arg(long, default_value = "lakeform.log")]
        log_file: String,
    },
    /// Validate a deployment configuration without calling any API
    Validate {
        /// Path to the configuration file
        #[arg(default_value = "deploy.kdl")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Deploy {
            config,
            skip_if_applied,
            log_file,
        } => {
            commands::deploy(&cli.api_url, &config, skip_if_applied, &log_file).await?;
        }
        Commands::Validate { config } => {
            commands::validate(&config)?;
        }
    }

    Ok(())
}
