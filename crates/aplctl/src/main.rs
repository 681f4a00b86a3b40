mod commands;
mod platform;
mod preflight;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "aplctl")]
#[command(about = "Deploy and tear down App Platform stacks on Linode", long_about = None)]
struct Cli {
    /// Config file (default: ./config.yaml, then ~/.aplcli/config.yaml)
    #[arg(long, global = true, env = "APLCTL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the platform stacks (infra, then apl)
    Deploy {
        /// Platform name from the config file
        #[arg(short, long)]
        name: String,
        /// Only run this stack (infra or apl)
        #[arg(short, long)]
        target: Option<String>,
    },
    /// Destroy the platform stacks (apl, then infra)
    Destroy {
        /// Platform name from the config file
        #[arg(short, long)]
        name: String,
        /// Only run this stack (infra or apl)
        #[arg(short, long)]
        target: Option<String>,
        /// Same as --purge-esc --purge-obj --purge-stack
        #[arg(long)]
        purge: bool,
        /// Delete the esc environment after the stacks are destroyed
        #[arg(long)]
        purge_esc: bool,
        /// Empty the object storage buckets before infra is destroyed
        #[arg(long)]
        purge_obj: bool,
        /// Remove the stack state after each destroy
        #[arg(long)]
        purge_stack: bool,
    },
    /// Create the esc environment with generated secrets
    Create {
        /// Platform name from the config file
        #[arg(short, long)]
        name: String,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    if matches!(cli.command, Commands::Version) {
        println!("aplctl {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    preflight::check()?;

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Deploy { name, target } => {
            commands::deploy::handle(config, &name, target).await?;
        }
        Commands::Destroy {
            name,
            target,
            purge,
            purge_esc,
            purge_obj,
            purge_stack,
        } => {
            let flags = commands::destroy::PurgeFlags {
                esc: purge || purge_esc,
                objects: purge || purge_obj,
                stack: purge || purge_stack,
            };
            commands::destroy::handle(config, &name, target, flags).await?;
        }
        Commands::Create { name } => {
            commands::create::handle(config, &name).await?;
        }
        Commands::Version => {
            unreachable!("Version is handled before the preflight checks");
        }
    }

    Ok(())
}
