use clap::{Parser, Subcommand};
use tracing::info;

mod verify;

#[derive(Parser)]
#[command(name = "cmdpool")]
#[command(about = "cmdpool - pooled Vulkan command buffers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a Vulkan device and run transfer and general submissions through a pool
    Verify {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<String>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    cmdpool_common::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Verify { config, json } => {
            let path = config.unwrap_or_else(cmdpool_core::config::default_config_path);
            info!("verifying command pool with config {}", path);
            verify::run_verify(&path, json)?;
        }

        Commands::Config { config } => {
            let path = config.unwrap_or_else(cmdpool_core::config::default_config_path);
            let config = cmdpool_core::CmdpoolConfig::load_or_default(&path);
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
