use clap::{Parser, Subcommand};

mod commands;

use commands::{CheckConfigArgs, ReplayArgs};

#[derive(Parser)]
#[command(name = "orb")]
#[command(about = "Opening-range breakout + VWAP options strategy", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded market data through paper execution, one session per day
    Replay(ReplayArgs),
    /// Validate a config file and print the effective strategy settings
    CheckConfig(CheckConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay(args) => {
            commands::run_replay(args).await?;
        }
        Commands::CheckConfig(args) => {
            commands::run_check_config(&args)?;
        }
    }

    Ok(())
}
