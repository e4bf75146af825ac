use anyhow::{Context, Result};
use clap::Args;

/// Arguments for the check-config command.
#[derive(Args, Debug, Clone)]
pub struct CheckConfigArgs {
    /// Config file path
    #[arg(short, long, default_value = "config/Orb.toml")]
    pub config: String,

    /// Profile overlay, e.g. `paper` loads `Orb.paper.toml` on top
    #[arg(long)]
    pub profile: Option<String>,
}

/// Loads and validates the config, then prints the strategy section as JSON.
///
/// # Errors
/// Returns an error if the config cannot be loaded or fails validation.
pub fn run_check_config(args: &CheckConfigArgs) -> Result<()> {
    let app = super::load_config(&args.config, args.profile.as_deref())?;
    app.strategy
        .validate()
        .with_context(|| format!("{} is not a valid strategy config", args.config))?;

    tracing::info!(
        underlying = %app.strategy.underlying,
        quantity = %app.strategy.quantity(),
        "Config OK"
    );
    println!("{}", serde_json::to_string_pretty(&app.strategy)?);
    Ok(())
}
