//! Replay CLI command.
//!
//! Feeds recorded underlying (and optional option LTP) CSVs through the
//! strategy with paper fills and prints one report per trading day.

use anyhow::{Context, Result};
use clap::Args;
use orb_core::{ReportFormatter, TradeRecorder};
use orb_data::{
    CsvReplayFeed, CsvTradeJournal, FanoutRecorder, MemoryTradeJournal, PgTradeRepository,
};
use orb_execution::PaperBroker;
use orb_strategy::{RunOutcome, SessionRunner};
use std::path::Path;
use std::sync::Arc;

/// Arguments for the replay command.
#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// Config file path
    #[arg(short, long, default_value = "config/Orb.toml")]
    pub config: String,

    /// Profile overlay, e.g. `paper` loads `Orb.paper.toml` on top
    #[arg(long)]
    pub profile: Option<String>,

    /// Underlying candles or ticks CSV
    #[arg(short, long)]
    pub underlying: String,

    /// Option LTP CSV (`timestamp,instrument,price[,volume]`)
    #[arg(short, long)]
    pub options: Option<String>,

    /// Append closed trades to this CSV (overrides `journal.csv_path`)
    #[arg(short, long)]
    pub trades: Option<String>,

    /// Also record trades to PostgreSQL (uses DATABASE_URL env var if not provided)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
}

/// Runs the replay command.
///
/// # Errors
/// Returns an error if config, input files or the database cannot be opened,
/// or if a session stops on an order needing manual reconciliation.
pub async fn run_replay(args: ReplayArgs) -> Result<()> {
    let app = super::load_config(&args.config, args.profile.as_deref())?;
    app.strategy
        .validate()
        .with_context(|| format!("{} is not a valid strategy config", args.config))?;

    let memory = Arc::new(MemoryTradeJournal::new());
    let mut recorder = FanoutRecorder::new().with(memory.clone());

    if let Some(path) = args.trades.or(app.journal.csv_path) {
        let journal = CsvTradeJournal::open(&path)?;
        tracing::info!(path = %path, "Recording trades to CSV");
        recorder = recorder.with(Arc::new(journal));
    }
    if let Some(url) = args.database_url.or(app.journal.database_url) {
        let repo = PgTradeRepository::connect(&url).await?;
        tracing::info!("Recording trades to PostgreSQL");
        recorder = recorder.with(Arc::new(repo));
    }
    let recorder: Arc<dyn TradeRecorder> = Arc::new(recorder);

    let options = args.options.as_deref().map(Path::new);
    let mut feed = CsvReplayFeed::from_csv(&args.underlying, options)?;
    tracing::info!(
        underlying = %args.underlying,
        events = feed.len(),
        slippage_bps = %app.paper.slippage_bps,
        "Starting replay"
    );

    let broker = Arc::new(PaperBroker::new(app.paper.slippage_bps));
    let mut runner = SessionRunner::new(app.strategy, broker, recorder)?;
    let outcome = runner.run(&mut feed).await?;

    for report in outcome.reports() {
        println!("{}", ReportFormatter::format(report));
    }

    let trades = memory.trades();
    if !trades.is_empty() {
        println!("Trades:");
        for trade in &trades {
            println!(
                "  {}  {} {} x{}  {} -> {}  {:>10.2}  {}",
                trade.opened_at.format("%Y-%m-%d %H:%M:%S"),
                trade.side,
                trade.instrument,
                trade.quantity,
                trade.entry_price,
                trade.exit_price,
                trade.pnl,
                trade.exit_reason
            );
        }
        println!("Total P&L: {:.2}", memory.total_pnl());
    }

    if let RunOutcome::Suspended { error, .. } = outcome {
        let session = runner
            .current()
            .map(|session| session.trading_date().to_string())
            .unwrap_or_default();
        return Err(error).context(format!("Session {session} needs manual reconciliation"));
    }

    Ok(())
}
