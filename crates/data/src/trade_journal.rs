use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use csv::Writer;
use orb_core::{ClosedTrade, TradeRecorder};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const HEADER: [&str; 10] = [
    "instrument",
    "side",
    "quantity",
    "entry_price",
    "exit_price",
    "pnl_points",
    "pnl",
    "exit_reason",
    "opened_at",
    "closed_at",
];

/// Appends closed trades to a CSV file, one row per trade.
pub struct CsvTradeJournal {
    path: PathBuf,
    writer: Mutex<Writer<File>>,
}

impl CsvTradeJournal {
    /// Opens `path` for appending, writing the header only if the file is new or empty.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or the header cannot be written.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open trade journal: {}", path.display()))?;
        let is_empty = file.metadata()?.len() == 0;

        let mut writer = Writer::from_writer(file);
        if is_empty {
            writer.write_record(HEADER)?;
            writer.flush()?;
        }

        Ok(Self {
            path,
            writer: Mutex::new(writer),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TradeRecorder for CsvTradeJournal {
    async fn record(&self, trade: &ClosedTrade) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow!("trade journal lock poisoned"))?;

        writer.write_record(&[
            trade.instrument.clone(),
            trade.side.to_string(),
            trade.quantity.to_string(),
            trade.entry_price.to_string(),
            trade.exit_price.to_string(),
            trade.pnl_points.to_string(),
            trade.pnl.to_string(),
            trade.exit_reason.to_string(),
            trade.opened_at.to_rfc3339(),
            trade.closed_at.to_rfc3339(),
        ])?;
        writer
            .flush()
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}
