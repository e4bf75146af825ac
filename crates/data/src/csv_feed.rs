use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orb_core::{Candle, DataProvider, MarketEvent, Tick};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

/// Replays recorded underlying and option samples in timestamp order.
pub struct CsvReplayFeed {
    events: Vec<MarketEvent>,
    current_index: usize,
}

impl CsvReplayFeed {
    /// Loads the underlying file and, optionally, an option LTP file.
    ///
    /// Underlying rows are either candles
    /// (`timestamp,symbol,open,high,low,close,volume`) or ticks
    /// (`timestamp,symbol,price[,volume]`). Option rows are
    /// `timestamp,instrument,price[,volume]`. Timestamps are RFC 3339; the
    /// underlying sample sorts first when both share a timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A file cannot be opened
    /// - A row has an unexpected number of columns
    /// - Timestamp or decimal parsing fails
    pub fn from_csv(underlying: impl AsRef<Path>, options: Option<&Path>) -> Result<Self> {
        let mut events = read_underlying(underlying.as_ref())?;
        if let Some(path) = options {
            events.extend(read_options(path)?);
        }
        Ok(Self::from_events(events))
    }

    /// Orders `events` by timestamp, underlying before options on ties.
    #[must_use]
    pub fn from_events(mut events: Vec<MarketEvent>) -> Self {
        events.sort_by_key(|e| {
            let is_option = matches!(e, MarketEvent::OptionTick { .. });
            (e.timestamp(), is_option)
        });
        Self {
            events,
            current_index: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.events.len() - self.current_index
    }
}

#[async_trait]
impl DataProvider for CsvReplayFeed {
    async fn next_event(&mut self) -> Result<Option<MarketEvent>> {
        if self.current_index < self.events.len() {
            let event = self.events[self.current_index].clone();
            self.current_index += 1;
            Ok(Some(event))
        } else {
            Ok(None)
        }
    }
}

fn read_underlying(path: &Path) -> Result<Vec<MarketEvent>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open underlying CSV: {}", path.display()))?;
    let mut events = Vec::new();

    for result in reader.records() {
        let record = result?;
        let line = record.position().map_or(0, csv::Position::line);
        let event = match record.len() {
            7 => MarketEvent::UnderlyingCandle(Candle {
                timestamp: timestamp(&record[0], line)?,
                open: decimal(&record[2], "open", line)?,
                high: decimal(&record[3], "high", line)?,
                low: decimal(&record[4], "low", line)?,
                close: decimal(&record[5], "close", line)?,
                volume: decimal(&record[6], "volume", line)?,
            }),
            3 | 4 => MarketEvent::UnderlyingTick(tick(&record, line)?),
            n => bail!(
                "{} line {line}: expected 3, 4 or 7 columns, got {n}",
                path.display()
            ),
        };
        events.push(event);
    }

    Ok(events)
}

fn read_options(path: &Path) -> Result<Vec<MarketEvent>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open option CSV: {}", path.display()))?;
    let mut events = Vec::new();

    for result in reader.records() {
        let record = result?;
        let line = record.position().map_or(0, csv::Position::line);
        if !matches!(record.len(), 3 | 4) {
            bail!(
                "{} line {line}: expected 3 or 4 columns, got {}",
                path.display(),
                record.len()
            );
        }
        events.push(MarketEvent::OptionTick {
            instrument: record[1].to_string(),
            tick: tick(&record, line)?,
        });
    }

    Ok(events)
}

fn tick(record: &csv::StringRecord, line: u64) -> Result<Tick> {
    let volume = match record.get(3) {
        Some(v) if !v.is_empty() => decimal(v, "volume", line)?,
        _ => Decimal::ZERO,
    };
    Ok(Tick::new(
        timestamp(&record[0], line)?,
        decimal(&record[2], "price", line)?,
        volume,
    ))
}

fn timestamp(raw: &str, line: u64) -> Result<DateTime<Utc>> {
    raw.parse()
        .with_context(|| format!("line {line}: invalid timestamp {raw:?}"))
}

fn decimal(raw: &str, field: &str, line: u64) -> Result<Decimal> {
    Decimal::from_str(raw).with_context(|| format!("line {line}: invalid {field} {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn loads_candles_in_order() {
        let file = write(
            "timestamp,symbol,open,high,low,close,volume\n\
             2024-05-02T09:16:00+05:30,BANKNIFTY,101,106,100,105,900\n\
             2024-05-02T09:15:00+05:30,BANKNIFTY,100,102,99,101,1200\n",
        );
        let mut feed = CsvReplayFeed::from_csv(file.path(), None).unwrap();
        assert_eq!(feed.len(), 2);

        let Some(MarketEvent::UnderlyingCandle(first)) = feed.next_event().await.unwrap() else {
            panic!("expected a candle");
        };
        assert_eq!(first.close, dec!(101));
        assert_eq!(first.timestamp.to_rfc3339(), "2024-05-02T03:45:00+00:00");

        assert!(feed.next_event().await.unwrap().is_some());
        assert!(feed.next_event().await.unwrap().is_none());
        assert_eq!(feed.remaining(), 0);
    }

    #[tokio::test]
    async fn ticks_without_volume_default_to_zero() {
        let file = write(
            "timestamp,symbol,price,volume\n\
             2024-05-02T03:50:00Z,BANKNIFTY,48000.5\n\
             2024-05-02T03:50:01Z,BANKNIFTY,48001,25\n",
        );
        let mut feed = CsvReplayFeed::from_csv(file.path(), None).unwrap();

        let Some(MarketEvent::UnderlyingTick(tick)) = feed.next_event().await.unwrap() else {
            panic!("expected a tick");
        };
        assert_eq!(tick.price, dec!(48000.5));
        assert_eq!(tick.volume, Decimal::ZERO);
    }

    #[tokio::test]
    async fn merges_option_ticks_after_underlying_on_ties() {
        let underlying = write(
            "timestamp,symbol,price,volume\n\
             2024-05-02T03:50:00Z,BANKNIFTY,48000,10\n",
        );
        let options = write(
            "timestamp,instrument,price\n\
             2024-05-02T03:49:59Z,BN-CE,210\n\
             2024-05-02T03:50:00Z,BN-CE,212\n",
        );
        let mut feed = CsvReplayFeed::from_csv(underlying.path(), Some(options.path())).unwrap();

        let mut kinds = Vec::new();
        while let Some(event) = feed.next_event().await.unwrap() {
            kinds.push(match event {
                MarketEvent::OptionTick { tick, .. } => format!("opt:{}", tick.price),
                _ => "und".to_string(),
            });
        }
        assert_eq!(kinds, vec!["opt:210", "und", "opt:212"]);
    }

    #[test]
    fn rejects_bad_rows() {
        let file = write(
            "timestamp,symbol,open,high,low,close,volume\n\
             2024-05-02T03:45:00Z,BANKNIFTY,100,abc,99,101,1200\n",
        );
        let err = CsvReplayFeed::from_csv(file.path(), None).err().unwrap();
        assert!(err.to_string().contains("invalid high"));

        let file = write("timestamp,symbol\n2024-05-02T03:45:00Z,BANKNIFTY\n");
        assert!(CsvReplayFeed::from_csv(file.path(), None).is_err());
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = CsvReplayFeed::from_csv("/nonexistent/underlying.csv", None)
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("underlying.csv"));
    }
}
