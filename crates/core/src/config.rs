use crate::error::OrbError;
use crate::events::OptionSide;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub paper: PaperConfig,
    #[serde(default)]
    pub journal: JournalConfig,
}

/// Paper broker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: Decimal,
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            slippage_bps: default_slippage_bps(),
        }
    }
}

/// Where completed trades are recorded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JournalConfig {
    pub csv_path: Option<String>,
    pub database_url: Option<String>,
}

/// Parameters of one ORB + VWAP session. Immutable once a session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default = "default_underlying")]
    pub underlying: String,
    pub call_instrument: String,
    pub put_instrument: String,

    #[serde(default = "default_lot_size")]
    pub lot_size: i64,
    #[serde(default = "default_lots")]
    pub lots: i64,
    #[serde(default = "default_target_points")]
    pub target_points: Decimal,
    #[serde(default = "default_stop_points")]
    pub stop_points: Decimal,
    #[serde(default = "default_daily_max_loss")]
    pub daily_max_loss: Decimal,

    #[serde(default = "default_opening_window_start")]
    pub opening_window_start: NaiveTime,
    #[serde(default = "default_opening_window_end")]
    pub opening_window_end: NaiveTime,
    #[serde(default = "default_trade_window_start")]
    pub trade_window_start: NaiveTime,
    #[serde(default = "default_trade_window_end")]
    pub trade_window_end: NaiveTime,

    #[serde(default = "default_max_holding_secs")]
    pub max_holding_secs: i64,
    #[serde(default = "default_volume_window")]
    pub volume_window: usize,
    #[serde(default = "default_order_timeout_ms")]
    pub order_timeout_ms: u64,
    #[serde(default = "default_candle_interval_secs")]
    pub candle_interval_secs: i64,
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

fn default_slippage_bps() -> Decimal {
    Decimal::from(5)
}

fn default_underlying() -> String {
    "BANKNIFTY".to_string()
}

const fn default_lot_size() -> i64 {
    15
}

const fn default_lots() -> i64 {
    1
}

fn default_target_points() -> Decimal {
    Decimal::from(80)
}

fn default_stop_points() -> Decimal {
    Decimal::from(50)
}

fn default_daily_max_loss() -> Decimal {
    Decimal::from(3000)
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

fn default_opening_window_start() -> NaiveTime {
    hm(9, 15)
}

fn default_opening_window_end() -> NaiveTime {
    hm(9, 20)
}

fn default_trade_window_start() -> NaiveTime {
    hm(9, 20)
}

fn default_trade_window_end() -> NaiveTime {
    hm(10, 0)
}

const fn default_max_holding_secs() -> i64 {
    600 // 10 minutes
}

const fn default_volume_window() -> usize {
    5
}

const fn default_order_timeout_ms() -> u64 {
    5_000
}

const fn default_candle_interval_secs() -> i64 {
    60
}

const fn default_utc_offset_minutes() -> i32 {
    330 // IST
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            underlying: default_underlying(),
            call_instrument: String::new(),
            put_instrument: String::new(),
            lot_size: default_lot_size(),
            lots: default_lots(),
            target_points: default_target_points(),
            stop_points: default_stop_points(),
            daily_max_loss: default_daily_max_loss(),
            opening_window_start: default_opening_window_start(),
            opening_window_end: default_opening_window_end(),
            trade_window_start: default_trade_window_start(),
            trade_window_end: default_trade_window_end(),
            max_holding_secs: default_max_holding_secs(),
            volume_window: default_volume_window(),
            order_timeout_ms: default_order_timeout_ms(),
            candle_interval_secs: default_candle_interval_secs(),
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

impl StrategyConfig {
    /// Checks every field. Nothing is clamped.
    ///
    /// # Errors
    /// Returns `OrbError::ConfigInvalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), OrbError> {
        if self.lot_size <= 0 {
            return Err(OrbError::config(format!(
                "lot_size must be positive, got {}",
                self.lot_size
            )));
        }
        if self.lots <= 0 {
            return Err(OrbError::config(format!(
                "lots must be positive, got {}",
                self.lots
            )));
        }
        for (name, value) in [
            ("target_points", self.target_points),
            ("stop_points", self.stop_points),
            ("daily_max_loss", self.daily_max_loss),
        ] {
            if value <= Decimal::ZERO {
                return Err(OrbError::config(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.opening_window_start >= self.opening_window_end {
            return Err(OrbError::config(format!(
                "opening window start {} must be before end {}",
                self.opening_window_start, self.opening_window_end
            )));
        }
        if self.trade_window_start >= self.trade_window_end {
            return Err(OrbError::config(format!(
                "trade window start {} must be before end {}",
                self.trade_window_start, self.trade_window_end
            )));
        }
        if self.opening_window_end > self.trade_window_start {
            return Err(OrbError::config(format!(
                "opening window must end ({}) before the trade window starts ({})",
                self.opening_window_end, self.trade_window_start
            )));
        }
        if self.max_holding_secs <= 0 {
            return Err(OrbError::config("max_holding_secs must be positive"));
        }
        if self.volume_window == 0 {
            return Err(OrbError::config("volume_window must be at least 1"));
        }
        if self.order_timeout_ms == 0 {
            return Err(OrbError::config("order_timeout_ms must be positive"));
        }
        if self.candle_interval_secs <= 0 {
            return Err(OrbError::config("candle_interval_secs must be positive"));
        }
        if self.call_instrument.trim().is_empty() || self.put_instrument.trim().is_empty() {
            return Err(OrbError::config(
                "call_instrument and put_instrument must be set",
            ));
        }
        if self.call_instrument == self.put_instrument {
            return Err(OrbError::config(
                "call_instrument and put_instrument must differ",
            ));
        }
        if self.offset().is_none() {
            return Err(OrbError::config(format!(
                "utc_offset_minutes out of range: {}",
                self.utc_offset_minutes
            )));
        }
        Ok(())
    }

    /// Units per entry order: `lot_size * lots`.
    #[must_use]
    pub fn quantity(&self) -> Decimal {
        Decimal::from(self.lot_size) * Decimal::from(self.lots)
    }

    #[must_use]
    pub fn instrument_for(&self, side: OptionSide) -> &str {
        match side {
            OptionSide::Call => &self.call_instrument,
            OptionSide::Put => &self.put_instrument,
        }
    }

    #[must_use]
    pub fn max_holding(&self) -> Duration {
        Duration::seconds(self.max_holding_secs)
    }

    #[must_use]
    pub fn candle_interval(&self) -> Duration {
        Duration::seconds(self.candle_interval_secs)
    }

    #[must_use]
    pub const fn order_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.order_timeout_ms)
    }

    fn offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes.checked_mul(60)?)
    }

    /// Exchange-local wall clock for `ts`.
    #[must_use]
    pub fn local_datetime(&self, ts: DateTime<Utc>) -> NaiveDateTime {
        self.offset().map_or_else(
            || ts.naive_utc(),
            |offset| ts.with_timezone(&offset).naive_local(),
        )
    }

    #[must_use]
    pub fn local_time(&self, ts: DateTime<Utc>) -> NaiveTime {
        self.local_datetime(ts).time()
    }

    /// Trading date `ts` belongs to.
    #[must_use]
    pub fn trading_date(&self, ts: DateTime<Utc>) -> NaiveDate {
        self.local_datetime(ts).date()
    }

    /// UTC instant of exchange-local `local` on `date`.
    #[must_use]
    pub fn utc_at(&self, date: NaiveDate, local: NaiveTime) -> DateTime<Utc> {
        let offset = Duration::minutes(i64::from(self.utc_offset_minutes));
        DateTime::from_naive_utc_and_offset(date.and_time(local) - offset, Utc)
    }

    /// `[trade_window_start, trade_window_end]`
    #[must_use]
    pub fn in_trade_window(&self, local: NaiveTime) -> bool {
        self.trade_window_start <= local && local <= self.trade_window_end
    }
}
