//! One trading day of the ORB + VWAP strategy for one underlying.
//!
//! `OrbSession` feeds every underlying sample through the indicators, asks the
//! signal detector for a side while flat, and drives the position lifecycle
//! through the broker. Each `on_*` call takes `&mut self`, so an order
//! round-trip is a suspension point: the next sample is not looked at until
//! the current order's outcome is known.

use crate::lifecycle::{ExitRules, LifecycleState, PositionLifecycle};
use crate::opening_range::{OpeningRange, OpeningRangeTracker};
use crate::risk_ledger::RiskLedger;
use crate::signal::{detect_breakout, SignalInputs};
use crate::volume_filter::VolumeFilter;
use crate::vwap::VwapAccumulator;
use chrono::{DateTime, NaiveDate, Utc};
use orb_core::{
    Candle, ExitReason, MarketEvent, OptionSide, OrbError, OrderError, OrderFill, OrderPlacer,
    OrderRequest, OrderSide, Position, SessionReport, StrategyConfig, StrategyEvent, Tick,
    TradeRecorder,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

pub struct OrbSession {
    config: StrategyConfig,
    trading_date: NaiveDate,
    rules: ExitRules,
    vwap: VwapAccumulator,
    opening_range: OpeningRangeTracker,
    volume: VolumeFilter,
    lifecycle: PositionLifecycle,
    ledger: RiskLedger,
    broker: Arc<dyn OrderPlacer>,
    recorder: Arc<dyn TradeRecorder>,
    last_underlying_at: Option<DateTime<Utc>>,
    last_option_at: HashMap<String, DateTime<Utc>>,
    option_ltp: HashMap<String, Decimal>,
}

impl std::fmt::Debug for OrbSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrbSession")
            .field("underlying", &self.config.underlying)
            .field("trading_date", &self.trading_date)
            .field("state", &self.lifecycle.state().name())
            .field("realized_pnl", &self.ledger.realized_pnl())
            .finish_non_exhaustive()
    }
}

impl OrbSession {
    /// Fresh session: IDLE, empty indicators, zero P&L.
    ///
    /// # Errors
    /// Returns `OrbError::ConfigInvalid` if `config` fails validation.
    pub fn new(
        config: StrategyConfig,
        trading_date: NaiveDate,
        broker: Arc<dyn OrderPlacer>,
        recorder: Arc<dyn TradeRecorder>,
    ) -> Result<Self, OrbError> {
        config.validate()?;

        tracing::info!(
            underlying = %config.underlying,
            %trading_date,
            quantity = %config.quantity(),
            daily_max_loss = %config.daily_max_loss,
            "Starting ORB session"
        );

        Ok(Self {
            rules: ExitRules::from_config(&config),
            opening_range: OpeningRangeTracker::new(
                config.opening_window_start,
                config.opening_window_end,
            ),
            volume: VolumeFilter::new(config.volume_window),
            vwap: VwapAccumulator::new(),
            lifecycle: PositionLifecycle::new(),
            ledger: RiskLedger::new(),
            last_underlying_at: None,
            last_option_at: HashMap::new(),
            option_ltp: HashMap::new(),
            config,
            trading_date,
            broker,
            recorder,
        })
    }

    /// Routes a feed event to the matching handler.
    ///
    /// # Errors
    /// See [`Self::on_tick`].
    pub async fn on_event(&mut self, event: MarketEvent) -> Result<Vec<StrategyEvent>, OrbError> {
        match event {
            MarketEvent::UnderlyingTick(tick) => self.on_tick(tick).await,
            MarketEvent::UnderlyingCandle(candle) => self.on_candle(candle).await,
            MarketEvent::OptionTick { instrument, tick } => {
                self.on_option_tick(&instrument, tick).await
            }
        }
    }

    /// Underlying tick.
    ///
    /// # Errors
    /// `WrongSession` if the tick belongs to another trading date,
    /// `OrderAmbiguous` if an order placed in response timed out.
    pub async fn on_tick(&mut self, tick: Tick) -> Result<Vec<StrategyEvent>, OrbError> {
        self.check_session(tick.timestamp)?;
        if !self.advance_underlying(tick.timestamp) {
            return Ok(Vec::new());
        }
        self.on_underlying(tick.timestamp, tick.price, tick.volume, &[tick.price])
            .await
    }

    /// Underlying candle. VWAP and signals use the close; the opening range
    /// sees both extremes of the bar.
    ///
    /// # Errors
    /// Same as [`Self::on_tick`].
    pub async fn on_candle(&mut self, candle: Candle) -> Result<Vec<StrategyEvent>, OrbError> {
        self.check_session(candle.timestamp)?;
        let previous = self.last_underlying_at;
        if !self.advance_underlying(candle.timestamp) {
            return Ok(Vec::new());
        }

        if let Some(previous) = previous {
            let expected = previous + self.config.candle_interval();
            if candle.timestamp > expected {
                let gap = OrbError::FeedGap {
                    expected,
                    received: candle.timestamp,
                };
                tracing::warn!(underlying = %self.config.underlying, "{gap}");
            }
        }

        self.on_underlying(
            candle.timestamp,
            candle.close,
            candle.volume,
            &[candle.high, candle.low],
        )
        .await
    }

    /// Option last-traded price. Drives price-based exits for the open position.
    ///
    /// # Errors
    /// Same as [`Self::on_tick`].
    pub async fn on_option_tick(
        &mut self,
        instrument: &str,
        tick: Tick,
    ) -> Result<Vec<StrategyEvent>, OrbError> {
        self.check_session(tick.timestamp)?;

        if let Some(last) = self.last_option_at.get(instrument) {
            if tick.timestamp <= *last {
                tracing::debug!(
                    instrument,
                    timestamp = %tick.timestamp,
                    "Ignoring non-increasing option tick"
                );
                return Ok(Vec::new());
            }
        }
        self.last_option_at
            .insert(instrument.to_string(), tick.timestamp);
        self.option_ltp.insert(instrument.to_string(), tick.price);

        let mut events = Vec::new();
        let Some(position) = self.open_position() else {
            return Ok(events);
        };
        if position.instrument != instrument {
            return Ok(events);
        }

        let local = self.config.local_time(tick.timestamp);
        let ltp = Some(tick.price);
        if let Some(reason) = self.rules.check(position, ltp, tick.timestamp, local) {
            self.exit(reason, tick.timestamp, ltp, &mut events)
                .await?;
        }
        Ok(events)
    }

    /// Operator reconciliation of an order whose outcome was unknown.
    ///
    /// `Some(fill)` completes the pending transition; `None` means the order
    /// never filled and the machine falls back to the state it was leaving.
    /// Entry and exit times are taken from the fill, `now` only marks when
    /// the reconciliation happened.
    ///
    /// # Errors
    /// `NothingToResolve` unless an entry or exit is in doubt.
    pub async fn resolve_ambiguous(
        &mut self,
        fill: Option<OrderFill>,
        now: DateTime<Utc>,
    ) -> Result<Vec<StrategyEvent>, OrbError> {
        if !self.lifecycle.is_in_flight() {
            return Err(OrbError::NothingToResolve);
        }
        let entering = matches!(self.lifecycle.state(), LifecycleState::Entering { .. });

        let mut events = Vec::new();
        match (entering, fill) {
            (true, Some(fill)) => {
                let position = self.lifecycle.confirm_entry(&fill, fill.filled_at)?.clone();
                tracing::info!(
                    instrument = %position.instrument,
                    order_id = %position.entry_order_id,
                    entry_price = %position.entry_price,
                    resolved_at = %now,
                    "Ambiguous entry resolved as filled"
                );
                events.push(StrategyEvent::PositionOpened(position));
            }
            (true, None) => {
                let side = self.lifecycle.fail_entry()?;
                tracing::info!(%side, "Ambiguous entry resolved as not filled");
                events.push(StrategyEvent::EntryRejected {
                    side,
                    reason: "resolved as not filled".to_string(),
                });
            }
            (false, Some(fill)) => {
                tracing::info!(
                    order_id = %fill.order_id,
                    filled_at = %fill.filled_at,
                    resolved_at = %now,
                    "Ambiguous exit resolved as filled"
                );
                self.complete_exit(fill.fill_price, fill.filled_at, &mut events)
                    .await?;
            }
            (false, None) => {
                let reason = self.lifecycle.fail_exit()?;
                tracing::info!(%reason, "Ambiguous exit resolved as not filled");
                events.push(StrategyEvent::ExitRejected {
                    reason,
                    message: "resolved as not filled".to_string(),
                });
            }
        }
        Ok(events)
    }

    #[must_use]
    pub fn report(&self) -> SessionReport {
        SessionReport {
            trading_date: self.trading_date,
            underlying: self.config.underlying.clone(),
            trades: self.ledger.closed_trades(),
            wins: self.ledger.wins(),
            losses: self.ledger.losses(),
            realized_pnl: self.ledger.realized_pnl(),
            halted: self.lifecycle.is_halted(),
            position_open: self.lifecycle.position().is_some(),
            final_state: self.lifecycle.state().name().to_string(),
        }
    }

    #[must_use]
    pub const fn trading_date(&self) -> NaiveDate {
        self.trading_date
    }

    #[must_use]
    pub const fn config(&self) -> &StrategyConfig {
        &self.config
    }

    #[must_use]
    pub const fn state(&self) -> &LifecycleState {
        self.lifecycle.state()
    }

    #[must_use]
    pub const fn position(&self) -> Option<&Position> {
        self.lifecycle.position()
    }

    #[must_use]
    pub fn vwap(&self) -> Option<Decimal> {
        self.vwap.value()
    }

    #[must_use]
    pub const fn opening_range(&self) -> Option<OpeningRange> {
        self.opening_range.range()
    }

    #[must_use]
    pub fn average_volume(&self) -> Decimal {
        self.volume.average()
    }

    #[must_use]
    pub const fn ledger(&self) -> &RiskLedger {
        &self.ledger
    }

    fn check_session(&self, ts: DateTime<Utc>) -> Result<(), OrbError> {
        let received = self.config.trading_date(ts);
        if received == self.trading_date {
            return Ok(());
        }
        tracing::warn!(
            expected = %self.trading_date,
            %received,
            "Sample belongs to another trading session"
        );
        Err(OrbError::WrongSession {
            expected: self.trading_date,
            received,
        })
    }

    /// Moves the underlying clock forward. False for duplicates and stale samples.
    fn advance_underlying(&mut self, ts: DateTime<Utc>) -> bool {
        if let Some(last) = self.last_underlying_at {
            if ts <= last {
                tracing::debug!(timestamp = %ts, last = %last, "Ignoring non-increasing underlying sample");
                return false;
            }
        }
        self.last_underlying_at = Some(ts);
        true
    }

    fn open_position(&self) -> Option<&Position> {
        match self.lifecycle.state() {
            LifecycleState::Open(position) => Some(position),
            _ => None,
        }
    }

    async fn on_underlying(
        &mut self,
        ts: DateTime<Utc>,
        price: Decimal,
        volume: Decimal,
        range_prices: &[Decimal],
    ) -> Result<Vec<StrategyEvent>, OrbError> {
        let local = self.config.local_time(ts);

        self.vwap.update(price, volume);
        for p in range_prices {
            self.opening_range.observe(local, *p);
        }

        let mut events = Vec::new();
        if !self.config.in_trade_window(local) {
            if let Some(position) = self.open_position() {
                let ltp = self.last_ltp(position);
                if let Some(reason) = self.rules.check(position, ltp, ts, local) {
                    self.exit(reason, ts, ltp, &mut events).await?;
                }
            }
            return Ok(events);
        }

        let average_volume = self.volume.average();
        self.volume.push(volume);

        if let Some(position) = self.open_position() {
            let ltp = self.last_ltp(position);
            if let Some(reason) = self.rules.check(position, ltp, ts, local) {
                self.exit(reason, ts, ltp, &mut events).await?;
            }
            return Ok(events);
        }

        let side = detect_breakout(&SignalInputs {
            price,
            volume,
            opening_range: self.opening_range.range(),
            vwap: self.vwap.value(),
            average_volume,
        });
        let Some(side) = side else {
            return Ok(events);
        };

        if self.lifecycle.is_idle() {
            self.enter(side, ts, &mut events).await?;
        } else {
            tracing::debug!(
                %side,
                state = self.lifecycle.state().name(),
                "Signal suppressed"
            );
        }
        Ok(events)
    }

    /// Last option LTP for the position's instrument, if one has been seen.
    fn last_ltp(&self, position: &Position) -> Option<Decimal> {
        self.option_ltp.get(&position.instrument).copied()
    }

    async fn place(&self, request: &OrderRequest) -> Result<OrderFill, OrderError> {
        match tokio::time::timeout(self.config.order_timeout(), self.broker.place(request)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(OrderError::Timeout { order_id: None }),
        }
    }

    async fn enter(
        &mut self,
        side: OptionSide,
        ts: DateTime<Utc>,
        events: &mut Vec<StrategyEvent>,
    ) -> Result<(), OrbError> {
        let instrument = self.config.instrument_for(side).to_string();
        let quantity = self.config.quantity();
        self.lifecycle.begin_entry(side, &instrument)?;

        tracing::info!(
            %side,
            instrument = %instrument,
            %quantity,
            vwap = ?self.vwap.value(),
            opening_range = ?self.opening_range.range(),
            "Breakout signal, entering"
        );
        events.push(StrategyEvent::EntryRequested {
            side,
            instrument: instrument.clone(),
            quantity,
            at: ts,
        });

        let request = OrderRequest {
            instrument: instrument.clone(),
            side: OrderSide::Buy,
            quantity,
            reference_price: self.option_ltp.get(&instrument).copied(),
            requested_at: ts,
        };

        match self.place(&request).await {
            Ok(fill) => {
                let position = self.lifecycle.confirm_entry(&fill, ts)?.clone();
                tracing::info!(
                    instrument = %position.instrument,
                    order_id = %position.entry_order_id,
                    entry_price = %position.entry_price,
                    quantity = %position.quantity,
                    "Position opened"
                );
                events.push(StrategyEvent::PositionOpened(position));
                Ok(())
            }
            Err(e) if e.is_ambiguous() => {
                let err = e.into_orb_error(&instrument);
                tracing::error!(%side, "Entry order outcome unknown: {err}");
                Err(err)
            }
            Err(e) => {
                self.lifecycle.fail_entry()?;
                tracing::warn!(%side, instrument = %instrument, "Entry order failed: {e}");
                events.push(StrategyEvent::EntryRejected {
                    side,
                    reason: e.to_string(),
                });
                Ok(())
            }
        }
    }

    async fn exit(
        &mut self,
        reason: ExitReason,
        ts: DateTime<Utc>,
        ltp: Option<Decimal>,
        events: &mut Vec<StrategyEvent>,
    ) -> Result<(), OrbError> {
        let position = self.lifecycle.begin_exit(reason)?;
        let instrument = position.instrument.clone();
        let quantity = position.quantity;

        tracing::info!(
            %reason,
            instrument = %instrument,
            ?ltp,
            "Exit triggered"
        );
        events.push(StrategyEvent::ExitRequested {
            reason,
            instrument: instrument.clone(),
            at: ts,
        });

        let request = OrderRequest {
            instrument: instrument.clone(),
            side: OrderSide::Sell,
            quantity,
            reference_price: ltp,
            requested_at: ts,
        };

        match self.place(&request).await {
            Ok(fill) => self.complete_exit(fill.fill_price, ts, events).await,
            Err(e) if e.is_ambiguous() => {
                let err = e.into_orb_error(&instrument);
                tracing::error!(%reason, "Exit order outcome unknown: {err}");
                Err(err)
            }
            Err(e) => {
                self.lifecycle.fail_exit()?;
                tracing::warn!(%reason, instrument = %instrument, "Exit order failed, still open: {e}");
                events.push(StrategyEvent::ExitRejected {
                    reason,
                    message: e.to_string(),
                });
                Ok(())
            }
        }
    }

    /// EXITING → IDLE with the ledger booked in the same step, then HALTED if
    /// the daily loss limit is reached.
    async fn complete_exit(
        &mut self,
        exit_price: Decimal,
        at: DateTime<Utc>,
        events: &mut Vec<StrategyEvent>,
    ) -> Result<(), OrbError> {
        let trade = self.lifecycle.confirm_exit(exit_price, at)?;
        self.ledger.record(trade.pnl);

        tracing::info!(
            instrument = %trade.instrument,
            reason = %trade.exit_reason,
            entry_price = %trade.entry_price,
            exit_price = %trade.exit_price,
            pnl = %trade.pnl,
            daily_pnl = %self.ledger.realized_pnl(),
            "Position closed"
        );
        events.push(StrategyEvent::PositionClosed(trade.clone()));

        if let Err(e) = self.recorder.record(&trade).await {
            tracing::error!(instrument = %trade.instrument, "Failed to record trade: {e:#}");
        }

        if self.ledger.breached(self.config.daily_max_loss) {
            self.lifecycle.halt()?;
            tracing::warn!(
                realized_pnl = %self.ledger.realized_pnl(),
                daily_max_loss = %self.config.daily_max_loss,
                "Daily loss limit reached, halting"
            );
            events.push(StrategyEvent::Halted {
                realized_pnl: self.ledger.realized_pnl(),
            });
        }
        Ok(())
    }
}
