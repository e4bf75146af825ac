//! Single-position lifecycle: IDLE → ENTERING → OPEN → EXITING → IDLE, plus HALTED.
//!
//! The machine is synchronous and owns the position. Order round-trips happen
//! outside it, between `begin_*` and `confirm_*`/`fail_*`.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use orb_core::{
    ClosedTrade, ExitReason, OptionSide, OrbError, OrderFill, Position, StrategyConfig,
};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Entering {
        side: OptionSide,
        instrument: String,
    },
    Open(Position),
    Exiting {
        position: Position,
        reason: ExitReason,
    },
    Halted,
}

impl LifecycleState {
    /// An entry or exit order has been sent and its outcome is not known yet.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        matches!(self, Self::Entering { .. } | Self::Exiting { .. })
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Entering { .. } => "ENTERING",
            Self::Open(_) => "OPEN",
            Self::Exiting { .. } => "EXITING",
            Self::Halted => "HALTED",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PositionLifecycle {
    state: LifecycleState,
}

impl Default for PositionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionLifecycle {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: LifecycleState::Idle,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &LifecycleState {
        &self.state
    }

    /// The position, while open or being closed.
    #[must_use]
    pub const fn position(&self) -> Option<&Position> {
        match &self.state {
            LifecycleState::Open(position) | LifecycleState::Exiting { position, .. } => {
                Some(position)
            }
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self.state, LifecycleState::Idle)
    }

    #[must_use]
    pub const fn is_halted(&self) -> bool {
        matches!(self.state, LifecycleState::Halted)
    }

    /// An order is in flight (or its outcome is unknown).
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        self.state.is_in_flight()
    }

    fn invalid(&self, action: &'static str) -> OrbError {
        OrbError::InvalidTransition {
            action,
            state: self.state.name(),
        }
    }

    /// IDLE → ENTERING.
    ///
    /// # Errors
    /// Fails unless idle.
    pub fn begin_entry(
        &mut self,
        side: OptionSide,
        instrument: &str,
    ) -> Result<(), OrbError> {
        if !self.is_idle() {
            return Err(self.invalid("begin entry"));
        }
        self.state = LifecycleState::Entering {
            side,
            instrument: instrument.to_string(),
        };
        Ok(())
    }

    /// ENTERING → OPEN, building the position from the fill.
    ///
    /// # Errors
    /// Fails unless entering.
    pub fn confirm_entry(
        &mut self,
        fill: &OrderFill,
        at: DateTime<Utc>,
    ) -> Result<&Position, OrbError> {
        let LifecycleState::Entering { side, instrument } = &self.state else {
            return Err(self.invalid("confirm entry"));
        };
        self.state = LifecycleState::Open(Position {
            side: *side,
            instrument: instrument.clone(),
            quantity: fill.quantity,
            entry_price: fill.fill_price,
            entry_time: at,
            entry_order_id: fill.order_id.clone(),
        });
        match &self.state {
            LifecycleState::Open(position) => Ok(position),
            _ => Err(self.invalid("confirm entry")),
        }
    }

    /// ENTERING → IDLE. Failed entries are not trades.
    ///
    /// # Errors
    /// Fails unless entering.
    pub fn fail_entry(&mut self) -> Result<OptionSide, OrbError> {
        let LifecycleState::Entering { side, .. } = self.state else {
            return Err(self.invalid("fail entry"));
        };
        self.state = LifecycleState::Idle;
        Ok(side)
    }

    /// OPEN → EXITING.
    ///
    /// # Errors
    /// Fails unless open.
    pub fn begin_exit(&mut self, reason: ExitReason) -> Result<&Position, OrbError> {
        if !matches!(self.state, LifecycleState::Open(_)) {
            return Err(self.invalid("begin exit"));
        }
        let LifecycleState::Open(position) =
            std::mem::replace(&mut self.state, LifecycleState::Idle)
        else {
            return Err(self.invalid("begin exit"));
        };
        self.state = LifecycleState::Exiting { position, reason };
        self.position().ok_or(OrbError::InvalidTransition {
            action: "begin exit",
            state: "EXITING",
        })
    }

    /// EXITING → IDLE, destroying the position. The caller books the trade
    /// and halts if the ledger is breached.
    ///
    /// # Errors
    /// Fails unless exiting.
    pub fn confirm_exit(
        &mut self,
        exit_price: Decimal,
        closed_at: DateTime<Utc>,
    ) -> Result<ClosedTrade, OrbError> {
        if !matches!(self.state, LifecycleState::Exiting { .. }) {
            return Err(self.invalid("confirm exit"));
        }
        let LifecycleState::Exiting { position, reason } =
            std::mem::replace(&mut self.state, LifecycleState::Idle)
        else {
            return Err(self.invalid("confirm exit"));
        };
        Ok(position.close(exit_price, reason, closed_at))
    }

    /// EXITING → OPEN. The position is kept and exit rules apply again.
    ///
    /// # Errors
    /// Fails unless exiting.
    pub fn fail_exit(&mut self) -> Result<ExitReason, OrbError> {
        if !matches!(self.state, LifecycleState::Exiting { .. }) {
            return Err(self.invalid("fail exit"));
        }
        let LifecycleState::Exiting { position, reason } =
            std::mem::replace(&mut self.state, LifecycleState::Idle)
        else {
            return Err(self.invalid("fail exit"));
        };
        self.state = LifecycleState::Open(position);
        Ok(reason)
    }

    /// IDLE → HALTED. Idempotent once halted.
    ///
    /// # Errors
    /// Fails while a position or order exists.
    pub fn halt(&mut self) -> Result<(), OrbError> {
        match self.state {
            LifecycleState::Idle | LifecycleState::Halted => {
                self.state = LifecycleState::Halted;
                Ok(())
            }
            _ => Err(self.invalid("halt")),
        }
    }
}

/// Exit thresholds taken from the strategy config.
#[derive(Debug, Clone, Copy)]
pub struct ExitRules {
    pub target_points: Decimal,
    pub stop_points: Decimal,
    pub max_holding: Duration,
    pub trade_window_end: NaiveTime,
}

impl ExitRules {
    #[must_use]
    pub fn from_config(config: &StrategyConfig) -> Self {
        Self {
            target_points: config.target_points,
            stop_points: config.stop_points,
            max_holding: config.max_holding(),
            trade_window_end: config.trade_window_end,
        }
    }

    /// First rule that fires, in priority order: target, stop, holding cap, window close.
    /// Price rules are skipped while the option has no known LTP.
    #[must_use]
    pub fn check(
        &self,
        position: &Position,
        ltp: Option<Decimal>,
        now: DateTime<Utc>,
        local_now: NaiveTime,
    ) -> Option<ExitReason> {
        if let Some(ltp) = ltp {
            let pnl_points = position.pnl_points(ltp);
            if pnl_points >= self.target_points {
                return Some(ExitReason::Target);
            }
            if pnl_points <= -self.stop_points {
                return Some(ExitReason::Stop);
            }
        }
        if now - position.entry_time >= self.max_holding {
            return Some(ExitReason::Time);
        }
        if local_now > self.trade_window_end {
            return Some(ExitReason::WindowClose);
        }
        None
    }
}
