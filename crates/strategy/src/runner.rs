//! Drives a feed through one fresh `OrbSession` per trading date.

use crate::session::OrbSession;
use anyhow::{Context, Result};
use orb_core::{
    DataProvider, OrbError, OrderPlacer, SessionReport, StrategyConfig, StrategyEvent,
    TradeRecorder,
};
use std::sync::Arc;

/// Why [`SessionRunner::run`] returned.
#[derive(Debug)]
pub enum RunOutcome {
    /// The feed ended. Holds the reports of every session finished since the
    /// previous outcome, the last one included.
    Completed(Vec<SessionReport>),
    /// A session hit an error an operator has to clear, typically an order with
    /// unknown outcome. Sessions finished before it are in `reports`. The
    /// session in doubt stays with the runner, see [`SessionRunner::pending_mut`].
    Suspended {
        reports: Vec<SessionReport>,
        error: OrbError,
    },
}

impl RunOutcome {
    #[must_use]
    pub fn reports(&self) -> &[SessionReport] {
        match self {
            Self::Completed(reports) | Self::Suspended { reports, .. } => reports,
        }
    }
}

pub struct SessionRunner {
    config: StrategyConfig,
    broker: Arc<dyn OrderPlacer>,
    recorder: Arc<dyn TradeRecorder>,
    current: Option<OrbSession>,
    finished: Vec<SessionReport>,
}

impl SessionRunner {
    /// # Errors
    /// Returns `OrbError::ConfigInvalid` if `config` fails validation.
    pub fn new(
        config: StrategyConfig,
        broker: Arc<dyn OrderPlacer>,
        recorder: Arc<dyn TradeRecorder>,
    ) -> Result<Self, OrbError> {
        config.validate()?;
        Ok(Self {
            config,
            broker,
            recorder,
            current: None,
            finished: Vec::new(),
        })
    }

    /// Session currently being fed, if any.
    #[must_use]
    pub const fn current(&self) -> Option<&OrbSession> {
        self.current.as_ref()
    }

    /// The session while it has an entry or exit in doubt, for
    /// `resolve_ambiguous` before the run is resumed.
    pub fn pending_mut(&mut self) -> Option<&mut OrbSession> {
        self.current
            .as_mut()
            .filter(|session| session.state().is_in_flight())
    }

    /// Consumes `feed` until it ends or a session needs an operator.
    ///
    /// Samples dated before the current session are dropped. After a
    /// [`RunOutcome::Suspended`] the same runner can be called again with the
    /// same feed once the pending order is resolved.
    ///
    /// # Errors
    /// Feed failures.
    pub async fn run<P>(&mut self, feed: &mut P) -> Result<RunOutcome>
    where
        P: DataProvider + ?Sized,
    {
        while let Some(event) = feed.next_event().await.context("Failed to read market feed")? {
            let date = self.config.trading_date(event.timestamp());

            let session = match self.current.take() {
                Some(session) if session.trading_date() == date => self.current.insert(session),
                Some(session) if session.trading_date() > date => {
                    tracing::warn!(
                        session = %session.trading_date(),
                        received = %date,
                        "Dropping sample from an earlier trading date"
                    );
                    self.current = Some(session);
                    continue;
                }
                previous => {
                    if let Some(done) = previous {
                        let report = self.finish(&done);
                        self.finished.push(report);
                    }
                    self.current.insert(OrbSession::new(
                        self.config.clone(),
                        date,
                        self.broker.clone(),
                        self.recorder.clone(),
                    )?)
                }
            };

            match session.on_event(event).await {
                Ok(events) => log_events(&events),
                Err(e) if e.needs_operator() => {
                    tracing::error!(
                        trading_date = %date,
                        state = session.state().name(),
                        "Suspending run, session {date} needs manual reconciliation: {e}"
                    );
                    return Ok(RunOutcome::Suspended {
                        reports: std::mem::take(&mut self.finished),
                        error: e,
                    });
                }
                Err(e) => tracing::warn!(trading_date = %date, "Sample skipped: {e}"),
            }
        }

        if let Some(done) = self.current.take() {
            let report = self.finish(&done);
            self.finished.push(report);
        }
        Ok(RunOutcome::Completed(std::mem::take(&mut self.finished)))
    }

    fn finish(&self, session: &OrbSession) -> SessionReport {
        let report = session.report();
        if report.position_open {
            tracing::warn!(
                trading_date = %report.trading_date,
                underlying = %self.config.underlying,
                "Session ended with a position still open"
            );
        }
        tracing::info!(
            trading_date = %report.trading_date,
            trades = report.trades,
            realized_pnl = %report.realized_pnl,
            halted = report.halted,
            "Session finished"
        );
        report
    }
}

fn log_events(events: &[StrategyEvent]) {
    for event in events {
        tracing::debug!(?event, "Strategy event");
    }
}
