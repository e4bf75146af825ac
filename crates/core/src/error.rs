//! Error types for the ORB strategy core.
//!
//! `OrbError` covers the failure kinds a session can raise or absorb;
//! `OrderError` is what an order-placement collaborator reports back.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// Errors raised by a strategy session.
#[derive(Debug, Error)]
pub enum OrbError {
    /// Expected samples are missing from the feed. Logged, never fatal.
    #[error("feed gap: expected a sample by {expected}, next arrived at {received}")]
    FeedGap {
        /// When the next sample was due.
        expected: DateTime<Utc>,
        /// When the next sample actually arrived.
        received: DateTime<Utc>,
    },

    /// An entry or exit order was definitely not filled.
    #[error("order for {instrument} rejected: {reason}")]
    OrderRejected {
        /// Instrument the order was for.
        instrument: String,
        /// Broker-supplied reason.
        reason: String,
    },

    /// The fill status of an order is unknown. Needs manual reconciliation.
    #[error("order for {instrument} has unknown outcome (order id: {}); reconcile manually", .order_id.as_deref().unwrap_or("none"))]
    OrderAmbiguous {
        /// Instrument the order was for.
        instrument: String,
        /// Broker order id, if one was assigned before the timeout.
        order_id: Option<String>,
    },

    /// Configuration is unusable. Raised at session construction.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// A sample belongs to a different trading date than the session.
    #[error("sample for {received} delivered to session for {expected}")]
    WrongSession {
        /// The session's trading date.
        expected: NaiveDate,
        /// The sample's trading date.
        received: NaiveDate,
    },

    /// Reconciliation was requested but no order is in doubt.
    #[error("no ambiguous order to resolve")]
    NothingToResolve,

    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
}

impl OrbError {
    /// Creates a config validation error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigInvalid(message.into())
    }

    /// Returns true if the error must be surfaced to an operator.
    #[must_use]
    pub const fn needs_operator(&self) -> bool {
        matches!(self, Self::OrderAmbiguous { .. } | Self::ConfigInvalid(_))
    }
}

/// Outcome of a failed order placement.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderError {
    /// The broker refused the order.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The order never left this process (not connected, no quote, ...).
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// No answer in time. The order may or may not have filled.
    #[error("timed out (order id: {})", .order_id.as_deref().unwrap_or("none"))]
    Timeout {
        /// Broker order id, if known.
        order_id: Option<String>,
    },
}

impl OrderError {
    /// Returns true if the fill status is unknown.
    #[must_use]
    pub const fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Converts into the session-level error for `instrument`.
    #[must_use]
    pub fn into_orb_error(self, instrument: &str) -> OrbError {
        match self {
            Self::Timeout { order_id } => OrbError::OrderAmbiguous {
                instrument: instrument.to_string(),
                order_id,
            },
            Self::Rejected(reason) | Self::Unavailable(reason) => OrbError::OrderRejected {
                instrument: instrument.to_string(),
                reason,
            },
        }
    }
}
