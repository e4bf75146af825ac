//! Closed-trade persistence in `PostgreSQL`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use orb_core::{ClosedTrade, TradeRecorder};
use sqlx::{postgres::PgPoolOptions, PgPool};

/// Repository for closed ORB trades.
#[derive(Debug, Clone)]
pub struct PgTradeRepository {
    pool: PgPool,
}

impl PgTradeRepository {
    /// Creates a new repository instance.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects and makes sure the trades table exists.
    ///
    /// # Errors
    /// Returns an error if the connection or the schema statement fails.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to trade database")?;
        let repo = Self::new(pool);
        repo.ensure_schema().await?;
        Ok(repo)
    }

    /// Creates the `orb_trades` table if missing.
    ///
    /// # Errors
    /// Returns an error if the database operation fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS orb_trades (
                id BIGSERIAL PRIMARY KEY,
                instrument TEXT NOT NULL,
                side TEXT NOT NULL,
                quantity NUMERIC NOT NULL,
                entry_price NUMERIC NOT NULL,
                exit_price NUMERIC NOT NULL,
                pnl_points NUMERIC NOT NULL,
                pnl NUMERIC NOT NULL,
                exit_reason TEXT NOT NULL,
                opened_at TIMESTAMPTZ NOT NULL,
                closed_at TIMESTAMPTZ NOT NULL,
                recorded_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            ",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create orb_trades table")?;
        Ok(())
    }

    /// Inserts a closed trade and returns the generated ID.
    ///
    /// # Errors
    /// Returns an error if the database operation fails.
    pub async fn insert(&self, trade: &ClosedTrade) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r"
            INSERT INTO orb_trades
                (instrument, side, quantity, entry_price, exit_price, pnl_points, pnl,
                 exit_reason, opened_at, closed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            ",
        )
        .bind(&trade.instrument)
        .bind(trade.side.to_string())
        .bind(trade.quantity)
        .bind(trade.entry_price)
        .bind(trade.exit_price)
        .bind(trade.pnl_points)
        .bind(trade.pnl)
        .bind(trade.exit_reason.to_string())
        .bind(trade.opened_at)
        .bind(trade.closed_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }
}

#[async_trait]
impl TradeRecorder for PgTradeRepository {
    async fn record(&self, trade: &ClosedTrade) -> Result<()> {
        let id = self.insert(trade).await?;
        tracing::debug!(id, instrument = %trade.instrument, "Trade persisted");
        Ok(())
    }
}
