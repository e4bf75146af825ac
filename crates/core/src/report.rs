#![allow(clippy::format_push_string)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// End-of-session summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    pub trading_date: NaiveDate,
    pub underlying: String,
    pub trades: u32,
    pub wins: u32,
    pub losses: u32,
    pub realized_pnl: Decimal,
    pub halted: bool,
    pub position_open: bool,
    pub final_state: String,
}

impl SessionReport {
    #[must_use]
    pub fn win_rate(&self) -> Option<f64> {
        (self.trades > 0).then(|| f64::from(self.wins) / f64::from(self.trades))
    }
}

pub struct ReportFormatter;

impl ReportFormatter {
    #[must_use]
    pub fn format(report: &SessionReport) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str(&format!(
            "  ORB SESSION  {}  {}\n",
            report.underlying,
            report.trading_date.format("%Y-%m-%d")
        ));
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str(&format!("Closed Trades:         {}\n", report.trades));
        output.push_str(&format!(
            "Wins / Losses:         {} / {}\n",
            report.wins, report.losses
        ));
        match report.win_rate() {
            Some(rate) => output.push_str(&format!("Win Rate:              {:.2}%\n", rate * 100.0)),
            None => output.push_str("Win Rate:              N/A (no trades)\n"),
        }
        output.push_str(&format!(
            "Realized P&L:          {:.2}\n",
            report.realized_pnl
        ));
        output.push_str(&format!("Final State:           {}\n", report.final_state));

        if report.halted {
            output.push_str("\n⚠️  Daily loss limit breached; entries were disabled.\n");
        }
        if report.position_open {
            output.push_str("\n⚠️  Feed ended with a position still open.\n");
        }
        output.push_str("═══════════════════════════════════════════════════════════════\n");

        output
    }
}
