//! Typed dataset rows.
//!
//! Each data category parses into one row type. Field order is the CSV column
//! order, so serialising a parsed payload reproduces its columns.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A record that can be parsed from a dataset payload.
pub trait DatasetRow: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Check row-level invariants. Returns a description of every violation.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

fn check_finite(name: &str, value: f64, issues: &mut Vec<String>) {
    if !value.is_finite() {
        issues.push(format!("{} is not a finite number", name));
    }
}

fn check_non_negative(name: &str, value: f64, issues: &mut Vec<String>) {
    if value < 0.0 {
        issues.push(format!("Negative {}: {}", name, value));
    }
}

fn into_result(issues: Vec<String>) -> Result<(), String> {
    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues.join("; "))
    }
}

/// Daily OHLCV bar (`raw` category).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl DatasetRow for PriceBar {
    /// OHLC invariants: prices are finite and non-negative, high >= low, and
    /// open/close lie within the high/low range.
    fn validate(&self) -> Result<(), String> {
        let mut issues = Vec::new();

        for (name, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            check_finite(name, value, &mut issues);
            check_non_negative(name, value, &mut issues);
        }

        if self.high < self.low {
            issues.push(format!(
                "High ({}) is less than Low ({})",
                self.high, self.low
            ));
        }
        if self.open < self.low || self.open > self.high {
            issues.push(format!(
                "Open ({}) is outside High/Low range ({}-{})",
                self.open, self.low, self.high
            ));
        }
        if self.close < self.low || self.close > self.high {
            issues.push(format!(
                "Close ({}) is outside High/Low range ({}-{})",
                self.close, self.low, self.high
            ));
        }

        into_result(issues)
    }
}

/// Portfolio value over time (`portfolio` category).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioPoint {
    pub date: NaiveDate,
    pub equity: f64,
    pub cash: f64,
    pub drawdown_pct: f64,
}

impl DatasetRow for PortfolioPoint {
    fn validate(&self) -> Result<(), String> {
        let mut issues = Vec::new();
        check_finite("equity", self.equity, &mut issues);
        check_finite("cash", self.cash, &mut issues);
        check_finite("drawdown_pct", self.drawdown_pct, &mut issues);
        if self.drawdown_pct > 0.0 || self.drawdown_pct < -100.0 {
            issues.push(format!(
                "Drawdown ({}%) must be between -100 and 0",
                self.drawdown_pct
            ));
        }
        into_result(issues)
    }
}

/// One closed trade (`trade-history` category).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub trade_id: String,
    pub ticker: String,
    pub strategy: String,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub pnl: f64,
    pub return_pct: f64,
}

impl DatasetRow for TradeRecord {
    fn validate(&self) -> Result<(), String> {
        let mut issues = Vec::new();
        if self.ticker.trim().is_empty() {
            issues.push(format!("Trade {} has no ticker", self.trade_id));
        }
        if self.exit_date < self.entry_date {
            issues.push(format!(
                "Trade {} exits ({}) before it enters ({})",
                self.trade_id, self.exit_date, self.entry_date
            ));
        }
        check_finite("pnl", self.pnl, &mut issues);
        check_finite("return_pct", self.return_pct, &mut issues);
        into_result(issues)
    }
}

/// A currently held position (`open-positions` category).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub ticker: String,
    pub entry_date: NaiveDate,
    pub quantity: f64,
    pub entry_price: f64,
    pub current_price: f64,
}

impl OpenPosition {
    pub fn unrealized_pnl(&self) -> f64 {
        (self.current_price - self.entry_price) * self.quantity
    }
}

impl DatasetRow for OpenPosition {
    fn validate(&self) -> Result<(), String> {
        let mut issues = Vec::new();
        if self.ticker.trim().is_empty() {
            issues.push("Position has no ticker".to_string());
        }
        check_finite("quantity", self.quantity, &mut issues);
        if self.quantity == 0.0 {
            issues.push(format!("Position {} has zero quantity", self.ticker));
        }
        for (name, value) in [
            ("entry_price", self.entry_price),
            ("current_price", self.current_price),
        ] {
            check_finite(name, value, &mut issues);
            check_non_negative(name, value, &mut issues);
        }
        into_result(issues)
    }
}

/// A named series value (`processed` category), e.g. a derived indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub series: String,
    pub value: f64,
}

impl DatasetRow for SeriesPoint {
    fn validate(&self) -> Result<(), String> {
        let mut issues = Vec::new();
        check_finite("value", self.value, &mut issues);
        into_result(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(open: f64, high: f64, low: f64, close: f64) -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            open,
            high,
            low,
            close,
            volume: 1_000,
        }
    }

    #[test]
    fn test_valid_bar() {
        assert!(bar(100.0, 105.0, 95.0, 102.0).validate().is_ok());
    }

    #[test]
    fn test_high_below_low_rejected() {
        let err = bar(100.0, 90.0, 95.0, 92.0).validate().unwrap_err();
        assert!(err.contains("High (90) is less than Low (95)"));
    }

    #[test]
    fn test_close_outside_range_rejected() {
        let err = bar(100.0, 105.0, 95.0, 110.0).validate().unwrap_err();
        assert!(err.contains("Close"));
    }

    #[test]
    fn test_nan_price_rejected() {
        assert!(bar(f64::NAN, 105.0, 95.0, 100.0).validate().is_err());
    }

    #[test]
    fn test_trade_exit_before_entry_rejected() {
        let trade = TradeRecord {
            trade_id: "T-1".to_string(),
            ticker: "AAPL".to_string(),
            strategy: "breakout".to_string(),
            entry_date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            exit_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            pnl: 12.5,
            return_pct: 1.2,
        };
        assert!(trade.validate().unwrap_err().contains("exits"));
    }

    #[test]
    fn test_open_position_pnl() {
        let position = OpenPosition {
            ticker: "MSFT".to_string(),
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            quantity: 10.0,
            entry_price: 400.0,
            current_price: 412.5,
        };
        assert!(position.validate().is_ok());
        assert_eq!(position.unrealized_pnl(), 125.0);
    }

    #[test]
    fn test_drawdown_must_be_non_positive() {
        let point = PortfolioPoint {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            equity: 10_000.0,
            cash: 2_500.0,
            drawdown_pct: 4.0,
        };
        assert!(point.validate().is_err());
    }
}
