//! Trade record model and validation.
//!
//! A trade without `related_trade_id` is an entry trade and may be OPEN or
//! CLOSED; a trade with it set is a closing trade and is always CLOSED.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::JournalError;

pub const MAX_TICKER_LEN: usize = 10;
pub const MIN_CONFIDENCE_LEVEL: u8 = 1;
pub const MAX_CONFIDENCE_LEVEL: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeType {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

impl TradeType {
    /// The side a closing trade takes against this entry side.
    pub fn opposite(self) -> Self {
        match self {
            TradeType::Buy => TradeType::Sell,
            TradeType::Sell => TradeType::Buy,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TradeType::Buy => "BUY",
            TradeType::Sell => "SELL",
        }
    }
}

impl std::str::FromStr for TradeType {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BUY" => Ok(TradeType::Buy),
            "SELL" => Ok(TradeType::Sell),
            other => Err(JournalError::Validation {
                field: "trade_type".into(),
                reason: format!("expected BUY or SELL, got {other}"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeStatus {
    #[serde(rename = "OPEN")]
    Open,
    #[serde(rename = "CLOSED")]
    Closed,
}

impl TradeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeStatus::Open => "OPEN",
            TradeStatus::Closed => "CLOSED",
        }
    }
}

impl std::str::FromStr for TradeStatus {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OPEN" => Ok(TradeStatus::Open),
            "CLOSED" => Ok(TradeStatus::Closed),
            other => Err(JournalError::Validation {
                field: "status".into(),
                reason: format!("expected OPEN or CLOSED, got {other}"),
            }),
        }
    }
}

/// A single buy/sell execution with its qualitative rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ticker_symbol: String,
    pub trade_type: TradeType,
    pub quantity: f64,
    pub price: f64,
    /// quantity × price, stored for convenience.
    pub total_amount: f64,
    pub executed_at: DateTime<Utc>,
    pub status: TradeStatus,
    pub market_env: Option<String>,
    pub technical_analysis: Option<String>,
    pub fundamental_analysis: Option<String>,
    pub competitor_analysis: Option<String>,
    pub entry_trigger: Option<String>,
    pub catalyst: Option<String>,
    pub holding_period: Option<String>,
    pub position_sizing_rationale: Option<String>,
    pub rationale: Option<String>,
    pub confidence_level: Option<u8>,
    pub target_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub risk_reward_ratio: Option<f64>,
    /// Set on a closing trade; points at the entry trade it settles.
    pub related_trade_id: Option<Uuid>,
    /// Realized P&L, present only once the trade is CLOSED.
    pub profit_loss: Option<f64>,
}

impl Trade {
    /// A fresh OPEN entry trade with no rationale attached.
    pub fn new(
        user_id: Uuid,
        ticker_symbol: &str,
        trade_type: TradeType,
        quantity: f64,
        price: f64,
        executed_at: DateTime<Utc>,
    ) -> Self {
        Trade {
            id: Uuid::new_v4(),
            user_id,
            ticker_symbol: ticker_symbol.to_string(),
            trade_type,
            quantity,
            price,
            total_amount: compute_total_amount(quantity, price),
            executed_at,
            status: TradeStatus::Open,
            market_env: None,
            technical_analysis: None,
            fundamental_analysis: None,
            competitor_analysis: None,
            entry_trigger: None,
            catalyst: None,
            holding_period: None,
            position_sizing_rationale: None,
            rationale: None,
            confidence_level: None,
            target_price: None,
            stop_loss: None,
            risk_reward_ratio: None,
            related_trade_id: None,
            profit_loss: None,
        }
    }

    pub fn is_entry(&self) -> bool {
        self.related_trade_id.is_none()
    }

    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    /// Quantity signed by direction: BUY positive, SELL negative.
    pub fn signed_quantity(&self) -> f64 {
        match self.trade_type {
            TradeType::Buy => self.quantity,
            TradeType::Sell => -self.quantity,
        }
    }

    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), JournalError> {
        validate_ticker(&self.ticker_symbol)?;

        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Err(JournalError::Validation {
                field: "quantity".into(),
                reason: format!("{} must be a positive number", self.quantity),
            });
        }

        if !self.price.is_finite() || self.price < 0.0 {
            return Err(JournalError::Validation {
                field: "price".into(),
                reason: format!("{} must be a non-negative number", self.price),
            });
        }

        if self.executed_at > now {
            return Err(JournalError::Validation {
                field: "executed_at".into(),
                reason: format!("{} is in the future", self.executed_at.to_rfc3339()),
            });
        }

        if let Some(level) = self.confidence_level {
            if !(MIN_CONFIDENCE_LEVEL..=MAX_CONFIDENCE_LEVEL).contains(&level) {
                return Err(JournalError::Validation {
                    field: "confidence_level".into(),
                    reason: format!(
                        "{level} must be between {MIN_CONFIDENCE_LEVEL} and {MAX_CONFIDENCE_LEVEL}"
                    ),
                });
            }
        }

        for (field, value) in [
            ("target_price", self.target_price),
            ("stop_loss", self.stop_loss),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(JournalError::Validation {
                        field: field.into(),
                        reason: format!("{v} must be a non-negative number"),
                    });
                }
            }
        }

        // Closing trades are born settled; an OPEN one would be unreachable
        // by the aggregator and the settlement engine alike.
        if self.related_trade_id.is_some() && self.status != TradeStatus::Closed {
            return Err(JournalError::Validation {
                field: "status".into(),
                reason: "a closing trade must have status CLOSED".into(),
            });
        }

        Ok(())
    }
}

/// Derived trade value; recomputed whenever quantity or price changes.
pub fn compute_total_amount(quantity: f64, price: f64) -> f64 {
    quantity * price
}

/// Ticker symbols are uppercase alphanumeric plus `.` and `-`, at most
/// [`MAX_TICKER_LEN`] characters.
pub fn validate_ticker(symbol: &str) -> Result<(), JournalError> {
    if symbol.is_empty() || symbol.len() > MAX_TICKER_LEN {
        return Err(JournalError::Validation {
            field: "ticker_symbol".into(),
            reason: format!("length must be 1 to {MAX_TICKER_LEN} characters"),
        });
    }

    if !symbol
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.' || c == '-')
    {
        return Err(JournalError::Validation {
            field: "ticker_symbol".into(),
            reason: format!("{symbol} may only contain A-Z, 0-9, '.' and '-'"),
        });
    }

    Ok(())
}
