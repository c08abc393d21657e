//! Settlement of open entry trades against a closing price.
//!
//! [`settle`] is pure: it computes the realized P&L and builds the updated
//! entry plus the new closing trade without touching the store. Persisting
//! the pair atomically is the store adapter's job
//! ([`crate::ports::store_port::TradeStorePort::apply_settlement`]).

use chrono::{DateTime, Utc};

use super::error::JournalError;
use super::trade::{Trade, TradeStatus, TradeType};

/// The two-sided outcome of settling one entry trade: the entry transitioned
/// to CLOSED and the freshly created closing trade. Both carry the same
/// realized P&L and must be persisted together or not at all.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub entry: Trade,
    pub closing: Trade,
}

/// Realized P&L locked in by closing at `closing_price`.
pub fn realized_profit_loss(
    trade_type: TradeType,
    quantity: f64,
    entry_price: f64,
    closing_price: f64,
) -> f64 {
    match trade_type {
        TradeType::Buy => (closing_price - entry_price) * quantity,
        TradeType::Sell => (entry_price - closing_price) * quantity,
    }
}

/// Close an open entry trade.
///
/// Fails with [`JournalError::AlreadySettled`] when the trade is not OPEN
/// (settling twice must never produce a second closing trade) and with
/// [`JournalError::InvalidSettlement`] when the closing price is negative or
/// the closing timestamp precedes execution.
pub fn settle(
    entry: &Trade,
    closing_price: f64,
    closed_at: DateTime<Utc>,
) -> Result<Settlement, JournalError> {
    if !entry.is_entry() || !entry.is_open() {
        return Err(JournalError::AlreadySettled { trade_id: entry.id });
    }

    if !closing_price.is_finite() || closing_price < 0.0 {
        return Err(JournalError::InvalidSettlement {
            reason: format!("closing price {closing_price} must be a non-negative number"),
        });
    }

    if closed_at < entry.executed_at {
        return Err(JournalError::InvalidSettlement {
            reason: format!(
                "closing time {} precedes execution time {}",
                closed_at.to_rfc3339(),
                entry.executed_at.to_rfc3339()
            ),
        });
    }

    let profit_loss = realized_profit_loss(
        entry.trade_type,
        entry.quantity,
        entry.price,
        closing_price,
    );

    let mut closing = Trade::new(
        entry.user_id,
        &entry.ticker_symbol,
        entry.trade_type.opposite(),
        entry.quantity,
        closing_price,
        closed_at,
    );
    closing.status = TradeStatus::Closed;
    closing.related_trade_id = Some(entry.id);
    closing.profit_loss = Some(profit_loss);

    let mut updated = entry.clone();
    updated.status = TradeStatus::Closed;
    updated.profit_loss = Some(profit_loss);

    Ok(Settlement {
        entry: updated,
        closing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn executed_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
    }

    fn closed_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 8, 15, 0, 0).unwrap()
    }

    fn open_buy() -> Trade {
        Trade::new(
            Uuid::new_v4(),
            "BHP",
            TradeType::Buy,
            100.0,
            10.0,
            executed_at(),
        )
    }

    fn open_sell() -> Trade {
        Trade::new(
            Uuid::new_v4(),
            "BHP",
            TradeType::Sell,
            100.0,
            10.0,
            executed_at(),
        )
    }

    #[test]
    fn buy_settled_above_entry_profits() {
        let entry = open_buy();
        let settlement = settle(&entry, 12.0, closed_at()).unwrap();
        assert!((settlement.entry.profit_loss.unwrap() - 200.0).abs() < f64::EPSILON);
        assert!((settlement.closing.profit_loss.unwrap() - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sell_settled_below_entry_profits() {
        let entry = open_sell();
        let settlement = settle(&entry, 8.0, closed_at()).unwrap();
        assert!((settlement.closing.profit_loss.unwrap() - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn buy_settled_below_entry_loses() {
        let entry = open_buy();
        let settlement = settle(&entry, 7.5, closed_at()).unwrap();
        assert!((settlement.entry.profit_loss.unwrap() + 250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn closing_trade_mirrors_entry() {
        let entry = open_buy();
        let settlement = settle(&entry, 12.0, closed_at()).unwrap();
        let closing = &settlement.closing;

        assert_eq!(closing.trade_type, TradeType::Sell);
        assert_eq!(closing.ticker_symbol, entry.ticker_symbol);
        assert_eq!(closing.user_id, entry.user_id);
        assert!((closing.quantity - entry.quantity).abs() < f64::EPSILON);
        assert!((closing.price - 12.0).abs() < f64::EPSILON);
        assert!((closing.total_amount - 1200.0).abs() < f64::EPSILON);
        assert_eq!(closing.executed_at, closed_at());
        assert_eq!(closing.status, TradeStatus::Closed);
        assert_eq!(closing.related_trade_id, Some(entry.id));
        assert_ne!(closing.id, entry.id);
    }

    #[test]
    fn entry_transitions_to_closed() {
        let entry = open_buy();
        let settlement = settle(&entry, 12.0, closed_at()).unwrap();
        assert_eq!(settlement.entry.id, entry.id);
        assert_eq!(settlement.entry.status, TradeStatus::Closed);
    }

    #[test]
    fn settling_closed_trade_fails() {
        let entry = open_buy();
        let settlement = settle(&entry, 12.0, closed_at()).unwrap();

        match settle(&settlement.entry, 13.0, closed_at()) {
            Err(JournalError::AlreadySettled { trade_id }) => assert_eq!(trade_id, entry.id),
            other => panic!("expected AlreadySettled, got {other:?}"),
        }
    }

    #[test]
    fn settling_a_closing_trade_fails() {
        let entry = open_buy();
        let settlement = settle(&entry, 12.0, closed_at()).unwrap();
        assert!(matches!(
            settle(&settlement.closing, 13.0, closed_at()),
            Err(JournalError::AlreadySettled { .. })
        ));
    }

    #[test]
    fn negative_closing_price_rejected() {
        let entry = open_buy();
        assert!(matches!(
            settle(&entry, -1.0, closed_at()),
            Err(JournalError::InvalidSettlement { .. })
        ));
    }

    #[test]
    fn closing_before_execution_rejected() {
        let entry = open_buy();
        let too_early = Utc.with_ymd_and_hms(2024, 2, 28, 10, 0, 0).unwrap();
        assert!(matches!(
            settle(&entry, 12.0, too_early),
            Err(JournalError::InvalidSettlement { .. })
        ));
    }

    #[test]
    fn closing_at_execution_time_accepted() {
        let entry = open_buy();
        assert!(settle(&entry, 12.0, executed_at()).is_ok());
    }

    #[test]
    fn zero_closing_price_accepted() {
        let entry = open_buy();
        let settlement = settle(&entry, 0.0, closed_at()).unwrap();
        assert!((settlement.entry.profit_loss.unwrap() + 1000.0).abs() < f64::EPSILON);
    }
}
