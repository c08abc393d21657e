//! Position aggregation over the trade log.
//!
//! Positions are derived views, recomputed fresh from a read snapshot on
//! every call; nothing here mutates stored trades.

use std::collections::BTreeMap;

use super::trade::{Trade, TradeStatus, TradeType};

/// Net holding per ticker, derived from entry trades.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub ticker_symbol: String,
    /// Signed: BUY entries contribute +quantity, SELL entries −quantity.
    pub total_quantity: f64,
    /// Quantity-weighted mean entry price.
    pub average_price: f64,
    /// total_quantity × average_price, recomputed rather than summed so the
    /// three fields stay consistent under rounding.
    pub total_amount: f64,
    pub trades: Vec<Trade>,
    /// Realized P&L; present on closed positions only.
    pub profit_loss: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregationOptions {
    /// Show closed entry trades as individual positions alongside open ones.
    pub include_closed: bool,
    /// Treat SELL entry trades as short positions. Off by default; without it
    /// SELL trades never count as entries and are excluded.
    pub allow_short_entries: bool,
}

/// Aggregate a user's trades into positions.
///
/// With `include_closed` off, OPEN entry trades are grouped per ticker with a
/// quantity-weighted average price. With it on, every entry trade (OPEN and
/// CLOSED) becomes its own position; a CLOSED entry is paired with its linked
/// closing trade and carries the realized P&L.
///
/// Output is ordered by ticker ascending (ties by execution time, then id),
/// so identical input always yields identical output. An empty trade set
/// yields an empty list, never an error.
pub fn aggregate_positions(trades: &[Trade], options: &AggregationOptions) -> Vec<Position> {
    if options.include_closed {
        entry_positions(trades, options)
    } else {
        open_positions_by_ticker(trades, options)
    }
}

fn is_aggregatable_entry(trade: &Trade, options: &AggregationOptions) -> bool {
    trade.is_entry() && (trade.trade_type == TradeType::Buy || options.allow_short_entries)
}

fn by_execution_order(a: &Trade, b: &Trade) -> std::cmp::Ordering {
    a.executed_at.cmp(&b.executed_at).then(a.id.cmp(&b.id))
}

fn open_positions_by_ticker(trades: &[Trade], options: &AggregationOptions) -> Vec<Position> {
    let mut by_ticker: BTreeMap<&str, Vec<&Trade>> = BTreeMap::new();
    for trade in trades
        .iter()
        .filter(|t| is_aggregatable_entry(t, options) && t.is_open())
    {
        by_ticker
            .entry(trade.ticker_symbol.as_str())
            .or_default()
            .push(trade);
    }

    by_ticker
        .into_iter()
        .map(|(symbol, mut group)| {
            group.sort_by(|a, b| by_execution_order(a, b));

            let total_quantity: f64 = group.iter().map(|t| t.signed_quantity()).sum();
            let notional: f64 = group.iter().map(|t| t.signed_quantity() * t.price).sum();
            let average_price = if total_quantity.abs() < f64::EPSILON {
                0.0
            } else {
                notional / total_quantity
            };

            Position {
                ticker_symbol: symbol.to_string(),
                total_quantity,
                average_price,
                total_amount: total_quantity * average_price,
                trades: group.into_iter().cloned().collect(),
                profit_loss: None,
            }
        })
        .collect()
}

fn entry_positions(trades: &[Trade], options: &AggregationOptions) -> Vec<Position> {
    let mut entries: Vec<&Trade> = trades
        .iter()
        .filter(|t| is_aggregatable_entry(t, options))
        .collect();
    entries.sort_by(|a, b| {
        a.ticker_symbol
            .cmp(&b.ticker_symbol)
            .then(by_execution_order(a, b))
    });

    entries
        .into_iter()
        .map(|entry| {
            let total_quantity = entry.signed_quantity();
            let mut position_trades = vec![entry.clone()];
            let mut profit_loss = None;

            if entry.status == TradeStatus::Closed {
                let closing = trades
                    .iter()
                    .find(|t| t.related_trade_id == Some(entry.id));
                profit_loss = closing
                    .and_then(|t| t.profit_loss)
                    .or(entry.profit_loss);
                if let Some(closing) = closing {
                    position_trades.push(closing.clone());
                }
            }

            Position {
                ticker_symbol: entry.ticker_symbol.clone(),
                total_quantity,
                average_price: entry.price,
                total_amount: total_quantity * entry.price,
                trades: position_trades,
                profit_loss,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::settlement::settle;
    use chrono::{DateTime, TimeZone, Utc};
    use uuid::Uuid;

    fn date(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap()
    }

    fn entry(ticker: &str, trade_type: TradeType, quantity: f64, price: f64, day: u32) -> Trade {
        Trade::new(Uuid::nil(), ticker, trade_type, quantity, price, date(day))
    }

    fn open_options() -> AggregationOptions {
        AggregationOptions::default()
    }

    #[test]
    fn empty_input_empty_output() {
        assert!(aggregate_positions(&[], &open_options()).is_empty());
        let closed = AggregationOptions {
            include_closed: true,
            ..Default::default()
        };
        assert!(aggregate_positions(&[], &closed).is_empty());
    }

    #[test]
    fn weighted_average_price() {
        let trades = vec![
            entry("BHP", TradeType::Buy, 100.0, 10.0, 1),
            entry("BHP", TradeType::Buy, 100.0, 20.0, 2),
        ];

        let positions = aggregate_positions(&trades, &open_options());
        assert_eq!(positions.len(), 1);
        let pos = &positions[0];
        assert!((pos.total_quantity - 200.0).abs() < f64::EPSILON);
        assert!((pos.average_price - 15.0).abs() < f64::EPSILON);
        assert!((pos.total_amount - 3000.0).abs() < f64::EPSILON);
        assert_eq!(pos.trades.len(), 2);
        assert!(pos.profit_loss.is_none());
    }

    #[test]
    fn partitions_by_ticker_sorted_ascending() {
        let trades = vec![
            entry("CBA", TradeType::Buy, 50.0, 100.0, 1),
            entry("AAPL", TradeType::Buy, 10.0, 180.0, 2),
            entry("BHP", TradeType::Buy, 100.0, 45.0, 3),
        ];

        let positions = aggregate_positions(&trades, &open_options());
        let tickers: Vec<&str> = positions.iter().map(|p| p.ticker_symbol.as_str()).collect();
        assert_eq!(tickers, vec!["AAPL", "BHP", "CBA"]);
    }

    #[test]
    fn closed_entries_excluded_from_open_view() {
        let mut closed = entry("BHP", TradeType::Buy, 100.0, 10.0, 1);
        closed.status = TradeStatus::Closed;
        closed.profit_loss = Some(200.0);
        let trades = vec![closed, entry("BHP", TradeType::Buy, 50.0, 12.0, 2)];

        let positions = aggregate_positions(&trades, &open_options());
        assert_eq!(positions.len(), 1);
        assert!((positions[0].total_quantity - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn closing_trades_never_aggregate() {
        let opening = entry("BHP", TradeType::Buy, 100.0, 10.0, 1);
        let settlement = settle(&opening, 12.0, date(5)).unwrap();
        let trades = vec![
            settlement.entry.clone(),
            settlement.closing.clone(),
            entry("BHP", TradeType::Buy, 30.0, 11.0, 6),
        ];

        // The SELL closing row must not surface as a position of its own.
        let positions = aggregate_positions(&trades, &open_options());
        assert_eq!(positions.len(), 1);
        assert!((positions[0].total_quantity - 30.0).abs() < f64::EPSILON);

        let short_ok = AggregationOptions {
            allow_short_entries: true,
            ..Default::default()
        };
        let positions = aggregate_positions(&trades, &short_ok);
        assert_eq!(positions.len(), 1);
        assert!((positions[0].total_quantity - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sell_entries_excluded_without_short_support() {
        let trades = vec![
            entry("BHP", TradeType::Buy, 100.0, 10.0, 1),
            entry("BHP", TradeType::Sell, 40.0, 11.0, 2),
        ];

        let positions = aggregate_positions(&trades, &open_options());
        assert_eq!(positions.len(), 1);
        assert!((positions[0].total_quantity - 100.0).abs() < f64::EPSILON);
        assert_eq!(positions[0].trades.len(), 1);
    }

    #[test]
    fn sell_entries_contribute_negative_with_short_support() {
        let options = AggregationOptions {
            allow_short_entries: true,
            ..Default::default()
        };
        let trades = vec![
            entry("BHP", TradeType::Buy, 100.0, 10.0, 1),
            entry("BHP", TradeType::Sell, 40.0, 10.0, 2),
        ];

        let positions = aggregate_positions(&trades, &options);
        assert_eq!(positions.len(), 1);
        assert!((positions[0].total_quantity - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_net_quantity_guards_division() {
        let options = AggregationOptions {
            allow_short_entries: true,
            ..Default::default()
        };
        let trades = vec![
            entry("BHP", TradeType::Buy, 100.0, 10.0, 1),
            entry("BHP", TradeType::Sell, 100.0, 12.0, 2),
        ];

        let positions = aggregate_positions(&trades, &options);
        assert_eq!(positions.len(), 1);
        assert!((positions[0].total_quantity).abs() < f64::EPSILON);
        assert!((positions[0].average_price).abs() < f64::EPSILON);
        assert!((positions[0].total_amount).abs() < f64::EPSILON);
    }

    #[test]
    fn closed_view_pairs_entry_with_closing_trade() {
        let opening = entry("BHP", TradeType::Buy, 100.0, 10.0, 1);
        let settlement = settle(&opening, 12.0, date(5)).unwrap();
        let open_entry = entry("CBA", TradeType::Buy, 10.0, 100.0, 3);
        let trades = vec![
            settlement.entry.clone(),
            settlement.closing.clone(),
            open_entry,
        ];

        let options = AggregationOptions {
            include_closed: true,
            ..Default::default()
        };
        let positions = aggregate_positions(&trades, &options);
        assert_eq!(positions.len(), 2);

        let bhp = &positions[0];
        assert_eq!(bhp.ticker_symbol, "BHP");
        assert_eq!(bhp.trades.len(), 2);
        assert!((bhp.profit_loss.unwrap() - 200.0).abs() < f64::EPSILON);
        assert!((bhp.average_price - 10.0).abs() < f64::EPSILON);
        assert!((bhp.total_amount - 1000.0).abs() < f64::EPSILON);

        let cba = &positions[1];
        assert_eq!(cba.ticker_symbol, "CBA");
        assert_eq!(cba.trades.len(), 1);
        assert!(cba.profit_loss.is_none());
    }

    #[test]
    fn closed_view_keeps_separate_positions_per_entry() {
        let first = entry("BHP", TradeType::Buy, 100.0, 10.0, 1);
        let second = entry("BHP", TradeType::Buy, 50.0, 20.0, 2);
        let settlement = settle(&first, 15.0, date(5)).unwrap();
        let trades = vec![settlement.entry.clone(), settlement.closing.clone(), second];

        let options = AggregationOptions {
            include_closed: true,
            ..Default::default()
        };
        let positions = aggregate_positions(&trades, &options);
        assert_eq!(positions.len(), 2);
        assert!((positions[0].total_quantity - 100.0).abs() < f64::EPSILON);
        assert!((positions[1].total_quantity - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn deterministic_for_identical_input() {
        let trades = vec![
            entry("CBA", TradeType::Buy, 50.0, 100.0, 1),
            entry("BHP", TradeType::Buy, 100.0, 45.0, 2),
            entry("BHP", TradeType::Buy, 20.0, 50.0, 3),
        ];

        let first = aggregate_positions(&trades, &open_options());
        let second = aggregate_positions(&trades, &open_options());
        assert_eq!(first, second);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // total_amount must equal total_quantity × average_price for any
            // set of entry trades on one ticker.
            #[test]
            fn amount_consistent_with_quantity_and_price(
                lots in proptest::collection::vec((1.0f64..1e6, 0.01f64..1e5), 1..20)
            ) {
                let trades: Vec<Trade> = lots
                    .iter()
                    .map(|&(quantity, price)| entry("BHP", TradeType::Buy, quantity, price, 1))
                    .collect();

                let positions = aggregate_positions(&trades, &open_options());
                prop_assert_eq!(positions.len(), 1);
                let pos = &positions[0];
                let expected = pos.total_quantity * pos.average_price;
                prop_assert!((pos.total_amount - expected).abs() <= expected.abs() * 1e-9);
            }
        }
    }
}
