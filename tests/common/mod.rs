#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::cell::RefCell;
use std::collections::HashMap;
use tradenote::domain::error::JournalError;
use tradenote::domain::reflection::Reflection;
use tradenote::domain::settlement::Settlement;
pub use tradenote::domain::trade::{Trade, TradeStatus, TradeType};
use tradenote::ports::store_port::TradeStorePort;
use uuid::Uuid;

/// In-memory trade record store with the same atomicity contract as the
/// SQLite adapter; `fail_writes` simulates a store outage so atomicity can
/// be asserted.
pub struct MockTradeStore {
    trades: RefCell<HashMap<Uuid, Trade>>,
    reflections: RefCell<HashMap<Uuid, Reflection>>,
    fail_writes: RefCell<bool>,
}

impl MockTradeStore {
    pub fn new() -> Self {
        Self {
            trades: RefCell::new(HashMap::new()),
            reflections: RefCell::new(HashMap::new()),
            fail_writes: RefCell::new(false),
        }
    }

    pub fn with_trades(trades: Vec<Trade>) -> Self {
        let store = Self::new();
        for trade in trades {
            store.create_trade(&trade).unwrap();
        }
        store
    }

    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.borrow_mut() = fail;
    }

    pub fn trade_count(&self) -> usize {
        self.trades.borrow().len()
    }

    fn check_writable(&self) -> Result<(), JournalError> {
        if *self.fail_writes.borrow() {
            return Err(JournalError::Database {
                reason: "simulated store outage".into(),
            });
        }
        Ok(())
    }
}

impl TradeStorePort for MockTradeStore {
    fn list_trades(&self, user_id: Uuid) -> Result<Vec<Trade>, JournalError> {
        let mut trades: Vec<Trade> = self
            .trades
            .borrow()
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        trades.sort_by(|a, b| b.executed_at.cmp(&a.executed_at).then(b.id.cmp(&a.id)));
        Ok(trades)
    }

    fn get_trade(&self, id: Uuid) -> Result<Trade, JournalError> {
        self.trades
            .borrow()
            .get(&id)
            .cloned()
            .ok_or(JournalError::TradeNotFound { id })
    }

    fn create_trade(&self, trade: &Trade) -> Result<(), JournalError> {
        self.check_writable()?;
        self.trades.borrow_mut().insert(trade.id, trade.clone());
        Ok(())
    }

    fn update_trade(&self, trade: &Trade) -> Result<(), JournalError> {
        self.check_writable()?;
        let mut trades = self.trades.borrow_mut();
        if !trades.contains_key(&trade.id) {
            return Err(JournalError::TradeNotFound { id: trade.id });
        }
        trades.insert(trade.id, trade.clone());
        Ok(())
    }

    fn delete_trade(&self, id: Uuid) -> Result<(), JournalError> {
        self.check_writable()?;
        self.trades
            .borrow_mut()
            .remove(&id)
            .map(|_| ())
            .ok_or(JournalError::TradeNotFound { id })
    }

    fn apply_settlement(&self, settlement: &Settlement) -> Result<(), JournalError> {
        self.check_writable()?;
        let mut trades = self.trades.borrow_mut();

        let entry_id = settlement.entry.id;
        match trades.get(&entry_id) {
            None => return Err(JournalError::TradeNotFound { id: entry_id }),
            Some(stored) if stored.status != TradeStatus::Open => {
                return Err(JournalError::AlreadySettled { trade_id: entry_id });
            }
            Some(_) => {}
        }

        trades.insert(entry_id, settlement.entry.clone());
        trades.insert(settlement.closing.id, settlement.closing.clone());
        Ok(())
    }

    fn get_reflection(&self, trade_id: Uuid) -> Result<Option<Reflection>, JournalError> {
        Ok(self.reflections.borrow().get(&trade_id).cloned())
    }

    fn save_reflection(&self, reflection: &Reflection) -> Result<(), JournalError> {
        self.check_writable()?;
        self.reflections
            .borrow_mut()
            .insert(reflection.trade_id, reflection.clone());
        Ok(())
    }
}

pub fn date(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap()
}

pub fn make_entry(
    user_id: Uuid,
    ticker: &str,
    trade_type: TradeType,
    quantity: f64,
    price: f64,
    day: u32,
) -> Trade {
    Trade::new(user_id, ticker, trade_type, quantity, price, date(day))
}
