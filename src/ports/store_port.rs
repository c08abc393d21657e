//! Trade record store port trait.
//!
//! The store is the backend of record; the domain operates on read snapshots
//! it returns and writes back only through the explicit operations below,
//! each a single atomic unit of work with one success/failure outcome.

use uuid::Uuid;

use crate::domain::error::JournalError;
use crate::domain::reflection::Reflection;
use crate::domain::settlement::Settlement;
use crate::domain::trade::Trade;

pub trait TradeStorePort {
    fn list_trades(&self, user_id: Uuid) -> Result<Vec<Trade>, JournalError>;

    /// A miss here is a genuine error ([`JournalError::TradeNotFound`]),
    /// unlike a missing reflection.
    fn get_trade(&self, id: Uuid) -> Result<Trade, JournalError>;

    fn create_trade(&self, trade: &Trade) -> Result<(), JournalError>;

    fn update_trade(&self, trade: &Trade) -> Result<(), JournalError>;

    fn delete_trade(&self, id: Uuid) -> Result<(), JournalError>;

    /// Persist the entry transition and the closing trade together, or not
    /// at all. Implementations must re-check the stored entry status so a
    /// concurrent settlement loses with [`JournalError::AlreadySettled`]
    /// instead of silently inserting a duplicate closing trade.
    fn apply_settlement(&self, settlement: &Settlement) -> Result<(), JournalError>;

    /// `None` is the expected first-use state, not an error.
    fn get_reflection(&self, trade_id: Uuid) -> Result<Option<Reflection>, JournalError>;

    /// Insert-or-replace keyed by trade id; at most one reflection per trade.
    fn save_reflection(&self, reflection: &Reflection) -> Result<(), JournalError>;
}
