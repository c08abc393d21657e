//! SQLite trade store adapter.

use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::domain::error::JournalError;
use crate::domain::reflection::Reflection;
use crate::domain::settlement::Settlement;
use crate::domain::trade::{Trade, TradeStatus, TradeType};
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::TradeStorePort;

const TRADE_COLUMNS: &str = "id, user_id, ticker_symbol, trade_type, quantity, price, \
     total_amount, executed_at, status, market_env, technical_analysis, \
     fundamental_analysis, competitor_analysis, entry_trigger, catalyst, \
     holding_period, position_sizing_rationale, rationale, confidence_level, \
     target_price, stop_loss, risk_reward_ratio, related_trade_id, profit_loss";

pub struct SqliteStoreAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_err(e: r2d2::Error) -> JournalError {
    JournalError::Database {
        reason: e.to_string(),
    }
}

fn sql_err(e: rusqlite::Error) -> JournalError {
    JournalError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn column_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn parse_uuid(value: String, idx: usize) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(&value).map_err(|e| column_err(idx, e))
}

fn parse_timestamp(value: String, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| column_err(idx, e))
}

fn row_to_trade(row: &rusqlite::Row) -> rusqlite::Result<Trade> {
    let trade_type: String = row.get(3)?;
    let status: String = row.get(8)?;
    Ok(Trade {
        id: parse_uuid(row.get(0)?, 0)?,
        user_id: parse_uuid(row.get(1)?, 1)?,
        ticker_symbol: row.get(2)?,
        trade_type: trade_type
            .parse::<TradeType>()
            .map_err(|e| column_err(3, e))?,
        quantity: row.get(4)?,
        price: row.get(5)?,
        total_amount: row.get(6)?,
        executed_at: parse_timestamp(row.get(7)?, 7)?,
        status: status
            .parse::<TradeStatus>()
            .map_err(|e| column_err(8, e))?,
        market_env: row.get(9)?,
        technical_analysis: row.get(10)?,
        fundamental_analysis: row.get(11)?,
        competitor_analysis: row.get(12)?,
        entry_trigger: row.get(13)?,
        catalyst: row.get(14)?,
        holding_period: row.get(15)?,
        position_sizing_rationale: row.get(16)?,
        rationale: row.get(17)?,
        confidence_level: row.get(18)?,
        target_price: row.get(19)?,
        stop_loss: row.get(20)?,
        risk_reward_ratio: row.get(21)?,
        related_trade_id: match row.get::<_, Option<String>>(22)? {
            Some(value) => Some(parse_uuid(value, 22)?),
            None => None,
        },
        profit_loss: row.get(23)?,
    })
}

fn row_to_reflection(row: &rusqlite::Row) -> rusqlite::Result<Reflection> {
    Ok(Reflection {
        id: parse_uuid(row.get(0)?, 0)?,
        trade_id: parse_uuid(row.get(1)?, 1)?,
        what_went_well: row.get(2)?,
        what_went_wrong: row.get(3)?,
        lessons_learned: row.get(4)?,
        action_items: row.get(5)?,
        satisfaction_rating: row.get(6)?,
        created_at: parse_timestamp(row.get(7)?, 7)?,
        updated_at: match row.get::<_, Option<String>>(8)? {
            Some(value) => Some(parse_timestamp(value, 8)?),
            None => None,
        },
    })
}

fn insert_trade(conn: &Connection, trade: &Trade) -> Result<(), JournalError> {
    conn.execute(
        &format!(
            "INSERT INTO trades ({TRADE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                     ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)"
        ),
        params![
            trade.id.to_string(),
            trade.user_id.to_string(),
            trade.ticker_symbol,
            trade.trade_type.as_str(),
            trade.quantity,
            trade.price,
            trade.total_amount,
            trade.executed_at.to_rfc3339(),
            trade.status.as_str(),
            trade.market_env,
            trade.technical_analysis,
            trade.fundamental_analysis,
            trade.competitor_analysis,
            trade.entry_trigger,
            trade.catalyst,
            trade.holding_period,
            trade.position_sizing_rationale,
            trade.rationale,
            trade.confidence_level,
            trade.target_price,
            trade.stop_loss,
            trade.risk_reward_ratio,
            trade.related_trade_id.map(|id| id.to_string()),
            trade.profit_loss,
        ],
    )
    .map_err(sql_err)?;
    Ok(())
}

impl SqliteStoreAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, JournalError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| JournalError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, JournalError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_err)?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), JournalError> {
        let conn = self.pool.get().map_err(pool_err)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS trades (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                ticker_symbol TEXT NOT NULL,
                trade_type TEXT NOT NULL,
                quantity REAL NOT NULL,
                price REAL NOT NULL,
                total_amount REAL NOT NULL,
                executed_at TEXT NOT NULL,
                status TEXT NOT NULL,
                market_env TEXT,
                technical_analysis TEXT,
                fundamental_analysis TEXT,
                competitor_analysis TEXT,
                entry_trigger TEXT,
                catalyst TEXT,
                holding_period TEXT,
                position_sizing_rationale TEXT,
                rationale TEXT,
                confidence_level INTEGER,
                target_price REAL,
                stop_loss REAL,
                risk_reward_ratio REAL,
                related_trade_id TEXT,
                profit_loss REAL
            );
            CREATE INDEX IF NOT EXISTS idx_trades_user ON trades(user_id);
            CREATE INDEX IF NOT EXISTS idx_trades_ticker ON trades(ticker_symbol);
            CREATE TABLE IF NOT EXISTS reflections (
                id TEXT PRIMARY KEY,
                trade_id TEXT NOT NULL UNIQUE,
                what_went_well TEXT,
                what_went_wrong TEXT,
                lessons_learned TEXT,
                action_items TEXT,
                satisfaction_rating INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT
            );",
        )
        .map_err(sql_err)?;

        Ok(())
    }
}

impl TradeStorePort for SqliteStoreAdapter {
    fn list_trades(&self, user_id: Uuid) -> Result<Vec<Trade>, JournalError> {
        let conn = self.pool.get().map_err(pool_err)?;

        let query = format!(
            "SELECT {TRADE_COLUMNS} FROM trades
             WHERE user_id = ?1
             ORDER BY executed_at DESC, id DESC"
        );
        let mut stmt = conn.prepare(&query).map_err(sql_err)?;

        let rows = stmt
            .query_map(params![user_id.to_string()], row_to_trade)
            .map_err(sql_err)?;

        let mut trades = Vec::new();
        for row in rows {
            trades.push(row.map_err(sql_err)?);
        }

        Ok(trades)
    }

    fn get_trade(&self, id: Uuid) -> Result<Trade, JournalError> {
        let conn = self.pool.get().map_err(pool_err)?;

        let query = format!("SELECT {TRADE_COLUMNS} FROM trades WHERE id = ?1");
        conn.query_row(&query, params![id.to_string()], row_to_trade)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => JournalError::TradeNotFound { id },
                other => sql_err(other),
            })
    }

    fn create_trade(&self, trade: &Trade) -> Result<(), JournalError> {
        let conn = self.pool.get().map_err(pool_err)?;
        insert_trade(&conn, trade)
    }

    fn update_trade(&self, trade: &Trade) -> Result<(), JournalError> {
        let conn = self.pool.get().map_err(pool_err)?;

        let changed = conn
            .execute(
                "UPDATE trades SET
                    ticker_symbol = ?2, trade_type = ?3, quantity = ?4, price = ?5,
                    total_amount = ?6, executed_at = ?7, status = ?8, market_env = ?9,
                    technical_analysis = ?10, fundamental_analysis = ?11,
                    competitor_analysis = ?12, entry_trigger = ?13, catalyst = ?14,
                    holding_period = ?15, position_sizing_rationale = ?16,
                    rationale = ?17, confidence_level = ?18, target_price = ?19,
                    stop_loss = ?20, risk_reward_ratio = ?21, related_trade_id = ?22,
                    profit_loss = ?23
                 WHERE id = ?1",
                params![
                    trade.id.to_string(),
                    trade.ticker_symbol,
                    trade.trade_type.as_str(),
                    trade.quantity,
                    trade.price,
                    trade.total_amount,
                    trade.executed_at.to_rfc3339(),
                    trade.status.as_str(),
                    trade.market_env,
                    trade.technical_analysis,
                    trade.fundamental_analysis,
                    trade.competitor_analysis,
                    trade.entry_trigger,
                    trade.catalyst,
                    trade.holding_period,
                    trade.position_sizing_rationale,
                    trade.rationale,
                    trade.confidence_level,
                    trade.target_price,
                    trade.stop_loss,
                    trade.risk_reward_ratio,
                    trade.related_trade_id.map(|id| id.to_string()),
                    trade.profit_loss,
                ],
            )
            .map_err(sql_err)?;

        if changed == 0 {
            return Err(JournalError::TradeNotFound { id: trade.id });
        }
        Ok(())
    }

    fn delete_trade(&self, id: Uuid) -> Result<(), JournalError> {
        let conn = self.pool.get().map_err(pool_err)?;

        let deleted = conn
            .execute("DELETE FROM trades WHERE id = ?1", params![id.to_string()])
            .map_err(sql_err)?;

        if deleted == 0 {
            return Err(JournalError::TradeNotFound { id });
        }
        Ok(())
    }

    fn apply_settlement(&self, settlement: &Settlement) -> Result<(), JournalError> {
        let mut conn = self.pool.get().map_err(pool_err)?;
        let tx = conn.transaction().map_err(sql_err)?;

        // Guarded transition: only an entry still OPEN in the store can be
        // settled, so a lost race observes AlreadySettled rather than
        // inserting a second closing trade.
        let entry_id = settlement.entry.id;
        let changed = tx
            .execute(
                "UPDATE trades SET status = ?2, profit_loss = ?3
                 WHERE id = ?1 AND status = ?4",
                params![
                    entry_id.to_string(),
                    TradeStatus::Closed.as_str(),
                    settlement.entry.profit_loss,
                    TradeStatus::Open.as_str(),
                ],
            )
            .map_err(sql_err)?;

        if changed == 0 {
            let exists: bool = tx
                .query_row(
                    "SELECT 1 FROM trades WHERE id = ?1",
                    params![entry_id.to_string()],
                    |_| Ok(true),
                )
                .optional()
                .map_err(sql_err)?
                .unwrap_or(false);

            return Err(if exists {
                JournalError::AlreadySettled { trade_id: entry_id }
            } else {
                JournalError::TradeNotFound { id: entry_id }
            });
        }

        insert_trade(&tx, &settlement.closing)?;
        tx.commit().map_err(sql_err)?;

        Ok(())
    }

    fn get_reflection(&self, trade_id: Uuid) -> Result<Option<Reflection>, JournalError> {
        let conn = self.pool.get().map_err(pool_err)?;

        conn.query_row(
            "SELECT id, trade_id, what_went_well, what_went_wrong, lessons_learned,
                    action_items, satisfaction_rating, created_at, updated_at
             FROM reflections WHERE trade_id = ?1",
            params![trade_id.to_string()],
            row_to_reflection,
        )
        .optional()
        .map_err(sql_err)
    }

    fn save_reflection(&self, reflection: &Reflection) -> Result<(), JournalError> {
        let conn = self.pool.get().map_err(pool_err)?;

        conn.execute(
            "INSERT OR REPLACE INTO reflections
                (id, trade_id, what_went_well, what_went_wrong, lessons_learned,
                 action_items, satisfaction_rating, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                reflection.id.to_string(),
                reflection.trade_id.to_string(),
                reflection.what_went_well,
                reflection.what_went_wrong,
                reflection.lessons_learned,
                reflection.action_items,
                reflection.satisfaction_rating,
                reflection.created_at.to_rfc3339(),
                reflection.updated_at.map(|ts| ts.to_rfc3339()),
            ],
        )
        .map_err(sql_err)?;

        Ok(())
    }
}
