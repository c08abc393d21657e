//! CLI definition and dispatch.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use uuid::Uuid;

use crate::adapters::csv_journal;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::sqlite_adapter::SqliteStoreAdapter;
use crate::domain::error::JournalError;
use crate::domain::position::{aggregate_positions, AggregationOptions};
use crate::domain::reflection::{self, ReflectionUpdate};
use crate::domain::risk::{format_risk_reward, risk_reward};
use crate::domain::settlement::settle;
use crate::domain::trade::{Trade, TradeType};
use crate::ports::config_port::ConfigPort;
use crate::ports::store_port::TradeStorePort;

#[derive(Parser, Debug)]
#[command(name = "tradenote", about = "Personal trade journal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record a new trade
    Add {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: String,
        /// buy or sell
        #[arg(long)]
        trade_type: String,
        #[arg(long)]
        quantity: f64,
        #[arg(long)]
        price: f64,
        /// RFC 3339 or YYYY-MM-DD; defaults to now
        #[arg(long)]
        executed_at: Option<String>,
        #[arg(long)]
        target_price: Option<f64>,
        #[arg(long)]
        stop_loss: Option<f64>,
        /// 1 to 5
        #[arg(long)]
        confidence: Option<u8>,
        #[arg(long)]
        rationale: Option<String>,
    },
    /// List all recorded trades
    List {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show positions aggregated per ticker
    Positions {
        #[arg(short, long)]
        config: PathBuf,
        /// Show closed entry trades as individual positions
        #[arg(long)]
        include_closed: bool,
        /// Count SELL entries as short positions
        #[arg(long)]
        short: bool,
    },
    /// Settle an open trade at a closing price
    Settle {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        price: f64,
        /// RFC 3339 or YYYY-MM-DD; defaults to now
        #[arg(long)]
        closed_at: Option<String>,
    },
    /// Record or update the post-trade reflection
    Reflect {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        id: Uuid,
        #[arg(long)]
        went_well: Option<String>,
        #[arg(long)]
        went_wrong: Option<String>,
        #[arg(long)]
        lessons: Option<String>,
        #[arg(long)]
        actions: Option<String>,
        /// 0 to 5
        #[arg(long)]
        rating: Option<u8>,
    },
    /// Show the reflection for a trade
    Reflection {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        id: Uuid,
    },
    /// Delete a trade
    Delete {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        id: Uuid,
    },
    /// Export the trade log to CSV
    Export {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn execute(command: Command) -> Result<(), JournalError> {
    match command {
        Command::Add {
            config,
            ticker,
            trade_type,
            quantity,
            price,
            executed_at,
            target_price,
            stop_loss,
            confidence,
            rationale,
        } => run_add(
            &config,
            &ticker,
            &trade_type,
            quantity,
            price,
            executed_at.as_deref(),
            target_price,
            stop_loss,
            confidence,
            rationale,
        ),
        Command::List { config } => run_list(&config),
        Command::Positions {
            config,
            include_closed,
            short,
        } => run_positions(&config, include_closed, short),
        Command::Settle {
            config,
            id,
            price,
            closed_at,
        } => run_settle(&config, id, price, closed_at.as_deref()),
        Command::Reflect {
            config,
            id,
            went_well,
            went_wrong,
            lessons,
            actions,
            rating,
        } => run_reflect(
            &config,
            id,
            ReflectionUpdate {
                what_went_well: went_well,
                what_went_wrong: went_wrong,
                lessons_learned: lessons,
                action_items: actions,
                satisfaction_rating: rating,
            },
        ),
        Command::Reflection { config, id } => run_show_reflection(&config, id),
        Command::Delete { config, id } => run_delete(&config, id),
        Command::Export { config, output } => run_export(&config, &output),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, JournalError> {
    FileConfigAdapter::from_file(path).map_err(|e| JournalError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn open_store(config: &dyn ConfigPort) -> Result<SqliteStoreAdapter, JournalError> {
    let store = SqliteStoreAdapter::from_config(config)?;
    store.initialize_schema()?;
    Ok(store)
}

fn journal_user(config: &dyn ConfigPort) -> Result<Uuid, JournalError> {
    match config.get_string("journal", "user_id") {
        Some(raw) => Uuid::parse_str(&raw).map_err(|e| JournalError::ConfigInvalid {
            section: "journal".into(),
            key: "user_id".into(),
            reason: e.to_string(),
        }),
        None => Ok(Uuid::nil()),
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, JournalError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    Err(JournalError::Validation {
        field: "timestamp".into(),
        reason: format!("{raw} is not RFC 3339 or YYYY-MM-DD"),
    })
}

fn timestamp_or_now(raw: Option<&str>) -> Result<DateTime<Utc>, JournalError> {
    match raw {
        Some(raw) => parse_timestamp(raw),
        None => Ok(Utc::now()),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_add(
    config_path: &Path,
    ticker: &str,
    trade_type: &str,
    quantity: f64,
    price: f64,
    executed_at: Option<&str>,
    target_price: Option<f64>,
    stop_loss: Option<f64>,
    confidence: Option<u8>,
    rationale: Option<String>,
) -> Result<(), JournalError> {
    let config = load_config(config_path)?;
    let user_id = journal_user(&config)?;
    let store = open_store(&config)?;

    let trade_type: TradeType = trade_type.parse()?;
    let executed_at = timestamp_or_now(executed_at)?;

    let mut trade = Trade::new(
        user_id,
        &ticker.to_ascii_uppercase(),
        trade_type,
        quantity,
        price,
        executed_at,
    );
    trade.target_price = target_price;
    trade.stop_loss = stop_loss;
    trade.confidence_level = confidence;
    trade.rationale = rationale;

    // Derived on entry and on every later edit of price/target/stop.
    let ratio = risk_reward(price, target_price.unwrap_or(0.0), stop_loss.unwrap_or(0.0));
    trade.risk_reward_ratio = (ratio > 0.0).then_some(ratio);

    trade.validate(Utc::now())?;
    store.create_trade(&trade)?;

    println!(
        "Recorded {} {} x{} @ {} (id {}, risk/reward {})",
        trade.trade_type.as_str(),
        trade.ticker_symbol,
        trade.quantity,
        trade.price,
        trade.id,
        format_risk_reward(ratio),
    );
    Ok(())
}

fn run_list(config_path: &Path) -> Result<(), JournalError> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    let trades = store.list_trades(journal_user(&config)?)?;

    if trades.is_empty() {
        println!("No trades recorded.");
        return Ok(());
    }

    for trade in &trades {
        let pnl = trade
            .profit_loss
            .map(|v| format!("{v:.2}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {}  {:<5} {:>10} @ {:<10} {:<6} r/r {:<6} p/l {}",
            trade.id,
            trade.executed_at.format("%Y-%m-%d"),
            trade.trade_type.as_str(),
            trade.quantity,
            trade.price,
            trade.status.as_str(),
            format_risk_reward(trade.risk_reward_ratio.unwrap_or(0.0)),
            pnl,
        );
    }
    Ok(())
}

fn run_positions(
    config_path: &Path,
    include_closed: bool,
    short: bool,
) -> Result<(), JournalError> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    let trades = store.list_trades(journal_user(&config)?)?;

    let options = AggregationOptions {
        include_closed,
        allow_short_entries: short
            || config.get_bool("journal", "allow_short_entries", false),
    };
    let positions = aggregate_positions(&trades, &options);

    if positions.is_empty() {
        println!("No positions.");
        return Ok(());
    }

    for position in &positions {
        let pnl = position
            .profit_loss
            .map(|v| format!("{v:.2}"))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<10} qty {:>12.4} avg {:>12.4} amount {:>14.2} p/l {}",
            position.ticker_symbol,
            position.total_quantity,
            position.average_price,
            position.total_amount,
            pnl,
        );
    }
    Ok(())
}

fn run_settle(
    config_path: &Path,
    id: Uuid,
    price: f64,
    closed_at: Option<&str>,
) -> Result<(), JournalError> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;

    let entry = store.get_trade(id)?;
    let settlement = settle(&entry, price, timestamp_or_now(closed_at)?)?;
    store.apply_settlement(&settlement)?;

    println!(
        "Settled {} {} x{} @ {} -> p/l {:.2} (closing trade {})",
        entry.trade_type.as_str(),
        entry.ticker_symbol,
        entry.quantity,
        price,
        settlement.closing.profit_loss.unwrap_or(0.0),
        settlement.closing.id,
    );
    Ok(())
}

fn run_reflect(
    config_path: &Path,
    id: Uuid,
    update: ReflectionUpdate,
) -> Result<(), JournalError> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;

    // Fail early on a bad trade id rather than creating an orphan.
    store.get_trade(id)?;

    let existing = store.get_reflection(id)?;
    let created = existing.is_none();
    let reflection = reflection::upsert(existing, id, &update, Utc::now())?;
    store.save_reflection(&reflection)?;

    if created {
        println!("Reflection recorded for trade {id}.");
    } else {
        println!("Reflection updated for trade {id}.");
    }
    Ok(())
}

fn run_show_reflection(config_path: &Path, id: Uuid) -> Result<(), JournalError> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;

    store.get_trade(id)?;
    match store.get_reflection(id)? {
        None => println!("No reflection recorded for trade {id} yet."),
        Some(reflection) => {
            for (label, value) in [
                ("went well", &reflection.what_went_well),
                ("went wrong", &reflection.what_went_wrong),
                ("lessons", &reflection.lessons_learned),
                ("actions", &reflection.action_items),
            ] {
                if let Some(text) = value {
                    println!("{label}: {text}");
                }
            }
            if let Some(rating) = reflection.satisfaction_rating {
                println!("satisfaction: {rating}/5");
            }
        }
    }
    Ok(())
}

fn run_delete(config_path: &Path, id: Uuid) -> Result<(), JournalError> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    store.delete_trade(id)?;
    println!("Deleted trade {id}.");
    Ok(())
}

fn run_export(config_path: &Path, output: &Path) -> Result<(), JournalError> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    let trades = store.list_trades(journal_user(&config)?)?;

    eprintln!("Exporting {} trades to {}", trades.len(), output.display());
    csv_journal::export_trades_to_path(output, &trades)?;
    Ok(())
}
