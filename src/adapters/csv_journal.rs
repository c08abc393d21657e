//! CSV export/import of the trade log, for backups and spreadsheet review.

use std::fs::File;
use std::path::Path;

use crate::domain::error::JournalError;
use crate::domain::trade::Trade;

fn csv_err(e: csv::Error) -> JournalError {
    JournalError::Csv {
        reason: e.to_string(),
    }
}

pub fn export_trades<W: std::io::Write>(writer: W, trades: &[Trade]) -> Result<(), JournalError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for trade in trades {
        wtr.serialize(trade).map_err(csv_err)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_trades_to_path<P: AsRef<Path>>(
    path: P,
    trades: &[Trade],
) -> Result<(), JournalError> {
    let file = File::create(path)?;
    export_trades(file, trades)
}

pub fn import_trades<R: std::io::Read>(reader: R) -> Result<Vec<Trade>, JournalError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut trades = Vec::new();
    for result in rdr.deserialize() {
        trades.push(result.map_err(csv_err)?);
    }
    Ok(trades)
}

pub fn import_trades_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Trade>, JournalError> {
    let file = File::open(path)?;
    import_trades(file)
}
