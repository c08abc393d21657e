//! Domain error types.

use uuid::Uuid;

/// Top-level error type for tradenote.
///
/// Every variant carries enough context for a caller to render a precise
/// message without string-matching. The core never retries; transient-failure
/// handling belongs to the collaborator driving the store.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("trade {trade_id} is already settled")]
    AlreadySettled { trade_id: Uuid },

    #[error("invalid settlement: {reason}")]
    InvalidSettlement { reason: String },

    #[error("trade {id} not found")]
    TradeNotFound { id: Uuid },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("csv error: {reason}")]
    Csv { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&JournalError> for std::process::ExitCode {
    fn from(err: &JournalError) -> Self {
        let code: u8 = match err {
            JournalError::Io(_) | JournalError::Csv { .. } => 1,
            JournalError::ConfigParse { .. }
            | JournalError::ConfigMissing { .. }
            | JournalError::ConfigInvalid { .. } => 2,
            JournalError::Database { .. } | JournalError::DatabaseQuery { .. } => 3,
            JournalError::Validation { .. } => 4,
            JournalError::AlreadySettled { .. } | JournalError::InvalidSettlement { .. } => 5,
            JournalError::TradeNotFound { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
