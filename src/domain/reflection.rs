//! Post-mortem reflections linked 1:1 to trades.
//!
//! A reflection is only meaningful once the referenced trade is CLOSED, but
//! that precondition is the presentation layer's to enforce; the linkage here
//! only guarantees at most one reflection per trade with a stable id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::JournalError;

pub const MAX_SATISFACTION_RATING: u8 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub id: Uuid,
    pub trade_id: Uuid,
    pub what_went_well: Option<String>,
    pub what_went_wrong: Option<String>,
    pub lessons_learned: Option<String>,
    pub action_items: Option<String>,
    /// 0 to [`MAX_SATISFACTION_RATING`].
    pub satisfaction_rating: Option<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Partial update: only fields that are `Some` are written, so an update
/// never wipes text the user did not touch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReflectionUpdate {
    pub what_went_well: Option<String>,
    pub what_went_wrong: Option<String>,
    pub lessons_learned: Option<String>,
    pub action_items: Option<String>,
    pub satisfaction_rating: Option<u8>,
}

/// Create on first call, update thereafter. The id and `created_at` of an
/// existing reflection never change; there is never a second reflection for
/// one trade.
pub fn upsert(
    existing: Option<Reflection>,
    trade_id: Uuid,
    update: &ReflectionUpdate,
    now: DateTime<Utc>,
) -> Result<Reflection, JournalError> {
    if let Some(rating) = update.satisfaction_rating {
        if rating > MAX_SATISFACTION_RATING {
            return Err(JournalError::Validation {
                field: "satisfaction_rating".into(),
                reason: format!("{rating} must be between 0 and {MAX_SATISFACTION_RATING}"),
            });
        }
    }

    match existing {
        Some(mut reflection) => {
            if update.what_went_well.is_some() {
                reflection.what_went_well = update.what_went_well.clone();
            }
            if update.what_went_wrong.is_some() {
                reflection.what_went_wrong = update.what_went_wrong.clone();
            }
            if update.lessons_learned.is_some() {
                reflection.lessons_learned = update.lessons_learned.clone();
            }
            if update.action_items.is_some() {
                reflection.action_items = update.action_items.clone();
            }
            if update.satisfaction_rating.is_some() {
                reflection.satisfaction_rating = update.satisfaction_rating;
            }
            reflection.updated_at = Some(now);
            Ok(reflection)
        }
        None => Ok(Reflection {
            id: Uuid::new_v4(),
            trade_id,
            what_went_well: update.what_went_well.clone(),
            what_went_wrong: update.what_went_wrong.clone(),
            lessons_learned: update.lessons_learned.clone(),
            action_items: update.action_items.clone(),
            satisfaction_rating: update.satisfaction_rating,
            created_at: now,
            updated_at: None,
        }),
    }
}
