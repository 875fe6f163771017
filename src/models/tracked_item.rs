use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::generate_id;

/// One (user, product URL) pair under price surveillance. Exactly one row
/// exists per pair; re-tracking reuses the existing row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct TrackedItem {
    pub id: String,
    pub user_id: i64,
    pub url: String,

    // Last successful extraction
    pub title: Option<String>,
    pub current_price: Option<f64>,

    // User-set absolute alert threshold
    pub target_price: Option<f64>,

    // Check status
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,

    // Metadata
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of one extraction attempt, as applied to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Success { title: String, price: f64 },
    Failure { error: String },
}

impl TrackedItem {
    pub fn new(user_id: i64, url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            user_id,
            url: url.into(),
            title: None,
            current_price: None,
            target_price: None,
            last_checked_at: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Title for user-facing listings; tolerates never-fetched items.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(not yet fetched)")
    }

    /// A baseline price exists once the first extraction succeeded; only then
    /// can change detection produce alerts.
    pub fn has_baseline(&self) -> bool {
        self.current_price.is_some()
    }
}
