use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::generate_id;

/// One confirmed price observation for a tracked item. Rows are appended on
/// every successful check and removed with the owning item.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct PricePoint {
    pub id: String,
    pub item_id: String,
    pub price: f64,
    pub recorded_at: DateTime<Utc>,
}

impl PricePoint {
    pub fn new(item_id: impl Into<String>, price: f64) -> Self {
        Self {
            id: generate_id(),
            item_id: item_id.into(),
            price,
            recorded_at: Utc::now(),
        }
    }
}
