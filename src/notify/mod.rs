use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::policy::AlertDecision;
use crate::Result;

pub mod telegram;

pub use telegram::TelegramNotifier;

/// Everything a delivery channel needs to render a price alert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceAlert {
    pub user_id: i64,
    pub item_id: String,
    pub title: String,
    pub url: String,
    pub decision: AlertDecision,
    pub old_price: f64,
    pub new_price: f64,
    pub target_price: Option<f64>,
}

/// Outbound alert channel keyed by user id. Delivery failure surfaces as
/// `AppError::Delivery`; the store update that produced the alert is already
/// committed and stays committed.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &PriceAlert) -> Result<()>;
}
