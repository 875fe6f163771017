use std::sync::Arc;

use tracing::{debug, info};

use crate::config::MonitorConfig;
use crate::extract::PriceExtractor;
use crate::models::{CheckOutcome, PricePoint, TrackedItem};
use crate::monitor::{CycleSummary, PriceMonitor};
use crate::notify::Notifier;
use crate::policy::AlertPolicy;
use crate::store::SqliteStore;
use crate::utils::error::AppError;
use crate::Result;

/// The price-tracking engine. Holds the store, extractor registry, policy,
/// and dispatcher behind one instance constructed at startup; the chat shell
/// and the scheduler only ever talk to this.
pub struct TrackerEngine {
    store: Arc<SqliteStore>,
    extractor: Arc<PriceExtractor>,
    monitor: PriceMonitor,
}

impl TrackerEngine {
    pub fn new(
        store: Arc<SqliteStore>,
        extractor: Arc<PriceExtractor>,
        notifier: Arc<dyn Notifier>,
        monitor_config: MonitorConfig,
        max_concurrent_checks: usize,
    ) -> Self {
        let policy = AlertPolicy::new(monitor_config.alert_threshold_percent);
        let monitor = PriceMonitor::new(
            Arc::clone(&store),
            Arc::clone(&extractor),
            notifier,
            policy,
            max_concurrent_checks,
        );

        Self {
            store,
            extractor,
            monitor,
        }
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Start tracking a URL for a user. Unsupported hosts are rejected
    /// synchronously; otherwise the item is created (or reused) and a first
    /// extraction runs immediately so the user gets instant feedback. An
    /// extraction failure is recorded on the item, not returned as an error.
    pub async fn track(&self, user_id: i64, url: &str) -> Result<TrackedItem> {
        self.extractor.supports(url)?;

        let item = self.store.upsert(user_id, url).await?;

        match self.extractor.extract(url).await {
            Ok(extraction) => {
                info!(user_id, item_id = %item.id, price = extraction.price, "tracking started");
                self.store
                    .apply_check_result(
                        &item.id,
                        &CheckOutcome::Success {
                            title: extraction.title,
                            price: extraction.price,
                        },
                    )
                    .await?;
            }
            Err(err) => {
                debug!(user_id, item_id = %item.id, error = %err, "first extraction failed");
                self.store
                    .apply_check_result(
                        &item.id,
                        &CheckOutcome::Failure {
                            error: err.to_string(),
                        },
                    )
                    .await?;
            }
        }

        self.store
            .get(&item.id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("tracked item {}", item.id)))
    }

    /// Items in creation order; positions are the indices the stop and
    /// target-price commands accept.
    pub async fn list_tracked(&self, user_id: i64) -> Result<Vec<TrackedItem>> {
        self.store.list_for_user(user_id).await
    }

    /// Stop tracking the item at the 1-based position, removing it and its
    /// history.
    pub async fn stop_tracking(&self, user_id: i64, index: usize) -> Result<()> {
        let removed = self.store.remove_at(user_id, index).await?;
        info!(user_id, item_id = %removed.id, url = %removed.url, "tracking stopped");
        Ok(())
    }

    /// Set the absolute price at/below which an alert always fires.
    pub async fn set_target_price(
        &self,
        user_id: i64,
        index: usize,
        price: f64,
    ) -> Result<TrackedItem> {
        let item = self.store.item_at(user_id, index).await?;
        self.store.set_target_price(&item.id, Some(price)).await?;
        self.store
            .get(&item.id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("tracked item {}", item.id)))
    }

    /// Recent confirmed prices for the item at the 1-based position.
    pub async fn price_history(
        &self,
        user_id: i64,
        index: usize,
        limit: u32,
    ) -> Result<Vec<PricePoint>> {
        let item = self.store.item_at(user_id, index).await?;
        self.store.price_history(&item.id, limit).await
    }

    /// Run one poll cycle over every tracked item. Exposed for the scheduler
    /// and for manual triggering.
    pub async fn run_cycle_once(&self) -> Result<CycleSummary> {
        self.monitor.run_cycle().await
    }
}
