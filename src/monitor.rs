use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::extract::{ExtractError, PriceExtractor};
use crate::models::{CheckOutcome, TrackedItem};
use crate::notify::{Notifier, PriceAlert};
use crate::policy::AlertPolicy;
use crate::store::SqliteStore;
use crate::Result;

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleSummary {
    pub checked: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub alerts: usize,
    pub delivery_failures: usize,
    pub skipped: bool,
    pub elapsed_ms: u64,
}

impl CycleSummary {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ItemCheck {
    succeeded: bool,
    alerted: bool,
    delivery_failed: bool,
}

/// Runs one poll cycle over all tracked items: extract, compare, commit,
/// notify. Item failures are contained; only a store that cannot be read at
/// all aborts the cycle. Cycles never overlap.
pub struct PriceMonitor {
    store: Arc<SqliteStore>,
    extractor: Arc<PriceExtractor>,
    notifier: Arc<dyn Notifier>,
    policy: AlertPolicy,
    max_concurrent: usize,
    cycle_lock: Mutex<()>,
}

impl PriceMonitor {
    pub fn new(
        store: Arc<SqliteStore>,
        extractor: Arc<PriceExtractor>,
        notifier: Arc<dyn Notifier>,
        policy: AlertPolicy,
        max_concurrent: usize,
    ) -> Self {
        Self {
            store,
            extractor,
            notifier,
            policy,
            max_concurrent: max_concurrent.max(1),
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> &AlertPolicy {
        &self.policy
    }

    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        let start = Instant::now();

        // A trigger firing while the previous cycle is still draining is
        // dropped, not queued; the next trigger covers the same items.
        let Ok(_guard) = self.cycle_lock.try_lock() else {
            warn!("poll cycle still running, skipping trigger");
            return Ok(CycleSummary::skipped());
        };

        let items = self.store.list_all().await?;
        debug!(items = items.len(), "starting poll cycle");
        metrics::gauge!("pricewatch_tracked_items").set(items.len() as f64);

        let checks: Vec<ItemCheck> = stream::iter(items.into_iter())
            .map(|item| self.check_item(item))
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let summary = CycleSummary {
            checked: checks.len(),
            succeeded: checks.iter().filter(|c| c.succeeded).count(),
            failed: checks.iter().filter(|c| !c.succeeded).count(),
            alerts: checks.iter().filter(|c| c.alerted).count(),
            delivery_failures: checks.iter().filter(|c| c.delivery_failed).count(),
            skipped: false,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        metrics::counter!("pricewatch_cycles_total").increment(1);
        metrics::counter!("pricewatch_checks_total").increment(summary.checked as u64);
        metrics::counter!("pricewatch_check_failures_total").increment(summary.failed as u64);
        metrics::counter!("pricewatch_alerts_total").increment(summary.alerts as u64);

        info!(
            checked = summary.checked,
            succeeded = summary.succeeded,
            failed = summary.failed,
            alerts = summary.alerts,
            elapsed_ms = summary.elapsed_ms,
            "poll cycle finished"
        );
        Ok(summary)
    }

    async fn check_item(&self, item: TrackedItem) -> ItemCheck {
        match self.extractor.extract(&item.url).await {
            Ok(extraction) => {
                let decision =
                    self.policy
                        .evaluate(item.current_price, extraction.price, item.target_price);

                let outcome = CheckOutcome::Success {
                    title: extraction.title.clone(),
                    price: extraction.price,
                };
                if let Err(e) = self.store.apply_check_result(&item.id, &outcome).await {
                    error!(item_id = %item.id, error = %e, "failed to persist check result");
                    return ItemCheck::default();
                }

                let mut check = ItemCheck {
                    succeeded: true,
                    ..ItemCheck::default()
                };

                if decision.warrants_notification() {
                    check.alerted = true;
                    debug!(item_id = %item.id, ?decision, price = extraction.price,
                           "price change committed");
                    // current_price is present whenever a decision fires;
                    // the first check only establishes a baseline.
                    let alert = PriceAlert {
                        user_id: item.user_id,
                        item_id: item.id.clone(),
                        title: extraction.title,
                        url: item.url.clone(),
                        decision,
                        old_price: item.current_price.unwrap_or(extraction.price),
                        new_price: extraction.price,
                        target_price: item.target_price,
                    };

                    if let Err(e) = self.notifier.notify(&alert).await {
                        // The price change is real and already committed; the
                        // user just missed this round's message.
                        warn!(item_id = %item.id, user_id = item.user_id, error = %e,
                              "alert delivery failed");
                        check.delivery_failed = true;
                        metrics::counter!("pricewatch_delivery_failures_total").increment(1);
                    }
                }

                check
            }
            Err(err) => {
                match &err {
                    ExtractError::Parse { missing } => {
                        // Layout drift upstream; repeated occurrences are the
                        // operator's cue to update the site strategy.
                        warn!(item_id = %item.id, url = %item.url, %missing,
                              "page parse failed, possible site layout change");
                    }
                    ExtractError::Fetch { cause } => {
                        debug!(item_id = %item.id, url = %item.url, %cause,
                               "fetch failed, will retry next cycle");
                    }
                    ExtractError::UnsupportedSite { host } => {
                        warn!(item_id = %item.id, %host, "tracked item has unsupported host");
                    }
                }

                let outcome = CheckOutcome::Failure {
                    error: err.to_string(),
                };
                if let Err(e) = self.store.apply_check_result(&item.id, &outcome).await {
                    error!(item_id = %item.id, error = %e, "failed to persist check failure");
                }
                ItemCheck::default()
            }
        }
    }
}
