use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::config::SchedulerConfig;
use crate::engine::TrackerEngine;

/// Running totals for the recurring poll job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleStats {
    pub run_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub skipped_count: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_alerts: usize,
}

/// Cron-driven trigger for the engine's poll cycle. Overlap protection lives
/// in the monitor itself; a trigger that lands mid-cycle counts as skipped.
pub struct PollScheduler {
    scheduler: JobScheduler,
    engine: Arc<TrackerEngine>,
    stats: Arc<RwLock<CycleStats>>,
    config: SchedulerConfig,
}

impl std::fmt::Debug for PollScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollScheduler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PollScheduler {
    pub async fn new(engine: Arc<TrackerEngine>, config: SchedulerConfig) -> Result<Self> {
        if !Self::validate_cron_expression(&config.check_interval) {
            return Err(anyhow::anyhow!(
                "Invalid cron expression: {}",
                config.check_interval
            ));
        }

        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler,
            engine,
            stats: Arc::new(RwLock::new(CycleStats::default())),
            config,
        })
    }

    pub async fn start(&mut self) -> Result<()> {
        let engine = Arc::clone(&self.engine);
        let stats = Arc::clone(&self.stats);

        let job = Job::new_async(self.config.check_interval.as_str(), move |_uuid, _l| {
            let engine = Arc::clone(&engine);
            let stats = Arc::clone(&stats);

            Box::pin(async move {
                let result = engine.run_cycle_once().await;

                let mut stats = stats.write().await;
                stats.run_count += 1;
                stats.last_run = Some(Utc::now());

                match result {
                    Ok(summary) if summary.skipped => {
                        stats.skipped_count += 1;
                    }
                    Ok(summary) => {
                        stats.success_count += 1;
                        stats.last_error = None;
                        stats.last_alerts = summary.alerts;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "scheduled poll cycle failed");
                        stats.error_count += 1;
                        stats.last_error = Some(e.to_string());
                    }
                }
            })
        })?;

        self.scheduler.add(job).await?;
        self.scheduler.start().await?;
        tracing::info!(interval = %self.config.check_interval, "poll scheduler started");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.scheduler.shutdown().await?;
        tracing::info!("poll scheduler shutdown");
        Ok(())
    }

    pub async fn stats(&self) -> CycleStats {
        self.stats.read().await.clone()
    }

    /// Validate a cron expression
    pub fn validate_cron_expression(expression: &str) -> bool {
        // Basic cron validation - 5 parts (minute hour day month weekday)
        let parts: Vec<&str> = expression.split_whitespace().collect();
        if parts.len() != 5 {
            return false;
        }

        // Each part should be valid
        for part in parts {
            if part.is_empty() {
                return false;
            }
            // Allow numbers, ranges, lists, wildcards, and steps
            if !part
                .chars()
                .all(|c| c.is_ascii_digit() || c == '*' || c == '-' || c == ',' || c == '/')
            {
                return false;
            }
        }

        true
    }
}
