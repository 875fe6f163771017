use super::*;
use std::sync::Arc;

use pricewatch::config::SchedulerConfig;
use pricewatch::scheduler::PollScheduler;

#[tokio::test]
async fn test_scheduler_lifecycle() -> anyhow::Result<()> {
    let engine = Arc::new(build_engine(RecordingNotifier::new()).await);

    let mut scheduler = PollScheduler::new(
        engine,
        SchedulerConfig {
            check_interval: "0 * * * *".to_string(),
        },
    )
    .await?;

    scheduler.start().await?;

    let stats = scheduler.stats().await;
    assert_eq!(stats.run_count, 0);
    assert!(stats.last_run.is_none());

    scheduler.shutdown().await?;
    Ok(())
}

#[tokio::test]
async fn test_scheduler_rejects_invalid_cron() {
    let engine = Arc::new(build_engine(RecordingNotifier::new()).await);

    let result = PollScheduler::new(
        engine,
        SchedulerConfig {
            check_interval: "every hour".to_string(),
        },
    )
    .await;

    assert!(result.is_err());
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains("Invalid cron expression")
    );
}
