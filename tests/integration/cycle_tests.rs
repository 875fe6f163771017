use super::*;
use std::sync::Arc;
use std::time::Duration;

use pricewatch::AlertDecision;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_product(server: &MockServer, route: &str, title: &str, price: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(product_page(title, price)))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_baseline_check_emits_no_alert() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_product(&server, "/p/lamp", "Desk Lamp", "$40.00").await;

    let notifier = RecordingNotifier::new();
    let engine = build_engine(notifier.clone()).await;

    // Insert without the immediate extraction so the cycle performs the
    // first successful check itself.
    let url = format!("{}/p/lamp", server.uri());
    engine.store().upsert(42, &url).await?;

    let summary = engine.run_cycle_once().await?;
    assert_eq!(summary.checked, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.alerts, 0);
    assert!(notifier.alerts().is_empty());

    let item = &engine.list_tracked(42).await?[0];
    assert_eq!(item.current_price, Some(40.0));

    Ok(())
}

#[tokio::test]
async fn test_threshold_drop_alerts_and_commits() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_product(&server, "/p/keyboard", "Keyboard", "$1,000.00").await;

    let notifier = RecordingNotifier::new();
    let engine = build_engine(notifier.clone()).await;

    let url = format!("{}/p/keyboard", server.uri());
    engine.track(42, &url).await?; // baseline 1000

    // 6% drop, above the 5% threshold.
    server.reset().await;
    mount_product(&server, "/p/keyboard", "Keyboard", "$940.00").await;

    let summary = engine.run_cycle_once().await?;
    assert_eq!(summary.alerts, 1);
    assert_eq!(summary.delivery_failures, 0);

    let alerts = notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].decision, AlertDecision::PriceDrop);
    assert_eq!(alerts[0].old_price, 1000.0);
    assert_eq!(alerts[0].new_price, 940.0);
    assert_eq!(alerts[0].user_id, 42);

    let item = &engine.list_tracked(42).await?[0];
    assert_eq!(item.current_price, Some(940.0));

    Ok(())
}

#[tokio::test]
async fn test_small_change_above_target_is_silent() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_product(&server, "/p/monitor", "Monitor", "$1,000.00").await;

    let notifier = RecordingNotifier::new();
    let engine = build_engine(notifier.clone()).await;

    let url = format!("{}/p/monitor", server.uri());
    engine.track(42, &url).await?;
    engine.set_target_price(42, 1, 950.0).await?;

    // 4% drop: below threshold, above target.
    server.reset().await;
    mount_product(&server, "/p/monitor", "Monitor", "$960.00").await;

    let summary = engine.run_cycle_once().await?;
    assert_eq!(summary.alerts, 0);
    assert!(notifier.alerts().is_empty());

    // The new price is still committed.
    let item = &engine.list_tracked(42).await?[0];
    assert_eq!(item.current_price, Some(960.0));

    Ok(())
}

#[tokio::test]
async fn test_target_reached_takes_precedence_over_drop() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_product(&server, "/p/monitor", "Monitor", "$1,000.00").await;

    let notifier = RecordingNotifier::new();
    let engine = build_engine(notifier.clone()).await;

    let url = format!("{}/p/monitor", server.uri());
    engine.track(42, &url).await?;
    engine.set_target_price(42, 1, 950.0).await?;

    // 5.5% drop would qualify as PriceDrop, but the target wins.
    server.reset().await;
    mount_product(&server, "/p/monitor", "Monitor", "$945.00").await;

    engine.run_cycle_once().await?;

    let alerts = notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].decision, AlertDecision::TargetReached);
    assert_eq!(alerts[0].target_price, Some(950.0));

    Ok(())
}

#[tokio::test]
async fn test_one_failing_item_does_not_block_others() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_product(&server, "/p/good", "Good Item", "$1,000.00").await;
    mount_product(&server, "/p/bad", "Bad Item", "$500.00").await;

    let notifier = RecordingNotifier::new();
    let engine = build_engine(notifier.clone()).await;

    let good_url = format!("{}/p/good", server.uri());
    let bad_url = format!("{}/p/bad", server.uri());
    engine.track(42, &good_url).await?;
    engine.track(42, &bad_url).await?;

    // Bad item starts failing; good item drops 6%.
    server.reset().await;
    mount_product(&server, "/p/good", "Good Item", "$940.00").await;
    Mock::given(method("GET"))
        .and(path("/p/bad"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let summary = engine.run_cycle_once().await?;
    assert_eq!(summary.checked, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.alerts, 1);

    let items = engine.list_tracked(42).await?;
    let good = items.iter().find(|i| i.url == good_url).unwrap();
    let bad = items.iter().find(|i| i.url == bad_url).unwrap();

    assert_eq!(good.current_price, Some(940.0));
    assert!(good.last_error.is_none());

    // The failed fetch never overwrites the previously confirmed price.
    assert_eq!(bad.current_price, Some(500.0));
    assert!(bad.last_error.as_deref().unwrap().contains("fetch failed"));

    Ok(())
}

#[tokio::test]
async fn test_layout_change_surfaces_as_parse_error() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_product(&server, "/p/shirt", "Shirt", "$20.00").await;

    let engine = build_engine(RecordingNotifier::new()).await;
    let url = format!("{}/p/shirt", server.uri());
    engine.track(42, &url).await?;

    // The page still loads but the price node is gone.
    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/p/shirt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><h1 class="product-title">Shirt</h1></body></html>"#,
        ))
        .mount(&server)
        .await;

    let summary = engine.run_cycle_once().await?;
    assert_eq!(summary.failed, 1);

    let item = &engine.list_tracked(42).await?[0];
    assert_eq!(item.current_price, Some(20.0));
    assert!(item.last_error.as_deref().unwrap().contains("missing price"));

    Ok(())
}

#[tokio::test]
async fn test_delivery_failure_does_not_roll_back_price() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_product(&server, "/p/keyboard", "Keyboard", "$1,000.00").await;

    let engine = build_engine(Arc::new(FailingNotifier)).await;
    let url = format!("{}/p/keyboard", server.uri());
    engine.track(42, &url).await?;

    server.reset().await;
    mount_product(&server, "/p/keyboard", "Keyboard", "$940.00").await;

    let summary = engine.run_cycle_once().await?;
    assert_eq!(summary.alerts, 1);
    assert_eq!(summary.delivery_failures, 1);

    // The change was real and recorded even though the user missed it.
    let item = &engine.list_tracked(42).await?[0];
    assert_eq!(item.current_price, Some(940.0));

    Ok(())
}

#[tokio::test]
async fn test_concurrent_triggers_run_one_cycle() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/p/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(product_page("Slow Item", "$10.00"))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let engine = build_engine(RecordingNotifier::new()).await;
    engine
        .store()
        .upsert(42, &format!("{}/p/slow", server.uri()))
        .await?;

    let (first, second) = tokio::join!(engine.run_cycle_once(), engine.run_cycle_once());
    let (first, second) = (first?, second?);

    let skipped = [&first, &second].iter().filter(|s| s.skipped).count();
    assert_eq!(skipped, 1);

    let ran = if first.skipped { second } else { first };
    assert_eq!(ran.checked, 1);

    Ok(())
}
