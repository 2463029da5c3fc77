use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use servwatch_alerting::{subscriber, AlertEngine, InMemoryAlertStore};
use servwatch_core::metric::MetricSample;
use servwatch_core::threshold::ThresholdDefinition;
use servwatch_core::types::DbId;
use servwatch_events::{EventBus, NotificationDispatcher, PlatformEvent, EVENT_METRIC_PERSISTED};

fn disk_rule(server_id: i64) -> ThresholdDefinition {
    ThresholdDefinition {
        name: "Disk nearly full".to_string(),
        description: String::new(),
        metric_type: "disk".to_string(),
        operator: ">".to_string(),
        value: 80.0,
        duration_secs: 0,
        severity: "warning".to_string(),
        enable_discord: false,
        enable_email: false,
        enable_webhook: false,
        webhook_url: String::new(),
        cooldown_minutes: 15,
        server_id: Some(server_id),
        group_id: None,
        enabled: true,
    }
}

fn full_disk(server_id: i64) -> MetricSample {
    MetricSample {
        server_id,
        timestamp: Utc::now(),
        cpu_usage: 5.0,
        cpu_temp: None,
        memory_total: 1_000,
        memory_used: 100,
        memory_free: 900,
        disk_total: 1_000,
        disk_used: 950,
        disk_free: 50,
        net_upload: 0,
        net_download: 0,
    }
}

#[tokio::test]
async fn persisted_metric_event_is_evaluated() {
    let store = Arc::new(InMemoryAlertStore::new());
    let server_id = store.add_server("files-01", "10.0.2.1").await;
    store.add_threshold(&disk_rule(server_id)).await.unwrap();

    let dispatcher = Arc::new(NotificationDispatcher::new(Duration::from_secs(1)));
    let engine = Arc::new(AlertEngine::new(store.clone(), dispatcher));
    let bus = EventBus::default();
    let handle = tokio::spawn(subscriber::run(engine, bus.subscribe()));

    // Unrelated events are ignored.
    bus.publish(PlatformEvent::new("server.created").with_source("server", server_id));
    bus.publish(
        PlatformEvent::new(EVENT_METRIC_PERSISTED)
            .with_source("server", server_id)
            .with_payload(serde_json::to_value(full_disk(server_id)).unwrap()),
    );

    let mut alerts = Vec::new();
    for _ in 0..100 {
        alerts = store.alerts().await;
        if !alerts.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].metric_type, "disk");
    assert_eq!(alerts[0].severity, "warning");

    drop(bus);
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("subscriber stops when the bus closes")
        .unwrap();
}

#[tokio::test]
async fn malformed_payload_is_skipped() {
    let store = Arc::new(InMemoryAlertStore::new());
    let dispatcher = Arc::new(NotificationDispatcher::new(Duration::from_secs(1)));
    let engine = Arc::new(AlertEngine::new(store.clone(), dispatcher));
    let bus = EventBus::default();
    let handle = tokio::spawn(subscriber::run(engine, bus.subscribe()));

    bus.publish(
        PlatformEvent::new(EVENT_METRIC_PERSISTED).with_payload(serde_json::json!({"bogus": true})),
    );
    drop(bus);

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("subscriber stops when the bus closes")
        .unwrap();
    assert!(store.alerts().await.is_empty());
}

#[tokio::test]
async fn lagging_subscriber_resumes_with_retained_samples() {
    let store = Arc::new(InMemoryAlertStore::new());
    let mut servers: Vec<DbId> = Vec::new();
    for i in 0..5 {
        servers.push(store.add_server(&format!("files-0{i}"), "10.0.2.1").await);
    }
    let mut rule = disk_rule(servers[0]);
    rule.server_id = None;
    rule.cooldown_minutes = 0;
    store.add_threshold(&rule).await.unwrap();

    let dispatcher = Arc::new(NotificationDispatcher::new(Duration::from_secs(1)));
    let engine = Arc::new(AlertEngine::new(store.clone(), dispatcher));
    let bus = EventBus::new(2);
    let handle = tokio::spawn(subscriber::run(engine, bus.subscribe()));

    // Published before the subscriber task first polls, overflowing the buffer.
    for &server_id in &servers {
        bus.publish(
            PlatformEvent::new(EVENT_METRIC_PERSISTED)
                .with_source("server", server_id)
                .with_payload(serde_json::to_value(full_disk(server_id)).unwrap()),
        );
    }

    let mut alerts = Vec::new();
    for _ in 0..100 {
        alerts = store.alerts().await;
        if alerts.len() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let mut alerted: Vec<DbId> = alerts.iter().map(|a| a.server_id).collect();
    alerted.sort_unstable();
    assert_eq!(alerted, servers[3..].to_vec());

    drop(bus);
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("subscriber stops when the bus closes")
        .unwrap();
}
