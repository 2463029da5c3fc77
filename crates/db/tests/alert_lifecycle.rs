//! Integration tests for the alert and threshold repositories.
//!
//! Exercises the transactional open step, conditional status updates and
//! the scope queries the resolver builds on.

use assert_matches::assert_matches;
use chrono::{Duration, SubsecRound, Utc};
use sqlx::PgPool;
use servwatch_core::threshold::ThresholdDefinition;
use servwatch_core::types::{DbId, Timestamp};
use servwatch_db::models::alert::{AlertFilter, NewAlert, OpenAlertOutcome};
use servwatch_db::models::metric::CreateMetric;
use servwatch_db::models::server::{CreateServer, CreateServerGroup};
use servwatch_db::repositories::{
    AlertRepo, MetricRepo, ServerGroupRepo, ServerRepo, ThresholdRepo,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Current time at the microsecond precision PostgreSQL stores.
fn now() -> Timestamp {
    Utc::now().trunc_subsecs(6)
}

async fn server(pool: &PgPool, hostname: &str) -> DbId {
    ServerRepo::create(
        pool,
        &CreateServer {
            hostname: hostname.to_string(),
            ip_address: "10.0.0.1".to_string(),
            description: String::new(),
        },
    )
    .await
    .unwrap()
    .id
}

fn definition(server_id: Option<DbId>, group_id: Option<DbId>, cooldown: i32) -> ThresholdDefinition {
    ThresholdDefinition {
        name: "High CPU".to_string(),
        description: String::new(),
        metric_type: "cpu".to_string(),
        operator: ">".to_string(),
        value: 90.0,
        duration_secs: 0,
        severity: "critical".to_string(),
        enable_discord: false,
        enable_email: false,
        enable_webhook: false,
        webhook_url: String::new(),
        cooldown_minutes: cooldown,
        server_id,
        group_id,
        enabled: true,
    }
}

fn new_alert(server_id: DbId, threshold_id: DbId, at: Timestamp) -> NewAlert {
    NewAlert {
        title: "Alert: CPU on web-01".to_string(),
        message: "Metric CPU reached 95.00".to_string(),
        metric_type: "cpu".to_string(),
        metric_value: 95.0,
        threshold_value: 90.0,
        operator: ">".to_string(),
        severity: "critical".to_string(),
        server_id,
        threshold_id,
        triggered_at: at,
    }
}

// ---------------------------------------------------------------------------
// Open / cooldown
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn open_is_idempotent_while_alert_is_open(pool: PgPool) {
    let server_id = server(&pool, "web-01").await;
    let threshold = ThresholdRepo::create(&pool, &definition(Some(server_id), None, 0), None)
        .await
        .unwrap();
    let now = now();

    let first = AlertRepo::open_if_absent(&pool, &new_alert(server_id, threshold.id, now))
        .await
        .unwrap();
    let opened = assert_matches!(first, OpenAlertOutcome::Opened(alert) => alert);
    assert_eq!(opened.status, "active");

    let second = AlertRepo::open_if_absent(&pool, &new_alert(server_id, threshold.id, now))
        .await
        .unwrap();
    assert_matches!(second, OpenAlertOutcome::AlreadyOpen(id) if id == opened.id);

    let reloaded = ThresholdRepo::find_by_id(&pool, threshold.id).await.unwrap().unwrap();
    assert_eq!(reloaded.last_triggered_at, Some(now));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cooldown_blocks_reopen_until_window_passes(pool: PgPool) {
    let server_id = server(&pool, "web-01").await;
    let threshold = ThresholdRepo::create(&pool, &definition(Some(server_id), None, 2), None)
        .await
        .unwrap();
    let t0 = now() - Duration::minutes(10);

    let opened = AlertRepo::open_if_absent(&pool, &new_alert(server_id, threshold.id, t0))
        .await
        .unwrap();
    let alert = assert_matches!(opened, OpenAlertOutcome::Opened(a) => a);
    AlertRepo::resolve_if_open(&pool, alert.id, "cleared", t0 + Duration::seconds(10))
        .await
        .unwrap()
        .unwrap();

    let within = AlertRepo::open_if_absent(
        &pool,
        &new_alert(server_id, threshold.id, t0 + Duration::seconds(30)),
    )
    .await
    .unwrap();
    assert_matches!(within, OpenAlertOutcome::CoolingDown);

    let after = AlertRepo::open_if_absent(
        &pool,
        &new_alert(server_id, threshold.id, t0 + Duration::minutes(3)),
    )
    .await
    .unwrap();
    assert_matches!(after, OpenAlertOutcome::Opened(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn last_triggered_at_never_moves_backwards(pool: PgPool) {
    let server_a = server(&pool, "web-01").await;
    let server_b = server(&pool, "web-02").await;
    let threshold = ThresholdRepo::create(&pool, &definition(None, None, 0), None)
        .await
        .unwrap();
    let later = now();
    let earlier = later - Duration::minutes(5);

    AlertRepo::open_if_absent(&pool, &new_alert(server_a, threshold.id, later))
        .await
        .unwrap();
    AlertRepo::open_if_absent(&pool, &new_alert(server_b, threshold.id, earlier))
        .await
        .unwrap();

    let reloaded = ThresholdRepo::find_by_id(&pool, threshold.id).await.unwrap().unwrap();
    assert_eq!(reloaded.last_triggered_at, Some(later));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn earlier_reading_committed_late_is_still_cooling_down(pool: PgPool) {
    let server_a = server(&pool, "web-01").await;
    let server_b = server(&pool, "web-02").await;
    let threshold = ThresholdRepo::create(&pool, &definition(None, None, 15), None)
        .await
        .unwrap();
    let later = now();
    let earlier = later - Duration::seconds(1);

    let first = AlertRepo::open_if_absent(&pool, &new_alert(server_a, threshold.id, later))
        .await
        .unwrap();
    assert_matches!(first, OpenAlertOutcome::Opened(_));

    let second = AlertRepo::open_if_absent(&pool, &new_alert(server_b, threshold.id, earlier))
        .await
        .unwrap();
    assert_matches!(second, OpenAlertOutcome::CoolingDown);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn disabled_threshold_does_not_open(pool: PgPool) {
    let server_id = server(&pool, "web-01").await;
    let mut def = definition(Some(server_id), None, 0);
    def.enabled = false;
    let threshold = ThresholdRepo::create(&pool, &def, None).await.unwrap();

    let outcome = AlertRepo::open_if_absent(&pool, &new_alert(server_id, threshold.id, Utc::now()))
        .await
        .unwrap();
    assert_matches!(outcome, OpenAlertOutcome::ThresholdGone);
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn acknowledge_then_resolve_appends_notes(pool: PgPool) {
    let server_id = server(&pool, "web-01").await;
    let threshold = ThresholdRepo::create(&pool, &definition(Some(server_id), None, 0), None)
        .await
        .unwrap();
    let opened = AlertRepo::open_if_absent(&pool, &new_alert(server_id, threshold.id, Utc::now()))
        .await
        .unwrap();
    let alert = assert_matches!(opened, OpenAlertOutcome::Opened(a) => a);

    let acked = AlertRepo::acknowledge_if_active(&pool, alert.id, Some(7), "looking", Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(acked.status, "acknowledged");
    assert_eq!(acked.acknowledged_by, Some(7));
    assert!(acked.acknowledged_at.is_some());

    let again = AlertRepo::acknowledge_if_active(&pool, alert.id, Some(7), "", Utc::now())
        .await
        .unwrap();
    assert!(again.is_none());

    let resolved = AlertRepo::resolve_if_open(&pool, alert.id, "fixed", Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(resolved.status, "resolved");
    assert!(resolved.resolved_at.is_some());
    assert_eq!(resolved.notes, "looking\nfixed");

    let twice = AlertRepo::resolve_if_open(&pool, alert.id, "", Utc::now())
        .await
        .unwrap();
    assert!(twice.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn record_notification_stores_channels(pool: PgPool) {
    let server_id = server(&pool, "web-01").await;
    let threshold = ThresholdRepo::create(&pool, &definition(Some(server_id), None, 0), None)
        .await
        .unwrap();
    let opened = AlertRepo::open_if_absent(&pool, &new_alert(server_id, threshold.id, Utc::now()))
        .await
        .unwrap();
    let alert = assert_matches!(opened, OpenAlertOutcome::Opened(a) => a);

    let channels = vec!["discord".to_string(), "webhook".to_string()];
    AlertRepo::record_notification(&pool, alert.id, &channels, Utc::now())
        .await
        .unwrap();

    let reloaded = AlertRepo::find_by_id(&pool, alert.id).await.unwrap().unwrap();
    assert_eq!(reloaded.notify_channels, channels);
    assert!(reloaded.notified_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_filters_by_status_and_server(pool: PgPool) {
    let server_a = server(&pool, "web-01").await;
    let server_b = server(&pool, "web-02").await;
    let threshold = ThresholdRepo::create(&pool, &definition(None, None, 0), None)
        .await
        .unwrap();
    let now = now();
    AlertRepo::open_if_absent(&pool, &new_alert(server_a, threshold.id, now))
        .await
        .unwrap();
    AlertRepo::open_if_absent(&pool, &new_alert(server_b, threshold.id, now))
        .await
        .unwrap();

    let for_a = AlertRepo::list(
        &pool,
        &AlertFilter {
            server_id: Some(server_a),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(for_a.len(), 1);
    assert_eq!(for_a[0].server_id, server_a);

    let resolved = AlertRepo::list(
        &pool,
        &AlertFilter {
            status: Some("resolved".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(resolved.is_empty());

    assert_eq!(AlertRepo::list_active(&pool).await.unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Scope queries
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn direct_lookup_excludes_group_and_disabled_rows(pool: PgPool) {
    let server_id = server(&pool, "web-01").await;
    let other = server(&pool, "web-02").await;
    let group = ServerGroupRepo::create(
        &pool,
        &CreateServerGroup {
            name: "web".to_string(),
            description: String::new(),
            parent_id: None,
        },
    )
    .await
    .unwrap();
    ServerGroupRepo::add_server(&pool, group.id, server_id).await.unwrap();

    let global = ThresholdRepo::create(&pool, &definition(None, None, 0), None).await.unwrap();
    let direct = ThresholdRepo::create(&pool, &definition(Some(server_id), None, 0), None)
        .await
        .unwrap();
    ThresholdRepo::create(&pool, &definition(Some(other), None, 0), None).await.unwrap();
    let grouped = ThresholdRepo::create(&pool, &definition(None, Some(group.id), 0), None)
        .await
        .unwrap();
    let mut disabled = definition(Some(server_id), None, 0);
    disabled.enabled = false;
    ThresholdRepo::create(&pool, &disabled, None).await.unwrap();

    let ids: Vec<DbId> = ThresholdRepo::list_enabled_direct(&pool, server_id)
        .await
        .unwrap()
        .iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(ids, vec![direct.id, global.id]);

    let group_ids = ServerGroupRepo::group_ids_for_server(&pool, server_id).await.unwrap();
    assert_eq!(group_ids, vec![group.id]);

    let for_group = ThresholdRepo::list_enabled_for_group(&pool, group.id).await.unwrap();
    assert_eq!(for_group.len(), 1);
    assert_eq!(for_group[0].id, grouped.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn scope_check_constraint_rejects_both_columns(pool: PgPool) {
    let server_id = server(&pool, "web-01").await;
    let group = ServerGroupRepo::create(
        &pool,
        &CreateServerGroup {
            name: "web".to_string(),
            description: String::new(),
            parent_id: None,
        },
    )
    .await
    .unwrap();

    let result =
        ThresholdRepo::create(&pool, &definition(Some(server_id), Some(group.id), 0), None).await;
    assert!(result.is_err());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn soft_deleted_threshold_is_hidden(pool: PgPool) {
    let threshold = ThresholdRepo::create(&pool, &definition(None, None, 0), None).await.unwrap();
    assert!(ThresholdRepo::soft_delete(&pool, threshold.id).await.unwrap());
    assert!(!ThresholdRepo::soft_delete(&pool, threshold.id).await.unwrap());
    assert!(ThresholdRepo::find_by_id(&pool, threshold.id).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn metric_retention_deletes_old_rows(pool: PgPool) {
    let server_id = server(&pool, "web-01").await;
    let sample = |ts: Timestamp| CreateMetric {
        server_id,
        timestamp: Some(ts),
        cpu_usage: 12.0,
        cpu_temp: None,
        memory_total: 100,
        memory_used: 40,
        memory_free: 60,
        disk_total: 100,
        disk_used: 10,
        disk_free: 90,
        net_upload: 0,
        net_download: 0,
    };
    let now = now();
    MetricRepo::insert(&pool, &sample(now - Duration::days(40))).await.unwrap();
    let recent = MetricRepo::insert(&pool, &sample(now)).await.unwrap();

    let deleted = MetricRepo::delete_older_than(&pool, now - Duration::days(30))
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    let latest = MetricRepo::latest_for_server(&pool, server_id).await.unwrap().unwrap();
    assert_eq!(latest.id, recent.id);
    assert_eq!(latest.to_sample().memory_used, 40);
}
