//! Threshold administration over HTTP.

mod common;

use axum::http::StatusCode;
use common::{body_json, delete_auth, get_auth, post_json_auth, put_auth, put_json_auth, token};
use servwatch_db::models::server::CreateServerGroup;
use servwatch_db::repositories::{ServerGroupRepo, ThresholdRepo};
use sqlx::PgPool;

fn definition(server_id: Option<i64>) -> serde_json::Value {
    serde_json::json!({
        "name": "Disk almost full",
        "metric_type": "disk",
        "operator": ">=",
        "value": 85.0,
        "severity": "warning",
        "cooldown_minutes": 30,
        "enable_discord": true,
        "server_id": server_id,
    })
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_creates_threshold(pool: PgPool) {
    let server = common::create_server(&pool, "db-01").await;
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app,
        "/api/v1/thresholds",
        &token(1, "admin"),
        definition(Some(server.id)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["name"], "Disk almost full");
    assert_eq!(json["data"]["operator"], ">=");
    assert_eq!(json["data"]["server_id"], server.id);
    assert_eq!(json["data"]["created_by"], 1);
    assert_eq!(json["data"]["enabled"], true);
    assert!(json["data"]["last_triggered_at"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn non_admin_cannot_create(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json_auth(
        app,
        "/api/v1/thresholds",
        &token(2, "user"),
        definition(None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn invalid_definitions_are_rejected(pool: PgPool) {
    let admin = token(1, "admin");

    let mut both_scopes = definition(Some(1));
    both_scopes["group_id"] = serde_json::json!(1);
    let mut bad_operator = definition(None);
    bad_operator["operator"] = serde_json::json!("=>");
    let mut webhook_without_url = definition(None);
    webhook_without_url["enable_webhook"] = serde_json::json!(true);
    let mut negative_cooldown = definition(None);
    negative_cooldown["cooldown_minutes"] = serde_json::json!(-1);

    for body in [both_scopes, bad_operator, webhook_without_url, negative_cooldown] {
        let app = common::build_test_app(pool.clone());
        let response = post_json_auth(app, "/api/v1/thresholds", &admin, body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_keeps_last_triggered_at(pool: PgPool) {
    let server = common::create_server(&pool, "db-01").await;
    let threshold =
        common::create_threshold(&pool, &common::cpu_definition(Some(server.id), ">", 90.0)).await;
    sqlx::query("UPDATE alert_thresholds SET last_triggered_at = NOW() WHERE id = $1")
        .bind(threshold.id)
        .execute(&pool)
        .await
        .unwrap();

    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(
        app,
        &format!("/api/v1/thresholds/{}", threshold.id),
        &token(1, "admin"),
        definition(Some(server.id)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["metric_type"], "disk");
    assert!(json["data"]["last_triggered_at"].is_string());

    let app = common::build_test_app(pool);
    let response = put_json_auth(
        app,
        "/api/v1/thresholds/999999",
        &token(1, "admin"),
        definition(None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_is_soft(pool: PgPool) {
    let threshold = common::create_threshold(&pool, &common::cpu_definition(None, ">", 90.0)).await;
    let admin = token(1, "admin");

    let app = common::build_test_app(pool.clone());
    let response = delete_auth(app, &format!("/api/v1/thresholds/{}", threshold.id), &admin).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let app = common::build_test_app(pool.clone());
    let response = get_auth(app, &format!("/api/v1/thresholds/{}", threshold.id), &admin).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let app = common::build_test_app(pool.clone());
    let response = delete_auth(app, &format!("/api/v1/thresholds/{}", threshold.id), &admin).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let deleted_at: Option<chrono::DateTime<chrono::Utc>> =
        sqlx::query_scalar("SELECT deleted_at FROM alert_thresholds WHERE id = $1")
            .bind(threshold.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(deleted_at.is_some());
    assert!(ThresholdRepo::find_by_id(&pool, threshold.id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn applicable_thresholds_include_group_and_global(pool: PgPool) {
    let server = common::create_server(&pool, "web-01").await;
    let other = common::create_server(&pool, "web-02").await;
    let admin = token(1, "admin");

    let group = ServerGroupRepo::create(
        &pool,
        &CreateServerGroup {
            name: "frontend".to_string(),
            description: String::new(),
            parent_id: None,
        },
    )
    .await
    .unwrap();

    let app = common::build_test_app(pool.clone());
    let response = put_auth(
        app,
        &format!("/api/v1/groups/{}/servers/{}", group.id, server.id),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let own = common::create_threshold(&pool, &common::cpu_definition(Some(server.id), ">", 80.0)).await;
    let global = common::create_threshold(&pool, &common::cpu_definition(None, ">", 95.0)).await;
    let mut grouped = common::cpu_definition(None, ">", 85.0);
    grouped.group_id = Some(group.id);
    let grouped = common::create_threshold(&pool, &grouped).await;
    common::create_threshold(&pool, &common::cpu_definition(Some(other.id), ">", 70.0)).await;

    let app = common::build_test_app(pool);
    let response = get_auth(
        app,
        &format!("/api/v1/servers/{}/thresholds", server.id),
        &token(7, "viewer"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let ids: Vec<i64> = body_json(response).await["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![own.id, global.id, grouped.id]);
}
