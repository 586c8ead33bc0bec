//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use datasight_core::config::{ClientConfig, StorageConfig};
use datasight_core::test_utils::MockCompletionServer;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

const CITY_SALES: &str = "city,sales\nParis,10\nLyon,5\nNice,7\n";

fn test_config(dir: &TempDir, base_url: &str, api_key: Option<&str>) -> AppConfig {
    AppConfig {
        ai: ClientConfig {
            base_url: base_url.to_string(),
            api_key: api_key.map(str::to_string),
            max_retries: 0,
            ..Default::default()
        },
        storage: StorageConfig::new(dir.path().join("data"), dir.path().join("outputs")),
    }
}

fn setup_test_app() -> (TempDir, Router) {
    let dir = TempDir::new().unwrap();
    // Nothing listens on port 1
    let config = test_config(&dir, "http://127.0.0.1:1", None);
    (dir, create_router(config))
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn upload(app: &Router, csv: &str) -> String {
    let response = app
        .clone()
        .oneshot(post_json("/api/datasets", serde_json::json!({ "data": csv })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    json["file_id"].as_str().unwrap().to_string()
}

// ========== Health ==========

#[tokio::test]
async fn test_health() {
    let (_dir, app) = setup_test_app();

    let response = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "datasight");
}

// ========== Dataset API Tests ==========

#[tokio::test]
async fn test_upload_and_summary() {
    let (_dir, app) = setup_test_app();
    let file_id = upload(&app, CITY_SALES).await;

    let response = app
        .oneshot(get(&format!("/api/datasets/{}/summary", file_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["row_count"], 3);
    assert_eq!(json["columns"][1]["dtype"], "int64");
    assert_eq!(json["numeric_stats"]["sales"]["max"], 10.0);
}

#[tokio::test]
async fn test_summary_with_semicolon_delimiter() {
    let (_dir, app) = setup_test_app();
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/datasets",
            serde_json::json!({ "data": "a;b\n1;2\n3;4\n", "delimiter": ";" }),
        ))
        .await
        .unwrap();
    let file_id = get_body_json(response).await["file_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .oneshot(get(&format!(
            "/api/datasets/{}/summary?delimiter=%3B",
            file_id
        )))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["columns"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_empty_upload_is_bad_request() {
    let (_dir, app) = setup_test_app();

    let response = app
        .oneshot(post_json("/api/datasets", serde_json::json!({ "data": "" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = get_body_json(response).await;
    assert_eq!(json["kind"], "invalid_input");
}

#[tokio::test]
async fn test_invalid_excel_is_bad_request() {
    let (_dir, app) = setup_test_app();

    let response = app
        .oneshot(post_json(
            "/api/datasets/excel",
            serde_json::json!({ "data_base64": "not base64!" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_dataset_is_not_found() {
    let (_dir, app) = setup_test_app();

    let response = app
        .oneshot(get("/api/datasets/0123abcd/summary"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = get_body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("file_id=0123abcd"));
}

// ========== Chart API Tests ==========

#[tokio::test]
async fn test_create_bar_chart() {
    let (dir, app) = setup_test_app();
    let file_id = upload(&app, CITY_SALES).await;

    let response = app
        .oneshot(post_json(
            &format!("/api/datasets/{}/charts", file_id),
            serde_json::json!({ "viz": { "kind": "barchart", "x": "city", "y": "sales" } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["kind"], "barchart");
    assert_eq!(json["categories"], 3);
    let path = std::path::PathBuf::from(json["chart_path"].as_str().unwrap());
    assert!(path.starts_with(dir.path().join("outputs")));
    assert!(path.exists());
}

#[tokio::test]
async fn test_chart_with_unknown_column_is_bad_request() {
    let (_dir, app) = setup_test_app();
    let file_id = upload(&app, CITY_SALES).await;

    let response = app
        .oneshot(post_json(
            &format!("/api/datasets/{}/charts", file_id),
            serde_json::json!({ "viz": { "kind": "bar", "x": "region", "y": "sales" } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = get_body_json(response).await;
    assert_eq!(json["kind"], "render_error");
}

// ========== Insight and Report API Tests ==========

#[tokio::test]
async fn test_insight_falls_back_without_endpoint() {
    let (_dir, app) = setup_test_app();
    let file_id = upload(&app, CITY_SALES).await;

    let response = app
        .oneshot(post_json(
            &format!("/api/datasets/{}/insights", file_id),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["provider"], "fallback");
    assert_eq!(json["used_fallback"], true);
    assert!(!json["insights"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_insight_from_remote_endpoint() {
    let server = MockCompletionServer::ok("Paris leads sales.").await;
    let dir = TempDir::new().unwrap();
    let app = create_router(test_config(&dir, &server.url(), Some("sk-test")));
    let file_id = upload(&app, CITY_SALES).await;

    let response = app
        .oneshot(post_json(
            &format!("/api/datasets/{}/insights", file_id),
            serde_json::json!({ "viz": { "kind": "bar", "x": "city", "y": "sales" } }),
        ))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["provider"], "remote");
    assert_eq!(json["insights"], "Paris leads sales.");
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn test_report_end_to_end() {
    let (_dir, app) = setup_test_app();
    let file_id = upload(&app, CITY_SALES).await;

    let response = app
        .oneshot(post_json(
            &format!("/api/datasets/{}/report", file_id),
            serde_json::json!({
                "analysis": "summary",
                "viz": { "kind": "barchart", "x": "city", "y": "sales", "agg": "sum" },
                "ai": true,
                "export_html": true
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["analysis"]["row_count"], 3);
    assert_eq!(json["viz"]["status"], "ok");
    assert_eq!(json["ai_insights"]["provider"], "fallback");
    assert!(json["report_path"].is_string());
}

#[tokio::test]
async fn test_report_for_unknown_dataset_is_error_artifact() {
    let (_dir, app) = setup_test_app();

    let response = app
        .oneshot(post_json(
            "/api/datasets/feedface/report",
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"]["kind"], "not_found");
    assert!(json["analysis"].is_null());
}

#[tokio::test]
async fn test_report_with_bad_ai_timeout_is_bad_request() {
    let (_dir, app) = setup_test_app();
    let file_id = upload(&app, CITY_SALES).await;

    let response = app
        .oneshot(post_json(
            &format!("/api/datasets/{}/report", file_id),
            serde_json::json!({ "ai": { "timeout_secs": -1 } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_path_traversal_rejected() {
    let (_dir, app) = setup_test_app();

    let response = app
        .oneshot(get("/api/datasets/..%2F..%2Fetc/summary"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
