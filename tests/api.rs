use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use report_services::{config::Config, routes, AppState};

fn write_template(path: &Path, columns: &[&str]) {
    use rust_xlsxwriter::{Table, TableColumn, Workbook};

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    let table_columns: Vec<TableColumn> = columns
        .iter()
        .map(|name| TableColumn::new().set_header(*name))
        .collect();
    worksheet
        .add_table(
            0,
            0,
            2,
            (columns.len() - 1) as u16,
            &Table::new().set_columns(&table_columns),
        )
        .unwrap();

    workbook.save(path).unwrap();
}

fn test_app(dir: &TempDir) -> Router {
    write_template(
        &dir.path().join("Template-1.xlsx"),
        &["Rule ID", "Cost Center Group", "Pool Amount"],
    );
    write_template(&dir.path().join("inventory.xlsx"), &["Item", "Count"]);

    let config = Config {
        app_name: "Excel Report API".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        debug: true,
        templates_dir: dir.path().to_path_buf(),
        cors_origins: Vec::new(),
    };

    routes::app(Arc::new(AppState::new(config)))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_check_reports_healthy() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let response = app
        .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["status"], json!("healthy"));
}

#[tokio::test]
async fn listing_returns_discovered_templates() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let response = app
        .oneshot(Request::get("/api/templates").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));

    let templates = body["data"]["templates"].as_array().unwrap();
    assert_eq!(templates.len(), 2);

    let template_1 = templates
        .iter()
        .find(|t| t["filename"] == json!("Template-1.xlsx"))
        .expect("Template-1.xlsx missing from listing");
    assert_eq!(template_1["name"], json!("Template 1"));
    assert_eq!(
        template_1["columns"],
        json!(["Rule ID", "Cost Center Group", "Pool Amount"])
    );
    assert_eq!(template_1["sample_data"]["Rule ID"], json!("RULE001"));
}

#[tokio::test]
async fn template_1_endpoint_streams_a_download() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/reports/1",
            json!({"rows": [
                {"Rule ID": "R1", "Pool Amount": 100.0},
                {"Rule ID": "R2", "Pool Amount": 50.0},
            ]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("template_1_report_"));

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    // xlsx files are zip archives
    assert_eq!(&bytes[..2], b"PK");
}

#[tokio::test]
async fn generic_report_normalizes_the_template_name() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    // extension omitted on purpose
    let response = app
        .oneshot(json_request(
            "POST",
            "/api/reports",
            json!({
                "template_name": "inventory",
                "data": {"rows": [{"Item": "bolt", "Count": 3}]},
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("generic_report_"));
}

#[tokio::test]
async fn unknown_template_is_a_client_error() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/reports",
            json!({
                "template_name": "missing",
                "data": {"rows": [{"A": 1}]},
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("not found"));
}

#[tokio::test]
async fn unsafe_template_names_are_rejected() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/reports",
            json!({
                "template_name": "bad/name.xlsx",
                "data": {"rows": [{"A": 1}]},
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_payload_is_rejected() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let response = app
        .oneshot(json_request("POST", "/api/reports/1", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], json!("HTTP_400"));
}

#[tokio::test]
async fn database_pattern_endpoint_downloads_sample_report() {
    let dir = TempDir::new().unwrap();
    let app = test_app(&dir);

    let response = app
        .oneshot(Request::get("/api/reports/1b").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("template_1_db_report_"));
}
