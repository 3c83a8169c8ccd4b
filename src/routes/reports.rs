use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::{
    error::AppError,
    models::{ReportOutcome, ReportRequest},
    AppState,
};

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const TEMPLATE_1: &str = "Template-1.xlsx";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/reports", post(generate_report))
        .route("/api/reports/1", post(generate_template_1_report))
        .route("/api/reports/1b", get(generate_template_1_report_from_db))
}

/// Generic entry point: the body names the template and carries the payload.
#[axum::debug_handler]
async fn generate_report(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReportRequest>,
) -> Result<Response, AppError> {
    let request = request.validate()?;
    tracing::info!(
        "Report generation requested for template {}",
        request.template_name
    );

    let outcome = state.excel.generate_report(&request);
    download_response(outcome, None)
}

/// Template-1 shortcut: the body is the bare data payload (`{"rows": [...]}`).
async fn generate_template_1_report(
    State(state): State<Arc<AppState>>,
    Json(data): Json<Map<String, Value>>,
) -> Result<Response, AppError> {
    tracing::info!("Template-1 report generation requested");
    tracing::debug!(
        "Data rows: {}",
        data.get("rows").and_then(serde_json::Value::as_array).map_or(0, Vec::len)
    );

    let request = ReportRequest {
        template_name: TEMPLATE_1.to_string(),
        data,
    }
    .validate()?;

    let outcome = state.excel.generate_report(&request);
    download_response(outcome, None)
}

/// Fetch-then-generate shape of a production endpoint. The rows stand in for
/// a database query result.
async fn generate_template_1_report_from_db(
    State(state): State<Arc<AppState>>,
) -> Result<Response, AppError> {
    tracing::info!("Template-1 database report generation requested");

    let mut data = Map::new();
    data.insert("rows".to_string(), Value::Array(sample_template_1_rows()));

    let request = ReportRequest {
        template_name: TEMPLATE_1.to_string(),
        data,
    }
    .validate()?;

    let outcome = state.excel.generate_report(&request);
    let filename = format!(
        "template_1_db_report_{}.xlsx",
        Utc::now().format("%Y%m%d_%H%M%S")
    );
    download_response(outcome, Some(filename))
}

fn sample_template_1_rows() -> Vec<Value> {
    vec![
        json!({
            "Rule ID": "DB_RULE_001",
            "Cost Center Group": "Finance Department",
            "Pool Amount": 125000.00,
            "AB/CR Amount": 31250.00,
            "Base Amount": 112500.00,
            "Actual Rate": 0.28,
            "FP Rate": 0.25,
            "AB/CR Rate Diff": 0.03,
        }),
        json!({
            "Rule ID": "DB_RULE_002",
            "Cost Center Group": "Operations",
            "Pool Amount": 200000.00,
            "AB/CR Amount": 50000.00,
            "Base Amount": 180000.00,
            "Actual Rate": 0.32,
            "FP Rate": 0.30,
            "AB/CR Rate Diff": 0.02,
        }),
        json!({
            "Rule ID": "DB_RULE_003",
            "Cost Center Group": "Human Resources",
            "Pool Amount": 85000.00,
            "AB/CR Amount": 21250.00,
            "Base Amount": 76500.00,
            "Actual Rate": 0.26,
            "FP Rate": 0.24,
            "AB/CR Rate Diff": 0.02,
        }),
    ]
}

/// Turns a generation outcome into a file download, or the error envelope on
/// failure. `file_data` being absent on a success outcome is a bug upstream.
fn download_response(
    outcome: ReportOutcome,
    filename_override: Option<String>,
) -> Result<Response, AppError> {
    if !outcome.success {
        tracing::error!("Report generation failed: {}", outcome.message);
        return Err(AppError::ReportFailed(outcome.message));
    }

    let bytes = outcome.file_data.ok_or_else(|| {
        AppError::Internal(
            "Report generation completed but no file data available".to_string(),
        )
    })?;

    let filename = filename_override
        .or(outcome.meta.map(|meta| meta.filename))
        .unwrap_or_else(|| "report.xlsx".to_string());

    tracing::info!(
        "Report generated successfully: {} ({} bytes)",
        filename,
        bytes.len()
    );

    let headers = [
        (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
        (header::CONTENT_LENGTH, bytes.len().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", filename),
        ),
    ];

    Ok((headers, bytes).into_response())
}
