use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::{models::TemplateListResponse, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/templates", get(list_templates))
}

/// Scans the templates directory and returns every readable template with
/// its inferred columns and sample data.
async fn list_templates(State(state): State<Arc<AppState>>) -> Json<TemplateListResponse> {
    tracing::info!("Templates listing requested");

    let response = state.templates.list_templates();
    if !response.success {
        tracing::warn!("Template listing failed: {}", response.message);
    }

    Json(response)
}
