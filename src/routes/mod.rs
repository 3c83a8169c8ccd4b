use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderValue, Method},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{config::Config, AppState};

pub mod reports;
pub mod templates;

pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health_check))
        .merge(templates::routes())
        .merge(reports::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}

async fn root(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "message": format!("Welcome to {}", state.config.app_name),
            "version": env!("CARGO_PKG_VERSION"),
            "health": "/api/health",
        },
        "message": "API root endpoint",
        "timestamp": Utc::now(),
    }))
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "status": "healthy",
            "app_name": state.config.app_name,
            "version": env!("CARGO_PKG_VERSION"),
            "debug": state.config.debug,
            "timestamp": Utc::now(),
        },
        "message": "API is running successfully",
        "timestamp": Utc::now(),
    }))
}
