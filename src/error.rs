use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Template '{0}' not found")]
    TemplateNotFound(String),
    #[error("Cannot open template '{name}': {reason}")]
    TemplateUnreadable { name: String, reason: String },
    #[error("{0}")]
    ReportFailed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rust_xlsxwriter::XlsxError> for AppError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        AppError::Spreadsheet(err.to_string())
    }
}

impl From<calamine::Error> for AppError {
    fn from(err: calamine::Error) -> Self {
        AppError::Spreadsheet(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidInput(_)
            | AppError::TemplateUnreadable { .. }
            | AppError::ReportFailed(_) => StatusCode::BAD_REQUEST,
            AppError::TemplateNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Io(_) | AppError::Spreadsheet(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let code = if status.is_server_error() {
            "INTERNAL_ERROR".to_string()
        } else {
            format!("HTTP_{}", status.as_u16())
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "code": code,
                "message": self.to_string(),
                "details": null,
            },
            "timestamp": Utc::now(),
        }));

        (status, body).into_response()
    }
}
