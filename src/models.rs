use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppError;

pub const XLSX_EXTENSION: &str = ".xlsx";

const INVALID_FILENAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Metadata for one template file discovered in the templates directory.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateInfo {
    pub name: String,
    pub filename: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub description: String,
    pub columns: Vec<String>,
    pub sample_data: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct TemplateList {
    pub templates: Vec<TemplateInfo>,
}

#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub success: bool,
    pub data: TemplateList,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl TemplateListResponse {
    pub fn found(templates: Vec<TemplateInfo>) -> Self {
        let message = format!("Found {} templates", templates.len());
        Self {
            success: true,
            data: TemplateList { templates },
            message,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: TemplateList {
                templates: Vec::new(),
            },
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A report generation request: which template to use and the payload to
/// lay out. The payload is expected, by convention, to carry a `rows` key
/// holding an ordered sequence of row objects.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportRequest {
    pub template_name: String,
    pub data: Map<String, Value>,
}

impl ReportRequest {
    /// Normalizes the template name and checks the payload is non-empty.
    pub fn validate(mut self) -> Result<Self, AppError> {
        self.template_name = normalize_template_name(&self.template_name)?;

        if self.data.is_empty() {
            return Err(AppError::InvalidInput("Data cannot be empty".to_string()));
        }

        Ok(self)
    }

    /// The `rows` payload; entries that are not objects are dropped.
    pub fn rows(&self) -> Vec<Map<String, Value>> {
        self.data
            .get("rows")
            .and_then(Value::as_array)
            .map(|rows| rows.iter().filter_map(|row| row.as_object().cloned()).collect())
            .unwrap_or_default()
    }
}

/// Trims the name, forces the `.xlsx` suffix and rejects filesystem-unsafe
/// characters.
pub fn normalize_template_name(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(
            "Template name cannot be empty".to_string(),
        ));
    }

    let mut name = trimmed.to_string();
    if !name.ends_with(XLSX_EXTENSION) {
        name.push_str(XLSX_EXTENSION);
    }

    if name.chars().any(|c| INVALID_FILENAME_CHARS.contains(&c)) {
        return Err(AppError::InvalidInput(format!(
            "Template name contains invalid characters: {:?}",
            INVALID_FILENAME_CHARS
        )));
    }

    Ok(name)
}

/// Metadata returned alongside a generated report file.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub filename: String,
    pub size: usize,
    pub template_used: String,
    pub generated_at: DateTime<Utc>,
    pub rows_processed: usize,
}

/// Uniform result of a generation attempt. `file_data` is present if and
/// only if `success` is true.
#[derive(Debug)]
pub struct ReportOutcome {
    pub success: bool,
    pub meta: Option<ReportMeta>,
    pub message: String,
    pub file_data: Option<Vec<u8>>,
}

impl ReportOutcome {
    pub fn generated(meta: ReportMeta, message: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            success: true,
            meta: Some(meta),
            message: message.into(),
            file_data: Some(bytes),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            meta: None,
            message: message.into(),
            file_data: None,
        }
    }
}
