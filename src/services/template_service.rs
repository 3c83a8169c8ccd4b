use std::fs;
use std::path::{Path, PathBuf};

use calamine::{open_workbook, open_workbook_auto, Data, Range, Reader, Xlsx};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::config::Config;
use crate::error::AppError;
use crate::models::{TemplateInfo, TemplateListResponse};

const TEMPLATE_EXTENSIONS: &[&str] = &["xlsx", "xls"];

/// Hard cap on the header-row fallback scan.
const HEADER_SCAN_LIMIT: u32 = 20;

#[derive(Debug, Clone, Copy)]
enum SampleValue {
    Text(&'static str),
    Number(f64),
}

impl SampleValue {
    fn to_json(self) -> Value {
        match self {
            SampleValue::Text(s) => Value::from(s),
            SampleValue::Number(n) => Value::from(n),
        }
    }
}

/// Ordered sample-value rules, first match wins. Order matters: "cost center"
/// must hit the group rule before the amount rule sees "cost".
const SAMPLE_RULES: &[(&[&str], SampleValue)] = &[
    (&["id"], SampleValue::Text("RULE001")),
    (
        &["group", "center", "category", "type"],
        SampleValue::Text("Sample Group"),
    ),
    (
        &["amount", "rate", "cost", "price", "total"],
        SampleValue::Number(1000.50),
    ),
    (&["diff", "variance", "delta"], SampleValue::Number(0.0)),
];

/// Synthesizes a representative value for a column, by name.
pub fn sample_value(column_name: &str) -> Value {
    let lower = column_name.to_lowercase();

    SAMPLE_RULES
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|keyword| lower.contains(keyword)))
        .map(|(_, value)| value.to_json())
        .unwrap_or_else(|| Value::from("Sample Value"))
}

/// Discovers template files and extracts their column structure.
pub struct TemplateService {
    templates_dir: PathBuf,
}

impl TemplateService {
    pub fn new(config: &Config) -> Self {
        let templates_dir = config.templates_dir.clone();

        if let Err(e) = fs::create_dir_all(&templates_dir) {
            tracing::warn!(
                "Could not create templates directory {}: {}",
                templates_dir.display(),
                e
            );
        }
        tracing::info!(
            "Template service initialized with directory: {}",
            templates_dir.display()
        );

        Self { templates_dir }
    }

    /// Lists every readable template in the directory. A bad file is logged
    /// and skipped; an unreadable directory yields a failure response with an
    /// empty list.
    pub fn list_templates(&self) -> TemplateListResponse {
        let entries = match fs::read_dir(&self.templates_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("Error listing templates: {}", e);
                return TemplateListResponse::failed(format!("Error listing templates: {}", e));
            }
        };

        let mut templates = Vec::new();
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    tracing::warn!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };

            if !is_template_file(&path) {
                continue;
            }

            match self.template_info(&path) {
                Ok(info) => templates.push(info),
                Err(e) => {
                    tracing::warn!("Could not process template {}: {}", path.display(), e);
                }
            }
        }

        tracing::info!("Found {} valid templates", templates.len());
        TemplateListResponse::found(templates)
    }

    fn template_info(&self, path: &Path) -> Result<TemplateInfo, AppError> {
        let metadata = fs::metadata(path)?;
        let last_modified: DateTime<Utc> = metadata.modified()?.into();

        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| AppError::Internal("template filename is not valid UTF-8".to_string()))?
            .to_string();
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&filename);

        let structure = analyze_structure(path)?;

        Ok(TemplateInfo {
            name: display_name(stem),
            filename,
            size: metadata.len(),
            last_modified,
            description: format!("Excel template with {} table(s)", structure.tables),
            columns: structure.columns,
            sample_data: structure.sample_data,
        })
    }

    /// Resolves a template filename to its path, if it exists with a
    /// recognized extension.
    pub fn template_path(&self, filename: &str) -> Option<PathBuf> {
        let path = self.templates_dir.join(filename);
        if path.exists() && is_template_file(&path) {
            Some(path)
        } else {
            None
        }
    }

    /// Checks that a template exists and opens cleanly.
    pub fn validate_template(&self, filename: &str) -> Result<PathBuf, AppError> {
        let path = self
            .template_path(filename)
            .ok_or_else(|| AppError::TemplateNotFound(filename.to_string()))?;

        open_workbook_auto(&path).map_err(|e| AppError::TemplateUnreadable {
            name: filename.to_string(),
            reason: e.to_string(),
        })?;

        Ok(path)
    }

    /// Re-resolves the descriptor for a single template from a fresh scan.
    pub fn find_template(&self, filename: &str) -> Option<TemplateInfo> {
        self.list_templates()
            .data
            .templates
            .into_iter()
            .find(|template| template.filename == filename)
    }
}

fn is_template_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                TEMPLATE_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
            .unwrap_or(false)
}

/// Display name derived from a file stem: separators become spaces, words are
/// title-cased.
fn display_name(stem: &str) -> String {
    stem.replace(['_', '-'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

struct TemplateStructure {
    tables: usize,
    columns: Vec<String>,
    sample_data: Map<String, Value>,
}

impl TemplateStructure {
    fn from_columns(tables: usize, columns: Vec<String>) -> Self {
        let mut sample_data = Map::new();
        for column in &columns {
            sample_data.insert(column.clone(), sample_value(column));
        }

        Self {
            tables,
            columns,
            sample_data,
        }
    }
}

/// Infers the column layout of a template: the first embedded table wins;
/// without one, the first worksheet's header row is scanned instead.
fn analyze_structure(path: &Path) -> Result<TemplateStructure, AppError> {
    // Embedded tables only exist in the xlsx format. Legacy .xls files go
    // straight to the header-row scan.
    if has_extension(path, "xlsx") {
        let mut workbook: Xlsx<_> =
            open_workbook(path).map_err(|e: calamine::XlsxError| AppError::Spreadsheet(e.to_string()))?;
        workbook
            .load_tables()
            .map_err(|e| AppError::Spreadsheet(e.to_string()))?;

        let table_names: Vec<String> = workbook
            .table_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        if let Some(first) = table_names.first() {
            let table = workbook
                .table_by_name(first)
                .map_err(|e| AppError::Spreadsheet(e.to_string()))?;
            let columns = columns_from_table_headers(table.columns());
            tracing::info!("Found table '{}' with columns: {:?}", first, columns);

            return Ok(TemplateStructure::from_columns(table_names.len(), columns));
        }

        let range = first_sheet_range(&mut workbook)?;
        let columns = columns_from_header_row(&range);
        tracing::info!("Found header row with columns: {:?}", columns);

        Ok(TemplateStructure::from_columns(0, columns))
    } else {
        let mut workbook = open_workbook_auto(path)?;
        let range = first_sheet_range(&mut workbook)?;
        let columns = columns_from_header_row(&range);
        tracing::info!("Found header row with columns: {:?}", columns);

        Ok(TemplateStructure::from_columns(0, columns))
    }
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(wanted))
        .unwrap_or(false)
}

fn first_sheet_range<R: Reader<RS>, RS: std::io::Read + std::io::Seek>(
    workbook: &mut R,
) -> Result<Range<Data>, AppError>
where
    R::Error: std::fmt::Display,
{
    workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::Spreadsheet("workbook has no worksheets".to_string()))?
        .map_err(|e| AppError::Spreadsheet(e.to_string()))
}

/// Table path: the full width of the table is scanned; empty header cells are
/// skipped but do not terminate the scan.
fn columns_from_table_headers(headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .map(|header| header.trim())
        .filter(|header| !header.is_empty())
        .map(str::to_string)
        .collect()
}

/// Fallback path: row 1 is scanned left to right up to the cap, and the first
/// empty cell terminates the scan. This deliberately differs from the table
/// path above.
fn columns_from_header_row(range: &Range<Data>) -> Vec<String> {
    let mut columns = Vec::new();

    for col in 0..HEADER_SCAN_LIMIT {
        let name = match range.get_value((0, col)) {
            Some(Data::Empty) | None => break,
            Some(cell) => cell.to_string().trim().to_string(),
        };
        if name.is_empty() {
            break;
        }
        columns.push(name);
    }

    columns
}
