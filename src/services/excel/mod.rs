pub mod builder;

use std::sync::Arc;

use chrono::Utc;

use crate::error::AppError;
use crate::models::{ReportMeta, ReportOutcome, ReportRequest};
use crate::services::template_service::TemplateService;
use builder::{ReportBuilder, TotalsPolicy};

type Generator = fn(&ExcelService, &ReportRequest) -> Result<ReportOutcome, AppError>;

/// Static routing table: normalized template filename to generator. Templates
/// without an entry fall through to the generic generator.
const GENERATORS: &[(&str, Generator)] = &[("template-1.xlsx", ExcelService::template_1_report)];

/// Routes report requests to template-specific generators.
#[derive(Clone)]
pub struct ExcelService {
    templates: Arc<TemplateService>,
}

impl ExcelService {
    pub fn new(templates: Arc<TemplateService>) -> Self {
        tracing::info!("Excel service initialized");
        Self { templates }
    }

    /// Validates the template, dispatches to its generator and folds any
    /// generator error into a non-success outcome. Nothing propagates past
    /// this point.
    pub fn generate_report(&self, request: &ReportRequest) -> ReportOutcome {
        if let Err(e) = self.templates.validate_template(&request.template_name) {
            return ReportOutcome::failed(e.to_string());
        }

        let normalized = request.template_name.to_lowercase();
        let generator = GENERATORS
            .iter()
            .find(|(name, _)| *name == normalized)
            .map(|(_, generator)| *generator)
            .unwrap_or(Self::generic_report as Generator);

        match generator(self, request) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Error generating report: {}", e);
                ReportOutcome::failed(format!("Error generating report: {}", e))
            }
        }
    }

    /// Financial cost-center layout for Template-1.xlsx: header, data rows,
    /// calculated totals and full formatting. Zero rows is valid.
    fn template_1_report(&self, request: &ReportRequest) -> Result<ReportOutcome, AppError> {
        // Validation passed already, but the descriptor is re-resolved from a
        // fresh scan to get the authoritative column list.
        let Some(template) = self.templates.find_template(&request.template_name) else {
            return Ok(ReportOutcome::failed(format!(
                "Template {} not found",
                request.template_name
            )));
        };

        let rows = request.rows();
        let rows_processed = rows.len();

        let bytes = ReportBuilder::new("Financial Report")
            .columns(template.columns)
            .rows(rows)
            .totals(TotalsPolicy::Calculated)
            .full_formatting()
            .finish()?;

        Ok(report_outcome(
            "template_1_report",
            request,
            rows_processed,
            bytes,
            "Template-1 report generated successfully",
        ))
    }

    /// Fallback for templates with no registered generator: columns come from
    /// the first row's keys, only the header is styled and there is no totals
    /// row. Unlike Template-1, an empty row sequence is an error here.
    fn generic_report(&self, request: &ReportRequest) -> Result<ReportOutcome, AppError> {
        let rows = request.rows();
        if rows.is_empty() {
            return Ok(ReportOutcome::failed(
                "No data provided for report generation",
            ));
        }

        let columns: Vec<String> = rows[0].keys().cloned().collect();
        let rows_processed = rows.len();

        let bytes = ReportBuilder::new("Report")
            .columns(columns)
            .rows(rows)
            .finish()?;

        Ok(report_outcome(
            "generic_report",
            request,
            rows_processed,
            bytes,
            "Generic report generated successfully",
        ))
    }
}

fn report_outcome(
    prefix: &str,
    request: &ReportRequest,
    rows_processed: usize,
    bytes: Vec<u8>,
    message: &str,
) -> ReportOutcome {
    let generated_at = Utc::now();
    let filename = format!("{}_{}.xlsx", prefix, generated_at.format("%Y%m%d_%H%M%S"));

    tracing::info!(
        "Report generated: {} ({} bytes, {} rows)",
        filename,
        bytes.len(),
        rows_processed
    );

    ReportOutcome::generated(
        ReportMeta {
            filename,
            size: bytes.len(),
            template_used: request.template_name.clone(),
            generated_at,
            rows_processed,
        },
        message,
        bytes,
    )
}
