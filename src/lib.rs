use std::sync::Arc;

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;

use services::excel::ExcelService;
use services::template_service::TemplateService;

// Application state, built once at startup and injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub templates: Arc<TemplateService>,
    pub excel: ExcelService,
}

impl AppState {
    pub fn new(config: config::Config) -> Self {
        let templates = Arc::new(TemplateService::new(&config));
        let excel = ExcelService::new(templates.clone());

        Self {
            config,
            templates,
            excel,
        }
    }
}
