pub mod excel;
pub mod template_service;
