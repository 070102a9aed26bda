pub mod account_service;
pub mod auth;
pub mod document_service;
pub mod fiscal_service;
pub mod journal_service;
pub mod module_service;
pub mod report_service;
pub mod tenancy_service;
