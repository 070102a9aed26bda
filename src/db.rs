pub mod user_repo;
pub use user_repo::UserRepository;
pub mod token_repo;
pub use token_repo::TokenRepository;
pub mod tenancy_repo;
pub use tenancy_repo::TenantRepository;
pub mod module_repo;
pub use module_repo::ModuleRepository;
pub mod fiscal_repo;
pub use fiscal_repo::FiscalYearRepository;
pub mod account_repo;
pub use account_repo::AccountRepository;
pub mod journal_repo;
pub use journal_repo::JournalRepository;
pub mod report_repo;
pub use report_repo::ReportRepository;
