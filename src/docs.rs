// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::auth::request_password_reset,
        handlers::auth::confirm_password_reset,
        handlers::auth::request_otp,
        handlers::auth::verify_otp,

        // --- Users ---
        handlers::auth::get_me,

        // --- Tenancy ---
        handlers::tenancy::create_tenant,
        handlers::tenancy::get_current_tenant,
        handlers::tenancy::update_current_tenant,
        handlers::tenancy::list_tenant_users,
        handlers::tenancy::assign_user,
        handlers::tenancy::create_branch,
        handlers::tenancy::list_branches,
        handlers::tenancy::update_branch,
        handlers::tenancy::deactivate_branch,

        // --- Modules ---
        handlers::modules::list_system_modules,
        handlers::modules::upsert_system_module,
        handlers::modules::list_tenant_modules,
        handlers::modules::set_tenant_module,

        // --- Fiscal Years ---
        handlers::fiscal::create_fiscal_year,
        handlers::fiscal::list_fiscal_years,
        handlers::fiscal::find_fiscal_year_for_date,
        handlers::fiscal::get_fiscal_year,
        handlers::fiscal::update_fiscal_year,
        handlers::fiscal::lock_fiscal_year,
        handlers::fiscal::unlock_fiscal_year,

        // --- Chart of Accounts ---
        handlers::accounts::create_account,
        handlers::accounts::list_accounts,
        handlers::accounts::account_tree,
        handlers::accounts::get_account,
        handlers::accounts::update_account,
        handlers::accounts::delete_account,

        // --- Journal ---
        handlers::journal::create_entry,
        handlers::journal::list_entries,
        handlers::journal::get_entry,
        handlers::journal::update_entry,
        handlers::journal::delete_entry,
        handlers::journal::post_entry,
        handlers::journal::reverse_entry,
        handlers::journal::entry_voucher_pdf,

        // --- Reports ---
        handlers::reports::trial_balance,
        handlers::reports::account_ledger,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::UserRole,
            models::auth::OtpPurpose,
            models::auth::User,
            models::auth::RegisterUserPayload,
            models::auth::LoginUserPayload,
            models::auth::RefreshTokenPayload,
            models::auth::PasswordResetRequestPayload,
            models::auth::PasswordResetConfirmPayload,
            models::auth::OtpRequestPayload,
            models::auth::OtpVerifyPayload,
            models::auth::AuthResponse,
            models::auth::OtpVerifyResponse,

            // --- Tenancy ---
            models::tenancy::TenantPlan,
            models::tenancy::Tenant,
            models::tenancy::Branch,
            models::tenancy::CreateTenantPayload,
            models::tenancy::UpdateTenantPayload,
            models::tenancy::CreateBranchPayload,
            models::tenancy::UpdateBranchPayload,
            models::tenancy::AssignUserPayload,

            // --- Modules ---
            models::modules::SystemModuleConfig,
            models::modules::ModulePermission,
            models::modules::TenantModuleResponse,
            models::modules::UpsertSystemModulePayload,
            models::modules::SetTenantModulePayload,

            // --- Fiscal Years ---
            models::fiscal::FiscalYear,
            models::fiscal::CreateFiscalYearPayload,
            models::fiscal::UpdateFiscalYearPayload,

            // --- Chart of Accounts ---
            models::accounts::AccountType,
            models::accounts::Account,
            models::accounts::AccountNode,
            models::accounts::CreateAccountPayload,
            models::accounts::UpdateAccountPayload,

            // --- Journal ---
            models::journal::JournalEntry,
            models::journal::JournalEntryLine,
            models::journal::JournalEntryDetail,
            models::journal::JournalLineInput,
            models::journal::CreateJournalEntryPayload,
            models::journal::UpdateJournalEntryPayload,
            models::journal::ReverseJournalEntryPayload,

            // --- Reports ---
            models::reports::AccountTotals,
            models::reports::TrialBalanceRow,
            models::reports::TrialBalance,
            models::reports::LedgerLine,
            models::reports::AccountLedger,
        )
    ),
    tags(
        (name = "Auth", description = "Autenticação, tokens e OTP"),
        (name = "Users", description = "Dados do Usuário"),
        (name = "Tenancy", description = "Gestão do Tenant e seus usuários"),
        (name = "Branches", description = "Filiais do Tenant"),
        (name = "Modules", description = "Módulos do sistema e do tenant"),
        (name = "Fiscal Years", description = "Exercícios fiscais e bloqueio de período"),
        (name = "Chart of Accounts", description = "Plano de contas"),
        (name = "Journal", description = "Lançamentos contábeis em partidas dobradas"),
        (name = "Reports", description = "Balancete e razão")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_ledger_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/journal-entries/{id}/post"));
        assert!(doc.paths.paths.contains_key("/api/reports/trial-balance/{fiscal_year_id}"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
    }
}
