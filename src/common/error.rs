// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::common::ledger::LedgerError;
use crate::middleware::i18n::Locale;

// Nosso tipo de erro de domínio. Os handlers convertem para `ApiError`
// (já traduzido) com `to_api_error`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // --- Autenticação ---
    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    #[error("Usuário inativo")]
    UserInactive,

    #[error("Código OTP inválido")]
    InvalidOtp,

    #[error("Código OTP expirado")]
    OtpExpired,

    #[error("Tentativas de OTP esgotadas")]
    OtpAttemptsExceeded,

    #[error("Permissão insuficiente")]
    Forbidden,

    // --- Tenancy ---
    #[error("Contexto de tenant ausente")]
    TenantContextMissing,

    #[error("Acesso negado ao tenant")]
    TenantAccessDenied,

    #[error("Tenant inativo")]
    TenantInactive,

    #[error("Período de teste expirado")]
    TrialExpired,

    #[error("Slug de tenant já existe: {0}")]
    TenantSlugAlreadyExists(String),

    #[error("Usuário já pertence a outro tenant")]
    UserAlreadyInTenant,

    #[error("Filial não pertence ao tenant")]
    BranchNotInTenant,

    // --- Módulos ---
    #[error("Módulo desativado: {0}")]
    ModuleDisabled(String),

    #[error("Módulo desconhecido: {0}")]
    ModuleNotFound(String),

    #[error("Módulo core não pode ser desligado: {0}")]
    CoreModuleLocked(String),

    // --- Exercícios fiscais ---
    #[error("Intervalo de datas inválido")]
    InvalidDateRange,

    #[error("Exercício sobrepõe outro existente")]
    FiscalYearOverlap,

    #[error("Exercício fiscal travado")]
    FiscalYearLocked,

    #[error("Exercício possui lançamentos não efetivados")]
    FiscalYearHasDrafts,

    #[error("Novo intervalo exclui lançamentos existentes")]
    FiscalYearRangeExcludesEntries,

    #[error("Nenhum exercício contém a data {0}")]
    NoFiscalYearForDate(chrono::NaiveDate),

    #[error("Data fora do exercício fiscal")]
    DateOutsideFiscalYear,

    // --- Plano de contas ---
    #[error("Ciclo na hierarquia de contas")]
    AccountCycle,

    #[error("Conta pai de tipo diferente")]
    AccountTypeMismatch,

    #[error("Conta inativa")]
    AccountInactive,

    #[error("Conta sintética não aceita lançamentos")]
    AccountNotPostable,

    #[error("Conta possui subcontas")]
    AccountHasChildren,

    #[error("Conta possui lançamentos")]
    AccountInUse,

    // --- Lançamentos ---
    #[error("Regra de partidas dobradas violada: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Lançamento já efetivado")]
    EntryAlreadyPosted,

    #[error("Lançamento não efetivado")]
    EntryNotPosted,

    #[error("Lançamento já estornado")]
    EntryAlreadyReversed,

    // --- Genéricos ---
    #[error("Registro não encontrado: {0}")]
    NotFound(&'static str),

    #[error("Violação de unicidade: {0}")]
    UniqueConstraintViolation(String),

    #[error("Falha ao gerar documento: {0}")]
    DocumentGeneration(String),

    // Variante para erros de banco de dados (exemplo com sqlx)
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

/// O erro já traduzido, pronto para virar resposta HTTP.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self { status, error: error.into(), details: None }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

fn money(value: &Decimal) -> String {
    value.round_dp(2).to_string()
}

impl AppError {
    /// Status HTTP + chave de mensagem + parâmetros para interpolação.
    fn classify(&self) -> (StatusCode, &'static str, Vec<String>) {
        use AppError::*;
        match self {
            ValidationError(_) => (StatusCode::BAD_REQUEST, "validation_failed", vec![]),
            EmailAlreadyExists => (StatusCode::CONFLICT, "email_already_exists", vec![]),
            InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials", vec![]),
            InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", vec![]),
            UserNotFound => (StatusCode::NOT_FOUND, "user_not_found", vec![]),
            UserInactive => (StatusCode::UNAUTHORIZED, "user_inactive", vec![]),
            InvalidOtp => (StatusCode::BAD_REQUEST, "invalid_otp", vec![]),
            OtpExpired => (StatusCode::BAD_REQUEST, "otp_expired", vec![]),
            OtpAttemptsExceeded => (StatusCode::TOO_MANY_REQUESTS, "otp_attempts_exceeded", vec![]),
            Forbidden => (StatusCode::FORBIDDEN, "forbidden", vec![]),
            TenantContextMissing => (StatusCode::BAD_REQUEST, "tenant_context_missing", vec![]),
            TenantAccessDenied => (StatusCode::FORBIDDEN, "tenant_access_denied", vec![]),
            TenantInactive => (StatusCode::FORBIDDEN, "tenant_inactive", vec![]),
            TrialExpired => (StatusCode::PAYMENT_REQUIRED, "trial_expired", vec![]),
            TenantSlugAlreadyExists(slug) => (StatusCode::CONFLICT, "tenant_slug_exists", vec![slug.clone()]),
            UserAlreadyInTenant => (StatusCode::CONFLICT, "user_already_in_tenant", vec![]),
            BranchNotInTenant => (StatusCode::BAD_REQUEST, "branch_not_in_tenant", vec![]),
            ModuleDisabled(key) => (StatusCode::FORBIDDEN, "module_disabled", vec![key.clone()]),
            ModuleNotFound(key) => (StatusCode::NOT_FOUND, "module_not_found", vec![key.clone()]),
            CoreModuleLocked(key) => (StatusCode::BAD_REQUEST, "core_module_locked", vec![key.clone()]),
            InvalidDateRange => (StatusCode::BAD_REQUEST, "invalid_date_range", vec![]),
            FiscalYearOverlap => (StatusCode::CONFLICT, "fiscal_year_overlap", vec![]),
            FiscalYearLocked => (StatusCode::CONFLICT, "fiscal_year_locked", vec![]),
            FiscalYearHasDrafts => (StatusCode::CONFLICT, "fiscal_year_has_drafts", vec![]),
            FiscalYearRangeExcludesEntries => (StatusCode::CONFLICT, "fiscal_year_excludes_entries", vec![]),
            NoFiscalYearForDate(date) => (StatusCode::BAD_REQUEST, "no_fiscal_year_for_date", vec![date.to_string()]),
            DateOutsideFiscalYear => (StatusCode::BAD_REQUEST, "date_outside_fiscal_year", vec![]),
            AccountCycle => (StatusCode::BAD_REQUEST, "account_cycle", vec![]),
            AccountTypeMismatch => (StatusCode::BAD_REQUEST, "account_type_mismatch", vec![]),
            AccountInactive => (StatusCode::BAD_REQUEST, "account_inactive", vec![]),
            AccountNotPostable => (StatusCode::BAD_REQUEST, "account_not_postable", vec![]),
            AccountHasChildren => (StatusCode::CONFLICT, "account_has_children", vec![]),
            AccountInUse => (StatusCode::CONFLICT, "account_in_use", vec![]),
            Ledger(LedgerError::TooFewLines) => (StatusCode::UNPROCESSABLE_ENTITY, "journal_min_lines", vec![]),
            Ledger(LedgerError::InvalidLineAmounts { line }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "journal_invalid_line", vec![(line + 1).to_string()])
            }
            Ledger(LedgerError::ZeroTotal) => (StatusCode::UNPROCESSABLE_ENTITY, "journal_zero_total", vec![]),
            Ledger(LedgerError::Unbalanced { debit, credit }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "journal_unbalanced",
                vec![money(debit), money(credit)],
            ),
            EntryAlreadyPosted => (StatusCode::CONFLICT, "entry_already_posted", vec![]),
            EntryNotPosted => (StatusCode::CONFLICT, "entry_not_posted", vec![]),
            EntryAlreadyReversed => (StatusCode::CONFLICT, "entry_already_reversed", vec![]),
            NotFound(entity) => (StatusCode::NOT_FOUND, "not_found", vec![entity.to_string()]),
            UniqueConstraintViolation(what) => (StatusCode::CONFLICT, "unique_violation", vec![what.clone()]),
            DatabaseError(sqlx::Error::RowNotFound) => (StatusCode::NOT_FOUND, "not_found", vec!["record".into()]),
            DocumentGeneration(_) | DatabaseError(_) | InternalServerError(_) | BcryptError(_) | JwtError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", vec![])
            }
        }
    }

    /// Converte o erro de domínio em resposta traduzida para o idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        let (status, key, params) = self.classify();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Erro Interno do Servidor: {:?}", self);
        }

        let params: Vec<&str> = params.iter().map(String::as_str).collect();
        let message = store.translate(&locale.0, key, &params);

        let details = match self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<Value> = field_errors
                        .iter()
                        .map(|e| {
                            let msg_key = e.message.as_deref().unwrap_or(e.code.as_ref());
                            Value::String(store.translate(&locale.0, msg_key, &[]))
                        })
                        .collect();
                    details.insert(field.to_string(), Value::Array(messages));
                }
                Some(Value::Object(details))
            }
            _ => None,
        };

        ApiError { status, error: message, details }
    }
}

// Fallback para quando não temos o idioma do cliente à mão (ex.: extratores).
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), I18nStore::global()).into_response()
    }
}

/// Mapeia violação de unicidade pelo nome da constraint.
/// Retorna o erro original convertido quando não for o caso.
pub fn map_unique_violation(e: sqlx::Error, map: impl FnOnce(&str) -> Option<AppError>) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            return map(&constraint).unwrap_or(AppError::UniqueConstraintViolation(constraint));
        }
    }
    e.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 1, message = "required"))]
        name: String,
    }

    fn pt() -> Locale {
        Locale("pt".into())
    }

    #[test]
    fn maps_domain_errors_to_status_codes() {
        let store = I18nStore::default();
        assert_eq!(AppError::FiscalYearLocked.to_api_error(&pt(), &store).status, StatusCode::CONFLICT);
        assert_eq!(AppError::TrialExpired.to_api_error(&pt(), &store).status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(AppError::InvalidToken.to_api_error(&pt(), &store).status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::DatabaseError(sqlx::Error::RowNotFound).to_api_error(&pt(), &store).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::DatabaseError(sqlx::Error::PoolTimedOut).to_api_error(&pt(), &store).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unbalanced_message_carries_totals() {
        let store = I18nStore::default();
        let err = AppError::Ledger(LedgerError::Unbalanced {
            debit: Decimal::new(10000, 2),
            credit: Decimal::new(9050, 2),
        });
        let api = err.to_api_error(&Locale("en".into()), &store);
        assert_eq!(api.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(api.error.contains("100.00"), "{}", api.error);
        assert!(api.error.contains("90.50"), "{}", api.error);
    }

    #[test]
    fn validation_errors_list_fields() {
        let store = I18nStore::default();
        let errors = Probe { name: String::new() }.validate().unwrap_err();
        let api = AppError::ValidationError(errors).to_api_error(&pt(), &store);
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let details = api.details.expect("detalhes da validação");
        assert!(details.get("name").is_some());
    }
}
