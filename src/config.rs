// src/config.rs

use crate::{
    common::i18n::I18nStore,
    db::{
        AccountRepository, FiscalYearRepository, JournalRepository, ModuleRepository, ReportRepository,
        TenantRepository, TokenRepository, UserRepository,
    },
    services::{
        account_service::AccountService, auth::AuthService, document_service::DocumentService,
        fiscal_service::FiscalYearService, journal_service::JournalService, module_service::ModuleService,
        report_service::ReportService, tenancy_service::TenantService,
    },
};
use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, str::FromStr, sync::Arc, time::Duration};

/// Configuração lida do ambiente (.env em desenvolvimento).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub access_token_ttl: chrono::Duration,
    pub refresh_token_ttl: chrono::Duration,
    pub password_reset_ttl: chrono::Duration,
    pub otp_ttl: chrono::Duration,
    pub otp_max_attempts: i32,
    pub trial_days: i64,
    pub credential_purge_interval: Duration,
    pub fonts_dir: String,
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{key} deve ser definida"))
}

fn optional<T: FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("valor inválido para {key} ({raw}): {e}")),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup()
    }

    fn from_lookup() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            bind_addr: optional("BIND_ADDR", "0.0.0.0:3000".to_string())?,
            db_max_connections: optional("DB_MAX_CONNECTIONS", 5)?,
            access_token_ttl: chrono::Duration::minutes(optional("ACCESS_TOKEN_TTL_MINUTES", 15)?),
            refresh_token_ttl: chrono::Duration::days(optional("REFRESH_TOKEN_TTL_DAYS", 30)?),
            password_reset_ttl: chrono::Duration::minutes(optional("PASSWORD_RESET_TTL_MINUTES", 60)?),
            otp_ttl: chrono::Duration::minutes(optional("OTP_TTL_MINUTES", 10)?),
            otp_max_attempts: optional("OTP_MAX_ATTEMPTS", 5)?,
            trial_days: optional("TRIAL_DAYS", 14)?,
            // `interval` não aceita período zero
            credential_purge_interval: Duration::from_secs(optional("CREDENTIAL_PURGE_INTERVAL_SECS", 3600u64)?.max(1)),
            fonts_dir: optional("FONTS_DIR", "./fonts".to_string())?,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<AppConfig>,
    pub i18n_store: Arc<I18nStore>,

    pub auth_service: AuthService,
    pub tenant_service: TenantService,
    pub module_service: ModuleService,
    pub fiscal_service: FiscalYearService,
    pub account_service: AccountService,
    pub journal_service: JournalService,
    pub report_service: ReportService,
    pub document_service: DocumentService,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::with_pool(db_pool, config))
    }

    // --- Monta o gráfico de dependências ---
    pub fn with_pool(db_pool: PgPool, config: AppConfig) -> Self {
        let config = Arc::new(config);

        let user_repo = UserRepository::new(db_pool.clone());
        let token_repo = TokenRepository::new(db_pool.clone());
        let tenant_repo = TenantRepository::new(db_pool.clone());
        let module_repo = ModuleRepository::new(db_pool.clone());
        let fiscal_repo = FiscalYearRepository::new();
        let account_repo = AccountRepository::new();
        let journal_repo = JournalRepository::new();
        let report_repo = ReportRepository::new();

        let auth_service = AuthService::new(user_repo.clone(), token_repo, config.clone(), db_pool.clone());
        let tenant_service = TenantService::new(
            tenant_repo,
            user_repo,
            module_repo.clone(),
            config.clone(),
            db_pool.clone(),
        );
        let module_service = ModuleService::new(module_repo, db_pool.clone());
        let fiscal_service = FiscalYearService::new(fiscal_repo.clone(), db_pool.clone());
        let account_service = AccountService::new(account_repo.clone(), db_pool.clone());
        let journal_service = JournalService::new(
            journal_repo.clone(),
            fiscal_repo.clone(),
            account_repo.clone(),
            tenant_service.clone(),
            db_pool.clone(),
        );
        let report_service = ReportService::new(report_repo, fiscal_repo, account_repo, db_pool.clone());
        let document_service =
            DocumentService::new(journal_service.clone(), tenant_service.clone(), config.fonts_dir.clone());

        Self {
            db_pool,
            config,
            i18n_store: Arc::new(I18nStore::default()),
            auth_service,
            tenant_service,
            module_service,
            fiscal_service,
            account_service,
            journal_service,
            report_service,
            document_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_values_fall_back_to_default() {
        let value: u32 = optional("ACCOUNTING_TEST_SURELY_UNSET_VAR", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn required_reports_the_missing_key() {
        let err = required("ACCOUNTING_TEST_SURELY_UNSET_VAR").unwrap_err();
        assert!(err.to_string().contains("ACCOUNTING_TEST_SURELY_UNSET_VAR"));
    }
}
