// src/middleware/modules.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{i18n::Locale, tenancy::TenantContext},
};

/// 1. O Trait que identifica um módulo pelo `module_key`
pub trait ModuleDef: Send + Sync + 'static {
    fn key() -> &'static str;
}

/// 2. O Extractor (Guardião): só deixa passar se o módulo estiver efetivo
/// para o tenant do contexto.
pub struct RequireModule<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireModule<T>
where
    T: ModuleDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_headers(&parts.headers);
        let reject = |e: AppError| e.to_api_error(&locale, &app_state.i18n_store);

        let tenant = parts
            .extensions
            .get::<TenantContext>()
            .copied()
            .ok_or(AppError::TenantContextMissing)
            .map_err(reject)?;

        let module_key = T::key();
        let enabled = app_state
            .module_service
            .is_module_effective(tenant.0, module_key)
            .await
            .map_err(reject)?;

        if !enabled {
            tracing::debug!(tenant_id = %tenant.0, module = module_key, "Módulo desligado para o tenant");
            return Err(reject(AppError::ModuleDisabled(module_key.to_string())));
        }

        Ok(RequireModule(PhantomData))
    }
}

// ---
// DEFINIÇÃO DOS MÓDULOS (TIPOS)
// ---

pub struct AccountingModule;
impl ModuleDef for AccountingModule {
    fn key() -> &'static str { "ACCOUNTING" }
}

pub struct JournalModule;
impl ModuleDef for JournalModule {
    fn key() -> &'static str { "JOURNAL" }
}

pub struct ReportsModule;
impl ModuleDef for ReportsModule {
    fn key() -> &'static str { "REPORTS" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_keys_match_seeded_rows() {
        assert_eq!(AccountingModule::key(), "ACCOUNTING");
        assert_eq!(JournalModule::key(), "JOURNAL");
        assert_eq!(ReportsModule::key(), "REPORTS");
    }
}
