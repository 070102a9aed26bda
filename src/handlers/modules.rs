// src/handlers/modules.rs

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::TenantContext},
    models::modules::{
        ModulePermission, SetTenantModulePayload, SystemModuleConfig, TenantModuleResponse, UpsertSystemModulePayload,
    },
};

// --- Catálogo global (SUPER_ADMIN) ---

#[utoipa::path(
    get,
    path = "/api/system/modules",
    tag = "Modules",
    responses(
        (status = 200, description = "Catálogo de módulos", body = Vec<SystemModuleConfig>),
        (status = 403, description = "Apenas SUPER_ADMIN")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_system_modules(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    user.ensure_super_admin()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let modules = app_state
        .module_service
        .list_system_modules()
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(modules))
}

#[utoipa::path(
    put,
    path = "/api/system/modules",
    tag = "Modules",
    request_body = UpsertSystemModulePayload,
    responses((status = 200, description = "Módulo criado ou atualizado", body = SystemModuleConfig)),
    security(("api_jwt" = []))
)]
pub async fn upsert_system_module(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<UpsertSystemModulePayload>,
) -> Result<impl IntoResponse, ApiError> {
    user.ensure_super_admin()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let module = app_state
        .module_service
        .upsert_system_module(&payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(module))
}

// --- Módulos do tenant ---

#[utoipa::path(
    get,
    path = "/api/tenant/modules",
    tag = "Modules",
    responses((status = 200, description = "Estado efetivo dos módulos", body = Vec<TenantModuleResponse>)),
    params(("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")),
    security(("api_jwt" = []))
)]
pub async fn list_tenant_modules(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let modules = app_state
        .module_service
        .list_tenant_modules(tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(modules))
}

#[utoipa::path(
    put,
    path = "/api/tenant/modules/{key}",
    tag = "Modules",
    request_body = SetTenantModulePayload,
    responses(
        (status = 200, description = "Módulo alterado", body = ModulePermission),
        (status = 400, description = "Módulo core não pode ser desligado"),
        (status = 404, description = "Módulo desconhecido")
    ),
    params(
        ("key" = String, Path, description = "Chave do módulo", example = "REPORTS"),
        ("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_tenant_module(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(module_key): Path<String>,
    Json(payload): Json<SetTenantModulePayload>,
) -> Result<impl IntoResponse, ApiError> {
    user.ensure_tenant_admin()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let permission = app_state
        .module_service
        .set_tenant_module(tenant.0, &module_key.to_uppercase(), payload.is_enabled)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(permission))
}
