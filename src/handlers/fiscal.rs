// src/handlers/fiscal.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        modules::{AccountingModule, RequireModule},
        tenancy::TenantContext,
    },
    models::fiscal::{CreateFiscalYearPayload, FiscalYear, FiscalYearDateQuery, UpdateFiscalYearPayload},
};

#[utoipa::path(
    post,
    path = "/api/fiscal-years",
    tag = "Fiscal Years",
    request_body = CreateFiscalYearPayload,
    responses(
        (status = 201, description = "Exercício criado", body = FiscalYear),
        (status = 400, description = "Período inválido"),
        (status = 409, description = "Sobreposição com outro exercício")
    ),
    params(("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")),
    security(("api_jwt" = []))
)]
pub async fn create_fiscal_year(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireModule<AccountingModule>,
    Json(payload): Json<CreateFiscalYearPayload>,
) -> Result<impl IntoResponse, ApiError> {
    user.ensure_ledger_writer()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let year = app_state
        .fiscal_service
        .create_fiscal_year(tenant.0, user.0.id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(year)))
}

#[utoipa::path(
    get,
    path = "/api/fiscal-years",
    tag = "Fiscal Years",
    responses((status = 200, description = "Exercícios do tenant", body = Vec<FiscalYear>)),
    params(("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")),
    security(("api_jwt" = []))
)]
pub async fn list_fiscal_years(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireModule<AccountingModule>,
) -> Result<impl IntoResponse, ApiError> {
    let years = app_state
        .fiscal_service
        .list_fiscal_years(tenant.0, user.0.id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(years))
}

#[utoipa::path(
    get,
    path = "/api/fiscal-years/by-date",
    tag = "Fiscal Years",
    responses(
        (status = 200, description = "Exercício que contém a data", body = FiscalYear),
        (status = 404, description = "Nenhum exercício cobre a data")
    ),
    params(
        FiscalYearDateQuery,
        ("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")
    ),
    security(("api_jwt" = []))
)]
pub async fn find_fiscal_year_for_date(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireModule<AccountingModule>,
    Query(query): Query<FiscalYearDateQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let year = app_state
        .fiscal_service
        .find_for_date(tenant.0, user.0.id, query.date)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(year))
}

#[utoipa::path(
    get,
    path = "/api/fiscal-years/{id}",
    tag = "Fiscal Years",
    responses(
        (status = 200, description = "Exercício", body = FiscalYear),
        (status = 404, description = "Exercício não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do exercício"),
        ("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_fiscal_year(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireModule<AccountingModule>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let year = app_state
        .fiscal_service
        .get_fiscal_year(tenant.0, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(year))
}

#[utoipa::path(
    put,
    path = "/api/fiscal-years/{id}",
    tag = "Fiscal Years",
    request_body = UpdateFiscalYearPayload,
    responses(
        (status = 200, description = "Exercício atualizado", body = FiscalYear),
        (status = 409, description = "Exercício bloqueado, sobreposto ou deixaria lançamentos de fora")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do exercício"),
        ("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_fiscal_year(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireModule<AccountingModule>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateFiscalYearPayload>,
) -> Result<impl IntoResponse, ApiError> {
    user.ensure_ledger_writer()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let year = app_state
        .fiscal_service
        .update_fiscal_year(tenant.0, user.0.id, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(year))
}

#[utoipa::path(
    post,
    path = "/api/fiscal-years/{id}/lock",
    tag = "Fiscal Years",
    responses(
        (status = 200, description = "Exercício bloqueado", body = FiscalYear),
        (status = 409, description = "Existem rascunhos no exercício")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do exercício"),
        ("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")
    ),
    security(("api_jwt" = []))
)]
pub async fn lock_fiscal_year(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireModule<AccountingModule>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.ensure_ledger_writer()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let year = app_state
        .fiscal_service
        .lock_fiscal_year(tenant.0, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(year))
}

// Desbloqueio só para administradores do tenant
#[utoipa::path(
    post,
    path = "/api/fiscal-years/{id}/unlock",
    tag = "Fiscal Years",
    responses(
        (status = 200, description = "Exercício desbloqueado", body = FiscalYear),
        (status = 403, description = "Apenas TENANT_ADMIN")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do exercício"),
        ("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")
    ),
    security(("api_jwt" = []))
)]
pub async fn unlock_fiscal_year(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireModule<AccountingModule>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.ensure_tenant_admin()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let year = app_state
        .fiscal_service
        .unlock_fiscal_year(tenant.0, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(year))
}
