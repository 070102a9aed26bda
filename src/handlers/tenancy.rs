// src/handlers/tenancy.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::TenantContext},
    models::{
        auth::User,
        tenancy::{
            AssignUserPayload, Branch, CreateBranchPayload, CreateTenantPayload, Tenant, UpdateBranchPayload,
            UpdateTenantPayload,
        },
    },
};

// Cria o tenant; quem cria vira administrador dele
#[utoipa::path(
    post,
    path = "/api/tenants",
    tag = "Tenancy",
    request_body = CreateTenantPayload,
    responses(
        (status = 201, description = "Tenant criado com a filial MAIN", body = Tenant),
        (status = 409, description = "Slug em uso ou usuário já vinculado a um tenant")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_tenant(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<CreateTenantPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let tenant = app_state
        .tenant_service
        .create_tenant(&user.0, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(tenant)))
}

#[utoipa::path(
    get,
    path = "/api/tenant",
    tag = "Tenancy",
    responses((status = 200, description = "Tenant atual", body = Tenant)),
    params(("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")),
    security(("api_jwt" = []))
)]
pub async fn get_current_tenant(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let tenant = app_state
        .tenant_service
        .get_tenant(tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(tenant))
}

#[utoipa::path(
    put,
    path = "/api/tenant",
    tag = "Tenancy",
    request_body = UpdateTenantPayload,
    responses(
        (status = 200, description = "Tenant atualizado", body = Tenant),
        (status = 403, description = "Plano e status só podem ser alterados por SUPER_ADMIN")
    ),
    params(("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")),
    security(("api_jwt" = []))
)]
pub async fn update_current_tenant(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<UpdateTenantPayload>,
) -> Result<impl IntoResponse, ApiError> {
    user.ensure_tenant_admin()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let updated = app_state
        .tenant_service
        .update_tenant(&user.0, tenant.0, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(updated))
}

// --- Filiais ---

#[utoipa::path(
    post,
    path = "/api/tenant/branches",
    tag = "Branches",
    request_body = CreateBranchPayload,
    responses(
        (status = 201, description = "Filial criada", body = Branch),
        (status = 409, description = "Código de filial em uso")
    ),
    params(("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")),
    security(("api_jwt" = []))
)]
pub async fn create_branch(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CreateBranchPayload>,
) -> Result<impl IntoResponse, ApiError> {
    user.ensure_tenant_admin()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let branch = app_state
        .tenant_service
        .create_branch(tenant.0, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(branch)))
}

#[utoipa::path(
    get,
    path = "/api/tenant/branches",
    tag = "Branches",
    responses((status = 200, description = "Filiais do tenant", body = Vec<Branch>)),
    params(("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")),
    security(("api_jwt" = []))
)]
pub async fn list_branches(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let branches = app_state
        .tenant_service
        .list_branches(tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(branches))
}

#[utoipa::path(
    put,
    path = "/api/tenant/branches/{id}",
    tag = "Branches",
    request_body = UpdateBranchPayload,
    responses(
        (status = 200, description = "Filial atualizada", body = Branch),
        (status = 404, description = "Filial não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da filial"),
        ("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_branch(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(branch_id): Path<Uuid>,
    Json(payload): Json<UpdateBranchPayload>,
) -> Result<impl IntoResponse, ApiError> {
    user.ensure_tenant_admin()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let branch = app_state
        .tenant_service
        .update_branch(tenant.0, branch_id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(branch))
}

// Filial não é apagada, só desativada
#[utoipa::path(
    delete,
    path = "/api/tenant/branches/{id}",
    tag = "Branches",
    responses((status = 200, description = "Filial desativada", body = Branch)),
    params(
        ("id" = Uuid, Path, description = "ID da filial"),
        ("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")
    ),
    security(("api_jwt" = []))
)]
pub async fn deactivate_branch(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(branch_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.ensure_tenant_admin()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let branch = app_state
        .tenant_service
        .deactivate_branch(tenant.0, branch_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(branch))
}

// --- Usuários do tenant ---

#[utoipa::path(
    get,
    path = "/api/tenant/users",
    tag = "Tenancy",
    responses((status = 200, description = "Usuários do tenant", body = Vec<User>)),
    params(("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")),
    security(("api_jwt" = []))
)]
pub async fn list_tenant_users(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    user.ensure_tenant_admin()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let users = app_state
        .tenant_service
        .list_tenant_users(tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(users))
}

#[utoipa::path(
    post,
    path = "/api/tenant/users",
    tag = "Tenancy",
    request_body = AssignUserPayload,
    responses(
        (status = 200, description = "Usuário vinculado ao tenant", body = User),
        (status = 404, description = "Usuário não cadastrado"),
        (status = 409, description = "Usuário pertence a outro tenant")
    ),
    params(("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")),
    security(("api_jwt" = []))
)]
pub async fn assign_user(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<AssignUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    user.ensure_tenant_admin()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let assigned = app_state
        .tenant_service
        .assign_user(tenant.0, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(assigned))
}
