// src/handlers/accounts.rs

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
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        modules::{AccountingModule, RequireModule},
        tenancy::TenantContext,
    },
    models::accounts::{Account, AccountNode, CreateAccountPayload, UpdateAccountPayload},
};

#[utoipa::path(
    post,
    path = "/api/accounts",
    tag = "Chart of Accounts",
    request_body = CreateAccountPayload,
    responses(
        (status = 201, description = "Conta criada", body = Account),
        (status = 400, description = "Conta-mãe inválida"),
        (status = 409, description = "Código de conta em uso")
    ),
    params(("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")),
    security(("api_jwt" = []))
)]
pub async fn create_account(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireModule<AccountingModule>,
    Json(payload): Json<CreateAccountPayload>,
) -> Result<impl IntoResponse, ApiError> {
    user.ensure_ledger_writer()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let account = app_state
        .account_service
        .create_account(tenant.0, user.0.id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(account)))
}

#[utoipa::path(
    get,
    path = "/api/accounts",
    tag = "Chart of Accounts",
    responses((status = 200, description = "Plano de contas (lista ordenada por código)", body = Vec<Account>)),
    params(("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")),
    security(("api_jwt" = []))
)]
pub async fn list_accounts(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireModule<AccountingModule>,
) -> Result<impl IntoResponse, ApiError> {
    let accounts = app_state
        .account_service
        .list_accounts(tenant.0, user.0.id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(accounts))
}

#[utoipa::path(
    get,
    path = "/api/accounts/tree",
    tag = "Chart of Accounts",
    responses((status = 200, description = "Plano de contas em árvore", body = Vec<AccountNode>)),
    params(("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")),
    security(("api_jwt" = []))
)]
pub async fn account_tree(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireModule<AccountingModule>,
) -> Result<impl IntoResponse, ApiError> {
    let tree = app_state
        .account_service
        .account_tree(tenant.0, user.0.id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(tree))
}

#[utoipa::path(
    get,
    path = "/api/accounts/{id}",
    tag = "Chart of Accounts",
    responses(
        (status = 200, description = "Conta", body = Account),
        (status = 404, description = "Conta não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da conta"),
        ("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_account(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireModule<AccountingModule>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let account = app_state
        .account_service
        .get_account(tenant.0, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(account))
}

#[utoipa::path(
    put,
    path = "/api/accounts/{id}",
    tag = "Chart of Accounts",
    request_body = UpdateAccountPayload,
    responses(
        (status = 200, description = "Conta atualizada", body = Account),
        (status = 400, description = "Ciclo na hierarquia ou conta-mãe inválida"),
        (status = 409, description = "Conta possui filhas ativas")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da conta"),
        ("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_account(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireModule<AccountingModule>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAccountPayload>,
) -> Result<impl IntoResponse, ApiError> {
    user.ensure_ledger_writer()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let account = app_state
        .account_service
        .update_account(tenant.0, user.0.id, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(account))
}

#[utoipa::path(
    delete,
    path = "/api/accounts/{id}",
    tag = "Chart of Accounts",
    responses(
        (status = 204, description = "Conta removida"),
        (status = 409, description = "Conta com filhas ou com partidas")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da conta"),
        ("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_account(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireModule<AccountingModule>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.ensure_ledger_writer()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .account_service
        .delete_account(tenant.0, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
