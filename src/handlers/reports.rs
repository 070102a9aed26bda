// src/handlers/reports.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        modules::{ReportsModule, RequireModule},
        tenancy::TenantContext,
    },
    models::reports::{AccountLedger, LedgerQuery, TrialBalance},
};

#[utoipa::path(
    get,
    path = "/api/reports/trial-balance/{fiscal_year_id}",
    tag = "Reports",
    responses(
        (status = 200, description = "Balancete do exercício (só lançamentos efetivados)", body = TrialBalance),
        (status = 404, description = "Exercício não encontrado")
    ),
    params(
        ("fiscal_year_id" = Uuid, Path, description = "ID do exercício"),
        ("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")
    ),
    security(("api_jwt" = []))
)]
pub async fn trial_balance(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireModule<ReportsModule>,
    Path(fiscal_year_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let report = app_state
        .report_service
        .trial_balance(tenant.0, user.0.id, fiscal_year_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/api/reports/ledger/{account_id}",
    tag = "Reports",
    responses(
        (status = 200, description = "Razão da conta com saldo acumulado", body = AccountLedger),
        (status = 404, description = "Conta ou exercício não encontrado")
    ),
    params(
        ("account_id" = Uuid, Path, description = "ID da conta"),
        LedgerQuery,
        ("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")
    ),
    security(("api_jwt" = []))
)]
pub async fn account_ledger(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireModule<ReportsModule>,
    Path(account_id): Path<Uuid>,
    Query(query): Query<LedgerQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let ledger = app_state
        .report_service
        .account_ledger(tenant.0, user.0.id, account_id, query.fiscal_year_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(ledger))
}
