// src/handlers/journal.rs

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
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
        modules::{JournalModule, RequireModule},
        tenancy::TenantContext,
    },
    models::journal::{
        CreateJournalEntryPayload, JournalEntry, JournalEntryDetail, JournalEntryFilter, ReverseJournalEntryPayload,
        UpdateJournalEntryPayload,
    },
};

#[utoipa::path(
    post,
    path = "/api/journal-entries",
    tag = "Journal",
    request_body = CreateJournalEntryPayload,
    responses(
        (status = 201, description = "Lançamento criado como rascunho", body = JournalEntryDetail),
        (status = 400, description = "Partidas inválidas ou data fora do exercício"),
        (status = 409, description = "Exercício bloqueado")
    ),
    params(("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")),
    security(("api_jwt" = []))
)]
pub async fn create_entry(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireModule<JournalModule>,
    Json(payload): Json<CreateJournalEntryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    user.ensure_ledger_writer()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let detail = app_state
        .journal_service
        .create_entry(tenant.0, user.0.id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(detail)))
}

#[utoipa::path(
    get,
    path = "/api/journal-entries",
    tag = "Journal",
    responses((status = 200, description = "Lançamentos (mais recentes primeiro)", body = Vec<JournalEntry>)),
    params(
        JournalEntryFilter,
        ("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_entries(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireModule<JournalModule>,
    Query(filter): Query<JournalEntryFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let entries = app_state
        .journal_service
        .list_entries(tenant.0, user.0.id, &filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(entries))
}

#[utoipa::path(
    get,
    path = "/api/journal-entries/{id}",
    tag = "Journal",
    responses(
        (status = 200, description = "Lançamento com partidas e totais", body = JournalEntryDetail),
        (status = 404, description = "Lançamento não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do lançamento"),
        ("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_entry(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireModule<JournalModule>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .journal_service
        .get_entry(tenant.0, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(detail))
}

#[utoipa::path(
    put,
    path = "/api/journal-entries/{id}",
    tag = "Journal",
    request_body = UpdateJournalEntryPayload,
    responses(
        (status = 200, description = "Rascunho atualizado", body = JournalEntryDetail),
        (status = 409, description = "Lançamento já efetivado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do lançamento"),
        ("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_entry(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireModule<JournalModule>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateJournalEntryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    user.ensure_ledger_writer()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let detail = app_state
        .journal_service
        .update_entry(tenant.0, user.0.id, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(detail))
}

#[utoipa::path(
    delete,
    path = "/api/journal-entries/{id}",
    tag = "Journal",
    responses(
        (status = 204, description = "Rascunho removido"),
        (status = 409, description = "Lançamento já efetivado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do lançamento"),
        ("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_entry(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireModule<JournalModule>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.ensure_ledger_writer()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .journal_service
        .delete_entry(tenant.0, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/journal-entries/{id}/post",
    tag = "Journal",
    responses(
        (status = 200, description = "Lançamento efetivado", body = JournalEntryDetail),
        (status = 400, description = "Partidas desbalanceadas ou conta inválida"),
        (status = 409, description = "Já efetivado ou exercício bloqueado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do lançamento"),
        ("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")
    ),
    security(("api_jwt" = []))
)]
pub async fn post_entry(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireModule<JournalModule>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    user.ensure_ledger_writer()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let detail = app_state
        .journal_service
        .post_entry(tenant.0, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(Json(detail))
}

// Corpo opcional: sem ele o estorno usa a data do original
#[utoipa::path(
    post,
    path = "/api/journal-entries/{id}/reverse",
    tag = "Journal",
    request_body(content = Option<ReverseJournalEntryPayload>, description = "Data do estorno (opcional)"),
    responses(
        (status = 201, description = "Estorno criado e efetivado", body = JournalEntryDetail),
        (status = 409, description = "Lançamento não efetivado ou já estornado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do lançamento original"),
        ("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")
    ),
    security(("api_jwt" = []))
)]
pub async fn reverse_entry(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireModule<JournalModule>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ReverseJournalEntryPayload>>,
) -> Result<impl IntoResponse, ApiError> {
    user.ensure_ledger_writer()
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let reversal = app_state
        .journal_service
        .reverse_entry(tenant.0, user.0.id, id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(reversal)))
}

#[utoipa::path(
    get,
    path = "/api/journal-entries/{id}/voucher",
    tag = "Journal",
    responses(
        (status = 200, description = "Comprovante em PDF", content_type = "application/pdf", body = Vec<u8>),
        (status = 404, description = "Lançamento não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do lançamento"),
        ("x-tenant-id" = Option<Uuid>, Header, description = "Obrigatório para SUPER_ADMIN")
    ),
    security(("api_jwt" = []))
)]
pub async fn entry_voucher_pdf(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    _guard: RequireModule<JournalModule>,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let pdf_bytes = app_state
        .document_service
        .entry_voucher_pdf(tenant.0, user.0.id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    // O navegador mostra ou baixa o PDF
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (header::CONTENT_DISPOSITION, format!("inline; filename=\"lancamento_{id}.pdf\"")),
    ];

    Ok((headers, pdf_bytes).into_response())
}
