// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, Extensions, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use chrono::Utc;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        i18n::Locale,
        tenancy::{ensure_tenant_usable, resolve_tenant, tenant_id_from_headers, TenantContext},
    },
    models::auth::User,
};

// Usuário autenticado, colocado nos extensions pelo `auth_guard`
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl AuthenticatedUser {
    pub fn ensure_super_admin(&self) -> Result<(), AppError> {
        if self.0.role.is_super_admin() { Ok(()) } else { Err(AppError::Forbidden) }
    }

    pub fn ensure_tenant_admin(&self) -> Result<(), AppError> {
        if self.0.role.can_manage_tenant() { Ok(()) } else { Err(AppError::Forbidden) }
    }

    pub fn ensure_ledger_writer(&self) -> Result<(), AppError> {
        if self.0.role.can_write_ledger() { Ok(()) } else { Err(AppError::Forbidden) }
    }
}

// O middleware em si: valida o Bearer e injeta o usuário
pub async fn auth_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let bearer = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AppError::InvalidToken)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let user = app_state
        .auth_service
        .validate_token(bearer.token())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

// Roda depois do `auth_guard`: resolve o tenant e checa se ele pode ser usado.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    locale: Locale,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let context = resolve_request_tenant(&app_state, request.headers(), request.extensions())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

async fn resolve_request_tenant(
    app_state: &AppState,
    headers: &HeaderMap,
    extensions: &Extensions,
) -> Result<TenantContext, AppError> {
    let user = extensions
        .get::<AuthenticatedUser>()
        .ok_or(AppError::InvalidToken)?;

    let requested = tenant_id_from_headers(headers)?;
    let tenant_id = resolve_tenant(&user.0, requested)?;

    let tenant = app_state.tenant_service.get_tenant(tenant_id).await?;
    ensure_tenant_usable(&user.0, &tenant, Utc::now())?;

    tracing::debug!(user_id = %user.0.id, tenant_id = %tenant_id, "Contexto de tenant resolvido");
    Ok(TenantContext(tenant_id))
}

// Extrator para obter o usuário autenticado diretamente nos handlers
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::UserRole;
    use uuid::Uuid;

    fn with_role(role: UserRole) -> AuthenticatedUser {
        AuthenticatedUser(User {
            id: Uuid::new_v4(),
            email: "joao@example.com".into(),
            password_hash: String::new(),
            full_name: "João".into(),
            role,
            tenant_id: Some(Uuid::new_v4()),
            branch_id: None,
            is_active: true,
            email_verified_at: None,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    #[test]
    fn viewer_cannot_write_ledger() {
        assert!(matches!(with_role(UserRole::Viewer).ensure_ledger_writer(), Err(AppError::Forbidden)));
        assert!(with_role(UserRole::Accountant).ensure_ledger_writer().is_ok());
    }

    #[test]
    fn only_admins_manage_tenant() {
        assert!(with_role(UserRole::TenantAdmin).ensure_tenant_admin().is_ok());
        assert!(with_role(UserRole::SuperAdmin).ensure_tenant_admin().is_ok());
        assert!(with_role(UserRole::Accountant).ensure_tenant_admin().is_err());
    }

    #[test]
    fn super_admin_check() {
        assert!(with_role(UserRole::SuperAdmin).ensure_super_admin().is_ok());
        assert!(with_role(UserRole::TenantAdmin).ensure_super_admin().is_err());
    }
}
