// src/middleware/tenancy.rs

use axum::{extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{auth::User, tenancy::Tenant},
};

// O nome do nosso cabeçalho HTTP customizado
pub const TENANT_ID_HEADER: &str = "x-tenant-id";

// Tenant resolvido pelo `tenant_guard` para a requisição corrente.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext(pub Uuid);

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .copied()
            .ok_or(AppError::TenantContextMissing)
    }
}

/// Lê o X-Tenant-ID. Ausente -> `Ok(None)`; presente mas inválido -> erro.
pub fn tenant_id_from_headers(headers: &HeaderMap) -> Result<Option<Uuid>, AppError> {
    let Some(value) = headers.get(TENANT_ID_HEADER) else {
        return Ok(None);
    };

    let tenant_id = value
        .to_str()
        .ok()
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
        .ok_or(AppError::TenantContextMissing)?;

    Ok(Some(tenant_id))
}

/// Decide em qual tenant o usuário vai operar.
///
/// Usuários comuns só operam no próprio tenant: um cabeçalho apontando para
/// outro tenant é negado. O SUPER_ADMIN não tem tenant próprio e precisa
/// dizer qual quer acessar.
pub fn resolve_tenant(user: &User, requested: Option<Uuid>) -> Result<Uuid, AppError> {
    if user.role.is_super_admin() {
        return requested.ok_or(AppError::TenantContextMissing);
    }

    let own = user.tenant_id.ok_or(AppError::TenantContextMissing)?;
    match requested {
        Some(other) if other != own => Err(AppError::TenantAccessDenied),
        _ => Ok(own),
    }
}

/// Tenant inativo ou trial vencido não podem ser usados.
///
/// O SUPER_ADMIN passa mesmo assim: é ele quem reativa o tenant ou troca o
/// plano de um trial vencido.
pub fn ensure_tenant_usable(user: &User, tenant: &Tenant, now: DateTime<Utc>) -> Result<(), AppError> {
    if user.role.is_super_admin() {
        return Ok(());
    }
    if !tenant.is_active {
        return Err(AppError::TenantInactive);
    }
    if tenant.trial_expired_at(now) {
        return Err(AppError::TrialExpired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{auth::UserRole, tenancy::TenantPlan};
    use axum::http::HeaderValue;
    use chrono::Duration;

    fn user(role: UserRole, tenant_id: Option<Uuid>) -> User {
        User {
            id: Uuid::new_v4(),
            email: "ana@example.com".into(),
            password_hash: String::new(),
            full_name: "Ana".into(),
            role,
            tenant_id,
            branch_id: None,
            is_active: true,
            email_verified_at: None,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn tenant(plan: TenantPlan, trial_ends_at: Option<DateTime<Utc>>, is_active: bool) -> Tenant {
        Tenant {
            id: Uuid::new_v4(),
            name: "Acme".into(),
            slug: "acme".into(),
            plan,
            trial_ends_at,
            is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn missing_header_is_not_an_error() {
        assert_eq!(tenant_id_from_headers(&HeaderMap::new()).unwrap(), None);
    }

    #[test]
    fn malformed_header_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert!(matches!(tenant_id_from_headers(&headers), Err(AppError::TenantContextMissing)));
    }

    #[test]
    fn header_uuid_is_parsed() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(TENANT_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(tenant_id_from_headers(&headers).unwrap(), Some(id));
    }

    #[test]
    fn regular_user_uses_own_tenant() {
        let own = Uuid::new_v4();
        let u = user(UserRole::Accountant, Some(own));
        assert_eq!(resolve_tenant(&u, None).unwrap(), own);
        assert_eq!(resolve_tenant(&u, Some(own)).unwrap(), own);
    }

    #[test]
    fn regular_user_cannot_switch_tenant() {
        let u = user(UserRole::TenantAdmin, Some(Uuid::new_v4()));
        assert!(matches!(resolve_tenant(&u, Some(Uuid::new_v4())), Err(AppError::TenantAccessDenied)));
    }

    #[test]
    fn user_without_tenant_has_no_context() {
        let u = user(UserRole::Viewer, None);
        assert!(matches!(resolve_tenant(&u, None), Err(AppError::TenantContextMissing)));
    }

    #[test]
    fn super_admin_must_name_the_tenant() {
        let u = user(UserRole::SuperAdmin, None);
        assert!(matches!(resolve_tenant(&u, None), Err(AppError::TenantContextMissing)));
        let target = Uuid::new_v4();
        assert_eq!(resolve_tenant(&u, Some(target)).unwrap(), target);
    }

    #[test]
    fn inactive_and_expired_tenants_are_refused() {
        let now = Utc::now();
        let admin = user(UserRole::TenantAdmin, Some(Uuid::new_v4()));
        assert!(matches!(
            ensure_tenant_usable(&admin, &tenant(TenantPlan::Basic, None, false), now),
            Err(AppError::TenantInactive)
        ));
        assert!(matches!(
            ensure_tenant_usable(&admin, &tenant(TenantPlan::Trial, Some(now - Duration::days(1)), true), now),
            Err(AppError::TrialExpired)
        ));
        assert!(ensure_tenant_usable(&admin, &tenant(TenantPlan::Trial, Some(now + Duration::days(3)), true), now).is_ok());
    }

    #[test]
    fn super_admin_reaches_inactive_and_expired_tenants() {
        let now = Utc::now();
        let root = user(UserRole::SuperAdmin, None);
        let inactive = tenant(TenantPlan::Basic, None, false);
        assert_eq!(resolve_tenant(&root, Some(inactive.id)).unwrap(), inactive.id);
        assert!(ensure_tenant_usable(&root, &inactive, now).is_ok());
        let expired = tenant(TenantPlan::Trial, Some(now - Duration::days(1)), true);
        assert!(ensure_tenant_usable(&root, &expired, now).is_ok());
    }
}
