// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    SuperAdmin,
    TenantAdmin,
    Accountant,
    Viewer,
}

impl UserRole {
    pub fn is_super_admin(self) -> bool {
        matches!(self, UserRole::SuperAdmin)
    }

    /// Administra o tenant (usuários, filiais, módulos, travas de exercício)
    pub fn can_manage_tenant(self) -> bool {
        matches!(self, UserRole::SuperAdmin | UserRole::TenantAdmin)
    }

    /// Pode criar e alterar dados contábeis
    pub fn can_write_ledger(self) -> bool {
        !matches!(self, UserRole::Viewer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "otp_purpose", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OtpPurpose {
    EmailVerification,
    Login,
}

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    #[schema(example = "contador@empresa.com")]
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password_hash: String,

    #[schema(example = "Maria Souza")]
    pub full_name: String,
    pub role: UserRole,
    pub tenant_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
    pub is_active: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub replaced_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && self.expires_at > now
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OtpVerification {
    pub id: Uuid,
    pub email: String,
    pub purpose: OtpPurpose,
    pub code_hash: String,
    pub attempts: i32,
    pub expires_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// Dados para registro de um novo usuário
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserPayload {
    #[validate(email(message = "invalid_email"))]
    #[schema(example = "contador@empresa.com")]
    pub email: String,
    #[validate(length(min = 8, message = "password_too_short"))]
    #[schema(example = "s3nh4-f0rt3")]
    pub password: String,
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Maria Souza")]
    pub full_name: String,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(email(message = "invalid_email"))]
    pub email: String,
    #[validate(length(min = 1, message = "required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenPayload {
    #[validate(length(min = 1, message = "required"))]
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PasswordResetRequestPayload {
    #[validate(email(message = "invalid_email"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetConfirmPayload {
    #[validate(length(min = 1, message = "required"))]
    pub token: String,
    #[validate(length(min = 8, message = "password_too_short"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OtpRequestPayload {
    #[validate(email(message = "invalid_email"))]
    pub email: String,
    pub purpose: OtpPurpose,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OtpVerifyPayload {
    #[validate(email(message = "invalid_email"))]
    pub email: String,
    pub purpose: OtpPurpose,
    #[validate(length(equal = 6, message = "invalid_otp_format"))]
    #[schema(example = "042917")]
    pub code: String,
}

// Resposta de autenticação com o par de tokens
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Validade do access token em segundos
    pub expires_in: i64,
}

/// Resultado da verificação de OTP. Códigos de LOGIN devolvem o par de tokens.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OtpVerifyResponse {
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthResponse>,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,                 // Subject (ID do usuário)
    pub tid: Option<Uuid>,         // Tenant do usuário no momento da emissão
    pub role: UserRole,
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn refresh(expires_in: Duration, revoked: bool) -> RefreshToken {
        let now = Utc::now();
        RefreshToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: "x".repeat(64),
            expires_at: now + expires_in,
            revoked_at: revoked.then_some(now),
            replaced_by: None,
            created_at: now,
        }
    }

    #[test]
    fn refresh_token_is_unusable_once_expired_or_revoked() {
        let now = Utc::now();
        assert!(refresh(Duration::minutes(5), false).is_usable_at(now));
        assert!(!refresh(Duration::minutes(-1), false).is_usable_at(now));
        assert!(!refresh(Duration::minutes(5), true).is_usable_at(now));
    }

    #[test]
    fn reset_token_is_single_use() {
        let now = Utc::now();
        let mut token = PasswordResetToken {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            token_hash: "y".repeat(64),
            expires_at: now + Duration::hours(1),
            used_at: None,
            created_at: now,
        };
        assert!(token.is_usable_at(now));
        token.used_at = Some(now);
        assert!(!token.is_usable_at(now));
    }

    #[test]
    fn role_capabilities() {
        assert!(UserRole::SuperAdmin.can_manage_tenant());
        assert!(UserRole::TenantAdmin.can_manage_tenant());
        assert!(!UserRole::Accountant.can_manage_tenant());
        assert!(UserRole::Accountant.can_write_ledger());
        assert!(!UserRole::Viewer.can_write_ledger());
    }
}
