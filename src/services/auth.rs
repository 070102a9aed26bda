// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;

use crate::{
    common::{
        error::AppError,
        tokens::{generate_opaque_token, generate_otp_code, hash_otp, hash_token},
    },
    config::AppConfig,
    db::{token_repo::PurgeReport, TokenRepository, UserRepository},
    models::auth::{AuthResponse, Claims, OtpPurpose, OtpVerifyResponse, User},
};

/// E-mails são comparados sempre em minúsculas e sem espaços.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

async fn hash_password(password: &str) -> Result<String, AppError> {
    let password_clone = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}

async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password_clone = password.to_owned();
    let hash_clone = password_hash.to_owned();
    let is_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &hash_clone))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;
    Ok(is_valid)
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    token_repo: TokenRepository,
    config: Arc<AppConfig>,
    pool: PgPool,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, token_repo: TokenRepository, config: Arc<AppConfig>, pool: PgPool) -> Self {
        Self { user_repo, token_repo, config, pool }
    }

    /// Cria o usuário (VIEWER, sem tenant) e já emite o OTP de verificação de e-mail.
    pub async fn register_user(&self, email: &str, password: &str, full_name: &str) -> Result<User, AppError> {
        let email = normalize_email(email);
        // Hashing fica fora da transação: não toca no banco
        let hashed_password = hash_password(password).await?;

        let mut tx = self.pool.begin().await?;

        let new_user = self
            .user_repo
            .create_user(&mut *tx, &email, &hashed_password, full_name.trim())
            .await?;

        self.issue_otp(&mut tx, &email, OtpPurpose::EmailVerification).await?;

        tx.commit().await?;

        tracing::info!(user_id = %new_user.id, "Novo usuário registrado");
        Ok(new_user)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        let user = self
            .user_repo
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AppError::UserInactive);
        }

        let mut tx = self.pool.begin().await?;
        self.user_repo.touch_last_login(&mut *tx, user.id).await?;
        let response = self.issue_tokens(&mut tx, &user).await?;
        tx.commit().await?;

        Ok(response)
    }

    /// Troca o refresh token por um par novo. Reapresentar um token já revogado
    /// indica vazamento: todos os tokens ativos do usuário são revogados.
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse, AppError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let stored = self
            .token_repo
            .find_refresh_for_update(&mut *tx, &hash_token(refresh_token))
            .await?
            .ok_or(AppError::InvalidToken)?;

        if stored.revoked_at.is_some() {
            let revoked = self.token_repo.revoke_all_for_user(&mut *tx, stored.user_id).await?;
            tx.commit().await?;
            tracing::warn!(
                user_id = %stored.user_id,
                revoked,
                "Reuso de refresh token detectado; sessões do usuário encerradas"
            );
            return Err(AppError::InvalidToken);
        }
        if !stored.is_usable_at(now) {
            return Err(AppError::InvalidToken);
        }

        let user = self
            .user_repo
            .find_by_id(stored.user_id)
            .await?
            .ok_or(AppError::InvalidToken)?;
        if !user.is_active {
            return Err(AppError::UserInactive);
        }

        let (response, new_id) = self.issue_tokens_with_id(&mut tx, &user).await?;
        self.token_repo.revoke_refresh(&mut *tx, stored.id, Some(new_id)).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, "Refresh token rotacionado");
        Ok(response)
    }

    /// Idempotente: token desconhecido ou já revogado não é erro.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        if let Some(stored) = self
            .token_repo
            .find_refresh_for_update(&mut *tx, &hash_token(refresh_token))
            .await?
        {
            if stored.revoked_at.is_none() {
                self.token_repo.revoke_refresh(&mut *tx, stored.id, None).await?;
            }
        }
        tx.commit().await?;
        Ok(())
    }

    /// Sempre responde igual, exista o e-mail ou não.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AppError> {
        let Some(user) = self.user_repo.find_by_email(&normalize_email(email)).await? else {
            tracing::debug!("Reset de senha pedido para e-mail desconhecido");
            return Ok(());
        };
        if !user.is_active {
            return Ok(());
        }

        let token = generate_opaque_token();
        let expires_at = Utc::now() + self.config.password_reset_ttl;
        self.token_repo
            .insert_reset_token(&self.pool, user.id, &hash_token(&token), expires_at)
            .await?;

        // Entrega do link (e-mail) fica a cargo de um serviço externo
        tracing::info!(user_id = %user.id, %expires_at, "Token de redefinição de senha emitido");
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        let hashed_password = hash_password(new_password).await?;
        let mut tx = self.pool.begin().await?;

        let reset = self
            .token_repo
            .find_reset_for_update(&mut *tx, &hash_token(token))
            .await?
            .ok_or(AppError::InvalidToken)?;
        if !reset.is_usable_at(Utc::now()) {
            return Err(AppError::InvalidToken);
        }

        self.user_repo.update_password(&mut *tx, reset.user_id, &hashed_password).await?;
        self.token_repo.mark_reset_used(&mut *tx, reset.id).await?;
        let revoked = self.token_repo.revoke_all_for_user(&mut *tx, reset.user_id).await?;

        tx.commit().await?;

        tracing::info!(user_id = %reset.user_id, revoked, "Senha redefinida");
        Ok(())
    }

    pub async fn request_otp(&self, email: &str, purpose: OtpPurpose) -> Result<(), AppError> {
        let email = normalize_email(email);
        let mut tx = self.pool.begin().await?;
        self.issue_otp(&mut tx, &email, purpose).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Confere o OTP mais recente. Código errado conta tentativa; código certo
    /// de EMAIL_VERIFICATION marca o e-mail, e de LOGIN emite tokens.
    pub async fn verify_otp(&self, email: &str, purpose: OtpPurpose, code: &str) -> Result<OtpVerifyResponse, AppError> {
        let email = normalize_email(email);
        let mut tx = self.pool.begin().await?;

        let otp = self
            .token_repo
            .latest_pending_otp_for_update(&mut *tx, &email, purpose)
            .await?
            .ok_or(AppError::InvalidOtp)?;

        if otp.expires_at <= Utc::now() {
            return Err(AppError::OtpExpired);
        }
        if otp.attempts >= self.config.otp_max_attempts {
            return Err(AppError::OtpAttemptsExceeded);
        }
        if otp.code_hash != hash_otp(&email, code) {
            self.token_repo.increment_otp_attempts(&mut *tx, otp.id).await?;
            tx.commit().await?;
            return Err(AppError::InvalidOtp);
        }

        self.token_repo.mark_otp_verified(&mut *tx, otp.id).await?;

        let auth = match purpose {
            OtpPurpose::EmailVerification => {
                self.user_repo.mark_email_verified(&mut *tx, &email).await?;
                None
            }
            OtpPurpose::Login => {
                let user = self
                    .user_repo
                    .find_by_email(&email)
                    .await?
                    .ok_or(AppError::InvalidOtp)?;
                if !user.is_active {
                    return Err(AppError::UserInactive);
                }
                self.user_repo.touch_last_login(&mut *tx, user.id).await?;
                Some(self.issue_tokens(&mut tx, &user).await?)
            }
        };

        tx.commit().await?;
        Ok(OtpVerifyResponse { verified: true, auth })
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        let user = self
            .user_repo
            .find_by_id(token_data.claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        if !user.is_active {
            return Err(AppError::UserInactive);
        }
        Ok(user)
    }

    pub async fn purge_expired_credentials(&self) -> Result<PurgeReport, AppError> {
        let report = self.token_repo.purge_expired().await?;
        tracing::info!(
            refresh_tokens = report.refresh_tokens,
            reset_tokens = report.reset_tokens,
            otps = report.otps,
            "Credenciais vencidas removidas"
        );
        Ok(report)
    }

    async fn issue_otp(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        email: &str,
        purpose: OtpPurpose,
    ) -> Result<(), AppError> {
        let code = generate_otp_code();
        let expires_at = Utc::now() + self.config.otp_ttl;
        self.token_repo
            .insert_otp(&mut **tx, email, purpose, &hash_otp(email, &code), expires_at)
            .await?;

        // Entrega (e-mail/SMS) fica a cargo de um serviço externo
        tracing::info!(?purpose, %expires_at, "Código OTP emitido");
        Ok(())
    }

    async fn issue_tokens(&self, tx: &mut Transaction<'static, Postgres>, user: &User) -> Result<AuthResponse, AppError> {
        self.issue_tokens_with_id(tx, user).await.map(|(response, _)| response)
    }

    async fn issue_tokens_with_id(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        user: &User,
    ) -> Result<(AuthResponse, uuid::Uuid), AppError> {
        let access_token = self.create_access_token(user)?;

        let refresh_token = generate_opaque_token();
        let expires_at = Utc::now() + self.config.refresh_token_ttl;
        let stored = self
            .token_repo
            .insert_refresh_token(&mut **tx, user.id, &hash_token(&refresh_token), expires_at)
            .await?;

        let response = AuthResponse {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_ttl.num_seconds(),
        };
        Ok((response, stored.id))
    }

    fn create_access_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + self.config.access_token_ttl;

        let claims = Claims {
            sub: user.id,
            tid: user.tenant_id,
            role: user.role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        // Usa '?' para um tratamento de erro mais limpo
        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Maria@Example.COM "), "maria@example.com");
    }

    #[tokio::test]
    async fn password_hash_roundtrip() {
        let hashed = hash_password("s3nh4-f0rt3").await.unwrap();
        assert!(verify_password("s3nh4-f0rt3", &hashed).await.unwrap());
        assert!(!verify_password("outra-senha", &hashed).await.unwrap());
    }
}
