// src/db/token_repo.rs
//
// Refresh tokens, tokens de reset de senha e códigos OTP.

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::{OtpPurpose, OtpVerification, PasswordResetToken, RefreshToken},
};

const REFRESH_COLUMNS: &str = "id, user_id, token_hash, expires_at, revoked_at, replaced_by, created_at";
const RESET_COLUMNS: &str = "id, user_id, token_hash, expires_at, used_at, created_at";
const OTP_COLUMNS: &str = "id, email, purpose, code_hash, attempts, expires_at, verified_at, created_at";

/// Quantas linhas a limpeza removeu de cada tabela
#[derive(Debug, Default, Clone, Copy)]
pub struct PurgeReport {
    pub refresh_tokens: u64,
    pub reset_tokens: u64,
    pub otps: u64,
}

#[derive(Clone)]
pub struct TokenRepository {
    pool: PgPool,
}

impl TokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  REFRESH TOKENS
    // =========================================================================

    pub async fn insert_refresh_token<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "INSERT INTO refresh_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3) RETURNING {REFRESH_COLUMNS}"
        );
        let token = sqlx::query_as::<_, RefreshToken>(&sql)
            .bind(user_id)
            .bind(token_hash)
            .bind(expires_at)
            .fetch_one(executor)
            .await?;
        Ok(token)
    }

    /// Trava a linha para a rotação não correr em paralelo com outra.
    pub async fn find_refresh_for_update<'e, E>(
        &self,
        executor: E,
        token_hash: &str,
    ) -> Result<Option<RefreshToken>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {REFRESH_COLUMNS} FROM refresh_tokens WHERE token_hash = $1 FOR UPDATE");
        let token = sqlx::query_as::<_, RefreshToken>(&sql)
            .bind(token_hash)
            .fetch_optional(executor)
            .await?;
        Ok(token)
    }

    pub async fn revoke_refresh<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        replaced_by: Option<Uuid>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = COALESCE(revoked_at, NOW()), replaced_by = COALESCE($2, replaced_by)
            WHERE id = $1
            "#,
        )
            .bind(id)
            .bind(replaced_by)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn revoke_all_for_user<'e, E>(&self, executor: E, user_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL",
        )
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    //  RESET DE SENHA
    // =========================================================================

    pub async fn insert_reset_token<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordResetToken, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "INSERT INTO password_reset_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3) RETURNING {RESET_COLUMNS}"
        );
        let token = sqlx::query_as::<_, PasswordResetToken>(&sql)
            .bind(user_id)
            .bind(token_hash)
            .bind(expires_at)
            .fetch_one(executor)
            .await?;
        Ok(token)
    }

    pub async fn find_reset_for_update<'e, E>(
        &self,
        executor: E,
        token_hash: &str,
    ) -> Result<Option<PasswordResetToken>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {RESET_COLUMNS} FROM password_reset_tokens WHERE token_hash = $1 FOR UPDATE");
        let token = sqlx::query_as::<_, PasswordResetToken>(&sql)
            .bind(token_hash)
            .fetch_optional(executor)
            .await?;
        Ok(token)
    }

    pub async fn mark_reset_used<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE password_reset_tokens SET used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    // =========================================================================
    //  OTP
    // =========================================================================

    pub async fn insert_otp<'e, E>(
        &self,
        executor: E,
        email: &str,
        purpose: OtpPurpose,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<OtpVerification, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO otp_verifications (email, purpose, code_hash, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {OTP_COLUMNS}
            "#
        );
        let otp = sqlx::query_as::<_, OtpVerification>(&sql)
            .bind(email)
            .bind(purpose)
            .bind(code_hash)
            .bind(expires_at)
            .fetch_one(executor)
            .await?;
        Ok(otp)
    }

    /// O código mais recente ainda não verificado para o e-mail/propósito.
    pub async fn latest_pending_otp_for_update<'e, E>(
        &self,
        executor: E,
        email: &str,
        purpose: OtpPurpose,
    ) -> Result<Option<OtpVerification>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            SELECT {OTP_COLUMNS} FROM otp_verifications
            WHERE email = $1 AND purpose = $2 AND verified_at IS NULL
            ORDER BY created_at DESC
            LIMIT 1
            FOR UPDATE
            "#
        );
        let otp = sqlx::query_as::<_, OtpVerification>(&sql)
            .bind(email)
            .bind(purpose)
            .fetch_optional(executor)
            .await?;
        Ok(otp)
    }

    pub async fn increment_otp_attempts<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE otp_verifications SET attempts = attempts + 1 WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn mark_otp_verified<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE otp_verifications SET verified_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    // =========================================================================
    //  LIMPEZA
    // =========================================================================

    /// Remove credenciais vencidas. Refresh tokens revogados ficam um dia a mais
    /// para a detecção de reuso.
    pub async fn purge_expired(&self) -> Result<PurgeReport, AppError> {
        let mut tx = self.pool.begin().await?;

        let refresh_tokens = sqlx::query(
            r#"
            DELETE FROM refresh_tokens
            WHERE expires_at < NOW() - INTERVAL '1 day'
               OR (revoked_at IS NOT NULL AND revoked_at < NOW() - INTERVAL '1 day')
            "#,
        )
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let reset_tokens = sqlx::query(
            "DELETE FROM password_reset_tokens WHERE expires_at < NOW() OR used_at IS NOT NULL",
        )
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let otps = sqlx::query("DELETE FROM otp_verifications WHERE expires_at < NOW()")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        Ok(PurgeReport { refresh_tokens, reset_tokens, otps })
    }
}
