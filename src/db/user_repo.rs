// src/db/user_repo.rs

use sqlx::{PgPool, Postgres, Executor};
use uuid::Uuid;
use crate::{
    common::error::{map_unique_violation, AppError},
    models::auth::{User, UserRole},
};

const USER_COLUMNS: &str = r#"
    id, email, password_hash, full_name, role, tenant_id, branch_id,
    is_active, email_verified_at, last_login_at, created_at, updated_at
"#;

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um usuário pelo seu e-mail (sempre normalizado em minúsculas)
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let maybe_user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(maybe_user)
    }

    // Busca um usuário pelo seu ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let maybe_user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(maybe_user)
    }

    // Cria um novo usuário, com tratamento específico para e-mails duplicados.
    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        email: &str,
        password_hash: &str,
        full_name: &str,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO users (email, password_hash, full_name)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .bind(password_hash)
            .bind(full_name)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                map_unique_violation(e, |constraint| match constraint {
                    "users_email_key" => Some(AppError::EmailAlreadyExists),
                    _ => None,
                })
            })
    }

    pub async fn touch_last_login<'e, E>(&self, executor: E, user_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn update_password<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Marca o e-mail como verificado (só na primeira vez).
    pub async fn mark_email_verified<'e, E>(&self, executor: E, email: &str) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE users SET email_verified_at = NOW(), updated_at = NOW()
            WHERE email = $1 AND email_verified_at IS NULL
            "#,
        )
            .bind(email)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Vincula o usuário a um tenant (ou troca o cargo/filial dentro do mesmo tenant).
    pub async fn assign_to_tenant<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        tenant_id: Uuid,
        role: UserRole,
        branch_id: Option<Uuid>,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE users
            SET tenant_id = $2, role = $3, branch_id = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .bind(tenant_id)
            .bind(role)
            .bind(branch_id)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::UserNotFound)
    }

    pub async fn list_by_tenant<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE tenant_id = $1 ORDER BY full_name ASC");
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(tenant_id)
            .fetch_all(executor)
            .await?;
        Ok(users)
    }
}
