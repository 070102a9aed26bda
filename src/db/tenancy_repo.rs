// src/db/tenancy_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Executor};
use uuid::Uuid;
use crate::common::error::{map_unique_violation, AppError};
use crate::models::tenancy::{Branch, Tenant, TenantPlan};

const TENANT_COLUMNS: &str = "id, name, slug, plan, trial_ends_at, is_active, created_at, updated_at";
const BRANCH_COLUMNS: &str = "id, tenant_id, name, code, address, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Busca o tenant direto na pool (usado pelo guard de cada requisição).
    pub async fn find_by_id(&self, tenant_id: Uuid) -> Result<Option<Tenant>, AppError> {
        let sql = format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = $1");
        let tenant = sqlx::query_as::<_, Tenant>(&sql)
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tenant)
    }

    pub async fn create_tenant<'e, E>(
        &self,
        executor: E, // Aceita um executor (pool ou transação)
        name: &str,
        slug: &str,
        plan: TenantPlan,
        trial_ends_at: Option<DateTime<Utc>>,
    ) -> Result<Tenant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO tenants (name, slug, plan, trial_ends_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {TENANT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Tenant>(&sql)
            .bind(name)
            .bind(slug)
            .bind(plan)
            .bind(trial_ends_at)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                map_unique_violation(e, |constraint| match constraint {
                    "tenants_slug_key" => Some(AppError::TenantSlugAlreadyExists(slug.to_string())),
                    _ => None,
                })
            })
    }

    /// Atualização parcial: campos `None` ficam como estão.
    pub async fn update_tenant<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        name: Option<&str>,
        plan: Option<TenantPlan>,
        is_active: Option<bool>,
    ) -> Result<Tenant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE tenants
            SET name = COALESCE($2, name),
                plan = COALESCE($3, plan),
                is_active = COALESCE($4, is_active),
                trial_ends_at = CASE WHEN $3 IS NOT NULL AND $3 <> 'TRIAL'::tenant_plan THEN NULL ELSE trial_ends_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TENANT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Tenant>(&sql)
            .bind(tenant_id)
            .bind(name)
            .bind(plan)
            .bind(is_active)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("tenant"))
    }

    // =========================================================================
    //  FILIAIS
    // =========================================================================

    pub async fn create_branch<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        name: &str,
        code: &str,
        address: Option<&str>,
    ) -> Result<Branch, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO branches (tenant_id, name, code, address)
            VALUES ($1, $2, $3, $4)
            RETURNING {BRANCH_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Branch>(&sql)
            .bind(tenant_id)
            .bind(name)
            .bind(code)
            .bind(address)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                map_unique_violation(e, |constraint| match constraint {
                    "branches_tenant_code_key" => Some(AppError::UniqueConstraintViolation(format!("branch {code}"))),
                    _ => None,
                })
            })
    }

    pub async fn list_branches<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<Branch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {BRANCH_COLUMNS} FROM branches WHERE tenant_id = $1 ORDER BY code ASC");
        let branches = sqlx::query_as::<_, Branch>(&sql)
            .bind(tenant_id)
            .fetch_all(executor)
            .await?;
        Ok(branches)
    }

    pub async fn find_branch<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        branch_id: Uuid,
    ) -> Result<Option<Branch>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {BRANCH_COLUMNS} FROM branches WHERE tenant_id = $1 AND id = $2");
        let branch = sqlx::query_as::<_, Branch>(&sql)
            .bind(tenant_id)
            .bind(branch_id)
            .fetch_optional(executor)
            .await?;
        Ok(branch)
    }

    pub async fn update_branch<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        branch_id: Uuid,
        name: Option<&str>,
        address: Option<&str>,
        is_active: Option<bool>,
    ) -> Result<Branch, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE branches
            SET name = COALESCE($3, name),
                address = COALESCE($4, address),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING {BRANCH_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Branch>(&sql)
            .bind(tenant_id)
            .bind(branch_id)
            .bind(name)
            .bind(address)
            .bind(is_active)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("branch"))
    }
}
