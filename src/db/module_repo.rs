// src/db/module_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::modules::{ModulePermission, SystemModuleConfig, TenantModuleStatus, UpsertSystemModulePayload},
};

const SYSTEM_COLUMNS: &str = "id, module_key, name, description, is_enabled, is_core, created_at, updated_at";
const PERMISSION_COLUMNS: &str = "id, tenant_id, module_key, is_enabled, created_at, updated_at";

#[derive(Clone)]
pub struct ModuleRepository {
    pool: PgPool,
}

impl ModuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  CONFIGURAÇÃO GLOBAL
    // =========================================================================

    pub async fn list_system_modules(&self) -> Result<Vec<SystemModuleConfig>, AppError> {
        let sql = format!("SELECT {SYSTEM_COLUMNS} FROM system_module_configs ORDER BY module_key");
        let modules = sqlx::query_as::<_, SystemModuleConfig>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(modules)
    }

    pub async fn upsert_system_module<'e, E>(
        &self,
        executor: E,
        input: &UpsertSystemModulePayload,
    ) -> Result<SystemModuleConfig, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // UPSERT (Insert or Update)
        let sql = format!(
            r#"
            INSERT INTO system_module_configs (module_key, name, description, is_enabled, is_core)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (module_key)
            DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                is_enabled = EXCLUDED.is_enabled,
                is_core = EXCLUDED.is_core,
                updated_at = NOW()
            RETURNING {SYSTEM_COLUMNS}
            "#
        );
        let module = sqlx::query_as::<_, SystemModuleConfig>(&sql)
            .bind(&input.module_key)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.is_enabled)
            .bind(input.is_core)
            .fetch_one(executor)
            .await?;
        Ok(module)
    }

    // =========================================================================
    //  POR TENANT
    // =========================================================================

    /// Todos os módulos do sistema com o flag do tenant (quando existir).
    pub async fn list_tenant_modules<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Vec<TenantModuleStatus>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let modules = sqlx::query_as::<_, TenantModuleStatus>(
            r#"
            SELECT s.module_key, s.name, s.is_core,
                   s.is_enabled AS system_enabled,
                   mp.is_enabled AS tenant_enabled
            FROM system_module_configs s
            LEFT JOIN module_permissions mp
                   ON mp.module_key = s.module_key AND mp.tenant_id = $1
            ORDER BY s.module_key
            "#,
        )
            .bind(tenant_id)
            .fetch_all(executor)
            .await?;
        Ok(modules)
    }

    pub async fn tenant_module_status(
        &self,
        tenant_id: Uuid,
        module_key: &str,
    ) -> Result<Option<TenantModuleStatus>, AppError> {
        let status = sqlx::query_as::<_, TenantModuleStatus>(
            r#"
            SELECT s.module_key, s.name, s.is_core,
                   s.is_enabled AS system_enabled,
                   mp.is_enabled AS tenant_enabled
            FROM system_module_configs s
            LEFT JOIN module_permissions mp
                   ON mp.module_key = s.module_key AND mp.tenant_id = $1
            WHERE s.module_key = $2
            "#,
        )
            .bind(tenant_id)
            .bind(module_key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(status)
    }

    pub async fn set_tenant_module<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        module_key: &str,
        is_enabled: bool,
    ) -> Result<ModulePermission, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO module_permissions (tenant_id, module_key, is_enabled)
            VALUES ($1, $2, $3)
            ON CONFLICT (tenant_id, module_key)
            DO UPDATE SET is_enabled = EXCLUDED.is_enabled, updated_at = NOW()
            RETURNING {PERMISSION_COLUMNS}
            "#
        );
        let permission = sqlx::query_as::<_, ModulePermission>(&sql)
            .bind(tenant_id)
            .bind(module_key)
            .bind(is_enabled)
            .fetch_one(executor)
            .await?;
        Ok(permission)
    }

    /// Liga, para um tenant novo, todos os módulos habilitados no sistema.
    pub async fn enable_system_modules<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            INSERT INTO module_permissions (tenant_id, module_key, is_enabled)
            SELECT $1, module_key, TRUE
            FROM system_module_configs
            WHERE is_enabled = TRUE
            ON CONFLICT DO NOTHING
            "#,
        )
            .bind(tenant_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
