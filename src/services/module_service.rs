// src/services/module_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ModuleRepository,
    models::modules::{
        ModulePermission, SystemModuleConfig, TenantModuleResponse, UpsertSystemModulePayload,
    },
};

#[derive(Clone)]
pub struct ModuleService {
    module_repo: ModuleRepository,
    pool: PgPool,
}

impl ModuleService {
    pub fn new(module_repo: ModuleRepository, pool: PgPool) -> Self {
        Self { module_repo, pool }
    }

    pub async fn list_system_modules(&self) -> Result<Vec<SystemModuleConfig>, AppError> {
        self.module_repo.list_system_modules().await
    }

    pub async fn upsert_system_module(&self, payload: &UpsertSystemModulePayload) -> Result<SystemModuleConfig, AppError> {
        let module = self.module_repo.upsert_system_module(&self.pool, payload).await?;
        tracing::info!(
            module = %module.module_key,
            is_enabled = module.is_enabled,
            is_core = module.is_core,
            "Configuração global de módulo gravada"
        );
        Ok(module)
    }

    pub async fn list_tenant_modules(&self, tenant_id: Uuid) -> Result<Vec<TenantModuleResponse>, AppError> {
        let modules = self.module_repo.list_tenant_modules(&self.pool, tenant_id).await?;
        Ok(modules.into_iter().map(TenantModuleResponse::from).collect())
    }

    /// Liga/desliga um módulo para o tenant. Core não pode ser desligado.
    pub async fn set_tenant_module(
        &self,
        tenant_id: Uuid,
        module_key: &str,
        is_enabled: bool,
    ) -> Result<ModulePermission, AppError> {
        let status = self
            .module_repo
            .tenant_module_status(tenant_id, module_key)
            .await?
            .ok_or_else(|| AppError::ModuleNotFound(module_key.to_string()))?;

        if status.is_core && !is_enabled {
            return Err(AppError::CoreModuleLocked(status.module_key));
        }

        let permission = self
            .module_repo
            .set_tenant_module(&self.pool, tenant_id, &status.module_key, is_enabled)
            .await?;

        tracing::info!(%tenant_id, module = %permission.module_key, is_enabled, "Módulo do tenant alterado");
        Ok(permission)
    }

    /// Usado pelo `RequireModule`: chave desconhecida conta como desligada.
    pub async fn is_module_effective(&self, tenant_id: Uuid, module_key: &str) -> Result<bool, AppError> {
        Ok(self
            .module_repo
            .tenant_module_status(tenant_id, module_key)
            .await?
            .is_some_and(|status| status.effective()))
    }
}
