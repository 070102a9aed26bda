// src/models/modules.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;
use validator::Validate;

/// Configuração global de um módulo (vale para todos os tenants)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SystemModuleConfig {
    pub id: Uuid,
    #[schema(example = "JOURNAL")]
    pub module_key: String,
    #[schema(example = "Lançamentos")]
    pub name: String,
    pub description: Option<String>,
    pub is_enabled: bool,
    /// Módulos core não podem ser desligados por tenant
    pub is_core: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Liga/desliga de um módulo para um tenant
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModulePermission {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub module_key: String,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Estado efetivo de um módulo para o tenant (visão da tela de configurações)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantModuleStatus {
    pub module_key: String,
    pub name: String,
    pub is_core: bool,
    pub system_enabled: bool,
    pub tenant_enabled: Option<bool>,
}

impl TenantModuleStatus {
    pub fn effective(&self) -> bool {
        module_is_effective(self.system_enabled, self.is_core, self.tenant_enabled)
    }
}

/// Um módulo vale para o tenant se estiver ligado no sistema e
/// (for core ou estiver ligado explicitamente para o tenant).
pub fn module_is_effective(system_enabled: bool, is_core: bool, tenant_enabled: Option<bool>) -> bool {
    system_enabled && (is_core || tenant_enabled.unwrap_or(false))
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TenantModuleResponse {
    pub module_key: String,
    pub name: String,
    pub is_core: bool,
    pub enabled: bool,
}

impl From<TenantModuleStatus> for TenantModuleResponse {
    fn from(status: TenantModuleStatus) -> Self {
        let enabled = status.effective();
        Self {
            module_key: status.module_key,
            name: status.name,
            is_core: status.is_core,
            enabled,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertSystemModulePayload {
    #[validate(length(min = 1, max = 50, message = "required"))]
    #[schema(example = "REPORTS")]
    pub module_key: String,
    #[validate(length(min = 1, max = 255, message = "required"))]
    pub name: String,
    pub description: Option<String>,
    pub is_enabled: bool,
    #[serde(default)]
    pub is_core: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetTenantModulePayload {
    pub is_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_modules_ignore_tenant_flag() {
        assert!(module_is_effective(true, true, None));
        assert!(module_is_effective(true, true, Some(false)));
    }

    #[test]
    fn optional_modules_need_tenant_opt_in() {
        assert!(!module_is_effective(true, false, None));
        assert!(!module_is_effective(true, false, Some(false)));
        assert!(module_is_effective(true, false, Some(true)));
    }

    #[test]
    fn system_switch_overrides_everything() {
        assert!(!module_is_effective(false, true, Some(true)));
        assert!(!module_is_effective(false, false, Some(true)));
    }
}
