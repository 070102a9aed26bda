// src/services/tenancy_service.rs

use chrono::Utc;
use sqlx::{Executor, PgPool, Postgres};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppConfig,
    db::{ModuleRepository, TenantRepository, UserRepository},
    models::{
        auth::{User, UserRole},
        tenancy::{
            AssignUserPayload, Branch, CreateBranchPayload, CreateTenantPayload, Tenant, TenantPlan,
            UpdateBranchPayload, UpdateTenantPayload,
        },
    },
    services::auth::normalize_email,
};

pub const MAIN_BRANCH_CODE: &str = "MAIN";
const MAIN_BRANCH_NAME: &str = "Matriz";

#[derive(Clone)]
pub struct TenantService {
    tenant_repo: TenantRepository,
    user_repo: UserRepository,
    module_repo: ModuleRepository,
    config: Arc<AppConfig>,
    pool: PgPool, // Usamos a pool para iniciar transações
}

impl TenantService {
    pub fn new(
        tenant_repo: TenantRepository,
        user_repo: UserRepository,
        module_repo: ModuleRepository,
        config: Arc<AppConfig>,
        pool: PgPool,
    ) -> Self {
        Self { tenant_repo, user_repo, module_repo, config, pool }
    }

    /// LÓGICA DE NEGÓCIO: cria o tenant e, atomicamente, a filial MAIN,
    /// os módulos liberados e promove o criador a TENANT_ADMIN.
    pub async fn create_tenant(&self, creator: &User, payload: &CreateTenantPayload) -> Result<Tenant, AppError> {
        let is_super_admin = creator.role.is_super_admin();
        if creator.tenant_id.is_some() && !is_super_admin {
            return Err(AppError::UserAlreadyInTenant);
        }

        let plan = payload.plan.unwrap_or(TenantPlan::Trial);
        let trial_ends_at = (plan == TenantPlan::Trial)
            .then(|| Utc::now() + chrono::Duration::days(self.config.trial_days));
        let slug = payload.slug.trim().to_lowercase();

        // 1. Inicia a transação
        let mut tx = self.pool.begin().await?;

        // 2. Cria o Tenant
        let tenant = self
            .tenant_repo
            .create_tenant(&mut *tx, payload.name.trim(), &slug, plan, trial_ends_at)
            .await?;

        // 3. Filial padrão
        let main_branch = self
            .tenant_repo
            .create_branch(&mut *tx, tenant.id, MAIN_BRANCH_NAME, MAIN_BRANCH_CODE, None)
            .await?;

        // 4. Liga os módulos habilitados no sistema
        let modules = self.module_repo.enable_system_modules(&mut *tx, tenant.id).await?;

        // 5. O criador vira administrador (o SUPER_ADMIN continua global)
        if !is_super_admin {
            self.user_repo
                .assign_to_tenant(&mut *tx, creator.id, tenant.id, UserRole::TenantAdmin, Some(main_branch.id))
                .await?;
        }

        // 6. Commit
        tx.commit().await?;

        tracing::info!(tenant_id = %tenant.id, %slug, modules, created_by = %creator.id, "Tenant criado");
        Ok(tenant)
    }

    pub async fn get_tenant(&self, tenant_id: Uuid) -> Result<Tenant, AppError> {
        self.tenant_repo
            .find_by_id(tenant_id)
            .await?
            .ok_or(AppError::NotFound("tenant"))
    }

    /// Nome pode ser trocado pelo admin do tenant; plano e ativação só pelo SUPER_ADMIN.
    pub async fn update_tenant(
        &self,
        actor: &User,
        tenant_id: Uuid,
        payload: &UpdateTenantPayload,
    ) -> Result<Tenant, AppError> {
        if (payload.plan.is_some() || payload.is_active.is_some()) && !actor.role.is_super_admin() {
            return Err(AppError::Forbidden);
        }

        let tenant = self
            .tenant_repo
            .update_tenant(
                &self.pool,
                tenant_id,
                payload.name.as_deref().map(str::trim),
                payload.plan,
                payload.is_active,
            )
            .await?;

        tracing::info!(tenant_id = %tenant.id, plan = ?tenant.plan, is_active = tenant.is_active, "Tenant atualizado");
        Ok(tenant)
    }

    // --- Filiais ---

    pub async fn create_branch(&self, tenant_id: Uuid, payload: &CreateBranchPayload) -> Result<Branch, AppError> {
        self.tenant_repo
            .create_branch(
                &self.pool,
                tenant_id,
                payload.name.trim(),
                &payload.code.trim().to_uppercase(),
                payload.address.as_deref(),
            )
            .await
    }

    pub async fn list_branches(&self, tenant_id: Uuid) -> Result<Vec<Branch>, AppError> {
        self.tenant_repo.list_branches(&self.pool, tenant_id).await
    }

    pub async fn update_branch(
        &self,
        tenant_id: Uuid,
        branch_id: Uuid,
        payload: &UpdateBranchPayload,
    ) -> Result<Branch, AppError> {
        self.tenant_repo
            .update_branch(
                &self.pool,
                tenant_id,
                branch_id,
                payload.name.as_deref().map(str::trim),
                payload.address.as_deref(),
                payload.is_active,
            )
            .await
    }

    pub async fn deactivate_branch(&self, tenant_id: Uuid, branch_id: Uuid) -> Result<Branch, AppError> {
        let branch = self
            .tenant_repo
            .update_branch(&self.pool, tenant_id, branch_id, None, None, Some(false))
            .await?;
        tracing::info!(%tenant_id, branch_id = %branch.id, "Filial desativada");
        Ok(branch)
    }

    /// A filial precisa existir no tenant e estar ativa.
    pub async fn ensure_branch<'e, E>(&self, executor: E, tenant_id: Uuid, branch_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        match self.tenant_repo.find_branch(executor, tenant_id, branch_id).await? {
            Some(branch) if branch.is_active => Ok(()),
            _ => Err(AppError::BranchNotInTenant),
        }
    }

    // --- Usuários do tenant ---

    pub async fn list_tenant_users(&self, tenant_id: Uuid) -> Result<Vec<User>, AppError> {
        self.user_repo.list_by_tenant(&self.pool, tenant_id).await
    }

    /// Vincula um usuário já registrado ao tenant, com papel e filial.
    pub async fn assign_user(&self, tenant_id: Uuid, payload: &AssignUserPayload) -> Result<User, AppError> {
        if payload.role.is_super_admin() {
            return Err(AppError::Forbidden);
        }

        let user = self
            .user_repo
            .find_by_email(&normalize_email(&payload.email))
            .await?
            .ok_or(AppError::UserNotFound)?;

        if user.role.is_super_admin() {
            return Err(AppError::Forbidden);
        }
        if user.tenant_id.is_some_and(|current| current != tenant_id) {
            return Err(AppError::UserAlreadyInTenant);
        }

        let mut tx = self.pool.begin().await?;
        if let Some(branch_id) = payload.branch_id {
            self.ensure_branch(&mut *tx, tenant_id, branch_id).await?;
        }
        let user = self
            .user_repo
            .assign_to_tenant(&mut *tx, user.id, tenant_id, payload.role, payload.branch_id)
            .await?;
        tx.commit().await?;

        tracing::info!(%tenant_id, user_id = %user.id, role = ?user.role, "Usuário vinculado ao tenant");
        Ok(user)
    }
}
