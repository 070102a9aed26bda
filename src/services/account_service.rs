// src/services/account_service.rs

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_tenant_tx, error::AppError},
    db::AccountRepository,
    models::accounts::{
        build_account_tree, Account, AccountNode, AccountType, CreateAccountPayload, UpdateAccountPayload,
    },
};

/// Regras de uma conta-mãe: ativa e do mesmo tipo da filha.
fn check_parent(parent: &Account, child_type: AccountType) -> Result<(), AppError> {
    if parent.account_type != child_type {
        return Err(AppError::AccountTypeMismatch);
    }
    if !parent.is_active {
        return Err(AppError::AccountInactive);
    }
    Ok(())
}

#[derive(Clone)]
pub struct AccountService {
    account_repo: AccountRepository,
    pool: PgPool,
}

impl AccountService {
    pub fn new(account_repo: AccountRepository, pool: PgPool) -> Self {
        Self { account_repo, pool }
    }

    async fn load_parent(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        parent_id: Uuid,
        child_type: AccountType,
    ) -> Result<Account, AppError> {
        // A trava espera lançamentos em andamento na conta-mãe
        let parent = self
            .account_repo
            .find_for_update(&mut *conn, tenant_id, parent_id)
            .await?
            .ok_or(AppError::NotFound("parent_account"))?;
        check_parent(&parent, child_type)?;

        // Conta com partidas é analítica; não pode virar sintética
        if self.account_repo.has_lines(&mut *conn, parent.id).await? {
            return Err(AppError::AccountInUse);
        }
        Ok(parent)
    }

    pub async fn create_account(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        payload: &CreateAccountPayload,
    ) -> Result<Account, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant_id, user_id).await?;

        if let Some(parent_id) = payload.parent_id {
            self.load_parent(&mut *tx, tenant_id, parent_id, payload.account_type).await?;
        }

        let account = self
            .account_repo
            .create(
                &mut *tx,
                tenant_id,
                payload.parent_id,
                payload.code.trim(),
                payload.name.trim(),
                payload.account_type,
            )
            .await?;
        tx.commit().await?;

        tracing::info!(%tenant_id, account_id = %account.id, code = %account.code, "Conta criada");
        Ok(account)
    }

    pub async fn update_account(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        id: Uuid,
        payload: &UpdateAccountPayload,
    ) -> Result<Account, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant_id, user_id).await?;

        let current = self
            .account_repo
            .find_for_update(&mut *tx, tenant_id, id)
            .await?
            .ok_or(AppError::NotFound("account"))?;

        // `None` = não mexe; `Some(None)` = vira raiz; `Some(Some(p))` = novo pai
        let parent_id = match payload.parent_id {
            None => current.parent_id,
            Some(None) => None,
            Some(Some(parent_id)) => {
                if parent_id == id || self.account_repo.is_in_ancestry(&mut *tx, parent_id, id).await? {
                    return Err(AppError::AccountCycle);
                }
                if current.parent_id != Some(parent_id) {
                    self.load_parent(&mut *tx, tenant_id, parent_id, current.account_type).await?;
                }
                Some(parent_id)
            }
        };

        let is_active = payload.is_active.unwrap_or(current.is_active);
        if current.is_active && !is_active && self.account_repo.has_children(&mut *tx, id, true).await? {
            return Err(AppError::AccountHasChildren);
        }
        if !current.is_active && is_active {
            if let Some(parent_id) = parent_id {
                let parent = self
                    .account_repo
                    .find_for_update(&mut *tx, tenant_id, parent_id)
                    .await?
                    .ok_or(AppError::NotFound("parent_account"))?;
                check_parent(&parent, current.account_type)?;
            }
        }

        let name = payload.name.as_deref().map(str::trim).unwrap_or(&current.name);
        let account = self
            .account_repo
            .update(&mut *tx, tenant_id, id, name, parent_id, is_active)
            .await?;
        tx.commit().await?;
        Ok(account)
    }

    /// Só apaga conta sem filhas e sem partidas.
    pub async fn delete_account(&self, tenant_id: Uuid, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant_id, user_id).await?;

        self.account_repo
            .find_for_update(&mut *tx, tenant_id, id)
            .await?
            .ok_or(AppError::NotFound("account"))?;

        if self.account_repo.has_children(&mut *tx, id, false).await? {
            return Err(AppError::AccountHasChildren);
        }
        if self.account_repo.has_lines(&mut *tx, id).await? {
            return Err(AppError::AccountInUse);
        }

        self.account_repo.delete(&mut *tx, tenant_id, id).await?;
        tx.commit().await?;

        tracing::info!(%tenant_id, account_id = %id, "Conta removida");
        Ok(())
    }

    pub async fn get_account(&self, tenant_id: Uuid, user_id: Uuid, id: Uuid) -> Result<Account, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant_id, user_id).await?;
        let account = self
            .account_repo
            .find(&mut *tx, tenant_id, id)
            .await?
            .ok_or(AppError::NotFound("account"))?;
        tx.commit().await?;
        Ok(account)
    }

    pub async fn list_accounts(&self, tenant_id: Uuid, user_id: Uuid) -> Result<Vec<Account>, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant_id, user_id).await?;
        let accounts = self.account_repo.list(&mut *tx, tenant_id).await?;
        tx.commit().await?;
        Ok(accounts)
    }

    pub async fn account_tree(&self, tenant_id: Uuid, user_id: Uuid) -> Result<Vec<AccountNode>, AppError> {
        let accounts = self.list_accounts(tenant_id, user_id).await?;
        Ok(build_account_tree(accounts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn account(account_type: AccountType, is_active: bool) -> Account {
        Account {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            parent_id: None,
            code: "1".into(),
            name: "Ativo".into(),
            account_type,
            is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn parent_must_share_type() {
        let parent = account(AccountType::Asset, true);
        assert!(check_parent(&parent, AccountType::Asset).is_ok());
        assert!(matches!(check_parent(&parent, AccountType::Expense), Err(AppError::AccountTypeMismatch)));
    }

    #[test]
    fn parent_must_be_active() {
        let parent = account(AccountType::Liability, false);
        assert!(matches!(check_parent(&parent, AccountType::Liability), Err(AppError::AccountInactive)));
    }
}
