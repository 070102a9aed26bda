// src/db/account_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_violation, AppError},
    models::accounts::{Account, AccountType},
};

const ACCOUNT_COLUMNS: &str = "id, tenant_id, parent_id, code, name, account_type, is_active, created_at, updated_at";

/// Trava de linha aplicada ao SELECT de contas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowLock {
    None,
    Share,
    Update,
}

fn select_accounts_sql(filter: &str, lock: RowLock) -> String {
    let suffix = match lock {
        RowLock::None => "",
        RowLock::Share => " ORDER BY id FOR SHARE",
        RowLock::Update => " FOR UPDATE",
    };
    format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE tenant_id = $1 AND {filter}{suffix}")
}

#[derive(Clone, Default)]
pub struct AccountRepository;

impl AccountRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        parent_id: Option<Uuid>,
        code: &str,
        name: &str,
        account_type: AccountType,
    ) -> Result<Account, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO accounts (tenant_id, parent_id, code, name, account_type)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(tenant_id)
            .bind(parent_id)
            .bind(code)
            .bind(name)
            .bind(account_type)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                map_unique_violation(e, |constraint| match constraint {
                    "accounts_tenant_code_key" => Some(AppError::UniqueConstraintViolation(format!("account {code}"))),
                    _ => None,
                })
            })
    }

    pub async fn list<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<Account>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE tenant_id = $1 ORDER BY code ASC");
        let accounts = sqlx::query_as::<_, Account>(&sql)
            .bind(tenant_id)
            .fetch_all(executor)
            .await?;
        Ok(accounts)
    }

    async fn find_locked<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        lock: RowLock,
    ) -> Result<Option<Account>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = select_accounts_sql("id = $2", lock);
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(account)
    }

    async fn find_many_locked<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        ids: &[Uuid],
        lock: RowLock,
    ) -> Result<Vec<Account>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = select_accounts_sql("id = ANY($2)", lock);
        let accounts = sqlx::query_as::<_, Account>(&sql)
            .bind(tenant_id)
            .bind(ids)
            .fetch_all(executor)
            .await?;
        Ok(accounts)
    }

    pub async fn find<'e, E>(&self, executor: E, tenant_id: Uuid, id: Uuid) -> Result<Option<Account>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.find_locked(executor, tenant_id, id, RowLock::None).await
    }

    /// Com `FOR UPDATE`: serializa quem muda a conta (novas filhas, desativação)
    /// com quem grava partidas nela.
    pub async fn find_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Account>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.find_locked(executor, tenant_id, id, RowLock::Update).await
    }

    /// Busca várias contas do tenant de uma vez (ids de fora do tenant são ignorados).
    pub async fn find_many<'e, E>(&self, executor: E, tenant_id: Uuid, ids: &[Uuid]) -> Result<Vec<Account>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.find_many_locked(executor, tenant_id, ids, RowLock::None).await
    }

    /// Como `find_many`, mas com `FOR SHARE` até o fim da transação: a conta não
    /// é desativada nem ganha filhas enquanto as partidas são gravadas.
    pub async fn find_many_for_share<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Account>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.find_many_locked(executor, tenant_id, ids, RowLock::Share).await
    }

    /// Dentre `ids`, quais têm subcontas (contas sintéticas).
    pub async fn ids_with_children<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let parents: Vec<Uuid> = sqlx::query_scalar(
            "SELECT DISTINCT parent_id FROM accounts WHERE parent_id = ANY($1)",
        )
            .bind(ids)
            .fetch_all(executor)
            .await?;
        Ok(parents)
    }

    pub async fn has_children<'e, E>(&self, executor: E, id: Uuid, only_active: bool) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM accounts WHERE parent_id = $1 AND (is_active OR NOT $2))",
        )
            .bind(id)
            .bind(only_active)
            .fetch_one(executor)
            .await?;
        Ok(exists)
    }

    pub async fn has_lines<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM journal_entry_lines WHERE account_id = $1)",
        )
            .bind(id)
            .fetch_one(executor)
            .await?;
        Ok(exists)
    }

    /// `account_id` aparece na cadeia de ancestrais de `candidate_parent` (incluindo ele)?
    /// Se sim, pendurar a conta ali fecharia um ciclo. `UNION` descarta linhas
    /// repetidas, então a recursão termina mesmo sobre um ciclo já existente.
    pub async fn is_in_ancestry<'e, E>(
        &self,
        executor: E,
        candidate_parent: Uuid,
        account_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let found: bool = sqlx::query_scalar(
            r#"
            WITH RECURSIVE ancestry AS (
                SELECT id, parent_id FROM accounts WHERE id = $1
                UNION
                SELECT a.id, a.parent_id
                FROM accounts a
                JOIN ancestry ON a.id = ancestry.parent_id
            )
            SELECT EXISTS (SELECT 1 FROM ancestry WHERE id = $2)
            "#,
        )
            .bind(candidate_parent)
            .bind(account_id)
            .fetch_one(executor)
            .await?;
        Ok(found)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        name: &str,
        parent_id: Option<Uuid>,
        is_active: bool,
    ) -> Result<Account, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE accounts
            SET name = $3, parent_id = $4, is_active = $5, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(tenant_id)
            .bind(id)
            .bind(name)
            .bind(parent_id)
            .bind(is_active)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("account"))
    }

    pub async fn delete<'e, E>(&self, executor: E, tenant_id: Uuid, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM accounts WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .execute(executor)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("account"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_select_has_no_lock() {
        let sql = select_accounts_sql("id = $2", RowLock::None);
        assert!(sql.ends_with("WHERE tenant_id = $1 AND id = $2"));
        assert!(!sql.contains("FOR "));
    }

    #[test]
    fn shared_lock_is_taken_in_id_order() {
        let sql = select_accounts_sql("id = ANY($2)", RowLock::Share);
        assert!(sql.ends_with("id = ANY($2) ORDER BY id FOR SHARE"));
    }

    #[test]
    fn single_row_update_lock() {
        assert!(select_accounts_sql("id = $2", RowLock::Update).ends_with("id = $2 FOR UPDATE"));
    }
}
