// src/db/fiscal_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_violation, AppError},
    models::fiscal::FiscalYear,
};

const FISCAL_COLUMNS: &str = "id, tenant_id, name, start_date, end_date, is_locked, locked_at, created_at, updated_at";

/// Sem pool própria: todas as tabelas contábeis estão sob RLS, então as
/// consultas só rodam dentro de uma transação aberta por `begin_tenant_tx`.
#[derive(Clone, Default)]
pub struct FiscalYearRepository;

fn map_name_conflict(e: sqlx::Error, name: &str) -> AppError {
    map_unique_violation(e, |constraint| match constraint {
        "fiscal_years_tenant_name_key" => Some(AppError::UniqueConstraintViolation(format!("fiscal year {name}"))),
        _ => None,
    })
}

impl FiscalYearRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<FiscalYear, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO fiscal_years (tenant_id, name, start_date, end_date)
            VALUES ($1, $2, $3, $4)
            RETURNING {FISCAL_COLUMNS}
            "#
        );
        sqlx::query_as::<_, FiscalYear>(&sql)
            .bind(tenant_id)
            .bind(name)
            .bind(start_date)
            .bind(end_date)
            .fetch_one(executor)
            .await
            .map_err(|e| map_name_conflict(e, name))
    }

    pub async fn list<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<Vec<FiscalYear>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {FISCAL_COLUMNS} FROM fiscal_years WHERE tenant_id = $1 ORDER BY start_date DESC");
        let years = sqlx::query_as::<_, FiscalYear>(&sql)
            .bind(tenant_id)
            .fetch_all(executor)
            .await?;
        Ok(years)
    }

    pub async fn find<'e, E>(&self, executor: E, tenant_id: Uuid, id: Uuid) -> Result<Option<FiscalYear>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {FISCAL_COLUMNS} FROM fiscal_years WHERE tenant_id = $1 AND id = $2");
        let year = sqlx::query_as::<_, FiscalYear>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(year)
    }

    /// Mesma busca, com `FOR SHARE`: impede que o exercício seja travado
    /// enquanto um lançamento está sendo gravado/efetivado.
    pub async fn find_for_share<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<FiscalYear>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {FISCAL_COLUMNS} FROM fiscal_years WHERE tenant_id = $1 AND id = $2 FOR SHARE");
        let year = sqlx::query_as::<_, FiscalYear>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(year)
    }

    pub async fn find_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<FiscalYear>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {FISCAL_COLUMNS} FROM fiscal_years WHERE tenant_id = $1 AND id = $2 FOR UPDATE");
        let year = sqlx::query_as::<_, FiscalYear>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(year)
    }

    pub async fn find_for_date<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<FiscalYear>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {FISCAL_COLUMNS} FROM fiscal_years WHERE tenant_id = $1 AND $2 BETWEEN start_date AND end_date"
        );
        let year = sqlx::query_as::<_, FiscalYear>(&sql)
            .bind(tenant_id)
            .bind(date)
            .fetch_optional(executor)
            .await?;
        Ok(year)
    }

    /// Serializa criação/alteração de períodos do tenant até o fim da transação,
    /// para que a checagem de sobreposição não corra contra outra gravação.
    pub async fn lock_periods<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended('fiscal_years:' || $1::text, 0))")
            .bind(tenant_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Existe outro exercício do tenant cujo período cruza [start, end]?
    pub async fn overlaps<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        exclude_id: Option<Uuid>,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM fiscal_years
                WHERE tenant_id = $1
                  AND start_date <= $3
                  AND $2 <= end_date
                  AND ($4::uuid IS NULL OR id <> $4)
            )
            "#,
        )
            .bind(tenant_id)
            .bind(start_date)
            .bind(end_date)
            .bind(exclude_id)
            .fetch_one(executor)
            .await?;
        Ok(exists)
    }

    pub async fn count_drafts<'e, E>(&self, executor: E, fiscal_year_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM journal_entries WHERE fiscal_year_id = $1 AND is_posted = FALSE",
        )
            .bind(fiscal_year_id)
            .fetch_one(executor)
            .await?;
        Ok(count)
    }

    /// Menor e maior data de lançamento no exercício.
    pub async fn entry_date_bounds<'e, E>(
        &self,
        executor: E,
        fiscal_year_id: Uuid,
    ) -> Result<(Option<NaiveDate>, Option<NaiveDate>), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let bounds: (Option<NaiveDate>, Option<NaiveDate>) = sqlx::query_as(
            "SELECT MIN(entry_date), MAX(entry_date) FROM journal_entries WHERE fiscal_year_id = $1",
        )
            .bind(fiscal_year_id)
            .fetch_one(executor)
            .await?;
        Ok(bounds)
    }

    pub async fn set_locked<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        locked: bool,
    ) -> Result<FiscalYear, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE fiscal_years
            SET is_locked = $3,
                locked_at = CASE WHEN $3 THEN NOW() ELSE NULL END,
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING {FISCAL_COLUMNS}
            "#
        );
        sqlx::query_as::<_, FiscalYear>(&sql)
            .bind(tenant_id)
            .bind(id)
            .bind(locked)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("fiscal_year"))
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<FiscalYear, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE fiscal_years
            SET name = $3, start_date = $4, end_date = $5, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            RETURNING {FISCAL_COLUMNS}
            "#
        );
        sqlx::query_as::<_, FiscalYear>(&sql)
            .bind(tenant_id)
            .bind(id)
            .bind(name)
            .bind(start_date)
            .bind(end_date)
            .fetch_optional(executor)
            .await
            .map_err(|e| map_name_conflict(e, name))?
            .ok_or(AppError::NotFound("fiscal_year"))
    }
}
