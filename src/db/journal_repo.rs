// src/db/journal_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_violation, AppError},
    models::journal::{JournalEntry, JournalEntryFilter, JournalEntryLine, JournalLineInput},
};

const ENTRY_COLUMNS: &str = r#"
    id, tenant_id, fiscal_year_id, branch_id, entry_number, entry_date, description, reference,
    is_posted, posted_at, posted_by, reversal_of, created_by, created_at, updated_at
"#;
const LINE_COLUMNS: &str = "id, journal_entry_id, account_id, description, debit, credit, line_order, created_at";

/// Cabeçalho de um lançamento a ser inserido
#[derive(Debug, Clone)]
pub struct NewJournalEntry<'a> {
    pub tenant_id: Uuid,
    pub fiscal_year_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub entry_number: i64,
    pub entry_date: NaiveDate,
    pub description: &'a str,
    pub reference: Option<&'a str>,
    pub reversal_of: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

#[derive(Clone, Default)]
pub struct JournalRepository;

impl JournalRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  NUMERAÇÃO
    // =========================================================================

    /// Serializa a numeração por tenant até o fim da transação corrente.
    pub async fn lock_numbering<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
            .bind(tenant_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Próximo número sequencial. Chamar somente depois de `lock_numbering`.
    pub async fn next_entry_number<'e, E>(&self, executor: E, tenant_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let next: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(entry_number), 0) + 1 FROM journal_entries WHERE tenant_id = $1",
        )
            .bind(tenant_id)
            .fetch_one(executor)
            .await?;
        Ok(next)
    }

    // =========================================================================
    //  LANÇAMENTOS
    // =========================================================================

    pub async fn insert_entry<'e, E>(&self, executor: E, entry: &NewJournalEntry<'_>) -> Result<JournalEntry, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO journal_entries (
                tenant_id, fiscal_year_id, branch_id, entry_number, entry_date,
                description, reference, reversal_of, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ENTRY_COLUMNS}
            "#
        );
        sqlx::query_as::<_, JournalEntry>(&sql)
            .bind(entry.tenant_id)
            .bind(entry.fiscal_year_id)
            .bind(entry.branch_id)
            .bind(entry.entry_number)
            .bind(entry.entry_date)
            .bind(entry.description)
            .bind(entry.reference)
            .bind(entry.reversal_of)
            .bind(entry.created_by)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                map_unique_violation(e, |constraint| match constraint {
                    "journal_entries_reversal_of_key" => Some(AppError::EntryAlreadyReversed),
                    _ => None,
                })
            })
    }

    pub async fn find_entry<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<JournalEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM journal_entries WHERE tenant_id = $1 AND id = $2");
        let entry = sqlx::query_as::<_, JournalEntry>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(entry)
    }

    pub async fn find_entry_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<JournalEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM journal_entries WHERE tenant_id = $1 AND id = $2 FOR UPDATE");
        let entry = sqlx::query_as::<_, JournalEntry>(&sql)
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(entry)
    }

    pub async fn list_entries<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        filter: &JournalEntryFilter,
    ) -> Result<Vec<JournalEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            SELECT {ENTRY_COLUMNS} FROM journal_entries
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR fiscal_year_id = $2)
              AND ($3::bool IS NULL OR is_posted = $3)
              AND ($4::date IS NULL OR entry_date >= $4)
              AND ($5::date IS NULL OR entry_date <= $5)
            ORDER BY entry_date DESC, entry_number DESC
            LIMIT $6 OFFSET $7
            "#
        );
        let entries = sqlx::query_as::<_, JournalEntry>(&sql)
            .bind(tenant_id)
            .bind(filter.fiscal_year_id)
            .bind(filter.is_posted)
            .bind(filter.date_from)
            .bind(filter.date_to)
            .bind(filter.limit())
            .bind(filter.offset())
            .fetch_all(executor)
            .await?;
        Ok(entries)
    }

    pub async fn update_header<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        branch_id: Option<Uuid>,
        entry_date: NaiveDate,
        description: &str,
        reference: Option<&str>,
    ) -> Result<JournalEntry, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE journal_entries
            SET branch_id = $3, entry_date = $4, description = $5, reference = $6, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2 AND is_posted = FALSE
            RETURNING {ENTRY_COLUMNS}
            "#
        );
        sqlx::query_as::<_, JournalEntry>(&sql)
            .bind(tenant_id)
            .bind(id)
            .bind(branch_id)
            .bind(entry_date)
            .bind(description)
            .bind(reference)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::EntryAlreadyPosted)
    }

    /// Só apaga rascunhos; as partidas vão junto (ON DELETE CASCADE).
    pub async fn delete_draft<'e, E>(&self, executor: E, tenant_id: Uuid, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM journal_entries WHERE tenant_id = $1 AND id = $2 AND is_posted = FALSE")
            .bind(tenant_id)
            .bind(id)
            .execute(executor)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::EntryAlreadyPosted);
        }
        Ok(())
    }

    pub async fn mark_posted<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
        posted_by: Uuid,
    ) -> Result<JournalEntry, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE journal_entries
            SET is_posted = TRUE, posted_at = NOW(), posted_by = $3, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2 AND is_posted = FALSE
            RETURNING {ENTRY_COLUMNS}
            "#
        );
        sqlx::query_as::<_, JournalEntry>(&sql)
            .bind(tenant_id)
            .bind(id)
            .bind(posted_by)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::EntryAlreadyPosted)
    }

    pub async fn find_reversal_of<'e, E>(&self, executor: E, original_id: Uuid) -> Result<Option<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM journal_entries WHERE reversal_of = $1")
            .bind(original_id)
            .fetch_optional(executor)
            .await?;
        Ok(id)
    }

    // =========================================================================
    //  PARTIDAS
    // =========================================================================

    /// Inserção em massa usando UNNEST. A ordem das partidas é preservada em `line_order`.
    pub async fn insert_lines<'e, E>(
        &self,
        executor: E,
        journal_entry_id: Uuid,
        lines: &[JournalLineInput],
    ) -> Result<Vec<JournalEntryLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let account_ids: Vec<Uuid> = lines.iter().map(|l| l.account_id).collect();
        let descriptions: Vec<Option<String>> = lines.iter().map(|l| l.description.clone()).collect();
        let debits: Vec<Decimal> = lines.iter().map(|l| l.debit).collect();
        let credits: Vec<Decimal> = lines.iter().map(|l| l.credit).collect();
        let orders: Vec<i32> = (0..lines.len() as i32).collect();

        let sql = format!(
            r#"
            INSERT INTO journal_entry_lines (journal_entry_id, account_id, description, debit, credit, line_order)
            SELECT $1, l.account_id, l.description, l.debit, l.credit, l.line_order
            FROM UNNEST($2::uuid[], $3::text[], $4::numeric[], $5::numeric[], $6::int4[])
                AS l(account_id, description, debit, credit, line_order)
            RETURNING {LINE_COLUMNS}
            "#
        );
        let mut inserted = sqlx::query_as::<_, JournalEntryLine>(&sql)
            .bind(journal_entry_id)
            .bind(account_ids)
            .bind(descriptions)
            .bind(debits)
            .bind(credits)
            .bind(orders)
            .fetch_all(executor)
            .await?;

        inserted.sort_by_key(|l| l.line_order);
        Ok(inserted)
    }

    pub async fn delete_lines<'e, E>(&self, executor: E, journal_entry_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM journal_entry_lines WHERE journal_entry_id = $1")
            .bind(journal_entry_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn list_lines<'e, E>(&self, executor: E, journal_entry_id: Uuid) -> Result<Vec<JournalEntryLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {LINE_COLUMNS} FROM journal_entry_lines WHERE journal_entry_id = $1 ORDER BY line_order");
        let lines = sqlx::query_as::<_, JournalEntryLine>(&sql)
            .bind(journal_entry_id)
            .fetch_all(executor)
            .await?;
        Ok(lines)
    }
}
