// src/db/report_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::reports::{AccountTotals, PostedLine},
};

#[derive(Clone, Default)]
pub struct ReportRepository;

impl ReportRepository {
    pub fn new() -> Self {
        Self
    }

    /// Débitos e créditos efetivados por conta no exercício.
    /// Contas sem movimento ficam de fora.
    pub async fn account_totals<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        fiscal_year_id: Uuid,
    ) -> Result<Vec<AccountTotals>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, AccountTotals>(
            r#"
            SELECT
                a.id AS account_id, a.code, a.name, a.account_type,
                COALESCE(SUM(l.debit), 0) AS total_debit,
                COALESCE(SUM(l.credit), 0) AS total_credit
            FROM journal_entry_lines l
            JOIN journal_entries e ON e.id = l.journal_entry_id
            JOIN accounts a ON a.id = l.account_id
            WHERE e.tenant_id = $1
              AND e.fiscal_year_id = $2
              AND e.is_posted = TRUE
            GROUP BY a.id, a.code, a.name, a.account_type
            ORDER BY a.code
            "#,
        )
            .bind(tenant_id)
            .bind(fiscal_year_id)
            .fetch_all(executor)
            .await?;
        Ok(rows)
    }

    /// Partidas efetivadas da conta, em ordem cronológica.
    pub async fn posted_lines_for_account<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        account_id: Uuid,
        fiscal_year_id: Uuid,
    ) -> Result<Vec<PostedLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, PostedLine>(
            r#"
            SELECT
                e.id AS journal_entry_id, e.entry_number, e.entry_date, e.description,
                l.description AS line_description, l.debit, l.credit
            FROM journal_entry_lines l
            JOIN journal_entries e ON e.id = l.journal_entry_id
            WHERE e.tenant_id = $1
              AND l.account_id = $2
              AND e.fiscal_year_id = $3
              AND e.is_posted = TRUE
            ORDER BY e.entry_date, e.entry_number, l.line_order
            "#,
        )
            .bind(tenant_id)
            .bind(account_id)
            .bind(fiscal_year_id)
            .fetch_all(executor)
            .await?;
        Ok(rows)
    }
}
