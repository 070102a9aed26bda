// src/services/journal_service.rs

use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::begin_tenant_tx,
        error::AppError,
        ledger::{ensure_balanced, reversed_lines, totals, validate_lines},
    },
    db::{journal_repo::NewJournalEntry, AccountRepository, FiscalYearRepository, JournalRepository},
    models::{
        accounts::Account,
        fiscal::FiscalYear,
        journal::{
            CreateJournalEntryPayload, JournalEntry, JournalEntryDetail, JournalEntryFilter, JournalEntryLine,
            JournalLineInput, ReverseJournalEntryPayload, UpdateJournalEntryPayload,
        },
    },
    services::tenancy_service::TenantService,
};

pub fn build_detail(entry: JournalEntry, lines: Vec<JournalEntryLine>) -> JournalEntryDetail {
    let totals = totals(&lines);
    JournalEntryDetail {
        entry,
        lines,
        total_debit: totals.debit,
        total_credit: totals.credit,
        is_balanced: totals.is_balanced(),
    }
}

/// O exercício aceita lançamentos nesta data?
fn ensure_open_for(year: &FiscalYear, date: NaiveDate) -> Result<(), AppError> {
    if year.is_locked {
        return Err(AppError::FiscalYearLocked);
    }
    if !year.contains(date) {
        return Err(AppError::DateOutsideFiscalYear);
    }
    Ok(())
}

fn reversal_description(original: &JournalEntry) -> String {
    format!("Estorno do lançamento #{}: {}", original.entry_number, original.description)
}

#[derive(Clone)]
pub struct JournalService {
    journal_repo: JournalRepository,
    fiscal_repo: FiscalYearRepository,
    account_repo: AccountRepository,
    tenant_service: TenantService,
    pool: PgPool,
}

impl JournalService {
    pub fn new(
        journal_repo: JournalRepository,
        fiscal_repo: FiscalYearRepository,
        account_repo: AccountRepository,
        tenant_service: TenantService,
        pool: PgPool,
    ) -> Self {
        Self { journal_repo, fiscal_repo, account_repo, tenant_service, pool }
    }

    // ---
    // Validações compartilhadas (rodam dentro da transação do tenant)
    // ---

    /// Todas as contas precisam ser do tenant, ativas e analíticas (sem filhas).
    /// As contas ficam com `FOR SHARE` até o commit; criar filha ou desativar
    /// exige `FOR UPDATE` na mesma linha e espera.
    async fn ensure_postable_accounts(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        account_ids: &[Uuid],
    ) -> Result<(), AppError> {
        let wanted: Vec<Uuid> = account_ids.iter().copied().collect::<HashSet<_>>().into_iter().collect();

        let found = self.account_repo.find_many_for_share(&mut *conn, tenant_id, &wanted).await?;
        if found.len() != wanted.len() {
            return Err(AppError::NotFound("account"));
        }
        if found.iter().any(|a| !a.is_active) {
            return Err(AppError::AccountInactive);
        }
        if !self.account_repo.ids_with_children(&mut *conn, &wanted).await?.is_empty() {
            return Err(AppError::AccountNotPostable);
        }
        Ok(())
    }

    /// Exercício pelo id informado ou pela data. Fica com `FOR SHARE` até o fim
    /// da transação, o que impede que seja travado no meio da gravação.
    async fn resolve_fiscal_year(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        fiscal_year_id: Option<Uuid>,
        entry_date: NaiveDate,
    ) -> Result<FiscalYear, AppError> {
        let fiscal_year_id = match fiscal_year_id {
            Some(id) => id,
            None => {
                self.fiscal_repo
                    .find_for_date(&mut *conn, tenant_id, entry_date)
                    .await?
                    .ok_or(AppError::NoFiscalYearForDate(entry_date))?
                    .id
            }
        };

        let year = self
            .fiscal_repo
            .find_for_share(&mut *conn, tenant_id, fiscal_year_id)
            .await?
            .ok_or(AppError::NotFound("fiscal_year"))?;
        ensure_open_for(&year, entry_date)?;
        Ok(year)
    }

    async fn check_lines_and_branch(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        branch_id: Option<Uuid>,
        lines: &[JournalLineInput],
    ) -> Result<(), AppError> {
        if let Some(branch_id) = branch_id {
            self.tenant_service.ensure_branch(&mut *conn, tenant_id, branch_id).await?;
        }
        let account_ids: Vec<Uuid> = lines.iter().map(|l| l.account_id).collect();
        self.ensure_postable_accounts(conn, tenant_id, &account_ids).await
    }

    async fn load_entry_for_update(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<JournalEntry, AppError> {
        self.journal_repo
            .find_entry_for_update(&mut *conn, tenant_id, id)
            .await?
            .ok_or(AppError::NotFound("journal_entry"))
    }

    // ---
    // Operações
    // ---

    /// Grava um rascunho. Rascunho pode estar desbalanceado; o balanço é
    /// exigido só na efetivação.
    pub async fn create_entry(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        payload: &CreateJournalEntryPayload,
    ) -> Result<JournalEntryDetail, AppError> {
        validate_lines(&payload.lines)?;

        let mut tx = begin_tenant_tx(&self.pool, tenant_id, user_id).await?;

        let year = self
            .resolve_fiscal_year(&mut *tx, tenant_id, payload.fiscal_year_id, payload.entry_date)
            .await?;
        self.check_lines_and_branch(&mut *tx, tenant_id, payload.branch_id, &payload.lines)
            .await?;

        self.journal_repo.lock_numbering(&mut *tx, tenant_id).await?;
        let entry_number = self.journal_repo.next_entry_number(&mut *tx, tenant_id).await?;

        let entry = self
            .journal_repo
            .insert_entry(
                &mut *tx,
                &NewJournalEntry {
                    tenant_id,
                    fiscal_year_id: year.id,
                    branch_id: payload.branch_id,
                    entry_number,
                    entry_date: payload.entry_date,
                    description: payload.description.trim(),
                    reference: payload.reference.as_deref(),
                    reversal_of: None,
                    created_by: Some(user_id),
                },
            )
            .await?;
        let lines = self.journal_repo.insert_lines(&mut *tx, entry.id, &payload.lines).await?;

        tx.commit().await?;

        tracing::info!(%tenant_id, entry_id = %entry.id, entry_number, "Lançamento criado (rascunho)");
        Ok(build_detail(entry, lines))
    }

    /// Só rascunhos; as partidas são substituídas por completo.
    pub async fn update_entry(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        id: Uuid,
        payload: &UpdateJournalEntryPayload,
    ) -> Result<JournalEntryDetail, AppError> {
        validate_lines(&payload.lines)?;

        let mut tx = begin_tenant_tx(&self.pool, tenant_id, user_id).await?;

        let current = self.load_entry_for_update(&mut *tx, tenant_id, id).await?;
        if current.is_posted {
            return Err(AppError::EntryAlreadyPosted);
        }

        self.resolve_fiscal_year(&mut *tx, tenant_id, Some(current.fiscal_year_id), payload.entry_date)
            .await?;
        self.check_lines_and_branch(&mut *tx, tenant_id, payload.branch_id, &payload.lines)
            .await?;

        let entry = self
            .journal_repo
            .update_header(
                &mut *tx,
                tenant_id,
                id,
                payload.branch_id,
                payload.entry_date,
                payload.description.trim(),
                payload.reference.as_deref(),
            )
            .await?;
        self.journal_repo.delete_lines(&mut *tx, id).await?;
        let lines = self.journal_repo.insert_lines(&mut *tx, id, &payload.lines).await?;

        tx.commit().await?;
        Ok(build_detail(entry, lines))
    }

    pub async fn delete_entry(&self, tenant_id: Uuid, user_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant_id, user_id).await?;

        let current = self.load_entry_for_update(&mut *tx, tenant_id, id).await?;
        if current.is_posted {
            return Err(AppError::EntryAlreadyPosted);
        }
        let year = self
            .fiscal_repo
            .find_for_share(&mut *tx, tenant_id, current.fiscal_year_id)
            .await?
            .ok_or(AppError::NotFound("fiscal_year"))?;
        if year.is_locked {
            return Err(AppError::FiscalYearLocked);
        }

        self.journal_repo.delete_draft(&mut *tx, tenant_id, id).await?;
        tx.commit().await?;

        tracing::info!(%tenant_id, entry_id = %id, "Rascunho removido");
        Ok(())
    }

    /// Efetiva o lançamento: exige exercício aberto, data no período,
    /// partidas válidas e débitos == créditos > 0.
    pub async fn post_entry(&self, tenant_id: Uuid, user_id: Uuid, id: Uuid) -> Result<JournalEntryDetail, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant_id, user_id).await?;

        let current = self.load_entry_for_update(&mut *tx, tenant_id, id).await?;
        if current.is_posted {
            return Err(AppError::EntryAlreadyPosted);
        }

        let year = self
            .fiscal_repo
            .find_for_update(&mut *tx, tenant_id, current.fiscal_year_id)
            .await?
            .ok_or(AppError::NotFound("fiscal_year"))?;
        ensure_open_for(&year, current.entry_date)?;

        let lines = self.journal_repo.list_lines(&mut *tx, id).await?;
        let totals = ensure_balanced(&lines)?;
        let account_ids: Vec<Uuid> = lines.iter().map(|l| l.account_id).collect();
        self.ensure_postable_accounts(&mut *tx, tenant_id, &account_ids).await?;

        let entry = self.journal_repo.mark_posted(&mut *tx, tenant_id, id, user_id).await?;
        tx.commit().await?;

        tracing::info!(
            %tenant_id,
            entry_id = %entry.id,
            entry_number = entry.entry_number,
            total = %totals.debit,
            posted_by = %user_id,
            "Lançamento efetivado"
        );
        Ok(build_detail(entry, lines))
    }

    /// Cria e já efetiva o estorno (lados trocados). Cada lançamento só
    /// pode ser estornado uma vez.
    pub async fn reverse_entry(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        id: Uuid,
        payload: &ReverseJournalEntryPayload,
    ) -> Result<JournalEntryDetail, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant_id, user_id).await?;

        let original = self.load_entry_for_update(&mut *tx, tenant_id, id).await?;
        if !original.is_posted {
            return Err(AppError::EntryNotPosted);
        }
        if self.journal_repo.find_reversal_of(&mut *tx, original.id).await?.is_some() {
            return Err(AppError::EntryAlreadyReversed);
        }

        let entry_date = payload.entry_date.unwrap_or(original.entry_date);
        let year_id = self
            .fiscal_repo
            .find_for_date(&mut *tx, tenant_id, entry_date)
            .await?
            .ok_or(AppError::NoFiscalYearForDate(entry_date))?
            .id;
        let year = self
            .fiscal_repo
            .find_for_update(&mut *tx, tenant_id, year_id)
            .await?
            .ok_or(AppError::NotFound("fiscal_year"))?;
        ensure_open_for(&year, entry_date)?;

        let original_lines = self.journal_repo.list_lines(&mut *tx, original.id).await?;
        let lines = reversed_lines(&original_lines);
        ensure_balanced(&lines)?;

        self.journal_repo.lock_numbering(&mut *tx, tenant_id).await?;
        let entry_number = self.journal_repo.next_entry_number(&mut *tx, tenant_id).await?;
        let description = reversal_description(&original);

        let reversal = self
            .journal_repo
            .insert_entry(
                &mut *tx,
                &NewJournalEntry {
                    tenant_id,
                    fiscal_year_id: year.id,
                    branch_id: original.branch_id,
                    entry_number,
                    entry_date,
                    description: &description,
                    reference: original.reference.as_deref(),
                    reversal_of: Some(original.id),
                    created_by: Some(user_id),
                },
            )
            .await?;
        let inserted = self.journal_repo.insert_lines(&mut *tx, reversal.id, &lines).await?;
        let reversal = self.journal_repo.mark_posted(&mut *tx, tenant_id, reversal.id, user_id).await?;

        tx.commit().await?;

        tracing::info!(
            %tenant_id,
            original_id = %original.id,
            reversal_id = %reversal.id,
            entry_number,
            "Lançamento estornado"
        );
        Ok(build_detail(reversal, inserted))
    }

    pub async fn get_entry(&self, tenant_id: Uuid, user_id: Uuid, id: Uuid) -> Result<JournalEntryDetail, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant_id, user_id).await?;
        let entry = self
            .journal_repo
            .find_entry(&mut *tx, tenant_id, id)
            .await?
            .ok_or(AppError::NotFound("journal_entry"))?;
        let lines = self.journal_repo.list_lines(&mut *tx, id).await?;
        tx.commit().await?;
        Ok(build_detail(entry, lines))
    }

    /// Lançamento + contas das partidas, para o comprovante em PDF.
    pub async fn get_entry_with_accounts(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<(JournalEntryDetail, HashMap<Uuid, Account>), AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant_id, user_id).await?;
        let entry = self
            .journal_repo
            .find_entry(&mut *tx, tenant_id, id)
            .await?
            .ok_or(AppError::NotFound("journal_entry"))?;
        let lines = self.journal_repo.list_lines(&mut *tx, id).await?;

        let ids: Vec<Uuid> = lines.iter().map(|l| l.account_id).collect();
        let accounts = self
            .account_repo
            .find_many(&mut *tx, tenant_id, &ids)
            .await?
            .into_iter()
            .map(|a| (a.id, a))
            .collect();
        tx.commit().await?;

        Ok((build_detail(entry, lines), accounts))
    }

    pub async fn list_entries(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        filter: &JournalEntryFilter,
    ) -> Result<Vec<JournalEntry>, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant_id, user_id).await?;
        let entries = self.journal_repo.list_entries(&mut *tx, tenant_id, filter).await?;
        tx.commit().await?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn year(is_locked: bool) -> FiscalYear {
        FiscalYear {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "Exercício 2025".into(),
            start_date: d(2025, 1, 1),
            end_date: d(2025, 12, 31),
            is_locked,
            locked_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn entry(number: i64) -> JournalEntry {
        JournalEntry {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            fiscal_year_id: Uuid::new_v4(),
            branch_id: None,
            entry_number: number,
            entry_date: d(2025, 3, 15),
            description: "Aluguel de março".into(),
            reference: None,
            is_posted: true,
            posted_at: None,
            posted_by: None,
            reversal_of: None,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(entry_id: Uuid, debit: rust_decimal::Decimal, credit: rust_decimal::Decimal, order: i32) -> JournalEntryLine {
        JournalEntryLine {
            id: Uuid::new_v4(),
            journal_entry_id: entry_id,
            account_id: Uuid::new_v4(),
            description: None,
            debit,
            credit,
            line_order: order,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn open_year_accepts_dates_inside_closed_interval() {
        let y = year(false);
        assert!(ensure_open_for(&y, d(2025, 1, 1)).is_ok());
        assert!(ensure_open_for(&y, d(2025, 12, 31)).is_ok());
        assert!(matches!(ensure_open_for(&y, d(2026, 1, 1)), Err(AppError::DateOutsideFiscalYear)));
    }

    #[test]
    fn locked_year_refuses_everything() {
        assert!(matches!(ensure_open_for(&year(true), d(2025, 6, 1)), Err(AppError::FiscalYearLocked)));
    }

    #[test]
    fn detail_reports_totals() {
        let e = entry(7);
        let lines = vec![line(e.id, dec!(100.00), dec!(0), 0), line(e.id, dec!(0), dec!(60.00), 1)];
        let detail = build_detail(e, lines);
        assert_eq!(detail.total_debit, dec!(100.00));
        assert_eq!(detail.total_credit, dec!(60.00));
        assert!(!detail.is_balanced);
    }

    #[test]
    fn reversal_mentions_original_number() {
        assert_eq!(reversal_description(&entry(42)), "Estorno do lançamento #42: Aluguel de março");
    }
}
