// src/services/fiscal_service.rs

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{db_utils::begin_tenant_tx, error::AppError, ledger::is_valid_period},
    db::FiscalYearRepository,
    models::fiscal::{CreateFiscalYearPayload, FiscalYear, UpdateFiscalYearPayload},
};

/// As datas já lançadas no exercício precisam caber no novo período.
fn range_keeps_entries(
    start: NaiveDate,
    end: NaiveDate,
    (first, last): (Option<NaiveDate>, Option<NaiveDate>),
) -> bool {
    first.is_none_or(|d| d >= start) && last.is_none_or(|d| d <= end)
}

#[derive(Clone)]
pub struct FiscalYearService {
    fiscal_repo: FiscalYearRepository,
    pool: PgPool,
}

impl FiscalYearService {
    pub fn new(fiscal_repo: FiscalYearRepository, pool: PgPool) -> Self {
        Self { fiscal_repo, pool }
    }

    pub async fn create_fiscal_year(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        payload: &CreateFiscalYearPayload,
    ) -> Result<FiscalYear, AppError> {
        if !is_valid_period(payload.start_date, payload.end_date) {
            return Err(AppError::InvalidDateRange);
        }

        let mut tx = begin_tenant_tx(&self.pool, tenant_id, user_id).await?;
        self.fiscal_repo.lock_periods(&mut *tx, tenant_id).await?;

        if self
            .fiscal_repo
            .overlaps(&mut *tx, tenant_id, payload.start_date, payload.end_date, None)
            .await?
        {
            return Err(AppError::FiscalYearOverlap);
        }

        let year = self
            .fiscal_repo
            .create(&mut *tx, tenant_id, payload.name.trim(), payload.start_date, payload.end_date)
            .await?;
        tx.commit().await?;

        tracing::info!(%tenant_id, fiscal_year_id = %year.id, start = %year.start_date, end = %year.end_date, "Exercício criado");
        Ok(year)
    }

    pub async fn list_fiscal_years(&self, tenant_id: Uuid, user_id: Uuid) -> Result<Vec<FiscalYear>, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant_id, user_id).await?;
        let years = self.fiscal_repo.list(&mut *tx, tenant_id).await?;
        tx.commit().await?;
        Ok(years)
    }

    pub async fn get_fiscal_year(&self, tenant_id: Uuid, user_id: Uuid, id: Uuid) -> Result<FiscalYear, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant_id, user_id).await?;
        let year = self
            .fiscal_repo
            .find(&mut *tx, tenant_id, id)
            .await?
            .ok_or(AppError::NotFound("fiscal_year"))?;
        tx.commit().await?;
        Ok(year)
    }

    pub async fn find_for_date(&self, tenant_id: Uuid, user_id: Uuid, date: NaiveDate) -> Result<FiscalYear, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant_id, user_id).await?;
        let year = self
            .fiscal_repo
            .find_for_date(&mut *tx, tenant_id, date)
            .await?
            .ok_or(AppError::NoFiscalYearForDate(date))?;
        tx.commit().await?;
        Ok(year)
    }

    pub async fn update_fiscal_year(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        id: Uuid,
        payload: &UpdateFiscalYearPayload,
    ) -> Result<FiscalYear, AppError> {
        if !is_valid_period(payload.start_date, payload.end_date) {
            return Err(AppError::InvalidDateRange);
        }

        let mut tx = begin_tenant_tx(&self.pool, tenant_id, user_id).await?;
        self.fiscal_repo.lock_periods(&mut *tx, tenant_id).await?;

        let current = self
            .fiscal_repo
            .find_for_update(&mut *tx, tenant_id, id)
            .await?
            .ok_or(AppError::NotFound("fiscal_year"))?;
        if current.is_locked {
            return Err(AppError::FiscalYearLocked);
        }

        if self
            .fiscal_repo
            .overlaps(&mut *tx, tenant_id, payload.start_date, payload.end_date, Some(id))
            .await?
        {
            return Err(AppError::FiscalYearOverlap);
        }

        let bounds = self.fiscal_repo.entry_date_bounds(&mut *tx, id).await?;
        if !range_keeps_entries(payload.start_date, payload.end_date, bounds) {
            return Err(AppError::FiscalYearRangeExcludesEntries);
        }

        let year = self
            .fiscal_repo
            .update(&mut *tx, tenant_id, id, payload.name.trim(), payload.start_date, payload.end_date)
            .await?;
        tx.commit().await?;
        Ok(year)
    }

    /// Trava o exercício. Rascunhos pendentes impedem a trava; travar de novo não é erro.
    pub async fn lock_fiscal_year(&self, tenant_id: Uuid, user_id: Uuid, id: Uuid) -> Result<FiscalYear, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant_id, user_id).await?;

        let current = self
            .fiscal_repo
            .find_for_update(&mut *tx, tenant_id, id)
            .await?
            .ok_or(AppError::NotFound("fiscal_year"))?;
        if current.is_locked {
            return Ok(current);
        }

        let drafts = self.fiscal_repo.count_drafts(&mut *tx, id).await?;
        if drafts > 0 {
            tracing::debug!(fiscal_year_id = %id, drafts, "Trava recusada: há rascunhos");
            return Err(AppError::FiscalYearHasDrafts);
        }

        let year = self.fiscal_repo.set_locked(&mut *tx, tenant_id, id, true).await?;
        tx.commit().await?;

        tracing::info!(%tenant_id, fiscal_year_id = %id, locked_by = %user_id, "Exercício travado");
        Ok(year)
    }

    pub async fn unlock_fiscal_year(&self, tenant_id: Uuid, user_id: Uuid, id: Uuid) -> Result<FiscalYear, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant_id, user_id).await?;
        self.fiscal_repo
            .find_for_update(&mut *tx, tenant_id, id)
            .await?
            .ok_or(AppError::NotFound("fiscal_year"))?;
        let year = self.fiscal_repo.set_locked(&mut *tx, tenant_id, id, false).await?;
        tx.commit().await?;

        tracing::info!(%tenant_id, fiscal_year_id = %id, unlocked_by = %user_id, "Exercício destravado");
        Ok(year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn empty_year_accepts_any_range() {
        assert!(range_keeps_entries(d(2025, 3, 1), d(2025, 6, 30), (None, None)));
    }

    #[test]
    fn range_must_cover_first_and_last_entry() {
        let bounds = (Some(d(2025, 2, 10)), Some(d(2025, 11, 5)));
        assert!(range_keeps_entries(d(2025, 1, 1), d(2025, 12, 31), bounds));
        assert!(range_keeps_entries(d(2025, 2, 10), d(2025, 11, 5), bounds));
        assert!(!range_keeps_entries(d(2025, 3, 1), d(2025, 12, 31), bounds));
        assert!(!range_keeps_entries(d(2025, 1, 1), d(2025, 10, 31), bounds));
    }
}
