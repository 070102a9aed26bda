// src/services/report_service.rs

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::begin_tenant_tx,
        error::AppError,
        ledger::{natural_balance, running_balances},
    },
    db::{AccountRepository, FiscalYearRepository, ReportRepository},
    models::{
        accounts::AccountType,
        reports::{AccountLedger, AccountTotals, LedgerLine, PostedLine, TrialBalance, TrialBalanceRow},
    },
};

/// Monta o balancete a partir dos totais por conta.
pub fn build_trial_balance(fiscal_year_id: Uuid, totals: Vec<AccountTotals>) -> TrialBalance {
    let (total_debit, total_credit) = totals
        .iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(d, c), t| (d + t.total_debit, c + t.total_credit));

    let rows = totals
        .into_iter()
        .map(|t| TrialBalanceRow {
            balance: natural_balance(t.account_type, t.total_debit, t.total_credit),
            totals: t,
        })
        .collect();

    TrialBalance {
        fiscal_year_id,
        rows,
        total_debit,
        total_credit,
        is_balanced: total_debit == total_credit,
    }
}

/// Razão da conta com saldo acumulado pelo lado natural.
pub fn build_account_ledger(
    account_id: Uuid,
    fiscal_year_id: Uuid,
    account_type: AccountType,
    posted: Vec<PostedLine>,
) -> AccountLedger {
    let amounts: Vec<(Decimal, Decimal)> = posted.iter().map(|l| (l.debit, l.credit)).collect();
    let balances = running_balances(account_type, &amounts);
    let closing_balance = balances.last().copied().unwrap_or(Decimal::ZERO);

    let lines = posted
        .into_iter()
        .zip(balances)
        .map(|(line, running_balance)| LedgerLine {
            journal_entry_id: line.journal_entry_id,
            entry_number: line.entry_number,
            entry_date: line.entry_date,
            description: line.line_description.unwrap_or(line.description),
            debit: line.debit,
            credit: line.credit,
            running_balance,
        })
        .collect();

    AccountLedger { account_id, fiscal_year_id, account_type, lines, closing_balance }
}

#[derive(Clone)]
pub struct ReportService {
    report_repo: ReportRepository,
    fiscal_repo: FiscalYearRepository,
    account_repo: AccountRepository,
    pool: PgPool,
}

impl ReportService {
    pub fn new(
        report_repo: ReportRepository,
        fiscal_repo: FiscalYearRepository,
        account_repo: AccountRepository,
        pool: PgPool,
    ) -> Self {
        Self { report_repo, fiscal_repo, account_repo, pool }
    }

    pub async fn trial_balance(&self, tenant_id: Uuid, user_id: Uuid, fiscal_year_id: Uuid) -> Result<TrialBalance, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant_id, user_id).await?;

        self.fiscal_repo
            .find(&mut *tx, tenant_id, fiscal_year_id)
            .await?
            .ok_or(AppError::NotFound("fiscal_year"))?;
        let totals = self.report_repo.account_totals(&mut *tx, tenant_id, fiscal_year_id).await?;
        tx.commit().await?;

        let report = build_trial_balance(fiscal_year_id, totals);
        if !report.is_balanced {
            // Só acontece se alguém gravou direto no banco
            tracing::error!(
                %tenant_id,
                %fiscal_year_id,
                debit = %report.total_debit,
                credit = %report.total_credit,
                "Balancete desbalanceado"
            );
        }
        Ok(report)
    }

    pub async fn account_ledger(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        account_id: Uuid,
        fiscal_year_id: Uuid,
    ) -> Result<AccountLedger, AppError> {
        let mut tx = begin_tenant_tx(&self.pool, tenant_id, user_id).await?;

        let account = self
            .account_repo
            .find(&mut *tx, tenant_id, account_id)
            .await?
            .ok_or(AppError::NotFound("account"))?;
        self.fiscal_repo
            .find(&mut *tx, tenant_id, fiscal_year_id)
            .await?
            .ok_or(AppError::NotFound("fiscal_year"))?;

        let posted = self
            .report_repo
            .posted_lines_for_account(&mut *tx, tenant_id, account_id, fiscal_year_id)
            .await?;
        tx.commit().await?;

        Ok(build_account_ledger(account.id, fiscal_year_id, account.account_type, posted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn totals(code: &str, account_type: AccountType, debit: Decimal, credit: Decimal) -> AccountTotals {
        AccountTotals {
            account_id: Uuid::new_v4(),
            code: code.into(),
            name: code.into(),
            account_type,
            total_debit: debit,
            total_credit: credit,
        }
    }

    fn posted(day: u32, debit: Decimal, credit: Decimal) -> PostedLine {
        PostedLine {
            journal_entry_id: Uuid::new_v4(),
            entry_number: day as i64,
            entry_date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            description: "Lançamento".into(),
            line_description: None,
            debit,
            credit,
        }
    }

    #[test]
    fn trial_balance_uses_natural_side() {
        let report = build_trial_balance(
            Uuid::new_v4(),
            vec![
                totals("1.1", AccountType::Asset, dec!(1000.00), dec!(250.00)),
                totals("3.1", AccountType::Equity, dec!(0), dec!(1000.00)),
                totals("4.1", AccountType::Revenue, dec!(0), dec!(400.00)),
                totals("5.1", AccountType::Expense, dec!(650.00), dec!(0)),
            ],
        );

        assert!(report.is_balanced);
        assert_eq!(report.total_debit, dec!(1650.00));
        let balances: Vec<Decimal> = report.rows.iter().map(|r| r.balance).collect();
        assert_eq!(balances, vec![dec!(750.00), dec!(1000.00), dec!(400.00), dec!(650.00)]);
    }

    #[test]
    fn trial_balance_flags_mismatch() {
        let report = build_trial_balance(
            Uuid::new_v4(),
            vec![totals("1.1", AccountType::Asset, dec!(10.00), dec!(0))],
        );
        assert!(!report.is_balanced);
    }

    #[test]
    fn ledger_accumulates_running_balance() {
        let ledger = build_account_ledger(
            Uuid::new_v4(),
            Uuid::new_v4(),
            AccountType::Liability,
            vec![posted(2, dec!(0), dec!(300.00)), posted(5, dec!(120.00), dec!(0)), posted(9, dec!(0), dec!(20.00))],
        );

        let running: Vec<Decimal> = ledger.lines.iter().map(|l| l.running_balance).collect();
        assert_eq!(running, vec![dec!(300.00), dec!(180.00), dec!(200.00)]);
        assert_eq!(ledger.closing_balance, dec!(200.00));
    }

    #[test]
    fn empty_ledger_closes_at_zero() {
        let ledger = build_account_ledger(Uuid::new_v4(), Uuid::new_v4(), AccountType::Asset, vec![]);
        assert!(ledger.lines.is_empty());
        assert_eq!(ledger.closing_balance, Decimal::ZERO);
    }
}
