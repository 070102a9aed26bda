// src/models/reports.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::{IntoParams, ToSchema};

use crate::models::accounts::AccountType;

/// Totais de uma conta no balancete (vem agregado do banco)
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountTotals {
    pub account_id: Uuid,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrialBalanceRow {
    #[serde(flatten)]
    pub totals: AccountTotals,
    /// Saldo pelo lado natural da conta
    pub balance: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrialBalance {
    pub fiscal_year_id: Uuid,
    pub rows: Vec<TrialBalanceRow>,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub is_balanced: bool,
}

/// Partida lançada, como aparece no razão
#[derive(Debug, Clone, FromRow)]
pub struct PostedLine {
    pub journal_entry_id: Uuid,
    pub entry_number: i64,
    pub entry_date: NaiveDate,
    pub description: String,
    pub line_description: Option<String>,
    pub debit: Decimal,
    pub credit: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerLine {
    pub journal_entry_id: Uuid,
    pub entry_number: i64,
    #[schema(value_type = String, format = Date)]
    pub entry_date: NaiveDate,
    pub description: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub running_balance: Decimal,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LedgerQuery {
    pub fiscal_year_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountLedger {
    pub account_id: Uuid,
    pub fiscal_year_id: Uuid,
    pub account_type: AccountType,
    pub lines: Vec<LedgerLine>,
    pub closing_balance: Decimal,
}
