// src/models/journal.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: Uuid,

    #[schema(ignore)]
    pub tenant_id: Uuid,

    pub fiscal_year_id: Uuid,
    pub branch_id: Option<Uuid>,

    #[schema(example = 42)]
    pub entry_number: i64,

    #[schema(value_type = String, format = Date, example = "2025-03-15")]
    pub entry_date: NaiveDate,

    #[schema(example = "Pagamento de aluguel - março")]
    pub description: String,
    #[schema(example = "NF 1234")]
    pub reference: Option<String>,

    pub is_posted: bool,
    pub posted_at: Option<DateTime<Utc>>,
    pub posted_by: Option<Uuid>,

    /// Lançamento original, quando este é um estorno
    pub reversal_of: Option<Uuid>,
    pub created_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntryLine {
    pub id: Uuid,
    pub journal_entry_id: Uuid,
    pub account_id: Uuid,
    pub description: Option<String>,

    #[schema(example = "1500.00")]
    pub debit: Decimal,
    #[schema(example = "0.00")]
    pub credit: Decimal,

    pub line_order: i32,
    pub created_at: DateTime<Utc>,
}

/// Lançamento completo com as partidas e os totais
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntryDetail {
    #[serde(flatten)]
    pub entry: JournalEntry,
    pub lines: Vec<JournalEntryLine>,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub is_balanced: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JournalLineInput {
    pub account_id: Uuid,

    #[validate(length(max = 500, message = "too_long"))]
    pub description: Option<String>,

    #[serde(default)]
    #[schema(example = "1500.00")]
    pub debit: Decimal,
    #[serde(default)]
    #[schema(example = "0.00")]
    pub credit: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateJournalEntryPayload {
    /// Se omitido, o exercício é resolvido pela data do lançamento
    pub fiscal_year_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,

    #[schema(value_type = String, format = Date, example = "2025-03-15")]
    pub entry_date: NaiveDate,

    #[validate(length(min = 1, max = 1000, message = "required"))]
    pub description: String,

    #[validate(length(max = 100, message = "too_long"))]
    pub reference: Option<String>,

    #[validate(length(min = 2, message = "journal_min_lines"), nested)]
    pub lines: Vec<JournalLineInput>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJournalEntryPayload {
    pub branch_id: Option<Uuid>,

    #[schema(value_type = String, format = Date)]
    pub entry_date: NaiveDate,

    #[validate(length(min = 1, max = 1000, message = "required"))]
    pub description: String,

    #[validate(length(max = 100, message = "too_long"))]
    pub reference: Option<String>,

    #[validate(length(min = 2, message = "journal_min_lines"), nested)]
    pub lines: Vec<JournalLineInput>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReverseJournalEntryPayload {
    /// Data do estorno; padrão = data do lançamento original
    #[schema(value_type = Option<String>, format = Date)]
    pub entry_date: Option<NaiveDate>,
}

/// Filtros da listagem (query string)
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct JournalEntryFilter {
    pub fiscal_year_id: Option<Uuid>,
    pub is_posted: Option<bool>,
    #[param(value_type = Option<String>, format = Date)]
    pub date_from: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = Date)]
    pub date_to: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl JournalEntryFilter {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 500;

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_clamps_pagination() {
        let filter = JournalEntryFilter { limit: Some(10_000), offset: Some(-3), ..Default::default() };
        assert_eq!(filter.limit(), JournalEntryFilter::MAX_LIMIT);
        assert_eq!(filter.offset(), 0);

        let default = JournalEntryFilter::default();
        assert_eq!(default.limit(), JournalEntryFilter::DEFAULT_LIMIT);
    }

    #[test]
    fn line_input_defaults_missing_side_to_zero() {
        let line: JournalLineInput = serde_json::from_str(
            r#"{"accountId": "550e8400-e29b-41d4-a716-446655440000", "debit": 10.5}"#,
        )
        .unwrap();
        assert_eq!(line.credit, Decimal::ZERO);
        assert_eq!(line.debit, Decimal::new(1050, 2));
    }
}
