// src/models/fiscal.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FiscalYear {
    pub id: Uuid,

    #[schema(ignore)]
    pub tenant_id: Uuid,

    #[schema(example = "Exercício 2025")]
    pub name: String,

    #[schema(value_type = String, format = Date, example = "2025-01-01")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = Date, example = "2025-12-31")]
    pub end_date: NaiveDate,

    pub is_locked: bool,
    pub locked_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FiscalYear {
    /// Intervalo fechado: [start_date, end_date]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFiscalYearPayload {
    #[validate(length(min = 1, max = 100, message = "required"))]
    #[schema(example = "Exercício 2025")]
    pub name: String,
    #[schema(value_type = String, format = Date, example = "2025-01-01")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = Date, example = "2025-12-31")]
    pub end_date: NaiveDate,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFiscalYearPayload {
    #[validate(length(min = 1, max = 100, message = "required"))]
    pub name: String,
    #[schema(value_type = String, format = Date)]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = Date)]
    pub end_date: NaiveDate,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FiscalYearDateQuery {
    #[param(value_type = String, format = Date, example = "2025-06-30")]
    pub date: NaiveDate,
}
