// src/models/tenancy.rs

use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::auth::UserRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "tenant_plan", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TenantPlan {
    Trial,
    Basic,
    Professional,
    Enterprise,
}

// ---
// 1. Tenant (A "Organização")
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    #[schema(example = "Escritório Contábil Alfa")]
    pub name: String,
    #[schema(example = "alfa")]
    pub slug: String,
    pub plan: TenantPlan,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// Um tenant em TRIAL fica bloqueado depois de `trial_ends_at`.
    pub fn trial_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.plan == TenantPlan::Trial && self.trial_ends_at.is_some_and(|ends| ends <= now)
    }
}

// ---
// 2. Branch (A "Filial")
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Matriz")]
    pub name: String,
    #[schema(example = "MAIN")]
    pub code: String,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTenantPayload {
    #[validate(length(min = 1, max = 255, message = "required"))]
    #[schema(example = "Escritório Contábil Alfa")]
    pub name: String,

    #[validate(length(min = 2, max = 100, message = "invalid_slug"))]
    #[schema(example = "alfa")]
    pub slug: String,

    pub plan: Option<TenantPlan>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTenantPayload {
    #[validate(length(min = 1, max = 255, message = "required"))]
    pub name: Option<String>,
    pub plan: Option<TenantPlan>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBranchPayload {
    #[validate(length(min = 1, max = 255, message = "required"))]
    #[schema(example = "Filial Centro")]
    pub name: String,

    #[validate(length(min = 1, max = 50, message = "required"))]
    #[schema(example = "CTR")]
    pub code: String,

    pub address: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBranchPayload {
    #[validate(length(min = 1, max = 255, message = "required"))]
    pub name: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignUserPayload {
    #[validate(email(message = "invalid_email"))]
    pub email: String,
    pub role: UserRole,
    pub branch_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn tenant(plan: TenantPlan, trial_ends_at: Option<DateTime<Utc>>) -> Tenant {
        let now = Utc::now();
        Tenant {
            id: Uuid::new_v4(),
            name: "Alfa".into(),
            slug: "alfa".into(),
            plan,
            trial_ends_at,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn trial_expiry_only_applies_to_trial_plan() {
        let now = Utc::now();
        let past = Some(now - Duration::days(1));
        assert!(tenant(TenantPlan::Trial, past).trial_expired_at(now));
        assert!(!tenant(TenantPlan::Trial, Some(now + Duration::days(3))).trial_expired_at(now));
        assert!(!tenant(TenantPlan::Trial, None).trial_expired_at(now));
        assert!(!tenant(TenantPlan::Basic, past).trial_expired_at(now));
    }
}
