// src/models/accounts.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;
use validator::Validate;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "account_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Asset,     // Ativo
    Liability, // Passivo
    Equity,    // Patrimônio Líquido
    Revenue,   // Receita
    Expense,   // Despesa
}

impl AccountType {
    /// Contas de natureza devedora (saldo cresce com débitos)
    pub fn is_debit_normal(self) -> bool {
        matches!(self, AccountType::Asset | AccountType::Expense)
    }
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,

    #[schema(ignore)]
    pub tenant_id: Uuid,

    pub parent_id: Option<Uuid>,

    #[schema(example = "1.1.01")]
    pub code: String,

    #[schema(example = "Caixa Geral")]
    pub name: String,

    pub account_type: AccountType,
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Nó da árvore do plano de contas
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountNode {
    #[serde(flatten)]
    pub account: Account,
    #[schema(no_recursion)]
    pub children: Vec<AccountNode>,
}

/// Monta a árvore a partir da lista plana. Filhos ordenados pelo código.
/// Contas cujo pai não está na lista viram raízes.
pub fn build_account_tree(accounts: Vec<Account>) -> Vec<AccountNode> {
    let known: std::collections::HashSet<Uuid> = accounts.iter().map(|a| a.id).collect();

    let mut by_parent: HashMap<Option<Uuid>, Vec<Account>> = HashMap::new();
    for account in accounts {
        let parent = account.parent_id.filter(|p| known.contains(p));
        by_parent.entry(parent).or_default().push(account);
    }

    fn attach(parent: Option<Uuid>, by_parent: &mut HashMap<Option<Uuid>, Vec<Account>>) -> Vec<AccountNode> {
        let mut level = by_parent.remove(&parent).unwrap_or_default();
        level.sort_by(|a, b| a.code.cmp(&b.code));
        level
            .into_iter()
            .map(|account| {
                let children = attach(Some(account.id), by_parent);
                AccountNode { account, children }
            })
            .collect()
    }

    attach(None, &mut by_parent)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountPayload {
    #[validate(length(min = 1, max = 50, message = "required"))]
    #[schema(example = "1.1.01")]
    pub code: String,

    #[validate(length(min = 1, max = 255, message = "required"))]
    #[schema(example = "Caixa Geral")]
    pub name: String,

    pub account_type: AccountType,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountPayload {
    #[validate(length(min = 1, max = 255, message = "required"))]
    pub name: Option<String>,

    /// `Some(None)` remove o pai (vira raiz)
    #[serde(default, with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub parent_id: Option<Option<Uuid>>,

    pub is_active: Option<bool>,
}

// Distingue campo ausente de `null` explícito
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(code: &str, parent_id: Option<Uuid>) -> Account {
        let now = Utc::now();
        Account {
            id: Uuid::new_v4(),
            tenant_id: Uuid::nil(),
            parent_id,
            code: code.into(),
            name: format!("Conta {code}"),
            account_type: AccountType::Asset,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn builds_nested_tree_sorted_by_code() {
        let root = account("1", None);
        let b = account("1.2", Some(root.id));
        let a = account("1.1", Some(root.id));
        let leaf = account("1.1.01", Some(a.id));
        let other_root = account("2", None);

        let tree = build_account_tree(vec![leaf.clone(), other_root, b, root, a]);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].account.code, "1");
        assert_eq!(tree[1].account.code, "2");
        let children: Vec<_> = tree[0].children.iter().map(|n| n.account.code.as_str()).collect();
        assert_eq!(children, vec!["1.1", "1.2"]);
        assert_eq!(tree[0].children[0].children[0].account.id, leaf.id);
    }

    #[test]
    fn orphans_become_roots() {
        let orphan = account("9.9", Some(Uuid::new_v4()));
        let tree = build_account_tree(vec![orphan.clone()]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].account.id, orphan.id);
    }

    #[test]
    fn update_payload_distinguishes_null_parent() {
        let cleared: UpdateAccountPayload = serde_json::from_str(r#"{"parentId": null}"#).unwrap();
        assert_eq!(cleared.parent_id, Some(None));

        let untouched: UpdateAccountPayload = serde_json::from_str(r#"{"name": "Bancos"}"#).unwrap();
        assert_eq!(untouched.parent_id, None);
    }

    #[test]
    fn normal_side_by_type() {
        assert!(AccountType::Asset.is_debit_normal());
        assert!(AccountType::Expense.is_debit_normal());
        assert!(!AccountType::Liability.is_debit_normal());
        assert!(!AccountType::Equity.is_debit_normal());
        assert!(!AccountType::Revenue.is_debit_normal());
    }
}
