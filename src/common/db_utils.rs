// src/common/db_utils.rs

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::common::error::AppError;

// ---
// Helper RLS: A "Chave" para o Banco de Dados
// ---
/// Abre uma transação e define as variáveis RLS (`app.tenant_id`, `app.user_id`).
/// `set_config(..., true)` vale só até o fim da transação, então a conexão
/// volta limpa para a pool.
pub(crate) async fn begin_tenant_tx(
    pool: &PgPool,
    tenant_id: Uuid,
    user_id: Uuid,
) -> Result<Transaction<'static, Postgres>, AppError> {
    // O operador '?' converte automaticamente sqlx::Error -> AppError::DatabaseError
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT set_config('app.tenant_id', $1, true), set_config('app.user_id', $2, true)")
        .bind(tenant_id.to_string())
        .bind(user_id.to_string())
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}
