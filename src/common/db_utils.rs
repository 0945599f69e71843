// src/common/db_utils.rs

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::common::error::AppError;

// ---
// Helper RLS: identifica quem está agindo para as procedures e policies
// ---
/// Abre uma transação e define `app.user_id` e `app.company_id` locais a ela.
/// As procedures usam esses valores para gravar a auditoria.
pub(crate) async fn begin_scoped(
    pool: &PgPool,
    user_id: Uuid,
    company_id: Option<Uuid>,
) -> Result<Transaction<'static, Postgres>, AppError> {
    // O operador '?' converte automaticamente sqlx::Error -> AppError::DatabaseError
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT set_config('app.user_id', $1, true)")
        .bind(user_id.to_string())
        .execute(&mut *tx)
        .await?;

    // String vazia = sem empresa (premium)
    sqlx::query("SELECT set_config('app.company_id', $1, true)")
        .bind(company_id.map(|id| id.to_string()).unwrap_or_default())
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}
