//! The override table mapping an account id to an
//! `AccountType`. Accounts never seen here fall back to `AccountType::Savings`
//! (the conservative default — see `payloads::AccountType`).

use payloads::AccountType;
use sqlx::SqlitePool;

use crate::store::StoreError;

pub async fn get_type(
    account_id: &str,
    pool: &SqlitePool,
) -> Result<AccountType, StoreError> {
    let row: Option<String> = sqlx::query_scalar(
        "SELECT account_type FROM account_types WHERE account_id = ?",
    )
    .bind(account_id)
    .fetch_optional(pool)
    .await?;

    Ok(match row {
        Some(raw) => {
            AccountType::parse(&raw).ok_or_else(|| StoreError::InvalidType(raw))?
        }
        None => AccountType::default(),
    })
}

pub async fn set_type(
    account_id: &str,
    account_type: AccountType,
    pool: &SqlitePool,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO account_types (account_id, account_type)
         VALUES (?, ?)
         ON CONFLICT(account_id) DO UPDATE SET account_type = excluded.account_type",
    )
    .bind(account_id)
    .bind(account_type.to_string())
    .execute(pool)
    .await?;
    Ok(())
}
