use actix_web::{HttpResponse, get, put, web};
use payloads::requests::SetAccountType;
use payloads::responses::LimitsResponse;
use payloads::AccountType;
use sqlx::SqlitePool;

use crate::store::{account_catalog, history, StoreError};
use crate::time::TimeSource;

use super::APIError;

/// `GET /limits/{account_id}`: the account's type, fixed limits, and current
/// daily usage.
#[tracing::instrument(skip(pool, time_source), ret)]
#[get("/limits/{account_id}")]
pub async fn get_limits(
    account_id: web::Path<String>,
    pool: web::Data<SqlitePool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let account_type = account_catalog::get_type(&account_id, &pool).await?;
    let limits = account_type.limits();
    let daily_used =
        history::daily_outbound_total(&account_id, time_source.now(), &pool).await?;

    Ok(HttpResponse::Ok().json(LimitsResponse {
        account_type,
        single_tx_limit: limits.single_tx_limit,
        daily_limit: limits.daily_limit,
        daily_used,
    }))
}

/// `PUT /limits/{account_id}/type`: change an account's tier.
#[tracing::instrument(skip(pool), ret)]
#[put("/limits/{account_id}/type")]
pub async fn set_account_type(
    account_id: web::Path<String>,
    body: web::Json<SetAccountType>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, APIError> {
    let account_type = AccountType::parse(&body.account_type)
        .ok_or_else(|| StoreError::InvalidType(body.account_type.clone()))?;
    account_catalog::set_type(&account_id, account_type, &pool).await?;
    Ok(HttpResponse::Ok().finish())
}
