use actix_web::{HttpResponse, get, web};
use payloads::responses::HistoryItem;
use sqlx::SqlitePool;

use crate::indicators;
use crate::store::history;
use crate::time::TimeSource;

use super::APIError;

const HISTORY_LIMIT: i64 = 50;

/// `GET /lookup/{account_id}`: descending transaction history for either
/// side of the account.
#[tracing::instrument(skip(pool), ret)]
#[get("/lookup/{account_id}")]
pub async fn lookup(
    account_id: web::Path<String>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, APIError> {
    let records = history::account_history(&account_id, HISTORY_LIMIT, &pool).await?;
    let items: Vec<HistoryItem> = records
        .into_iter()
        .map(|r| HistoryItem {
            transaction_id: r.transaction_id,
            from_account: r.from_account,
            to_account: r.to_account,
            amount: r.amount,
            timestamp: r.decided_at,
            decision: r.decision,
            risk_score: r.risk_score,
            reason: r.reason,
        })
        .collect();
    Ok(HttpResponse::Ok().json(items))
}

/// `GET /lookup/{account_id}/indicators`: a read-only risk-posture summary.
#[tracing::instrument(skip(pool, time_source), ret)]
#[get("/lookup/{account_id}/indicators")]
pub async fn lookup_indicators(
    account_id: web::Path<String>,
    pool: web::Data<SqlitePool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let now = time_source.now();
    let report = indicators::build(&account_id, &pool, now).await?;
    Ok(HttpResponse::Ok().json(report))
}
