//! The durable log of decided transactions and the query
//! surface the scoring engines read from.

use std::str::FromStr;

use jiff::Timestamp;
use payloads::{Decision, Transaction};
use rust_decimal::Decimal;
use sqlx::{FromRow, SqlitePool};

use crate::store::StoreError;
use crate::time::TimeSource;

/// A decided transaction as persisted. Mirrors `Transaction` minus the code,
/// plus the server-assigned decision fields.
#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub transaction_id: String,
    pub from_account: String,
    pub to_account: String,
    pub amount: Decimal,
    pub ip_address: String,
    pub device_id: String,
    pub decided_at: Timestamp,
    pub decision: Decision,
    pub risk_score: i32,
    pub reason: String,
}

#[derive(FromRow)]
struct Row {
    transaction_id: String,
    from_account: String,
    to_account: String,
    amount: String,
    ip_address: String,
    device_id: String,
    decided_at: i64,
    decision: String,
    risk_score: i64,
    reason: String,
}

impl TryFrom<Row> for HistoryRecord {
    type Error = StoreError;

    fn try_from(row: Row) -> Result<Self, Self::Error> {
        Ok(HistoryRecord {
            transaction_id: row.transaction_id,
            from_account: row.from_account,
            to_account: row.to_account,
            amount: Decimal::from_str(&row.amount)
                .map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))?,
            ip_address: row.ip_address,
            device_id: row.device_id,
            decided_at: Timestamp::from_microsecond(row.decided_at)
                .map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))?,
            decision: decision_from_str(&row.decision)?,
            risk_score: row.risk_score as i32,
            reason: row.reason,
        })
    }
}

fn decision_from_str(s: &str) -> Result<Decision, StoreError> {
    Decision::parse(s).ok_or_else(|| {
        StoreError::Database(sqlx::Error::Decode(
            format!("unknown decision {s}").into(),
        ))
    })
}

pub(crate) fn decision_to_str(d: Decision) -> &'static str {
    match d {
        Decision::Allow => "ALLOW",
        Decision::Review => "REVIEW",
        Decision::Block => "BLOCK",
        Decision::PendingReview => "PENDING_REVIEW",
    }
}

/// Persist or overwrite a decided transaction. `decided_at` is assigned here
/// from `time_source`, never from the caller-supplied `tx.timestamp`.
pub async fn record(
    tx: &Transaction,
    decision: Decision,
    risk_score: i32,
    reason: &str,
    pool: &SqlitePool,
    time_source: &TimeSource,
) -> Result<(), StoreError> {
    let decided_at = time_source.now();
    sqlx::query(
        "INSERT OR REPLACE INTO transactions
            (transaction_id, from_account, to_account, amount, ip_address,
             device_id, decided_at, decision, risk_score, reason)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&tx.transaction_id)
    .bind(&tx.from_account)
    .bind(&tx.to_account)
    .bind(tx.amount.to_string())
    .bind(&tx.ip_address)
    .bind(&tx.device_id)
    .bind(decided_at.as_microsecond())
    .bind(decision_to_str(decision))
    .bind(risk_score as i64)
    .bind(reason)
    .execute(pool)
    .await?;
    Ok(())
}

/// Mutate an existing record's outcome, used after a human review resolves a
/// pending case. Does not touch `decided_at`.
pub async fn update_outcome(
    transaction_id: &str,
    decision: Decision,
    risk_score: i32,
    reason: &str,
    pool: &SqlitePool,
) -> Result<(), StoreError> {
    let rows = sqlx::query(
        "UPDATE transactions SET decision = ?, risk_score = ?, reason = ?
         WHERE transaction_id = ?",
    )
    .bind(decision_to_str(decision))
    .bind(risk_score as i64)
    .bind(reason)
    .bind(transaction_id)
    .execute(pool)
    .await?
    .rows_affected();

    if rows == 0 {
        return Err(StoreError::TransactionNotFound(transaction_id.to_string()));
    }
    Ok(())
}

/// Descending-by-decided_at history for either side of `account_id`.
pub async fn account_history(
    account_id: &str,
    limit: i64,
    pool: &SqlitePool,
) -> Result<Vec<HistoryRecord>, StoreError> {
    let rows = sqlx::query_as::<_, Row>(
        "SELECT * FROM transactions
         WHERE from_account = ? OR to_account = ?
         ORDER BY decided_at DESC
         LIMIT ?",
    )
    .bind(account_id)
    .bind(account_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(HistoryRecord::try_from).collect()
}

/// Count of outbound rows from `account` within the last `minutes`, relative
/// to `now`. Counts BLOCKed attempts too — velocity is "attempted frequency".
pub async fn recent_outbound_count(
    account: &str,
    minutes: i64,
    now: Timestamp,
    pool: &SqlitePool,
) -> Result<i64, StoreError> {
    let cutoff = (now - jiff::Span::new().minutes(minutes)).as_microsecond();
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM transactions
         WHERE from_account = ? AND decided_at >= ?",
    )
    .bind(account)
    .bind(cutoff)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn beneficiary_count(
    from: &str,
    to: &str,
    pool: &SqlitePool,
) -> Result<i64, StoreError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM transactions WHERE from_account = ? AND to_account = ?",
    )
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Sum of amounts moved or about-to-move out of `account` in the last 24h.
/// Excludes BLOCK rows so a blocked attempt never inflates the daily sum.
pub async fn daily_outbound_total(
    account: &str,
    now: Timestamp,
    pool: &SqlitePool,
) -> Result<Decimal, StoreError> {
    let cutoff = (now - jiff::Span::new().hours(24)).as_microsecond();
    let amounts: Vec<String> = sqlx::query_scalar(
        "SELECT amount FROM transactions
         WHERE from_account = ? AND decided_at >= ?
           AND decision IN ('ALLOW', 'REVIEW', 'PENDING_REVIEW')",
    )
    .bind(account)
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    let mut total = Decimal::ZERO;
    for amount in amounts {
        total += Decimal::from_str(&amount)
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))?;
    }
    Ok(total)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AmountStats {
    pub avg: Decimal,
    pub max: Decimal,
    pub count: i64,
}

/// {avg, max, count} over the last 24h outbound rows with amount > 0.
pub async fn amount_stats_24h(
    account: &str,
    now: Timestamp,
    pool: &SqlitePool,
) -> Result<AmountStats, StoreError> {
    let cutoff = (now - jiff::Span::new().hours(24)).as_microsecond();
    let amounts: Vec<String> = sqlx::query_scalar(
        "SELECT amount FROM transactions
         WHERE from_account = ? AND decided_at >= ? AND CAST(amount AS REAL) > 0",
    )
    .bind(account)
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    let mut sum = Decimal::ZERO;
    let mut max = Decimal::ZERO;
    for amount in &amounts {
        let d = Decimal::from_str(amount)
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))?;
        sum += d;
        if d > max {
            max = d;
        }
    }
    let count = amounts.len() as i64;
    let avg = if count > 0 {
        sum / Decimal::from(count)
    } else {
        Decimal::ZERO
    };
    Ok(AmountStats { avg, max, count })
}

pub async fn unique_beneficiaries(
    account: &str,
    minutes: i64,
    now: Timestamp,
    pool: &SqlitePool,
) -> Result<i64, StoreError> {
    let cutoff = (now - jiff::Span::new().minutes(minutes)).as_microsecond();
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(DISTINCT to_account) FROM transactions
         WHERE from_account = ? AND decided_at >= ?",
    )
    .bind(account)
    .bind(cutoff)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

#[derive(Debug, Clone)]
pub struct OutboundDetail {
    pub amount: Decimal,
    pub to_account: String,
    pub decided_at: Timestamp,
}

pub async fn recent_outbound_details(
    account: &str,
    minutes: i64,
    limit: i64,
    now: Timestamp,
    pool: &SqlitePool,
) -> Result<Vec<OutboundDetail>, StoreError> {
    #[derive(FromRow)]
    struct DetailRow {
        amount: String,
        to_account: String,
        decided_at: i64,
    }

    let cutoff = (now - jiff::Span::new().minutes(minutes)).as_microsecond();
    let rows = sqlx::query_as::<_, DetailRow>(
        "SELECT amount, to_account, decided_at FROM transactions
         WHERE from_account = ? AND decided_at >= ?
         ORDER BY decided_at DESC
         LIMIT ?",
    )
    .bind(account)
    .bind(cutoff)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|r| {
            Ok(OutboundDetail {
                amount: Decimal::from_str(&r.amount).map_err(|e| {
                    StoreError::Database(sqlx::Error::Decode(e.into()))
                })?,
                to_account: r.to_account,
                decided_at: Timestamp::from_microsecond(r.decided_at)
                    .map_err(|e| {
                        StoreError::Database(sqlx::Error::Decode(e.into()))
                    })?,
            })
        })
        .collect()
}

/// Hour-of-day (0..23, UTC) -> count, over the last 7 days of outbound rows.
pub async fn hour_counts_7d(
    account: &str,
    now: Timestamp,
    pool: &SqlitePool,
) -> Result<[i64; 24], StoreError> {
    let cutoff = (now - jiff::Span::new().days(7)).as_microsecond();
    let timestamps: Vec<i64> = sqlx::query_scalar(
        "SELECT decided_at FROM transactions
         WHERE from_account = ? AND decided_at >= ?",
    )
    .bind(account)
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    let mut counts = [0i64; 24];
    for micros in timestamps {
        let ts = Timestamp::from_microsecond(micros)
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))?;
        let hour = ts.to_zoned(jiff::tz::TimeZone::UTC).hour();
        counts[hour as usize] += 1;
    }
    Ok(counts)
}

/// Consolidated read for the pattern engine: one round trip instead of
/// three narrow queries.
#[derive(Debug, Clone)]
pub struct PatternStats {
    pub recent_count_10m: i64,
    pub beneficiary_count: i64,
    pub amount_stats_24h: AmountStats,
}

pub async fn pattern_stats(
    from: &str,
    to: &str,
    now: Timestamp,
    pool: &SqlitePool,
) -> Result<PatternStats, StoreError> {
    Ok(PatternStats {
        recent_count_10m: recent_outbound_count(from, 10, now, pool).await?,
        beneficiary_count: beneficiary_count(from, to, pool).await?,
        amount_stats_24h: amount_stats_24h(from, now, pool).await?,
    })
}

/// Consolidated read for the anomaly engine.
#[derive(Debug, Clone)]
pub struct AnomalyStats {
    pub unique_beneficiaries_10m: i64,
    pub recent_tx_details_10m: Vec<OutboundDetail>,
    pub hour_counts_7d: [i64; 24],
}

pub async fn anomaly_stats(
    from: &str,
    now: Timestamp,
    pool: &SqlitePool,
) -> Result<AnomalyStats, StoreError> {
    Ok(AnomalyStats {
        unique_beneficiaries_10m: unique_beneficiaries(from, 10, now, pool)
            .await?,
        recent_tx_details_10m: recent_outbound_details(from, 10, 50, now, pool)
            .await?,
        hour_counts_7d: hour_counts_7d(from, now, pool).await?,
    })
}
