use actix_web::{HttpResponse, post, web};
use payloads::requests::ScanRequest;
use payloads::responses::{AiDecision, GateErrorResponse, MiddlewareDecisionResponse, ScanResponse};
use sqlx::SqlitePool;
use std::time::Duration;

use crate::account_lock::AccountLocks;
use crate::advisory::RuleBasedEvaluator;
use crate::code_store::CodeStore;
use crate::store::{account_catalog, config_store};
use crate::time::TimeSource;
use crate::{gate, orchestrator};

use super::APIError;

fn anomalies_opt(v: Vec<String>) -> Option<Vec<String>> {
    if v.is_empty() { None } else { Some(v) }
}

/// `POST /scan`: run the limits/code gate, then the full scoring pipeline.
#[tracing::instrument(skip(pool, time_source, advisory, code_store, app_config, account_locks), fields(transaction_id = %body.transaction.transaction_id), ret)]
#[post("/scan")]
pub async fn scan(
    body: web::Json<ScanRequest>,
    pool: web::Data<SqlitePool>,
    time_source: web::Data<TimeSource>,
    advisory: web::Data<RuleBasedEvaluator>,
    code_store: web::Data<CodeStore>,
    app_config: web::Data<crate::AppConfig>,
    account_locks: web::Data<AccountLocks>,
) -> Result<HttpResponse, APIError> {
    let tx = body.into_inner().transaction;
    let now = time_source.now();

    // Held across the daily-limit read in `gate::run` through the history
    // write in `orchestrator::decide`'s `persist`, so two concurrent requests
    // against the same account can't both read the same `daily_used` and both
    // commit past the daily limit. Unrelated accounts never contend.
    let _account_guard = account_locks.acquire(&tx.from_account).await;

    let gate_outcome = gate::run(
        &tx.transaction_id,
        &tx.from_account,
        tx.amount,
        tx.code.as_deref(),
        &pool,
        &code_store,
        now,
    )
    .await?;

    if !gate_outcome.allowed {
        return Ok(HttpResponse::BadRequest().json(GateErrorResponse {
            error_code: gate_outcome.error_code.expect("rejected gate outcome carries an error code"),
            message: gate_outcome.message.unwrap_or_default(),
            account_type: Some(gate_outcome.account_type),
            single_tx_limit: Some(gate_outcome.single_tx_limit),
            daily_limit: Some(gate_outcome.daily_limit),
            daily_used: Some(gate_outcome.daily_used),
        }));
    }

    let config = config_store::get_all(&pool).await?;
    let decided = orchestrator::decide(
        &tx,
        &pool,
        &advisory,
        &config,
        &time_source,
        Duration::from_secs(app_config.advisory_timeout_seconds),
        true,
    )
    .await?;

    Ok(HttpResponse::Ok().json(ScanResponse {
        transaction_id: tx.transaction_id,
        ai_decision: AiDecision {
            decision: decided.decision,
            score: decided.score,
            reason: decided.reason,
            anomalies: anomalies_opt(decided.anomalies),
            patterns: anomalies_opt(decided.patterns),
            anti_patterns: anomalies_opt(decided.anti_patterns),
        },
        account_type: gate_outcome.account_type,
    }))
}

/// `POST /middleware/check`: the same pipeline as `/scan`, flattened into
/// `MiddlewareDecisionResponse`.
#[tracing::instrument(skip(pool, time_source, advisory, code_store, app_config, account_locks), fields(transaction_id = %body.transaction.transaction_id), ret)]
#[post("/middleware/check")]
pub async fn middleware_check(
    body: web::Json<ScanRequest>,
    pool: web::Data<SqlitePool>,
    time_source: web::Data<TimeSource>,
    advisory: web::Data<RuleBasedEvaluator>,
    code_store: web::Data<CodeStore>,
    app_config: web::Data<crate::AppConfig>,
    account_locks: web::Data<AccountLocks>,
) -> Result<HttpResponse, APIError> {
    let tx = body.into_inner().transaction;
    let now = time_source.now();

    // See `scan`'s `_account_guard`: same atomicity requirement.
    let _account_guard = account_locks.acquire(&tx.from_account).await;

    let gate_outcome = gate::run(
        &tx.transaction_id,
        &tx.from_account,
        tx.amount,
        tx.code.as_deref(),
        &pool,
        &code_store,
        now,
    )
    .await?;

    if !gate_outcome.allowed {
        return Ok(HttpResponse::BadRequest().json(GateErrorResponse {
            error_code: gate_outcome.error_code.expect("rejected gate outcome carries an error code"),
            message: gate_outcome.message.unwrap_or_default(),
            account_type: Some(gate_outcome.account_type),
            single_tx_limit: Some(gate_outcome.single_tx_limit),
            daily_limit: Some(gate_outcome.daily_limit),
            daily_used: Some(gate_outcome.daily_used),
        }));
    }

    let config = config_store::get_all(&pool).await?;
    let decided = orchestrator::decide(
        &tx,
        &pool,
        &advisory,
        &config,
        &time_source,
        Duration::from_secs(app_config.advisory_timeout_seconds),
        true,
    )
    .await?;

    Ok(HttpResponse::Ok().json(MiddlewareDecisionResponse {
        transaction_id: tx.transaction_id,
        decision: decided.decision,
        score: decided.score,
        reason: decided.reason,
        anomalies: anomalies_opt(decided.anomalies),
        patterns: anomalies_opt(decided.patterns),
        anti_patterns: anomalies_opt(decided.anti_patterns),
        account_type: gate_outcome.account_type,
    }))
}

/// `POST /middleware/evaluate`: skips the limits/code gate entirely and runs
/// scoring + advisory only.
#[tracing::instrument(skip(pool, time_source, advisory, app_config), fields(transaction_id = %body.transaction.transaction_id), ret)]
#[post("/middleware/evaluate")]
pub async fn middleware_evaluate(
    body: web::Json<ScanRequest>,
    pool: web::Data<SqlitePool>,
    time_source: web::Data<TimeSource>,
    advisory: web::Data<RuleBasedEvaluator>,
    app_config: web::Data<crate::AppConfig>,
) -> Result<HttpResponse, APIError> {
    let tx = body.into_inner().transaction;

    let account_type = account_catalog::get_type(&tx.from_account, &pool).await?;
    let config = config_store::get_all(&pool).await?;
    let decided = orchestrator::decide(
        &tx,
        &pool,
        &advisory,
        &config,
        &time_source,
        Duration::from_secs(app_config.advisory_timeout_seconds),
        false,
    )
    .await?;

    Ok(HttpResponse::Ok().json(MiddlewareDecisionResponse {
        transaction_id: tx.transaction_id,
        decision: decided.decision,
        score: decided.score,
        reason: decided.reason,
        anomalies: anomalies_opt(decided.anomalies),
        patterns: anomalies_opt(decided.patterns),
        anti_patterns: anomalies_opt(decided.anti_patterns),
        account_type,
    }))
}
