use actix_web::{HttpResponse, post, web};
use payloads::requests::ReviewRequest;
use payloads::responses::{ReviewResponse, ReviewStatus};
use sqlx::SqlitePool;

use crate::advisory::RuleBasedEvaluator;
use crate::case_lock::CaseLocks;
use crate::orchestrator::{self, ReviewOutcome};
use crate::time::TimeSource;

use super::APIError;

/// `POST /review/{transaction_id}`: resolve a case awaiting human review.
/// Holds a per-case lock across the whole resume sequence so two concurrent
/// resumes of the same case can't both observe `pending` and both resolve it.
#[tracing::instrument(skip(body, history_pool, advisory, case_locks, time_source), ret)]
#[post("/review/{transaction_id}")]
pub async fn review(
    transaction_id: web::Path<String>,
    body: web::Json<ReviewRequest>,
    history_pool: web::Data<SqlitePool>,
    advisory: web::Data<RuleBasedEvaluator>,
    case_locks: web::Data<CaseLocks>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let transaction_id = transaction_id.into_inner();
    let body = body.into_inner();

    let _case_guard = case_locks.acquire(&transaction_id).await;

    let outcome = orchestrator::resume_review(
        &transaction_id,
        body.action,
        &body.reason,
        &history_pool,
        &advisory,
        &time_source,
    )
    .await?;

    match outcome {
        ReviewOutcome::NotFound => Err(APIError::NotFound(format!(
            "no case awaiting review for transaction {transaction_id}"
        ))),
        ReviewOutcome::AlreadyProcessed { ai_response } => {
            Ok(HttpResponse::Ok().json(ReviewResponse {
                status: ReviewStatus::AlreadyProcessed,
                ai_response,
            }))
        }
        ReviewOutcome::Processed { ai_response } => {
            Ok(HttpResponse::Ok().json(ReviewResponse {
                status: ReviewStatus::Processed,
                ai_response,
            }))
        }
    }
}
