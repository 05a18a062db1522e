//! Composes the rule, pattern, and anomaly engines into one decision, chooses
//! between fast-tracking and escalating to the advisory adapter, and owns the
//! HITL resume sequence.

use std::time::Duration;

use jiff::Timestamp;
use payloads::{Decision, ReviewAction, Transaction};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::SqlitePool;

use crate::advisory::{self, InvokeOutcome, RuleBasedEvaluator, Verdict};
use crate::engine::anomaly::anomaly_detect;
use crate::engine::clamp_score;
use crate::engine::pattern::pattern_check;
use crate::engine::rule::rule_check;
use crate::store::StoreError;
use crate::store::config_store::EngineConfig;
use crate::store::history::{self, decision_to_str};
use crate::time::TimeSource;

/// The fully-scored outcome of a `/scan` or `/middleware/evaluate` call.
pub struct Decided {
    pub decision: Decision,
    pub score: i32,
    pub reason: String,
    pub anomalies: Vec<String>,
    pub patterns: Vec<String>,
    pub anti_patterns: Vec<String>,
}

/// Run the full scoring pipeline for `tx` and persist the outcome. The
/// limits/code gate has already run by the time this is called; its result
/// is not re-checked here.
pub async fn decide(
    tx: &Transaction,
    pool: &SqlitePool,
    advisory: &RuleBasedEvaluator,
    config: &EngineConfig,
    time_source: &TimeSource,
    advisory_timeout: Duration,
    degrade_on_store_error: bool,
) -> Result<Decided, StoreError> {
    let now = time_source.now();

    let rule_outcome = rule_check(tx);

    // A store failure while gathering the scoring reads is a scoring-path
    // glitch. Per §7, `/scan` and `/middleware/check` degrade it to a
    // persisted REVIEW/50 rather than surfacing a 5xx; `/middleware/evaluate`
    // is documented to surface it as a plain 500, so it propagates instead.
    let stats = async {
        let pattern_stats =
            history::pattern_stats(&tx.from_account, &tx.to_account, now, pool).await?;
        let anomaly_stats = history::anomaly_stats(&tx.from_account, now, pool).await?;
        Ok::<_, StoreError>((pattern_stats, anomaly_stats))
    }
    .await;
    let (pattern_stats, anomaly_stats) = match stats {
        Ok(s) => s,
        Err(store_err) if degrade_on_store_error => {
            crate::telemetry::log_error(store_err);
            let decided = Decided {
                decision: Decision::Review,
                score: 50,
                reason: "System Error".to_string(),
                anomalies: Vec::new(),
                patterns: Vec::new(),
                anti_patterns: Vec::new(),
            };
            persist(tx, &decided, pool, time_source).await?;
            return Ok(decided);
        }
        Err(store_err) => return Err(store_err),
    };

    let pattern_outcome = pattern_check(tx, &pattern_stats, config);
    let anomaly_outcome =
        anomaly_detect(tx, &pattern_stats, &anomaly_stats, config, now);

    let combined_score = clamp_score(
        rule_outcome
            .score
            .max(pattern_outcome.score + anomaly_outcome.score),
    );
    let mut combined_decision = rule_outcome.decision.escalate(pattern_outcome.decision);
    if combined_decision == Decision::Allow && anomaly_outcome.score >= 80 {
        combined_decision = Decision::Block;
    } else if combined_decision == Decision::Allow && anomaly_outcome.score >= 50 {
        combined_decision = Decision::Review;
    }

    let has_beneficiary_history = pattern_stats.beneficiary_count > 0;

    // Fast-track ALLOW.
    if combined_decision == Decision::Allow
        && pattern_stats.recent_count_10m < config.velocity_review_threshold
    {
        let fast_track = if has_beneficiary_history && tx.amount < Decimal::from(100) {
            Some((
                5,
                "Trusted beneficiary with significant history. Fast-tracked.",
            ))
        } else if tx.amount < Decimal::from(25) {
            Some((1, "Micro-transaction within safe limits. Fast-tracked."))
        } else {
            None
        };

        if let Some((score, reason)) = fast_track {
            let decided = Decided {
                decision: Decision::Allow,
                score,
                reason: reason.to_string(),
                anomalies: anomaly_outcome.anomalies,
                patterns: anomaly_outcome.patterns,
                anti_patterns: anomaly_outcome.anti_patterns,
            };
            persist(tx, &decided, pool, time_source).await?;
            return Ok(decided);
        }
    }

    // Fast-track BLOCK.
    if combined_decision == Decision::Block
        && (rule_outcome.score >= 80 || pattern_outcome.score + anomaly_outcome.score >= 80)
    {
        let mut reasons = rule_outcome.reasons.clone();
        reasons.extend(pattern_outcome.reasons.clone());
        let reason = if reasons.is_empty() {
            "Fast-track BLOCK".to_string()
        } else {
            reasons.join("; ")
        };
        let decided = Decided {
            decision: Decision::Block,
            score: combined_score,
            reason,
            anomalies: anomaly_outcome.anomalies,
            patterns: anomaly_outcome.patterns,
            anti_patterns: anomaly_outcome.anti_patterns,
        };
        persist(tx, &decided, pool, time_source).await?;
        return Ok(decided);
    }

    // Escalate to the advisory evaluator.
    let initial_state = json!({
        "transaction_id": tx.transaction_id,
        "from_account": tx.from_account,
        "to_account": tx.to_account,
        "amount": tx.amount,
        "rule_score": rule_outcome.score,
        "rule_reasons": rule_outcome.reasons,
        "pattern_score": pattern_outcome.score,
        "pattern_reasons": pattern_outcome.reasons,
        "anomalies": anomaly_outcome.anomalies,
        "patterns": anomaly_outcome.patterns,
        "anti_patterns": anomaly_outcome.anti_patterns,
        "has_beneficiary_history": has_beneficiary_history,
        "combined_score": combined_score,
        "combined_decision": decision_to_str(combined_decision),
    });

    let (decision, score, reason) = match tokio::time::timeout(
        advisory_timeout,
        advisory.invoke(initial_state, &tx.transaction_id, now),
    )
    .await
    {
        Err(_elapsed) => (Decision::Review, 50, "System timeout".to_string()),
        Ok(Err(store_err)) => {
            crate::telemetry::log_error(store_err);
            (Decision::Review, 50, "System Error".to_string())
        }
        Ok(Ok(InvokeOutcome::Interrupted)) => (
            Decision::PendingReview,
            combined_score.max(75),
            "Awaiting human review".to_string(),
        ),
        Ok(Ok(InvokeOutcome::Completed { raw_response })) => {
            match advisory::parse_verdict(&raw_response) {
                Some(Verdict {
                    decision,
                    score,
                    reason,
                }) => (
                    Decision::parse(&decision).unwrap_or(Decision::Review),
                    score,
                    reason,
                ),
                None => (
                    Decision::Review,
                    60,
                    "Unable to parse advisory verdict".to_string(),
                ),
            }
        }
    };

    let decided = Decided {
        decision,
        score: clamp_score(score),
        reason,
        anomalies: anomaly_outcome.anomalies,
        patterns: anomaly_outcome.patterns,
        anti_patterns: anomaly_outcome.anti_patterns,
    };
    persist(tx, &decided, pool, time_source).await?;
    Ok(decided)
}

async fn persist(
    tx: &Transaction,
    decided: &Decided,
    pool: &SqlitePool,
    time_source: &TimeSource,
) -> Result<(), StoreError> {
    history::record(
        tx,
        decided.decision,
        decided.score,
        &decided.reason,
        pool,
        time_source,
    )
    .await
}

/// What a `POST /review/{transaction_id}` call resolves to.
pub enum ReviewOutcome {
    NotFound,
    AlreadyProcessed { ai_response: String },
    Processed { ai_response: String },
}

/// Run the HITL resume sequence: inject the
/// reviewer's verdict, resume the evaluator, and finalize the persisted
/// record. Callers hold a per-case lock (`case_lock::CaseLocks`) across this
/// call so two concurrent resumes of the same case can't race.
pub async fn resume_review(
    transaction_id: &str,
    action: ReviewAction,
    reason: &str,
    history_pool: &SqlitePool,
    advisory: &RuleBasedEvaluator,
    time_source: &TimeSource,
) -> Result<ReviewOutcome, StoreError> {
    let now = time_source.now();

    let Some(state) = advisory.get_state(transaction_id).await? else {
        return Ok(ReviewOutcome::NotFound);
    };

    if !state
        .pending_steps
        .iter()
        .any(|s| s == advisory::HUMAN_REVIEW_STEP)
    {
        let ai_response = state
            .values
            .get("last_verdict")
            .map(|v| v.to_string())
            .unwrap_or_default();
        return Ok(ReviewOutcome::AlreadyProcessed { ai_response });
    }

    let resolved = action.resolved_decision();
    let patch = json!({
        "reviewer_feedback": {
            "decision": decision_to_str(resolved),
            "reason": reason,
        }
    });
    advisory
        .update_state(transaction_id, patch, advisory::HUMAN_REVIEW_STEP, now)
        .await?;

    // `resume` always completes once reviewer feedback is present (see its
    // doc comment in advisory.rs): should_escalate is false by construction.
    let raw_response = match advisory.resume(transaction_id, now).await? {
        InvokeOutcome::Completed { raw_response } => raw_response,
        InvokeOutcome::Interrupted => String::new(),
    };

    let verdict = advisory::parse_verdict(&raw_response).unwrap_or(Verdict {
        decision: decision_to_str(resolved).to_string(),
        score: if resolved == Decision::Block { 90 } else { 5 },
        reason: reason.to_string(),
    });

    history::update_outcome(
        transaction_id,
        Decision::parse(&verdict.decision).unwrap_or(resolved),
        verdict.score,
        &verdict.reason,
        history_pool,
    )
    .await?;

    Ok(ReviewOutcome::Processed { ai_response: raw_response })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(amount: Decimal, from: &str, to: &str) -> Transaction {
        Transaction {
            transaction_id: "tx1".into(),
            from_account: from.into(),
            to_account: to.into(),
            amount,
            timestamp: Timestamp::now(),
            ip_address: "127.0.0.1".into(),
            device_id: "".into(),
            code: None,
        }
    }

    #[test]
    fn micro_transaction_is_constructible() {
        // Smoke-test the helper used across decide()'s fast-track branch;
        // the async pipeline itself is exercised by the integration tests.
        let t = tx(Decimal::from(10), "a", "b");
        assert!(t.amount < Decimal::from(25));
    }
}
