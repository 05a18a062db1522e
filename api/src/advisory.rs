//! An opaque evaluator modeled as a state machine with checkpointed state,
//! keyed by `transaction_id` ("case_id"). Any implementation is valid behind
//! this shape, including a deterministic rule-only one — which is what ships
//! here, so the pipeline is fully exercisable offline and in tests without a
//! network call to a third-party model.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::SqlitePool;

use crate::store::StoreError;

/// One checkpointed advisory case: the conversation-shaped `values` blob plus
/// the names of steps still awaiting input (currently only `"human_review"`
/// is ever used).
#[derive(Debug, Clone)]
pub struct CaseState {
    pub values: Value,
    pub pending_steps: Vec<String>,
}

/// The evaluator's parsed verdict — what `/scan` eventually persists when the
/// advisory path doesn't interrupt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub decision: String,
    pub score: i32,
    pub reason: String,
}

pub enum InvokeOutcome {
    /// The evaluator ran to completion; `raw_response` is its last message,
    /// to be parsed with [`parse_verdict`].
    Completed { raw_response: String },
    /// The evaluator hit the `human_review` interrupt point and checkpointed;
    /// the orchestrator should return PENDING_REVIEW.
    Interrupted,
}

pub const HUMAN_REVIEW_STEP: &str = "human_review";

/// The contract's state machine, realized as a deterministic rule-based
/// adapter over a SQLite checkpoint table.
pub struct RuleBasedEvaluator {
    pool: SqlitePool,
}

impl RuleBasedEvaluator {
    pub fn new(pool: SqlitePool) -> Self {
        RuleBasedEvaluator { pool }
    }

    /// Run from `initial_state` (a fresh case) to completion or interruption.
    pub async fn invoke(
        &self,
        initial_state: Value,
        case_id: &str,
        now: Timestamp,
    ) -> Result<InvokeOutcome, StoreError> {
        let verdict = evaluate(&initial_state);
        let interrupt = should_escalate(&initial_state, &verdict);

        let mut values = initial_state;
        merge_object(&mut values, json!({ "last_verdict": verdict }));

        let pending = if interrupt {
            vec![HUMAN_REVIEW_STEP.to_string()]
        } else {
            vec![]
        };
        self.checkpoint(case_id, &values, &pending, now).await?;

        if interrupt {
            Ok(InvokeOutcome::Interrupted)
        } else {
            Ok(InvokeOutcome::Completed {
                raw_response: render_verdict(&verdict),
            })
        }
    }

    /// Resume a checkpointed case from its last state (after
    /// [`update_state`] has injected reviewer feedback).
    pub async fn resume(
        &self,
        case_id: &str,
        now: Timestamp,
    ) -> Result<InvokeOutcome, StoreError> {
        let state = self
            .get_state(case_id)
            .await?
            .ok_or_else(|| StoreError::CaseNotFound(case_id.to_string()))?;

        let verdict = evaluate(&state.values);
        let mut values = state.values;
        merge_object(&mut values, json!({ "last_verdict": verdict }));

        // Reviewer feedback already present: should_escalate is false by
        // construction, so this always completes.
        self.checkpoint(case_id, &values, &[], now).await?;
        Ok(InvokeOutcome::Completed {
            raw_response: render_verdict(&verdict),
        })
    }

    pub async fn get_state(
        &self,
        case_id: &str,
    ) -> Result<Option<CaseState>, StoreError> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT values_json, pending_steps FROM advisory_checkpoints WHERE case_id = ?",
        )
        .bind(case_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((values_json, pending_steps)) = row else {
            return Ok(None);
        };

        let values: Value = serde_json::from_str(&values_json)
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))?;
        let pending_steps: Vec<String> = serde_json::from_str(&pending_steps)
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))?;

        Ok(Some(CaseState {
            values,
            pending_steps,
        }))
    }

    /// Inject the reviewer's verdict into the case's `values` and clear
    /// `as_step` from the pending list.
    pub async fn update_state(
        &self,
        case_id: &str,
        patch: Value,
        as_step: &str,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let mut state = self
            .get_state(case_id)
            .await?
            .ok_or_else(|| StoreError::CaseNotFound(case_id.to_string()))?;

        merge_object(&mut state.values, patch);
        state.pending_steps.retain(|s| s != as_step);

        self.checkpoint(case_id, &state.values, &state.pending_steps, now)
            .await
    }

    async fn checkpoint(
        &self,
        case_id: &str,
        values: &Value,
        pending_steps: &[String],
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let values_json = serde_json::to_string(values)
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))?;
        let pending_json = serde_json::to_string(pending_steps)
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(e.into())))?;

        sqlx::query(
            "INSERT INTO advisory_checkpoints (case_id, values_json, pending_steps, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(case_id) DO UPDATE SET
                values_json = excluded.values_json,
                pending_steps = excluded.pending_steps,
                updated_at = excluded.updated_at",
        )
        .bind(case_id)
        .bind(values_json)
        .bind(pending_json)
        .bind(now.as_microsecond())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn merge_object(target: &mut Value, patch: Value) {
    if let (Value::Object(target), Value::Object(patch)) = (target, patch) {
        for (key, value) in patch {
            target.insert(key, value);
        }
    }
}

/// Deterministic verdict derivation: if reviewer feedback has been injected
/// (the HITL resume path), it is authoritative; otherwise the verdict mirrors
/// the combined rule/pattern/anomaly score the orchestrator computed before
/// escalating.
fn evaluate(values: &Value) -> Verdict {
    if let Some(feedback) = values.get("reviewer_feedback") {
        return Verdict {
            decision: feedback
                .get("decision")
                .and_then(Value::as_str)
                .unwrap_or("REVIEW")
                .to_string(),
            score: values
                .get("combined_score")
                .and_then(Value::as_i64)
                .unwrap_or(60) as i32,
            reason: feedback
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or("Resolved by human review")
                .to_string(),
        };
    }

    let decision = values
        .get("combined_decision")
        .and_then(Value::as_str)
        .unwrap_or("REVIEW")
        .to_string();
    let score = values
        .get("combined_score")
        .and_then(Value::as_i64)
        .unwrap_or(60) as i32;

    let mut reasons: Vec<String> = Vec::new();
    for key in ["rule_reasons", "pattern_reasons", "anomalies", "anti_patterns"] {
        if let Some(Value::Array(items)) = values.get(key) {
            for item in items {
                if let Some(s) = item.as_str() {
                    reasons.push(s.to_string());
                }
            }
        }
    }
    let reason = if reasons.is_empty() {
        "Automated risk review found no disqualifying signal".to_string()
    } else {
        reasons.join("; ")
    };

    Verdict {
        decision,
        score,
        reason,
    }
}

/// The interrupt predicate: escalate to a human iff no prior reviewer
/// feedback exists and the verdict is risky enough to warrant one.
fn should_escalate(values: &Value, verdict: &Verdict) -> bool {
    let has_feedback = values.get("reviewer_feedback").is_some();
    !has_feedback
        && (matches!(verdict.decision.as_str(), "BLOCK" | "REVIEW") || verdict.score > 75)
}

/// Render a verdict as the evaluator's "last assistant message" — wrapped in
/// a code fence the way a chat-style model would, so the fence-tolerant
/// parser below stays load-bearing even against this deterministic adapter.
fn render_verdict(verdict: &Verdict) -> String {
    format!(
        "```json\n{}\n```",
        serde_json::to_string(verdict).expect("Verdict always serializes")
    )
}

/// Parse an evaluator response as `{decision, score, reason}`, tolerating a
/// ``` ``` ``` code-fence wrapper (and a leading `json` language tag). Used
/// by the orchestrator; a parse failure degrades the request to REVIEW/60
/// rather than failing the request outright.
pub fn parse_verdict(raw: &str) -> Option<Verdict> {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed)
        .strip_suffix("```")
        .unwrap_or(trimmed)
        .trim();
    serde_json::from_str(unfenced).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_verdict_tolerates_code_fence() {
        let raw = "```json\n{\"decision\":\"REVIEW\",\"score\":60,\"reason\":\"x\"}\n```";
        let verdict = parse_verdict(raw).unwrap();
        assert_eq!(verdict.decision, "REVIEW");
        assert_eq!(verdict.score, 60);
    }

    #[test]
    fn parse_verdict_handles_bare_json() {
        let raw = "{\"decision\":\"ALLOW\",\"score\":5,\"reason\":\"x\"}";
        assert!(parse_verdict(raw).is_some());
    }

    #[test]
    fn parse_verdict_fails_on_garbage() {
        assert!(parse_verdict("not json at all").is_none());
    }

    #[test]
    fn should_escalate_without_feedback_on_review() {
        let values = json!({ "combined_decision": "REVIEW", "combined_score": 60 });
        let verdict = Verdict {
            decision: "REVIEW".to_string(),
            score: 60,
            reason: "x".to_string(),
        };
        assert!(should_escalate(&values, &verdict));
    }

    #[test]
    fn should_not_escalate_with_prior_feedback() {
        let values = json!({
            "combined_decision": "REVIEW",
            "combined_score": 60,
            "reviewer_feedback": { "decision": "ALLOW", "reason": "ok" }
        });
        let verdict = evaluate(&values);
        assert!(!should_escalate(&values, &verdict));
        assert_eq!(verdict.decision, "ALLOW");
    }

    #[test]
    fn should_not_escalate_clean_allow() {
        let values = json!({ "combined_decision": "ALLOW", "combined_score": 10 });
        let verdict = evaluate(&values);
        assert!(!should_escalate(&values, &verdict));
    }
}
