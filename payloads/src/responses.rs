use std::collections::HashMap;

use jiff::Timestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AccountType, Decision, ErrorCode};

/// The scored outcome of the decision pipeline, embedded in both `/scan` and
/// `/middleware/check` responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiDecision {
    pub decision: Decision,
    pub score: i32,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomalies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anti_patterns: Option<Vec<String>>,
}

/// 200 response body of `POST /scan`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResponse {
    pub transaction_id: String,
    pub ai_decision: AiDecision,
    pub account_type: AccountType,
}

/// 200 response body of `POST /middleware/check` — the same information as
/// `ScanResponse`, flattened into one object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddlewareDecisionResponse {
    pub transaction_id: String,
    pub decision: Decision,
    pub score: i32,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomalies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patterns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anti_patterns: Option<Vec<String>>,
    pub account_type: AccountType,
}

/// 400 response body when the limits/code gate rejects a transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateErrorResponse {
    pub error_code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_type: Option<AccountType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_tx_limit: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_limit: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_used: Option<Decimal>,
}

/// 200 response body of `POST /otp/request`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpResponse {
    pub otp_demo: String,
    pub expires_in_seconds: u64,
    pub otp_required_threshold: Decimal,
}

/// One row of `GET /lookup/{account_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    pub transaction_id: String,
    pub from_account: String,
    pub to_account: String,
    pub amount: Decimal,
    pub timestamp: Timestamp,
    pub decision: Decision,
    pub risk_score: i32,
    pub reason: String,
}

/// 200 response body of `POST /review/{transaction_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResponse {
    pub status: ReviewStatus,
    pub ai_response: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    AlreadyProcessed,
    Processed,
}

/// 200 response body of `GET /limits/{account_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsResponse {
    pub account_type: AccountType,
    pub single_tx_limit: Decimal,
    pub daily_limit: Decimal,
    pub daily_used: Decimal,
}

/// 200 response body of `GET /config` (and the full row underlying
/// `GET /config/{key}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse(pub HashMap<String, serde_json::Value>);

/// 200 response body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

/// One entry of `GET /lookup/{account_id}/indicators` -> `indicators[]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Indicator {
    pub name: String,
    pub current_value: serde_json::Value,
    pub threshold_or_note: String,
    pub status: IndicatorStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorStatus {
    Ok,
    Warning,
    Risk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorLimits {
    pub account_type: AccountType,
    pub single_tx_limit: Decimal,
    pub daily_limit: Decimal,
    pub daily_used: Decimal,
    pub daily_remaining: Decimal,
    pub otp_required_above: Decimal,
    pub limits_explanation: String,
}

/// 200 response body of `GET /lookup/{account_id}/indicators`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountIndicators {
    pub account_id: String,
    pub limits: IndicatorLimits,
    pub triggers_how_they_work: String,
    pub indicators: Vec<Indicator>,
    pub safe_patterns: Vec<String>,
    pub anti_patterns: Vec<String>,
    pub risk_level: RiskLevel,
    pub summary: String,
}
