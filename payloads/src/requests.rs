use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ReviewAction, Transaction};

/// Body of `POST /scan` and `POST /middleware/check` — a transaction plus the
/// one-time code, if the caller has one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRequest {
    #[serde(flatten)]
    pub transaction: Transaction,
}

/// Body of `POST /review/{transaction_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub action: ReviewAction,
    pub reason: String,
}

/// Body of `POST /otp/request`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpRequest {
    pub transaction_id: String,
    pub from_account: String,
    pub amount: Option<Decimal>,
}

/// Body of `PUT /limits/{account_id}/type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAccountType {
    pub account_type: String,
}

/// Body of `PUT /config`. Keys not recognized by the config store are
/// rejected wholesale with `UNKNOWN_CONFIG_KEY` — a partial update never
/// applies half its keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigUpdate(pub HashMap<String, serde_json::Value>);
