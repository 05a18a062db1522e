pub mod api_client;
pub mod requests;
pub mod responses;

use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A money-movement event as submitted by a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub from_account: String,
    pub to_account: String,
    pub amount: Decimal,
    /// Caller-supplied wall clock. Never used for velocity/spike math — the
    /// server's own clock (`decided_at`) is authoritative for that.
    pub timestamp: jiff::Timestamp,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub code: Option<String>,
}

/// The four terminal (or near-terminal) states a transaction can settle into.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "use-sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Allow,
    Review,
    Block,
    PendingReview,
}

impl Decision {
    /// Promote `self` to the higher-risk of `self` and `other`. ALLOW is the
    /// floor, BLOCK is the ceiling; PENDING_REVIEW is only ever set
    /// explicitly by the orchestrator, never produced by escalation.
    pub fn escalate(self, other: Decision) -> Decision {
        use Decision::*;
        match (self, other) {
            (Block, _) | (_, Block) => Block,
            (Review, _) | (_, Review) => Review,
            (PendingReview, _) | (_, PendingReview) => PendingReview,
            (Allow, Allow) => Allow,
        }
    }

    pub fn is_block(self) -> bool {
        matches!(self, Decision::Block)
    }

    /// Parse the wire/uppercase spelling used by the advisory evaluator's
    /// JSON verdicts and by the persisted `decision` column.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ALLOW" => Some(Decision::Allow),
            "REVIEW" => Some(Decision::Review),
            "BLOCK" => Some(Decision::Block),
            "PENDING_REVIEW" => Some(Decision::PendingReview),
            _ => None,
        }
    }
}

/// Account tiers and their fixed spending limits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "use-sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountType {
    Savings,
    Checking,
    Premium,
}

impl Default for AccountType {
    /// Most restrictive tier, used for accounts we've never seen before.
    fn default() -> Self {
        AccountType::Savings
    }
}

impl AccountType {
    pub fn limits(self) -> AccountLimits {
        match self {
            AccountType::Savings => AccountLimits {
                single_tx_limit: Decimal::from(5_000),
                daily_limit: Decimal::from(10_000),
            },
            AccountType::Checking => AccountLimits {
                single_tx_limit: Decimal::from(25_000),
                daily_limit: Decimal::from(50_000),
            },
            AccountType::Premium => AccountLimits {
                single_tx_limit: Decimal::from(100_000),
                daily_limit: Decimal::from(250_000),
            },
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SAVINGS" => Some(AccountType::Savings),
            "CHECKING" => Some(AccountType::Checking),
            "PREMIUM" => Some(AccountType::Premium),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLimits {
    pub single_tx_limit: Decimal,
    pub daily_limit: Decimal,
}

pub fn otp_required_amount_threshold() -> Decimal {
    Decimal::new(10_000, 2) // 100.00
}

/// The human reviewer's verdict on a case paused for human-in-the-loop review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReviewAction {
    Approve,
    Decline,
}

impl ReviewAction {
    /// The decision a resolved case settles into.
    pub fn resolved_decision(self) -> Decision {
        match self {
            ReviewAction::Approve => Decision::Allow,
            ReviewAction::Decline => Decision::Block,
        }
    }
}

/// Wire error codes returned by the gate and the config/account admin
/// endpoints. Written out explicitly (not Display-derived from the variant
/// name) since clients match on the exact string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    #[display("LIMIT_EXCEEDED")]
    LimitExceeded,
    #[display("DAILY_LIMIT_EXCEEDED")]
    DailyLimitExceeded,
    #[display("OTP_REQUIRED")]
    OtpRequired,
    #[display("OTP_INVALID")]
    OtpInvalid,
    #[display("UNKNOWN_CONFIG_KEY")]
    UnknownConfigKey,
    #[display("INVALID_ACCOUNT_TYPE")]
    InvalidAccountType,
    #[display("NOT_FOUND")]
    NotFound,
    #[display("INTERNAL")]
    Internal,
}
