//! A read-only, non-scoring summary of an account's current risk posture.
//! Derived purely from the history, config, and account catalog stores — no
//! advisory evaluator call, no score produced.

use jiff::Timestamp;
use payloads::responses::{
    AccountIndicators, Indicator, IndicatorLimits, IndicatorStatus, RiskLevel,
};
use payloads::otp_required_amount_threshold;
use rust_decimal::Decimal;
use sqlx::SqlitePool;

use crate::store::config_store::EngineConfig;
use crate::store::{account_catalog, config_store, history};
use crate::store::StoreError;

pub async fn build(
    account_id: &str,
    pool: &SqlitePool,
    now: Timestamp,
) -> Result<AccountIndicators, StoreError> {
    let account_type = account_catalog::get_type(account_id, pool).await?;
    let limits = account_type.limits();
    let config = config_store::get_all(pool).await?;

    let daily_used = history::daily_outbound_total(account_id, now, pool).await?;
    let daily_remaining = (limits.daily_limit - daily_used).max(Decimal::ZERO);
    let recent_count_10m = history::recent_outbound_count(account_id, 10, now, pool).await?;
    let unique_beneficiaries_10m =
        history::unique_beneficiaries(account_id, 10, now, pool).await?;
    let amount_stats = history::amount_stats_24h(account_id, now, pool).await?;
    let hour_counts = history::hour_counts_7d(account_id, now, pool).await?;

    let mut indicators = Vec::new();
    let mut safe_patterns = Vec::new();
    let mut anti_patterns = Vec::new();

    indicators.push(velocity_indicator(recent_count_10m, &config));
    if recent_count_10m >= config.velocity_review_threshold {
        anti_patterns.push("Elevated transaction velocity in the last 10 minutes".to_string());
    } else {
        safe_patterns.push("Transaction velocity within normal range".to_string());
    }

    indicators.push(Indicator {
        name: "Daily spend used".to_string(),
        current_value: serde_json::json!(daily_used),
        threshold_or_note: format!("limit {}", limits.daily_limit),
        status: daily_usage_status(daily_used, limits.daily_limit),
    });

    indicators.push(Indicator {
        name: "Unique beneficiaries (10m)".to_string(),
        current_value: serde_json::json!(unique_beneficiaries_10m),
        threshold_or_note: format!(
            "flags as structuring at >= {} with matching velocity",
            config.structuring_min_tx
        ),
        status: if unique_beneficiaries_10m >= config.structuring_min_tx
            && recent_count_10m >= config.structuring_min_tx
        {
            anti_patterns
                .push("Many distinct beneficiaries in a short window (structuring)".to_string());
            IndicatorStatus::Risk
        } else {
            IndicatorStatus::Ok
        },
    });

    indicators.push(Indicator {
        name: "24h average amount".to_string(),
        current_value: serde_json::json!(amount_stats.avg),
        threshold_or_note: "used as the baseline for amount-spike detection".to_string(),
        status: IndicatorStatus::Ok,
    });

    let total_7d: i64 = hour_counts.iter().sum();
    let current_hour = now.to_zoned(jiff::tz::TimeZone::UTC).hour() as usize;
    let off_hours = total_7d >= config.unusual_hour_min_tx && hour_counts[current_hour] == 0;
    indicators.push(Indicator {
        name: "Off-hours activity".to_string(),
        current_value: serde_json::json!(hour_counts[current_hour]),
        threshold_or_note: "flags when the current hour has no history over the last 7 days"
            .to_string(),
        status: if off_hours {
            anti_patterns.push("Activity outside the account's usual hours".to_string());
            IndicatorStatus::Warning
        } else {
            IndicatorStatus::Ok
        },
    });

    if amount_stats.count >= config.min_transactions_for_avg {
        safe_patterns.push("Consistent transaction history available for spike detection".to_string());
    }

    let risk_level = if anti_patterns
        .iter()
        .any(|p| p.contains("structuring") || p.contains("velocity"))
        || recent_count_10m >= config.velocity_block_threshold
    {
        RiskLevel::High
    } else if !anti_patterns.is_empty() {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    let summary = match risk_level {
        RiskLevel::Low => {
            "No active risk indicators; recent activity is within normal patterns.".to_string()
        }
        RiskLevel::Medium => {
            format!("{} indicator(s) warrant attention but do not currently block transfers.", anti_patterns.len())
        }
        RiskLevel::High => {
            "Multiple risk indicators are active; new transactions are likely to be reviewed or blocked.".to_string()
        }
    };

    Ok(AccountIndicators {
        account_id: account_id.to_string(),
        limits: IndicatorLimits {
            account_type,
            single_tx_limit: limits.single_tx_limit,
            daily_limit: limits.daily_limit,
            daily_used,
            daily_remaining,
            otp_required_above: otp_required_amount_threshold(),
            limits_explanation: format!(
                "{account_type} accounts may move up to {} in a single transfer and up to {} per rolling 24h window; transfers at or above {} require a one-time code.",
                limits.single_tx_limit, limits.daily_limit, otp_required_amount_threshold()
            ),
        },
        triggers_how_they_work: "Velocity counts outbound attempts in a 10-minute window; \
            new-beneficiary tiers compare amount against fixed thresholds when no prior transfer \
            to that recipient exists; amount spikes compare against the 24h average and max; \
            round-number amounts and off-hours activity add anomaly score; structuring flags many \
            distinct beneficiaries moved to in a short window."
            .to_string(),
        indicators,
        safe_patterns,
        anti_patterns,
        risk_level,
        summary,
    })
}

fn velocity_indicator(recent_count_10m: i64, config: &EngineConfig) -> Indicator {
    let status = if recent_count_10m >= config.velocity_block_threshold {
        IndicatorStatus::Risk
    } else if recent_count_10m >= config.velocity_review_threshold {
        IndicatorStatus::Warning
    } else {
        IndicatorStatus::Ok
    };
    Indicator {
        name: "10-minute velocity".to_string(),
        current_value: serde_json::json!(recent_count_10m),
        threshold_or_note: format!(
            "warn at {}, review at {}, block at {}",
            config.velocity_warn_threshold,
            config.velocity_review_threshold,
            config.velocity_block_threshold
        ),
        status,
    }
}

fn daily_usage_status(used: Decimal, limit: Decimal) -> IndicatorStatus {
    if limit <= Decimal::ZERO {
        return IndicatorStatus::Ok;
    }
    let ratio = used / limit;
    if ratio >= Decimal::new(9, 1) {
        IndicatorStatus::Risk
    } else if ratio >= Decimal::new(7, 1) {
        IndicatorStatus::Warning
    } else {
        IndicatorStatus::Ok
    }
}
