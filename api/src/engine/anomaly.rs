//! Anomaly and anti-pattern detection against the consolidated
//! `store::history::AnomalyStats` read.

use jiff::Timestamp;
use payloads::Transaction;
use rust_decimal::Decimal;

use crate::store::config_store::EngineConfig;
use crate::store::history::{AnomalyStats, PatternStats};

use super::clamp_score;

/// Round-number thresholds a "round amount" is compared against.
const ROUND_AMOUNTS: &[i64] =
    &[100, 500, 1_000, 2_000, 5_000, 10_000, 20_000, 50_000, 100_000];

pub struct AnomalyOutcome {
    pub score: i32,
    pub anomalies: Vec<String>,
    pub patterns: Vec<String>,
    pub anti_patterns: Vec<String>,
}

/// `anomaly_detect(tx, stats) -> (score_delta, anomalies, patterns, anti_patterns)`.
/// `pattern_stats` supplies the beneficiary count, 10m velocity, and 24h
/// amount stats the anomaly rules also need, so callers take one
/// consolidated read instead of two.
pub fn anomaly_detect(
    tx: &Transaction,
    pattern_stats: &PatternStats,
    stats: &AnomalyStats,
    config: &EngineConfig,
    now: Timestamp,
) -> AnomalyOutcome {
    let amount_stats_24h = &pattern_stats.amount_stats_24h;
    let pattern_stats_beneficiary_count = pattern_stats.beneficiary_count;
    let pattern_stats_recent_count_10m = pattern_stats.recent_count_10m;
    let mut score = 0i32;
    let mut anomalies = Vec::new();
    let mut patterns = Vec::new();
    let mut anti_patterns = Vec::new();

    let is_round = is_round_amount(tx.amount, config.round_amount_tolerance);

    // Amount anomaly.
    if amount_stats_24h.count >= 2 && amount_stats_24h.avg > Decimal::ZERO {
        let ratio = tx.amount / amount_stats_24h.avg;
        let low_threshold = Decimal::new(2, 1); // 0.2
        if ratio > Decimal::from(5)
            || (ratio < low_threshold && tx.amount > Decimal::from(100))
        {
            score += 25;
            anomalies.push("Amount anomaly vs. 24h average".to_string());
        }
    }

    // Time anomaly.
    let total_7d: i64 = stats.hour_counts_7d.iter().sum();
    if total_7d >= config.unusual_hour_min_tx {
        let peak_hour = stats
            .hour_counts_7d
            .iter()
            .enumerate()
            .max_by_key(|(_, count)| **count)
            .map(|(hour, _)| hour as i64)
            .unwrap_or(0);
        let current_hour = now.to_zoned(jiff::tz::TimeZone::UTC).hour() as i64;
        let unseen_hour = stats.hour_counts_7d[current_hour as usize] == 0;
        let hour_distance = (current_hour - peak_hour).abs().min(24 - (current_hour - peak_hour).abs());
        if unseen_hour && hour_distance > 6 {
            score += config.off_hours_score as i32;
            anomalies.push("Off-hours activity".to_string());
        }
    }

    // Round amount.
    if is_round {
        score += config.round_amount_score as i32;
        anomalies.push("Round-number amount".to_string());
    }

    // Informational patterns (no score).
    if pattern_stats_beneficiary_count >= config.recurring_beneficiary_min {
        patterns.push("Recurring beneficiary".to_string());
    }
    if amount_stats_24h.avg > Decimal::ZERO {
        let ratio = tx.amount / amount_stats_24h.avg;
        if ratio >= Decimal::new(5, 1) && ratio <= Decimal::from(2) {
            patterns.push("Consistent amount vs. history".to_string());
        }
    }

    // Structuring: many distinct beneficiaries in a short window.
    if stats.unique_beneficiaries_10m >= config.structuring_min_tx
        && pattern_stats_recent_count_10m >= config.structuring_min_tx
    {
        score += 40;
        anti_patterns.push("Structuring: many beneficiaries in a short window".to_string());
    }

    // Multiple new beneficiaries.
    if pattern_stats_beneficiary_count == 0 && stats.unique_beneficiaries_10m >= 2 {
        score += config.structuring_new_beneficiary_bonus as i32;
        anti_patterns.push("Multiple new beneficiaries in quick succession".to_string());
    }

    // Round-amount cluster.
    let round_cluster_count = stats
        .recent_tx_details_10m
        .iter()
        .filter(|d| is_round_amount(d.amount, config.round_amount_tolerance))
        .count();
    if round_cluster_count >= 2 && is_round && tx.amount >= Decimal::from(500) {
        score += 15;
        anti_patterns.push("Cluster of round-number amounts".to_string());
    }

    // Post-burst large new beneficiary.
    if pattern_stats_beneficiary_count == 0
        && pattern_stats_recent_count_10m >= 2
        && tx.amount
            > (amount_stats_24h.avg * Decimal::from(2)).max(Decimal::from(5_000))
    {
        score += 20;
        anti_patterns.push("Large transfer to new beneficiary after a burst".to_string());
    }

    AnomalyOutcome {
        score: clamp_score(score),
        anomalies,
        patterns,
        anti_patterns,
    }
}

fn is_round_amount(amount: Decimal, tolerance: f64) -> bool {
    if amount < Decimal::from(500) {
        return false;
    }
    let tolerance = Decimal::try_from(tolerance).unwrap_or(Decimal::new(1, 2));
    for candidate in ROUND_AMOUNTS {
        let candidate = Decimal::from(*candidate);
        if (amount - candidate).abs() <= tolerance {
            return true;
        }
    }
    let rounded_to_thousand = (amount / Decimal::from(1_000)).round() * Decimal::from(1_000);
    (amount - rounded_to_thousand).abs() <= tolerance * amount
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::history::{AmountStats, OutboundDetail};

    fn tx(amount: Decimal) -> Transaction {
        Transaction {
            transaction_id: "tx1".into(),
            from_account: "acct1".into(),
            to_account: "acct2".into(),
            amount,
            timestamp: Timestamp::now(),
            ip_address: "127.0.0.1".into(),
            device_id: "".into(),
            code: None,
        }
    }

    #[test]
    fn round_amount_scores() {
        let config = EngineConfig::default();
        let outcome = anomaly_detect(
            &tx(Decimal::from(1_000)),
            &PatternStats {
                recent_count_10m: 0,
                beneficiary_count: 0,
                amount_stats_24h: AmountStats::default(),
            },
            &AnomalyStats {
                unique_beneficiaries_10m: 0,
                recent_tx_details_10m: vec![],
                hour_counts_7d: [0; 24],
            },
            &config,
            Timestamp::now(),
        );
        assert!(outcome.anomalies.iter().any(|a| a.contains("Round")));
        assert_eq!(outcome.score, config.round_amount_score as i32);
    }

    #[test]
    fn structuring_detected() {
        let config = EngineConfig::default();
        let outcome = anomaly_detect(
            &tx(Decimal::from(321)),
            &PatternStats {
                recent_count_10m: 3,
                beneficiary_count: 0,
                amount_stats_24h: AmountStats::default(),
            },
            &AnomalyStats {
                unique_beneficiaries_10m: 3,
                recent_tx_details_10m: vec![],
                hour_counts_7d: [0; 24],
            },
            &config,
            Timestamp::now(),
        );
        assert!(
            outcome
                .anti_patterns
                .iter()
                .any(|p| p.contains("Structuring"))
        );
        assert!(outcome.score >= 40);
    }

    #[test]
    fn recurring_beneficiary_is_informational_only() {
        let config = EngineConfig::default();
        let outcome = anomaly_detect(
            &tx(Decimal::from(321)),
            &PatternStats {
                recent_count_10m: 0,
                beneficiary_count: 5,
                amount_stats_24h: AmountStats::default(),
            },
            &AnomalyStats {
                unique_beneficiaries_10m: 0,
                recent_tx_details_10m: vec![],
                hour_counts_7d: [0; 24],
            },
            &config,
            Timestamp::now(),
        );
        assert!(
            outcome
                .patterns
                .iter()
                .any(|p| p.contains("Recurring"))
        );
        assert_eq!(outcome.score, 0);
    }

    #[test]
    fn round_amount_cluster_detected() {
        let config = EngineConfig::default();
        let details = vec![
            OutboundDetail {
                amount: Decimal::from(1_000),
                to_account: "b1".into(),
                decided_at: Timestamp::now(),
            },
            OutboundDetail {
                amount: Decimal::from(2_000),
                to_account: "b2".into(),
                decided_at: Timestamp::now(),
            },
        ];
        let outcome = anomaly_detect(
            &tx(Decimal::from(5_000)),
            &PatternStats {
                recent_count_10m: 0,
                beneficiary_count: 5,
                amount_stats_24h: AmountStats::default(),
            },
            &AnomalyStats {
                unique_beneficiaries_10m: 0,
                recent_tx_details_10m: details,
                hour_counts_7d: [0; 24],
            },
            &config,
            Timestamp::now(),
        );
        assert!(
            outcome
                .anti_patterns
                .iter()
                .any(|p| p.contains("Cluster"))
        );
    }
}
