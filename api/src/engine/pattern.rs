//! History-driven scoring (velocity, new beneficiary, amount spike) against
//! a consolidated stats read (`store::history::PatternStats`).

use payloads::{Decision, Transaction};
use rust_decimal::Decimal;

use crate::store::config_store::EngineConfig;
use crate::store::history::PatternStats;

use super::clamp_score;

pub struct PatternOutcome {
    pub decision: Decision,
    pub score: i32,
    pub reasons: Vec<String>,
}

/// Score a transaction against its account's recent history.
pub fn pattern_check(
    tx: &Transaction,
    stats: &PatternStats,
    config: &EngineConfig,
) -> PatternOutcome {
    let mut score = 0i32;
    let mut reasons = Vec::new();
    let mut decision = Decision::Allow;

    // Velocity.
    if stats.recent_count_10m >= config.velocity_block_threshold {
        score += 85;
        decision = decision.escalate(Decision::Block);
        reasons.push("High velocity: too many transactions in 10 minutes".to_string());
    } else if stats.recent_count_10m >= config.velocity_review_threshold {
        score += 40;
        decision = decision.escalate(Decision::Review);
        reasons.push("Elevated velocity".to_string());
    } else if stats.recent_count_10m >= config.velocity_warn_threshold {
        score += 20;
        reasons.push("Mild velocity increase".to_string());
    }

    // New beneficiary.
    if stats.beneficiary_count == 0 {
        if tx.amount > Decimal::try_from(config.new_beneficiary_high_amount).unwrap() {
            score += 50;
            decision = decision.escalate(Decision::Review);
            reasons.push("New beneficiary + high amount".to_string());
        } else if tx.amount
            > Decimal::try_from(config.new_beneficiary_med_amount).unwrap()
        {
            score += 35;
            decision = decision.escalate(Decision::Review);
            reasons.push("New beneficiary + medium amount".to_string());
        } else if tx.amount
            > Decimal::try_from(config.new_beneficiary_low_amount).unwrap()
        {
            score += 25;
            reasons.push("New beneficiary + notable amount".to_string());
        }
    }

    // Amount spike.
    let amount_stats = &stats.amount_stats_24h;
    if amount_stats.count >= config.min_transactions_for_avg
        && amount_stats.avg > Decimal::ZERO
    {
        let spike_avg = Decimal::try_from(config.amount_spike_multiplier_avg)
            .unwrap()
            * amount_stats.avg;
        if tx.amount > spike_avg {
            score += 30;
            decision = decision.escalate(Decision::Review);
            reasons.push("Amount spike vs. recent average".to_string());
        }
        if amount_stats.max > Decimal::ZERO {
            let spike_max =
                Decimal::try_from(config.amount_spike_multiplier_max).unwrap()
                    * amount_stats.max;
            if tx.amount > spike_max {
                score += 25;
                reasons.push("Amount spike vs. recent max".to_string());
            }
        }
    }

    let score = clamp_score(score);
    if score >= 80 {
        decision = Decision::Block;
    } else if score >= 50 {
        decision = decision.escalate(Decision::Review);
    }

    PatternOutcome {
        decision,
        score,
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::history::AmountStats;
    use jiff::Timestamp;

    fn tx(amount: Decimal) -> Transaction {
        Transaction {
            transaction_id: "tx1".into(),
            from_account: "acct1".into(),
            to_account: "newben".into(),
            amount,
            timestamp: Timestamp::now(),
            ip_address: "127.0.0.1".into(),
            device_id: "".into(),
            code: None,
        }
    }

    #[test]
    fn velocity_block_threshold_blocks() {
        let config = EngineConfig::default();
        let stats = PatternStats {
            recent_count_10m: 10,
            beneficiary_count: 1,
            amount_stats_24h: AmountStats::default(),
        };
        let outcome = pattern_check(&tx(Decimal::from(50)), &stats, &config);
        assert_eq!(outcome.decision, Decision::Block);
        assert!(outcome.score >= 85);
    }

    #[test]
    fn new_beneficiary_large_amount_reviews() {
        let config = EngineConfig::default();
        let stats = PatternStats {
            recent_count_10m: 0,
            beneficiary_count: 0,
            amount_stats_24h: AmountStats::default(),
        };
        let outcome = pattern_check(&tx(Decimal::from(12_000)), &stats, &config);
        assert_eq!(outcome.decision, Decision::Review);
        assert!(outcome.score >= 50);
        assert!(outcome.reasons.iter().any(|r| r.contains("New beneficiary")));
    }

    #[test]
    fn amount_spike_vs_average_reviews() {
        let config = EngineConfig::default();
        let stats = PatternStats {
            recent_count_10m: 0,
            beneficiary_count: 3,
            amount_stats_24h: AmountStats {
                avg: Decimal::from(100),
                max: Decimal::from(150),
                count: 5,
            },
        };
        let outcome = pattern_check(&tx(Decimal::from(1_000)), &stats, &config);
        assert_eq!(outcome.decision, Decision::Review);
    }
}
