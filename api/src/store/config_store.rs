//! A single mutable row of engine tunables. Readers
//! take one snapshot per request and pass it by value through the rest of
//! the pipeline, so a concurrent `PUT /config` never produces a decision
//! that mixes old and new thresholds.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::store::StoreError;

/// One fully-resolved snapshot of the tunable thresholds. Cheap to clone and
/// pass by value — that's the point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EngineConfig {
    pub velocity_block_threshold: i64,
    pub velocity_review_threshold: i64,
    pub velocity_warn_threshold: i64,
    pub new_beneficiary_high_amount: f64,
    pub new_beneficiary_med_amount: f64,
    pub new_beneficiary_low_amount: f64,
    pub amount_spike_multiplier_avg: f64,
    pub amount_spike_multiplier_max: f64,
    pub min_transactions_for_avg: i64,
    pub round_amount_tolerance: f64,
    pub round_amount_score: i64,
    pub off_hours_score: i64,
    pub unusual_hour_min_tx: i64,
    pub structuring_min_tx: i64,
    pub structuring_new_beneficiary_bonus: i64,
    pub recurring_beneficiary_min: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            velocity_block_threshold: 10,
            velocity_review_threshold: 5,
            velocity_warn_threshold: 3,
            new_beneficiary_high_amount: 10_000.0,
            new_beneficiary_med_amount: 5_000.0,
            new_beneficiary_low_amount: 1_000.0,
            amount_spike_multiplier_avg: 3.0,
            amount_spike_multiplier_max: 2.0,
            min_transactions_for_avg: 2,
            round_amount_tolerance: 0.01,
            round_amount_score: 20,
            off_hours_score: 25,
            unusual_hour_min_tx: 5,
            structuring_min_tx: 3,
            structuring_new_beneficiary_bonus: 15,
            recurring_beneficiary_min: 3,
        }
    }
}

/// One entry per key in `EngineConfig`. The set this macro generates is the
/// single source of truth for `UnknownKey` validation and for `get`/`update`.
macro_rules! config_keys {
    ($($field:ident : $ty:ty),* $(,)?) => {
        const CONFIG_KEYS: &[&str] = &[$(stringify!($field)),*];

        fn get_field(config: &EngineConfig, key: &str) -> Option<serde_json::Value> {
            match key {
                $(stringify!($field) => Some(serde_json::json!(config.$field)),)*
                _ => None,
            }
        }

        fn apply_update(
            config: &mut EngineConfig,
            key: &str,
            value: &serde_json::Value,
        ) -> Result<(), StoreError> {
            match key {
                $(
                    stringify!($field) => {
                        let parsed: $ty = serde_json::from_value(value.clone())
                            .map_err(|_| StoreError::UnknownKey(key.to_string()))?;
                        config.$field = parsed;
                    }
                )*
                _ => return Err(StoreError::UnknownKey(key.to_string())),
            }
            Ok(())
        }
    };
}

config_keys! {
    velocity_block_threshold: i64,
    velocity_review_threshold: i64,
    velocity_warn_threshold: i64,
    new_beneficiary_high_amount: f64,
    new_beneficiary_med_amount: f64,
    new_beneficiary_low_amount: f64,
    amount_spike_multiplier_avg: f64,
    amount_spike_multiplier_max: f64,
    min_transactions_for_avg: i64,
    round_amount_tolerance: f64,
    round_amount_score: i64,
    off_hours_score: i64,
    unusual_hour_min_tx: i64,
    structuring_min_tx: i64,
    structuring_new_beneficiary_bonus: i64,
    recurring_beneficiary_min: i64,
}

async fn load(pool: &SqlitePool) -> Result<EngineConfig, StoreError> {
    let config = sqlx::query_as::<_, EngineConfig>(
        "SELECT velocity_block_threshold, velocity_review_threshold,
                velocity_warn_threshold, new_beneficiary_high_amount,
                new_beneficiary_med_amount, new_beneficiary_low_amount,
                amount_spike_multiplier_avg, amount_spike_multiplier_max,
                min_transactions_for_avg, round_amount_tolerance,
                round_amount_score, off_hours_score, unusual_hour_min_tx,
                structuring_min_tx, structuring_new_beneficiary_bonus,
                recurring_beneficiary_min
         FROM engine_config WHERE id = 1",
    )
    .fetch_one(pool)
    .await?;
    Ok(config)
}

/// The snapshot read every `scan`/`evaluate` call takes at the top of the
/// pipeline.
pub async fn get_all(pool: &SqlitePool) -> Result<EngineConfig, StoreError> {
    load(pool).await
}

pub async fn get(
    key: &str,
    pool: &SqlitePool,
) -> Result<serde_json::Value, StoreError> {
    let config = load(pool).await?;
    get_field(&config, key).ok_or_else(|| StoreError::UnknownKey(key.to_string()))
}

/// Apply a partial update atomically: every key in `partial` is validated
/// before anything is written, so a request with one bad key changes nothing.
pub async fn update(
    partial: &std::collections::HashMap<String, serde_json::Value>,
    pool: &SqlitePool,
) -> Result<EngineConfig, StoreError> {
    for key in partial.keys() {
        if !CONFIG_KEYS.contains(&key.as_str()) {
            return Err(StoreError::UnknownKey(key.clone()));
        }
    }

    let mut config = load(pool).await?;
    for (key, value) in partial {
        apply_update(&mut config, key, value)?;
    }

    sqlx::query(
        "UPDATE engine_config SET
            velocity_block_threshold = ?, velocity_review_threshold = ?,
            velocity_warn_threshold = ?, new_beneficiary_high_amount = ?,
            new_beneficiary_med_amount = ?, new_beneficiary_low_amount = ?,
            amount_spike_multiplier_avg = ?, amount_spike_multiplier_max = ?,
            min_transactions_for_avg = ?, round_amount_tolerance = ?,
            round_amount_score = ?, off_hours_score = ?,
            unusual_hour_min_tx = ?, structuring_min_tx = ?,
            structuring_new_beneficiary_bonus = ?, recurring_beneficiary_min = ?
         WHERE id = 1",
    )
    .bind(config.velocity_block_threshold)
    .bind(config.velocity_review_threshold)
    .bind(config.velocity_warn_threshold)
    .bind(config.new_beneficiary_high_amount)
    .bind(config.new_beneficiary_med_amount)
    .bind(config.new_beneficiary_low_amount)
    .bind(config.amount_spike_multiplier_avg)
    .bind(config.amount_spike_multiplier_max)
    .bind(config.min_transactions_for_avg)
    .bind(config.round_amount_tolerance)
    .bind(config.round_amount_score)
    .bind(config.off_hours_score)
    .bind(config.unusual_hour_min_tx)
    .bind(config.structuring_min_tx)
    .bind(config.structuring_new_beneficiary_bonus)
    .bind(config.recurring_beneficiary_min)
    .execute(pool)
    .await?;

    Ok(config)
}
