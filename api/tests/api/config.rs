use payloads::{AccountType, ErrorCode};
use rust_decimal::Decimal;
use std::collections::HashMap;
use test_helpers::spawn_app;

#[tokio::test]
async fn config_round_trips_a_partial_update() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let before = app.client.get_config().await?;
    let original_threshold = before.0["velocity_block_threshold"].clone();
    assert_eq!(original_threshold, serde_json::json!(10));

    let mut update = HashMap::new();
    update.insert("velocity_block_threshold".to_string(), serde_json::json!(20));
    let after = app
        .client
        .update_config(&payloads::requests::ConfigUpdate(update))
        .await?;
    assert_eq!(after.0["velocity_block_threshold"], serde_json::json!(20));

    let reloaded = app.client.get_config().await?;
    assert_eq!(reloaded.0["velocity_block_threshold"], serde_json::json!(20));

    Ok(())
}

#[tokio::test]
async fn config_update_rejects_unknown_key() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let mut update = HashMap::new();
    update.insert("totally_made_up_key".to_string(), serde_json::json!(1));
    let result = app
        .client
        .update_config(&payloads::requests::ConfigUpdate(update))
        .await;

    match result {
        Err(payloads::api_client::ClientError::APIError(status, text)) => {
            assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
            assert!(text.contains(&ErrorCode::UnknownConfigKey.to_string()));
        }
        other => panic!("expected UNKNOWN_CONFIG_KEY, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn account_type_defaults_to_savings_and_can_be_changed() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let limits = app.client.get_limits("fresh-limits-account").await?;
    assert_eq!(limits.account_type, AccountType::Savings);
    assert_eq!(limits.single_tx_limit, Decimal::from(5_000));
    assert_eq!(limits.daily_limit, Decimal::from(10_000));

    app.set_account_type("fresh-limits-account", AccountType::Checking)
        .await?;

    let updated = app.client.get_limits("fresh-limits-account").await?;
    assert_eq!(updated.account_type, AccountType::Checking);
    assert_eq!(updated.single_tx_limit, Decimal::from(25_000));

    Ok(())
}

#[tokio::test]
async fn setting_an_invalid_account_type_is_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let result = app
        .client
        .set_account_type(
            "some-account",
            &payloads::requests::SetAccountType {
                account_type: "GOLD".to_string(),
            },
        )
        .await;

    match result {
        Err(payloads::api_client::ClientError::APIError(status, _)) => {
            assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
        }
        other => panic!("expected INVALID_ACCOUNT_TYPE, got {other:?}"),
    }

    Ok(())
}
