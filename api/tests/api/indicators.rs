use payloads::responses::{IndicatorStatus, RiskLevel};
use payloads::AccountType;
use rust_decimal::Decimal;
use test_helpers::{spawn_app, transaction};

#[tokio::test]
async fn fresh_account_has_low_risk_and_zero_usage() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let indicators = app.client.lookup_indicators("fresh-account").await?;

    assert_eq!(indicators.risk_level, RiskLevel::Low);
    assert_eq!(indicators.limits.account_type, AccountType::Savings);
    assert_eq!(indicators.limits.daily_used, Decimal::ZERO);
    assert_eq!(indicators.limits.daily_remaining, indicators.limits.daily_limit);
    assert!(indicators.anti_patterns.is_empty());

    let velocity = indicators
        .indicators
        .iter()
        .find(|i| i.name == "10-minute velocity")
        .expect("velocity indicator present");
    assert_eq!(velocity.status, IndicatorStatus::Ok);

    Ok(())
}

#[tokio::test]
async fn elevated_velocity_raises_risk_level() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let now = app.time_source.now();

    for i in 0..6 {
        let tx = transaction(
            &format!("indicator-velocity-{i}"),
            "busy-account",
            "beneficiary",
            Decimal::from(50),
            now,
        );
        app.client.scan(&tx).await?;
    }

    let indicators = app.client.lookup_indicators("busy-account").await?;
    assert_ne!(indicators.risk_level, RiskLevel::Low);
    assert!(
        indicators
            .anti_patterns
            .iter()
            .any(|p| p.to_lowercase().contains("velocity"))
    );

    Ok(())
}

#[tokio::test]
async fn daily_usage_tracks_settled_transactions() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let now = app.time_source.now();

    let otp = app
        .client
        .otp_request(&payloads::requests::OtpRequest {
            transaction_id: "usage-check".to_string(),
            from_account: "usage-account".to_string(),
            amount: Some(Decimal::from(2_000)),
        })
        .await?
        .otp_demo;

    let mut tx = transaction("usage-check", "usage-account", "beneficiary", Decimal::from(2_000), now);
    tx.code = Some(otp);
    let result = app.client.scan(&tx).await?;
    assert_ne!(result.ai_decision.decision, payloads::Decision::Block);

    let indicators = app.client.lookup_indicators("usage-account").await?;
    assert_eq!(indicators.limits.daily_used, Decimal::from(2_000));

    Ok(())
}
