use payloads::Decision;
use rust_decimal::Decimal;
use test_helpers::{spawn_app, transaction};

#[tokio::test]
async fn micro_transaction_fast_tracks_to_allow() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let now = app.time_source.now();

    let tx = transaction("micro-1", "acct-micro", "beneficiary", Decimal::from(10), now);
    let response = app.client.scan(&tx).await?;

    assert_eq!(response.ai_decision.decision, Decision::Allow);
    assert_eq!(response.ai_decision.score, 1);
    assert!(response.ai_decision.reason.contains("Micro-transaction"));

    Ok(())
}

#[tokio::test]
async fn new_beneficiary_with_large_amount_reviews() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let now = app.time_source.now();

    let otp = app
        .client
        .otp_request(&payloads::requests::OtpRequest {
            transaction_id: "new-ben-1".to_string(),
            from_account: "acct-newben".to_string(),
            amount: Some(Decimal::from(12_000)),
        })
        .await?
        .otp_demo;

    // Premium so the single-tx limit doesn't reject a 12,000 transfer.
    app.set_account_type("acct-newben", payloads::AccountType::Premium)
        .await?;

    let mut tx = transaction("new-ben-1", "acct-newben", "brand-new-beneficiary", Decimal::from(12_000), now);
    tx.code = Some(otp);
    let response = app.client.scan(&tx).await?;

    assert_ne!(response.ai_decision.decision, Decision::Allow);
    assert!(response.ai_decision.score >= 50);

    Ok(())
}

#[tokio::test]
async fn middleware_check_mirrors_scan_pipeline() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let now = app.time_source.now();

    let tx = transaction("mw-check-1", "acct-mw", "beneficiary", Decimal::from(10), now);
    let response = app.client.middleware_check(&tx).await?;

    assert_eq!(response.decision, Decision::Allow);
    assert_eq!(response.score, 1);

    Ok(())
}

#[tokio::test]
async fn middleware_evaluate_skips_the_limits_gate() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let now = app.time_source.now();

    // Amount above the single-tx limit and above the OTP threshold, with no
    // code at all: /scan would 400, but /middleware/evaluate only scores.
    let tx = transaction("mw-eval-1", "acct-mw2", "beneficiary", Decimal::from(999_999), now);
    let response = app.client.middleware_evaluate(&tx).await?;

    assert_eq!(response.decision, Decision::Block);

    Ok(())
}
