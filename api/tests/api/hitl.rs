use payloads::responses::ReviewStatus;
use payloads::{AccountType, Decision, ReviewAction};
use rust_decimal::Decimal;
use test_helpers::{spawn_app, transaction};

#[tokio::test]
async fn approving_a_pending_review_resolves_to_allow_and_is_terminal() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let now = app.time_source.now();

    let otp = app
        .client
        .otp_request(&payloads::requests::OtpRequest {
            transaction_id: "hitl-1".to_string(),
            from_account: "acct-hitl".to_string(),
            amount: Some(Decimal::from(12_000)),
        })
        .await?
        .otp_demo;
    app.set_account_type("acct-hitl", AccountType::Premium).await?;

    let mut tx = transaction("hitl-1", "acct-hitl", "brand-new-beneficiary", Decimal::from(12_000), now);
    tx.code = Some(otp);
    let scanned = app.client.scan(&tx).await?;
    assert_eq!(scanned.ai_decision.decision, Decision::PendingReview);

    let resolved = app
        .client
        .review(
            "hitl-1",
            &payloads::requests::ReviewRequest {
                action: ReviewAction::Approve,
                reason: "confirmed with customer by phone".to_string(),
            },
        )
        .await?;
    assert_eq!(resolved.status, ReviewStatus::Processed);

    let history = app.client.lookup("acct-hitl").await?;
    let record = history
        .iter()
        .find(|h| h.transaction_id == "hitl-1")
        .expect("resolved transaction appears in history");
    assert_eq!(record.decision, Decision::Allow);

    let second = app
        .client
        .review(
            "hitl-1",
            &payloads::requests::ReviewRequest {
                action: ReviewAction::Approve,
                reason: "duplicate click".to_string(),
            },
        )
        .await?;
    assert_eq!(second.status, ReviewStatus::AlreadyProcessed);

    Ok(())
}

#[tokio::test]
async fn declining_a_pending_review_resolves_to_block() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let now = app.time_source.now();

    let otp = app
        .client
        .otp_request(&payloads::requests::OtpRequest {
            transaction_id: "hitl-2".to_string(),
            from_account: "acct-hitl2".to_string(),
            amount: Some(Decimal::from(12_000)),
        })
        .await?
        .otp_demo;
    app.set_account_type("acct-hitl2", AccountType::Premium).await?;

    let mut tx = transaction("hitl-2", "acct-hitl2", "brand-new-beneficiary", Decimal::from(12_000), now);
    tx.code = Some(otp);
    let scanned = app.client.scan(&tx).await?;
    assert_eq!(scanned.ai_decision.decision, Decision::PendingReview);

    app.client
        .review(
            "hitl-2",
            &payloads::requests::ReviewRequest {
                action: ReviewAction::Decline,
                reason: "beneficiary could not be verified".to_string(),
            },
        )
        .await?;

    let history = app.client.lookup("acct-hitl2").await?;
    let record = history
        .iter()
        .find(|h| h.transaction_id == "hitl-2")
        .expect("resolved transaction appears in history");
    assert_eq!(record.decision, Decision::Block);

    Ok(())
}

#[tokio::test]
async fn review_on_unknown_transaction_is_not_found() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let result = app
        .client
        .review(
            "never-scanned",
            &payloads::requests::ReviewRequest {
                action: ReviewAction::Approve,
                reason: "n/a".to_string(),
            },
        )
        .await;

    test_helpers::assert_status_code(result, reqwest::StatusCode::NOT_FOUND);

    Ok(())
}
