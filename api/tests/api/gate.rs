use payloads::responses::GateErrorResponse;
use payloads::{Decision, ErrorCode};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use test_helpers::{spawn_app, transaction};

fn gate_error(text: &str) -> GateErrorResponse {
    serde_json::from_str(text).expect("gate rejection body is GateErrorResponse JSON")
}

#[tokio::test]
async fn eleventh_transaction_in_ten_minutes_blocks_on_velocity() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let now = app.time_source.now();

    for i in 0..10 {
        let tx = transaction(
            &format!("velocity-{i}"),
            "acct1",
            "beneficiary1",
            Decimal::from(50),
            now,
        );
        let response = app.client.scan(&tx).await?;
        // Velocity climbs across these 10 as recent_count_10m grows; only the
        // 11th is guaranteed to hit the block threshold.
        assert_ne!(response.ai_decision.decision, Decision::Block);
    }

    let eleventh = transaction("velocity-10", "acct1", "beneficiary1", Decimal::from(50), now);
    let response = app.client.scan(&eleventh).await?;
    assert_eq!(response.ai_decision.decision, Decision::Block);
    assert!(response.ai_decision.score >= 85);
    assert!(response.ai_decision.reason.to_lowercase().contains("velocity"));

    Ok(())
}

#[tokio::test]
async fn daily_limit_rejects_once_cumulative_total_is_exceeded() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let now = app.time_source.now();

    // Savings: single_tx_limit=5,000, daily_limit=10,000. Three transactions
    // each under the single-tx limit, but the third pushes the running daily
    // total past the limit.
    for (i, amount) in [4_000, 4_000].into_iter().enumerate() {
        let tx_id = format!("daily-{i}");
        let otp_req = payloads::requests::OtpRequest {
            transaction_id: tx_id.clone(),
            from_account: "acct2".to_string(),
            amount: Some(Decimal::from(amount)),
        };
        let otp = app.client.otp_request(&otp_req).await?.otp_demo;
        let mut tx = transaction(&tx_id, "acct2", "beneficiary2", Decimal::from(amount), now);
        tx.code = Some(otp);
        let response = app.client.scan(&tx).await?;
        assert_ne!(response.ai_decision.decision, Decision::Block);
    }

    let otp_req = payloads::requests::OtpRequest {
        transaction_id: "daily-2".to_string(),
        from_account: "acct2".to_string(),
        amount: Some(Decimal::from(4_000)),
    };
    let otp = app.client.otp_request(&otp_req).await?.otp_demo;
    let mut third = transaction("daily-2", "acct2", "beneficiary2", Decimal::from(4_000), now);
    third.code = Some(otp);

    let result = app.client.scan(&third).await;
    match result {
        Err(payloads::api_client::ClientError::APIError(status, text)) => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            let body = gate_error(&text);
            assert_eq!(body.error_code, ErrorCode::DailyLimitExceeded);
            assert_eq!(body.daily_used, Some(Decimal::from(8_000)));
            assert_eq!(body.daily_limit, Some(Decimal::from(10_000)));
        }
        other => panic!("expected a 400 DAILY_LIMIT_EXCEEDED, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn otp_is_required_above_threshold_and_consumed_once() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let now = app.time_source.now();

    let tx_id = "otp-flow";
    let mut tx = transaction(tx_id, "acct3", "beneficiary3", Decimal::from(500), now);

    // No code supplied for an amount above the OTP threshold.
    let result = app.client.scan(&tx).await;
    match result {
        Err(payloads::api_client::ClientError::APIError(status, text)) => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(gate_error(&text).error_code, ErrorCode::OtpRequired);
        }
        other => panic!("expected OTP_REQUIRED, got {other:?}"),
    }

    let otp = app
        .client
        .otp_request(&payloads::requests::OtpRequest {
            transaction_id: tx_id.to_string(),
            from_account: "acct3".to_string(),
            amount: Some(Decimal::from(500)),
        })
        .await?
        .otp_demo;

    tx.code = Some(otp.clone());
    let response = app.client.scan(&tx).await?;
    assert_ne!(response.ai_decision.decision, Decision::Block);

    // Same code cannot verify twice: a retry (same transaction_id, same code)
    // after the gate already allowed the first attempt is rejected.
    let retry_id = format!("{tx_id}-retry");
    let mut retry = tx.clone();
    retry.transaction_id = retry_id;
    retry.code = Some(otp);
    let result = app.client.scan(&retry).await;
    match result {
        Err(payloads::api_client::ClientError::APIError(status, text)) => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(gate_error(&text).error_code, ErrorCode::OtpInvalid);
        }
        other => panic!("expected OTP_INVALID on code reuse, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn concurrent_requests_against_the_same_account_cannot_bypass_the_daily_limit(
) -> anyhow::Result<()> {
    let app = spawn_app().await;
    let now = app.time_source.now();

    // Savings: single_tx_limit=5,000, daily_limit=10,000. Three concurrent
    // 4,000 transactions against the same account: at most two can be
    // admitted (8,000 <= 10,000); a third would push the total to 12,000.
    // If the daily-limit read and the history write weren't serialized
    // per account, all three could read daily_used=0 before any of them
    // persisted and all three would be admitted.
    let mut txs = Vec::new();
    for i in 0..3 {
        let tx_id = format!("concurrent-{i}");
        let otp_req = payloads::requests::OtpRequest {
            transaction_id: tx_id.clone(),
            from_account: "acct-concurrent".to_string(),
            amount: Some(Decimal::from(4_000)),
        };
        let otp = app.client.otp_request(&otp_req).await?.otp_demo;
        let mut tx = transaction(&tx_id, "acct-concurrent", "beneficiary-c", Decimal::from(4_000), now);
        tx.code = Some(otp);
        txs.push(tx);
    }

    let (r0, r1, r2) = tokio::join!(
        app.client.scan(&txs[0]),
        app.client.scan(&txs[1]),
        app.client.scan(&txs[2]),
    );

    let mut admitted = 0;
    let mut daily_limit_rejections = 0;
    for result in [r0, r1, r2] {
        match result {
            Ok(response) => {
                assert_ne!(response.ai_decision.decision, Decision::Block);
                admitted += 1;
            }
            Err(payloads::api_client::ClientError::APIError(status, text)) => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(gate_error(&text).error_code, ErrorCode::DailyLimitExceeded);
                daily_limit_rejections += 1;
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    assert_eq!(admitted, 2, "exactly two of the three 4,000 transactions should fit under the 10,000 daily limit");
    assert_eq!(daily_limit_rejections, 1);

    Ok(())
}

#[tokio::test]
async fn otp_expires_after_its_ttl() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let now = app.time_source.now();

    let otp = app
        .client
        .otp_request(&payloads::requests::OtpRequest {
            transaction_id: "otp-ttl".to_string(),
            from_account: "acct4".to_string(),
            amount: Some(Decimal::from(500)),
        })
        .await?
        .otp_demo;

    app.time_source.advance(jiff::Span::new().seconds(301));

    let mut tx = transaction("otp-ttl", "acct4", "beneficiary4", Decimal::from(500), now);
    tx.code = Some(otp);
    let result = app.client.scan(&tx).await;
    match result {
        Err(payloads::api_client::ClientError::APIError(status, text)) => {
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(gate_error(&text).error_code, ErrorCode::OtpInvalid);
        }
        other => panic!("expected OTP_INVALID after TTL expiry, got {other:?}"),
    }

    Ok(())
}
