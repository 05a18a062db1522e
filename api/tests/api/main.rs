mod config;
mod gate;
mod hitl;
mod indicators;
mod scan;
mod security_headers;

#[tokio::test]
async fn health_check() -> anyhow::Result<()> {
    let app = test_helpers::spawn_app().await;

    app.client.health_check().await?;

    Ok(())
}
