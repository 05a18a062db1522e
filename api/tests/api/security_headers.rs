use test_helpers::spawn_app;

#[tokio::test]
async fn api_endpoints_carry_no_store_cache_headers() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let url = format!("{}/api/limits/some-account", app.client.address);
    let response = app.client.inner_client.get(&url).send().await?;

    let headers = response.headers();
    let cache_control = headers.get("cache-control").expect("present").to_str()?;
    assert!(cache_control.contains("no-store"));
    assert!(cache_control.contains("no-cache"));
    assert_eq!(headers.get("pragma").expect("present").to_str()?, "no-cache");
    assert_eq!(headers.get("expires").expect("present").to_str()?, "0");

    Ok(())
}

#[tokio::test]
async fn health_check_has_no_security_headers() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let url = format!("{}/api/health", app.client.address);
    let response = app.client.inner_client.get(&url).send().await?;

    assert!(response.headers().get("cache-control").is_none());

    Ok(())
}
