use std::sync::atomic::{AtomicU64, Ordering};

use api::store::{connect_pool, run_checkpoint_migrations, run_history_migrations};
use api::time::TimeSource;
use api::{Config, telemetry};
use jiff::Timestamp;
use payloads::api_client::APIClient;
use payloads::{AccountType, Transaction};
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use tracing_log::LogTracer;
use tracing_subscriber::util::SubscriberInitExt;

pub struct TestApp {
    #[allow(unused)]
    pub port: u16,
    pub history_pool: SqlitePool,
    pub checkpoints_pool: SqlitePool,
    pub client: APIClient,
    pub time_source: TimeSource,
}

impl TestApp {
    pub async fn set_account_type(
        &self,
        account_id: &str,
        account_type: AccountType,
    ) -> anyhow::Result<()> {
        self.client
            .set_account_type(
                account_id,
                &payloads::requests::SetAccountType {
                    account_type: account_type.to_string(),
                },
            )
            .await?;
        Ok(())
    }

    pub async fn otp_for(&self, tx: &Transaction) -> anyhow::Result<String> {
        let response = self
            .client
            .otp_request(&payloads::requests::OtpRequest {
                transaction_id: tx.transaction_id.clone(),
                from_account: tx.from_account.clone(),
                amount: Some(tx.amount),
            })
            .await?;
        Ok(response.otp_demo)
    }
}

/// Use OS-assigned port for parallel testing.
pub async fn spawn_app() -> TestApp {
    spawn_app_on_port(0).await
}

pub async fn spawn_app_on_port(port: u16) -> TestApp {
    let subscriber = telemetry::get_subscriber("error".into());
    let _ = LogTracer::init();
    let _ = subscriber.try_init();

    #[cfg(any(feature = "mock-time", test))]
    let time_source = TimeSource::new("2025-01-01T00:00:00Z".parse().unwrap());
    #[cfg(not(any(feature = "mock-time", test)))]
    let time_source = TimeSource::new();

    let (history_path, checkpoints_path) = unique_db_paths();

    let history_pool = connect_pool(&history_path).await.unwrap();
    run_history_migrations(&history_pool).await.unwrap();

    let checkpoints_pool = connect_pool(&checkpoints_path).await.unwrap();
    run_checkpoint_migrations(&checkpoints_pool).await.unwrap();

    let mut config = Config {
        app_name: "fraud-middleware-test".to_string(),
        log_level: "error".to_string(),
        db_path: history_path,
        checkpoints_db_path: checkpoints_path,
        ip: "127.0.0.1".into(),
        port,
        allowed_origins: vec!["*".to_string()],
        advisory_timeout_seconds: 30,
    };

    let reqwest_client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .cookie_store(true)
        .build()
        .unwrap();

    let server = api::build(
        &mut config,
        time_source.clone(),
        history_pool.clone(),
        checkpoints_pool.clone(),
    )
    .await
    .unwrap();
    tokio::spawn(server);

    TestApp {
        port: config.port,
        history_pool,
        checkpoints_pool,
        client: APIClient {
            address: format!("http://127.0.0.1:{}", config.port),
            inner_client: reqwest_client,
        },
        time_source,
    }
}

/// Each test gets its own pair of temp-file SQLite databases so tests never
/// interleave history. Files are left behind in the OS temp directory rather
/// than cleaned up — harmless, and lets a failed test's database be inspected.
fn unique_db_paths() -> (String, String) {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir();
    let history = dir.join(format!("fraud-gateway-test-{}-{n}-history.db", std::process::id()));
    let checkpoints = dir.join(format!(
        "fraud-gateway-test-{}-{n}-checkpoints.db",
        std::process::id()
    ));
    (
        history.to_string_lossy().into_owned(),
        checkpoints.to_string_lossy().into_owned(),
    )
}

pub fn transaction(
    transaction_id: &str,
    from_account: &str,
    to_account: &str,
    amount: Decimal,
    timestamp: Timestamp,
) -> Transaction {
    Transaction {
        transaction_id: transaction_id.to_string(),
        from_account: from_account.to_string(),
        to_account: to_account.to_string(),
        amount,
        timestamp,
        ip_address: "127.0.0.1".to_string(),
        device_id: "".to_string(),
        code: None,
    }
}

pub fn assert_status_code<T>(
    result: Result<T, payloads::api_client::ClientError>,
    expected: reqwest::StatusCode,
) {
    match result {
        Err(payloads::api_client::ClientError::APIError(code, _)) => {
            assert_eq!(code, expected)
        }
        _ => panic!("Expected APIError"),
    };
}
