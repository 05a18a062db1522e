use api::{
    Config, build,
    store::{connect_pool, run_checkpoint_migrations, run_history_migrations},
    telemetry::{get_subscriber, init_subscriber},
    time::TimeSource,
};

/// Fraud-decision gateway server.
///
/// Environment variables can be set directly or loaded from a .env file in
/// the project root.
///
/// - `APP_NAME`: service name reported by `/health` (default "fraud-middleware")
/// - `LOG_LEVEL`: tracing filter (default "info")
/// - `DB_PATH`: SQLite file for decided transactions, config, and account types
/// - `CHECKPOINTS_DB_PATH`: SQLite file for in-flight advisory case state
/// - `IP_ADDRESS`: bind address (127.0.0.1 for local, 0.0.0.0 for public)
/// - `PORT`: bind port (0 lets the OS assign one)
/// - `ALLOWED_ORIGINS`: CORS origins ("*" for any origin, or a comma-separated list)
/// - `ADVISORY_TIMEOUT_SECONDS`: deadline for the advisory evaluator (default 30)
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenvy::dotenv();

    let mut config = Config::from_env();

    let subscriber = get_subscriber(config.log_level.clone());
    init_subscriber(subscriber);

    let history_pool = connect_pool(&config.db_path)
        .await
        .expect("failed to open history database");
    run_history_migrations(&history_pool)
        .await
        .expect("failed to run history migrations");

    let checkpoints_pool = connect_pool(&config.checkpoints_db_path)
        .await
        .expect("failed to open checkpoints database");
    run_checkpoint_migrations(&checkpoints_pool)
        .await
        .expect("failed to run checkpoint migrations");

    #[cfg(not(feature = "mock-time"))]
    let time_source = TimeSource::new();
    #[cfg(feature = "mock-time")]
    let time_source = TimeSource::new(jiff::Timestamp::now());

    let server = build(&mut config, time_source, history_pool, checkpoints_pool).await?;
    server.await
}
