use tracing::Subscriber;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt};

/// Compose the env-filter and formatting layers into one subscriber.
///
/// We are using `impl Subscriber` as return type to avoid having to spell out
/// the actual type, which is indeed quite complex. We need to explicitly call
/// out that the returned subscriber is `Send` and `Sync` to make it possible
/// to pass it to `init_subscriber` later on.
///
/// The filter is read from `LOG_LEVEL`, falling back to `default_level`.
/// Spans are written to stderr so they never interleave with anything a
/// caller might pipe from stdout.
pub fn get_subscriber(default_level: String) -> impl Subscriber + Send + Sync {
    let env_filter = EnvFilter::try_from_env("LOG_LEVEL")
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    let formatting_layer =
        tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    Registry::default().with(env_filter).with(formatting_layer)
}

/// Register a subscriber as global default to process span data.
///
/// Should only be called once.
pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) {
    tracing_log::LogTracer::init().expect("Failed to set logger");
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set subscriber");
}

/// Log an error using the alternate selector, which renders its full causal
/// chain.
pub fn log_error(e: impl Into<anyhow::Error>) {
    let e: anyhow::Error = e.into();
    tracing::error!("{e:#}");
}
