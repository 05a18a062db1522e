pub mod account_lock;
pub mod advisory;
pub mod case_lock;
pub mod code_store;
pub mod engine;
pub mod gate;
pub mod indicators;
pub mod orchestrator;
pub mod routes;
pub mod store;
pub mod telemetry;
pub mod time;

use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::{App, HttpServer, web};
use sqlx::SqlitePool;
use std::net::TcpListener;

use crate::account_lock::AccountLocks;
use crate::advisory::RuleBasedEvaluator;
use crate::case_lock::CaseLocks;
use crate::code_store::CodeStore;
use crate::time::TimeSource;

/// Build the server, but not await it.
///
/// Returns the port that the server has bound to by modifying the config.
pub async fn build(
    config: &mut Config,
    time_source: TimeSource,
    history_pool: SqlitePool,
    checkpoints_pool: SqlitePool,
) -> std::io::Result<Server> {
    let time_source = web::Data::new(time_source);
    let history_pool = web::Data::new(history_pool);
    let advisory = web::Data::new(RuleBasedEvaluator::new(checkpoints_pool));
    let code_store = web::Data::new(CodeStore::new());
    let case_locks = web::Data::new(CaseLocks::new());
    let account_locks = web::Data::new(AccountLocks::new());

    let allowed_origins = config.allowed_origins.clone();
    let app_config = web::Data::new(AppConfig {
        advisory_timeout_seconds: config.advisory_timeout_seconds,
    });

    // OS assigns the port if binding to 0
    let listener = TcpListener::bind(format!("{}:{}", config.ip, config.port))?;
    config.port = listener.local_addr()?.port();
    let server = HttpServer::new(move || {
        let cors = if allowed_origins.contains(&"*".to_string()) {
            Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .supports_credentials()
        } else {
            let mut cors = Cors::default()
                .allow_any_method()
                .allow_any_header()
                .supports_credentials();

            for origin in &allowed_origins {
                cors = cors.allowed_origin(origin);
            }
            cors
        };

        App::new()
            .wrap(cors)
            .wrap(SecurityHeadersMiddleware)
            .service(routes::api_services())
            .app_data(history_pool.clone())
            .app_data(time_source.clone())
            .app_data(advisory.clone())
            .app_data(code_store.clone())
            .app_data(case_locks.clone())
            .app_data(account_locks.clone())
            .app_data(app_config.clone())
    })
    .listen(listener)?
    .run();
    Ok(server)
}

/// Configuration loaded from environment variables at startup.
/// Used only during server initialization, not shared as app_data.
pub struct Config {
    pub app_name: String,
    pub log_level: String,
    pub db_path: String,
    pub checkpoints_db_path: String,
    /// set to "0.0.0.0" for public access, "127.0.0.1" for local dev
    pub ip: String,
    /// set to 0 to get an os-assigned port
    pub port: u16,
    /// List of allowed CORS origins. Use "*" to allow any origin (development only)
    pub allowed_origins: Vec<String>,
    /// Deadline for an advisory evaluator call, in seconds.
    pub advisory_timeout_seconds: u64,
}

/// Runtime configuration shared across the application as app_data.
/// Contains only the fields needed by route handlers at runtime.
pub struct AppConfig {
    pub advisory_timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> Self {
        use std::env::var;

        let allowed_origins = var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string()) // Default to allow any origin for development
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Config {
            app_name: var("APP_NAME")
                .unwrap_or_else(|_| "fraud-middleware".to_string()),
            log_level: var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: var("DB_PATH").unwrap_or_else(|_| "history.db".to_string()),
            checkpoints_db_path: var("CHECKPOINTS_DB_PATH")
                .unwrap_or_else(|_| "checkpoints.db".to_string()),
            ip: var("IP_ADDRESS").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            allowed_origins,
            advisory_timeout_seconds: var("ADVISORY_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

/// Middleware to add security headers to API responses
use actix_web::{
    Error,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{CACHE_CONTROL, EXPIRES, HeaderValue, PRAGMA},
};
use std::{
    future::{Ready, ready},
    pin::Pin,
    rc::Rc,
};

type LocalBoxFuture<T> = Pin<Box<dyn std::future::Future<Output = T>>>;

pub struct SecurityHeadersMiddleware;

impl<S, B> Transform<S, ServiceRequest> for SecurityHeadersMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>
        + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = SecurityHeadersMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SecurityHeadersMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct SecurityHeadersMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SecurityHeadersMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>
        + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            let is_api_endpoint = req.path().starts_with("/api")
                && req.path() != "/api/health";

            let res = service.call(req).await?;

            if is_api_endpoint {
                let (req, mut res) = res.into_parts();

                res.headers_mut().insert(
                    CACHE_CONTROL,
                    HeaderValue::from_static(
                        "no-store, no-cache, must-revalidate, private",
                    ),
                );
                res.headers_mut()
                    .insert(PRAGMA, HeaderValue::from_static("no-cache"));
                res.headers_mut()
                    .insert(EXPIRES, HeaderValue::from_static("0"));

                Ok(ServiceResponse::new(req, res))
            } else {
                Ok(res)
            }
        })
    }
}
