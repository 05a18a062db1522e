pub mod config;
pub mod limits;
pub mod lookup;
pub mod otp;
pub mod review;
pub mod scan;

use actix_web::{
    HttpResponse, Responder, ResponseError, body::BoxBody,
    dev::HttpServiceFactory, get, web,
};
use payloads::ErrorCode;

use crate::store::StoreError;

pub fn api_services() -> impl HttpServiceFactory {
    web::scope("/api")
        .service(health_check)
        .service(scan::scan)
        .service(scan::middleware_check)
        .service(scan::middleware_evaluate)
        .service(review::review)
        .service(otp::request_otp)
        .service(lookup::lookup)
        .service(lookup::lookup_indicators)
        .service(limits::get_limits)
        .service(limits::set_account_type)
        .service(config::get_config)
        .service(config::get_config_key)
        .service(config::update_config)
}

#[get("/health")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(payloads::responses::HealthResponse {
        status: "ok".to_string(),
        service: "fraud-middleware".to_string(),
    })
}

/// The HTTP boundary's single error type. `StoreError` is mapped into this
/// centrally so handlers never hand-roll status codes.
#[derive(Debug, thiserror::Error)]
pub enum APIError {
    #[error("bad request")]
    BadRequest { code: ErrorCode, message: String },
    #[error("not found")]
    NotFound(String),
    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

impl ResponseError for APIError {
    fn error_response(&self) -> HttpResponse<BoxBody> {
        match self {
            Self::BadRequest { code, message } => {
                HttpResponse::BadRequest().json(ErrorBody {
                    error_code: *code,
                    message: message.clone(),
                })
            }
            Self::NotFound(message) => HttpResponse::NotFound().json(ErrorBody {
                error_code: ErrorCode::NotFound,
                message: message.clone(),
            }),
            Self::Internal(e) => {
                tracing::error!("{e:#}");
                HttpResponse::InternalServerError().json(ErrorBody {
                    error_code: ErrorCode::Internal,
                    message: "internal error".to_string(),
                })
            }
        }
    }
}

#[derive(serde::Serialize)]
struct ErrorBody {
    error_code: ErrorCode,
    message: String,
}

impl From<StoreError> for APIError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UnknownKey(key) => APIError::BadRequest {
                code: ErrorCode::UnknownConfigKey,
                message: format!("unknown config key: {key}"),
            },
            StoreError::InvalidType(t) => APIError::BadRequest {
                code: ErrorCode::InvalidAccountType,
                message: format!("invalid account type: {t}"),
            },
            StoreError::TransactionNotFound(id) => {
                APIError::NotFound(format!("transaction {id} not found"))
            }
            StoreError::CaseNotFound(id) => {
                APIError::NotFound(format!("case {id} not found"))
            }
            StoreError::Database(_) | StoreError::Migration(_) => {
                APIError::Internal(e.into())
            }
        }
    }
}

impl From<anyhow::Error> for APIError {
    fn from(e: anyhow::Error) -> Self {
        APIError::Internal(e)
    }
}
