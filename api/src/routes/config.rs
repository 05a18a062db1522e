use actix_web::{HttpResponse, get, put, web};
use payloads::requests::ConfigUpdate;
use payloads::responses::ConfigResponse;
use serde_json::json;
use sqlx::SqlitePool;

use crate::store::config_store;

use super::APIError;

/// `GET /config`: every tunable, as a flat key/value map.
#[tracing::instrument(skip(pool), ret)]
#[get("/config")]
pub async fn get_config(pool: web::Data<SqlitePool>) -> Result<HttpResponse, APIError> {
    let config = config_store::get_all(&pool).await?;
    let value = serde_json::to_value(config).expect("EngineConfig always serializes");
    let map = value
        .as_object()
        .expect("EngineConfig serializes to a JSON object")
        .clone()
        .into_iter()
        .collect();
    Ok(HttpResponse::Ok().json(ConfigResponse(map)))
}

/// `GET /config/{key}`: a single tunable.
#[tracing::instrument(skip(pool), ret)]
#[get("/config/{key}")]
pub async fn get_config_key(
    key: web::Path<String>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, APIError> {
    let value = config_store::get(&key, &pool).await?;
    Ok(HttpResponse::Ok().json(json!({ key.as_str(): value })))
}

/// `PUT /config`: apply a partial update. Any unrecognized key rejects the
/// whole request with `UNKNOWN_CONFIG_KEY` before anything is written.
#[tracing::instrument(skip(pool), ret)]
#[put("/config")]
pub async fn update_config(
    body: web::Json<ConfigUpdate>,
    pool: web::Data<SqlitePool>,
) -> Result<HttpResponse, APIError> {
    let config = config_store::update(&body.0, &pool).await?;
    let value = serde_json::to_value(config).expect("EngineConfig always serializes");
    let map = value
        .as_object()
        .expect("EngineConfig serializes to a JSON object")
        .clone()
        .into_iter()
        .collect();
    Ok(HttpResponse::Ok().json(ConfigResponse(map)))
}
