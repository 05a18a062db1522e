use actix_web::{HttpResponse, post, web};
use payloads::requests::OtpRequest;
use payloads::{otp_required_amount_threshold, responses::OtpResponse};

use crate::code_store::CodeStore;
use crate::time::TimeSource;

use super::APIError;

/// `POST /otp/request`: issue a one-time code for a pending transaction.
/// Delivery (SMS/email) is out of scope here — the code is returned directly
/// in the response body for demo purposes, hence `otp_demo`.
#[tracing::instrument(skip(code_store, time_source), ret)]
#[post("/otp/request")]
pub async fn request_otp(
    body: web::Json<OtpRequest>,
    code_store: web::Data<CodeStore>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let now = time_source.now();
    let otp_demo = code_store.issue(&body.transaction_id, &body.from_account, now);

    Ok(HttpResponse::Ok().json(OtpResponse {
        otp_demo,
        expires_in_seconds: 300,
        otp_required_threshold: otp_required_amount_threshold(),
    }))
}
