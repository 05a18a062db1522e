use reqwest::StatusCode;
use serde::Serialize;

use crate::{Transaction, requests, responses};

type ReqwestResult = Result<reqwest::Response, reqwest::Error>;

/// An API client for interfacing with the fraud-decision gateway.
pub struct APIClient {
    pub address: String,
    pub inner_client: reqwest::Client,
}

/// Helper methods for http actions
impl APIClient {
    fn format_url(&self, path: &str) -> String {
        format!("{}/api/{path}", &self.address)
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> ReqwestResult {
        self.inner_client.post(self.format_url(path)).json(body).send().await
    }

    async fn put(&self, path: &str, body: &impl Serialize) -> ReqwestResult {
        self.inner_client.put(self.format_url(path)).json(body).send().await
    }

    async fn empty_get(&self, path: &str) -> ReqwestResult {
        self.inner_client.get(self.format_url(path)).send().await
    }
}

/// Methods on the backend API
impl APIClient {
    pub async fn health_check(&self) -> Result<responses::HealthResponse, ClientError> {
        let response = self.empty_get("health").await?;
        ok_body(response).await
    }

    pub async fn scan(
        &self,
        transaction: &Transaction,
    ) -> Result<responses::ScanResponse, ClientError> {
        let response = self.post("scan", transaction).await?;
        ok_body(response).await
    }

    /// Low-level scan call that returns the raw response so callers can
    /// inspect the status code on gate rejections (400s carry a body too).
    pub async fn scan_raw(&self, transaction: &Transaction) -> ReqwestResult {
        self.post("scan", transaction).await
    }

    pub async fn middleware_check(
        &self,
        transaction: &Transaction,
    ) -> Result<responses::MiddlewareDecisionResponse, ClientError> {
        let response = self.post("middleware/check", transaction).await?;
        ok_body(response).await
    }

    pub async fn middleware_evaluate(
        &self,
        transaction: &Transaction,
    ) -> Result<responses::MiddlewareDecisionResponse, ClientError> {
        let response = self.post("middleware/evaluate", transaction).await?;
        ok_body(response).await
    }

    pub async fn review(
        &self,
        transaction_id: &str,
        request: &requests::ReviewRequest,
    ) -> Result<responses::ReviewResponse, ClientError> {
        let response =
            self.post(&format!("review/{transaction_id}"), request).await?;
        ok_body(response).await
    }

    pub async fn otp_request(
        &self,
        request: &requests::OtpRequest,
    ) -> Result<responses::OtpResponse, ClientError> {
        let response = self.post("otp/request", request).await?;
        ok_body(response).await
    }

    pub async fn lookup(
        &self,
        account_id: &str,
    ) -> Result<Vec<responses::HistoryItem>, ClientError> {
        let response = self.empty_get(&format!("lookup/{account_id}")).await?;
        ok_body(response).await
    }

    pub async fn lookup_indicators(
        &self,
        account_id: &str,
    ) -> Result<responses::AccountIndicators, ClientError> {
        let response = self
            .empty_get(&format!("lookup/{account_id}/indicators"))
            .await?;
        ok_body(response).await
    }

    pub async fn get_limits(
        &self,
        account_id: &str,
    ) -> Result<responses::LimitsResponse, ClientError> {
        let response = self.empty_get(&format!("limits/{account_id}")).await?;
        ok_body(response).await
    }

    pub async fn set_account_type(
        &self,
        account_id: &str,
        request: &requests::SetAccountType,
    ) -> Result<(), ClientError> {
        let response =
            self.put(&format!("limits/{account_id}/type"), request).await?;
        ok_empty(response).await
    }

    pub async fn get_config(
        &self,
    ) -> Result<responses::ConfigResponse, ClientError> {
        let response = self.empty_get("config").await?;
        ok_body(response).await
    }

    pub async fn update_config(
        &self,
        update: &requests::ConfigUpdate,
    ) -> Result<responses::ConfigResponse, ClientError> {
        let response = self.put("config", update).await?;
        ok_body(response).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// An unhandled API error to display, containing response text.
    #[error("{1}")]
    APIError(StatusCode, String),
    #[error("Network error. Please check your connection.")]
    Network(#[from] reqwest::Error),
}

/// Deserialize a successful request into the desired type, or return an
/// appropriate error.
pub async fn ok_body<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(ClientError::APIError(
            response.status(),
            response.text().await?,
        ));
    }
    Ok(response.json::<T>().await?)
}

/// Check that an empty response is OK, returning a ClientError if not.
pub async fn ok_empty(response: reqwest::Response) -> Result<(), ClientError> {
    if !response.status().is_success() {
        return Err(ClientError::APIError(
            response.status(),
            response.text().await?,
        ));
    }
    Ok(())
}
