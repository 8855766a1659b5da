use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::models::{AccountQuery, AccountsEnvelope, ApiError, TransferReceipt, TransferRequest};

/// Kablamo bank API client, every call authenticated with the bearer token
#[derive(Clone)]
pub struct BankClient {
    http_client: HttpClient,
    api_token: String,
    base_url: String,
    action_timeout: Duration,
}

impl BankClient {
    pub fn new(base_url: &str, api_token: &str, action_timeout: Duration) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_token: api_token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            action_timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create default headers with authorization
    fn create_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let auth_value = HeaderValue::from_str(&format!("Bearer {}", self.api_token))
            .map_err(|e| ApiError::RequestError(format!("Failed to create auth header: {}", e)))?;
        headers.insert(AUTHORIZATION, auth_value);

        Ok(headers)
    }

    fn map_send_error(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout(self.action_timeout.as_millis())
        } else {
            ApiError::RequestError(format!("Request failed: {}", error))
        }
    }

    /// Turn a response into `T`, or into the `ApiError` matching its status
    async fn read_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.is_server_error() {
                warn!("Server error {}: {}", status.as_u16(), body);
            }
            return Err(ApiError::from_status(status.as_u16(), &body));
        }

        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.action_timeout.as_millis())
            } else {
                ApiError::Deserialization(format!("Failed to parse response: {}", e))
            }
        })
    }

    /// GET /accounts
    ///
    /// # Returns
    /// * `Ok(AccountsEnvelope)` - Accounts matching the query
    /// * `Err(ApiError)` - Status-specific error, or a transport failure
    pub async fn list_accounts(&self, query: &AccountQuery) -> Result<AccountsEnvelope, ApiError> {
        let url = format!("{}/accounts", self.base_url);
        debug!("GET {} {:?}", url, query.pairs());

        let response = self
            .http_client
            .get(&url)
            .headers(self.create_headers()?)
            .query(&query.pairs())
            .timeout(self.action_timeout)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        self.read_response(response).await
    }

    /// GET /accounts, decoding the `data` envelope whatever the status
    ///
    /// # Returns
    /// * `Ok((status, AccountsEnvelope))` - Status code and the decoded body
    /// * `Err(ApiError)` - Transport failure, or a body without `data`
    pub async fn list_accounts_raw(
        &self,
        query: &AccountQuery,
    ) -> Result<(u16, AccountsEnvelope), ApiError> {
        let url = format!("{}/accounts", self.base_url);
        debug!("GET {} {:?} (any status)", url, query.pairs());

        let response = self
            .http_client
            .get(&url)
            .headers(self.create_headers()?)
            .query(&query.pairs())
            .timeout(self.action_timeout)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status().as_u16();
        let envelope = response.json::<AccountsEnvelope>().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.action_timeout.as_millis())
            } else {
                ApiError::Deserialization(format!(
                    "Failed to parse {} response: {}",
                    status, e
                ))
            }
        })?;
        Ok((status, envelope))
    }

    /// Balance of one account, looked up through GET /accounts
    pub async fn account_balance(
        &self,
        query: &AccountQuery,
        account_id: u64,
    ) -> Result<f64, ApiError> {
        self.list_accounts(query)
            .await?
            .balance_of(account_id)
            .ok_or_else(|| ApiError::MissingField(format!("amount for account {}", account_id)))
    }

    /// PUT /transfer
    ///
    /// Moves `amount` from one account to another.
    pub async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, ApiError> {
        let url = format!("{}/transfer", self.base_url);
        debug!(
            "PUT {} from={} to={} amount={}",
            url, request.from, request.to, request.amount
        );

        let response = self
            .http_client
            .put(&url)
            .headers(self.create_headers()?)
            .json(request)
            .timeout(self.action_timeout)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        self.read_response(response).await
    }
}
