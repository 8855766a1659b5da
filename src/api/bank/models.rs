use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single account as returned inside the `data` envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    #[serde(default)]
    pub id: Option<u64>,
    pub amount: f64,
}

/// `data` of GET /accounts, either a list or a single account object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AccountsData {
    Many(Vec<Account>),
    Single(Account),
}

/// Response from GET /accounts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountsEnvelope {
    pub data: AccountsData,
}

impl AccountsEnvelope {
    pub fn len(&self) -> usize {
        match &self.data {
            AccountsData::Many(accounts) => accounts.len(),
            AccountsData::Single(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Balance of `account_id`. A single-object envelope is taken as that account.
    pub fn balance_of(&self, account_id: u64) -> Option<f64> {
        match &self.data {
            AccountsData::Single(account) => Some(account.amount),
            AccountsData::Many(accounts) => accounts
                .iter()
                .find(|account| account.id == Some(account_id))
                .map(|account| account.amount),
        }
    }
}

/// Query parameters for GET /accounts. `active` is mandatory on the server side.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl AccountQuery {
    pub fn active() -> Self {
        Self {
            active: Some(true),
            search: None,
        }
    }

    pub fn search(term: &str) -> Self {
        Self {
            active: None,
            search: Some(term.to_string()),
        }
    }

    pub fn with_search(mut self, term: &str) -> Self {
        self.search = Some(term.to_string());
        self
    }

    /// `(name, value)` pairs in the order they go on the query string
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(active) = self.active {
            pairs.push(("active", active.to_string()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        pairs
    }
}

/// Request body for PUT /transfer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferRequest {
    pub from: u64,
    pub to: u64,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferData {
    #[serde(rename = "transactionId", alias = "trasactionId")]
    pub transaction_id: String,
    pub amount: f64,
}

/// Response from PUT /transfer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferReceipt {
    pub data: TransferData,
}

/// Error body some endpoints return alongside a non-2xx status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: Option<String>,
    pub message: Option<String>,
    pub retry_after: Option<u64>,
}

/// Comprehensive error type for bank API calls
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Unprocessable: {0}")]
    Unprocessable(String),
    #[error("Rate Limited. Retry after {retry_after_ms} ms")]
    RateLimited { retry_after_ms: u64 },
    #[error("Server Error ({0}): {1}")]
    ServerError(u16, String),
    #[error("HTTP Error ({0}): {1}")]
    HttpError(u16, String),
    #[error("Request Error: {0}")]
    RequestError(String),
    #[error("Request timed out after {0} ms")]
    Timeout(u128),
    #[error("Deserialization Error: {0}")]
    Deserialization(String),
    #[error("Response has no {0}")]
    MissingField(String),
}

impl ApiError {
    /// HTTP status of the response this error came from, `None` if there was no response
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::BadRequest(_) => Some(400),
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Forbidden(_) => Some(403),
            ApiError::NotFound(_) => Some(404),
            ApiError::Unprocessable(_) => Some(422),
            ApiError::RateLimited { .. } => Some(429),
            ApiError::ServerError(code, _) | ApiError::HttpError(code, _) => Some(*code),
            ApiError::RequestError(_)
            | ApiError::Timeout(_)
            | ApiError::Deserialization(_)
            | ApiError::MissingField(_) => None,
        }
    }

    /// Build the error for a non-2xx response
    pub fn from_status(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<ErrorResponse>(body).ok();
        let message = parsed
            .as_ref()
            .and_then(|err| err.message.clone().or_else(|| err.error.clone()))
            .unwrap_or_else(|| body.to_string());

        match status {
            400 => ApiError::BadRequest(message),
            401 => ApiError::Unauthorized(message),
            403 => ApiError::Forbidden(message),
            404 => ApiError::NotFound(message),
            422 => ApiError::Unprocessable(message),
            429 => ApiError::RateLimited {
                retry_after_ms: parsed.and_then(|err| err.retry_after).unwrap_or(1000),
            },
            500..=599 => ApiError::ServerError(status, message),
            _ => ApiError::HttpError(status, message),
        }
    }
}
