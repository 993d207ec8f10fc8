//! HTTP client for the procedures backend
//!
//! [`ApiClient`] wraps the four remote operations. It holds no mutable
//! state; cloning it shares the underlying connection pool. Every failure is
//! classified into an [`ApiError`] before it is returned.

use crate::api::types::{
    AgentReply, ChatRequest, HistoryLimit, HistoryQuery, HistoryResult, Payload, ProcedureAck,
    ProcedureRecord, Quote,
};
use crate::config::Config;
use crate::error::{ApiError, ApiResult, ProcassistError, Result};
use crate::session::Turn;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const CHAT_PATH: &str = "/intent-mapper";
const ADD_PROCEDURE_PATH: &str = "/add-doctor-procedure";
const QUOTE_PATH: &str = "/get-quote";
const HISTORY_PATH: &str = "/show-history";

/// The conversational half of the backend
///
/// The session controller depends on this trait rather than on
/// [`ApiClient`] directly so that it can run against in-process fakes.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Sends one utterance together with the conversation context
    ///
    /// # Arguments
    ///
    /// * `text` - The user's utterance
    /// * `session_id` - Opaque id correlating turns on the backend
    /// * `history` - Snapshot of the conversation, oldest first
    ///
    /// # Errors
    ///
    /// Returns a classified [`ApiError`]; an unreadable 2xx payload is not an
    /// error (see [`AgentReply::from_body`]).
    async fn send_message(
        &self,
        text: &str,
        session_id: &str,
        history: &[Turn],
    ) -> ApiResult<AgentReply>;
}

/// Client for the procedures REST API
///
/// # Examples
///
/// ```
/// use procassist::api::ApiClient;
/// use std::time::Duration;
///
/// let client = ApiClient::new("http://localhost:3000/dev", Duration::from_secs(30));
/// assert!(client.is_ok());
/// assert_eq!(client.unwrap().base_url(), "http://localhost:3000/dev");
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for an endpoint prefix such as `https://host/dev`
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::with_user_agent(
            base_url,
            timeout,
            &format!("procassist/{}", env!("CARGO_PKG_VERSION")),
        )
    }

    /// Create a client with an explicit user agent
    ///
    /// # Errors
    ///
    /// Returns error if the user agent is not a valid header value or the
    /// HTTP client cannot be built
    pub fn with_user_agent(
        base_url: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .default_headers(headers)
            .build()
            .map_err(|e| ProcassistError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::debug!(base_url = %base_url, timeout_secs = timeout.as_secs(), "Initialized API client");

        Ok(Self { client, base_url })
    }

    /// Create a client from application configuration
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_user_agent(
            config.endpoint_base(),
            config.api.timeout(),
            &config.api.user_agent,
        )
    }

    /// Endpoint prefix every path is appended to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends a chat utterance to the intent-mapping agent
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Server`] or [`ApiError::Network`]; never
    /// [`ApiError::UnexpectedFormat`].
    pub async fn send_message(
        &self,
        text: &str,
        session_id: &str,
        history: &[Turn],
    ) -> ApiResult<AgentReply> {
        let request = ChatRequest::new(text, session_id, history);
        tracing::debug!(
            session_id = %session_id,
            history_len = history.len(),
            "POST {}",
            CHAT_PATH
        );

        let body = self
            .execute("chat", self.client.post(self.url(CHAT_PATH)).json(&request))
            .await?;

        Ok(AgentReply::from_body(&body))
    }

    /// Adds a procedure record for a doctor
    ///
    /// `cost` must already be coerced to a number by the caller.
    ///
    /// # Errors
    ///
    /// Returns a classified [`ApiError`]
    pub async fn add_procedure(
        &self,
        doctor_name: &str,
        procedure_code: &str,
        procedure_name: &str,
        cost: f64,
    ) -> ApiResult<ProcedureAck> {
        let record = ProcedureRecord {
            doctor_name: doctor_name.to_string(),
            procedure_code: procedure_code.to_string(),
            procedure_name: procedure_name.to_string(),
            cost,
        };
        tracing::debug!(procedure_code = %procedure_code, "POST {}", ADD_PROCEDURE_PATH);

        let body = self
            .execute(
                "add_procedure",
                self.client.post(self.url(ADD_PROCEDURE_PATH)).json(&record),
            )
            .await?;

        decode("add_procedure", &body)
    }

    /// Gets a cost quote for a procedure code
    ///
    /// # Errors
    ///
    /// Returns a classified [`ApiError`]
    pub async fn get_quote(
        &self,
        procedure_code: &str,
        doctor_name: Option<&str>,
    ) -> ApiResult<Quote> {
        let mut query: Vec<(&str, &str)> = Vec::with_capacity(2);
        if let Some(doctor) = doctor_name {
            query.push(("doctorName", doctor));
        }
        query.push(("procedureCode", procedure_code));
        tracing::debug!(procedure_code = %procedure_code, "GET {}", QUOTE_PATH);

        let body = self
            .execute(
                "get_quote",
                self.client.get(self.url(QUOTE_PATH)).query(&query),
            )
            .await?;

        decode("get_quote", &body)
    }

    /// Gets the most recent procedures for a doctor
    ///
    /// # Errors
    ///
    /// Returns a classified [`ApiError`]
    pub async fn get_history(
        &self,
        doctor_name: &str,
        limit: HistoryLimit,
    ) -> ApiResult<HistoryResult> {
        self.query_history(&HistoryQuery::new(doctor_name, limit))
            .await
    }

    /// Gets procedures for a doctor, optionally within a date range
    ///
    /// # Errors
    ///
    /// Returns a classified [`ApiError`]
    pub async fn query_history(&self, query: &HistoryQuery) -> ApiResult<HistoryResult> {
        tracing::debug!(doctor = %query.doctor_name, limit = %query.limit, "GET {}", HISTORY_PATH);

        let body = self
            .execute(
                "get_history",
                self.client
                    .get(self.url(HISTORY_PATH))
                    .query(&query.query_pairs()),
            )
            .await?;

        decode("get_history", &body)
    }

    /// Sends a request and returns the body of a 2xx response
    async fn execute(&self, operation: &'static str, request: RequestBuilder) -> ApiResult<String> {
        let response = request
            .send()
            .await
            .map_err(|e| classify_transport(operation, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport(operation, e))?;

        if !status.is_success() {
            let error = ApiError::server(status.as_u16(), extract_message(&body));
            tracing::warn!(operation, status = status.as_u16(), "Backend returned error: {}", error);
            return Err(error);
        }

        Ok(body)
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn send_message(
        &self,
        text: &str,
        session_id: &str,
        history: &[Turn],
    ) -> ApiResult<AgentReply> {
        ApiClient::send_message(self, text, session_id, history).await
    }
}

/// Maps a transport failure to [`ApiError::Network`]
fn classify_transport(operation: &'static str, error: reqwest::Error) -> ApiError {
    let detail = if error.is_timeout() {
        format!("request timed out: {}", error)
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else {
        error.to_string()
    };
    tracing::error!(operation, "Network failure: {}", detail);
    ApiError::Network(detail)
}

/// Pulls a `message` string out of an error body, if there is one
fn extract_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

/// Decodes a 2xx payload, rejecting bodies that carry none of the known fields
fn decode<T: DeserializeOwned + Payload>(operation: &'static str, body: &str) -> ApiResult<T> {
    let payload: T = serde_json::from_str(body).map_err(|e| {
        tracing::warn!(operation, "Unparseable response payload: {}", e);
        ApiError::UnexpectedFormat(format!("{}: {}", operation, e))
    })?;

    if !payload.is_recognized() {
        tracing::warn!(operation, "Response payload has no recognized fields");
        return Err(ApiError::UnexpectedFormat(format!(
            "{}: response has no recognized fields",
            operation
        )));
    }

    Ok(payload)
}
