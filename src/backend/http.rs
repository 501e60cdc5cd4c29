//! HTTP implementation of the answer backend
//!
//! Talks JSON over HTTP to the Flask service that fronts the retrieval
//! pipeline and the chat history database. All endpoints live under
//! `{base_url}/api/`.

use crate::backend::{
    Backend, CreateSessionResponse, HistoryRecord, PersistRequest, QueryRequest, QueryResponse,
    SessionRecord,
};
use crate::config::BackendConfig;
use crate::error::{MedchatError, Result};
use crate::session::SessionSummary;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Health report of the backend service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub pipeline_initialized: bool,
    #[serde(default)]
    pub domain_names: Vec<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Answer backend reached over HTTP
///
/// # Examples
///
/// ```
/// use medchat::backend::HttpBackend;
/// use medchat::config::BackendConfig;
///
/// let backend = HttpBackend::new(&BackendConfig::default());
/// assert!(backend.is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

impl HttpBackend {
    /// Create a backend client from configuration
    ///
    /// No request timeout is applied unless `request_timeout_seconds` is set;
    /// an unresponsive backend then keeps a send in flight until it answers.
    ///
    /// # Errors
    ///
    /// Returns `MedchatError::Config` if the base URL cannot be parsed, or an
    /// HTTP error if the client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            MedchatError::Config(format!("Invalid backend URL {}: {}", config.base_url, e))
        })?;

        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.request_timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(MedchatError::from)?;

        Ok(Self { client, base_url })
    }

    /// Base URL this client talks to
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `{base}/api/{segments...}` with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                MedchatError::Config(format!("Backend URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    /// Fetch the health report from `/api/health`
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = self.endpoint(&["health"])?;
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(MedchatError::from)?;
        // The service reports an unhealthy state with HTTP 500 and a JSON body.
        let status = response.status();
        let body: HealthStatus = response.json().await.map_err(|e| {
            MedchatError::Backend(format!("health check returned HTTP {}: {}", status, e))
        })?;
        Ok(body)
    }
}

/// Turn a non-success status into the given error kind
async fn ensure_success(
    response: Response,
    what: &str,
    into_error: fn(String) -> MedchatError,
) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::debug!("{} failed with HTTP {}: {}", what, status, body);
    Err(into_error(format!("{} returned HTTP {}", what, status)).into())
}

#[async_trait]
impl Backend for HttpBackend {
    async fn create_session(&self, user_id: &str) -> Result<String> {
        let url = self.endpoint(&["chat", "new"])?;
        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({ "user_id": user_id }))
            .send()
            .await
            .map_err(|e| MedchatError::SessionCreation(e.to_string()))?;
        let response = ensure_success(response, "create session", MedchatError::SessionCreation)
            .await?;
        let body: CreateSessionResponse = response
            .json()
            .await
            .map_err(|e| MedchatError::SessionCreation(e.to_string()))?;
        body.session_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                MedchatError::SessionCreation("response carried no session_id".to_string()).into()
            })
    }

    async fn load_history(&self, session_id: &str) -> Result<Vec<HistoryRecord>> {
        let url = self.endpoint(&["chat", "sessions", session_id, "messages"])?;
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MedchatError::HistoryLoad(e.to_string()))?;
        let response = ensure_success(response, "load history", MedchatError::HistoryLoad).await?;
        let records = response
            .json()
            .await
            .map_err(|e| MedchatError::HistoryLoad(e.to_string()))?;
        Ok(records)
    }

    async fn persist_message(&self, request: &PersistRequest) -> Result<()> {
        let url = self.endpoint(&["chat", "save"])?;
        tracing::debug!("POST {} ({})", url, request.role);
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| MedchatError::Persistence(e.to_string()))?;
        ensure_success(response, "save message", MedchatError::Persistence).await?;
        Ok(())
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let url = self.endpoint(&["rag", "query"])?;
        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| MedchatError::Query(e.to_string()))?;
        let response = ensure_success(response, "query", MedchatError::Query).await?;
        let body = response
            .json()
            .await
            .map_err(|e| MedchatError::Query(e.to_string()))?;
        Ok(body)
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let url = self.endpoint(&["chat", "sessions", session_id])?;
        tracing::debug!("DELETE {}", url);
        let response = self.client.delete(url).send().await.map_err(MedchatError::from)?;
        ensure_success(response, "delete session", MedchatError::Backend).await?;
        Ok(())
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<SessionSummary>> {
        let url = self.endpoint(&["chat", "sessions", user_id])?;
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(MedchatError::from)?;
        let response = ensure_success(response, "list sessions", MedchatError::Backend).await?;
        let records: Vec<SessionRecord> = response
            .json()
            .await
            .map_err(|e| MedchatError::Backend(e.to_string()))?;
        Ok(records.into_iter().map(SessionSummary::from).collect())
    }
}
