use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::QueryError;

/// Body of `POST /query`. Only the current question is sent, never history.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Deserialize)]
struct QueryResponse {
    answer: String,
}

#[derive(Deserialize)]
struct HealthResponse {
    message: String,
}

#[derive(Clone, Debug)]
pub struct QueryClient {
    client: Client,
    base_url: String,
}

impl QueryClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn query(&self, request: &QueryRequest) -> Result<String, QueryError> {
        let url = format!("{}/query", self.base_url);
        debug!(%url, model = ?request.model, "posting query");

        let response = self.client.post(&url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let detail = extract_detail(&body);
            warn!(%status, has_detail = detail.is_some(), "backend rejected query");
            return Err(QueryError::Backend { status, detail });
        }

        let body = response.bytes().await?;
        let parsed: QueryResponse =
            serde_json::from_slice(&body).map_err(QueryError::MalformedAnswer)?;
        Ok(parsed.answer)
    }

    /// Hits the backend's root route, which answers with a liveness message.
    pub async fn health(&self) -> Result<String, QueryError> {
        let url = format!("{}/", self.base_url);

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(QueryError::Backend {
                status,
                detail: extract_detail(&body),
            });
        }

        let body = response.bytes().await?;
        let parsed: HealthResponse =
            serde_json::from_slice(&body).map_err(QueryError::MalformedAnswer)?;
        Ok(parsed.message)
    }
}

/// Pulls a displayable `detail` string out of an error body.
///
/// FastAPI sends `detail` as a string for raised errors but as an array of
/// objects for validation failures; only the string form is shown.
fn extract_detail(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("detail")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}
