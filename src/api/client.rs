use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::types::{
    CauseTreeReport, CreateTreeRequest, DeleteResponse, Envelope, GenerateMode,
    GenerateTreeRequest, ListTreesQuery, Measure, MeasureInput, NodeSuggestion,
    SuggestNodeRequest, TreeRecord, TreeSummary, UpdateTreeRequest, UpsertReportRequest,
};
use super::CauseTreeBackend;
use crate::config::{ApiConfig, RequestConfig};
use crate::error::{ApiError, ApiResult};
use crate::tree::{Id, TreeId};

/// HTTP client for the cause tree backend
#[derive(Clone)]
pub struct CauseTreeClient {
    client: Client,
    base_url: String,
    request_config: RequestConfig,
}

impl CauseTreeClient {
    /// Create a new client
    pub fn new(config: &ApiConfig, request_config: RequestConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(ApiError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            request_config,
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/cause-trees{}", self.base_url, path)
    }

    /// GET with retries; reads are idempotent.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> ApiResult<T> {
        let url = self.url(path);

        let mut last_error = None;
        let mut retries = 0;

        while retries <= self.request_config.max_retries {
            if retries > 0 {
                let delay = Duration::from_millis(
                    self.request_config.retry_delay_ms * (2_u64.pow(retries - 1)),
                );
                warn!(
                    url = %url,
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "Retrying backend request"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();
            let request = self.client.get(&url).query(query);

            match self.execute::<T>(request).await {
                Ok(value) => {
                    info!(
                        url = %url,
                        latency_ms = start.elapsed().as_millis(),
                        "Backend read succeeded"
                    );
                    return Ok(value);
                }
                Err(e) if !e.is_transient() => {
                    error!(url = %url, error = %e, "Backend read rejected");
                    return Err(e);
                }
                Err(e) => {
                    error!(
                        url = %url,
                        error = %e,
                        latency_ms = start.elapsed().as_millis(),
                        retry = retries,
                        "Backend read failed"
                    );
                    last_error = Some(e);
                    retries += 1;
                }
            }
        }

        Err(ApiError::Unavailable {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
            retries,
        })
    }

    /// Single-shot request with a JSON body.
    async fn send_json<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> ApiResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let start = Instant::now();

        let mut request = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        match self.execute::<T>(request).await {
            Ok(value) => {
                info!(
                    method = %method,
                    url = %url,
                    latency_ms = start.elapsed().as_millis(),
                    "Backend write succeeded"
                );
                Ok(value)
            }
            Err(e) => {
                error!(
                    method = %method,
                    url = %url,
                    error = %e,
                    latency_ms = start.elapsed().as_millis(),
                    "Backend write failed"
                );
                Err(e)
            }
        }
    }

    /// Execute a request and unwrap the `{ data }` envelope (internal)
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = request
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        debug!(status = status.as_u16(), "Backend responded");

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: error_message(&error_body),
            });
        }

        let mut body = response.text().await.map_err(|e| self.map_send_error(e))?;
        if body.trim().is_empty() {
            body = "null".to_string();
        }
        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|e| ApiError::InvalidResponse {
                message: format!("Failed to parse response: {}", e),
            })?;

        Ok(envelope.into_inner())
    }

    fn map_send_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout {
                timeout_ms: self.request_config.timeout_ms,
            }
        } else {
            ApiError::Http(e)
        }
    }
}

/// Human-readable message from an error body (`error`, then `message`, else raw).
fn error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.as_str().or_else(|| e.get("message").and_then(|m| m.as_str())))
                .or_else(|| v.get("message").and_then(|m| m.as_str()))
        })
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl CauseTreeBackend for CauseTreeClient {
    async fn get_tree(&self, id: &TreeId) -> ApiResult<TreeRecord> {
        self.get_json(&format!("/{}", id), &[]).await
    }

    async fn get_tree_by_hallazgo(&self, hallazgo_id: &Id) -> ApiResult<TreeRecord> {
        self.get_json(&format!("/by-hallazgo/{}", hallazgo_id), &[])
            .await
    }

    async fn create_tree(&self, request: &CreateTreeRequest) -> ApiResult<TreeRecord> {
        self.send_json(Method::POST, "", Some(request)).await
    }

    async fn update_tree(&self, id: &TreeId, request: &UpdateTreeRequest) -> ApiResult<TreeRecord> {
        self.send_json(Method::PUT, &format!("/{}", id), Some(request))
            .await
    }

    async fn list_trees(&self, query: &ListTreesQuery) -> ApiResult<Vec<TreeSummary>> {
        self.get_json("", &query.to_pairs()).await
    }

    async fn delete_tree(&self, id: &TreeId) -> ApiResult<DeleteResponse> {
        self.send_json::<(), _>(Method::DELETE, &format!("/{}", id), None)
            .await
    }

    async fn generate_tree(&self, id: &TreeId, mode: GenerateMode) -> ApiResult<TreeRecord> {
        let body = GenerateTreeRequest { mode };
        self.send_json(Method::POST, &format!("/{}/generate-ai", id), Some(&body))
            .await
    }

    async fn suggest_node(
        &self,
        id: &TreeId,
        request: &SuggestNodeRequest,
    ) -> ApiResult<NodeSuggestion> {
        self.send_json(Method::POST, &format!("/{}/suggest-node", id), Some(request))
            .await
    }

    async fn get_report(&self, id: &TreeId) -> ApiResult<CauseTreeReport> {
        self.get_json(&format!("/{}/report", id), &[]).await
    }

    async fn upsert_report(
        &self,
        id: &TreeId,
        request: &UpsertReportRequest,
    ) -> ApiResult<CauseTreeReport> {
        self.send_json(Method::PUT, &format!("/{}/report", id), Some(request))
            .await
    }

    async fn list_measures(&self, id: &TreeId) -> ApiResult<Vec<Measure>> {
        self.get_json(&format!("/{}/measures", id), &[]).await
    }

    async fn create_measure(&self, id: &TreeId, input: &MeasureInput) -> ApiResult<Measure> {
        self.send_json(Method::POST, &format!("/{}/measures", id), Some(input))
            .await
    }

    async fn update_measure(
        &self,
        id: &TreeId,
        measure_id: &Id,
        input: &MeasureInput,
    ) -> ApiResult<Measure> {
        self.send_json(
            Method::PUT,
            &format!("/{}/measures/{}", id, measure_id),
            Some(input),
        )
        .await
    }

    async fn delete_measure(&self, id: &TreeId, measure_id: &Id) -> ApiResult<()> {
        let _: serde_json::Value = self
            .send_json::<(), _>(
                Method::DELETE,
                &format!("/{}/measures/{}", id, measure_id),
                None,
            )
            .await?;
        Ok(())
    }
}
