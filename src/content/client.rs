//! Content delivery API client
//!
//! Typed HTTP client for a headless content API exposing the content tree
//! and member groups:
//!
//! ```text
//! GET /content/root
//! GET /content/{id}
//! GET /content/{id}/children
//! GET /member-groups/{id}
//! ```

use crate::config::ContentApiConfig;
use crate::content::model::{ContentNode, GroupId, MemberGroup, NodeId};
use crate::content::source::{ContentTree, GroupDirectory};
use crate::error::{ContentError, ContentResult};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Content API client
pub struct ContentApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
    max_retries: u32,
}

impl ContentApiClient {
    /// Create a new client from configuration
    pub fn new(config: &ContentApiConfig) -> ContentResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(format!("keepout/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ContentError::Request)?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            max_retries: config.max_retries,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Execute a request with retries on transport failures
    async fn execute(&self, request: RequestBuilder) -> ContentResult<Response> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(backoff_delay(attempt)).await;
                debug!("Retrying request (attempt {})", attempt + 1);
            }

            let req = request
                .try_clone()
                .ok_or_else(|| ContentError::InvalidResponse("Cannot clone request".to_string()))?;

            match req.send().await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!("Request failed: {}", e);
                    let retryable = e.is_connect() || e.is_timeout();
                    last_error = Some(ContentError::Request(e));
                    if !retryable {
                        break;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ContentError::InvalidResponse("Unknown error".to_string())))
    }

    /// GET a JSON resource, mapping 404 to `None`
    #[instrument(skip(self), fields(endpoint = %endpoint))]
    async fn get_optional<T: DeserializeOwned>(&self, endpoint: &str) -> ContentResult<Option<T>> {
        let request = self.authenticate(self.http.get(self.url(endpoint)));
        let response = self.execute(request).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ContentError::from_response(status.as_u16(), &body));
        }

        let data = response.json().await.map_err(|e| {
            ContentError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;
        Ok(Some(data))
    }

    /// GET a JSON collection; a missing parent reads as an empty collection
    async fn get_list<T: DeserializeOwned>(&self, endpoint: &str) -> ContentResult<Vec<T>> {
        Ok(self.get_optional(endpoint).await?.unwrap_or_default())
    }
}

/// Exponential backoff before retry `attempt` (1-based), capped
fn backoff_delay(attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(100u64.saturating_mul(factor).min(MAX_BACKOFF_MS))
}

const MAX_BACKOFF_MS: u64 = 10_000;

#[async_trait]
impl ContentTree for ContentApiClient {
    async fn get_by_id(&self, id: NodeId) -> ContentResult<Option<ContentNode>> {
        self.get_optional(&format!("/content/{}", id)).await
    }

    async fn published_children(&self, id: NodeId) -> ContentResult<Vec<ContentNode>> {
        let children: Vec<ContentNode> = self.get_list(&format!("/content/{}/children", id)).await?;
        Ok(children.into_iter().filter(|node| node.published).collect())
    }

    async fn root_items(&self) -> ContentResult<Vec<ContentNode>> {
        self.get_list("/content/root").await
    }

    fn source_type(&self) -> &'static str {
        "api"
    }
}

#[async_trait]
impl GroupDirectory for ContentApiClient {
    async fn group_name(&self, id: GroupId) -> ContentResult<Option<String>> {
        let group: Option<MemberGroup> = self.get_optional(&format!("/member-groups/{}", id)).await?;
        Ok(group.map(|g| g.name))
    }
}
