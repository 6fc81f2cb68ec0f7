//! Upstream request construction and response relay.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use futures::StreamExt;

use super::retry;
use super::types::{ChatRequest, UpstreamPayload};
use crate::auth::{TokenCredential, COGNITIVE_SERVICES_SCOPE};
use crate::config::Config;
use crate::error::{Error, Result};

/// Per-attempt timeout for non-streaming upstream calls.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Forwards chat-completion requests to the configured upstream deployment.
pub struct Forwarder {
    client: reqwest::Client,
    credential: Arc<dyn TokenCredential>,
    config: Arc<Config>,
}

impl Forwarder {
    pub fn new(
        client: reqwest::Client,
        credential: Arc<dyn TokenCredential>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            client,
            credential,
            config,
        }
    }

    /// Upstream URL for a deployment.
    fn completions_url(&self, deployment: &str) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            deployment,
            self.config.api_version
        )
    }

    /// Forward a request, dispatching on the stream flag.
    ///
    /// Model resolution happens here, before any network call: a request
    /// with no model and no configured default deployment is a client error.
    pub async fn forward(&self, request: ChatRequest) -> Result<Response> {
        let deployment = request
            .resolve_model(self.config.deployment.as_deref())
            .ok_or_else(|| {
                Error::BadRequest(
                    "Model is required. Either specify it in the request or set the \
                     AZURE_OPENAI_DEPLOYMENT_NAME environment variable"
                        .to_string(),
                )
            })?
            .to_string();

        tracing::info!(
            deployment = %deployment,
            stream = request.stream,
            messages = request.messages.len(),
            "Forwarding chat completion request"
        );

        if request.stream {
            self.forward_streaming(&deployment, &request).await
        } else {
            self.forward_buffered(&deployment, &request).await
        }
    }

    /// One upstream POST with a fresh bearer token. Any non-2xx status is an
    /// error, matching the retry contract.
    async fn send_upstream(
        &self,
        url: &str,
        payload: &UpstreamPayload<'_>,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response> {
        let token = self.credential.token(COGNITIVE_SERVICES_SCOPE).await?;

        let mut request = self
            .client
            .post(url)
            .header(header::AUTHORIZATION, token.authorization_value())
            .json(payload);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("Failed to reach upstream: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!(
                "Upstream returned {}: {}",
                status, body
            )));
        }

        Ok(response)
    }

    /// Non-streaming path: bounded per-attempt timeout, retry with backoff,
    /// upstream JSON body returned verbatim.
    async fn forward_buffered(&self, deployment: &str, request: &ChatRequest) -> Result<Response> {
        let url = self.completions_url(deployment);
        let payload = UpstreamPayload {
            messages: &request.messages,
            max_tokens: request.max_tokens,
            stream: None,
        };

        let upstream = retry::with_backoff(|attempt| {
            let url = &url;
            let payload = &payload;
            async move {
                if attempt > 0 {
                    tracing::warn!(attempt, url = %url, "Retrying upstream request");
                }
                self.send_upstream(url, payload, Some(UPSTREAM_TIMEOUT))
                    .await
            }
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, url = %url, "Upstream request failed after retries");
            e
        })?;

        let body = upstream
            .bytes()
            .await
            .map_err(|e| Error::Upstream(format!("Failed to read upstream response: {}", e)))?;

        let response = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();

        Ok(response)
    }

    /// Streaming path: single attempt, chunks relayed as they arrive.
    ///
    /// A mid-stream upstream failure terminates the relay after logging; no
    /// error event is written into the stream the client is consuming.
    async fn forward_streaming(&self, deployment: &str, request: &ChatRequest) -> Result<Response> {
        let url = self.completions_url(deployment);
        let payload = UpstreamPayload {
            messages: &request.messages,
            max_tokens: request.max_tokens,
            stream: Some(true),
        };

        let upstream = self.send_upstream(&url, &payload, None).await?;

        let stream = upstream.bytes_stream().map(|chunk| {
            if let Err(ref e) = chunk {
                tracing::error!(error = %e, "Upstream stream failed mid-flight, terminating relay");
            }
            chunk.map_err(std::io::Error::other)
        });

        let response = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/event-stream")
            .header(header::CACHE_CONTROL, "no-cache")
            .body(Body::from_stream(stream))
            .unwrap();

        Ok(response)
    }
}
