use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::logging::{LogLevel, SharedLogger};
use crate::translate::chat_types::{ChatRequest, ChatResponse};
use crate::translate::request::chat_to_gemini;
use crate::translate::response::parse_gemini_body;

use std::time::{Duration, Instant};
use uuid::Uuid;

/// Everything needed to reach `generateContent`, resolved once at startup.
#[derive(Clone)]
pub struct Upstream {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl Upstream {
    /// Resolve the API key and build the HTTP client.
    ///
    /// # Errors
    /// `RelayError::Config` when the key variable is unset or empty; the
    /// process must not start serving in that case.
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let api_key = config.resolve_api_key()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream.timeout_secs))
            .build()?;
        Ok(Self::new(client, config.generate_content_url(), api_key))
    }

    pub fn new(client: reqwest::Client, url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    /// Endpoint URL without the key, safe to log.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Debug for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upstream")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// Forward one chat message upstream and translate the answer back.
/// Exactly one outbound call, no retries.
pub async fn relay_chat(
    req: &ChatRequest,
    upstream: &Upstream,
    logger: &SharedLogger,
) -> Result<ChatResponse> {
    let request_id = Uuid::new_v4();
    let started = Instant::now();

    let result = send(req, upstream, request_id, logger).await;

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(resp) => logger.request(
            LogLevel::Info,
            request_id,
            "relay",
            "Completed",
            serde_json::json!({ "elapsed_ms": elapsed_ms, "answer_len": resp.answer.len() }),
        ),
        Err(RelayError::Upstream { status, body }) => {
            tracing::warn!(%request_id, status, "Upstream returned an error");
            logger.request(
                LogLevel::Warn,
                request_id,
                "relay",
                format!("Upstream returned status {}", status),
                serde_json::json!({ "elapsed_ms": elapsed_ms, "body": truncate(body, 500) }),
            );
        }
        Err(e) => {
            tracing::error!(%request_id, error = %e, "Relay failed");
            logger.request(
                LogLevel::Error,
                request_id,
                "relay",
                e.to_string(),
                serde_json::json!({ "elapsed_ms": elapsed_ms }),
            );
        }
    }

    result
}

async fn send(
    req: &ChatRequest,
    upstream: &Upstream,
    request_id: Uuid,
    logger: &SharedLogger,
) -> Result<ChatResponse> {
    let payload = chat_to_gemini(req);

    tracing::debug!(%request_id, url = %upstream.url, message_len = req.message.len(), "Relaying");
    logger.request(
        LogLevel::Info,
        request_id,
        "relay",
        format!("POST {}", upstream.url),
        serde_json::json!({ "message_len": req.message.len() }),
    );

    // reqwest errors embed the full URL, key included; strip it.
    let response = upstream
        .client
        .post(&upstream.url)
        .query(&[("key", upstream.api_key.as_str())])
        .header("Content-Type", "application/json")
        .json(&payload)
        .send()
        .await
        .map_err(|e| RelayError::Http(e.without_url()))?;

    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| RelayError::Http(e.without_url()))?;

    if status != 200 {
        return Err(RelayError::upstream(status, body));
    }

    parse_gemini_body(&body)
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
