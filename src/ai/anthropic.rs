use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::AiHandler;
use crate::config::types::Settings;
use crate::error::BotError;

/// Number of retry attempts for transient API errors (not rate limits).
const MODEL_RETRIES: u32 = 2;

/// Anthropic Messages API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Handler for the Anthropic Messages API.
///
/// Also works against Anthropic-compatible gateways; the base URL is
/// configurable and only `/v1/messages` is used.
pub struct AnthropicHandler {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicHandler {
    pub fn new(settings: &Settings) -> Result<Self, BotError> {
        let timeout_secs = settings.config.ai_timeout;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(BotError::Http)?;

        Ok(Self {
            client,
            base_url: settings.anthropic.base_url.clone(),
            api_key: settings.anthropic.key.clone(),
            model: settings.anthropic.model.clone(),
            max_tokens: settings.anthropic.max_tokens,
        })
    }

    /// Build the request body for the messages API.
    fn build_request_body(&self, system: &str, user: &str) -> serde_json::Value {
        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [
                {"role": "user", "content": user}
            ],
        });
        if !system.is_empty() {
            body["system"] = json!(system);
        }
        body
    }

    /// Send a single request and parse the response. No retry logic here.
    async fn send_message(&self, body: &serde_json::Value) -> Result<String, BotError> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(body)
            .send()
            .await
            .map_err(BotError::Http)?;

        if !resp.status().is_success() {
            let status = resp.status();

            if status.as_u16() == 429 {
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);
                return Err(BotError::RateLimited {
                    retry_after_secs: retry_after,
                });
            }

            let body_text = resp.text().await.unwrap_or_default();
            return Err(BotError::AiHandler(format!(
                "API returned {status}: {body_text}"
            )));
        }

        let api_resp: ApiResponse = resp.json().await.map_err(BotError::Http)?;

        let text = api_resp
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(BotError::AiHandler("no text content in response".into()));
        }

        Ok(text)
    }
}

#[async_trait]
impl AiHandler for AnthropicHandler {
    async fn complete(&self, system: &str, user: &str) -> Result<String, BotError> {
        let body = self.build_request_body(system, user);

        // Retry on transient errors with exponential backoff
        let mut last_err = None;
        for attempt in 0..=MODEL_RETRIES {
            match self.send_message(&body).await {
                Ok(text) => return Ok(text),
                Err(e @ BotError::RateLimited { .. }) => {
                    // Don't retry rate limits — propagate immediately
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max = MODEL_RETRIES + 1,
                        error = %e,
                        "AI request failed, retrying"
                    );
                    last_err = Some(e);

                    // Exponential backoff: 2s, 4s, ...
                    if attempt < MODEL_RETRIES {
                        let delay = Duration::from_secs(2u64.pow(attempt + 1));
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| BotError::AiHandler("all retries exhausted".into())))
    }
}

// ── API response types ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> AnthropicHandler {
        let mut settings = Settings::default();
        settings.anthropic.base_url = "https://api.anthropic.com".into();
        settings.anthropic.model = "claude-test".into();
        settings.anthropic.max_tokens = 1024;
        settings.config.ai_timeout = 30;
        AnthropicHandler::new(&settings).unwrap()
    }

    #[test]
    fn test_build_request_body_with_system() {
        let body = handler().build_request_body("be terse", "review this");
        assert_eq!(body["model"], "claude-test");
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["system"], "be terse");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "review this");
    }

    #[test]
    fn test_build_request_body_without_system() {
        let body = handler().build_request_body("", "review this");
        assert!(body.get("system").is_none());
    }

    #[test]
    fn test_response_parsing_joins_text_blocks() {
        let raw = r#"{
            "id": "msg_1",
            "content": [
                {"type": "text", "text": "Part one. "},
                {"type": "tool_use", "id": "t1", "name": "x", "input": {}},
                {"type": "text", "text": "Part two."}
            ]
        }"#;
        let resp: ApiResponse = serde_json::from_str(raw).unwrap();
        let text: String = resp
            .content
            .into_iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect();
        assert_eq!(text, "Part one. Part two.");
    }
}
