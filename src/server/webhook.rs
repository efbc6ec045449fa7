use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;

use super::AppState;
use super::events::WebhookEvent;
use crate::ai::anthropic::AnthropicHandler;
use crate::error::BotError;
use crate::git::GitProvider;
use crate::git::github::GithubProvider;
use crate::tools::review::PrReviewer;
use crate::tools::{PrContext, greet};

type HmacSha256 = Hmac<Sha256>;

/// Main webhook handler: POST /webhook
///
/// Steps:
/// 1. Verify HMAC-SHA256 signature over the raw body bytes
/// 2. Classify the event into the closed `WebhookEvent` set
/// 3. Process the event fully before responding. A delivery that fails
///    gets a non-2xx and GitHub redelivers it; the publisher's dedup makes
///    redelivery safe
pub async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let settings = &state.settings;
    let secret = &settings.github.webhook_secret;

    if secret.is_empty() {
        tracing::error!("webhook_secret is not configured — rejecting request for safety");
        return (StatusCode::FORBIDDEN, "webhook secret not configured").into_response();
    }

    {
        let signature = headers
            .get("x-hub-signature-256")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if let Err(e) = verify_signature(&body, secret, signature) {
            tracing::warn!(error = %e, "webhook signature verification failed");
            return (StatusCode::UNAUTHORIZED, "signature verification failed").into_response();
        }
    }

    let event_type = headers
        .get("x-github-event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "failed to parse webhook payload");
            return (StatusCode::BAD_REQUEST, "invalid JSON").into_response();
        }
    };

    tracing::info!(event = event_type, "webhook verified");

    match WebhookEvent::classify(event_type, &payload) {
        WebhookEvent::Ping => (
            StatusCode::OK,
            axum::Json(json!({"status": "ping received successfully"})),
        )
            .into_response(),
        WebhookEvent::IssueComment(payload) => {
            if let Some(resp) = reject_foreign_repo(state.as_ref(), &payload.repository.full_name) {
                return resp;
            }
            match handle_issue_comment(&state, &payload).await {
                Ok(true) => (
                    StatusCode::OK,
                    axum::Json(json!({"status": "success", "message": "Greeting posted"})),
                )
                    .into_response(),
                Ok(false) => (
                    StatusCode::OK,
                    axum::Json(json!({"status": "ignored", "reason": "Command not found"})),
                )
                    .into_response(),
                Err(e) => {
                    tracing::error!(error = %e, "greet handler failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        axum::Json(json!({"status": "error", "message": e.to_string()})),
                    )
                        .into_response()
                }
            }
        }
        WebhookEvent::PullRequestOpened(payload) => {
            if let Some(resp) = reject_foreign_repo(state.as_ref(), &payload.repository.full_name) {
                return resp;
            }
            let pr = PrContext::from_payload(&payload);
            match handle_pull_request_opened(&state, &pr).await {
                Ok(posted) => (
                    StatusCode::OK,
                    axum::Json(json!({
                        "status": "success",
                        "message": format!("Posted {posted} review comment(s) on PR"),
                    })),
                )
                    .into_response(),
                Err(e) => {
                    tracing::error!(pr = pr.number, error = %e, "review pipeline failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        axum::Json(json!({"status": "error", "message": e.to_string()})),
                    )
                        .into_response()
                }
            }
        }
        WebhookEvent::Unrecognized { event } => {
            tracing::debug!(event = %event, "ignoring unrecognized event");
            (
                StatusCode::OK,
                axum::Json(json!({"status": "acknowledged", "event": event})),
            )
                .into_response()
        }
    }
}

/// Verify the HMAC-SHA256 signature from GitHub.
///
/// Compares the provided `sha256=...` header against the HMAC of the raw
/// request body. The raw bytes must be used as received; re-serializing
/// the JSON would corrupt whitespace and break the hash. Comparison is
/// constant-time via `Mac::verify_slice`.
fn verify_signature(body: &[u8], secret: &str, signature_header: &str) -> Result<(), String> {
    let signature_hex = signature_header
        .strip_prefix("sha256=")
        .ok_or_else(|| "missing sha256= prefix".to_string())?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| format!("invalid HMAC key: {e}"))?;
    mac.update(body);

    let expected =
        hex::decode(signature_hex).map_err(|e| format!("invalid hex in signature: {e}"))?;

    mac.verify_slice(&expected)
        .map_err(|_| "HMAC verification failed".to_string())
}

/// Events for repositories other than the configured one are acknowledged
/// and dropped; the bot only ever posts to its own repository.
fn reject_foreign_repo(state: &AppState, repo_full_name: &str) -> Option<Response> {
    if repo_full_name == state.settings.github.repo {
        return None;
    }
    tracing::warn!(
        delivered = repo_full_name,
        configured = %state.settings.github.repo,
        "event for unconfigured repository, ignoring"
    );
    Some(
        (
            StatusCode::OK,
            axum::Json(json!({"status": "ignored", "reason": "repository not configured"})),
        )
            .into_response(),
    )
}

async fn handle_issue_comment(
    state: &Arc<AppState>,
    payload: &super::events::IssueCommentPayload,
) -> Result<bool, BotError> {
    let provider = GithubProvider::new(&state.settings)?;
    greet::handle_comment(&provider, &state.settings, payload).await
}

async fn handle_pull_request_opened(
    state: &Arc<AppState>,
    pr: &PrContext,
) -> Result<usize, BotError> {
    let provider: Arc<dyn GitProvider> = Arc::new(GithubProvider::new(&state.settings)?);
    let ai = Arc::new(AnthropicHandler::new(&state.settings)?);
    let reviewer = PrReviewer::new(provider, ai, state.settings.clone());

    let outcome = reviewer.run(pr).await?;
    Ok(outcome.posted)
}
