use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde_json::json;

use super::GitProvider;
use super::types::*;
use crate::config::types::Settings;
use crate::error::BotError;

/// Maximum characters in a single comment (GitHub limit ~65536).
const MAX_COMMENT_CHARS: usize = 65000;

/// GitHub provider implementation using raw reqwest for full API control.
///
/// Authenticates with a personal access token; the target repository comes
/// from configuration and is fixed for the provider's lifetime.
pub struct GithubProvider {
    client: Client,
    base_url: String,
    token: String,
    /// Full repo name "owner/repo".
    repo_full: String,
    ratelimit_retries: u32,
}

impl GithubProvider {
    pub fn new(settings: &Settings) -> Result<Self, BotError> {
        if settings.github.repo.is_empty() {
            return Err(BotError::Other(
                "github.repo is not configured (expected \"owner/repo\")".into(),
            ));
        }

        let timeout = std::time::Duration::from_secs(settings.config.ai_timeout);
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: settings.github.base_url.clone(),
            token: settings.github.user_token.clone(),
            repo_full: settings.github.repo.clone(),
            ratelimit_retries: settings.github.ratelimit_retries,
        })
    }

    /// Send a GitHub API request with automatic retry on rate limits (429).
    ///
    /// Retries up to `ratelimit_retries` times with exponential backoff,
    /// respecting the `Retry-After` header when present.
    async fn api_request_with_retry(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, BotError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        self.api_request_with_retry_url(method, &url, body).await
    }

    /// Same as `api_request_with_retry` but accepts an absolute URL (for pagination).
    async fn api_request_with_retry_url(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, BotError> {
        let max_retries = self.ratelimit_retries;

        for attempt in 0..=max_retries {
            let mut req = self
                .client
                .request(method.clone(), url)
                .bearer_auth(&self.token)
                .header("Accept", "application/vnd.github+json")
                .header("User-Agent", "pr-review-bot");

            if let Some(b) = body {
                req = req.json(b);
            }

            let resp = req.send().await.map_err(BotError::Http)?;

            if resp.status().as_u16() == 429 {
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(2u64.pow(attempt + 1));

                if attempt < max_retries {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max = max_retries,
                        retry_after_secs = retry_after,
                        url,
                        "GitHub API rate limited, retrying"
                    );
                    tokio::time::sleep(std::time::Duration::from_secs(retry_after)).await;
                    continue;
                }
                return Err(BotError::RateLimited {
                    retry_after_secs: retry_after,
                });
            }

            return Ok(resp);
        }

        Err(BotError::Other(
            "GitHub API rate limit retries exhausted".into(),
        ))
    }

    /// Check response status, mapping failures onto the error taxonomy.
    async fn check_response(
        resp: reqwest::Response,
        method: &str,
    ) -> Result<reqwest::Response, BotError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        match status.as_u16() {
            401 | 403 => Err(BotError::Authentication(format!(
                "GitHub API {method} {status}: {body}"
            ))),
            404 => Err(BotError::NotFound(format!(
                "GitHub API {method} {status}: {body}"
            ))),
            _ => Err(BotError::Other(format!(
                "GitHub API {method} {status}: {body}"
            ))),
        }
    }

    /// Make an authenticated GET request to the GitHub API.
    async fn api_get(&self, path: &str) -> Result<serde_json::Value, BotError> {
        let resp = self
            .api_request_with_retry(reqwest::Method::GET, path, None)
            .await?;
        let resp = Self::check_response(resp, "GET").await?;
        resp.json().await.map_err(BotError::Http)
    }

    /// Make a paginated GET request, collecting all pages of JSON arrays.
    ///
    /// Follows the `Link: <url>; rel="next"` header until no more pages.
    async fn api_get_all_pages(&self, path: &str) -> Result<Vec<serde_json::Value>, BotError> {
        let mut all_items = Vec::new();

        // First request uses the relative path
        let resp = self
            .api_request_with_retry(reqwest::Method::GET, path, None)
            .await?;
        let resp = Self::check_response(resp, "GET").await?;
        let mut next_url = parse_next_link(resp.headers());
        let page: serde_json::Value = resp.json().await.map_err(BotError::Http)?;
        if let Some(arr) = page.as_array() {
            all_items.extend(arr.iter().cloned());
        }

        // Follow pagination links
        while let Some(url) = next_url.take() {
            let resp = self
                .api_request_with_retry_url(reqwest::Method::GET, &url, None)
                .await?;
            let resp = Self::check_response(resp, "GET").await?;
            next_url = parse_next_link(resp.headers());
            let page: serde_json::Value = resp.json().await.map_err(BotError::Http)?;
            if let Some(arr) = page.as_array() {
                all_items.extend(arr.iter().cloned());
            }
        }

        Ok(all_items)
    }

    /// Make an authenticated POST request to the GitHub API.
    async fn api_post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, BotError> {
        let resp = self
            .api_request_with_retry(reqwest::Method::POST, path, Some(body))
            .await?;
        let resp = Self::check_response(resp, "POST").await?;
        resp.json().await.map_err(BotError::Http)
    }

    /// Fetch pull-request metadata for CLI-mode runs, where no webhook
    /// payload is available to supply it.
    pub async fn get_pr_context(&self, pr_number: u64) -> Result<crate::tools::PrContext, BotError> {
        let data = self
            .api_get(&format!("repos/{}/pulls/{}", self.repo_full, pr_number))
            .await?;
        Ok(crate::tools::PrContext {
            number: pr_number,
            title: data["title"].as_str().unwrap_or_default().to_string(),
            description: data["body"].as_str().unwrap_or_default().to_string(),
            author: data["user"]["login"].as_str().unwrap_or_default().to_string(),
            head_sha: data["head"]["sha"].as_str().unwrap_or_default().to_string(),
            head_branch: data["head"]["ref"].as_str().unwrap_or_default().to_string(),
            base_branch: data["base"]["ref"].as_str().unwrap_or_default().to_string(),
        })
    }
}

/// Extract the `rel="next"` URL from a `Link` response header.
fn parse_next_link(headers: &reqwest::header::HeaderMap) -> Option<String> {
    let link = headers.get("link")?.to_str().ok()?;
    for part in link.split(',') {
        let mut sections = part.split(';');
        let url = sections.next()?.trim();
        let is_next = sections.any(|s| s.trim() == "rel=\"next\"");
        if is_next {
            return Some(url.trim_start_matches('<').trim_end_matches('>').to_string());
        }
    }
    None
}

/// Truncate a comment body to GitHub's size limit on a char boundary.
fn truncate_comment(text: &str) -> &str {
    if text.len() <= MAX_COMMENT_CHARS {
        return text;
    }
    let mut end = MAX_COMMENT_CHARS;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[async_trait]
impl GitProvider for GithubProvider {
    async fn list_changed_files(&self, pr_number: u64) -> Result<Vec<ChangedFile>, BotError> {
        let path = format!(
            "repos/{}/pulls/{}/files?per_page=100",
            self.repo_full, pr_number
        );
        let items = self.api_get_all_pages(&path).await?;

        let files = items
            .iter()
            .map(|f| ChangedFile {
                filename: f["filename"].as_str().unwrap_or_default().to_string(),
                status: FileStatus::from_api(f["status"].as_str().unwrap_or_default()),
                patch: f["patch"].as_str().unwrap_or_default().to_string(),
            })
            .collect();

        Ok(files)
    }

    async fn get_file_content(&self, path: &str, git_ref: &str) -> Result<String, BotError> {
        let api_path = format!(
            "repos/{}/contents/{}?ref={}",
            self.repo_full, path, git_ref
        );
        // Content fetches are inherently per-file: a miss (too-large file,
        // submodule, transient failure) skips that file, it never aborts
        // the whole review. Auth and rate-limit failures still do.
        let resp = self.api_get(&api_path).await.map_err(|e| match e {
            e @ (BotError::Authentication(_) | BotError::RateLimited { .. }) => e,
            e => BotError::TransientFetch(format!("content of {path}: {e}")),
        })?;

        let content = resp["content"]
            .as_str()
            .unwrap_or_default()
            .replace('\n', "");
        let encoding = resp["encoding"].as_str().unwrap_or("");

        if encoding == "base64" {
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(&content)
                .unwrap_or_default();
            Ok(String::from_utf8_lossy(&decoded).into_owned())
        } else {
            Ok(content)
        }
    }

    async fn create_review_comment(
        &self,
        pr_number: u64,
        commit_id: &str,
        path: &str,
        position: usize,
        body: &str,
    ) -> Result<(), BotError> {
        let api_path = format!("repos/{}/pulls/{}/comments", self.repo_full, pr_number);
        self.api_post(
            &api_path,
            &json!({
                "commit_id": commit_id,
                "path": path,
                "position": position,
                "body": truncate_comment(body),
            }),
        )
        .await
        .map_err(|e| match e {
            // Comment posting failures that aren't auth/rate-limit are
            // publish errors; the batch continues past them.
            BotError::Other(msg) | BotError::NotFound(msg) => BotError::Publish(msg),
            other => other,
        })?;
        Ok(())
    }

    async fn create_issue_comment(&self, number: u64, body: &str) -> Result<(), BotError> {
        let path = format!("repos/{}/issues/{}/comments", self.repo_full, number);
        self.api_post(&path, &json!({"body": truncate_comment(body)}))
            .await?;
        Ok(())
    }

    async fn list_review_comments(
        &self,
        pr_number: u64,
    ) -> Result<Vec<PostedReviewComment>, BotError> {
        let path = format!(
            "repos/{}/pulls/{}/comments?per_page=100",
            self.repo_full, pr_number
        );
        let items = self.api_get_all_pages(&path).await?;
        Ok(items
            .iter()
            .map(|c| PostedReviewComment {
                path: c["path"].as_str().unwrap_or_default().to_string(),
                position: c["position"].as_u64(),
                body: c["body"].as_str().unwrap_or_default().to_string(),
            })
            .collect())
    }

    async fn list_issue_comments(&self, number: u64) -> Result<Vec<IssueComment>, BotError> {
        let path = format!(
            "repos/{}/issues/{}/comments?per_page=100",
            self.repo_full, number
        );
        let items = self.api_get_all_pages(&path).await?;
        Ok(items
            .iter()
            .map(|c| IssueComment {
                id: c["id"].as_u64().unwrap_or_default(),
                body: c["body"].as_str().unwrap_or_default().to_string(),
                user: c["user"]["login"].as_str().unwrap_or_default().to_string(),
            })
            .collect())
    }
}
