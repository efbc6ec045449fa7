use serde::{Deserialize, Serialize};

/// Redact a secret string for Debug output. Shows "[REDACTED]" if non-empty, "[]" if empty.
fn redact(s: &str) -> &str {
    if s.is_empty() { "[]" } else { "[REDACTED]" }
}

/// Top-level configuration. Each field maps to a TOML `[section]`.
/// Uses `#[serde(default)]` so missing sections gracefully fall back.
///
/// Built once at startup and passed by reference into each component;
/// there are no ambient settings lookups anywhere in the core logic.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Settings {
    pub config: GlobalConfig,
    pub server: ServerConfig,
    pub github: GithubConfig,
    pub anthropic: AnthropicConfig,
    pub greet: GreetConfig,
    pub pr_review: PrReviewConfig,
    pub pr_review_prompt: PromptTemplate,
}

// ── [config] ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Request timeout in seconds for hosting and AI API calls.
    pub ai_timeout: u64,
    /// When false, reviews are logged instead of posted (CLI dry runs).
    pub publish_output: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            ai_timeout: 120,
            publish_output: true,
        }
    }
}

// ── [server] ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

// ── [github] ────────────────────────────────────────────────────────

#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GithubConfig {
    /// Personal access token used for all API calls.
    pub user_token: String,
    /// Shared secret for webhook HMAC verification.
    pub webhook_secret: String,
    /// Target repository, "owner/repo".
    pub repo: String,
    pub base_url: String,
    pub ratelimit_retries: u32,
}

impl std::fmt::Debug for GithubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubConfig")
            .field("user_token", &redact(&self.user_token))
            .field("webhook_secret", &redact(&self.webhook_secret))
            .field("repo", &self.repo)
            .field("base_url", &self.base_url)
            .field("ratelimit_retries", &self.ratelimit_retries)
            .finish()
    }
}

// ── [anthropic] ─────────────────────────────────────────────────────

#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AnthropicConfig {
    pub key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl std::fmt::Debug for AnthropicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicConfig")
            .field("key", &redact(&self.key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

// ── [greet] ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GreetConfig {
    /// The single recognized issue-comment command.
    pub trigger: String,
}

impl Default for GreetConfig {
    fn default() -> Self {
        Self {
            trigger: "/greet".into(),
        }
    }
}

// ── [pr_review] ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PrReviewConfig {
    /// Free-form instructions appended to the review prompt.
    pub extra_instructions: String,
}

// ── [pr_review_prompt] ──────────────────────────────────────────────

/// A system/user prompt template pair (minijinja syntax).
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PromptTemplate {
    pub system: String,
    pub user: String,
}
