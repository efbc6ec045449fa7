use std::collections::HashMap;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::ai::anthropic::AnthropicHandler;
use crate::config::loader::load_settings;
use crate::error::BotError;
use crate::git::GitProvider;
use crate::git::github::GithubProvider;
use crate::tools::review::PrReviewer;

/// pr-review-bot: webhook-driven GitHub greeter and AI PR reviewer.
#[derive(Parser, Debug)]
#[command(name = "pr-review-bot", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Extra arguments passed as config overrides (--section.key=value).
    /// Place after `--` separator: `pr-review-bot serve -- --server.port=8080`
    #[arg(last = true, allow_hyphen_values = true, global = true)]
    pub rest: Vec<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Start the webhook server.
    Serve,
    /// Run the review pipeline against a pull request of the configured repo.
    Review {
        /// Pull request number.
        #[arg(long)]
        pr: u64,
    },
    /// Check if the server is healthy (for Docker HEALTHCHECK).
    Health,
}

/// Forbidden config keys that cannot be overridden via CLI args.
///
/// These are security-sensitive — exposing them to override input could
/// allow secrets exfiltration or provider redirection.
pub const FORBIDDEN_OVERRIDE_KEYS: &[&str] = &[
    "user_token",
    "webhook_secret",
    "key",
    "base_url",
];

/// Check if a config key is forbidden for override.
///
/// Returns `Some(matched_forbidden_key)` if the key matches, `None` if allowed.
pub fn check_forbidden_key(key: &str) -> Option<&'static str> {
    let key_lower = key.to_lowercase();
    let segments: Vec<&str> = key_lower.split('.').collect();
    FORBIDDEN_OVERRIDE_KEYS
        .iter()
        .find(|&&forbidden| key_lower == forbidden || segments.contains(&forbidden))
        .copied()
}

/// Parse the `rest` args into a HashMap of config overrides.
/// Format: `--section.key=value` or `--section__key=value` (double underscores → dots).
fn parse_config_overrides(rest: &[String]) -> Result<HashMap<String, String>, BotError> {
    let mut overrides = HashMap::new();

    for arg in rest {
        let stripped = arg.trim_start_matches('-');
        if stripped.is_empty() {
            continue;
        }

        let stripped = stripped.replace("__", ".");

        if let Some((key, value)) = stripped.split_once('=') {
            if let Some(forbidden) = check_forbidden_key(key) {
                return Err(BotError::Other(format!(
                    "forbidden CLI override: '{key}' (matches '{forbidden}')"
                )));
            }

            overrides.insert(key.to_string(), value.to_string());
        }
    }

    Ok(overrides)
}

pub async fn run() -> Result<(), BotError> {
    let cli = Cli::parse();

    // Health check runs before any settings load — fast, lightweight.
    if cli.command == Command::Health {
        return health_check().await;
    }

    let config_overrides = parse_config_overrides(&cli.rest)?;
    let settings = Arc::new(load_settings(&config_overrides)?);

    tracing::info!(
        command = ?cli.command,
        repo = %settings.github.repo,
        model = %settings.anthropic.model,
        overrides = config_overrides.len(),
        "starting pr-review-bot"
    );

    match cli.command {
        Command::Serve => {
            crate::server::start_server(settings).await?;
        }
        Command::Review { pr } => {
            let github = GithubProvider::new(&settings)?;
            let context = github.get_pr_context(pr).await?;

            let provider: Arc<dyn GitProvider> = Arc::new(github);
            let ai = Arc::new(AnthropicHandler::new(&settings)?);
            let reviewer = PrReviewer::new(provider, ai, settings);

            let outcome = reviewer.run(&context).await?;
            println!(
                "Posted {} comment(s), skipped {}, failed {}",
                outcome.posted, outcome.skipped, outcome.failed
            );
        }
        Command::Health => unreachable!("handled above"),
    }

    Ok(())
}

/// Lightweight health check: GET http://127.0.0.1:$PORT/ with a 5s timeout.
///
/// Used by Docker HEALTHCHECK in distroless images where curl is unavailable.
async fn health_check() -> Result<(), BotError> {
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let url = format!("http://127.0.0.1:{port}/");
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .map_err(|e| BotError::Other(format!("health check failed: {e}")))?;
    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(|e| BotError::Other(format!("health check failed: {e}")))?;
    if resp.status().is_success() {
        Ok(())
    } else {
        Err(BotError::Other(format!(
            "health check failed: status {}",
            resp.status()
        )))
    }
}
