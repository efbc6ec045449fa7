use std::collections::HashMap;

use figment::Figment;
use figment::providers::{Env, Format, Toml};

use crate::config::types::Settings;
use crate::error::BotError;

// Embedded default TOML files.
// This makes the binary self-contained while keeping retrocompatibility.
static CONFIGURATION_TOML: &str = include_str!("../../settings/configuration.toml");
static PR_REVIEW_PROMPTS: &str = include_str!("../../settings/pr_review_prompts.toml");

/// Build the full configuration by merging layers:
///
/// 1. Embedded TOML defaults (`settings/configuration.toml`, prompts)
/// 2. Secrets file from filesystem (`.secrets.toml`, optional)
/// 3. CLI argument overrides (`--section.key=value`)
/// 4. Well-known env var aliases (GITHUB_PAT, WEBHOOK_SECRET, ...)
/// 5. Dotted SECTION.KEY env vars (highest precedence)
///
/// The result is immutable: callers wrap it in an `Arc` and hand references
/// to each component. Nothing re-reads the environment after startup.
pub fn load_settings(cli_overrides: &HashMap<String, String>) -> Result<Settings, BotError> {
    // Layer 1: embedded defaults
    let mut figment = Figment::new()
        .merge(Toml::string(CONFIGURATION_TOML))
        .merge(Toml::string(PR_REVIEW_PROMPTS));

    // Layer 2: secrets file (optional, from filesystem)
    figment = figment.merge(Toml::file(".secrets.toml"));
    figment = figment.merge(Toml::file("settings/.secrets.toml"));

    // Layer 3: CLI argument overrides (--pr_review.extra_instructions=...)
    for (key, value) in cli_overrides {
        // Figment doesn't have a direct "set key" method for arbitrary dotted keys,
        // so we build a TOML fragment: `[section]\nkey = value`
        if let Some(toml_fragment) = cli_override_to_toml(key, value) {
            figment = figment.merge(Toml::string(&toml_fragment));
        }
    }

    // Layer 4: Well-known env var aliases (underscore-separated names)
    figment = figment.merge(
        Env::raw()
            .map(|key| match key.as_str() {
                "GITHUB_PAT" | "GITHUB_TOKEN" => "github.user_token".into(),
                "WEBHOOK_SECRET" => "github.webhook_secret".into(),
                "GITHUB_REPOSITORY" => "github.repo".into(),
                "ANTHROPIC_API_KEY" => "anthropic.key".into(),
                "ANTHROPIC_BASE_URL" => "anthropic.base_url".into(),
                "ANTHROPIC_MODEL" => "anthropic.model".into(),
                _ => key.into(),
            })
            .only(&[
                "GITHUB_PAT",
                "GITHUB_TOKEN",
                "WEBHOOK_SECRET",
                "GITHUB_REPOSITORY",
                "ANTHROPIC_API_KEY",
                "ANTHROPIC_BASE_URL",
                "ANTHROPIC_MODEL",
            ]),
    );

    // PORT goes through the fragment path so it lands as an integer, not a
    // string the extractor would reject.
    if let Ok(port) = std::env::var("PORT")
        && port.trim().parse::<u16>().is_ok()
    {
        figment = figment.merge(Toml::string(&format!("[server]\nport = {}", port.trim())));
    }

    // Layer 5: Dotted SECTION.KEY env vars (GITHUB.REPO → github.repo).
    //
    // Handled as TOML fragments instead of Figment's Env provider, because
    // Env treats all values as strings and cannot deserialize numeric or
    // boolean fields from them reliably.
    for (key, value) in std::env::vars() {
        if !key.contains('.') {
            continue;
        }
        let lower = key.to_lowercase();
        let Some((section, field)) = lower.split_once('.') else {
            continue;
        };
        if let Some(fragment) = cli_override_to_toml(&format!("{section}.{field}"), value.trim()) {
            figment = figment.merge(Toml::string(&fragment));
        }
    }

    let settings: Settings = figment.extract()?;
    Ok(settings)
}

/// Convert an override like "pr_review.extra_instructions=Focus on tests"
/// into a TOML fragment.
fn cli_override_to_toml(key: &str, value: &str) -> Option<String> {
    let (section, field) = match key.split_once('.') {
        Some(pair) => pair,
        None => {
            tracing::warn!("ignoring override with no section: {key}={value}");
            return None;
        }
    };
    // Try to detect type: bool, int, float, or string
    let is_literal = value == "true"
        || value == "false"
        || value.parse::<i64>().is_ok()
        || value.parse::<f64>().is_ok();
    let toml_value = if is_literal {
        value.to_string()
    } else {
        let escaped = value
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t");
        format!("\"{escaped}\"")
    };
    Some(format!("[{section}]\n{field} = {toml_value}"))
}
