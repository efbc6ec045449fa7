use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Fetch failed: {0}")]
    TransientFetch(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("AI handler error: {0}")]
    AiHandler(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Template rendering error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<figment::Error> for BotError {
    fn from(err: figment::Error) -> Self {
        BotError::Config(Box::new(err))
    }
}

impl BotError {
    /// Whether this failure only affects the current file, so the review
    /// should continue with the remaining files.
    pub fn is_per_file(&self) -> bool {
        match self {
            BotError::TransientFetch(_) | BotError::AiHandler(_) => true,
            BotError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_none_or(|s| s.is_server_error())
            }
            _ => false,
        }
    }
}
