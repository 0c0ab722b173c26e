use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub auth: AuthConfig,
    /// Whether the speech-transcription capability is offered to clients.
    pub transcription_enabled: bool,
    /// Live sessions untouched for this long are ended.
    pub session_idle_ttl_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

/// Settings for verifying identity tokens issued by the identity provider.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            auth: AuthConfig {
                jwt_secret: require_env("AUTH_JWT_SECRET")?,
                issuer: optional_env("AUTH_ISSUER"),
                audience: optional_env("AUTH_AUDIENCE"),
            },
            transcription_enabled: optional_env("TRANSCRIPTION_ENABLED")
                .map(|v| parse_flag(&v))
                .transpose()
                .context("TRANSCRIPTION_ENABLED must be true/false")?
                .unwrap_or(true),
            session_idle_ttl_secs: optional_env("SESSION_IDLE_TTL_SECS")
                .map(|v| v.trim().parse::<u64>())
                .transpose()
                .context("SESSION_IDLE_TTL_SECS must be a whole number of seconds")?
                .unwrap_or(1800),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("unrecognised flag value '{other}'"),
    }
}
