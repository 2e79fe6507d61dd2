//! Configuration for prism.
//!
//! All configuration comes from the process environment: the two provider
//! API keys and the listen port. Provider base URLs default to the real
//! endpoints and are overridable for testing against a local mock server.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

const DEFAULT_PORT: u16 = 8080;
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Root configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on (e.g., "0.0.0.0:8080")
    pub listen: String,
}

/// Upstream provider credentials and endpoints.
#[derive(Debug, Clone)]
pub struct ProvidersConfig {
    /// OpenAI API key (`OPENAI_API_KEY`)
    pub openai_api_key: ApiKey,
    /// Google AI API key (`GOOGLE_AI_KEY`)
    pub google_ai_key: ApiKey,
    /// OpenAI API base URL
    pub openai_base_url: String,
    /// Google generative language API base URL
    pub gemini_base_url: String,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Missing API keys are accepted (the upstream rejects the request at
    /// connection time); a malformed `PORT` is a startup error.
    pub fn from_env() -> Result<Self, Error> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|e| Error::Config(format!("invalid PORT '{raw}': {e}")))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            server: ServerConfig {
                listen: format!("0.0.0.0:{port}"),
            },
            providers: ProvidersConfig {
                openai_api_key: env_key("OPENAI_API_KEY"),
                google_ai_key: env_key("GOOGLE_AI_KEY"),
                openai_base_url: std::env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| OPENAI_BASE_URL.to_string()),
                gemini_base_url: std::env::var("GEMINI_BASE_URL")
                    .unwrap_or_else(|_| GEMINI_BASE_URL.to_string()),
            },
        })
    }
}

fn env_key(var: &str) -> ApiKey {
    match std::env::var(var) {
        Ok(value) => ApiKey::from(value),
        Err(_) => {
            tracing::warn!(var, "API key not set; upstream requests will be rejected");
            ApiKey::from(String::new())
        }
    }
}

/// API key wrapper that redacts in Debug/Display/Serialize and zeroizes on drop.
///
/// The inner `SecretString` ensures the key value is:
/// - Zeroized in memory when dropped
/// - Never exposed via Debug or Display
/// - Only accessible via `.expose_secret()` (grep-auditable)
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Access the raw key value. Every call site is auditable via `grep expose_secret`.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }

    /// Whether a key value is present at all.
    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Serialize for ApiKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for ApiKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|s| ApiKey(SecretString::from(s)))
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        ApiKey(SecretString::from(s))
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        ApiKey(SecretString::from(s))
    }
}
