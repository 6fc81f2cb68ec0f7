//! Environment-sourced configuration for chatrelay.

use std::net::SocketAddr;

/// Upstream API version used when `AZURE_OPENAI_VERSION` is not set.
const DEFAULT_API_VERSION: &str = "2024-05-01-preview";

/// Listening port used when `PORT` is not set.
const DEFAULT_PORT: u16 = 5000;

/// Runtime configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the upstream Azure OpenAI resource.
    pub endpoint: String,
    /// API version query parameter sent on every upstream call.
    pub api_version: String,
    /// Default deployment used when a request does not name a model.
    pub deployment: Option<String>,
    /// Port the HTTP server listens on.
    pub port: u16,
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from a custom variable lookup.
    ///
    /// The closure-based design keeps tests off global env state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup("AZURE_OPENAI_ENDPOINT")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingEndpoint)?;

        let api_version = lookup("AZURE_OPENAI_VERSION")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        let deployment = lookup("AZURE_OPENAI_DEPLOYMENT_NAME").filter(|v| !v.is_empty());

        let port = match lookup("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidPort(raw))?,
            None => DEFAULT_PORT,
        };

        Ok(Config {
            endpoint,
            api_version,
            deployment,
            port,
        })
    }

    /// Socket address the server binds to.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

/// Configuration errors.
///
/// Surfaced at startup (or by `chatrelay check`), never per request.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("AZURE_OPENAI_ENDPOINT environment variable is not set")]
    MissingEndpoint,

    #[error("PORT value '{0}' is not a valid port number")]
    InvalidPort(String),
}
