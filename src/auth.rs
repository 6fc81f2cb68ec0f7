//! Azure AD token acquisition for upstream calls.
//!
//! The relay never accepts a secret from its own callers. Outbound requests
//! are authenticated with short-lived bearer tokens resolved through a
//! default-credential chain: an explicit client secret from the environment
//! first, then the instance metadata service (managed identity).

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// OAuth scope for the Azure Cognitive Services audience.
pub const COGNITIVE_SERVICES_SCOPE: &str = "https://cognitiveservices.azure.com/.default";

/// Token endpoint authority used when `AZURE_AUTHORITY_HOST` is not set.
const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Instance metadata service base used when `IDENTITY_ENDPOINT` is not set.
const DEFAULT_IMDS_ENDPOINT: &str = "http://169.254.169.254";

/// A short-lived bearer credential for the upstream endpoint.
///
/// The inner `SecretString` keeps the token out of Debug output and zeroizes
/// it on drop. [`BearerToken::authorization_value`] is the only way to read
/// it back out.
#[derive(Clone)]
pub struct BearerToken {
    secret: SecretString,
    /// Seconds of validity reported by the identity service.
    pub expires_in: u64,
}

impl BearerToken {
    pub fn new(token: impl Into<String>, expires_in: u64) -> Self {
        Self {
            secret: SecretString::from(token.into()),
            expires_in,
        }
    }

    /// Render the `Authorization` header value.
    pub fn authorization_value(&self) -> String {
        format!("Bearer {}", self.secret.expose_secret())
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken")
            .field("secret", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Errors from token acquisition.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("identity service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("identity service returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error(
        "no usable credential: set AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET, \
         or run with a managed identity"
    )]
    NoCredential,
}

/// Source of bearer tokens for outbound calls.
///
/// The forwarder holds this as a trait object so tests can substitute a
/// static credential.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Obtain a token for the given OAuth scope.
    async fn token(&self, scope: &str) -> Result<BearerToken, AuthError>;
}

/// Wire shape of a token response from either identity endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default, deserialize_with = "deserialize_expires_in")]
    expires_in: u64,
}

/// IMDS reports `expires_in` as a string, the v2 token endpoint as a number.
fn deserialize_expires_in<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// Client-credentials parameters discovered from the environment.
struct ClientSecretConfig {
    tenant_id: String,
    client_id: String,
    client_secret: SecretString,
}

/// Credential chain mirroring default Azure credential discovery.
///
/// A step that is not configured is skipped; a configured step that fails is
/// the chain's result. The chain itself never retries -- the forwarder
/// re-invokes it on each attempt.
pub struct DefaultCredentialChain {
    client: reqwest::Client,
    authority_host: String,
    imds_endpoint: String,
    client_secret: Option<ClientSecretConfig>,
}

impl DefaultCredentialChain {
    /// Discover chain configuration from process environment variables.
    pub fn new(client: reqwest::Client) -> Self {
        Self::from_lookup(client, |name| std::env::var(name).ok())
    }

    /// Build the chain from a custom variable lookup.
    ///
    /// Tests use this to point the authority and IMDS endpoints at local
    /// mock servers without touching global env state.
    pub fn from_lookup<F>(client: reqwest::Client, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let client_secret = match (
            lookup("AZURE_TENANT_ID"),
            lookup("AZURE_CLIENT_ID"),
            lookup("AZURE_CLIENT_SECRET"),
        ) {
            (Some(tenant_id), Some(client_id), Some(secret)) => Some(ClientSecretConfig {
                tenant_id,
                client_id,
                client_secret: SecretString::from(secret),
            }),
            _ => None,
        };

        Self {
            client,
            authority_host: lookup("AZURE_AUTHORITY_HOST")
                .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string()),
            imds_endpoint: lookup("IDENTITY_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_IMDS_ENDPOINT.to_string()),
            client_secret,
        }
    }

    /// Client-credentials grant against the v2 token endpoint.
    async fn client_secret_token(
        &self,
        config: &ClientSecretConfig,
        scope: &str,
    ) -> Result<BearerToken, AuthError> {
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            config.tenant_id
        );

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.expose_secret()),
            ("scope", scope),
        ];

        let response = self.client.post(&url).form(&form).send().await?;
        parse_token_response(response).await
    }

    /// Managed identity token from the instance metadata service.
    async fn imds_token(&self, scope: &str) -> Result<BearerToken, AuthError> {
        // IMDS takes a bare resource URI, not a scope
        let resource = scope.strip_suffix("/.default").unwrap_or(scope);

        let url = format!(
            "{}/metadata/identity/oauth2/token",
            self.imds_endpoint.trim_end_matches('/')
        );

        let response = self
            .client
            .get(&url)
            .header("Metadata", "true")
            .query(&[("api-version", "2018-02-01"), ("resource", resource)])
            .send()
            .await?;
        parse_token_response(response).await
    }
}

async fn parse_token_response(response: reqwest::Response) -> Result<BearerToken, AuthError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::Rejected {
            status: status.as_u16(),
            body,
        });
    }

    let token: TokenResponse = response.json().await?;
    Ok(BearerToken::new(token.access_token, token.expires_in))
}

#[async_trait]
impl TokenCredential for DefaultCredentialChain {
    async fn token(&self, scope: &str) -> Result<BearerToken, AuthError> {
        if let Some(config) = &self.client_secret {
            tracing::debug!(client_id = %config.client_id, "Requesting token via client secret");
            return self.client_secret_token(config, scope).await;
        }

        match self.imds_token(scope).await {
            Ok(token) => Ok(token),
            Err(AuthError::Transport(e)) => {
                // An unreachable IMDS means no managed identity is available
                tracing::debug!(error = %e, "IMDS unreachable, credential chain exhausted");
                Err(AuthError::NoCredential)
            }
            Err(e) => Err(e),
        }
    }
}
