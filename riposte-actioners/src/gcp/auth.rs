use std::path::Path;
use std::time::{Duration, Instant, SystemTime};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::GcpError;

const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Slack subtracted from a token's lifetime before it is considered stale.
const EXPIRY_SLACK: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
}

#[derive(Debug, Serialize)]
struct ServiceAccountClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

struct CachedToken {
    token: String,
    stale_at: Instant,
}

/// Produces OAuth2 access tokens, either from a service-account key file
/// or from the GCE metadata service when running on Google infrastructure.
pub struct TokenProvider {
    http: reqwest::Client,
    key: Option<ServiceAccountKey>,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(http: reqwest::Client, credentials_file: Option<&Path>) -> Result<Self, GcpError> {
        let key = match credentials_file {
            Some(path) => {
                let data = std::fs::read(path).map_err(|e| {
                    GcpError::Credentials(format!("cannot read {}: {e}", path.display()))
                })?;
                Some(serde_json::from_slice(&data).map_err(|e| {
                    GcpError::Credentials(format!("cannot parse {}: {e}", path.display()))
                })?)
            }
            None => None,
        };

        Ok(Self {
            http,
            key,
            cached: Mutex::new(None),
        })
    }

    pub async fn access_token(&self) -> Result<String, GcpError> {
        let mut cached = self.cached.lock().await;
        if let Some(entry) = &*cached {
            if entry.stale_at > Instant::now() {
                return Ok(entry.token.clone());
            }
        }

        let (token, expires_in) = match &self.key {
            Some(key) => self.exchange_service_account_jwt(key).await?,
            None => self.metadata_token().await?,
        };

        let lifetime = Duration::from_secs(expires_in).saturating_sub(EXPIRY_SLACK);
        *cached = Some(CachedToken {
            token: token.clone(),
            stale_at: Instant::now() + lifetime,
        });
        Ok(token)
    }

    async fn exchange_service_account_jwt(
        &self,
        key: &ServiceAccountKey,
    ) -> Result<(String, u64), GcpError> {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_err(|e| GcpError::Credentials(format!("system clock error: {e}")))?
            .as_secs();

        let claims = ServiceAccountClaims {
            iss: &key.client_email,
            scope: CLOUD_PLATFORM_SCOPE,
            aud: GOOGLE_TOKEN_URL,
            iat: now,
            exp: now + 3600,
        };

        let encoding_key = jsonwebtoken::EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| GcpError::Credentials(format!("invalid service account key: {e}")))?;

        let header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256);
        let assertion = jsonwebtoken::encode(&header, &claims, &encoding_key)?;

        debug!(account = %key.client_email, "Exchanging service account JWT for access token");

        let response = self
            .http
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", &assertion),
            ])
            .send()
            .await
            .map_err(|e| GcpError::Credentials(format!("token request failed: {e}")))?
            .error_for_status()
            .map_err(|e| GcpError::Credentials(format!("token exchange failed: {e}")))?;

        let resp: TokenResponse = response
            .json()
            .await
            .map_err(|e| GcpError::Credentials(format!("token response parse failed: {e}")))?;
        Ok((resp.access_token, resp.expires_in))
    }

    async fn metadata_token(&self) -> Result<(String, u64), GcpError> {
        let response = self
            .http
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| GcpError::Credentials(format!("metadata token request failed: {e}")))?
            .error_for_status()
            .map_err(|e| GcpError::Credentials(format!("metadata token request failed: {e}")))?;

        let resp: TokenResponse = response
            .json()
            .await
            .map_err(|e| GcpError::Credentials(format!("metadata token parse failed: {e}")))?;
        Ok((resp.access_token, resp.expires_in))
    }
}
