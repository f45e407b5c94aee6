//! Identity provider client. Session establishment never trusts the
//! caller's token blindly; every cookie issued here is backed by a
//! validation round-trip to the provider.

use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct IdpUser {
    pub id: String,
    pub email: Option<String>,
    /// Remaining token lifetime in seconds, when the provider reports one.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Successful validation: who the token belongs to, and how long the
/// session cookie minted from it may live.
#[derive(Debug)]
pub struct ValidatedSession {
    pub user: IdpUser,
    pub expires_in: i64,
}

pub const DEFAULT_SESSION_TTL: i64 = 3600;

#[derive(Clone)]
pub struct IdentityProvider {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl IdentityProvider {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = std::env::var("SUPABASE_URL")
            .map_err(|_| anyhow::anyhow!("SUPABASE_URL must be set"))?;
        let anon_key = std::env::var("SUPABASE_ANON_KEY")
            .map_err(|_| anyhow::anyhow!("SUPABASE_ANON_KEY must be set"))?;
        Ok(Self::new(base_url, anon_key))
    }

    /// Asks the provider who this access token belongs to. Any failure
    /// (network, non-2xx, malformed body) is Unauthorized: a token we
    /// cannot positively validate never becomes a session.
    pub async fn validate_token(&self, token: &str) -> Result<ValidatedSession, ApiError> {
        let url = format!("{}/auth/v1/user", self.base_url);
        let resp = self
            .http
            .get(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                log::warn!("identity provider unreachable: {e}");
                ApiError::Unauthorized
            })?;
        if !resp.status().is_success() {
            return Err(ApiError::Unauthorized);
        }
        let user: IdpUser = resp.json().await.map_err(|_| ApiError::Unauthorized)?;
        let expires_in = user.expires_in.unwrap_or(DEFAULT_SESSION_TTL);
        Ok(ValidatedSession { user, expires_in })
    }
}
