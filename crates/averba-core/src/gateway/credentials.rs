//! Bearer credential cache for the gateway client.
//!
//! The identity provider is an opaque collaborator: it hands out a bearer
//! token with an expiry. The cache memoizes the token and refreshes it via
//! `get_or_refresh(now)` once the expiry (minus a safety margin) has
//! passed. It is an explicit object injected into the gateway client, not a
//! module-level global, so concurrent orchestrator instances never share
//! hidden state.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use secrecy::SecretString;
use tokio::sync::Mutex;

use super::GatewayError;

/// A bearer credential with its true expiry.
#[derive(Clone)]
pub struct Credential {
    /// The bearer token. Never logged.
    pub token: SecretString,
    /// When the provider says the token stops working.
    pub expires_at: DateTime<Utc>,
}

/// Source of fresh credentials (the identity provider seam).
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Issues a fresh credential.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::CredentialExpired`] when the user's identity
    /// session itself is gone and re-authentication is required, or a
    /// transport error.
    async fn issue(&self) -> Result<Credential, GatewayError>;
}

/// A fixed token that never refreshes, for tools and tests.
pub struct StaticCredentialSource {
    token: SecretString,
}

impl StaticCredentialSource {
    /// Wraps a fixed bearer token.
    #[must_use]
    pub const fn new(token: SecretString) -> Self {
        Self { token }
    }
}

#[async_trait]
impl CredentialSource for StaticCredentialSource {
    async fn issue(&self) -> Result<Credential, GatewayError> {
        Ok(Credential {
            token: self.token.clone(),
            // Far enough out that the cache never refreshes.
            expires_at: Utc.with_ymd_and_hms(9999, 1, 1, 0, 0, 0).unwrap(),
        })
    }
}

/// Default safety margin subtracted from the provider's expiry.
const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(60);

/// Memoizing credential cache with `get_or_refresh(now)` semantics.
pub struct CredentialCache<S> {
    source: S,
    safety_margin: chrono::Duration,
    cached: Mutex<Option<Credential>>,
}

impl<S: CredentialSource> CredentialCache<S> {
    /// Creates a cache over the given source with the default safety margin.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::with_safety_margin(source, DEFAULT_SAFETY_MARGIN)
    }

    /// Creates a cache that treats tokens as stale `margin` before their
    /// true expiry.
    #[must_use]
    pub fn with_safety_margin(source: S, margin: Duration) -> Self {
        Self {
            source,
            safety_margin: chrono::Duration::from_std(margin).unwrap_or_default(),
            cached: Mutex::new(None),
        }
    }

    /// Returns the cached token, refreshing it from the source when the
    /// cached one is absent or stale at `now`.
    ///
    /// # Errors
    ///
    /// Propagates the source's error when a refresh is needed and fails.
    pub async fn get_or_refresh(&self, now: DateTime<Utc>) -> Result<SecretString, GatewayError> {
        let mut cached = self.cached.lock().await;
        if let Some(credential) = cached.as_ref() {
            if now + self.safety_margin < credential.expires_at {
                return Ok(credential.token.clone());
            }
        }
        let fresh = self.source.issue().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    /// Drops the cached credential so the next call refreshes.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}
