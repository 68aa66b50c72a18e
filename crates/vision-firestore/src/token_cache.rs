//! Access tokens for the Firestore REST API.
//!
//! Service-account tokens are cached and refreshed a minute before they expire,
//! with a single writer doing the refresh. The emulator takes a fixed token.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use gcp_auth::TokenProvider;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{FirestoreError, FirestoreResult};

/// Refresh tokens this long before they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// TTL assumed when the reported expiry cannot be converted.
const TOKEN_DEFAULT_TTL: Duration = Duration::from_secs(50 * 60);

/// OAuth scope for Firestore/Datastore access.
pub const FIRESTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

/// Token accepted by the Firestore emulator for admin access.
pub const EMULATOR_TOKEN: &str = "owner";

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }

    fn is_usable(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Source of bearer tokens for Firestore requests.
pub enum AccessTokens {
    /// Tokens minted by a GCP provider and cached until near expiry.
    Cached(TokenCache),
    /// Fixed token, used against the emulator.
    Static(String),
}

impl AccessTokens {
    /// Tokens from a GCP provider.
    pub fn from_provider(auth: Arc<dyn TokenProvider>) -> Self {
        Self::Cached(TokenCache::new(auth))
    }

    /// Fixed emulator token.
    pub fn emulator() -> Self {
        Self::Static(EMULATOR_TOKEN.to_string())
    }

    /// Current bearer token.
    pub async fn get(&self) -> FirestoreResult<String> {
        match self {
            Self::Cached(cache) => cache.get_token().await,
            Self::Static(token) => Ok(token.clone()),
        }
    }

    /// Drop any cached token so the next call mints a new one.
    pub async fn invalidate(&self) {
        if let Self::Cached(cache) = self {
            cache.invalidate().await;
        }
    }
}

/// Thread-safe token cache with single-flight refresh.
pub struct TokenCache {
    auth: Arc<dyn TokenProvider>,
    cache: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(auth: Arc<dyn TokenProvider>) -> Self {
        Self {
            auth,
            cache: RwLock::new(None),
        }
    }

    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    /// Get a valid access token, refreshing if necessary.
    ///
    /// On refresh failure an older token is still returned while it has not expired.
    pub async fn get_token(&self) -> FirestoreResult<String> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.is_fresh() {
                return Ok(cached.access_token.clone());
            }
        }

        let mut cache = self.cache.write().await;

        // Another task may have refreshed while we waited for the lock
        if let Some(cached) = cache.as_ref() {
            if cached.is_fresh() {
                return Ok(cached.access_token.clone());
            }
        }

        match self.auth.token(&[FIRESTORE_SCOPE]).await {
            Ok(token) => {
                let access_token = token.as_str().to_string();
                let expires_at = expiry_instant(token.expires_at(), Utc::now());

                *cache = Some(CachedToken {
                    access_token: access_token.clone(),
                    expires_at,
                });

                debug!("Refreshed Firestore access token");
                Ok(access_token)
            }
            Err(e) => match cache.as_ref() {
                Some(cached) if cached.is_usable() => {
                    warn!("Token refresh failed, using existing token: {}", e);
                    Ok(cached.access_token.clone())
                }
                _ => Err(FirestoreError::auth_error(format!(
                    "Failed to obtain auth token: {}",
                    e
                ))),
            },
        }
    }
}

/// Map a wall-clock expiry onto the monotonic clock.
///
/// Already-expired tokens map to now so the next request refreshes.
fn expiry_instant(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Instant {
    if expires_at <= now {
        return Instant::now();
    }
    let ttl = (expires_at - now).to_std().unwrap_or(TOKEN_DEFAULT_TTL);
    Instant::now() + ttl
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_in_future() {
        let now = Utc::now();
        let at = expiry_instant(now + chrono::Duration::minutes(30), now);
        let remaining = at.saturating_duration_since(Instant::now());
        assert!(remaining > Duration::from_secs(29 * 60));
        assert!(remaining <= Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_expired_token_forces_refresh() {
        let now = Utc::now();
        let at = expiry_instant(now - chrono::Duration::minutes(1), now);
        let cached = CachedToken {
            access_token: "t".into(),
            expires_at: at,
        };
        assert!(!cached.is_fresh());
    }

    #[test]
    fn test_token_inside_margin_is_usable_but_stale() {
        let cached = CachedToken {
            access_token: "t".into(),
            expires_at: Instant::now() + Duration::from_secs(30),
        };
        assert!(cached.is_usable());
        assert!(!cached.is_fresh());
    }

    #[tokio::test]
    async fn test_emulator_token() {
        let tokens = AccessTokens::emulator();
        tokens.invalidate().await;
        assert_eq!(tokens.get().await.unwrap(), EMULATOR_TOKEN);
    }
}
