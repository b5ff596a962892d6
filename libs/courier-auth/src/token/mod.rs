//! API bearer token lifecycle.

mod source;

pub use source::{
    ApiTokenSource, DEFAULT_TOKEN_PATH, EndpointTokenSource, IssuedToken, StaticTokenSource,
};

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwapOption;
use courier::AuthError;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::secret::SecretToken;
use crate::store::KeyValueStore;

/// Storage key of the persisted API token
pub const API_TOKEN_KEY: &str = "api_bearer_token";

/// Storage key of the persisted token's expiry, in unix seconds
pub const API_TOKEN_EXPIRY_KEY: &str = "api_bearer_token_expires_at";

/// Tokens are treated as expired this long before the issuer says so
pub const EXPIRY_SKEW: Duration = Duration::from_secs(30);

struct CachedToken {
    token: SecretToken,
    expires_at: Option<Instant>,
}

impl CachedToken {
    /// `ttl` is the usable lifetime, skew already deducted
    fn new(token: SecretToken, ttl: Option<Duration>) -> Self {
        Self {
            token,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_fresh(&self) -> bool {
        self.expires_at.is_none_or(|at| Instant::now() < at)
    }
}

/// Cached API bearer token.
///
/// Reads are lock-free (`ArcSwapOption`). When the cache is empty or stale,
/// one caller fetches from the [`ApiTokenSource`] while concurrent callers
/// wait for its result instead of issuing their own request.
///
/// With a [`KeyValueStore`] attached, fetched tokens are persisted under
/// [`API_TOKEN_KEY`] (expiry under [`API_TOKEN_EXPIRY_KEY`]) and a cold cache
/// is filled from the store first. A persisted token without an expiry is
/// used until rejected; one whose expiry has passed is ignored.
///
/// `ApiToken` is [`Clone`]; clones share the cache.
#[derive(Clone)]
pub struct ApiToken {
    cached: Arc<ArcSwapOption<CachedToken>>,
    refresh: Arc<Mutex<()>>,
    source: Arc<dyn ApiTokenSource>,
    store: Option<Arc<dyn KeyValueStore>>,
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiToken")
            .field("cached", &self.cached.load().is_some())
            .field("persistent", &self.store.is_some())
            .finish_non_exhaustive()
    }
}

impl ApiToken {
    #[must_use]
    pub fn new(source: Arc<dyn ApiTokenSource>) -> Self {
        Self {
            cached: Arc::new(ArcSwapOption::empty()),
            refresh: Arc::new(Mutex::new(())),
            source,
            store: None,
        }
    }

    /// Persist tokens in `store`
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Current token, fetching a new one when none is cached or it expired.
    ///
    /// # Errors
    ///
    /// Returns the source's error when a fetch is needed and fails, or
    /// [`AuthError::Storage`] when the store cannot be read or written.
    pub async fn get(&self) -> Result<SecretToken, AuthError> {
        if let Some(token) = self.fresh() {
            return Ok(token);
        }

        let _guard = self.refresh.lock().await;
        // another caller may have refreshed while we waited
        if let Some(token) = self.fresh() {
            return Ok(token);
        }

        if self.cached.load().is_none()
            && let Some(store) = &self.store
            && let Some(restored) = restore(store.as_ref()).await?
        {
            debug!("API token restored from store");
            let token = restored.token.clone();
            self.cached.store(Some(Arc::new(restored)));
            return Ok(token);
        }

        let issued = self.source.fetch().await?;
        let ttl = issued.expires_in.map(|ttl| ttl.saturating_sub(EXPIRY_SKEW));
        if let Some(store) = &self.store {
            persist(store.as_ref(), &issued.token, ttl).await?;
        }
        let cached = CachedToken::new(issued.token, ttl);
        let token = cached.token.clone();
        self.cached.store(Some(Arc::new(cached)));
        debug!("API token refreshed");
        Ok(token)
    }

    /// Drop the cached and persisted token so the next [`get`](Self::get)
    /// fetches a new one.
    ///
    /// Storage failures are logged; the in-memory cache is always cleared.
    pub async fn invalidate(&self) {
        let _guard = self.refresh.lock().await;
        self.clear().await;
    }

    /// Invalidate only if `sent` is still the current token.
    ///
    /// A rejection that arrives after the token was already replaced must
    /// not discard the replacement. Returns whether anything was dropped.
    pub async fn invalidate_if_current(&self, sent: &str) -> bool {
        let _guard = self.refresh.lock().await;
        let current = match (self.cached.load_full(), &self.store) {
            (Some(cached), _) => cached.token.expose() == sent,
            (None, Some(store)) => matches!(
                store.get(API_TOKEN_KEY).await,
                Ok(Some(ref persisted)) if persisted == sent
            ),
            (None, None) => false,
        };
        if current {
            self.clear().await;
        }
        current
    }

    /// Caller holds the refresh lock
    async fn clear(&self) {
        self.cached.store(None);
        if let Some(store) = &self.store {
            for key in [API_TOKEN_KEY, API_TOKEN_EXPIRY_KEY] {
                if let Err(e) = store.remove(key).await {
                    warn!("API token invalidation: failed to clear store: {e}");
                }
            }
        }
    }

    fn fresh(&self) -> Option<SecretToken> {
        self.cached
            .load_full()
            .filter(|cached| cached.is_fresh())
            .map(|cached| cached.token.clone())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

async fn persist(
    store: &dyn KeyValueStore,
    token: &SecretToken,
    ttl: Option<Duration>,
) -> Result<(), AuthError> {
    store.put(API_TOKEN_KEY, token.expose()).await?;
    match ttl {
        Some(ttl) => {
            let expires_at = unix_now().saturating_add(ttl.as_secs());
            store
                .put(API_TOKEN_EXPIRY_KEY, &expires_at.to_string())
                .await
        }
        None => store.remove(API_TOKEN_EXPIRY_KEY).await,
    }
}

async fn restore(store: &dyn KeyValueStore) -> Result<Option<CachedToken>, AuthError> {
    let Some(value) = store.get(API_TOKEN_KEY).await?.filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let ttl = match store.get(API_TOKEN_EXPIRY_KEY).await? {
        None => None,
        Some(raw) => {
            let Ok(expires_at) = raw.parse::<u64>() else {
                warn!("persisted API token has an unreadable expiry, ignoring it");
                return Ok(None);
            };
            let remaining = expires_at.saturating_sub(unix_now());
            if remaining == 0 {
                debug!("persisted API token expired");
                return Ok(None);
            }
            Some(Duration::from_secs(remaining))
        }
    };
    Ok(Some(CachedToken::new(SecretToken::new(value), ttl)))
}
