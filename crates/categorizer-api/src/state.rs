//! Application state

use std::sync::Arc;

use todo_core::KeywordRules;

use crate::rate_limit::RateLimiter;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    rules: KeywordRules,
    limiter: Option<RateLimiter>,
    trust_forwarded: bool,
}

impl AppState {
    /// Create a new AppState
    ///
    /// `rate_limited = false` lets every request through. With
    /// `trust_forwarded`, clients are identified by `X-Forwarded-For` instead
    /// of the peer address; only enable it behind a proxy that sets the header.
    pub fn new(rate_limited: bool, trust_forwarded: bool) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                rules: KeywordRules::service(),
                limiter: rate_limited.then(RateLimiter::new),
                trust_forwarded,
            }),
        }
    }

    /// Get the keyword table used for categorization
    pub fn rules(&self) -> &KeywordRules {
        &self.inner.rules
    }

    /// Get the rate limiter, if enabled
    pub fn limiter(&self) -> Option<&RateLimiter> {
        self.inner.limiter.as_ref()
    }

    pub fn trust_forwarded(&self) -> bool {
        self.inner.trust_forwarded
    }
}
