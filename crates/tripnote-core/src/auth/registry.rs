use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

/// Tracks which callback URLs have been claimed for a session exchange.
///
/// Shared between the OAuth flow and the deep-link listener so the same
/// redirect arriving through both channels is exchanged only once.
#[derive(Debug, Clone, Default)]
pub struct CallbackRegistry {
    claims: Arc<Mutex<HashMap<String, watch::Receiver<bool>>>>,
}

/// Result of trying to claim a callback URL.
#[derive(Debug)]
pub enum Claim {
    /// The caller owns the exchange; dropping the guard marks it settled.
    Acquired(ClaimGuard),
    /// Someone else claimed it first.
    AlreadyClaimed(ClaimWaiter),
}

#[derive(Debug)]
pub struct ClaimGuard {
    settled: watch::Sender<bool>,
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        self.settled.send_replace(true);
    }
}

#[derive(Debug)]
pub struct ClaimWaiter {
    settled: watch::Receiver<bool>,
}

impl ClaimWaiter {
    /// Wait until the owning exchange has finished (successfully or not).
    pub async fn settled(mut self) {
        // A closed channel means the guard is gone, which also means settled.
        let _ = self.settled.wait_for(|done| *done).await;
    }
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&self, callback_url: &str) -> Claim {
        let key = callback_url.trim().to_owned();
        let mut claims = self.claims();
        if let Some(existing) = claims.get(&key) {
            return Claim::AlreadyClaimed(ClaimWaiter {
                settled: existing.clone(),
            });
        }
        let (tx, rx) = watch::channel(false);
        claims.insert(key, rx);
        Claim::Acquired(ClaimGuard { settled: tx })
    }

    pub fn is_claimed(&self, callback_url: &str) -> bool {
        self.claims().contains_key(callback_url.trim())
    }

    fn claims(&self) -> MutexGuard<'_, HashMap<String, watch::Receiver<bool>>> {
        self.claims.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_is_rejected() {
        let registry = CallbackRegistry::new();
        let first = registry.claim("tripnote://auth/callback#access_token=A");
        assert!(matches!(first, Claim::Acquired(_)));
        let second = registry.claim("tripnote://auth/callback#access_token=A");
        assert!(matches!(second, Claim::AlreadyClaimed(_)));
        assert!(registry.is_claimed("tripnote://auth/callback#access_token=A"));
        assert!(!registry.is_claimed("tripnote://auth/callback#access_token=B"));
    }

    #[test]
    fn urls_stay_consumed_after_settling() {
        let registry = CallbackRegistry::new();
        drop(registry.claim("tripnote://auth/callback#x"));
        assert!(matches!(
            registry.claim("tripnote://auth/callback#x"),
            Claim::AlreadyClaimed(_)
        ));
    }

    #[tokio::test]
    async fn waiter_resolves_when_guard_drops() {
        let registry = CallbackRegistry::new();
        let guard = match registry.claim("u") {
            Claim::Acquired(guard) => guard,
            Claim::AlreadyClaimed(_) => panic!("expected first claim"),
        };
        let waiter = match registry.claim("u") {
            Claim::AlreadyClaimed(waiter) => waiter,
            Claim::Acquired(_) => panic!("expected duplicate"),
        };
        let handle = tokio::spawn(waiter.settled());
        drop(guard);
        handle.await.unwrap();
    }
}
