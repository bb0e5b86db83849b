//! Implicit-flow OAuth sign-in.
//!
//! ```text
//! Idle ─► Requesting ─► AwaitingRedirect ─► Extracting ─┬─► Exchanging ─► Resolved
//!             │                │                        │        │
//!             ▼                ▼                        ▼        ▼
//!           Failed           Failed          fallback get_session ─► Resolved | Failed
//! ```
//!
//! A finished attempt is never retried; calling [`OAuthFlow::run`] again starts
//! a new cycle from `Idle`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

use super::callback::parse_callback;
use super::registry::{CallbackRegistry, Claim};
use super::{AuthError, BrowserSurface, OAuthProvider, OAuthResult, Session, SessionStore};

/// Observable position of an OAuth attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthState {
    Idle,
    Requesting,
    AwaitingRedirect,
    Extracting,
    Exchanging,
    Resolved,
    Failed,
}

impl OAuthState {
    pub fn is_active(&self) -> bool {
        !matches!(
            self,
            OAuthState::Idle | OAuthState::Resolved | OAuthState::Failed
        )
    }
}

/// Drives one provider sign-in at a time through the external browser surface.
pub struct OAuthFlow<S: ?Sized, B> {
    store: Arc<S>,
    browser: B,
    redirect_url: Url,
    registry: CallbackRegistry,
    timeout: Option<Duration>,
    state: Mutex<OAuthState>,
}

impl<S, B> OAuthFlow<S, B>
where
    S: SessionStore + ?Sized,
    B: BrowserSurface,
{
    pub fn new(store: Arc<S>, browser: B, redirect_url: Url, registry: CallbackRegistry) -> Self {
        Self {
            store,
            browser,
            redirect_url,
            registry,
            timeout: None,
            state: Mutex::new(OAuthState::Idle),
        }
    }

    /// Give up waiting on the browser surface after `timeout`; the attempt then counts as dismissed.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn state(&self) -> OAuthState {
        *self.lock_state()
    }

    pub fn redirect_url(&self) -> &Url {
        &self.redirect_url
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, OAuthState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run a complete sign-in attempt with `provider`.
    pub async fn run(&self, provider: OAuthProvider) -> Result<Session, AuthError> {
        self.begin()?;
        let _abandon = AbandonGuard(&self.state);
        let result = self.drive(provider).await;
        self.transition(if result.is_ok() {
            OAuthState::Resolved
        } else {
            OAuthState::Failed
        });
        result
    }

    fn begin(&self) -> Result<(), AuthError> {
        let mut state = self.lock_state();
        if state.is_active() {
            return Err(AuthError::FlowInProgress);
        }
        debug!(old_state = ?*state, new_state = ?OAuthState::Requesting, "oauth transition");
        *state = OAuthState::Requesting;
        Ok(())
    }

    fn transition(&self, next: OAuthState) {
        let mut state = self.lock_state();
        if *state != next {
            debug!(old_state = ?*state, new_state = ?next, "oauth transition");
            *state = next;
        }
    }

    async fn drive(&self, provider: OAuthProvider) -> Result<Session, AuthError> {
        debug!(%provider, redirect = %self.redirect_url, "requesting authorization URL");
        let auth_url = self
            .store
            .sign_in_with_oauth(provider, &self.redirect_url, true)
            .await?
            .ok_or(AuthError::ProviderUrlMissing)?;

        self.transition(OAuthState::AwaitingRedirect);
        let callback_url = match self.await_surface(&auth_url).await {
            OAuthResult::Success(url) => url,
            OAuthResult::Cancelled | OAuthResult::Dismissed => {
                return Err(AuthError::UserCancelled)
            }
            OAuthResult::Failed(reason) => return Err(AuthError::Provider(reason)),
        };

        self.transition(OAuthState::Extracting);
        let params = match parse_callback(&callback_url) {
            Ok(params) => params,
            Err(err) => {
                warn!(error = %err, "callback URL could not be parsed, re-fetching session");
                return self.fallback().await;
            }
        };

        if let Some(error) = params.error {
            return Err(AuthError::Provider(error.to_string()));
        }
        if params.code.is_some() {
            warn!("callback carried an authorization code; code exchange is not supported");
        }

        let Some((access_token, refresh_token)) = params.tokens.pair() else {
            debug!("callback carried no token pair, re-fetching session");
            return self.fallback().await;
        };

        let _guard = match self.registry.claim(&callback_url) {
            Claim::Acquired(guard) => guard,
            Claim::AlreadyClaimed(waiter) => {
                debug!("callback already being exchanged elsewhere, waiting for it");
                waiter.settled().await;
                return self.fallback().await;
            }
        };

        self.transition(OAuthState::Exchanging);
        let session = self
            .store
            .set_session(access_token, refresh_token)
            .await
            .map_err(|err| AuthError::SessionExchange(err.to_string()))?;
        info!(user_id = %session.user_id(), %provider, "oauth sign-in resolved");
        Ok(session)
    }

    async fn await_surface(&self, auth_url: &Url) -> OAuthResult {
        let surface = self.browser.open_auth_session(auth_url, &self.redirect_url);
        match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, surface).await {
                Ok(result) => result,
                Err(_) => {
                    info!(timeout_secs = limit.as_secs(), "browser surface timed out");
                    OAuthResult::Dismissed
                }
            },
            None => surface.await,
        }
    }

    async fn fallback(&self) -> Result<Session, AuthError> {
        match self.store.get_session().await {
            Ok(Some(session)) => {
                info!(user_id = %session.user_id(), "session found after redirect");
                Ok(session)
            }
            Ok(None) => Err(AuthError::NoSessionEstablished),
            Err(err) => {
                warn!(error = %err, "session re-fetch failed");
                Err(AuthError::NoSessionEstablished)
            }
        }
    }
}

/// Marks the attempt failed if its future is dropped before finishing.
struct AbandonGuard<'a>(&'a Mutex<OAuthState>);

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if state.is_active() {
            debug!(old_state = ?*state, "oauth attempt abandoned");
            *state = OAuthState::Failed;
        }
    }
}
