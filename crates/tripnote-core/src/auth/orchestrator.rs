use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::info;
use url::Url;

use crate::i18n::Locale;

use super::oauth::{OAuthFlow, OAuthState};
use super::registry::CallbackRegistry;
use super::{
    AuthError, AuthOutcome, BrowserSurface, CredentialAuth, OAuthProvider, SessionStore,
    SignUpResult,
};

/// Entry point for user-initiated auth actions.
///
/// Actions are serialized: while one runs, any other is answered with a
/// "sign-in already in progress" outcome instead of racing it.
pub struct AuthService<S: ?Sized, B> {
    store: Arc<S>,
    flow: OAuthFlow<S, B>,
    redirect_url: Url,
    locale: Locale,
    busy: Mutex<()>,
}

impl<S, B> AuthService<S, B>
where
    S: SessionStore + ?Sized,
    B: BrowserSurface,
{
    pub fn new(store: Arc<S>, browser: B, redirect_url: Url, registry: CallbackRegistry) -> Self {
        let flow = OAuthFlow::new(store.clone(), browser, redirect_url.clone(), registry);
        Self {
            store,
            flow,
            redirect_url,
            locale: Locale::default(),
            busy: Mutex::new(()),
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_browser_timeout(mut self, timeout: Duration) -> Self {
        self.flow = self.flow.with_timeout(timeout);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn oauth_state(&self) -> OAuthState {
        self.flow.state()
    }

    pub async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> AuthOutcome {
        let Ok(_busy) = self.busy.try_lock() else {
            return self.fail(AuthError::FlowInProgress);
        };
        self.finish(self.flow.run(provider).await)
    }

    pub async fn sign_out(&self) -> AuthOutcome {
        let Ok(_busy) = self.busy.try_lock() else {
            return self.fail(AuthError::FlowInProgress);
        };
        match self.store.sign_out().await {
            Ok(()) => AuthOutcome::completed(),
            Err(err) => self.fail(err),
        }
    }

    fn finish(&self, result: Result<super::Session, AuthError>) -> AuthOutcome {
        match result {
            Ok(session) => AuthOutcome::resolved(session),
            Err(err) => self.fail(err),
        }
    }

    fn fail(&self, err: AuthError) -> AuthOutcome {
        AuthOutcome::failed(&err, self.locale)
    }
}

impl<S, B> AuthService<S, B>
where
    S: SessionStore + CredentialAuth + ?Sized,
    B: BrowserSurface,
{
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> AuthOutcome {
        let Ok(_busy) = self.busy.try_lock() else {
            return self.fail(AuthError::FlowInProgress);
        };
        self.finish(self.store.sign_in_with_password(email, password).await)
    }

    /// Register a new account. Succeeds without a session when email confirmation is pending.
    pub async fn sign_up(&self, email: &str, password: &str) -> AuthOutcome {
        let Ok(_busy) = self.busy.try_lock() else {
            return self.fail(AuthError::FlowInProgress);
        };
        match self.store.sign_up(email, password, &self.redirect_url).await {
            Ok(SignUpResult::SignedIn(session)) => AuthOutcome::resolved(session),
            Ok(SignUpResult::ConfirmationRequired(user)) => {
                info!(user_id = %user.id, "sign-up pending confirmation");
                AuthOutcome::pending_user(user)
            }
            Err(err) => self.fail(err),
        }
    }

    /// Email a one-time sign-in link that redirects back to the app.
    pub async fn sign_in_with_magic_link(&self, email: &str) -> AuthOutcome {
        let Ok(_busy) = self.busy.try_lock() else {
            return self.fail(AuthError::FlowInProgress);
        };
        match self.store.sign_in_with_otp(email, &self.redirect_url).await {
            Ok(()) => AuthOutcome::completed(),
            Err(err) => self.fail(err),
        }
    }
}
