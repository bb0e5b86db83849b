//! In-memory collaborators shared by the auth tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

use super::{
    AuthError, BrowserSurface, CredentialAuth, OAuthProvider, OAuthResult, Session, SessionStore,
    SignUpResult, User,
};

/// Store with call counters and switchable failures.
#[derive(Default)]
pub(crate) struct MockStore {
    pub session: StdMutex<Option<Session>>,
    pub auth_url: StdMutex<Option<Url>>,
    pub set_session_fails: bool,
    pub user_fails: bool,
    pub set_session_calls: AtomicUsize,
    pub get_session_calls: AtomicUsize,
    pub get_user_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
    pub otp_calls: AtomicUsize,
    /// When set, `set_session` parks until the gate is notified.
    pub exchange_gate: Option<Arc<tokio::sync::Notify>>,
}

impl MockStore {
    pub fn with_auth_url() -> Self {
        Self {
            auth_url: StdMutex::new(Some(
                Url::parse("https://abc.supabase.co/auth/v1/authorize?provider=google").unwrap(),
            )),
            ..Default::default()
        }
    }

    pub fn signed_in() -> Self {
        let store = Self::default();
        *store.session.lock().unwrap() = Some(sample_session("stored-access", "stored-refresh"));
        store
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

pub(crate) fn sample_session(access: &str, refresh: &str) -> Session {
    Session::new(
        User {
            id: "user-1".into(),
            email: Some("ada@example.com".into()),
        },
        access.into(),
        refresh.into(),
        None,
    )
}

#[async_trait]
impl SessionStore for MockStore {
    async fn sign_in_with_oauth(
        &self,
        _provider: OAuthProvider,
        _redirect_to: &Url,
        _skip_browser_redirect: bool,
    ) -> Result<Option<Url>, AuthError> {
        Ok(self.auth_url.lock().unwrap().clone())
    }

    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        self.get_session_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.session.lock().unwrap().clone())
    }

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<Session, AuthError> {
        self.set_session_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.exchange_gate {
            gate.notified().await;
        }
        if self.set_session_fails {
            return Err(AuthError::Endpoint {
                status: StatusCode::UNAUTHORIZED,
                message: "invalid JWT".into(),
            });
        }
        let session = sample_session(access_token, refresh_token);
        *self.session.lock().unwrap() = Some(session.clone());
        Ok(session)
    }

    async fn get_user(&self) -> Result<User, AuthError> {
        self.get_user_calls.fetch_add(1, Ordering::SeqCst);
        if self.user_fails {
            return Err(AuthError::Endpoint {
                status: StatusCode::UNAUTHORIZED,
                message: "token revoked".into(),
            });
        }
        self.session
            .lock()
            .unwrap()
            .as_ref()
            .map(|session| session.user.clone())
            .ok_or(AuthError::NotAuthenticated)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        *self.session.lock().unwrap() = None;
        Ok(())
    }
}

#[async_trait]
impl CredentialAuth for MockStore {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        if email != "ada@example.com" || password != "secret1" {
            return Err(AuthError::Endpoint {
                status: StatusCode::BAD_REQUEST,
                message: "Invalid login credentials".into(),
            });
        }
        let session = sample_session("password-access", "password-refresh");
        *self.session.lock().unwrap() = Some(session.clone());
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        _redirect_to: &Url,
    ) -> Result<SignUpResult, AuthError> {
        Ok(SignUpResult::ConfirmationRequired(User {
            id: "user-2".into(),
            email: Some(email.to_owned()),
        }))
    }

    async fn sign_in_with_otp(&self, _email: &str, _redirect_to: &Url) -> Result<(), AuthError> {
        self.otp_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Surface that immediately answers with a canned result.
pub(crate) struct ScriptedBrowser(pub OAuthResult);

#[async_trait]
impl BrowserSurface for ScriptedBrowser {
    async fn open_auth_session(&self, _auth_url: &Url, _redirect_url: &Url) -> OAuthResult {
        self.0.clone()
    }
}

/// Surface the user never comes back from.
pub(crate) struct AbandonedBrowser;

#[async_trait]
impl BrowserSurface for AbandonedBrowser {
    async fn open_auth_session(&self, _auth_url: &Url, _redirect_url: &Url) -> OAuthResult {
        std::future::pending().await
    }
}
