use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use super::session::token_expiry;
use super::{
    AuthError, CredentialAuth, CredentialStore, FileCredentialStore, GoTrueClient, OAuthProvider,
    Session, SessionStore, SignUpResult, User,
};

/// [`SessionStore`] backed by the hosted auth service and a local credential store.
pub struct BackendSessionStore<C = FileCredentialStore> {
    client: GoTrueClient,
    credentials: Mutex<C>,
    profile: String,
    refresh_window: Duration,
}

impl<C> BackendSessionStore<C>
where
    C: CredentialStore + Send,
{
    pub fn new(client: GoTrueClient, credentials: C, profile: impl Into<String>) -> Self {
        Self {
            client,
            credentials: Mutex::new(credentials),
            profile: profile.into(),
            refresh_window: Duration::seconds(60),
        }
    }

    pub fn with_refresh_window(mut self, window: Duration) -> Self {
        self.refresh_window = window;
        self
    }

    pub fn client(&self) -> &GoTrueClient {
        &self.client
    }

    async fn load(&self) -> Result<Option<Session>, AuthError> {
        let store = self.credentials.lock().await;
        store.load(&self.profile)
    }

    async fn persist(&self, session: &Session) -> Result<(), AuthError> {
        let store = self.credentials.lock().await;
        store.save(&self.profile, session)
    }

    async fn forget(&self) -> Result<(), AuthError> {
        let store = self.credentials.lock().await;
        store.delete(&self.profile)
    }
}

#[async_trait]
impl<C> SessionStore for BackendSessionStore<C>
where
    C: CredentialStore + Send,
{
    async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: &Url,
        skip_browser_redirect: bool,
    ) -> Result<Option<Url>, AuthError> {
        let url = self.client.authorize_url(provider, redirect_to)?;
        if !skip_browser_redirect {
            open::that(url.as_str()).map_err(|err| AuthError::BrowserLaunch(err.to_string()))?;
        }
        Ok(Some(url))
    }

    async fn get_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(session) = self.load().await? else {
            return Ok(None);
        };
        if !session.will_expire_within(self.refresh_window) {
            return Ok(Some(session));
        }

        match self.client.refresh_grant(&session.refresh_token).await {
            Ok(refreshed) => {
                self.persist(&refreshed).await?;
                info!(user_id = %refreshed.user_id(), "session refreshed");
                Ok(Some(refreshed))
            }
            Err(err) if err.is_rejection() => {
                warn!(user_id = %session.user_id(), error = %err, "refresh rejected, clearing session");
                self.forget().await?;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<Session, AuthError> {
        if access_token.is_empty() || refresh_token.is_empty() {
            return Err(AuthError::SessionExchange(
                "both access and refresh tokens are required".into(),
            ));
        }

        let expires_at = token_expiry(access_token)?;
        let session = match expires_at {
            Some(ts) if ts <= Utc::now() => {
                debug!("supplied access token already expired, refreshing");
                self.client.refresh_grant(refresh_token).await?
            }
            _ => {
                let user = self.client.user(access_token).await?;
                Session::new(user, access_token.to_owned(), refresh_token.to_owned(), expires_at)
            }
        };

        self.persist(&session).await?;
        info!(user_id = %session.user_id(), "session established");
        Ok(session)
    }

    async fn get_user(&self) -> Result<User, AuthError> {
        let session = self.get_session().await?.ok_or(AuthError::NotAuthenticated)?;
        self.client.user(&session.access_token).await
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(session) = self.load().await? {
            self.client.logout(&session.access_token).await?;
        }
        self.forget().await?;
        info!("signed out");
        Ok(())
    }
}

#[async_trait]
impl<C> CredentialAuth for BackendSessionStore<C>
where
    C: CredentialStore + Send,
{
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let session = self.client.password_grant(email, password).await?;
        self.persist(&session).await?;
        info!(user_id = %session.user_id(), "signed in with password");
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: &Url,
    ) -> Result<SignUpResult, AuthError> {
        let (user, session) = self
            .client
            .sign_up(email, password, redirect_to)
            .await?
            .into_parts();
        match session {
            Some(session) => {
                self.persist(&session).await?;
                Ok(SignUpResult::SignedIn(session))
            }
            None => {
                info!(user_id = %user.id, "sign-up awaiting email confirmation");
                Ok(SignUpResult::ConfirmationRequired(user))
            }
        }
    }

    async fn sign_in_with_otp(&self, email: &str, redirect_to: &Url) -> Result<(), AuthError> {
        self.client.send_magic_link(email, redirect_to).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::test_jwt;
    use crate::config::{BackendConfig, ConfigLocator};
    use httpmock::prelude::*;
    use std::sync::{Arc, Mutex as StdMutex};

    #[derive(Clone, Default)]
    struct MemoryStore {
        inner: Arc<StdMutex<Option<Session>>>,
    }

    impl CredentialStore for MemoryStore {
        fn load(&self, _profile: &str) -> Result<Option<Session>, AuthError> {
            Ok(self.inner.lock().unwrap().clone())
        }

        fn save(&self, _profile: &str, session: &Session) -> Result<(), AuthError> {
            *self.inner.lock().unwrap() = Some(session.clone());
            Ok(())
        }

        fn delete(&self, _profile: &str) -> Result<(), AuthError> {
            *self.inner.lock().unwrap() = None;
            Ok(())
        }
    }

    fn store_for(server: &MockServer, memory: MemoryStore) -> BackendSessionStore<MemoryStore> {
        let config = BackendConfig::new(Url::parse(&server.base_url()).unwrap(), "anon-key");
        BackendSessionStore::new(GoTrueClient::new(config).unwrap(), memory, "default")
    }

    fn user() -> User {
        User {
            id: "user-1".into(),
            email: Some("ada@example.com".into()),
        }
    }

    #[tokio::test]
    async fn set_session_resolves_user_and_persists() {
        let server = MockServer::start();
        let token = test_jwt(Utc::now() + Duration::hours(1));
        let mock = server.mock(|when, then| {
            when.method(GET).path("/auth/v1/user");
            then.status(200)
                .json_body_obj(&serde_json::json!({ "id": "user-1", "email": "ada@example.com" }));
        });
        let memory = MemoryStore::default();
        let store = store_for(&server, memory.clone());

        let session = store.set_session(&token, "refresh-1").await.unwrap();
        mock.assert();
        assert_eq!(session.user_id(), "user-1");
        assert_eq!(session.email(), Some("ada@example.com"));
        assert!(session.expires_at.is_some());
        assert_eq!(memory.load("default").unwrap().unwrap().access_token, token);
    }

    #[tokio::test]
    async fn set_session_refreshes_expired_access_token() {
        let server = MockServer::start();
        let refresh = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/v1/token")
                .query_param("grant_type", "refresh_token");
            then.status(200).json_body_obj(&serde_json::json!({
                "access_token": "fresh",
                "refresh_token": "refresh-2",
                "expires_in": 3600,
                "user": { "id": "user-1", "email": "ada@example.com" }
            }));
        });
        let store = store_for(&server, MemoryStore::default());
        let stale = test_jwt(Utc::now() - Duration::minutes(5));

        let session = store.set_session(&stale, "refresh-1").await.unwrap();
        refresh.assert();
        assert_eq!(session.access_token, "fresh");
        assert_eq!(session.refresh_token, "refresh-2");
    }

    #[tokio::test]
    async fn set_session_rejects_missing_refresh_token() {
        let server = MockServer::start();
        let store = store_for(&server, MemoryStore::default());
        let err = store.set_session("a.b.c", "").await.unwrap_err();
        assert!(matches!(err, AuthError::SessionExchange(_)));
    }

    #[tokio::test]
    async fn get_session_refreshes_near_expiry() {
        let server = MockServer::start();
        let refresh = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/v1/token")
                .json_body(serde_json::json!({ "refresh_token": "refresh-1" }));
            then.status(200).json_body_obj(&serde_json::json!({
                "access_token": "new",
                "refresh_token": "refresh-2",
                "expires_in": 3600,
                "user": { "id": "user-1" }
            }));
        });
        let memory = MemoryStore::default();
        memory
            .save(
                "default",
                &Session::new(
                    user(),
                    "old".into(),
                    "refresh-1".into(),
                    Some(Utc::now() + Duration::seconds(10)),
                ),
            )
            .unwrap();
        let store = store_for(&server, memory.clone());

        let session = store.get_session().await.unwrap().unwrap();
        refresh.assert();
        assert_eq!(session.access_token, "new");
        assert_eq!(memory.load("default").unwrap().unwrap().refresh_token, "refresh-2");
    }

    #[tokio::test]
    async fn rejected_refresh_clears_session() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth/v1/token");
            then.status(400)
                .json_body_obj(&serde_json::json!({ "error_description": "Refresh Token Not Found" }));
        });
        let memory = MemoryStore::default();
        memory
            .save(
                "default",
                &Session::new(user(), "old".into(), "gone".into(), Some(Utc::now())),
            )
            .unwrap();
        let store = store_for(&server, memory.clone());

        assert!(store.get_session().await.unwrap().is_none());
        assert!(memory.load("default").unwrap().is_none());
    }

    #[tokio::test]
    async fn sign_out_revokes_and_forgets() {
        let server = MockServer::start();
        let logout = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/v1/logout")
                .header("authorization", "Bearer live");
            then.status(204);
        });
        let memory = MemoryStore::default();
        memory
            .save("default", &Session::new(user(), "live".into(), "r".into(), None))
            .unwrap();
        let store = store_for(&server, memory.clone());

        store.sign_out().await.unwrap();
        logout.assert();
        assert!(memory.load("default").unwrap().is_none());
    }

    #[tokio::test]
    async fn password_sign_in_persists_to_file() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/auth/v1/token")
                .query_param("grant_type", "password");
            then.status(200).json_body_obj(&serde_json::json!({
                "access_token": "access-1",
                "refresh_token": "refresh-1",
                "expires_in": 3600,
                "user": { "id": "user-1", "email": "ada@example.com" }
            }));
        });
        let temp_dir = tempfile::TempDir::new().unwrap();
        let files =
            FileCredentialStore::new(ConfigLocator::from_root(temp_dir.path().to_path_buf()).unwrap());
        let config = BackendConfig::new(Url::parse(&server.base_url()).unwrap(), "anon-key");
        let store = BackendSessionStore::new(GoTrueClient::new(config).unwrap(), files, "default");

        store
            .sign_in_with_password("ada@example.com", "secret1")
            .await
            .unwrap();
        let restored = store.get_session().await.unwrap().unwrap();
        assert_eq!(restored.access_token, "access-1");
    }
}
