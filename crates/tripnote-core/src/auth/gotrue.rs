use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::BackendConfig;

use super::{AuthError, OAuthProvider, Session, User};

const USER_AGENT: &str = "tripnote/0.1.0";

/// HTTP client for the backend's auth endpoints (`/auth/v1`).
#[derive(Debug, Clone)]
pub struct GoTrueClient {
    http: Client,
    config: BackendConfig,
}

impl GoTrueClient {
    pub fn new(config: BackendConfig) -> Result<Self, AuthError> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Provider authorization URL; the backend redirects to `redirect_to` with tokens in the fragment.
    pub fn authorize_url(&self, provider: OAuthProvider, redirect_to: &Url) -> Result<Url, AuthError> {
        let mut url = self.config.endpoint()?.url("auth/v1/authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", provider.as_str())
            .append_pair("redirect_to", redirect_to.as_str());
        Ok(url)
    }

    pub async fn password_grant(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        #[derive(Serialize)]
        struct Body<'a> {
            email: &'a str,
            password: &'a str,
        }

        let response = self
            .post("auth/v1/token", &[("grant_type", "password")], None)?
            .json(&Body { email, password })
            .send()
            .await?;
        let grant: TokenGrant = handle_response(response).await?;
        Ok(grant.into_session(Utc::now()))
    }

    pub async fn refresh_grant(&self, refresh_token: &str) -> Result<Session, AuthError> {
        #[derive(Serialize)]
        struct Body<'a> {
            refresh_token: &'a str,
        }

        debug!("refreshing session");
        let response = self
            .post("auth/v1/token", &[("grant_type", "refresh_token")], None)?
            .json(&Body { refresh_token })
            .send()
            .await?;
        let grant: TokenGrant = handle_response(response).await?;
        Ok(grant.into_session(Utc::now()))
    }

    /// Resolve the user owning `access_token`; fails when the token was revoked or expired.
    pub async fn user(&self, access_token: &str) -> Result<User, AuthError> {
        let endpoint = self.config.endpoint()?;
        let response = self
            .http
            .get(endpoint.url("auth/v1/user")?)
            .header("apikey", endpoint.api_key())
            .bearer_auth(access_token)
            .send()
            .await?;
        handle_response(response).await
    }

    pub async fn logout(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .post("auth/v1/logout", &[], Some(access_token))?
            .send()
            .await?;
        let status = response.status();
        // Token already invalid server-side: nothing left to revoke.
        if matches!(
            status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
        ) {
            debug!(%status, "logout on an already invalid session");
            return Ok(());
        }
        if !status.is_success() {
            return Err(endpoint_error(response).await);
        }
        Ok(())
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: &Url,
    ) -> Result<SignUpResponse, AuthError> {
        #[derive(Serialize)]
        struct Body<'a> {
            email: &'a str,
            password: &'a str,
        }

        let response = self
            .post("auth/v1/signup", &[("redirect_to", redirect_to.as_str())], None)?
            .json(&Body { email, password })
            .send()
            .await?;
        handle_response(response).await
    }

    pub async fn send_magic_link(&self, email: &str, redirect_to: &Url) -> Result<(), AuthError> {
        #[derive(Serialize)]
        struct Body<'a> {
            email: &'a str,
            create_user: bool,
        }

        let response = self
            .post("auth/v1/otp", &[("redirect_to", redirect_to.as_str())], None)?
            .json(&Body {
                email,
                create_user: true,
            })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(endpoint_error(response).await);
        }
        Ok(())
    }

    fn post(
        &self,
        path: &str,
        query: &[(&str, &str)],
        bearer: Option<&str>,
    ) -> Result<reqwest::RequestBuilder, AuthError> {
        let endpoint = self.config.endpoint()?;
        let mut url = endpoint.url(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        let mut request = self.http.post(url).header("apikey", endpoint.api_key());
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        Ok(request)
    }
}

async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AuthError> {
    if !response.status().is_success() {
        return Err(endpoint_error(response).await);
    }
    Ok(response.json().await?)
}

async fn endpoint_error(response: reqwest::Response) -> AuthError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error_description: Option<String>,
        msg: Option<String>,
        message: Option<String>,
        error: Option<String>,
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|parsed| {
            parsed
                .error_description
                .or(parsed.msg)
                .or(parsed.message)
                .or(parsed.error)
        })
        .unwrap_or(body);
    AuthError::Endpoint { status, message }
}

/// Token endpoint payload.
#[derive(Debug, Deserialize)]
pub struct TokenGrant {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: User,
}

impl TokenGrant {
    fn into_session(self, received_at: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|seconds| Utc.timestamp_opt(seconds, 0).single())
            .or_else(|| {
                self.expires_in
                    .map(|seconds| received_at + Duration::seconds(seconds))
            });
        let mut session = Session::new(self.user, self.access_token, self.refresh_token, expires_at);
        session.created_at = received_at;
        session
    }
}

/// `signup` answers with a session when confirmation is disabled, otherwise with the bare user.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(TokenGrant),
    User(User),
}

impl SignUpResponse {
    pub fn into_parts(self) -> (User, Option<Session>) {
        match self {
            SignUpResponse::Session(grant) => {
                let session = grant.into_session(Utc::now());
                (session.user.clone(), Some(session))
            }
            SignUpResponse::User(user) => (user, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> GoTrueClient {
        let config = BackendConfig::new(Url::parse(&server.base_url()).unwrap(), "anon-key");
        GoTrueClient::new(config).unwrap()
    }

    fn grant_json(access: &str) -> serde_json::Value {
        serde_json::json!({
            "access_token": access,
            "refresh_token": "refresh-1",
            "token_type": "bearer",
            "expires_in": 3600,
            "user": { "id": "user-1", "email": "ada@example.com" }
        })
    }

    #[test]
    fn authorize_url_carries_provider_and_redirect() {
        let config = BackendConfig::new(Url::parse("https://abc.supabase.co").unwrap(), "k");
        let client = GoTrueClient::new(config).unwrap();
        let redirect = Url::parse("tripnote://auth/callback").unwrap();
        let url = client.authorize_url(OAuthProvider::Google, &redirect).unwrap();
        assert_eq!(url.path(), "/auth/v1/authorize");
        let pairs: Vec<_> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("provider".into(), "google".into())));
        assert!(pairs.contains(&("redirect_to".into(), "tripnote://auth/callback".into())));
    }

    #[tokio::test]
    async fn password_grant_success() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/auth/v1/token")
                .query_param("grant_type", "password")
                .header("apikey", "anon-key")
                .json_body(serde_json::json!({ "email": "ada@example.com", "password": "secret1" }));
            then.status(200).json_body_obj(&grant_json("access-1"));
        });

        let session = client(&server)
            .password_grant("ada@example.com", "secret1")
            .await
            .unwrap();
        mock.assert();
        assert_eq!(session.access_token, "access-1");
        assert_eq!(session.refresh_token, "refresh-1");
        assert_eq!(session.user_id(), "user-1");
        assert!(session.expires_at.is_some());
    }

    #[tokio::test]
    async fn rejected_credentials_surface_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth/v1/token");
            then.status(400).json_body_obj(&serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            }));
        });

        let err = client(&server)
            .password_grant("ada@example.com", "wrong")
            .await
            .unwrap_err();
        match err {
            AuthError::Endpoint { status, message } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, "Invalid login credentials");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn user_uses_bearer_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/auth/v1/user")
                .header("authorization", "Bearer access-1");
            then.status(200).json_body_obj(&serde_json::json!({
                "id": "user-1",
                "email": "ada@example.com",
                "aud": "authenticated"
            }));
        });

        let user = client(&server).user("access-1").await.unwrap();
        mock.assert();
        assert_eq!(user.id, "user-1");
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn logout_tolerates_invalid_session() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/auth/v1/logout");
            then.status(401).json_body_obj(&serde_json::json!({ "msg": "invalid JWT" }));
        });

        client(&server).logout("stale").await.unwrap();
    }

    #[tokio::test]
    async fn sign_up_without_session_requires_confirmation() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/auth/v1/signup")
                .query_param("redirect_to", "tripnote://auth/callback");
            then.status(200).json_body_obj(&serde_json::json!({
                "id": "user-2",
                "email": "new@example.com",
                "confirmation_sent_at": "2024-01-01T00:00:00Z"
            }));
        });

        let redirect = Url::parse("tripnote://auth/callback").unwrap();
        let (user, session) = client(&server)
            .sign_up("new@example.com", "secret1", &redirect)
            .await
            .unwrap()
            .into_parts();
        assert_eq!(user.id, "user-2");
        assert!(session.is_none());
    }

    #[tokio::test]
    async fn unconfigured_backend_fails_every_call() {
        let client = GoTrueClient::new(BackendConfig::unconfigured()).unwrap();
        let err = client.user("token").await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::Config(crate::config::ConfigError::BackendUnconfigured)
        ));
    }
}
