use async_trait::async_trait;
use url::Url;

use super::{AuthError, Session, User};

/// External identity providers the backend can broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Github,
    Apple,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Github => "github",
            OAuthProvider::Apple => "apple",
        }
    }
}

impl std::fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OAuthProvider {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(OAuthProvider::Google),
            "github" => Ok(OAuthProvider::Github),
            "apple" => Ok(OAuthProvider::Apple),
            other => Err(AuthError::Provider(format!("unsupported provider '{other}'"))),
        }
    }
}

/// Holder of the current session and gateway to the identity provider.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Build the provider authorization URL. `None` when the provider returned nothing usable.
    async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: &Url,
        skip_browser_redirect: bool,
    ) -> Result<Option<Url>, AuthError>;

    async fn get_session(&self) -> Result<Option<Session>, AuthError>;

    async fn set_session(&self, access_token: &str, refresh_token: &str)
        -> Result<Session, AuthError>;

    async fn get_user(&self) -> Result<User, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Result of a sign-up request.
#[derive(Debug, Clone)]
pub enum SignUpResult {
    /// Email confirmation is disabled; the user is signed in right away.
    SignedIn(Session),
    /// The account exists but must be confirmed through the emailed link.
    ConfirmationRequired(User),
}

/// Credential-based sign-in methods offered by the backend.
#[async_trait]
pub trait CredentialAuth: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<Session, AuthError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: &Url,
    ) -> Result<SignUpResult, AuthError>;

    /// Send a magic sign-in link to `email`.
    async fn sign_in_with_otp(&self, email: &str, redirect_to: &Url) -> Result<(), AuthError>;
}
