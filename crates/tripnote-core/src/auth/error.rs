use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by authentication, session and redirect handling routines.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("sign-in was cancelled")]
    UserCancelled,
    #[error("identity provider error: {0}")]
    Provider(String),
    #[error("identity provider did not return an authorization URL")]
    ProviderUrlMissing,
    #[error("auth endpoint error {status}: {message}")]
    Endpoint { status: StatusCode, message: String },
    #[error("invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("failed to establish session: {0}")]
    SessionExchange(String),
    #[error("no session was established")]
    NoSessionEstablished,
    #[error("malformed access token: {0}")]
    InvalidToken(String),
    #[error("no refresh token available")]
    RefreshUnavailable,
    #[error("not signed in")]
    NotAuthenticated,
    #[error("another sign-in is already in progress")]
    FlowInProgress,
    #[error("failed to launch system browser: {0}")]
    BrowserLaunch(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Coarse classification used at the UI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorKind {
    UserCancelled,
    ProviderError,
    UrlParseError,
    SessionExchangeError,
    NoSessionEstablished,
    NetworkError,
}

impl AuthError {
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            AuthError::UserCancelled => AuthErrorKind::UserCancelled,
            AuthError::Provider(_)
            | AuthError::ProviderUrlMissing
            | AuthError::Endpoint { .. }
            | AuthError::InvalidToken(_)
            | AuthError::RefreshUnavailable
            | AuthError::NotAuthenticated
            | AuthError::FlowInProgress
            | AuthError::BrowserLaunch(_) => AuthErrorKind::ProviderError,
            AuthError::UrlParse(_) => AuthErrorKind::UrlParseError,
            AuthError::SessionExchange(_) => AuthErrorKind::SessionExchangeError,
            AuthError::NoSessionEstablished => AuthErrorKind::NoSessionEstablished,
            AuthError::Config(_)
            | AuthError::Io(_)
            | AuthError::Serde(_)
            | AuthError::Http(_) => AuthErrorKind::NetworkError,
        }
    }

    /// Whether the endpoint rejected the credentials themselves (as opposed to being unreachable).
    pub fn is_rejection(&self) -> bool {
        match self {
            AuthError::Endpoint { status, .. } => status.is_client_error(),
            AuthError::Http(err) => err.status().is_some_and(|s| s.is_client_error()),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_its_own_kind() {
        assert_eq!(AuthError::UserCancelled.kind(), AuthErrorKind::UserCancelled);
    }

    #[test]
    fn unconfigured_backend_is_network_error() {
        let err = AuthError::from(ConfigError::BackendUnconfigured);
        assert_eq!(err.kind(), AuthErrorKind::NetworkError);
    }

    #[test]
    fn endpoint_rejection() {
        let err = AuthError::Endpoint {
            status: StatusCode::UNAUTHORIZED,
            message: "invalid JWT".into(),
        };
        assert!(err.is_rejection());
        assert_eq!(err.kind(), AuthErrorKind::ProviderError);
        assert!(!AuthError::NoSessionEstablished.is_rejection());
    }
}
