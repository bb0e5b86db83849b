use serde::Serialize;
use tracing::{error, info};

use crate::i18n::{Locale, Text};

use super::{AuthError, AuthErrorKind, Session, User};

/// Boundary-safe result handed to the presentation layer.
///
/// Every auth action ends in one of these; errors never cross this boundary
/// as `Err`. The session itself is not serialized, only its user.
#[derive(Debug, Clone, Serialize)]
pub struct AuthOutcome {
    pub success: bool,
    #[serde(skip)]
    pub session: Option<Session>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<AuthErrorKind>,
}

impl AuthOutcome {
    pub fn resolved(session: Session) -> Self {
        Self {
            success: true,
            user: Some(session.user.clone()),
            session: Some(session),
            error_message: None,
            error_kind: None,
        }
    }

    /// Successful action that leaves no session behind (sign-out, pending confirmation).
    pub fn completed() -> Self {
        Self {
            success: true,
            session: None,
            user: None,
            error_message: None,
            error_kind: None,
        }
    }

    pub fn pending_user(user: User) -> Self {
        Self {
            user: Some(user),
            ..Self::completed()
        }
    }

    /// Convert `err` into a failed outcome. Cancellation and "not signed in" are
    /// ordinary states and only logged at info level.
    pub fn failed(err: &AuthError, locale: Locale) -> Self {
        let kind = err.kind();
        if is_ordinary(err) {
            info!(reason = %err, "auth action ended without a session");
        } else {
            error!(error = %err, kind = ?kind, "auth action failed");
        }
        Self {
            success: false,
            session: None,
            user: None,
            error_message: Some(user_message(err, locale)),
            error_kind: Some(kind),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.error_kind == Some(AuthErrorKind::UserCancelled)
    }
}

fn is_ordinary(err: &AuthError) -> bool {
    matches!(err, AuthError::UserCancelled | AuthError::NotAuthenticated)
}

fn user_message(err: &AuthError, locale: Locale) -> String {
    match err {
        AuthError::UserCancelled => locale.text(Text::SignInCancelled).to_owned(),
        AuthError::FlowInProgress => locale.text(Text::SignInInProgress).to_owned(),
        AuthError::NotAuthenticated => locale.text(Text::NotSignedIn).to_owned(),
        // The backend's own wording for rejected credentials is more helpful than ours.
        AuthError::Endpoint { message, .. } if err.is_rejection() && !message.is_empty() => {
            message.clone()
        }
        _ if err.kind() == AuthErrorKind::NetworkError => {
            locale.text(Text::BackendUnavailable).to_owned()
        }
        _ => locale.text(Text::SignInFailed).to_owned(),
    }
}
