use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::AuthError;

/// Identity resolved by the auth backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated session held by the device.
///
/// Only ever built from a resolved [`User`] plus both tokens; there is no
/// partially populated state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_created_at")]
    pub created_at: DateTime<Utc>,
}

fn default_created_at() -> DateTime<Utc> {
    Utc::now()
}

impl Session {
    pub fn new(
        user: User,
        access_token: String,
        refresh_token: String,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            user,
            access_token,
            refresh_token,
            expires_at,
            created_at: Utc::now(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    pub fn email(&self) -> Option<&str> {
        self.user.email.as_deref()
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(ts) => Utc::now() >= ts,
            None => false,
        }
    }

    pub fn will_expire_within(&self, window: Duration) -> bool {
        match self.expires_at {
            Some(ts) => Utc::now() + window >= ts,
            None => false,
        }
    }
}

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: Option<i64>,
}

/// Read the `exp` claim from a JWT access token without verifying it.
pub(crate) fn token_expiry(access_token: &str) -> Result<Option<DateTime<Utc>>, AuthError> {
    let payload = access_token
        .split('.')
        .nth(1)
        .ok_or_else(|| AuthError::InvalidToken("expected three dot-separated segments".into()))?;
    let decoded = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|err| AuthError::InvalidToken(err.to_string()))?;
    let claim: ExpiryClaim = serde_json::from_slice(&decoded)
        .map_err(|err| AuthError::InvalidToken(err.to_string()))?;
    Ok(claim
        .exp
        .and_then(|seconds| Utc.timestamp_opt(seconds, 0).single()))
}

#[cfg(test)]
pub(crate) fn test_jwt(exp: DateTime<Utc>) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(
        serde_json::json!({ "sub": "user-1", "exp": exp.timestamp() })
            .to_string()
            .as_bytes(),
    );
    format!("{header}.{payload}.signature")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: "user-1".into(),
            email: Some("ada@example.com".into()),
        }
    }

    #[test]
    fn expiry_detection() {
        let session = Session::new(
            sample_user(),
            "token".into(),
            "refresh".into(),
            Some(Utc::now() + Duration::minutes(1)),
        );
        assert!(!session.is_expired());
        assert!(session.will_expire_within(Duration::minutes(2)));
        assert_eq!(session.user_id(), "user-1");
        assert_eq!(session.email(), Some("ada@example.com"));
    }

    #[test]
    fn session_without_expiry_never_expires() {
        let session = Session::new(sample_user(), "token".into(), "refresh".into(), None);
        assert!(!session.is_expired());
        assert!(!session.will_expire_within(Duration::hours(1)));
    }

    #[test]
    fn reads_exp_claim() {
        let exp = Utc.timestamp_opt(1_900_000_000, 0).unwrap();
        let token = test_jwt(exp);
        assert_eq!(token_expiry(&token).unwrap(), Some(exp));
    }

    #[test]
    fn rejects_opaque_token() {
        let err = token_expiry("opaque").unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }
}
