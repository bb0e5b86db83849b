use url::form_urlencoded;
use url::Url;

use super::AuthError;

/// Tokens carried in an implicit-flow redirect fragment. Either may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl CallbackTokens {
    /// Both tokens, when the provider delivered a complete pair.
    pub fn pair(&self) -> Option<(&str, &str)> {
        match (&self.access_token, &self.refresh_token) {
            (Some(access), Some(refresh)) => Some((access.as_str(), refresh.as_str())),
            _ => None,
        }
    }
}

/// Error reported by the provider through the redirect (`error`, `error_description`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCallbackError {
    pub error: String,
    pub description: Option<String>,
}

impl std::fmt::Display for ProviderCallbackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.description {
            Some(description) => write!(f, "{} ({description})", self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

/// Everything of interest in a redirect URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub tokens: CallbackTokens,
    pub error: Option<ProviderCallbackError>,
    /// Authorization-code parameter. Detected only; never exchanged.
    pub code: Option<String>,
}

/// Extract the access/refresh token pair from a callback URL's fragment.
pub fn extract_callback_tokens(callback_url: &str) -> Result<CallbackTokens, AuthError> {
    parse_callback(callback_url).map(|params| params.tokens)
}

pub fn parse_callback(callback_url: &str) -> Result<CallbackParams, AuthError> {
    let url = Url::parse(callback_url.trim())?;
    let mut params = CallbackParams::default();
    let mut error: Option<String> = None;
    let mut description: Option<String> = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => params.code = non_empty(value.into_owned()),
            "error" => error = non_empty(value.into_owned()),
            "error_description" => description = non_empty(value.into_owned()),
            _ => {}
        }
    }

    if let Some(fragment) = url.fragment() {
        for (key, value) in form_urlencoded::parse(fragment.as_bytes()) {
            match key.as_ref() {
                "access_token" => params.tokens.access_token = non_empty(value.into_owned()),
                "refresh_token" => params.tokens.refresh_token = non_empty(value.into_owned()),
                "error" => error = non_empty(value.into_owned()),
                "error_description" => description = non_empty(value.into_owned()),
                _ => {}
            }
        }
    }

    params.error = error.map(|error| ProviderCallbackError { error, description });
    Ok(params)
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
