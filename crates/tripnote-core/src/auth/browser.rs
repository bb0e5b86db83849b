use std::future::Future;

use async_trait::async_trait;
use tracing::warn;
use url::Url;

use super::AuthError;

/// What the external authentication surface reported back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OAuthResult {
    /// The surface reached the redirect URL; carries the full callback URL.
    Success(String),
    Cancelled,
    Dismissed,
    Failed(String),
}

/// An external browser (or embedded web view) able to run an authorization session.
#[async_trait]
pub trait BrowserSurface: Send + Sync {
    /// Suspends until the user finishes, cancels, or closes the surface.
    async fn open_auth_session(&self, auth_url: &Url, redirect_url: &Url) -> OAuthResult;
}

/// Surface for terminals: shows the URL, optionally launches the system browser,
/// then reads the redirect URL the user pastes back. Empty input cancels.
pub struct ManualBrowser<Notify, Input> {
    open_browser: bool,
    notify: Notify,
    read_input: Input,
}

impl<Notify, Input, Fut> ManualBrowser<Notify, Input>
where
    Notify: Fn(&Url) -> Result<(), AuthError> + Send + Sync,
    Input: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, AuthError>> + Send,
{
    pub fn new(open_browser: bool, notify: Notify, read_input: Input) -> Self {
        Self {
            open_browser,
            notify,
            read_input,
        }
    }
}

#[async_trait]
impl<Notify, Input, Fut> BrowserSurface for ManualBrowser<Notify, Input>
where
    Notify: Fn(&Url) -> Result<(), AuthError> + Send + Sync,
    Input: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, AuthError>> + Send,
{
    async fn open_auth_session(&self, auth_url: &Url, _redirect_url: &Url) -> OAuthResult {
        if let Err(err) = (self.notify)(auth_url) {
            return OAuthResult::Failed(err.to_string());
        }

        if self.open_browser {
            if let Err(err) = open::that(auth_url.as_str()) {
                warn!(error = %err, "failed to launch system browser; continuing with pasted URL");
            }
        }

        match (self.read_input)().await {
            Ok(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    OAuthResult::Cancelled
                } else {
                    OAuthResult::Success(trimmed.to_owned())
                }
            }
            Err(AuthError::UserCancelled) => OAuthResult::Dismissed,
            Err(err) => OAuthResult::Failed(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn urls() -> (Url, Url) {
        (
            Url::parse("https://abc.supabase.co/auth/v1/authorize?provider=google").unwrap(),
            Url::parse("tripnote://auth/callback").unwrap(),
        )
    }

    #[tokio::test]
    async fn pasted_url_is_success() {
        let shown = Arc::new(Mutex::new(None));
        let notify = {
            let shown = shown.clone();
            move |url: &Url| {
                *shown.lock().unwrap() = Some(url.to_string());
                Ok(())
            }
        };
        let browser = ManualBrowser::new(false, notify, || async {
            Ok("  tripnote://auth/callback#access_token=A&refresh_token=R \n".to_string())
        });
        let (auth, redirect) = urls();

        let result = browser.open_auth_session(&auth, &redirect).await;
        assert_eq!(
            result,
            OAuthResult::Success("tripnote://auth/callback#access_token=A&refresh_token=R".into())
        );
        assert_eq!(shown.lock().unwrap().as_deref(), Some(auth.as_str()));
    }

    #[tokio::test]
    async fn empty_input_cancels() {
        let browser = ManualBrowser::new(false, |_: &Url| Ok(()), || async { Ok(String::new()) });
        let (auth, redirect) = urls();
        assert_eq!(
            browser.open_auth_session(&auth, &redirect).await,
            OAuthResult::Cancelled
        );
    }

    #[tokio::test]
    async fn closed_input_dismisses() {
        let browser = ManualBrowser::new(
            false,
            |_: &Url| Ok(()),
            || async { Err(AuthError::UserCancelled) },
        );
        let (auth, redirect) = urls();
        assert_eq!(
            browser.open_auth_session(&auth, &redirect).await,
            OAuthResult::Dismissed
        );
    }
}
