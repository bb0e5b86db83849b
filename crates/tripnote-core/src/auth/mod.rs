mod backend_store;
mod bootstrap;
mod browser;
mod callback;
mod credential_store;
mod deep_link;
mod error;
mod flow;
mod gotrue;
mod oauth;
mod orchestrator;
mod outcome;
mod registry;
mod session;
mod store;
#[cfg(test)]
mod test_support;

pub use backend_store::BackendSessionStore;
pub use bootstrap::{InitialRoute, SessionBootstrapper};
pub use browser::{BrowserSurface, ManualBrowser, OAuthResult};
pub use callback::{
    extract_callback_tokens, parse_callback, CallbackParams, CallbackTokens, ProviderCallbackError,
};
pub use credential_store::{CredentialStore, FileCredentialStore};
pub use deep_link::{DeepLinkEvent, DeepLinkListener, IgnoreReason};
pub use error::{AuthError, AuthErrorKind};
pub use flow::{BrowserPreference, InvalidMethod, SignInMethod};
pub use gotrue::{GoTrueClient, SignUpResponse, TokenGrant};
pub use oauth::{OAuthFlow, OAuthState};
pub use orchestrator::AuthService;
pub use outcome::AuthOutcome;
pub use registry::{CallbackRegistry, Claim, ClaimGuard, ClaimWaiter};
pub use session::{Session, User};
pub use store::{CredentialAuth, OAuthProvider, SessionStore, SignUpResult};
