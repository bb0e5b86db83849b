//! Inbound redirect URLs (app resumed or launched through the custom scheme).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

use super::callback::parse_callback;
use super::registry::{CallbackRegistry, Claim};
use super::{AuthError, AuthErrorKind, Session, SessionStore};

/// What the listener did with one delivered URL.
#[derive(Debug, Clone)]
pub enum DeepLinkEvent {
    SessionEstablished(Session),
    /// The URL was already claimed by another exchange (OAuth flow or an earlier delivery).
    Duplicate,
    Ignored { reason: IgnoreReason },
    Failed { kind: AuthErrorKind, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Malformed,
    NotAuthCallback,
    /// Authorization-code redirect; code exchange is not supported.
    AuthorizationCode,
    NoTokens,
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            IgnoreReason::Malformed => "malformed URL",
            IgnoreReason::NotAuthCallback => "not an auth callback",
            IgnoreReason::AuthorizationCode => "authorization code redirects are not supported",
            IgnoreReason::NoTokens => "no tokens in callback",
        })
    }
}

/// Listener owned by the application root.
///
/// [`DeepLinkListener::subscribe`] starts it, [`DeepLinkListener::unsubscribe`]
/// stops it after the URL in hand has been processed. Dropping it without
/// unsubscribing aborts the worker.
pub struct DeepLinkListener {
    urls: mpsc::UnboundedSender<String>,
    shutdown: Option<oneshot::Sender<()>>,
    worker: Option<JoinHandle<()>>,
    initial_checked: AtomicBool,
}

impl DeepLinkListener {
    pub fn subscribe<S>(
        store: Arc<S>,
        registry: CallbackRegistry,
        redirect_url: Url,
    ) -> (Self, mpsc::UnboundedReceiver<DeepLinkEvent>)
    where
        S: SessionStore + ?Sized + 'static,
    {
        let (url_tx, url_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let worker = tokio::spawn(listen(
            store,
            registry,
            redirect_url,
            url_rx,
            shutdown_rx,
            event_tx,
        ));
        debug!("deep-link listener subscribed");
        (
            Self {
                urls: url_tx,
                shutdown: Some(shutdown_tx),
                worker: Some(worker),
                initial_checked: AtomicBool::new(false),
            },
            event_rx,
        )
    }

    /// Handle for delivering URLs from the platform while running.
    pub fn sender(&self) -> mpsc::UnboundedSender<String> {
        self.urls.clone()
    }

    /// Deliver a URL received while running. Returns `false` once the listener has stopped.
    pub fn deliver(&self, url: impl Into<String>) -> bool {
        self.urls.send(url.into()).is_ok()
    }

    /// Deliver the URL the process was launched with. Only the first call is honoured.
    pub fn deliver_initial(&self, url: Option<String>) -> bool {
        if self.initial_checked.swap(true, Ordering::SeqCst) {
            debug!("launch URL already checked");
            return false;
        }
        match url {
            Some(url) => self.deliver(url),
            None => false,
        }
    }

    pub async fn unsubscribe(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(worker) = self.worker.take() {
            if let Err(err) = worker.await {
                warn!(error = %err, "deep-link worker ended abnormally");
            }
        }
        debug!("deep-link listener unsubscribed");
    }
}

impl Drop for DeepLinkListener {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

async fn listen<S>(
    store: Arc<S>,
    registry: CallbackRegistry,
    redirect_url: Url,
    mut urls: mpsc::UnboundedReceiver<String>,
    mut shutdown: oneshot::Receiver<()>,
    events: mpsc::UnboundedSender<DeepLinkEvent>,
) where
    S: SessionStore + ?Sized,
{
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            next = urls.recv() => {
                let Some(raw) = next else { break };
                let event = handle_url(store.as_ref(), &registry, &redirect_url, &raw).await;
                if events.send(event).is_err() {
                    debug!("deep-link event receiver dropped");
                }
            }
        }
    }
}

async fn handle_url<S>(
    store: &S,
    registry: &CallbackRegistry,
    redirect_url: &Url,
    raw: &str,
) -> DeepLinkEvent
where
    S: SessionStore + ?Sized,
{
    let ignored = |reason| DeepLinkEvent::Ignored { reason };

    let Ok(url) = Url::parse(raw.trim()) else {
        debug!("ignoring unparseable deep link");
        return ignored(IgnoreReason::Malformed);
    };
    if !is_callback(&url, redirect_url) {
        debug!(scheme = url.scheme(), "ignoring deep link for another route");
        return ignored(IgnoreReason::NotAuthCallback);
    }
    let params = match parse_callback(raw) {
        Ok(params) => params,
        Err(_) => return ignored(IgnoreReason::Malformed),
    };

    if let Some(provider_error) = params.error {
        warn!(error = %provider_error, "provider reported an error through the redirect");
        return DeepLinkEvent::Failed {
            kind: AuthErrorKind::ProviderError,
            message: provider_error.to_string(),
        };
    }

    let Some((access_token, refresh_token)) = params.tokens.pair() else {
        if params.code.is_some() {
            warn!("deep link carried an authorization code; code exchange is not supported");
            return ignored(IgnoreReason::AuthorizationCode);
        }
        return ignored(IgnoreReason::NoTokens);
    };

    let _guard = match registry.claim(raw) {
        Claim::Acquired(guard) => guard,
        Claim::AlreadyClaimed(_) => {
            debug!("callback already claimed, skipping");
            return DeepLinkEvent::Duplicate;
        }
    };

    match store.set_session(access_token, refresh_token).await {
        Ok(session) => {
            info!(user_id = %session.user_id(), "session established from deep link");
            DeepLinkEvent::SessionEstablished(session)
        }
        Err(err) => {
            let err = AuthError::SessionExchange(err.to_string());
            error!(error = %err, "deep-link session exchange failed");
            DeepLinkEvent::Failed {
                kind: err.kind(),
                message: err.to_string(),
            }
        }
    }
}

fn is_callback(url: &Url, redirect_url: &Url) -> bool {
    url.scheme() == redirect_url.scheme()
        && url.host_str() == redirect_url.host_str()
        && url.path().trim_end_matches('/') == redirect_url.path().trim_end_matches('/')
}
