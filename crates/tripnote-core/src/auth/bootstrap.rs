use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{Session, SessionStore};

/// Where the application should land on start.
#[derive(Debug, Clone)]
pub enum InitialRoute {
    Unauthenticated,
    Authenticated(Session),
}

impl InitialRoute {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, InitialRoute::Authenticated(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            InitialRoute::Authenticated(session) => Some(session),
            InitialRoute::Unauthenticated => None,
        }
    }
}

/// Decides the initial route from the stored session, validating it server-side.
pub struct SessionBootstrapper<S: ?Sized> {
    store: Arc<S>,
}

impl<S> SessionBootstrapper<S>
where
    S: SessionStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// A stored session whose user can no longer be resolved is signed out
    /// before routing, so the user never lands half-authenticated.
    pub async fn resolve(&self) -> InitialRoute {
        let session = match self.store.get_session().await {
            Ok(Some(session)) => session,
            Ok(None) => {
                debug!("no stored session");
                return InitialRoute::Unauthenticated;
            }
            Err(err) => {
                warn!(error = %err, "could not read stored session");
                return InitialRoute::Unauthenticated;
            }
        };

        match self.store.get_user().await {
            Ok(user) => {
                info!(user_id = %user.id, "restored session");
                InitialRoute::Authenticated(Session { user, ..session })
            }
            Err(err) => {
                warn!(user_id = %session.user_id(), error = %err, "stored session rejected, signing out");
                if let Err(err) = self.store.sign_out().await {
                    warn!(error = %err, "sign-out of stale session failed");
                }
                InitialRoute::Unauthenticated
            }
        }
    }
}
