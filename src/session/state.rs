use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::info;

use crate::session::epoch::SessionEpoch;
use crate::session::keys::SessionKeys;
use crate::session::observer::SessionObserver;
use crate::session::user::UserProfile;
use crate::store::SessionStore;

/// In-memory view of the session consumers render from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<UserProfile>,
    pub is_authenticated: bool,
}

/// Owner of the in-memory session. Writes that originate here (login,
/// explicit logout) go to the persistent store first and are then mirrored;
/// writes that originate in the refresh coordinator arrive through
/// [`SessionObserver`]. Login and logout advance the [`SessionEpoch`] the
/// coordinator checks before it commits a refresh.
#[derive(Clone)]
pub struct SessionState {
    tx: Arc<watch::Sender<Session>>,
    store: Arc<dyn SessionStore>,
    keys: SessionKeys,
    epoch: SessionEpoch,
}

impl SessionState {
    pub fn new(store: Arc<dyn SessionStore>, keys: SessionKeys) -> Self {
        let (tx, _) = watch::channel(Session::default());
        Self {
            tx: Arc::new(tx),
            store,
            keys,
            epoch: SessionEpoch::new(),
        }
    }

    /// Load whatever the persistent store holds. A stored token marks the
    /// session authenticated even if it is stale; the coordinator decides
    /// about staleness on first use.
    pub async fn hydrate(&self) -> Result<Session> {
        let token = self.keys.load_token(self.store.as_ref()).await?;
        let user = self.keys.load_user(self.store.as_ref()).await?;
        let session = Session {
            is_authenticated: token.is_some(),
            token,
            user,
        };
        info!(authenticated = session.is_authenticated, "session hydrated");
        self.tx.send_replace(session.clone());
        Ok(session)
    }

    /// Record a successful login.
    pub async fn set_credentials(&self, token: &str, user: Option<UserProfile>) -> Result<()> {
        let mut epoch = self.epoch.lock().await;
        *epoch += 1;
        self.keys.persist(self.store.as_ref(), token, user.as_ref()).await?;
        self.tx.send_modify(|session| {
            session.token = Some(token.to_owned());
            if user.is_some() {
                session.user = user;
            }
            session.is_authenticated = true;
        });
        info!("credentials stored");
        Ok(())
    }

    /// Explicit logout: purge the store, then clear memory.
    pub async fn logout(&self) -> Result<()> {
        let mut epoch = self.epoch.lock().await;
        *epoch += 1;
        let purged = self.keys.purge(self.store.as_ref()).await;
        self.tx.send_replace(Session::default());
        info!("logged out");
        purged
    }

    pub fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    pub fn keys(&self) -> &SessionKeys {
        &self.keys
    }

    pub fn epoch(&self) -> &SessionEpoch {
        &self.epoch
    }
}

impl SessionObserver for SessionState {
    fn on_refreshed(&self, token: &str, user: Option<&UserProfile>) {
        self.tx.send_modify(|session| {
            session.token = Some(token.to_owned());
            if let Some(user) = user {
                session.user = Some(user.clone());
            }
            session.is_authenticated = true;
        });
    }

    fn on_unrecoverable_failure(&self) {
        info!("session terminated after failed refresh");
        self.tx.send_replace(Session::default());
    }
}
