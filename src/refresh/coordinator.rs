use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, error, info, warn};

use crate::error::RefreshError;
use crate::helpers::time::get_instant;
use crate::observability::metrics::Metrics;
use crate::refresh::client::RefreshClient;
use crate::session::epoch::SessionEpoch;
use crate::session::keys::SessionKeys;
use crate::session::observer::SessionObserver;
use crate::store::SessionStore;
use crate::token::inspector::{get_token_expiration, is_token_expired};
use crate::token::DEFAULT_BUFFER_MINUTES;

type RefreshOutcome = Result<Option<String>, RefreshError>;
type PendingRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Refreshing,
}

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub keys: SessionKeys,
    pub buffer_minutes: u64,
    /// Shared with the [`crate::session::SessionState`] that performs
    /// logins and logouts.
    pub epoch: SessionEpoch,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            keys: SessionKeys::default(),
            buffer_minutes: DEFAULT_BUFFER_MINUTES,
            epoch: SessionEpoch::default(),
        }
    }
}

/// Hands out usable access tokens and refreshes them when they go stale.
///
/// At most one refresh runs at a time per coordinator: callers arriving while
/// one is in flight attach to it and receive the same outcome. Cloning is
/// cheap and every clone shares the in-flight refresh.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn SessionStore>,
    client: Arc<dyn RefreshClient>,
    observer: Arc<dyn SessionObserver>,
    metrics: Arc<Metrics>,
    settings: CoordinatorSettings,
    in_flight: Mutex<Option<PendingRefresh>>,
}

/// Clears the in-flight marker when the refresh task finishes, whichever
/// way it finishes. Held by the task, so a panicking refresh still runs its
/// failure handling before the marker goes away.
struct InFlightMarker<'a>(&'a Mutex<Option<PendingRefresh>>);

impl Drop for InFlightMarker<'_> {
    fn drop(&mut self) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        client: Arc<dyn RefreshClient>,
        observer: Arc<dyn SessionObserver>,
        metrics: Arc<Metrics>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                client,
                observer,
                metrics,
                settings,
                in_flight: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> CoordinatorState {
        match self.inner.in_flight.lock().unwrap_or_else(PoisonError::into_inner).is_some() {
            true => CoordinatorState::Refreshing,
            false => CoordinatorState::Idle,
        }
    }

    /// Valid token or `None`. Refresh failures are logged and reported as
    /// "not authenticated"; the forced logout has already happened by then.
    pub async fn get_valid_access_token(&self) -> Option<String> {
        match self.refresh_token_if_needed().await {
            Ok(token) => token,
            Err(err) => {
                warn!(error = %err, "no valid access token available");
                None
            }
        }
    }

    /// Stored token if still fresh, otherwise the outcome of a (possibly
    /// shared) refresh. `Ok(None)` when there is no session at all.
    pub async fn refresh_token_if_needed(&self) -> Result<Option<String>, RefreshError> {
        let inner = &self.inner;
        let token = inner
            .settings
            .keys
            .load_token(inner.store.as_ref())
            .await
            .map_err(|e| RefreshError::Storage(e.to_string()))?;

        let token = match token {
            Some(token) => token,
            None => {
                debug!("no stored access token, nothing to refresh");
                return Ok(None);
            }
        };

        if !is_token_expired(&token, inner.settings.buffer_minutes) {
            return Ok(Some(token));
        }

        self.join_or_start().await
    }

    fn join_or_start(&self) -> PendingRefresh {
        let mut in_flight = self.inner.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(pending) = in_flight.as_ref() {
            debug!("joining in-flight token refresh");
            self.inner.metrics.refresh_joined.inc();
            return pending.clone();
        }

        // The refresh runs as its own task so it completes even when every
        // caller stops waiting. The marker is stored before the lock is
        // released, so the task cannot clear it ahead of time.
        let inner = self.inner.clone();
        let task = tokio::spawn(async move {
            let _marker = InFlightMarker(&inner.in_flight);
            match AssertUnwindSafe(inner.run_refresh()).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(panic) => {
                    let err = RefreshError::Interrupted(panic_message(panic.as_ref()));
                    inner.terminate_session(err).await
                }
            }
        });
        let pending = async move {
            task.await
                .unwrap_or_else(|e| Err(RefreshError::Interrupted(e.to_string())))
        }
        .boxed()
        .shared();

        *in_flight = Some(pending.clone());
        pending
    }
}

impl Inner {
    async fn run_refresh(&self) -> RefreshOutcome {
        let store = self.store.as_ref();
        let keys = &self.settings.keys;
        let started_in = self.settings.epoch.current().await;

        // An episode that settled between the caller's read and this start
        // may already have replaced or removed the token.
        match keys.load_token(store).await {
            Ok(None) => return Ok(None),
            Ok(Some(token)) if !is_token_expired(&token, self.settings.buffer_minutes) => {
                debug!("token already replaced, skipping refresh");
                return Ok(Some(token));
            }
            Ok(Some(_)) => {}
            Err(err) => warn!(error = %err, "could not re-read stored token before refresh"),
        }

        info!("access token expired or about to expire, refreshing");
        let start = get_instant();
        self.metrics.refresh_requests.inc();
        let response = self.client.refresh().await;

        // Commit under the epoch lock: a login or logout either happened
        // before this point and voids the outcome, or waits until it is stored.
        let epoch = self.settings.epoch.lock().await;
        if *epoch != started_in {
            self.metrics.refresh_duration.observe(start.elapsed().as_secs_f64());
            info!("session changed while refreshing, discarding refresh outcome");
            return Ok(None);
        }

        let outcome = match response {
            Ok(refreshed) => {
                let persisted = keys
                    .persist(store, &refreshed.access_token, refreshed.user.as_ref())
                    .await;
                persisted
                    .map(|_| refreshed)
                    .map_err(|e| RefreshError::Storage(e.to_string()))
            }
            Err(err) => Err(err),
        };
        self.metrics.refresh_duration.observe(start.elapsed().as_secs_f64());

        match outcome {
            Ok(refreshed) => {
                if let Some(exp) = get_token_expiration(&refreshed.access_token) {
                    self.metrics.token_expiry_unix.set(exp.timestamp());
                }
                self.observer.on_refreshed(&refreshed.access_token, refreshed.user.as_ref());
                info!("access token refreshed");
                Ok(Some(refreshed.access_token))
            }
            // the epoch guard is still held, so the purge cannot hit a newer login
            Err(err) => self.terminate_session(err).await,
        }
    }

    /// Unrecoverable refresh failure: purge the stored session and tell the
    /// observer, then hand the error back to every waiting caller.
    async fn terminate_session(&self, err: RefreshError) -> RefreshOutcome {
        self.metrics.refresh_failures.with_label_values(&[err.reason()]).inc();
        warn!(error = %err, "token refresh failed, terminating session");

        if let Err(purge_err) = self.settings.keys.purge(self.store.as_ref()).await {
            error!(error = %purge_err, "failed to purge session after refresh failure");
        }
        self.metrics.token_expiry_unix.set(0);
        self.metrics.forced_logouts.inc();
        self.observer.on_unrecoverable_failure();
        Err(err)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("refresh task panicked: {}", msg)
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("refresh task panicked: {}", msg)
    } else {
        "refresh task panicked".to_string()
    }
}
