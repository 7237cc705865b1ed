use crate::session::user::UserProfile;

/// Hooks the refresh coordinator calls on the in-memory side of the session.
///
/// Supplied at construction by whoever owns the session state, so the
/// coordinator never has to look the state up by itself.
pub trait SessionObserver: Send + Sync {
    /// A refresh persisted a new token (and possibly a new profile).
    fn on_refreshed(&self, _token: &str, _user: Option<&UserProfile>) {}

    /// Refresh is impossible; the persisted session has already been purged.
    fn on_unrecoverable_failure(&self);
}

/// Observer for callers without in-memory session state.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_unrecoverable_failure(&self) {}
}
