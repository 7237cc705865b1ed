use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

/// Generation counter of the stored session.
///
/// Every login and explicit logout advances it while holding the lock, and a
/// refresh only commits its outcome if the generation it started under is
/// still current. A refresh that loses the race is dropped instead of
/// writing a token back into a session that no longer exists.
#[derive(Debug, Clone, Default)]
pub struct SessionEpoch {
    current: Arc<Mutex<u64>>,
}

impl SessionEpoch {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> u64 {
        *self.current.lock().await
    }

    /// Exclusive access to the generation. Store writes that must not
    /// interleave with a session change happen while the guard is held.
    pub async fn lock(&self) -> MutexGuard<'_, u64> {
        self.current.lock().await
    }
}
