//! Session data shared between the persistent store and in-memory consumers.

pub mod epoch;
pub mod keys;
pub mod observer;
pub mod state;
pub mod user;

pub use epoch::SessionEpoch;
pub use keys::SessionKeys;
pub use observer::{NoopObserver, SessionObserver};
pub use state::{Session, SessionState};
pub use user::UserProfile;
