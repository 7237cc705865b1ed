use anyhow::{Context, Result};
use tracing::warn;

use crate::config::settings::StorageConfig;
use crate::session::user::UserProfile;
use crate::store::SessionStore;

pub const ACCESS_TOKEN_KEY_DEFAULT: &str = "accessToken";
pub const USER_KEY_DEFAULT: &str = "user";
pub const REFRESH_COOKIE_KEY_DEFAULT: &str = "refreshCookie";

/// Store keys under which the session lives, plus the read/write helpers
/// every writer of the session goes through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKeys {
    pub access_token: String,
    pub user: String,
    /// `Cookie` header value the refresh endpoint expects, kept across runs.
    pub refresh_cookie: String,
}

impl Default for SessionKeys {
    fn default() -> Self {
        Self {
            access_token: ACCESS_TOKEN_KEY_DEFAULT.to_owned(),
            user: USER_KEY_DEFAULT.to_owned(),
            refresh_cookie: REFRESH_COOKIE_KEY_DEFAULT.to_owned(),
        }
    }
}

impl From<&StorageConfig> for SessionKeys {
    fn from(cfg: &StorageConfig) -> Self {
        Self {
            access_token: cfg.access_token_key.to_owned(),
            user: cfg.user_key.to_owned(),
            refresh_cookie: cfg.refresh_cookie_key.to_owned(),
        }
    }
}

impl SessionKeys {
    pub async fn load_token(&self, store: &dyn SessionStore) -> Result<Option<String>> {
        store.get(&self.access_token).await
    }

    /// A profile that no longer parses is reported as absent.
    pub async fn load_user(&self, store: &dyn SessionStore) -> Result<Option<UserProfile>> {
        let raw = match store.get(&self.user).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(err) => {
                warn!(key = %self.user, error = %err, "stored user profile is not valid JSON, ignoring");
                Ok(None)
            }
        }
    }

    /// Replace the token and, when given, the profile. A missing profile
    /// leaves the stored one in place.
    pub async fn persist(
        &self,
        store: &dyn SessionStore,
        token: &str,
        user: Option<&UserProfile>,
    ) -> Result<()> {
        store.set(&self.access_token, token).await?;
        if let Some(user) = user {
            let serialized = serde_json::to_string(user).context("failed to serialize user profile")?;
            store.set(&self.user, &serialized).await?;
        }
        Ok(())
    }

    pub async fn load_refresh_cookie(&self, store: &dyn SessionStore) -> Result<Option<String>> {
        store.get(&self.refresh_cookie).await
    }

    pub async fn persist_refresh_cookie(&self, store: &dyn SessionStore, cookie: &str) -> Result<()> {
        store.set(&self.refresh_cookie, cookie).await
    }

    /// Removes every session key; later removals are attempted even if an
    /// earlier one failed.
    pub async fn purge(&self, store: &dyn SessionStore) -> Result<()> {
        let token_res = store.remove(&self.access_token).await;
        let user_res = store.remove(&self.user).await;
        let cookie_res = store.remove(&self.refresh_cookie).await;
        token_res.and(user_res).and(cookie_res)
    }
}
