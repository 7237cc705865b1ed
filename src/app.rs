//! Composition root: builds every component once and wires them together.

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::Url;
use tracing::debug;

use crate::api::ApiClient;
use crate::config::ServiceConfig;
use crate::observability::Metrics;
use crate::refresh::{CoordinatorSettings, HttpRefreshClient, RefreshCoordinator};
use crate::session::{Session, SessionKeys, SessionState, UserProfile};
use crate::store::{FileStore, SessionStore};
use crate::utils::http_client;

#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn SessionStore>,
    pub session: SessionState,
    pub coordinator: RefreshCoordinator,
    pub api: ApiClient,
    pub metrics: Arc<Metrics>,
    pub cookies: Arc<Jar>,
    refresh_url: Url,
}

impl AppContext {
    /// Wire the application around the file store named in the config.
    pub fn from_config(service_config: &ServiceConfig) -> Result<Self> {
        let store = Arc::new(FileStore::new(&service_config.settings.storage.path));
        Self::with_parts(service_config, store, Arc::new(Jar::default()))
    }

    pub fn with_parts(
        service_config: &ServiceConfig,
        store: Arc<dyn SessionStore>,
        cookies: Arc<Jar>,
    ) -> Result<Self> {
        let settings = &service_config.settings;
        let keys = SessionKeys::from(&settings.storage);
        let metrics = Metrics::new()?;
        let refresh_url = Url::parse(&settings.api.refresh_url())
            .with_context(|| format!("invalid refresh url '{}'", settings.api.refresh_url()))?;
        let client = http_client::build(settings.api.timeout_ms, cookies.clone())?;

        let session = SessionState::new(store.clone(), keys.clone());
        let refresh_client = HttpRefreshClient::new(client.clone(), refresh_url.as_str());
        let coordinator = RefreshCoordinator::new(
            store.clone(),
            Arc::new(refresh_client),
            Arc::new(session.clone()),
            metrics.clone(),
            CoordinatorSettings {
                keys,
                buffer_minutes: settings.token.buffer_minutes,
                epoch: session.epoch().clone(),
            },
        );
        let api = ApiClient::new(client, settings.api.base_url.to_owned(), coordinator.clone());

        Ok(Self {
            store,
            session,
            coordinator,
            api,
            metrics,
            cookies,
            refresh_url,
        })
    }

    /// Hydrate the in-memory session and put the stored refresh cookie back
    /// into the jar.
    pub async fn restore(&self) -> Result<Session> {
        let session = self.session.hydrate().await?;
        let keys = self.session.keys();
        if let Some(cookie) = keys.load_refresh_cookie(self.store.as_ref()).await? {
            seed_jar(&self.cookies, &cookie, &self.refresh_url);
            debug!("refresh cookie restored");
        }
        Ok(session)
    }

    /// Store credentials from a login response. `refresh_cookie` is the
    /// `Cookie` header value (`name=value; ...`) the refresh endpoint expects.
    pub async fn login(
        &self,
        token: &str,
        user: Option<UserProfile>,
        refresh_cookie: Option<&str>,
    ) -> Result<()> {
        self.session.set_credentials(token, user).await?;
        if let Some(cookie) = refresh_cookie {
            let keys = self.session.keys();
            keys.persist_refresh_cookie(self.store.as_ref(), cookie).await?;
            seed_jar(&self.cookies, cookie, &self.refresh_url);
        }
        Ok(())
    }

    /// Write the jar's cookies for the refresh endpoint back to the store so
    /// a cookie rotated by the server outlives this process. Skipped when no
    /// session is stored.
    pub async fn save_cookies(&self) -> Result<()> {
        let keys = self.session.keys();
        if keys.load_token(self.store.as_ref()).await?.is_none() {
            return Ok(());
        }
        let header = match self.cookies.cookies(&self.refresh_url) {
            Some(header) => header,
            None => return Ok(()),
        };
        let header = header.to_str().context("refresh cookie is not valid header text")?;
        keys.persist_refresh_cookie(self.store.as_ref(), header).await
    }
}

fn seed_jar(jar: &Jar, cookie_header: &str, url: &Url) {
    for pair in cookie_header.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        // Path=/ so a cookie the server later sets at the root replaces it
        jar.add_cookie_str(&format!("{}; Path=/", pair), url);
    }
}
