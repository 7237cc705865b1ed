use http::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder};
use tracing::debug;

use crate::config::settings::join_url;
use crate::refresh::coordinator::RefreshCoordinator;

/// HTTP layer for authenticated API calls. Every request asks the
/// coordinator for a valid token first and goes out unauthenticated when
/// there is none.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    coordinator: RefreshCoordinator,
}

impl ApiClient {
    pub fn new(client: Client, base_url: impl Into<String>, coordinator: RefreshCoordinator) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            coordinator,
        }
    }

    pub async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = join_url(&self.base_url, path);
        let request = self.client.request(method.clone(), &url);

        match self.coordinator.get_valid_access_token().await {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => {
                debug!(%method, %url, "no access token, sending request unauthenticated");
                request
            }
        }
    }

    pub async fn get(&self, path: &str) -> RequestBuilder {
        self.request(Method::GET, path).await
    }

    pub async fn post(&self, path: &str) -> RequestBuilder {
        self.request(Method::POST, path).await
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }
}
