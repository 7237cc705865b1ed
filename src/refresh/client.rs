use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::RefreshError;
use crate::session::user::UserProfile;

/// What a successful refresh hands back.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshedSession {
    pub access_token: String,
    pub user: Option<UserProfile>,
}

/// The network side of a refresh. The refresh credential itself travels
/// with the transport (cookie jar) and is never seen here.
#[async_trait]
pub trait RefreshClient: Send + Sync {
    async fn refresh(&self) -> Result<RefreshedSession, RefreshError>;
}

/// `POST <refresh_url>` with an empty body, expecting
/// `{ "data": { "accessToken": "...", "user": { ... } } }`.
#[derive(Debug, Clone)]
pub struct HttpRefreshClient {
    client: Client,
    url: String,
}

impl HttpRefreshClient {
    /// `client` should be the cookie-enabled client shared with the rest of
    /// the application, so the refresh cookie set at login is sent along.
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self { client, url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RefreshClient for HttpRefreshClient {
    async fn refresh(&self) -> Result<RefreshedSession, RefreshError> {
        debug!(url = %self.url, "requesting token refresh");
        let response = self.client.post(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        parse_refresh_body(&body)
    }
}

pub fn parse_refresh_body(body: &str) -> Result<RefreshedSession, RefreshError> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| RefreshError::MalformedResponse(format!("body is not valid JSON: {}", e)))?;

    let data = json
        .get("data")
        .ok_or_else(|| RefreshError::MalformedResponse("missing 'data'".to_string()))?;

    let access_token = data
        .get("accessToken")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| RefreshError::MalformedResponse("missing 'data.accessToken'".to_string()))?
        .to_owned();

    let user = match data.get("user") {
        None | Some(Value::Null) => None,
        Some(raw) => match serde_json::from_value::<UserProfile>(raw.clone()) {
            Ok(user) => Some(user),
            Err(err) => {
                warn!(error = %err, "refresh response carried an unreadable user profile, ignoring it");
                None
            }
        },
    };

    Ok(RefreshedSession { access_token, user })
}
