use crate::fetcher::{describe_status, Fetcher};
use crate::types::{
    BoundaryError, IdentityProvider, OAuthRedirect, OAuthRequest, Result, Session, UserIdentity,
};
use async_trait::async_trait;
use interfaces::BoundaryResult;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::sync::Mutex;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://cloud.appwrite.io/v1";

/// Placeholder id asking Appwrite to generate one.
const UNIQUE_ID: &str = "unique()";

#[derive(Debug, Deserialize)]
struct AppwriteSession {
    #[serde(rename = "$id")]
    id: String,
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(default)]
    provider: String,
    #[serde(default)]
    expire: Option<String>,
}

impl From<AppwriteSession> for Session {
    fn from(session: AppwriteSession) -> Self {
        Self {
            id: session.id,
            user_id: session.user_id,
            provider: session.provider,
            expires_at: session.expire,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AppwriteUser {
    #[serde(rename = "$id")]
    id: String,
    email: String,
    #[serde(default)]
    name: Option<String>,
}

impl From<AppwriteUser> for UserIdentity {
    fn from(user: AppwriteUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name.filter(|n| !n.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AppwriteErrorBody {
    message: String,
}

/// Account API of a hosted Appwrite backend.
pub struct AppwriteIdentityProvider {
    fetcher: Fetcher,
    endpoint: String,
    project: String,
    // Session cookies handed out at login, replayed on later calls.
    cookies: Mutex<Option<String>>,
}

impl AppwriteIdentityProvider {
    pub fn new(fetcher: Fetcher, endpoint: &str, project: impl Into<String>) -> Result<Self> {
        Url::parse(endpoint)?;
        Ok(Self {
            fetcher,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project: project.into(),
            cookies: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    /// Browser redirect URL for an OAuth2 login.
    pub fn oauth_url(&self, request: &OAuthRequest) -> std::result::Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.url(&format!("/account/sessions/oauth2/{}", request.provider)))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("project", &self.project);
            query.append_pair("success", &request.success_url);
            query.append_pair("failure", &request.failure_url);
            for scope in &request.scopes {
                query.append_pair("scopes[]", scope);
            }
        }
        Ok(url)
    }

    /// Body of `POST /account`. The server picks the user id.
    pub fn account_body(email: &str, password: &str, name: Option<&str>) -> serde_json::Value {
        let mut body = json!({
            "userId": UNIQUE_ID,
            "email": email,
            "password": password,
        });
        if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
            body["name"] = json!(name);
        }
        body
    }

    fn cookie_header(&self) -> BoundaryResult<Option<String>> {
        let cookies = self
            .cookies
            .lock()
            .map_err(|e| BoundaryError::Storage(e.to_string()))?;
        Ok(cookies.clone())
    }

    fn remember_cookies(&self, response: &Response) -> BoundaryResult<()> {
        let pairs: Vec<&str> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(';').next())
            .map(str::trim)
            .filter(|pair| !pair.is_empty())
            .collect();
        if pairs.is_empty() {
            return Ok(());
        }

        let mut cookies = self
            .cookies
            .lock()
            .map_err(|e| BoundaryError::Storage(e.to_string()))?;
        *cookies = Some(pairs.join("; "));
        debug!("Stored {} session cookies", pairs.len());
        Ok(())
    }

    fn forget_cookies(&self) -> BoundaryResult<()> {
        let mut cookies = self
            .cookies
            .lock()
            .map_err(|e| BoundaryError::Storage(e.to_string()))?;
        *cookies = None;
        Ok(())
    }

    async fn send(&self, request: RequestBuilder) -> BoundaryResult<Response> {
        let mut request = request.header("X-Appwrite-Project", &self.project);
        if let Some(cookie) = self.cookie_header()? {
            request = request.header(COOKIE, cookie);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BoundaryError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<AppwriteErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or_else(|_| describe_status(status));

        Err(match status {
            StatusCode::UNAUTHORIZED => BoundaryError::Unauthorized,
            StatusCode::NOT_FOUND => BoundaryError::NotFound(message),
            StatusCode::CONFLICT => BoundaryError::Conflict(message),
            _ => BoundaryError::Rejected(message),
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> BoundaryResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| BoundaryError::Transport(format!("unexpected response body: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for AppwriteIdentityProvider {
    async fn create_account(&self, email: &str, password: &str, name: Option<&str>) -> BoundaryResult<UserIdentity> {
        let request = self
            .fetcher
            .client()
            .post(self.url("/account"))
            .json(&Self::account_body(email, password, name));

        let user: AppwriteUser = Self::decode(self.send(request).await?).await?;
        info!("Created account {}", user.id);
        Ok(user.into())
    }

    async fn create_email_session(&self, email: &str, password: &str) -> BoundaryResult<Session> {
        let request = self
            .fetcher
            .client()
            .post(self.url("/account/sessions/email"))
            .json(&json!({ "email": email, "password": password }));

        let response = self.send(request).await?;
        self.remember_cookies(&response)?;
        let session: AppwriteSession = Self::decode(response).await?;

        info!("Created email session {}", session.id);
        Ok(session.into())
    }

    async fn get_session(&self, session_id: &str) -> BoundaryResult<Session> {
        let request = self
            .fetcher
            .client()
            .get(self.url(&format!("/account/sessions/{}", session_id)));
        let session: AppwriteSession = Self::decode(self.send(request).await?).await?;
        Ok(session.into())
    }

    async fn get_current_user(&self) -> BoundaryResult<UserIdentity> {
        let request = self.fetcher.client().get(self.url("/account"));
        let user: AppwriteUser = Self::decode(self.send(request).await?).await?;
        Ok(user.into())
    }

    async fn delete_session(&self, session_id: &str) -> BoundaryResult<()> {
        let request = self
            .fetcher
            .client()
            .delete(self.url(&format!("/account/sessions/{}", session_id)));
        self.send(request).await?;
        self.forget_cookies()?;

        info!("Deleted session {}", session_id);
        Ok(())
    }

    async fn create_oauth_session(&self, request: &OAuthRequest) -> BoundaryResult<OAuthRedirect> {
        let url = self
            .oauth_url(request)
            .map_err(|e| BoundaryError::Rejected(e.to_string()))?;
        Ok(OAuthRedirect { url: url.to_string() })
    }
}
