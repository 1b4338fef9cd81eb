use crate::types::{
    BoundaryError, DashboardError, IdentityProvider, OAuthRedirect, OAuthRequest, Result, Session,
    UserIdentity,
};
use async_trait::async_trait;
use interfaces::BoundaryResult;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// Signed-in user together with the session that proves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user: UserIdentity,
    pub session: Session,
}

/// Login/logout flow on top of an injected identity provider.
pub struct AuthService<I> {
    provider: I,
    current: Option<AuthenticatedUser>,
}

impl<I: IdentityProvider> AuthService<I> {
    pub fn new(provider: I) -> Self {
        Self {
            provider,
            current: None,
        }
    }

    pub fn provider(&self) -> &I {
        &self.provider
    }

    pub fn current(&self) -> Option<&AuthenticatedUser> {
        self.current.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_some()
    }

    /// Register an email/password account, then sign straight into it.
    pub async fn signup(&mut self, email: &str, password: &str, name: Option<&str>) -> Result<&AuthenticatedUser> {
        let user = self
            .provider
            .create_account(email, password, name)
            .await
            .map_err(|e| match e {
                BoundaryError::Conflict(_) => DashboardError::AccountExists {
                    email: email.to_string(),
                },
                other => DashboardError::Boundary(other),
            })?;
        info!("Created account {}", user.id);

        self.login(email, password).await
    }

    /// Email/password login. Every credential problem surfaces as
    /// `DashboardError::InvalidCredentials`.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<&AuthenticatedUser> {
        let session = self
            .provider
            .create_email_session(email, password)
            .await
            .map_err(credential_error)?;
        let user = match self.provider.get_current_user().await {
            Ok(user) => user,
            Err(e) => {
                // Don't leave a session behind that nothing refers to.
                if let Err(cleanup) = self.provider.delete_session(&session.id).await {
                    warn!("Failed to delete session {} after login error: {}", session.id, cleanup);
                }
                return Err(credential_error(e));
            }
        };

        info!("User {} signed in", user.id);
        Ok(&*self.current.insert(AuthenticatedUser { user, session }))
    }

    /// Pick up an existing provider session, if there is one.
    pub async fn restore(&mut self) -> Result<Option<&AuthenticatedUser>> {
        let session = match self.provider.get_session("current").await {
            Ok(session) => session,
            Err(BoundaryError::Unauthorized) | Err(BoundaryError::NotFound(_)) => {
                debug!("No existing session to restore");
                self.current = None;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let user = self.provider.get_current_user().await?;

        info!("Restored session {} for user {}", session.id, user.id);
        Ok(Some(&*self.current.insert(AuthenticatedUser { user, session })))
    }

    pub async fn logout(&mut self) -> Result<()> {
        let Some(current) = self.current.take() else {
            return Ok(());
        };
        match self.provider.delete_session(&current.session.id).await {
            Ok(()) | Err(BoundaryError::Unauthorized) | Err(BoundaryError::NotFound(_)) => {
                info!("User {} signed out", current.user.id);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to delete session {}: {}", current.session.id, e);
                Err(e.into())
            }
        }
    }

    pub async fn oauth_redirect(&self, request: &OAuthRequest) -> Result<OAuthRedirect> {
        Ok(self.provider.create_oauth_session(request).await?)
    }
}

fn credential_error(e: BoundaryError) -> DashboardError {
    match e {
        BoundaryError::Transport(_) | BoundaryError::Storage(_) => DashboardError::Boundary(e),
        other => {
            debug!("Login rejected: {}", other);
            DashboardError::InvalidCredentials
        }
    }
}

/// Shortest password the in-process provider accepts, same as Appwrite.
pub const MIN_PASSWORD_LEN: usize = 8;

/// In-process identity provider with an account table, for local
/// development and tests.
pub struct StaticIdentityProvider {
    accounts: Mutex<HashMap<String, (String, UserIdentity)>>,
    sessions: Mutex<HashMap<String, Session>>,
    current: Mutex<Option<String>>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
        }
    }

    pub fn with_account(self, email: &str, password: &str, name: Option<&str>) -> Self {
        if let Ok(mut accounts) = self.accounts.lock() {
            accounts.insert(email.to_lowercase(), (password.to_string(), new_user(email, name)));
        }
        self
    }

    pub fn account_count(&self) -> usize {
        self.accounts.lock().map(|a| a.len()).unwrap_or(0)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    fn current_session(&self) -> BoundaryResult<Session> {
        let current = self.current.lock().map_err(poisoned)?;
        let id = current.as_ref().ok_or(BoundaryError::Unauthorized)?;
        let sessions = self.sessions.lock().map_err(poisoned)?;
        sessions.get(id).cloned().ok_or(BoundaryError::Unauthorized)
    }
}

impl Default for StaticIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn create_account(&self, email: &str, password: &str, name: Option<&str>) -> BoundaryResult<UserIdentity> {
        if !email.contains('@') {
            return Err(BoundaryError::Rejected(format!("invalid email {:?}", email)));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(BoundaryError::Rejected(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let mut accounts = self.accounts.lock().map_err(poisoned)?;
        let key = email.to_lowercase();
        if accounts.contains_key(&key) {
            return Err(BoundaryError::Conflict(format!("account {}", email)));
        }
        let user = new_user(email, name);
        accounts.insert(key, (password.to_string(), user.clone()));
        Ok(user)
    }

    async fn create_email_session(&self, email: &str, password: &str) -> BoundaryResult<Session> {
        let user = match self.accounts.lock().map_err(poisoned)?.get(&email.to_lowercase()) {
            Some((expected, user)) if expected == password => user.clone(),
            _ => return Err(BoundaryError::Unauthorized),
        };

        let session = Session {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            provider: "email".to_string(),
            expires_at: None,
        };
        self.sessions
            .lock()
            .map_err(poisoned)?
            .insert(session.id.clone(), session.clone());
        *self.current.lock().map_err(poisoned)? = Some(session.id.clone());
        Ok(session)
    }

    async fn get_session(&self, session_id: &str) -> BoundaryResult<Session> {
        if session_id == "current" {
            return self.current_session();
        }
        self.sessions
            .lock()
            .map_err(poisoned)?
            .get(session_id)
            .cloned()
            .ok_or_else(|| BoundaryError::NotFound(format!("session {}", session_id)))
    }

    async fn get_current_user(&self) -> BoundaryResult<UserIdentity> {
        let session = self.current_session()?;
        self.accounts
            .lock()
            .map_err(poisoned)?
            .values()
            .map(|(_, user)| user)
            .find(|user| user.id == session.user_id)
            .cloned()
            .ok_or(BoundaryError::Unauthorized)
    }

    async fn delete_session(&self, session_id: &str) -> BoundaryResult<()> {
        let id = if session_id == "current" {
            self.current_session()?.id
        } else {
            session_id.to_string()
        };

        let removed = self.sessions.lock().map_err(poisoned)?.remove(&id);
        let mut current = self.current.lock().map_err(poisoned)?;
        if current.as_deref() == Some(id.as_str()) {
            *current = None;
        }
        removed
            .map(|_| ())
            .ok_or_else(|| BoundaryError::NotFound(format!("session {}", id)))
    }

    async fn create_oauth_session(&self, request: &OAuthRequest) -> BoundaryResult<OAuthRedirect> {
        // No third party to bounce through: send the browser straight to success.
        let mut url = Url::parse(&request.success_url)
            .map_err(|e| BoundaryError::Rejected(format!("invalid success URL: {}", e)))?;
        url.query_pairs_mut().append_pair("provider", &request.provider);
        Ok(OAuthRedirect { url: url.to_string() })
    }
}

fn new_user(email: &str, name: Option<&str>) -> UserIdentity {
    UserIdentity {
        id: Uuid::new_v4().to_string(),
        email: email.to_string(),
        name: name.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string),
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> BoundaryError {
    BoundaryError::Storage(e.to_string())
}
