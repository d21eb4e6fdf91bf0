//! Authenticated-operator context and the route guard.
//!
//! `Session` is handed explicitly to whoever needs it (poller, dashboard
//! server, CLI). It is filled by [`Session::init`] or [`Session::login`] and
//! emptied by [`Session::logout`] or by [`Session::clear`] when upstream
//! answers 401.
//!
//! Browsers never see the upstream token. They get a random marker cookie
//! that the dashboard issues on login and recognises until logout.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::client::{ApiClient, ApiError, EventSource};
use crate::model::{Credentials, EventsPage, User};

/// Where unauthenticated page requests are sent.
pub const LOGIN_PATH: &str = "/login";

/// Name of the marker cookie handed to browsers.
pub const MARKER_COOKIE: &str = "session";

const PUBLIC_PATHS: &[&str] = &["/login", "/register"];

#[derive(Clone, Default)]
pub struct Session {
    user: Arc<RwLock<Option<User>>>,
    markers: Arc<RwLock<HashSet<String>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user(&self) -> Option<User> {
        self.user.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.user.read().await.is_some()
    }

    /// Load the current user from `GET /auth/me`. Any failure leaves the
    /// session empty.
    pub async fn init(&self, api: &ApiClient) -> Option<User> {
        let user = match api.me().await {
            Ok(user) => Some(user),
            Err(e) => {
                if !e.is_unauthorized() {
                    warn!(error = %e, "could not load current user");
                }
                None
            }
        };
        self.set_user(user.clone()).await;
        user
    }

    /// Authenticate, then load the user record.
    ///
    /// Upstream's login response carries no user, so when `/auth/me` fails
    /// right after a successful login the session falls back to the
    /// username alone.
    pub async fn login(&self, api: &ApiClient, credentials: &Credentials) -> Result<User, ApiError> {
        api.login(credentials).await?;
        let user = match api.me().await {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "login succeeded but /auth/me failed");
                User {
                    id: uuid::Uuid::nil(),
                    username: credentials.username.clone(),
                    role: None,
                    first_name: None,
                    last_name: None,
                }
            }
        };
        info!(username = %user.username, "logged in");
        self.set_user(Some(user.clone())).await;
        Ok(user)
    }

    /// Log out upstream. The local session is cleared even if the call fails.
    pub async fn logout(&self, api: &ApiClient) {
        if let Err(e) = api.logout().await {
            warn!(error = %e, "logout request failed");
        }
        self.clear().await;
    }

    pub(crate) async fn set_user(&self, user: Option<User>) {
        *self.user.write().await = user;
    }

    pub async fn clear(&self) {
        if self.user.write().await.take().is_some() {
            info!("session cleared");
        }
    }

    /// Hand out a fresh browser marker.
    pub async fn issue_marker(&self) -> String {
        let marker = uuid::Uuid::new_v4().to_string();
        self.markers.write().await.insert(marker.clone());
        marker
    }

    pub async fn revoke_marker(&self, marker: &str) {
        self.markers.write().await.remove(marker);
    }

    pub async fn is_issued(&self, marker: &str) -> bool {
        self.markers.read().await.contains(marker)
    }

    /// Decide whether a request for `path` may proceed.
    ///
    /// Login and registration are public. Every other path needs a marker
    /// cookie this session issued and has not revoked.
    pub async fn guard(&self, path: &str, cookie_header: Option<&str>) -> Access {
        if PUBLIC_PATHS.contains(&path) {
            return Access::Allow;
        }
        match marker_from_cookies(cookie_header) {
            Some(marker) if self.is_issued(marker).await => Access::Allow,
            _ => Access::Redirect(LOGIN_PATH),
        }
    }
}

/// Event source that logs in with service credentials whenever the session
/// is empty, so a poller survives upstream session expiry.
pub struct AuthenticatedSource {
    api: ApiClient,
    session: Session,
    credentials: Option<Credentials>,
}

impl AuthenticatedSource {
    pub fn new(api: ApiClient, session: Session, credentials: Option<Credentials>) -> Self {
        Self {
            api,
            session,
            credentials,
        }
    }
}

#[async_trait::async_trait]
impl EventSource for AuthenticatedSource {
    async fn fetch_events(&self, page: u32, per_page: u32) -> Result<EventsPage, ApiError> {
        if let Some(credentials) = &self.credentials {
            if !self.session.is_authenticated().await {
                self.session.login(&self.api, credentials).await?;
            }
        }
        self.api.events(page, per_page).await
    }
}

/// Outcome of checking a page request against the session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allow,
    Redirect(&'static str),
}

/// The marker cookie's value, if the request carries a non-empty one.
pub fn marker_from_cookies(cookie_header: Option<&str>) -> Option<&str> {
    cookie_header?
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, value)| name.trim() == MARKER_COOKIE && !value.trim().is_empty())
        .map(|(_, value)| value.trim())
}
