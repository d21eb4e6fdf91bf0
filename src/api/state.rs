use std::sync::Arc;

use tokio::sync::watch;

use crate::client::ApiClient;
use crate::config::DashboardConfig;
use crate::poller::DashboardState;
use crate::session::Session;

/// Shared by every handler. Cloning is cheap: the client, session and
/// config are reference counted and the receiver is a channel handle.
#[derive(Clone)]
pub struct AppState {
    pub snapshot: watch::Receiver<DashboardState>,
    pub api: ApiClient,
    pub session: Session,
    pub config: Arc<DashboardConfig>,
}

impl AppState {
    pub fn new(
        snapshot: watch::Receiver<DashboardState>,
        api: ApiClient,
        session: Session,
        config: DashboardConfig,
    ) -> Self {
        Self {
            snapshot,
            api,
            session,
            config: Arc::new(config),
        }
    }

    /// The latest published snapshot. Cheap: the heavy fields are `Arc`s.
    pub fn current(&self) -> DashboardState {
        self.snapshot.borrow().clone()
    }
}
