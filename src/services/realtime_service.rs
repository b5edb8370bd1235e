use sqlx::SqlitePool;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::services::issue_cache_service::IssueCache;

pub const CHANNEL_NAME: &str = "civic-updates";
pub const REFRESH_EVENT: &str = "REFRESH_ISSUES";

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealtimeEvent {
    RefreshIssues,
}

impl RealtimeEvent {
    pub fn name(self) -> &'static str {
        match self {
            RealtimeEvent::RefreshIssues => REFRESH_EVENT,
        }
    }
}

#[derive(Clone)]
pub struct RefreshChannel {
    name: &'static str,
    sender: broadcast::Sender<RealtimeEvent>,
}

impl Default for RefreshChannel {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            name: CHANNEL_NAME,
            sender,
        }
    }
}

impl RefreshChannel {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Fire-and-forget: nobody listening is not an error.
    pub fn broadcast(&self) {
        let event = RealtimeEvent::RefreshIssues;
        match self.sender.send(event) {
            Ok(n) => debug!("📣 {} -> {} ({} receivers)", self.name, event.name(), n),
            Err(_) => debug!("📣 {} -> {} (no receivers)", self.name, event.name()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.sender.subscribe()
    }
}

/// Keeps the refresh listener alive; dropping it unsubscribes.
pub struct RefreshSubscription {
    task: JoinHandle<()>,
}

impl Drop for RefreshSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub fn spawn_refresh_listener(
    channel: &RefreshChannel,
    cache: IssueCache,
    pool: SqlitePool,
) -> RefreshSubscription {
    let mut rx = channel.subscribe();
    let name = channel.name();
    let task = tokio::spawn(async move {
        info!("📡 Subscribed to {}", name);
        loop {
            match rx.recv().await {
                Ok(RealtimeEvent::RefreshIssues) => {
                    info!("Realtime event received! Refetching issues.");
                    cache.fetch_issues(&pool).await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("📡 {} lagged, skipped {} events", name, skipped);
                    cache.fetch_issues(&pool).await;
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
    RefreshSubscription { task }
}
