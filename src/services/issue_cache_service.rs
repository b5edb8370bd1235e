use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::{watch, RwLock};
use tracing::{error, info};

use crate::database::issues_repo;
use crate::models::IssuesRow;

/// Full snapshot of the `issues` table. Every reload replaces the whole list
/// and bumps the version watched by realtime clients.
#[derive(Clone)]
pub struct IssueCache {
    issues: Arc<RwLock<Vec<IssuesRow>>>,
    version: Arc<watch::Sender<u64>>,
}

impl Default for IssueCache {
    fn default() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            issues: Arc::new(RwLock::new(Vec::new())),
            version: Arc::new(version),
        }
    }
}

impl IssueCache {
    pub async fn fetch_issues(&self, pool: &SqlitePool) {
        match issues_repo::list_issues(pool).await {
            Ok(rows) => {
                let count = rows.len();
                *self.issues.write().await = rows;
                self.version.send_modify(|v| *v += 1);
                info!("🗺️ Issue cache reloaded: {} issues", count);
            }
            Err(e) => {
                error!("Error fetching issues: {}", e);
            }
        }
    }

    pub async fn snapshot(&self) -> Vec<IssuesRow> {
        self.issues.read().await.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }
}
