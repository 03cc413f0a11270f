//! Background maintenance tasks.
//!
//! Two periodic workers run alongside the API:
//!
//! - **Session purge** deletes refresh sessions past their expiry so the
//!   registry only holds rows that can still authenticate. Expiry is already
//!   enforced at lookup time; the purge keeps the table from growing without
//!   bound.
//! - **Security stats** aggregates the audit log over the last interval and
//!   logs one line per action, giving operators a heartbeat of login failures
//!   and lockouts without a metrics pipeline.
//!
//! Both tasks poll on a fixed cadence configured via `MaintenanceConfig` and
//! log failures instead of exiting.

use crate::store::SessionStore;
use chrono::Utc;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{Instrument, debug, error, info, info_span};

#[derive(Clone, Copy, Debug)]
pub struct MaintenanceConfig {
    purge_interval: Duration,
    stats_interval: Duration,
}

impl MaintenanceConfig {
    /// Default maintenance cadence: purge and stats both hourly.
    #[must_use]
    pub fn new() -> Self {
        Self {
            purge_interval: Duration::from_secs(3600),
            stats_interval: Duration::from_secs(3600),
        }
    }

    #[must_use]
    pub fn with_purge_interval_seconds(mut self, seconds: u64) -> Self {
        self.purge_interval = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_stats_interval_seconds(mut self, seconds: u64) -> Self {
        self.stats_interval = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn normalize(self) -> Self {
        let purge_interval = if self.purge_interval.is_zero() {
            Duration::from_secs(1)
        } else {
            self.purge_interval
        };
        let stats_interval = if self.stats_interval.is_zero() {
            Duration::from_secs(1)
        } else {
            self.stats_interval
        };
        Self {
            purge_interval,
            stats_interval,
        }
    }

    #[must_use]
    pub fn purge_interval(&self) -> Duration {
        self.purge_interval
    }

    #[must_use]
    pub fn stats_interval(&self) -> Duration {
        self.stats_interval
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn a background task that deletes expired sessions on a fixed cadence.
pub fn spawn_session_purge(
    sessions: Arc<dyn SessionStore>,
    config: MaintenanceConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let config = config.normalize();
        let purge_interval = config.purge_interval();

        loop {
            match sessions.purge_expired(Utc::now()).await {
                Ok(0) => debug!("no expired sessions to purge"),
                Ok(removed) => info!(removed, "purged expired sessions"),
                Err(err) => error!("session purge failed: {err}"),
            }

            sleep(purge_interval).await;
        }
    })
}

/// Spawn a background task that logs audit-log counts per action over the
/// last stats interval.
pub fn spawn_security_stats(
    pool: PgPool,
    config: MaintenanceConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let config = config.normalize();
        let stats_interval = config.stats_interval();
        let window = format!("{} seconds", stats_interval.as_secs());

        loop {
            if let Err(err) = log_security_stats(&pool, &window).await {
                error!("security stats failed: {err}");
            }

            sleep(stats_interval).await;
        }
    })
}

async fn log_security_stats(pool: &PgPool, window: &str) -> anyhow::Result<()> {
    let query = r"
        SELECT action, COUNT(*) AS total
        FROM audit_log
        WHERE created_at > NOW() - $1::interval
        GROUP BY action
        ORDER BY action
    ";
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(window)
        .fetch_all(pool)
        .instrument(span)
        .await?;

    if rows.is_empty() {
        debug!(window, "no audit activity in window");
        return Ok(());
    }

    for row in rows {
        let action: String = row.get("action");
        let total: i64 = row.get("total");
        info!(action, total, window, "audit activity");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, NewSession};
    use chrono::Duration as ChronoDuration;
    use uuid::Uuid;

    #[test]
    fn normalize_clamps_zero_intervals() {
        let config = MaintenanceConfig::new()
            .with_purge_interval_seconds(0)
            .with_stats_interval_seconds(0)
            .normalize();
        assert_eq!(config.purge_interval(), Duration::from_secs(1));
        assert_eq!(config.stats_interval(), Duration::from_secs(1));

        let config = MaintenanceConfig::new().normalize();
        assert_eq!(config.purge_interval(), Duration::from_secs(3600));
        assert_eq!(config.stats_interval(), Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn purge_worker_removes_expired_sessions() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let expired = store
            .create(NewSession {
                user_id: Uuid::new_v4(),
                refresh_token_hash: vec![1; 32],
                ip_address: None,
                user_agent: None,
                expires_at: now - ChronoDuration::seconds(1),
            })
            .await
            .unwrap();

        let sessions: Arc<dyn SessionStore> = store.clone();
        let handle = spawn_session_purge(sessions, MaintenanceConfig::new());

        // Paused clock: yield until the first poll has run.
        let mut purged = false;
        for _ in 0..50 {
            tokio::task::yield_now().await;
            if store.find_by_id(expired.id).await.unwrap().is_none() {
                purged = true;
                break;
            }
        }
        handle.abort();

        assert!(purged, "expired session should be purged on first poll");
    }
}
