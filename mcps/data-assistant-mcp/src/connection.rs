//! Connection manager
//!
//! Owns at most one open [`Session`]. The session is handed out as an
//! `Arc<dyn Session>` so the dispatcher can hold it without the manager
//! losing the ability to release it at shutdown.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::DatabaseConfig;
use crate::error::ConnectionError;
use crate::session::{PostgresSession, Session, SqliteSession};

#[derive(Default)]
pub struct ConnectionManager {
    session: Mutex<Option<Arc<dyn Session>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for `config`, releasing any session opened earlier.
    ///
    /// No retries: an unreachable database or bad credentials fail straight
    /// away with [`ConnectionError`].
    pub async fn connect(
        &self,
        config: &DatabaseConfig,
    ) -> Result<Arc<dyn Session>, ConnectionError> {
        self.close().await;

        let target = config.target();
        tracing::info!(%target, "Connecting to database");

        let opened: Result<Arc<dyn Session>, _> = match config {
            DatabaseConfig::Postgres(pg) => PostgresSession::connect(pg)
                .await
                .map(|s| Arc::new(s) as Arc<dyn Session>),
            DatabaseConfig::Sqlite(sqlite) => {
                SqliteSession::open(sqlite).map(|s| Arc::new(s) as Arc<dyn Session>)
            }
        };

        let session = opened.map_err(|source| {
            tracing::error!(%target, error = %source, "Database connection failed");
            ConnectionError { target, source }
        })?;

        tracing::info!(backend = session.backend(), "Connected to database");
        *self.session.lock().await = Some(Arc::clone(&session));
        Ok(session)
    }

    /// Adopt an already open session
    pub async fn attach(&self, session: Arc<dyn Session>) {
        self.close().await;
        *self.session.lock().await = Some(session);
    }

    /// The currently open session, if any
    pub async fn session(&self) -> Option<Arc<dyn Session>> {
        self.session.lock().await.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Release the session. Without an open session this does nothing.
    pub async fn close(&self) {
        let Some(session) = self.session.lock().await.take() else {
            return;
        };

        match session.close().await {
            Ok(()) => tracing::info!(backend = session.backend(), "Database connection closed"),
            Err(e) => tracing::warn!(
                backend = session.backend(),
                error = %e,
                "Failed to close database connection cleanly"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SqliteConfig;

    fn sqlite_config(path: std::path::PathBuf, read_only: bool) -> DatabaseConfig {
        DatabaseConfig::Sqlite(SqliteConfig {
            path,
            read_only,
            timeout_secs: 5,
        })
    }

    #[tokio::test]
    async fn test_connect_and_close() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConnectionManager::new();

        let session = manager
            .connect(&sqlite_config(dir.path().join("shop.db"), false))
            .await
            .unwrap();
        assert_eq!(session.backend(), "sqlite");
        assert!(manager.is_connected().await);

        manager.close().await;
        assert!(!manager.is_connected().await);

        // The dispatcher's handle sees the release too
        assert!(session.fetch_rows("SELECT 1").await.is_err());
    }

    #[tokio::test]
    async fn test_failed_connect_then_close_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConnectionManager::new();

        let err = manager
            .connect(&sqlite_config(dir.path().join("absent.db"), true))
            .await
            .err()
            .expect("read-only open of a missing file must fail");
        assert!(err.target.starts_with("sqlite://"));
        assert!(!manager.is_connected().await);

        manager.close().await;
        manager.close().await;
    }

    #[tokio::test]
    async fn test_close_without_connect_is_noop() {
        let manager = ConnectionManager::new();
        manager.close().await;
        assert!(manager.session().await.is_none());
    }

    #[tokio::test]
    async fn test_reconnect_releases_previous_session() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConnectionManager::new();
        let config = sqlite_config(dir.path().join("shop.db"), false);

        let first = manager.connect(&config).await.unwrap();
        let second = manager.connect(&config).await.unwrap();

        assert!(first.fetch_rows("SELECT 1").await.is_err());
        assert!(second.fetch_rows("SELECT 1").await.is_ok());
        manager.close().await;
    }
}
