// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. The `Database` struct IS the single writer; query modules accept
//! `&Database` and call through `connection().call()`. Do NOT create
//! additional Connection instances for writes.

use std::path::Path;

use comanda_core::ComandaError;
use tokio_rusqlite::Connection;
use tracing::debug;

/// Handle to the local SQLite store.
///
/// Cloning is cheap; all clones share the same background writer thread.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (creating if needed) the database at `path` in WAL mode,
    /// applies PRAGMAs, and runs all pending migrations.
    pub async fn open(path: &str) -> Result<Self, ComandaError> {
        Self::open_with(path, true).await
    }

    /// Like [`Database::open`], but `wal_mode = false` keeps SQLite's
    /// default rollback journal instead of switching to WAL.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, ComandaError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| ComandaError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| ComandaError::Storage {
                source: Box::new(e),
            })?;

        conn.call(move |conn| -> Result<(), ComandaError> {
            let pragmas = if wal_mode {
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;"
            } else {
                "PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;"
            };
            conn.execute_batch(pragmas)
                .map_err(|e| ComandaError::Storage {
                    source: Box::new(e),
                })?;
            crate::migrations::run_migrations(conn)?;
            Ok(())
        })
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::Error(inner) => inner,
            other => ComandaError::Storage {
                source: Box::new(other),
            },
        })?;

        debug!(path, wal_mode, "local store opened");
        Ok(Self { conn })
    }

    /// Returns the underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoints the WAL ahead of shutdown. The background writer itself
    /// stops when the last clone is dropped.
    pub async fn close(&self) -> Result<(), ComandaError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("local store closed");
        Ok(())
    }
}

/// Converts a tokio-rusqlite error into the workspace storage error.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> ComandaError {
    ComandaError::Storage {
        source: Box::new(e),
    }
}
