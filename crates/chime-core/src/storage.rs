//! Durable alert storage backed by SQLite.
//!
//! The scheduler persists every alert it owns; on restart the full set is
//! reloaded and reconciled against the clock.  [`AlertStorage`] is the
//! seam; [`SqliteAlertStorage`] is the production implementation.
//!
//! Contract notes:
//! - `open` fails when no database file exists (the caller then runs
//!   `create_database`).
//! - `store` fails on a duplicate token; `modify` fails when the token is
//!   absent.  The scheduler leans on both to keep memory and disk in step.
//! - `bulk_erase` is a single transaction: all rows go or none do.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alert::{Alert, AlertState};
use crate::error::StorageError;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

const SCHEMA_VERSION: i64 = 1;

/// Persisted form of a single alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAlert {
    pub token: String,
    pub type_name: String,
    pub scheduled_time_iso8601: String,
    pub scheduled_time_unix: i64,
    pub state: AlertState,
}

impl From<&Alert> for StoredAlert {
    fn from(alert: &Alert) -> Self {
        Self {
            token: alert.token().to_string(),
            type_name: alert.type_name().to_string(),
            scheduled_time_iso8601: alert.scheduled_time_iso8601(),
            scheduled_time_unix: alert.scheduled_time_unix(),
            state: alert.state(),
        }
    }
}

/// Durable CRUD for serialized alerts.
///
/// All operations are effectively synchronous; the scheduler may call them
/// while holding its own mutex.
pub trait AlertStorage: Send + Sync {
    /// Attach to an existing backing store.
    fn open(&self) -> StorageResult<()>;

    /// Create the backing store and its schema.
    fn create_database(&self) -> StorageResult<()>;

    /// Read all persisted alerts.
    fn load(&self) -> StorageResult<Vec<StoredAlert>>;

    /// Persist a new alert; fails if the token is already present.
    fn store(&self, alert: &StoredAlert) -> StorageResult<()>;

    /// Update a persisted alert; fails if the token is absent.
    fn modify(&self, alert: &StoredAlert) -> StorageResult<()>;

    /// Remove one alert.  Removing an absent token is not an error.
    fn erase(&self, token: &str) -> StorageResult<()>;

    /// Remove a batch of alerts atomically.
    fn bulk_erase(&self, tokens: &[String]) -> StorageResult<()>;

    /// Remove every alert.
    fn clear_database(&self) -> StorageResult<()>;
}

/// SQLite-backed [`AlertStorage`].
pub struct SqliteAlertStorage {
    db_path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

impl SqliteAlertStorage {
    #[must_use]
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            conn: Mutex::new(None),
        }
    }

    fn lock_conn(&self) -> MutexGuard<'_, Option<Connection>> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> StorageResult<T>) -> StorageResult<T> {
        let guard = self.lock_conn();
        let conn = guard.as_ref().ok_or(StorageError::NotOpen)?;
        f(conn)
    }

    fn attach(&self) -> StorageResult<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;
        Ok(conn)
    }

    fn row_to_alert(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String, i64, String)> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
        ))
    }
}

impl AlertStorage for SqliteAlertStorage {
    fn open(&self) -> StorageResult<()> {
        if !self.db_path.exists() {
            return Err(StorageError::NotFound {
                path: self.db_path.display().to_string(),
            });
        }
        let conn = self.attach()?;

        // Reject stores created by a future schema we do not understand.
        let version: i64 = conn.query_row("SELECT version FROM schema_version", [], |row| {
            row.get(0)
        })?;
        if version > SCHEMA_VERSION {
            return Err(StorageError::Database(format!(
                "schema version {version} is newer than supported {SCHEMA_VERSION}"
            )));
        }

        debug!(path = %self.db_path.display(), version, "alert database opened");
        *self.lock_conn() = Some(conn);
        Ok(())
    }

    fn create_database(&self) -> StorageResult<()> {
        let conn = self.attach()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS alerts (
                token TEXT PRIMARY KEY,
                type_name TEXT NOT NULL,
                scheduled_time_iso8601 TEXT NOT NULL,
                scheduled_time_unix INTEGER NOT NULL,
                state TEXT NOT NULL
            );",
        )?;
        let rows: i64 = conn.query_row("SELECT COUNT(*) FROM schema_version", [], |row| {
            row.get(0)
        })?;
        if rows == 0 {
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )?;
        }

        debug!(path = %self.db_path.display(), "alert database created");
        *self.lock_conn() = Some(conn);
        Ok(())
    }

    fn load(&self) -> StorageResult<Vec<StoredAlert>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT token, type_name, scheduled_time_iso8601, scheduled_time_unix, state
                 FROM alerts
                 ORDER BY scheduled_time_unix ASC, token ASC",
            )?;
            let rows = stmt
                .query_map([], Self::row_to_alert)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut alerts = Vec::with_capacity(rows.len());
            for (token, type_name, iso, unix, state) in rows {
                let state = AlertState::from_str(&state).map_err(|reason| {
                    StorageError::CorruptRow {
                        token: token.clone(),
                        reason,
                    }
                })?;
                alerts.push(StoredAlert {
                    token,
                    type_name,
                    scheduled_time_iso8601: iso,
                    scheduled_time_unix: unix,
                    state,
                });
            }
            Ok(alerts)
        })
    }

    fn store(&self, alert: &StoredAlert) -> StorageResult<()> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO alerts
                 (token, type_name, scheduled_time_iso8601, scheduled_time_unix, state)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    alert.token,
                    alert.type_name,
                    alert.scheduled_time_iso8601,
                    alert.scheduled_time_unix,
                    alert.state.as_str(),
                ],
            );
            match inserted {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Err(StorageError::DuplicateToken {
                        token: alert.token.clone(),
                    })
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    fn modify(&self, alert: &StoredAlert) -> StorageResult<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE alerts
                 SET type_name = ?2,
                     scheduled_time_iso8601 = ?3,
                     scheduled_time_unix = ?4,
                     state = ?5
                 WHERE token = ?1",
                params![
                    alert.token,
                    alert.type_name,
                    alert.scheduled_time_iso8601,
                    alert.scheduled_time_unix,
                    alert.state.as_str(),
                ],
            )?;
            if changed == 0 {
                return Err(StorageError::MissingToken {
                    token: alert.token.clone(),
                });
            }
            Ok(())
        })
    }

    fn erase(&self, token: &str) -> StorageResult<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM alerts WHERE token = ?1", params![token])?;
            Ok(())
        })
    }

    fn bulk_erase(&self, tokens: &[String]) -> StorageResult<()> {
        if tokens.is_empty() {
            return Ok(());
        }
        let mut guard = self.lock_conn();
        let conn = guard.as_mut().ok_or(StorageError::NotOpen)?;
        let tx = conn.transaction().map_err(StorageError::from)?;
        for token in tokens {
            tx.execute("DELETE FROM alerts WHERE token = ?1", params![token])
                .map_err(StorageError::from)?;
        }
        tx.commit().map_err(StorageError::from)?;
        Ok(())
    }

    fn clear_database(&self) -> StorageResult<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM alerts", [])?;
            Ok(())
        })
    }
}
