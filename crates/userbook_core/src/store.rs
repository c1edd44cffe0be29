//! Explicitly owned handle to the user record store.
//!
//! # Responsibility
//! - Own the single SQLite connection for the application lifetime.
//! - Lend a `UserService` to callers on any thread.
//! - Provide an explicit shutdown step.
//!
//! # Invariants
//! - The handle is created by the host at startup; there is no implicit
//!   global instance.
//! - Access to the connection is serialized by one mutex.
//! - After `close()` every call fails with `StoreError::Closed`.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::repo::user_repo::{RepoError, RepoResult, SqliteUserRepository};
use crate::service::user_service::UserService;
use log::{error, info};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub type StoreResult<T> = Result<T, StoreError>;

/// Service type lent out by [`UserStore::with_service`].
pub type SqliteUserService<'conn> = UserService<SqliteUserRepository<'conn>>;

#[derive(Debug)]
pub enum StoreError {
    Closed,
    Poisoned,
    Db(DbError),
    Repo(RepoError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "user store is closed"),
            Self::Poisoned => write!(f, "user store lock is poisoned"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Closed | Self::Poisoned => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Thread-safe owner of the user store connection.
#[derive(Debug)]
pub struct UserStore {
    path: Option<PathBuf>,
    conn: Mutex<Option<Connection>>,
}

impl UserStore {
    /// Opens (or creates) the store file at `path` with migrations applied.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = open_db(&path)?;
        Ok(Self {
            path: Some(path),
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Opens an ephemeral store that disappears on close.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = open_db_in_memory()?;
        Ok(Self {
            path: None,
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Backing file path, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.conn.lock().is_ok_and(|conn| conn.is_some())
    }

    /// Runs `f` with a service bound to the store connection.
    ///
    /// The connection lock is held for the duration of `f`, so every call is
    /// atomic with respect to other callers of this handle.
    pub fn with_service<T>(
        &self,
        f: impl FnOnce(&SqliteUserService<'_>) -> RepoResult<T>,
    ) -> StoreResult<T> {
        let guard = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;
        let service = UserService::new(SqliteUserRepository::try_new(conn)?);
        Ok(f(&service)?)
    }

    /// Closes the underlying connection.
    ///
    /// Closing an already closed store is a no-op. When SQLite refuses to
    /// close, the connection stays usable and the error is returned.
    pub fn close(&self) -> StoreResult<()> {
        let mut guard = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let Some(conn) = guard.take() else {
            return Ok(());
        };

        match conn.close() {
            Ok(()) => {
                info!(
                    "event=store_close module=store status=ok mode={}",
                    self.mode_label()
                );
                Ok(())
            }
            Err((conn, err)) => {
                error!(
                    "event=store_close module=store status=error mode={} error={}",
                    self.mode_label(),
                    err
                );
                *guard = Some(conn);
                Err(err.into())
            }
        }
    }

    fn mode_label(&self) -> &'static str {
        if self.path.is_some() {
            "file"
        } else {
            "memory"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{StoreError, UserStore};

    #[test]
    fn store_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<UserStore>();
    }

    #[test]
    fn close_is_idempotent_and_blocks_further_calls() {
        let store = UserStore::open_in_memory().unwrap();
        assert!(store.is_open());
        assert!(store.path().is_none());

        store.close().unwrap();
        store.close().unwrap();
        assert!(!store.is_open());

        let err = store.with_service(|service| service.list_users()).unwrap_err();
        assert!(matches!(err, StoreError::Closed));
    }
}
