//! Durable store for cached responses
//!
//! Provides a `Store` that maps opaque byte keys to opaque byte values inside
//! a single bucket of an embedded SQLite database. Every operation runs in its
//! own transaction: reads on pooled reader connections (snapshot isolation
//! under WAL), writes as `IMMEDIATE` transactions on the writer connection.
//! All calls block on disk I/O; async callers run them on `spawn_blocking`.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::{Error, Result};

/// How long a transaction waits on a competing lock before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Reader connections kept open between lookups
const MAX_IDLE_READERS: usize = 8;

const CREATE_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS entries (
    bucket TEXT NOT NULL,
    key BLOB NOT NULL,
    value BLOB NOT NULL,
    PRIMARY KEY (bucket, key)
) WITHOUT ROWID";

/// Transactional byte store shared by all callers of a caching transport
///
/// The store allows exactly one write transaction at a time. Each reader
/// borrows its own connection, so readers run concurrently with each other
/// and with the writer, and see the last committed state.
#[derive(Debug)]
pub struct Store {
    config: StoreConfig,
    writer: Mutex<Connection>,
    readers: Mutex<Vec<Connection>>,
}

impl Store {
    /// Opens the store described by `config`, creating the directory, the
    /// database file and its schema if they are absent
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let path = config.path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| Error::Prepare {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        create_private(path)?;
        let writer = connect(path).map_err(|source| open_error(path, source))?;
        writer
            .execute_batch(CREATE_SCHEMA)
            .map_err(|source| open_error(path, source))?;
        let reader = connect(path).map_err(|source| open_error(path, source))?;
        for file in [path.to_path_buf(), sidecar(path, "-wal"), sidecar(path, "-shm")] {
            if file.exists() {
                restrict_permissions(&file)?;
            }
        }

        debug!(path = %path.display(), bucket = %config.bucket, "opened cache store");

        Ok(Self {
            config: config.clone(),
            writer: Mutex::new(writer),
            readers: Mutex::new(vec![reader]),
        })
    }

    /// Opens a store at `path` using the default bucket
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(&StoreConfig::at(path.as_ref()))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Reads the value stored under `key`
    ///
    /// Returns `Ok(None)` when the key is absent; that is a miss, not an error.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.with_reader(|conn| {
            let tx = conn.transaction()?;
            let value = tx
                .query_row(
                    "SELECT value FROM entries WHERE bucket = ?1 AND key = ?2",
                    params![self.config.bucket, key],
                    |row| row.get::<_, Vec<u8>>(0),
                )
                .optional()?;
            tx.commit()?;
            Ok(value)
        })
    }

    /// Writes `value` under `key`, replacing any previous value
    ///
    /// Either the whole entry is committed or the transaction rolls back.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut conn = lock(&self.writer);
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Error::StoreWrite)?;
        tx.execute(
            "INSERT INTO entries (bucket, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT (bucket, key) DO UPDATE SET value = excluded.value",
            params![self.config.bucket, key, value],
        )
        .map_err(Error::StoreWrite)?;
        tx.commit().map_err(Error::StoreWrite)
    }

    /// Counts the entries in this store's bucket
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self.with_reader(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM entries WHERE bucket = ?1",
                params![self.config.bucket],
                |row| row.get(0),
            )
        })?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Deletes every entry in this store's bucket, returning how many were removed
    pub fn purge(&self) -> Result<usize> {
        let mut conn = lock(&self.writer);
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(Error::StoreWrite)?;
        let removed = tx
            .execute(
                "DELETE FROM entries WHERE bucket = ?1",
                params![self.config.bucket],
            )
            .map_err(Error::StoreWrite)?;
        tx.commit().map_err(Error::StoreWrite)?;
        debug!(removed, bucket = %self.config.bucket, "purged cache bucket");
        Ok(removed)
    }

    /// Closes every connection, flushing the write-ahead log
    ///
    /// Dropping the store also closes it, but silently.
    pub fn close(self) -> Result<()> {
        let readers = self.readers.into_inner().unwrap_or_else(PoisonError::into_inner);
        let writer = self.writer.into_inner().unwrap_or_else(PoisonError::into_inner);
        for reader in readers {
            reader.close().map_err(|(_, source)| Error::StoreRead(source))?;
        }
        writer.close().map_err(|(_, source)| Error::StoreWrite(source))
    }

    /// Runs `read` on an idle reader connection, opening one if none is idle
    fn with_reader<T, F>(&self, read: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> rusqlite::Result<T>,
    {
        let idle = lock(&self.readers).pop();
        let mut conn = match idle {
            Some(conn) => conn,
            None => connect(self.config.path()).map_err(Error::StoreRead)?,
        };
        let result = read(&mut conn).map_err(Error::StoreRead);

        let mut readers = lock(&self.readers);
        if readers.len() < MAX_IDLE_READERS {
            readers.push(conn);
        }
        result
    }
}

fn connect(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Creates the database file owner-only before SQLite opens it; SQLite gives
/// its `-wal` and `-shm` files the same mode as the database
#[cfg(unix)]
fn create_private(path: &Path) -> Result<()> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .mode(0o600)
        .open(path)
        .map(drop)
        .map_err(|source| Error::Prepare {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(not(unix))]
fn create_private(_path: &Path) -> Result<()> {
    Ok(())
}

fn open_error(path: &Path, source: rusqlite::Error) -> Error {
    Error::Open {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|source| {
        Error::Prepare {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

// A panicked holder cannot leave a transaction open: it rolls back on drop.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
