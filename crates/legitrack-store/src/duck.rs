//! DuckDB connection handling and table counts.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use duckdb::Connection;
use tracing::info;

use crate::{StoreError, schema};

/// DuckDB store for mirrored Chamber data and local accounts.
///
/// Supports both in-memory (ephemeral) and persistent (file-backed) modes.
/// Use [`open`](Self::open) for in-memory and [`open_persistent`](Self::open_persistent)
/// for file-backed storage that survives across process restarts. Both apply
/// the schema on open.
///
/// A DuckDB file accepts a single writing process, so the HTTP API and the
/// sync worker share one store through [`SharedStore`].
pub struct DuckStore {
    pub(crate) conn: Connection,
}

/// A store shared between the HTTP handlers and the sync worker.
///
/// Hold the lock only for the duration of a store call, never across an `.await`.
pub type SharedStore = Arc<Mutex<DuckStore>>;

/// Wrap a store for sharing.
pub fn shared(store: DuckStore) -> SharedStore {
    Arc::new(Mutex::new(store))
}

/// Lock a shared store.
pub fn lock(store: &SharedStore) -> Result<MutexGuard<'_, DuckStore>, StoreError> {
    store.lock().map_err(|_| StoreError::Poisoned)
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self::init(conn)?;
        info!(
            path = %path.display(),
            bills = store.bill_count()?,
            tracking = store.tracking_count()?,
            "opened store"
        );
        Ok(store)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        schema::apply(&conn)?;
        Ok(Self { conn })
    }

    /// Round-trip a trivial query. Used as a readiness probe.
    pub fn ping(&self) -> Result<(), StoreError> {
        self.conn.query_row("SELECT 1", [], |row| row.get::<_, i32>(0))?;
        Ok(())
    }

    // ── Counts ──

    /// Number of rows in `camara.tb_projeto`.
    pub fn bill_count(&self) -> Result<usize, StoreError> {
        self.count_table("camara.tb_projeto")
    }

    /// Number of rows in `camara.rl_tramitacoes`.
    pub fn tracking_count(&self) -> Result<usize, StoreError> {
        self.count_table("camara.rl_tramitacoes")
    }

    pub(crate) fn count_table(&self, table: &str) -> Result<usize, StoreError> {
        let sql = format!("SELECT count(*)::BIGINT AS cnt FROM {table}");
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Map "no rows" to `None`.
pub(crate) fn optional<T>(result: duckdb::Result<T>) -> duckdb::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}
