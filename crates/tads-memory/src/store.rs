use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use rusqlite::Connection;
use tads_models::{MemoryRecord, RunTrace};
use tracing::debug;
use uuid::Uuid;

use crate::error::MemoryError;
use crate::hot::HotCache;
use crate::schema::MEMORY_TABLE_DDL;

/// How many recent lessons per symbol the hot cache holds. Callers recall
/// at most this many in one lookup.
pub const RECALL_WINDOW: usize = 32;

/// Append-only store of run traces and memory records.
///
/// Reads are concurrent (WAL journal, immutable rows); writes are
/// serialized behind the connection mutex so concurrent reflection calls
/// cannot interleave partial records. Recall goes through a moka hot cache
/// that is invalidated per symbol on append.
pub struct MemoryStore {
    conn: Mutex<Connection>,
    hot: HotCache,
}

impl MemoryStore {
    /// Open (or create) the store at `path`. Enables WAL mode.
    pub fn open(path: &str, hot_capacity: u64, hot_ttl: Duration) -> Result<Self, MemoryError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(MEMORY_TABLE_DDL)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Mutex::new(conn),
            hot: HotCache::new(hot_capacity, hot_ttl),
        })
    }

    /// In-memory store for testing.
    pub fn open_in_memory() -> Result<Self, MemoryError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(MEMORY_TABLE_DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
            hot: HotCache::new(64, Duration::from_secs(60)),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, MemoryError> {
        self.conn
            .lock()
            .map_err(|e| MemoryError::Unavailable(format!("store mutex poisoned: {e}")))
    }

    /// Append a completed run trace. Traces are never replaced; a second
    /// append with the same run id is an error.
    pub fn append_trace(&self, trace: &RunTrace) -> Result<(), MemoryError> {
        let json = serde_json::to_string(trace)?;
        let conn = self.lock()?;
        let result = conn.execute(
            "INSERT INTO run_traces (run_id, symbol, as_of_date, trace_json, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                trace.run_id.to_string(),
                trace.query.symbol,
                trace.query.as_of_date.to_string(),
                json,
                Utc::now().to_rfc3339(),
            ],
        );
        match result {
            Ok(_) => {
                debug!(run_id = %trace.run_id, symbol = %trace.query.symbol, "Trace stored");
                Ok(())
            }
            Err(e) if is_constraint_violation(&e) => Err(MemoryError::DuplicateTrace(trace.run_id)),
            Err(e) => Err(MemoryError::Sqlite(e)),
        }
    }

    /// Look up a run trace by its explicit identifier.
    pub fn get_trace(&self, run_id: Uuid) -> Result<Option<RunTrace>, MemoryError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare_cached("SELECT trace_json FROM run_traces WHERE run_id = ?1")?;
        let result = stmt.query_row(rusqlite::params![run_id.to_string()], |row| {
            row.get::<_, String>(0)
        });
        match result {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(MemoryError::Sqlite(e)),
        }
    }

    /// The most recently stored run id, if any. Provided so callers can
    /// reflect on "the latest decision" by explicit id, not by implication.
    pub fn latest_run_id(&self) -> Result<Option<Uuid>, MemoryError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT run_id FROM run_traces ORDER BY created_at DESC, rowid DESC LIMIT 1",
        )?;
        let result = stmt.query_row([], |row| row.get::<_, String>(0));
        match result {
            Ok(raw) => Uuid::parse_str(&raw)
                .map(Some)
                .map_err(|e| MemoryError::Corrupt(format!("run_id {raw}: {e}"))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(MemoryError::Sqlite(e)),
        }
    }

    /// Append one memory record and invalidate the symbol's recall entry.
    /// Records are never overwritten.
    pub async fn append_record(&self, record: &MemoryRecord) -> Result<(), MemoryError> {
        let json = serde_json::to_string(record)?;
        {
            let conn = self.lock()?;
            let result = conn.execute(
                "INSERT INTO memory_records \
                 (id, run_id, symbol, realized_return, record_json, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    record.id.to_string(),
                    record.run_id.to_string(),
                    record.query.symbol,
                    record.realized_return.to_string(),
                    json,
                    record.created_at.to_rfc3339(),
                ],
            );
            match result {
                Ok(_) => {}
                Err(e) if is_constraint_violation(&e) => {
                    return Err(MemoryError::DuplicateRecord(record.id))
                }
                Err(e) => return Err(MemoryError::Sqlite(e)),
            }
        }
        self.hot.invalidate(&record.query.symbol).await;
        debug!(id = %record.id, symbol = %record.query.symbol, "Memory record appended");
        Ok(())
    }

    /// Most recent lessons for a symbol, newest first, at most
    /// `min(limit, RECALL_WINDOW)`. Read-through: misses are promoted to
    /// the hot cache.
    pub async fn recall(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<MemoryRecord>, MemoryError> {
        let limit = limit.min(RECALL_WINDOW);

        if let Some(cached) = self.hot.get(symbol).await {
            let mut records: Vec<MemoryRecord> = serde_json::from_str(&cached)?;
            records.truncate(limit);
            return Ok(records);
        }

        let records = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare_cached(
                "SELECT record_json FROM memory_records WHERE symbol = ?1 \
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![symbol, RECALL_WINDOW as i64], |row| {
                    row.get::<_, String>(0)
                })?
                .collect::<Result<Vec<String>, _>>()?;
            rows.iter()
                .map(|json| serde_json::from_str::<MemoryRecord>(json))
                .collect::<Result<Vec<_>, _>>()?
        };

        self.hot
            .insert(symbol.to_string(), serde_json::to_string(&records)?)
            .await;

        let mut out = records;
        out.truncate(limit);
        Ok(out)
    }

    pub fn record_count(&self) -> Result<usize, MemoryError> {
        let conn = self.lock()?;
        let count: usize =
            conn.query_row("SELECT COUNT(*) FROM memory_records", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn trace_count(&self) -> Result<usize, MemoryError> {
        let conn = self.lock()?;
        let count: usize =
            conn.query_row("SELECT COUNT(*) FROM run_traces", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
