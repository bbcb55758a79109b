/// The memory store schema. Both tables are append-only: rows are inserted
/// by exactly one writer path and never updated or deleted in normal
/// operation.
///
/// ```sql
/// CREATE TABLE IF NOT EXISTS run_traces (
///     run_id      TEXT PRIMARY KEY,
///     symbol      TEXT NOT NULL,
///     as_of_date  TEXT NOT NULL,
///     trace_json  TEXT NOT NULL,
///     created_at  TEXT NOT NULL
/// );
///
/// CREATE TABLE IF NOT EXISTS memory_records (
///     id              TEXT PRIMARY KEY,
///     run_id          TEXT NOT NULL,
///     symbol          TEXT NOT NULL,
///     realized_return TEXT NOT NULL,
///     record_json     TEXT NOT NULL,
///     created_at      TEXT NOT NULL
/// );
/// ```
pub const MEMORY_TABLE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS run_traces (
    run_id      TEXT PRIMARY KEY,
    symbol      TEXT NOT NULL,
    as_of_date  TEXT NOT NULL,
    trace_json  TEXT NOT NULL,
    created_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_traces_symbol ON run_traces(symbol);
CREATE INDEX IF NOT EXISTS idx_traces_created ON run_traces(created_at);
CREATE TABLE IF NOT EXISTS memory_records (
    id              TEXT PRIMARY KEY,
    run_id          TEXT NOT NULL,
    symbol          TEXT NOT NULL,
    realized_return TEXT NOT NULL,
    record_json     TEXT NOT NULL,
    created_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_records_symbol ON memory_records(symbol, created_at);
CREATE INDEX IF NOT EXISTS idx_records_run ON memory_records(run_id);
";
