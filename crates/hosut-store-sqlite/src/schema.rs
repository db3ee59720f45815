//! SQL schema for the hosut SQLite jar.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per cookie-style entry. Rows past expires_at are dead; reads skip
-- them and purge_expired() removes them.
CREATE TABLE IF NOT EXISTS entries (
    name        TEXT PRIMARY KEY,
    value       TEXT NOT NULL,
    expires_at  INTEGER NOT NULL,   -- unix seconds, UTC
    updated_at  INTEGER NOT NULL    -- unix seconds, UTC
);

CREATE INDEX IF NOT EXISTS entries_expires_idx ON entries(expires_at);

PRAGMA user_version = 1;
";
