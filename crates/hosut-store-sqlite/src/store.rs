//! [`SqliteJar`] — the SQLite implementation of [`EntryStore`].

use std::path::Path;

use chrono::Duration;
use rusqlite::OptionalExtension as _;

use hosut_core::{
  clock::Clock,
  store::{DEFAULT_MAX_ENTRY_LEN, EntryStore, expiry},
};

use crate::{Error, Result, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A persistent cookie jar backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteJar {
  conn:          tokio_rusqlite::Connection,
  clock:         Clock,
  max_entry_len: usize,
}

impl SqliteJar {
  /// Open (or create) a jar at `path`, run schema initialisation and drop
  /// entries that expired while nobody was looking.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let jar = Self::from_conn(conn);
    jar.init_schema().await?;
    let purged = jar.purge_expired().await?;
    if purged > 0 {
      tracing::debug!(purged, "dropped expired entries");
    }
    Ok(jar)
  }

  /// Open an in-memory jar — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let jar = Self::from_conn(conn);
    jar.init_schema().await?;
    Ok(jar)
  }

  fn from_conn(conn: tokio_rusqlite::Connection) -> Self {
    Self {
      conn,
      clock: Clock::System,
      max_entry_len: DEFAULT_MAX_ENTRY_LEN,
    }
  }

  pub fn with_clock(mut self, clock: Clock) -> Self {
    self.clock = clock;
    self
  }

  pub fn with_max_entry_len(mut self, max: usize) -> Self {
    self.max_entry_len = max;
    self
  }

  /// Move a fixed clock forward; used to observe expiry.
  pub fn advance_clock(&mut self, delta: Duration) { self.clock.advance(delta); }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  fn now_secs(&self) -> i64 { self.clock.now().timestamp() }

  /// Delete rows whose expiry has passed. Returns how many were removed.
  pub async fn purge_expired(&self) -> Result<usize> {
    let now = self.now_secs();
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM entries WHERE expires_at <= ?1",
          rusqlite::params![now],
        )?)
      })
      .await?;
    Ok(removed)
  }

  /// Delete every entry, including ones other tenants wrote.
  pub async fn clear(&self) -> Result<usize> {
    let removed = self
      .conn
      .call(|conn| Ok(conn.execute("DELETE FROM entries", [])?))
      .await?;
    Ok(removed)
  }
}

// ─── EntryStore impl ─────────────────────────────────────────────────────────

impl EntryStore for SqliteJar {
  type Error = Error;

  async fn get(&self, name: &str) -> Result<Option<String>> {
    let name = name.to_owned();
    let now = self.now_secs();
    let value: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT value FROM entries WHERE name = ?1 AND expires_at > ?2",
              rusqlite::params![name, now],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(value)
  }

  async fn set(&self, name: &str, value: &str, ttl: Duration) -> Result<()> {
    let len = name.len() + 1 + value.len();
    if len > self.max_entry_len {
      return Err(Error::EntryTooLarge {
        name: name.to_owned(),
        len,
        max: self.max_entry_len,
      });
    }

    let name = name.to_owned();
    let value = value.to_owned();
    let now = self.clock.now();
    let updated_at = now.timestamp();
    let expires_at = expiry(now, ttl).timestamp();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO entries (name, value, expires_at, updated_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT(name) DO UPDATE SET
             value      = excluded.value,
             expires_at = excluded.expires_at,
             updated_at = excluded.updated_at",
          rusqlite::params![name, value, expires_at, updated_at],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_entries(&self) -> Result<Vec<(String, String)>> {
    let now = self.now_secs();
    let entries = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT name, value FROM entries WHERE expires_at > ?1 ORDER BY name",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![now], |r| Ok((r.get(0)?, r.get(1)?)))?
          .collect::<rusqlite::Result<Vec<(String, String)>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(entries)
  }
}
