//! The `EntryStore` trait and an in-process cookie jar.
//!
//! An entry store is a flat, size-limited key/value medium shared with other
//! tenants, in the shape of a browser cookie jar. Values are opaque strings;
//! encoding is the caller's business. Backends live in other crates (e.g.
//! `hosut-store-sqlite`); [`MemoryJar`] lives here so the layers above can be
//! exercised without one.

use std::{
  collections::BTreeMap,
  future::Future,
  sync::{Arc, Mutex},
};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::clock::Clock;

/// Browsers cap a cookie at 4096 bytes of `name=value`.
pub const DEFAULT_MAX_ENTRY_LEN: usize = 4096;

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a cookie-like entry store.
///
/// Expired entries are invisible to both reads. Every `set` refreshes the
/// entry's expiry to `now + ttl`. A backend may reject a write (disabled
/// medium, oversized entry); callers decide whether that matters.
pub trait EntryStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Raw value stored under `name`, or `None` when absent or expired.
  fn get<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Write `value` under `name`, expiring `ttl` from now.
  fn set<'a>(
    &'a self,
    name: &'a str,
    value: &'a str,
    ttl: Duration,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Every live entry, including ones this crate did not write.
  fn list_entries(
    &self,
  ) -> impl Future<Output = Result<Vec<(String, String)>, Self::Error>> + Send + '_;
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum JarError {
  #[error("cookie storage is disabled")]
  Disabled,

  #[error("entry {name:?} is {len} bytes, over the {max} byte limit")]
  EntryTooLarge { name: String, len: usize, max: usize },

  #[error("cookie jar lock poisoned")]
  Poisoned,
}

// ─── MemoryJar ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Cookie {
  value:      String,
  expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct JarState {
  cookies:  BTreeMap<String, Cookie>,
  disabled: bool,
}

/// An in-memory cookie jar with a per-entry size ceiling.
///
/// Cloning is cheap and clones share the same cookies, the way every script
/// on a page sees the same `document.cookie`.
#[derive(Debug, Clone)]
pub struct MemoryJar {
  state:         Arc<Mutex<JarState>>,
  clock:         Clock,
  max_entry_len: usize,
}

impl Default for MemoryJar {
  fn default() -> Self { Self::new() }
}

impl MemoryJar {
  pub fn new() -> Self {
    Self {
      state:         Arc::new(Mutex::new(JarState::default())),
      clock:         Clock::System,
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

  /// Seed the jar from a `document.cookie`-style header (`a=1; b=2`).
  ///
  /// Seeded cookies never expire. Pieces without `=` are ignored.
  pub fn with_header(self, header: &str) -> Self {
    if let Ok(mut state) = self.state.lock() {
      for (name, value) in parse_header(header) {
        state.cookies.insert(name, Cookie {
          value,
          expires_at: DateTime::<Utc>::MAX_UTC,
        });
      }
    }
    self
  }

  /// Turn writes into rejections, as when the user blocks cookies.
  pub fn set_enabled(&self, enabled: bool) {
    if let Ok(mut state) = self.state.lock() {
      state.disabled = !enabled;
    }
  }

  /// Move a fixed clock forward; used to observe expiry.
  pub fn advance_clock(&mut self, delta: Duration) { self.clock.advance(delta); }

  /// Render the live cookies the way `document.cookie` does.
  pub fn header(&self) -> String {
    self
      .live()
      .map(|entries| {
        entries
          .into_iter()
          .map(|(name, value)| format!("{name}={value}"))
          .collect::<Vec<_>>()
          .join("; ")
      })
      .unwrap_or_default()
  }

  fn live(&self) -> Result<Vec<(String, String)>, JarError> {
    let now = self.clock.now();
    let state = self.state.lock().map_err(|_| JarError::Poisoned)?;
    Ok(
      state
        .cookies
        .iter()
        .filter(|(_, c)| c.expires_at > now)
        .map(|(name, c)| (name.clone(), c.value.clone()))
        .collect(),
    )
  }
}

impl EntryStore for MemoryJar {
  type Error = JarError;

  async fn get(&self, name: &str) -> Result<Option<String>, JarError> {
    let now = self.clock.now();
    let state = self.state.lock().map_err(|_| JarError::Poisoned)?;
    Ok(
      state
        .cookies
        .get(name)
        .filter(|c| c.expires_at > now)
        .map(|c| c.value.clone()),
    )
  }

  async fn set(&self, name: &str, value: &str, ttl: Duration) -> Result<(), JarError> {
    let mut state = self.state.lock().map_err(|_| JarError::Poisoned)?;
    if state.disabled {
      return Err(JarError::Disabled);
    }
    let len = name.len() + 1 + value.len();
    if len > self.max_entry_len {
      return Err(JarError::EntryTooLarge {
        name: name.to_owned(),
        len,
        max: self.max_entry_len,
      });
    }
    state.cookies.insert(name.to_owned(), Cookie {
      value:      value.to_owned(),
      expires_at: expiry(self.clock.now(), ttl),
    });
    Ok(())
  }

  async fn list_entries(&self) -> Result<Vec<(String, String)>, JarError> { self.live() }
}

/// `now + ttl`, saturating at the end of representable time.
pub fn expiry(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
  now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Split a cookie header into `(name, value)` pairs.
///
/// Each piece is trimmed and split on its first `=`, so values may contain
/// further `=` characters.
pub fn parse_header(header: &str) -> Vec<(String, String)> {
  header
    .split(';')
    .filter_map(|piece| {
      let (name, value) = piece.trim().split_once('=')?;
      (!name.is_empty()).then(|| (name.to_owned(), value.to_owned()))
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::clock::test_now;

  fn jar() -> MemoryJar { MemoryJar::new().with_clock(Clock::fixed(test_now())) }

  #[tokio::test]
  async fn huge_ttl_saturates_instead_of_overflowing() {
    let j = jar();
    j.set("a", "1", Duration::MAX).await.unwrap();
    assert_eq!(j.get("a").await.unwrap().as_deref(), Some("1"));
    assert_eq!(expiry(test_now(), Duration::MAX), DateTime::<Utc>::MAX_UTC);
  }

  #[tokio::test]
  async fn set_then_get() {
    let j = jar();
    j.set("a", "1", Duration::days(1)).await.unwrap();
    assert_eq!(j.get("a").await.unwrap().as_deref(), Some("1"));
    assert_eq!(j.get("b").await.unwrap(), None);
  }

  #[tokio::test]
  async fn entries_expire() {
    let mut j = jar();
    j.set("a", "1", Duration::days(1)).await.unwrap();
    j.advance_clock(Duration::days(2));
    assert_eq!(j.get("a").await.unwrap(), None);
    assert!(j.list_entries().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn rewrite_refreshes_expiry() {
    let mut j = jar();
    j.set("a", "1", Duration::days(2)).await.unwrap();
    j.advance_clock(Duration::days(1));
    j.set("a", "2", Duration::days(2)).await.unwrap();
    j.advance_clock(Duration::days(2) - Duration::hours(1));
    assert_eq!(j.get("a").await.unwrap().as_deref(), Some("2"));
  }

  #[tokio::test]
  async fn oversized_entry_is_rejected() {
    let j = jar().with_max_entry_len(8);
    let err = j.set("name", "12345", Duration::days(1)).await.unwrap_err();
    assert!(matches!(err, JarError::EntryTooLarge { len: 10, max: 8, .. }));
    assert_eq!(j.get("name").await.unwrap(), None);
  }

  #[tokio::test]
  async fn disabled_jar_rejects_writes() {
    let j = jar();
    j.set_enabled(false);
    assert!(matches!(j.set("a", "1", Duration::days(1)).await, Err(JarError::Disabled)));
  }

  #[tokio::test]
  async fn header_seed_and_render() {
    let j = jar().with_header("theme=dark; session=a=b;bogus; ");
    assert_eq!(j.get("session").await.unwrap().as_deref(), Some("a=b"));
    assert_eq!(j.header(), "session=a=b; theme=dark");
  }

  #[tokio::test]
  async fn clones_share_state() {
    let j = jar();
    let other = j.clone();
    other.set("a", "1", Duration::days(1)).await.unwrap();
    assert_eq!(j.get("a").await.unwrap().as_deref(), Some("1"));
  }
}
