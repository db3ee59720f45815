//! [`ProgressRepository`] — load and save the progress document through an
//! [`EntryStore`].
//!
//! Progress tracking is best-effort: neither `load` nor `save` ever fails.
//! Unreadable data reads as an empty document and rejected writes are
//! logged and dropped.

use chrono::Duration;
use serde::Deserialize;

use crate::{
  Error, Result,
  encode::{PrimaryEntry, StoredDocument, decode_lesson, decode_primary, shard_lesson_id},
  progress::Progress,
  store::EntryStore,
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Entry naming and size policy. Deserialisable so binaries can read it from
/// their config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
  /// Name of the primary entry; shards are `<primary_name>_l<lessonId>`.
  pub primary_name:   String,
  /// Longest serialized document, in characters, stored as a single entry.
  pub max_inline_len: usize,
  /// Lifetime granted to every entry on each write.
  pub ttl_days:       i64,
}

impl Default for RepositoryConfig {
  fn default() -> Self {
    Self {
      primary_name:   "hosut_progress".to_owned(),
      max_inline_len: 3500,
      ttl_days:       365,
    }
  }
}

/// Upper bound on `ttl_days`, about 400 years.
pub const MAX_TTL_DAYS: i64 = 146_000;

impl RepositoryConfig {
  /// Reject settings no store could honour.
  pub fn validate(&self) -> Result<()> {
    if !(1..=MAX_TTL_DAYS).contains(&self.ttl_days) {
      return Err(Error::TtlOutOfRange {
        days: self.ttl_days,
        max:  MAX_TTL_DAYS,
      });
    }
    Ok(())
  }

  /// Entry lifetime, clamped to `1..=MAX_TTL_DAYS` days.
  pub fn ttl(&self) -> Duration {
    Duration::try_days(self.ttl_days.clamp(1, MAX_TTL_DAYS)).unwrap_or_else(|| Duration::days(1))
  }
}

// ─── Repository ──────────────────────────────────────────────────────────────

pub struct ProgressRepository<S> {
  store:  S,
  config: RepositoryConfig,
}

impl<S: EntryStore> ProgressRepository<S> {
  pub fn new(store: S) -> Self { Self::with_config(store, RepositoryConfig::default()) }

  pub fn with_config(store: S, config: RepositoryConfig) -> Self { Self { store, config } }

  pub fn store(&self) -> &S { &self.store }

  pub fn config(&self) -> &RepositoryConfig { &self.config }

  /// Read the document, reassembling shards when the primary entry says so.
  pub async fn load(&self) -> Progress {
    let primary = &self.config.primary_name;
    let raw = match self.store.get(primary).await {
      Ok(Some(raw)) => raw,
      Ok(None) => return Progress::new(),
      Err(e) => {
        tracing::warn!(error = %e, "progress read failed; starting empty");
        return Progress::new();
      }
    };

    match decode_primary(&raw) {
      Ok(PrimaryEntry::Inline(progress)) => progress,
      Ok(PrimaryEntry::Sharded) => self.load_shards().await,
      Err(e) => {
        tracing::warn!(error = %e, entry = %primary, "undecodable progress; starting empty");
        Progress::new()
      }
    }
  }

  async fn load_shards(&self) -> Progress {
    let primary = &self.config.primary_name;
    let entries = match self.store.list_entries().await {
      Ok(entries) => entries,
      Err(e) => {
        tracing::warn!(error = %e, "listing progress shards failed; starting empty");
        return Progress::new();
      }
    };

    let mut progress = Progress::new();
    for (name, raw) in entries {
      let Some(lesson_id) = shard_lesson_id(primary, &name) else {
        continue;
      };
      match decode_lesson(&raw) {
        Ok(lesson) => {
          progress.lessons.insert(lesson_id, lesson);
        }
        Err(e) => tracing::debug!(error = %e, entry = %name, "skipping undecodable shard"),
      }
    }
    progress
  }

  /// Write the whole document, sharding it when the serialized JSON is over
  /// the inline ceiling. Every shard is rewritten on every call.
  pub async fn save(&self, progress: &Progress) {
    let primary = &self.config.primary_name;
    let planned = StoredDocument::plan(progress, self.config.max_inline_len).and_then(|doc| {
      tracing::debug!(
        sharded = doc.is_sharded(),
        lessons = progress.lessons.len(),
        "saving progress"
      );
      doc.entries(primary)
    });
    let entries = match planned {
      Ok(entries) => entries,
      Err(e) => {
        tracing::warn!(error = %e, "progress could not be encoded; not saved");
        return;
      }
    };

    let ttl = self.config.ttl();
    for (name, value) in entries {
      if let Err(e) = self.store.set(&name, &value, ttl).await {
        tracing::warn!(error = %e, entry = %name, "progress write rejected");
      }
    }
  }
}
