//! Encoding between the progress document and raw entry values.
//!
//! Entry values are compact JSON escaped the way `encodeURIComponent` does,
//! so they are safe to place in a cookie. A document whose serialized JSON
//! fits under the inline ceiling is stored whole; a larger one is split into
//! one entry per lesson plus a `{"split":true}` marker under the primary name.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};

use crate::{
  Result,
  progress::{LessonProgress, Progress},
};

/// Characters `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
  .remove(b'-')
  .remove(b'_')
  .remove(b'.')
  .remove(b'!')
  .remove(b'~')
  .remove(b'*')
  .remove(b'\'')
  .remove(b'(')
  .remove(b')');

// ─── Escaping ────────────────────────────────────────────────────────────────

pub fn escape(raw: &str) -> String { utf8_percent_encode(raw, COMPONENT).to_string() }

pub fn unescape(escaped: &str) -> Result<String> {
  Ok(percent_decode_str(escaped).decode_utf8()?.into_owned())
}

pub fn encode_value<T: Serialize>(value: &T) -> Result<String> {
  Ok(escape(&serde_json::to_string(value)?))
}

pub fn decode_value<T: for<'de> Deserialize<'de>>(raw: &str) -> Result<T> {
  Ok(serde_json::from_str(&unescape(raw)?)?)
}

// ─── Shard names ─────────────────────────────────────────────────────────────

/// `<primary>_l`, the prefix shared by every per-lesson entry.
pub fn shard_prefix(primary: &str) -> String { format!("{primary}_l") }

pub fn shard_name(primary: &str, lesson_id: &str) -> String {
  format!("{}{}", shard_prefix(primary), escape(lesson_id))
}

/// The lesson id a shard entry belongs to, or `None` if `name` is not a
/// shard of `primary`.
pub fn shard_lesson_id(primary: &str, name: &str) -> Option<String> {
  let escaped = name.strip_prefix(&shard_prefix(primary))?;
  unescape(escaped).ok().filter(|id| !id.is_empty())
}

// ─── Stored form ─────────────────────────────────────────────────────────────

/// Marker written under the primary name while the document is sharded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitMarker {
  pub split: bool,
}

impl SplitMarker {
  pub const SHARDED: Self = Self { split: true };
}

/// How a document is laid out across entries.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredDocument {
  /// The whole document, already encoded, under the primary name.
  Inline { value: String },
  /// One encoded entry per lesson id, with the marker under the primary name.
  Sharded {
    marker:  SplitMarker,
    lessons: BTreeMap<String, String>,
  },
}

impl StoredDocument {
  /// Pick a layout for `progress`. The ceiling counts characters of the
  /// serialized JSON, before escaping.
  pub fn plan(progress: &Progress, max_inline_len: usize) -> Result<Self> {
    let json = serde_json::to_string(progress)?;
    if json.chars().count() <= max_inline_len {
      return Ok(Self::Inline { value: escape(&json) });
    }
    let lessons = progress
      .lessons
      .iter()
      .map(|(id, lesson)| Ok((id.clone(), encode_value(lesson)?)))
      .collect::<Result<_>>()?;
    Ok(Self::Sharded {
      marker: SplitMarker::SHARDED,
      lessons,
    })
  }

  pub fn is_sharded(&self) -> bool { matches!(self, Self::Sharded { .. }) }

  /// Entries to write, shards first so the marker lands last.
  pub fn entries(&self, primary: &str) -> Result<Vec<(String, String)>> {
    match self {
      Self::Inline { value } => Ok(vec![(primary.to_owned(), value.clone())]),
      Self::Sharded { marker, lessons } => {
        let mut out: Vec<_> = lessons
          .iter()
          .map(|(id, value)| (shard_name(primary, id), value.clone()))
          .collect();
        out.push((primary.to_owned(), encode_value(marker)?));
        Ok(out)
      }
    }
  }
}

/// What the primary entry turned out to hold.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryEntry {
  Inline(Progress),
  Sharded,
}

/// Decode the primary entry, checking for the split marker first.
pub fn decode_primary(raw: &str) -> Result<PrimaryEntry> {
  let json = unescape(raw)?;
  if let Ok(SplitMarker { split: true }) = serde_json::from_str::<SplitMarker>(&json) {
    return Ok(PrimaryEntry::Sharded);
  }
  Ok(PrimaryEntry::Inline(serde_json::from_str(&json)?))
}

pub fn decode_lesson(raw: &str) -> Result<LessonProgress> { decode_value(raw) }

#[cfg(test)]
mod tests {
  use super::*;
  use crate::clock::test_now;

  fn sample(lessons: usize) -> Progress {
    let mut p = Progress::new();
    for i in 0..lessons {
      let lesson = p.ensure_lesson(i);
      lesson.mark_visited(test_now());
      lesson.mark_clip_started(format!("{i}_1"), test_now());
    }
    p
  }

  #[test]
  fn escapes_like_encode_uri_component() {
    assert_eq!(escape(r#"{"a":1}"#), "%7B%22a%22%3A1%7D");
    assert_eq!(escape("a b&c/d-e_f.g!h~i*j'k(l)"), "a%20b%26c%2Fd-e_f.g!h~i*j'k(l)");
    assert_eq!(escape("é"), "%C3%A9");
    assert_eq!(unescape("%C3%A9%20x").unwrap(), "é x");
  }

  #[test]
  fn bad_utf8_escape_is_an_error() {
    assert!(unescape("%FF").is_err());
  }

  #[test]
  fn shard_names_round_trip_ids() {
    let name = shard_name("hosut_progress", "a b");
    assert_eq!(name, "hosut_progress_la%20b");
    assert_eq!(shard_lesson_id("hosut_progress", &name).as_deref(), Some("a b"));
    assert_eq!(shard_lesson_id("hosut_progress", "hosut_progress"), None);
    assert_eq!(shard_lesson_id("hosut_progress", "hosut_progress_l"), None);
    assert_eq!(shard_lesson_id("hosut_progress", "other_l1"), None);
  }

  #[test]
  fn small_document_plans_inline() {
    let doc = StoredDocument::plan(&sample(1), 3500).unwrap();
    assert!(!doc.is_sharded());
    let entries = doc.entries("p").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(decode_primary(&entries[0].1).unwrap(), PrimaryEntry::Inline(sample(1)));
  }

  #[test]
  fn large_document_plans_shards_with_marker_last() {
    let doc = StoredDocument::plan(&sample(3), 10).unwrap();
    assert!(doc.is_sharded());
    let entries = doc.entries("p").unwrap();
    assert_eq!(entries.len(), 4);
    let (last_name, last_value) = entries.last().unwrap();
    assert_eq!(last_name, "p");
    assert_eq!(decode_primary(last_value).unwrap(), PrimaryEntry::Sharded);
    assert_eq!(entries[0].0, "p_l0");
  }

  #[test]
  fn ceiling_is_inclusive() {
    let doc = sample(2);
    let len = serde_json::to_string(&doc).unwrap().chars().count();
    assert!(!StoredDocument::plan(&doc, len).unwrap().is_sharded());
    assert!(StoredDocument::plan(&doc, len - 1).unwrap().is_sharded());
  }

  #[test]
  fn ceiling_counts_json_characters_not_escaped_bytes() {
    let mut doc = Progress::new();
    doc.ensure_lesson("ÉtudeÀ").mark_visited(test_now());
    let json = serde_json::to_string(&doc).unwrap();
    let chars = json.chars().count();
    assert!(json.len() > chars);
    assert!(escape(&json).len() > json.len());

    let planned = StoredDocument::plan(&doc, chars).unwrap();
    assert_eq!(planned, StoredDocument::Inline { value: escape(&json) });
    assert!(StoredDocument::plan(&doc, chars - 1).unwrap().is_sharded());
  }

  #[test]
  fn false_marker_reads_as_empty_document() {
    let raw = escape(r#"{"split":false}"#);
    assert_eq!(decode_primary(&raw).unwrap(), PrimaryEntry::Inline(Progress::new()));
  }

  #[test]
  fn garbage_primary_is_an_error() {
    assert!(decode_primary("not%20json").is_err());
  }
}
