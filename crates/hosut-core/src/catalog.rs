//! The static course catalog: lessons and their clips.
//!
//! The catalog is trusted as-is apart from three normalisations applied on
//! load: ids become strings, lessons and clips are ordered by their
//! `displayOrder`, and clips without an id get `<lessonId>_<position>`.

use std::cmp::Ordering;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result};

/// Catalog ids arrive as JSON strings or numbers.
fn id_string<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<String, D::Error> {
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum RawId {
    Text(String),
    Number(serde_json::Number),
  }

  Ok(match RawId::deserialize(de)? {
    RawId::Text(s) => s,
    RawId::Number(n) => n.to_string(),
  })
}

fn opt_id_string<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Option<String>, D::Error> {
  #[derive(Deserialize)]
  struct Wrap(#[serde(deserialize_with = "id_string")] String);

  Ok(Option::<Wrap>::deserialize(de)?.map(|Wrap(s)| s).filter(|s| !s.is_empty()))
}

fn by_display_order(a: f64, b: f64) -> Ordering { a.total_cmp(&b) }

// ─── Clip ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
  /// Always present after [`Catalog::from_json`]; may be synthesised.
  #[serde(default, deserialize_with = "opt_id_string")]
  pub clip_id:          Option<String>,
  #[serde(default)]
  pub title:            String,
  #[serde(default)]
  pub duration_display: String,
  #[serde(default)]
  pub url:              String,
  #[serde(default)]
  pub display_order:    f64,
}

impl Clip {
  pub fn id(&self) -> &str { self.clip_id.as_deref().unwrap_or_default() }

  /// The trimmed media URL, if it plausibly points at an MP4 file.
  ///
  /// The URL passes when some `.mp4` (any case) is followed by the end of
  /// the string, a `?` or a `#`: `clip.mp4?t=3` passes, `clip.mp4.txt` does
  /// not, and neither does `.mp4` inside a longer name like `a.mp4x`.
  pub fn media_url(&self) -> Result<&str> {
    let url = self.url.trim();
    let lower = url.to_ascii_lowercase();
    let is_mp4 = lower.match_indices(".mp4").any(|(at, ext)| {
      matches!(lower[at + ext.len()..].chars().next(), None | Some('?' | '#'))
    });
    if is_mp4 {
      Ok(url)
    } else {
      Err(Error::InvalidMediaUrl {
        clip_id: self.id().to_owned(),
        url:     self.url.clone(),
      })
    }
  }
}

// ─── Lesson ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
  #[serde(deserialize_with = "id_string")]
  pub lesson_id:           String,
  #[serde(default)]
  pub lesson_description:  String,
  #[serde(default)]
  pub duration_to_display: String,
  #[serde(default)]
  pub thumbnail_image_url: String,
  #[serde(default)]
  pub display_order:       f64,
  #[serde(default)]
  pub clips:               Vec<Clip>,
}

impl Lesson {
  pub fn total_clips(&self) -> usize { self.clips.len() }

  pub fn clip(&self, index: usize) -> Result<&Clip> {
    self.clips.get(index).ok_or(Error::ClipOutOfRange {
      index,
      len: self.clips.len(),
    })
  }

  pub fn is_last(&self, index: usize) -> bool { index + 1 == self.clips.len() }

  fn normalize(&mut self) {
    self
      .clips
      .sort_by(|a, b| by_display_order(a.display_order, b.display_order));
    for (position, clip) in self.clips.iter_mut().enumerate() {
      if clip.clip_id.is_none() {
        clip.clip_id = Some(format!("{}_{}", self.lesson_id, position + 1));
      }
    }
  }
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
  #[serde(default)]
  pub lessons: Vec<Lesson>,
}

impl Catalog {
  pub fn from_json(json: &str) -> Result<Self> {
    let mut catalog: Self = serde_json::from_str(json)?;
    catalog
      .lessons
      .sort_by(|a, b| by_display_order(a.display_order, b.display_order));
    for lesson in &mut catalog.lessons {
      lesson.normalize();
    }
    Ok(catalog)
  }

  /// Look a lesson up by id; numeric and string ids compare equal.
  pub fn lesson(&self, lesson_id: impl std::fmt::Display) -> Result<&Lesson> {
    let id = lesson_id.to_string();
    self
      .lessons
      .iter()
      .find(|l| l.lesson_id == id)
      .ok_or(Error::LessonNotFound(id))
  }
}
