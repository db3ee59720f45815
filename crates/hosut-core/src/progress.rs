//! The progress document and its pure transitions.
//!
//! Nothing in this module touches storage. Every transition takes `now`
//! explicitly so callers decide where time comes from. Timestamps are
//! write-once and the lesson `complete` flag is sticky, which makes the
//! derived [`LessonStatus`] monotonic.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Derived status of a lesson. Ordered so that `NotStarted < InProgress <
/// Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
  NotStarted,
  InProgress,
  Complete,
}

impl LessonStatus {
  pub fn label(self) -> &'static str {
    match self {
      Self::NotStarted => "Not Started",
      Self::InProgress => "In Progress",
      Self::Complete => "Complete",
    }
  }
}

impl fmt::Display for LessonStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

// ─── Clip ────────────────────────────────────────────────────────────────────

/// Playback markers for one clip. A clip with no entry has not been started.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipProgress {
  /// First playback attempt.
  #[serde(default)]
  pub started:   Option<DateTime<Utc>>,
  /// Playback reached its natural end.
  #[serde(default)]
  pub completed: Option<DateTime<Utc>>,
}

impl ClipProgress {
  pub fn is_started(&self) -> bool { self.started.is_some() }

  pub fn is_completed(&self) -> bool { self.completed.is_some() }

  fn touched(&self) -> bool { self.is_started() || self.is_completed() }
}

// ─── Lesson ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonProgress {
  /// First time the lesson page was opened.
  #[serde(default)]
  pub visited:  Option<DateTime<Utc>>,
  /// Terminal flag; never cleared once set.
  #[serde(default)]
  pub complete: bool,
  #[serde(default)]
  pub clips:    BTreeMap<String, ClipProgress>,
}

impl LessonProgress {
  pub fn clip(&self, clip_id: impl fmt::Display) -> Option<&ClipProgress> {
    self.clips.get(&clip_id.to_string())
  }

  pub fn completed_count(&self) -> usize {
    self.clips.values().filter(|c| c.is_completed()).count()
  }

  pub fn mark_visited(&mut self, now: DateTime<Utc>) {
    self.visited.get_or_insert(now);
  }

  pub fn mark_clip_started(&mut self, clip_id: impl fmt::Display, now: DateTime<Utc>) {
    let clip = self.clips.entry(clip_id.to_string()).or_default();
    clip.started.get_or_insert(now);
  }

  /// Record a finished clip, backfilling `started` when the start was never
  /// seen. With a known clip count (`total_clips > 0`) the lesson completes
  /// once that many clips have finished.
  pub fn mark_clip_completed(
    &mut self,
    clip_id: impl fmt::Display,
    total_clips: usize,
    now: DateTime<Utc>,
  ) {
    let clip = self.clips.entry(clip_id.to_string()).or_default();
    clip.started.get_or_insert(now);
    clip.completed.get_or_insert(now);

    if total_clips > 0 && self.completed_count() >= total_clips {
      self.complete = true;
    }
  }

  /// Force the lesson complete regardless of clip counts.
  pub fn force_complete(&mut self, now: DateTime<Utc>) {
    self.complete = true;
    self.visited.get_or_insert(now);
  }

  /// Status given the number of clips the lesson has in the catalog.
  ///
  /// The `complete` flag wins over the recount. A `total_clips` of zero means
  /// the count is unknown, and only the flag can report progress then.
  pub fn status(&self, total_clips: usize) -> LessonStatus {
    if self.complete {
      return LessonStatus::Complete;
    }
    if total_clips == 0 {
      return LessonStatus::NotStarted;
    }
    if self.completed_count() >= total_clips {
      LessonStatus::Complete
    } else if self.clips.values().any(ClipProgress::touched) {
      LessonStatus::InProgress
    } else {
      LessonStatus::NotStarted
    }
  }
}

// ─── Document ────────────────────────────────────────────────────────────────

/// The whole persisted progress for one user.
///
/// Lesson ids are always stored in their string form; every accessor takes
/// `impl Display` so numeric catalog ids normalize the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
  #[serde(default)]
  pub lessons: BTreeMap<String, LessonProgress>,
}

impl Progress {
  pub fn new() -> Self { Self::default() }

  pub fn is_empty(&self) -> bool { self.lessons.is_empty() }

  pub fn lesson(&self, lesson_id: impl fmt::Display) -> Option<&LessonProgress> {
    self.lessons.get(&lesson_id.to_string())
  }

  /// Return the entry for `lesson_id`, creating a default one when absent.
  pub fn ensure_lesson(&mut self, lesson_id: impl fmt::Display) -> &mut LessonProgress {
    self.lessons.entry(lesson_id.to_string()).or_default()
  }

  /// Unknown lessons report [`LessonStatus::NotStarted`].
  pub fn lesson_status(&self, lesson_id: impl fmt::Display, total_clips: usize) -> LessonStatus {
    self
      .lesson(lesson_id)
      .map_or(LessonStatus::NotStarted, |l| l.status(total_clips))
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;
  use proptest::prelude::*;

  use super::*;
  use crate::clock::test_now;

  #[test]
  fn ids_are_normalized_to_strings() {
    let mut p = Progress::new();
    p.ensure_lesson(7).mark_clip_started(42, test_now());

    assert!(p.lessons.contains_key("7"));
    assert!(p.lesson("7").unwrap().clip("42").is_some());
    assert!(p.lesson(7).unwrap().clip(42).is_some());
  }

  #[test]
  fn timestamps_are_write_once() {
    let mut lesson = LessonProgress::default();
    let first = test_now();
    let later = first + Duration::hours(1);

    lesson.mark_visited(first);
    lesson.mark_visited(later);
    lesson.mark_clip_started("a", first);
    lesson.mark_clip_started("a", later);
    lesson.mark_clip_completed("a", 0, first);
    lesson.mark_clip_completed("a", 0, later);

    assert_eq!(lesson.visited, Some(first));
    assert_eq!(lesson.clips["a"].started, Some(first));
    assert_eq!(lesson.clips["a"].completed, Some(first));
  }

  #[test]
  fn completing_unseen_clip_backfills_start() {
    let mut lesson = LessonProgress::default();
    lesson.mark_clip_completed("a", 3, test_now());

    let clip = &lesson.clips["a"];
    assert_eq!(clip.started, Some(test_now()));
    assert_eq!(clip.completed, Some(test_now()));
    assert!(!lesson.complete);
  }

  #[test]
  fn completion_count_sets_flag() {
    let mut lesson = LessonProgress::default();
    lesson.mark_clip_completed("a", 2, test_now());
    assert!(!lesson.complete);
    lesson.mark_clip_completed("b", 2, test_now());
    assert!(lesson.complete);
  }

  #[test]
  fn unknown_total_never_sets_flag() {
    let mut lesson = LessonProgress::default();
    lesson.mark_clip_completed("a", 0, test_now());
    assert!(!lesson.complete);
    assert_eq!(lesson.status(0), LessonStatus::NotStarted);
  }

  #[test]
  fn flag_wins_over_recount() {
    let mut lesson = LessonProgress::default();
    lesson.force_complete(test_now());
    assert_eq!(lesson.status(5), LessonStatus::Complete);
    assert_eq!(lesson.status(0), LessonStatus::Complete);
    assert_eq!(lesson.visited, Some(test_now()));
  }

  #[test]
  fn visited_alone_is_not_started() {
    let mut p = Progress::new();
    p.ensure_lesson("1").mark_visited(test_now());
    assert_eq!(p.lesson_status("1", 3), LessonStatus::NotStarted);
  }

  #[test]
  fn unknown_lesson_is_not_started() {
    assert_eq!(Progress::new().lesson_status("doesnotexist", 5), LessonStatus::NotStarted);
  }

  #[test]
  fn status_labels() {
    assert_eq!(LessonStatus::NotStarted.to_string(), "Not Started");
    assert_eq!(LessonStatus::InProgress.to_string(), "In Progress");
    assert_eq!(LessonStatus::Complete.to_string(), "Complete");
  }

  #[test]
  fn decodes_sparse_json() {
    let p: Progress =
      serde_json::from_str(r#"{"lessons":{"3":{"visited":null,"clips":{"3_1":{}}}}}"#).unwrap();
    let lesson = p.lesson(3).unwrap();
    assert!(!lesson.complete);
    assert_eq!(lesson.clip("3_1"), Some(&ClipProgress::default()));
  }

  #[derive(Debug, Clone)]
  enum Event {
    Visit,
    Start(usize),
    Finish(usize),
    ForceComplete,
  }

  fn event_strategy(clips: usize) -> impl Strategy<Value = Event> {
    prop_oneof![
      Just(Event::Visit),
      (0..clips).prop_map(Event::Start),
      (0..clips).prop_map(Event::Finish),
      Just(Event::ForceComplete),
    ]
  }

  proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn status_never_regresses(
      (total, events) in (1usize..6).prop_flat_map(|n| {
        (Just(n), prop::collection::vec(event_strategy(n), 0..24))
      })
    ) {
      let mut lesson = LessonProgress::default();
      let mut now = test_now();
      let mut last = lesson.status(total);

      for event in events {
        now += Duration::seconds(1);
        match event {
          Event::Visit => lesson.mark_visited(now),
          Event::Start(i) => lesson.mark_clip_started(i, now),
          Event::Finish(i) => lesson.mark_clip_completed(i, total, now),
          Event::ForceComplete => lesson.force_complete(now),
        }
        let status = lesson.status(total);
        prop_assert!(status >= last, "{last:?} -> {status:?}");
        last = status;
      }
    }

    #[test]
    fn complete_iff_flag_or_count(
      total in 1usize..6,
      finished in prop::collection::btree_set(0usize..8, 0..8),
      forced in any::<bool>(),
    ) {
      let mut lesson = LessonProgress::default();
      for i in &finished {
        // Record without the count so only `forced` can set the flag.
        lesson.mark_clip_completed(i, 0, test_now());
      }
      if forced {
        lesson.force_complete(test_now());
      }
      let expect = forced || finished.len() >= total;
      prop_assert_eq!(lesson.status(total) == LessonStatus::Complete, expect);
    }
  }
}
