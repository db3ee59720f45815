//! [`ProgressTracker`] — the event-facing API of the progress state machine.
//!
//! Each operation is one load → mutate → save cycle against the repository.
//! Callers await every call before issuing the next, so cycles never
//! interleave; across processes the last writer wins.

use std::fmt::Display;

use crate::{
  clock::Clock,
  progress::{ClipProgress, LessonStatus, Progress},
  repository::ProgressRepository,
  store::EntryStore,
};

pub struct ProgressTracker<S> {
  repo:  ProgressRepository<S>,
  clock: Clock,
}

impl<S: EntryStore> ProgressTracker<S> {
  pub fn new(repo: ProgressRepository<S>) -> Self { Self::with_clock(repo, Clock::System) }

  pub fn with_clock(repo: ProgressRepository<S>, clock: Clock) -> Self { Self { repo, clock } }

  pub fn repository(&self) -> &ProgressRepository<S> { &self.repo }

  pub fn clock_mut(&mut self) -> &mut Clock { &mut self.clock }

  pub async fn load(&self) -> Progress { self.repo.load().await }

  async fn update(&self, apply: impl FnOnce(&mut Progress)) {
    let mut progress = self.repo.load().await;
    apply(&mut progress);
    self.repo.save(&progress).await;
  }

  pub async fn mark_lesson_visited(&self, lesson_id: impl Display) {
    let now = self.clock.now();
    self
      .update(|p| p.ensure_lesson(lesson_id).mark_visited(now))
      .await;
  }

  pub async fn mark_clip_started(&self, lesson_id: impl Display, clip_id: impl Display) {
    let now = self.clock.now();
    self
      .update(|p| p.ensure_lesson(lesson_id).mark_clip_started(clip_id, now))
      .await;
  }

  /// Record that a clip played to its end. `total_clips` is the lesson's clip
  /// count in the catalog, or 0 when unknown.
  pub async fn mark_clip_completed(
    &self,
    lesson_id: impl Display,
    clip_id: impl Display,
    total_clips: usize,
  ) {
    let now = self.clock.now();
    self
      .update(|p| {
        p.ensure_lesson(lesson_id)
          .mark_clip_completed(clip_id, total_clips, now)
      })
      .await;
  }

  /// Force the lesson complete, independent of clip counts.
  ///
  /// The playback session calls this as soon as the final clip of a lesson
  /// *starts*, so a lesson can complete without its last clip finishing.
  pub async fn mark_lesson_complete(&self, lesson_id: impl Display) {
    let now = self.clock.now();
    self
      .update(|p| p.ensure_lesson(lesson_id).force_complete(now))
      .await;
  }

  pub async fn lesson_status(&self, lesson_id: impl Display, total_clips: usize) -> LessonStatus {
    self.repo.load().await.lesson_status(lesson_id, total_clips)
  }

  pub async fn clip_progress(
    &self,
    lesson_id: impl Display,
    clip_id: impl Display,
  ) -> Option<ClipProgress> {
    self
      .repo
      .load()
      .await
      .lesson(lesson_id)
      .and_then(|l| l.clip(clip_id).cloned())
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;
  use crate::{clock::test_now, store::MemoryJar};

  fn tracker() -> ProgressTracker<MemoryJar> {
    let clock = Clock::fixed(test_now());
    ProgressTracker::with_clock(
      ProgressRepository::new(MemoryJar::new().with_clock(clock)),
      clock,
    )
  }

  #[tokio::test]
  async fn start_is_idempotent() {
    let mut t = tracker();
    t.mark_clip_started("L", "C1").await;
    let first = t.clip_progress("L", "C1").await.unwrap();

    t.clock_mut().advance(Duration::minutes(3));
    t.mark_clip_started("L", "C1").await;
    let second = t.clip_progress("L", "C1").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(second.started, Some(test_now()));
  }

  #[tokio::test]
  async fn two_clip_scenario() {
    let t = tracker();
    assert_eq!(t.lesson_status("L", 2).await, LessonStatus::NotStarted);

    t.mark_clip_started("L", "C1").await;
    assert_eq!(t.lesson_status("L", 2).await, LessonStatus::InProgress);

    t.mark_clip_completed("L", "C1", 2).await;
    assert_eq!(t.lesson_status("L", 2).await, LessonStatus::InProgress);

    t.mark_clip_completed("L", "C2", 2).await;
    assert_eq!(t.lesson_status("L", 2).await, LessonStatus::Complete);
    assert!(t.load().await.lesson("L").unwrap().complete);
  }

  #[tokio::test]
  async fn force_complete_without_clip_events() {
    let t = tracker();
    t.mark_lesson_complete("L").await;
    assert_eq!(t.lesson_status("L", 4).await, LessonStatus::Complete);
    assert_eq!(t.load().await.lesson("L").unwrap().visited, Some(test_now()));
  }

  #[tokio::test]
  async fn visit_keeps_first_timestamp() {
    let mut t = tracker();
    t.mark_lesson_visited(5).await;
    t.clock_mut().advance(Duration::days(1));
    t.mark_lesson_visited("5").await;
    assert_eq!(t.load().await.lesson(5).unwrap().visited, Some(test_now()));
  }

  #[tokio::test]
  async fn unknown_lesson_and_clip() {
    let t = tracker();
    assert_eq!(t.lesson_status("doesnotexist", 5).await, LessonStatus::NotStarted);
    assert_eq!(t.clip_progress("doesnotexist", "x").await, None);
  }

  #[tokio::test]
  async fn completion_survives_later_events() {
    let t = tracker();
    t.mark_lesson_complete("L").await;
    t.mark_clip_started("L", "C1").await;
    t.mark_lesson_visited("L").await;
    assert_eq!(t.lesson_status("L", 3).await, LessonStatus::Complete);
  }

  #[tokio::test]
  async fn progress_persists_when_sharded() {
    let t = tracker();
    for lesson in 0..20 {
      for clip in 0..3 {
        t.mark_clip_completed(lesson, format!("{lesson}_{clip}"), 3).await;
      }
    }
    let stored = t.repository().store().get("hosut_progress").await.unwrap();
    assert_eq!(stored.as_deref(), Some("%7B%22split%22%3Atrue%7D"));
    for lesson in 0..20 {
      assert_eq!(t.lesson_status(lesson, 3).await, LessonStatus::Complete);
    }
  }

  #[tokio::test]
  async fn storage_outage_never_raises() {
    let t = tracker();
    t.repository().store().set_enabled(false);
    t.mark_clip_started("L", "C1").await;
    assert_eq!(t.lesson_status("L", 1).await, LessonStatus::NotStarted);
  }
}
