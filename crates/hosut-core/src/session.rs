//! Sequential playback of one lesson's clips, wired to progress tracking.
//!
//! The video widget itself is external; it only has to implement [`Player`]
//! and report `ended`/`error` back through [`LessonSession::handle_ended`]
//! and [`LessonSession::handle_error`].

use crate::{
  Result,
  catalog::Lesson,
  progress::{ClipProgress, LessonStatus},
  store::EntryStore,
  tracker::ProgressTracker,
};

/// The opaque video player.
pub trait Player {
  fn set_source(&mut self, url: &str);
  fn play(&mut self);
  fn pause(&mut self);
}

/// Per-clip marker shown next to each clip in a lesson view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipState {
  NotStarted,
  Started,
  Completed,
}

impl From<Option<&ClipProgress>> for ClipState {
  fn from(progress: Option<&ClipProgress>) -> Self {
    match progress {
      Some(c) if c.is_completed() => Self::Completed,
      Some(c) if c.is_started() => Self::Started,
      _ => Self::NotStarted,
    }
  }
}

pub struct LessonSession<'t, S, P> {
  tracker: &'t ProgressTracker<S>,
  lesson:  Lesson,
  player:  P,
  current: Option<usize>,
}

impl<'t, S: EntryStore, P: Player> LessonSession<'t, S, P> {
  /// Open the lesson page. Opening counts as a visit.
  pub async fn open(tracker: &'t ProgressTracker<S>, lesson: Lesson, player: P) -> Self {
    tracker.mark_lesson_visited(&lesson.lesson_id).await;
    Self {
      tracker,
      lesson,
      player,
      current: None,
    }
  }

  pub fn lesson(&self) -> &Lesson { &self.lesson }

  pub fn player(&self) -> &P { &self.player }

  pub fn current(&self) -> Option<usize> { self.current }

  /// Start playing the clip at `index`.
  ///
  /// A clip whose media URL fails validation is refused before the player is
  /// touched and is not marked started. Starting the final clip marks the
  /// whole lesson complete, even though that clip has not finished yet.
  pub async fn play_clip_at(&mut self, index: usize) -> Result<()> {
    let clip = self.lesson.clip(index)?;
    let url = clip.media_url()?;

    self.current = Some(index);
    self.player.pause();
    self.player.set_source(url);
    self.player.play();

    let lesson_id = &self.lesson.lesson_id;
    self.tracker.mark_clip_started(lesson_id, clip.id()).await;
    if self.lesson.is_last(index) {
      self.tracker.mark_lesson_complete(lesson_id).await;
    }
    Ok(())
  }

  /// The player reached the end of the current clip. Records completion and
  /// moves on to the next clip, returning its index.
  pub async fn handle_ended(&mut self) -> Result<Option<usize>> {
    let Some(index) = self.current else {
      return Ok(None);
    };
    let clip = self.lesson.clip(index)?;
    self
      .tracker
      .mark_clip_completed(&self.lesson.lesson_id, clip.id(), self.lesson.total_clips())
      .await;

    if self.lesson.is_last(index) {
      return Ok(None);
    }
    let next = index + 1;
    self.play_clip_at(next).await?;
    Ok(Some(next))
  }

  /// The player failed. Progress is untouched; the returned text is meant
  /// for the user.
  pub fn handle_error(&self, code: u16, message: &str) -> String {
    tracing::error!(code, detail = message, lesson = %self.lesson.lesson_id, "video playback error");
    format!("Video playback error (code {code}). Please check the clip URL or try again.")
  }

  pub async fn clip_states(&self) -> Vec<ClipState> {
    let progress = self.tracker.load().await;
    let lesson = progress.lesson(&self.lesson.lesson_id);
    self
      .lesson
      .clips
      .iter()
      .map(|clip| ClipState::from(lesson.and_then(|l| l.clip(clip.id()))))
      .collect()
  }

  pub async fn status(&self) -> LessonStatus {
    self
      .tracker
      .lesson_status(&self.lesson.lesson_id, self.lesson.total_clips())
      .await
  }
}
