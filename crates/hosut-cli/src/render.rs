//! Plain-text rendering of the lesson list and a lesson's clips.

use hosut_core::{
  LessonStatus,
  catalog::{Clip, Lesson},
  session::ClipState,
};

fn plural(n: usize, word: &str) -> String {
  if n == 1 { format!("{n} {word}") } else { format!("{n} {word}s") }
}

/// One row of the course overview.
pub fn lesson_row(lesson: &Lesson, status: LessonStatus) -> String {
  format!(
    "{:>4}  {:<40} {:>10}  {:<9}  {}",
    lesson.lesson_id,
    lesson.lesson_description,
    lesson.duration_to_display,
    plural(lesson.total_clips(), "clip"),
    status,
  )
}

fn state_icon(state: ClipState) -> &'static str {
  match state {
    ClipState::Completed => "✓",
    ClipState::Started => "▶",
    ClipState::NotStarted => " ",
  }
}

/// One row of a lesson's clip list. Clips are numbered from 1.
pub fn clip_row(index: usize, clip: &Clip, state: ClipState, active: bool) -> String {
  let marker = if active { ">" } else { " " };
  format!(
    "{marker} {} {:>2}. {:<40} {}",
    state_icon(state),
    index + 1,
    clip.title,
    clip.duration_display,
  )
}

pub fn lesson_header(lesson: &Lesson) -> String {
  format!(
    "Lesson Detail for {}\nLesson Duration of {}",
    lesson.lesson_description, lesson.duration_to_display
  )
}

pub fn status_line(status: LessonStatus) -> String { format!("Lesson Status: {status}") }
