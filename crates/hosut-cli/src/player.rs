//! A stand-in for the video widget that narrates what it would do.

use std::io::Write;

use hosut_core::session::Player;

/// Writes one line per player action to `out`.
pub struct TerminalPlayer<W> {
  out:     W,
  source:  Option<String>,
  playing: bool,
}

impl<W: Write> TerminalPlayer<W> {
  pub fn new(out: W) -> Self {
    Self {
      out,
      source: None,
      playing: false,
    }
  }

  #[cfg(test)]
  fn into_inner(self) -> W { self.out }

  fn say(&mut self, line: &str) {
    // A closed stdout must not abort playback bookkeeping.
    writeln!(self.out, "{line}").ok();
  }
}

impl<W: Write> Player for TerminalPlayer<W> {
  fn set_source(&mut self, url: &str) {
    self.source = Some(url.to_owned());
    self.say(&format!("  loading {url}"));
  }

  fn play(&mut self) {
    self.playing = true;
    if let Some(src) = self.source.clone() {
      self.say(&format!("▶ playing {src}"));
    }
  }

  fn pause(&mut self) {
    if self.playing {
      self.playing = false;
      self.say("⏸ paused");
    }
  }
}
