//! Injectable wall clock.

use chrono::{DateTime, Duration, Utc};

/// Source of "now" for progress timestamps and entry expiry.
///
/// `Fixed` lets tests pin time and step it forward explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
  #[default]
  System,
  Fixed(DateTime<Utc>),
}

impl Clock {
  pub fn fixed(at: DateTime<Utc>) -> Self { Self::Fixed(at) }

  pub fn now(&self) -> DateTime<Utc> {
    match self {
      Self::System => Utc::now(),
      Self::Fixed(t) => *t,
    }
  }

  /// Step a fixed clock forward. No effect on [`Clock::System`].
  pub fn advance(&mut self, delta: Duration) {
    if let Self::Fixed(t) = self {
      *t += delta;
    }
  }
}

/// 2023-11-14T22:13:20Z, a stable instant for tests.
#[cfg(test)]
pub(crate) fn test_now() -> DateTime<Utc> {
  DateTime::<Utc>::from_timestamp(1_700_000_000, 0).expect("valid timestamp")
}
