//! Result of offering an event to one candidate.
//!
//! The dispatcher walks candidates in priority order and stops at the first
//! one that does not answer [`DispatchResult::Continue`].

/// Result of a dispatch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchResult {
  /// Not handled; pass the input to the next candidate.
  Continue,
  /// Handled; stop the chain.
  Handled,
  /// Handled with zero effect; stop the chain and skip the default handler.
  Suppressed,
}

impl DispatchResult {
  /// Whether the chain stops at this candidate.
  pub const fn is_consumed(self) -> bool {
    !matches!(self, Self::Continue)
  }

  /// Fold the results of successive resolution steps of one candidate.
  ///
  /// Any handled step makes the candidate handled. A suppression only counts
  /// when nothing was handled.
  pub const fn merge(self, other: Self) -> Self {
    match (self, other) {
      (Self::Handled, _) | (_, Self::Handled) => Self::Handled,
      (Self::Suppressed, _) | (_, Self::Suppressed) => Self::Suppressed,
      _ => Self::Continue,
    }
  }
}

impl Default for DispatchResult {
  fn default() -> Self {
    Self::Continue
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn merge_prefers_handled() {
    use DispatchResult::*;
    assert_eq!(Continue.merge(Continue), Continue);
    assert_eq!(Continue.merge(Suppressed), Suppressed);
    assert_eq!(Suppressed.merge(Handled), Handled);
    assert_eq!(Handled.merge(Continue), Handled);
  }

  #[test]
  fn only_continue_falls_through() {
    assert!(!DispatchResult::Continue.is_consumed());
    assert!(DispatchResult::Handled.is_consumed());
    assert!(DispatchResult::Suppressed.is_consumed());
  }
}
