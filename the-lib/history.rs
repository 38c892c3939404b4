use std::time::Instant;

use thiserror::Error;

use crate::{
  operation::Operation,
  selection::Selection,
};

/// Result type for history operations.
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Errors that can occur during history operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
  #[error("nothing to undo")]
  NothingToUndo,
  #[error("nothing to redo")]
  NothingToRedo,
}

pub const DEFAULT_LIMIT: usize = 100;

/// An atomic group of document operations, reversible as one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoStep {
  /// Document operations in the order they were applied. Selection changes
  /// are not stored; the step only remembers where the selection was.
  pub operations:       Vec<Operation>,
  pub selection_before: Option<Selection>,
  pub selection_after:  Option<Selection>,
  pub timestamp:        Instant,
}

impl UndoStep {
  pub fn new(
    operations: Vec<Operation>,
    selection_before: Option<Selection>,
    selection_after: Option<Selection>,
  ) -> Self {
    Self {
      operations,
      selection_before,
      selection_after,
      timestamp: Instant::now(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.operations.is_empty()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
  Undo,
  Redo,
}

/// A pending move through history that has not been applied yet.
///
/// Returned by [`History::undo`] and [`History::redo`]. The caller applies the
/// operations in order, restores `selection`, and then calls
/// [`History::apply_jump`] so the stacks only change once the document did.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryJump {
  pub direction:  Direction,
  /// The operations to apply, in order.
  pub operations: Vec<Operation>,
  pub selection:  Option<Selection>,
}

impl HistoryJump {
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.operations.is_empty()
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.operations.len()
  }
}

/// Two stacks of [`UndoStep`]s.
///
/// Committing a step clears the redo stack. Once more than `limit` steps are
/// stored the oldest one is dropped; a limit of zero keeps everything.
#[derive(Debug, Clone)]
pub struct History {
  undo:  Vec<UndoStep>,
  redo:  Vec<UndoStep>,
  limit: usize,
}

impl Default for History {
  fn default() -> Self {
    Self::with_limit(DEFAULT_LIMIT)
  }
}

impl History {
  pub fn with_limit(limit: usize) -> Self {
    Self {
      undo: Vec::new(),
      redo: Vec::new(),
      limit,
    }
  }

  pub fn commit(&mut self, step: UndoStep) {
    if step.is_empty() {
      return;
    }
    self.redo.clear();
    self.undo.push(step);
    self.enforce_limit();
  }

  #[inline]
  pub fn limit(&self) -> usize {
    self.limit
  }

  pub fn set_limit(&mut self, limit: usize) {
    self.limit = limit;
    self.enforce_limit();
  }

  #[inline]
  pub fn can_undo(&self) -> bool {
    !self.undo.is_empty()
  }

  #[inline]
  pub fn can_redo(&self) -> bool {
    !self.redo.is_empty()
  }

  pub fn undo_len(&self) -> usize {
    self.undo.len()
  }

  pub fn redo_len(&self) -> usize {
    self.redo.len()
  }

  pub fn clear(&mut self) {
    self.undo.clear();
    self.redo.clear();
  }

  /// Prepare an undo without mutating the stacks. `None` on underflow.
  pub fn undo(&self) -> Option<HistoryJump> {
    let step = self.undo.last()?;
    Some(HistoryJump {
      direction:  Direction::Undo,
      operations: step.operations.iter().rev().map(Operation::invert).collect(),
      selection:  step.selection_before.clone(),
    })
  }

  /// Prepare a redo without mutating the stacks. `None` on underflow.
  pub fn redo(&self) -> Option<HistoryJump> {
    let step = self.redo.last()?;
    Some(HistoryJump {
      direction:  Direction::Redo,
      operations: step.operations.clone(),
      selection:  step.selection_after.clone(),
    })
  }

  /// Move the top step to the other stack once its jump was applied.
  pub fn apply_jump(&mut self, jump: &HistoryJump) -> Result<()> {
    match jump.direction {
      Direction::Undo => {
        let step = self.undo.pop().ok_or(HistoryError::NothingToUndo)?;
        self.redo.push(step);
      },
      Direction::Redo => {
        let step = self.redo.pop().ok_or(HistoryError::NothingToRedo)?;
        self.undo.push(step);
      },
    }
    Ok(())
  }

  fn enforce_limit(&mut self) {
    if self.limit > 0 && self.undo.len() > self.limit {
      let excess = self.undo.len() - self.limit;
      self.undo.drain(..excess);
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    document::{
      Block,
      Document,
      Span,
      State,
      TextBlock,
    },
    selection::Point,
  };

  fn state() -> State {
    State::new(Document::new(vec![Block::Text(
      TextBlock::with_key("b1").with_span(Span::with_key("s1", "hello")),
    )]))
  }

  fn insert(offset: usize, text: &str) -> Operation {
    Operation::InsertText {
      block: "b1".into(),
      child: "s1".into(),
      offset,
      text: text.into(),
    }
  }

  fn apply_jump_to_state(history: &mut History, state: &mut State, jump: HistoryJump) {
    for op in &jump.operations {
      op.apply(state).unwrap();
    }
    state.selection = jump.selection.clone();
    history.apply_jump(&jump).unwrap();
  }

  #[test]
  fn test_undo_redo() {
    let mut history = History::default();
    let mut state = state();
    let caret = |offset| Some(Selection::collapsed(Point::span("b1", "s1", offset)));
    state.selection = caret(5);

    let op = insert(5, " world");
    op.apply(&mut state).unwrap();
    state.selection = caret(11);
    history.commit(UndoStep::new(vec![op], caret(5), caret(11)));

    let jump = history.undo().unwrap();
    apply_jump_to_state(&mut history, &mut state, jump);
    assert_eq!(state.document.text(), "hello");
    assert_eq!(state.selection, caret(5));
    assert!(!history.can_undo());

    let jump = history.redo().unwrap();
    apply_jump_to_state(&mut history, &mut state, jump);
    assert_eq!(state.document.text(), "hello world");
    assert_eq!(state.selection, caret(11));
    assert!(history.redo().is_none());
  }

  #[test]
  fn commit_clears_redo() {
    let mut history = History::default();
    history.commit(UndoStep::new(vec![insert(0, "a")], None, None));
    let jump = history.undo().unwrap();
    history.apply_jump(&jump).unwrap();
    assert!(history.can_redo());

    history.commit(UndoStep::new(vec![insert(0, "b")], None, None));
    assert!(!history.can_redo());
    assert_eq!(history.undo_len(), 1);
  }

  #[test]
  fn empty_steps_are_ignored() {
    let mut history = History::default();
    history.commit(UndoStep::new(Vec::new(), None, None));
    assert!(history.undo().is_none());
  }

  #[test]
  fn limit_drops_oldest() {
    let mut history = History::with_limit(2);
    for (idx, text) in ["a", "b", "c"].into_iter().enumerate() {
      history.commit(UndoStep::new(vec![insert(idx, text)], None, None));
    }
    assert_eq!(history.undo_len(), 2);
    // the oldest remaining step is "b"
    let jump = history.undo().unwrap();
    history.apply_jump(&jump).unwrap();
    let jump = history.undo().unwrap();
    assert_eq!(jump.operations, vec![insert(1, "b").invert()]);
  }

  #[test]
  fn jump_without_step_is_an_error() {
    let mut history = History::default();
    let jump = HistoryJump {
      direction:  Direction::Redo,
      operations: Vec::new(),
      selection:  None,
    };
    assert_eq!(history.apply_jump(&jump), Err(HistoryError::NothingToRedo));
  }
}
