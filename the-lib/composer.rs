//! Groups the operations of one outer dispatch into undo steps.
//!
//! A [`Composer`] is created for every outer dispatch and threaded by `&mut`
//! through every nested dispatch it causes. Operations are recorded into the
//! open accumulator; [`Composer::commit`] closes it into a finished step.
//! Finished steps stay in the composer until the dispatch ends (or history is
//! flushed), so a failing behavior can still be rolled back across them.

use tracing::warn;

use crate::{
  document::State,
  history::UndoStep,
  patch::Patch,
  selection::Selection,
  transform::Applied,
};

/// A finished step plus the patches its document operations produced.
#[derive(Debug, Clone)]
pub(crate) struct Committed {
  pub step:    UndoStep,
  pub patches: Vec<Patch>,
}

#[derive(Debug, Default)]
struct Accumulator {
  applied:          Vec<Applied>,
  selection_before: Option<Selection>,
  selection_after:  Option<Selection>,
}

impl Accumulator {
  fn changes_document(&self) -> bool {
    self
      .applied
      .iter()
      .any(|applied| applied.operation.is_document_change())
  }
}

/// Position in the composer log a behavior can be rolled back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Mark {
  step:    usize,
  applied: usize,
}

#[derive(Debug)]
pub(crate) struct Composer {
  open:    Accumulator,
  closed:  Vec<Accumulator>,
  /// Steps already handed out by [`Composer::drain`].
  drained: usize,
}

impl Composer {
  pub fn new(selection: Option<Selection>) -> Self {
    Self {
      open:    Accumulator {
        selection_before: selection,
        ..Accumulator::default()
      },
      closed:  Vec::new(),
      drained: 0,
    }
  }

  pub fn record(&mut self, applied: impl IntoIterator<Item = Applied>) {
    self.open.applied.extend(applied);
  }

  pub fn is_empty(&self) -> bool {
    self.open.applied.is_empty()
  }

  /// Close the open accumulator and open a fresh one. Selection-only
  /// accumulators are folded into the next one, since they never become undo
  /// steps of their own.
  pub fn commit(&mut self, selection: &Option<Selection>) {
    if !self.open.changes_document() {
      return;
    }
    let next = Accumulator {
      selection_before: selection.clone(),
      ..Accumulator::default()
    };
    let mut done = std::mem::replace(&mut self.open, next);
    done.selection_after = selection.clone();
    self.closed.push(done);
  }

  /// Restart the open accumulator from `selection` while it holds no document
  /// change yet, e.g. after a history replay moved the selection.
  pub fn reopen(&mut self, selection: &Option<Selection>) {
    if !self.open.changes_document() {
      self.open.selection_before = selection.clone();
    }
  }

  pub fn mark(&self) -> Mark {
    Mark {
      step:    self.drained + self.closed.len(),
      applied: self.open.applied.len(),
    }
  }

  /// Invert everything recorded after `mark`, newest first. Steps that were
  /// already drained are out of reach and stay applied.
  pub fn rollback(&mut self, mark: Mark, state: &mut State) {
    while self.drained + self.closed.len() > mark.step {
      undo(&self.open.applied, state);
      match self.closed.pop() {
        Some(previous) => self.open = previous,
        None => {
          self.open.applied.clear();
          return;
        },
      }
    }
    let keep = mark.applied.min(self.open.applied.len());
    undo(&self.open.applied[keep..], state);
    self.open.applied.truncate(keep);
  }

  /// Hand out the finished steps, closing the open accumulator first.
  pub fn drain(&mut self, selection: &Option<Selection>) -> Vec<Committed> {
    self.commit(selection);
    self.drained += self.closed.len();
    std::mem::take(&mut self.closed)
      .into_iter()
      .map(finish)
      .collect()
  }
}

fn finish(acc: Accumulator) -> Committed {
  let mut operations = Vec::new();
  let mut patches = Vec::new();
  for applied in acc.applied {
    if applied.operation.is_document_change() {
      operations.push(applied.operation);
      patches.extend(applied.patches);
    }
  }
  Committed {
    step: UndoStep::new(operations, acc.selection_before, acc.selection_after),
    patches,
  }
}

fn undo(applied: &[Applied], state: &mut State) {
  for applied in applied.iter().rev() {
    if let Err(err) = applied.operation.invert().apply(state) {
      warn!(%err, op = ?applied.operation, "failed to roll back operation");
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
      TextBlock,
    },
    operation::Operation,
    selection::Point,
    transform::apply_logged,
  };

  fn state() -> State {
    State::new(Document::new(vec![Block::Text(
      TextBlock::with_key("b1").with_span(Span::with_key("s1", "")),
    )]))
  }

  fn type_char(state: &mut State, composer: &mut Composer, text: &str) {
    let offset = state.document.text().chars().count();
    let op = Operation::InsertText {
      block: "b1".into(),
      child: "s1".into(),
      offset,
      text: text.into(),
    };
    composer.record(apply_logged(op, state));
  }

  fn select(state: &mut State, composer: &mut Composer, offset: usize) {
    let op = Operation::Select {
      before: state.selection.clone(),
      after:  Some(Selection::collapsed(Point::span("b1", "s1", offset))),
    };
    composer.record(apply_logged(op, state));
  }

  #[test]
  fn commits_split_steps() {
    let mut state = state();
    let mut composer = Composer::new(None);
    type_char(&mut state, &mut composer, "a");
    composer.commit(&state.selection);
    type_char(&mut state, &mut composer, "b");
    let steps = composer.drain(&state.selection);
    assert_eq!(steps.len(), 2);
    assert!(steps.iter().all(|c| c.step.operations.len() == 1));
    assert!(steps.iter().all(|c| c.patches.len() == 1));
  }

  #[test]
  fn selection_only_changes_fold_into_next_step() {
    let mut state = state();
    let mut composer = Composer::new(None);
    select(&mut state, &mut composer, 0);
    composer.commit(&state.selection);
    assert!(!composer.is_empty());
    type_char(&mut state, &mut composer, "a");
    let steps = composer.drain(&state.selection);
    assert_eq!(steps.len(), 1);
    // the select is not stored; the step starts from the pre-dispatch selection
    assert_eq!(steps[0].step.operations.len(), 1);
    assert_eq!(steps[0].step.selection_before, None);
  }

  #[test]
  fn rollback_crosses_commits() {
    let mut state = state();
    let mut composer = Composer::new(None);
    type_char(&mut state, &mut composer, "a");
    let mark = composer.mark();
    type_char(&mut state, &mut composer, "b");
    composer.commit(&state.selection);
    type_char(&mut state, &mut composer, "c");
    assert_eq!(state.document.text(), "abc");

    composer.rollback(mark, &mut state);
    assert_eq!(state.document.text(), "a");
    let steps = composer.drain(&state.selection);
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].step.operations.len(), 1);
  }

  #[test]
  fn rollback_stops_at_drained_steps() {
    let mut state = state();
    let mut composer = Composer::new(None);
    let mark = composer.mark();
    type_char(&mut state, &mut composer, "a");
    assert_eq!(composer.drain(&state.selection).len(), 1);
    type_char(&mut state, &mut composer, "b");

    composer.rollback(mark, &mut state);
    assert_eq!(state.document.text(), "a");
    assert!(composer.drain(&state.selection).is_empty());
  }

  #[test]
  fn reopen_rebases_selection_only_accumulator() {
    let mut state = state();
    let mut composer = Composer::new(None);
    select(&mut state, &mut composer, 0);
    composer.commit(&state.selection);

    let replayed = Some(Selection::collapsed(Point::span("b1", "s1", 0)));
    composer.reopen(&replayed);
    type_char(&mut state, &mut composer, "a");
    let steps = composer.drain(&state.selection);
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].step.selection_before, replayed);

    // a recorded document change pins the start of the step
    let before = state.selection.clone();
    type_char(&mut state, &mut composer, "b");
    composer.reopen(&None);
    let steps = composer.drain(&state.selection);
    assert_eq!(steps[0].step.selection_before, before);
  }
}
