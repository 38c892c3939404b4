//! Primitive, invertible document operations.
//!
//! Every mutation of a [`State`] goes through an [`Operation`]. Operations
//! address blocks and children by [`Key`] and carry everything needed to build
//! their exact inverse, so an undo step is replayed backwards by applying
//! [`Operation::invert`] of each operation in reverse order.
//!
//! # Example
//!
//! ```
//! use the_lib::{
//!   document::{
//!     Block,
//!     Document,
//!     Span,
//!     State,
//!     TextBlock,
//!   },
//!   operation::Operation,
//! };
//!
//! let mut state = State::new(Document::new(vec![Block::Text(
//!   TextBlock::with_key("b1").with_span(Span::with_key("s1", "hello")),
//! )]));
//! let before = state.clone();
//!
//! let op = Operation::InsertText {
//!   block:  "b1".into(),
//!   child:  "s1".into(),
//!   offset: 5,
//!   text:   " world".into(),
//! };
//! op.apply(&mut state).unwrap();
//! assert_eq!(state.document.text(), "hello world");
//!
//! op.invert().apply(&mut state).unwrap();
//! assert_eq!(state, before);
//! ```

use serde::{
  Deserialize,
  Serialize,
};
use thiserror::Error;

use crate::{
  Tendril,
  document::{
    Block,
    BlockProps,
    Child,
    MarkDef,
    State,
    TextBlock,
    byte_offset,
    char_slice,
  },
  key::Key,
  patch::{
    self,
    Patch,
    PatchPath,
    Position,
  },
  selection::Selection,
};

/// Result type for operation application.
pub type Result<T> = std::result::Result<T, OperationError>;

/// Invariant violations detected while applying an operation. The state is
/// left untouched when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
  #[error("no block with key {0}")]
  MissingBlock(Key),
  #[error("block {0} is not a text block")]
  NotTextBlock(Key),
  #[error("no child {child} in block {block}")]
  MissingChild { block: Key, child: Key },
  #[error("child {child} in block {block} is not a span")]
  NotSpan { block: Key, child: Key },
  #[error("key {0} is already in use")]
  DuplicateKey(Key),
  #[error("offset {offset} is out of bounds (len: {len})")]
  OffsetOutOfBounds { offset: usize, len: usize },
  #[error("expected text {expected:?} at offset {offset}, found {found:?}")]
  TextMismatch {
    offset:   usize,
    expected: String,
    found:    String,
  },
  #[error("block {0} cannot be moved relative to itself")]
  SelfAnchoredMove(Key),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
  /// Insert `block` after the block `after`, or first when `None`.
  InsertBlock { after: Option<Key>, block: Block },
  /// Remove the block with `block.key()`. `after` records its predecessor so
  /// the inverse can restore its position.
  RemoveBlock { after: Option<Key>, block: Block },
  MoveBlock {
    key:        Key,
    from_after: Option<Key>,
    to_after:   Option<Key>,
  },
  SetBlock {
    key:    Key,
    before: BlockProps,
    after:  BlockProps,
  },
  SetMarkDefs {
    block:  Key,
    before: Vec<MarkDef>,
    after:  Vec<MarkDef>,
  },
  InsertChild {
    block: Key,
    after: Option<Key>,
    child: Child,
  },
  RemoveChild {
    block: Key,
    after: Option<Key>,
    child: Child,
  },
  InsertText {
    block:  Key,
    child:  Key,
    offset: usize,
    text:   String,
  },
  RemoveText {
    block:  Key,
    child:  Key,
    offset: usize,
    text:   String,
  },
  SetMarks {
    block:  Key,
    child:  Key,
    before: Vec<Tendril>,
    after:  Vec<Tendril>,
  },
  Select {
    before: Option<Selection>,
    after:  Option<Selection>,
  },
}

impl Operation {
  /// The operation that undoes `self`.
  pub fn invert(&self) -> Operation {
    match self.clone() {
      Self::InsertBlock { after, block } => Self::RemoveBlock { after, block },
      Self::RemoveBlock { after, block } => Self::InsertBlock { after, block },
      Self::MoveBlock {
        key,
        from_after,
        to_after,
      } => {
        Self::MoveBlock {
          key,
          from_after: to_after,
          to_after: from_after,
        }
      },
      Self::SetBlock { key, before, after } => {
        Self::SetBlock {
          key,
          before: after,
          after: before,
        }
      },
      Self::SetMarkDefs {
        block,
        before,
        after,
      } => {
        Self::SetMarkDefs {
          block,
          before: after,
          after: before,
        }
      },
      Self::InsertChild { block, after, child } => Self::RemoveChild { block, after, child },
      Self::RemoveChild { block, after, child } => Self::InsertChild { block, after, child },
      Self::InsertText {
        block,
        child,
        offset,
        text,
      } => {
        Self::RemoveText {
          block,
          child,
          offset,
          text,
        }
      },
      Self::RemoveText {
        block,
        child,
        offset,
        text,
      } => {
        Self::InsertText {
          block,
          child,
          offset,
          text,
        }
      },
      Self::SetMarks {
        block,
        child,
        before,
        after,
      } => {
        Self::SetMarks {
          block,
          child,
          before: after,
          after: before,
        }
      },
      Self::Select { before, after } => {
        Self::Select {
          before: after,
          after:  before,
        }
      },
    }
  }

  /// Whether the operation changes the document rather than only the
  /// selection.
  pub fn is_document_change(&self) -> bool {
    !matches!(self, Self::Select { .. })
  }

  /// Apply to `state`, returning the patches describing the change.
  ///
  /// Validation happens before any mutation, so an error leaves `state`
  /// untouched.
  pub fn apply(&self, state: &mut State) -> Result<Vec<Patch>> {
    match self {
      Self::InsertBlock { after, block } => insert_block(state, after.as_ref(), block),
      Self::RemoveBlock { block, .. } => remove_block(state, block.key()),
      Self::MoveBlock { key, to_after, .. } => move_block(state, key, to_after.as_ref()),
      Self::SetBlock { key, after, .. } => {
        let block = text_block_mut(state, key)?;
        let before = block.props();
        block.set_props(after.clone());
        Ok(props_patches(key, &before, after))
      },
      Self::SetMarkDefs { block, after, .. } => {
        text_block_mut(state, block)?.mark_defs = after.clone();
        let mut path = patch::block_path(block);
        path.push(patch::field("markDefs"));
        Ok(vec![Patch::Set {
          path,
          value: patch::to_value(after),
        }])
      },
      Self::InsertChild { block, after, child } => insert_child(state, block, after.as_ref(), child),
      Self::RemoveChild { block, child, .. } => {
        let text = text_block_mut(state, block)?;
        let idx = text
          .child_index(child.key())
          .ok_or_else(|| missing_child(block, child.key()))?;
        text.children.remove(idx);
        Ok(vec![Patch::Unset {
          path: patch::child_path(block, child.key()),
        }])
      },
      Self::InsertText {
        block,
        child,
        offset,
        text,
      } => {
        let span = span_mut(state, block, child)?;
        let len = span.len();
        if *offset > len {
          return Err(OperationError::OffsetOutOfBounds { offset: *offset, len });
        }
        let at = byte_offset(&span.text, *offset);
        span.text.insert_str(at, text);
        Ok(vec![text_patch(block, child, &span.text)])
      },
      Self::RemoveText {
        block,
        child,
        offset,
        text,
      } => {
        let span = span_mut(state, block, child)?;
        let len = span.len();
        let end = offset + text.chars().count();
        if end > len {
          return Err(OperationError::OffsetOutOfBounds { offset: end, len });
        }
        let found = char_slice(&span.text, *offset, end);
        if found != text {
          return Err(OperationError::TextMismatch {
            offset:   *offset,
            expected: text.clone(),
            found:    found.to_owned(),
          });
        }
        let start = byte_offset(&span.text, *offset);
        span.text.replace_range(start..start + text.len(), "");
        Ok(vec![text_patch(block, child, &span.text)])
      },
      Self::SetMarks {
        block,
        child,
        after,
        ..
      } => {
        span_mut(state, block, child)?.marks = after.clone();
        let mut path = patch::child_path(block, child);
        path.push(patch::field("marks"));
        Ok(vec![Patch::Set {
          path,
          value: patch::to_value(after),
        }])
      },
      Self::Select { after, .. } => {
        state.selection = after.clone();
        Ok(Vec::new())
      },
    }
  }
}

fn insert_block(state: &mut State, after: Option<&Key>, block: &Block) -> Result<Vec<Patch>> {
  let doc = &state.document;
  if let Some(key) = block.keys().into_iter().find(|key| doc.contains_key(key)) {
    return Err(OperationError::DuplicateKey(key.clone()));
  }
  let (at, patch) = match after {
    Some(after) => {
      let idx = doc
        .block_index(after)
        .ok_or_else(|| OperationError::MissingBlock(after.clone()))?;
      (idx + 1, Patch::Insert {
        path:     patch::block_path(after),
        position: Position::After,
        items:    vec![patch::to_value(block)],
      })
    },
    None => {
      match doc.blocks().first() {
        Some(first) => {
          (0, Patch::Insert {
            path:     patch::block_path(first.key()),
            position: Position::Before,
            items:    vec![patch::to_value(block)],
          })
        },
        None => {
          (0, Patch::Set {
            path:  PatchPath::new(),
            value: patch::to_value(&vec![block]),
          })
        },
      }
    },
  };
  state.document.blocks_mut().insert(at, block.clone());
  Ok(vec![patch])
}

fn remove_block(state: &mut State, key: &Key) -> Result<Vec<Patch>> {
  let idx = state
    .document
    .block_index(key)
    .ok_or_else(|| OperationError::MissingBlock(key.clone()))?;
  state.document.blocks_mut().remove(idx);
  Ok(vec![Patch::Unset {
    path: patch::block_path(key),
  }])
}

fn move_block(state: &mut State, key: &Key, to_after: Option<&Key>) -> Result<Vec<Patch>> {
  if to_after == Some(key) {
    return Err(OperationError::SelfAnchoredMove(key.clone()));
  }
  let doc = &state.document;
  let from = doc
    .block_index(key)
    .ok_or_else(|| OperationError::MissingBlock(key.clone()))?;
  if let Some(anchor) = to_after {
    if doc.block_index(anchor).is_none() {
      return Err(OperationError::MissingBlock(anchor.clone()));
    }
  }

  let blocks = state.document.blocks_mut();
  let block = blocks.remove(from);
  let (at, position, target) = match to_after {
    Some(anchor) => {
      let idx = blocks
        .iter()
        .position(|block| block.key() == anchor)
        .map_or(blocks.len(), |idx| idx + 1);
      (idx, Position::After, Some(anchor.clone()))
    },
    None => (0, Position::Before, blocks.first().map(|first| first.key().clone())),
  };
  blocks.insert(at, block);

  Ok(
    target
      .map(|target| {
        Patch::Move {
          path: patch::block_path(key),
          position,
          target: patch::block_path(&target),
        }
      })
      .into_iter()
      .collect(),
  )
}

fn insert_child(state: &mut State, block: &Key, after: Option<&Key>, child: &Child) -> Result<Vec<Patch>> {
  if state.document.contains_key(child.key()) {
    return Err(OperationError::DuplicateKey(child.key().clone()));
  }
  let text = text_block_mut(state, block)?;
  let (at, patch) = match after {
    Some(after) => {
      let idx = text
        .child_index(after)
        .ok_or_else(|| missing_child(block, after))?;
      (idx + 1, Patch::Insert {
        path:     patch::child_path(block, after),
        position: Position::After,
        items:    vec![patch::to_value(child)],
      })
    },
    None => {
      match text.children.first() {
        Some(first) => {
          (0, Patch::Insert {
            path:     patch::child_path(block, first.key()),
            position: Position::Before,
            items:    vec![patch::to_value(child)],
          })
        },
        None => {
          let mut path = patch::block_path(block);
          path.push(patch::field("children"));
          (0, Patch::Set {
            path,
            value: patch::to_value(&vec![child]),
          })
        },
      }
    },
  };
  text.children.insert(at, child.clone());
  Ok(vec![patch])
}

fn text_block_mut<'a>(state: &'a mut State, key: &Key) -> Result<&'a mut TextBlock> {
  match state.document.block_mut(key) {
    Some(Block::Text(block)) => Ok(block),
    Some(Block::Object(_)) => Err(OperationError::NotTextBlock(key.clone())),
    None => Err(OperationError::MissingBlock(key.clone())),
  }
}

fn span_mut<'a>(state: &'a mut State, block: &Key, child: &Key) -> Result<&'a mut crate::document::Span> {
  let text = text_block_mut(state, block)?;
  match text.children.iter_mut().find(|c| c.key() == child) {
    Some(Child::Span(span)) => Ok(span),
    Some(Child::Object(_)) => {
      Err(OperationError::NotSpan {
        block: block.clone(),
        child: child.clone(),
      })
    },
    None => Err(missing_child(block, child)),
  }
}

fn missing_child(block: &Key, child: &Key) -> OperationError {
  OperationError::MissingChild {
    block: block.clone(),
    child: child.clone(),
  }
}

fn text_patch(block: &Key, child: &Key, text: &str) -> Patch {
  let mut path = patch::child_path(block, child);
  path.push(patch::field("text"));
  Patch::Set {
    path,
    value: text.into(),
  }
}

fn props_patches(key: &Key, before: &BlockProps, after: &BlockProps) -> Vec<Patch> {
  let prop = |name: &str| {
    let mut path = patch::block_path(key);
    path.push(patch::field(name));
    path
  };
  let mut patches = Vec::new();
  if before.style != after.style {
    patches.push(Patch::Set {
      path:  prop("style"),
      value: after.style.as_str().into(),
    });
  }
  if before.list_item != after.list_item {
    patches.push(match &after.list_item {
      Some(list_item) => {
        Patch::Set {
          path:  prop("listItem"),
          value: list_item.as_str().into(),
        }
      },
      None => Patch::Unset {
        path: prop("listItem"),
      },
    });
  }
  if before.level != after.level {
    patches.push(match after.level {
      Some(level) => {
        Patch::Set {
          path:  prop("level"),
          value: level.into(),
        }
      },
      None => Patch::Unset { path: prop("level") },
    });
  }
  patches
}

#[cfg(test)]
mod test {
  use quickcheck::{
    Arbitrary,
    Gen,
  };

  use super::*;
  use crate::{
    document::{
      Document,
      Span,
    },
    selection::Point,
  };

  fn state() -> State {
    State::new(Document::new(vec![
      Block::Text(
        TextBlock::with_key("b1")
          .with_span(Span::with_key("s1", "héllo "))
          .with_span(Span::with_key("s2", "wörld").with_marks(["strong"])),
      ),
      Block::Text(TextBlock::with_key("b2").with_span(Span::with_key("s3", "second"))),
      Block::Text(TextBlock::with_key("b3").with_span(Span::with_key("s4", ""))),
    ]))
  }

  fn round_trip(op: Operation) {
    let mut state = state();
    let before = state.clone();
    op.apply(&mut state).unwrap();
    assert_ne!(state, before, "{op:?} should change the state");
    op.invert().apply(&mut state).unwrap();
    assert_eq!(state, before, "{op:?} should round trip");
  }

  #[test]
  fn text_round_trips() {
    round_trip(Operation::InsertText {
      block:  "b1".into(),
      child:  "s1".into(),
      offset: 2,
      text:   "XY".into(),
    });
    round_trip(Operation::RemoveText {
      block:  "b1".into(),
      child:  "s2".into(),
      offset: 1,
      text:   "örl".into(),
    });
  }

  #[test]
  fn structural_round_trips() {
    round_trip(Operation::RemoveBlock {
      after: Some("b1".into()),
      block: state().document.blocks()[1].clone(),
    });
    round_trip(Operation::RemoveBlock {
      after: None,
      block: state().document.blocks()[0].clone(),
    });
    round_trip(Operation::MoveBlock {
      key:        "b3".into(),
      from_after: Some("b2".into()),
      to_after:   None,
    });
    round_trip(Operation::RemoveChild {
      block: "b1".into(),
      after: Some("s1".into()),
      child: Child::Span(Span::with_key("s2", "wörld").with_marks(["strong"])),
    });
    round_trip(Operation::SetBlock {
      key:    "b2".into(),
      before: state().document.text_block(&"b2".into()).unwrap().props(),
      after:  BlockProps {
        style:     "h1".into(),
        list_item: Some("bullet".into()),
        level:     Some(1),
      },
    });
    round_trip(Operation::Select {
      before: None,
      after:  Some(Selection::collapsed(Point::span("b2", "s3", 3))),
    });
  }

  #[test]
  fn invalid_operations_leave_state_untouched() {
    let cases = vec![
      (
        Operation::InsertText {
          block:  "missing".into(),
          child:  "s1".into(),
          offset: 0,
          text:   "x".into(),
        },
        OperationError::MissingBlock("missing".into()),
      ),
      (
        Operation::InsertText {
          block:  "b1".into(),
          child:  "s1".into(),
          offset: 99,
          text:   "x".into(),
        },
        OperationError::OffsetOutOfBounds { offset: 99, len: 6 },
      ),
      (
        Operation::RemoveText {
          block:  "b1".into(),
          child:  "s1".into(),
          offset: 0,
          text:   "nope".into(),
        },
        OperationError::TextMismatch {
          offset:   0,
          expected: "nope".into(),
          found:    "héll".into(),
        },
      ),
      (
        Operation::InsertBlock {
          after: None,
          block: Block::Text(TextBlock::with_key("fresh").with_span(Span::with_key("s1", ""))),
        },
        OperationError::DuplicateKey("s1".into()),
      ),
      (
        Operation::MoveBlock {
          key:        "b1".into(),
          from_after: None,
          to_after:   Some("b1".into()),
        },
        OperationError::SelfAnchoredMove("b1".into()),
      ),
    ];

    for (op, expected) in cases {
      let mut state = state();
      let before = state.clone();
      assert_eq!(op.apply(&mut state), Err(expected));
      assert_eq!(state, before);
    }
  }

  #[test]
  fn patches_address_by_key() {
    let mut state = state();
    let patches = Operation::InsertText {
      block:  "b2".into(),
      child:  "s3".into(),
      offset: 0,
      text:   "a ".into(),
    }
    .apply(&mut state)
    .unwrap();
    assert_eq!(
      serde_json::to_value(&patches).unwrap(),
      serde_json::json!([{
        "type": "set",
        "path": [{ "_key": "b2" }, "children", { "_key": "s3" }, "text"],
        "value": "a second",
      }])
    );

    let patches = Operation::InsertBlock {
      after: Some("b1".into()),
      block: Block::Text(TextBlock::with_key("new").with_span(Span::with_key("n1", ""))),
    }
    .apply(&mut state)
    .unwrap();
    assert!(matches!(
      &patches[0],
      Patch::Insert {
        position: Position::After,
        ..
      }
    ));
    assert_eq!(state.document.block_index(&"new".into()), Some(1));
  }

  /// An arbitrary valid text edit against [`state`].
  #[derive(Debug, Clone)]
  struct TextEdit {
    span:   usize,
    offset: usize,
    len:    usize,
    text:   String,
  }

  impl Arbitrary for TextEdit {
    fn arbitrary(g: &mut Gen) -> Self {
      Self {
        span:   usize::arbitrary(g),
        offset: usize::arbitrary(g),
        len:    usize::arbitrary(g),
        text:   String::arbitrary(g),
      }
    }
  }

  quickcheck::quickcheck! {
    fn text_edits_invert_exactly(edit: TextEdit) -> bool {
      let spans = [("b1", "s1"), ("b1", "s2"), ("b2", "s3"), ("b3", "s4")];
      let (block, child) = spans[edit.span % spans.len()];
      let mut state = state();
      let original = state.clone();
      let span_text = state
        .document
        .text_block(&block.into())
        .and_then(|b| b.span(&child.into()))
        .map(|s| s.text.clone())
        .unwrap_or_default();
      let len = span_text.chars().count();
      let offset = edit.offset % (len + 1);
      let removed_len = edit.len % (len - offset + 1);

      let ops = vec![
        Operation::RemoveText {
          block:  block.into(),
          child:  child.into(),
          offset,
          text:   char_slice(&span_text, offset, offset + removed_len).to_owned(),
        },
        Operation::InsertText {
          block:  block.into(),
          child:  child.into(),
          offset,
          text:   edit.text.clone(),
        },
      ];
      for op in &ops {
        if op.apply(&mut state).is_err() {
          return false;
        }
      }
      for op in ops.iter().rev() {
        if op.invert().apply(&mut state).is_err() {
          return false;
        }
      }
      state == original
    }
  }
}
