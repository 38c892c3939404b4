//! Read-only views of the editor state.
//!
//! Guards and action-set builders only ever see a [`Snapshot`]. It borrows the
//! committed state, so nothing can observe a half-applied dispatch through it.

use crate::{
  document::{
    Block,
    Child,
    Document,
    Span,
    State,
    TextBlock,
  },
  key::Key,
  schema::Schema,
  selection::Selection,
};

#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
  pub document:  &'a Document,
  pub selection: Option<&'a Selection>,
  pub schema:    &'a Schema,
}

/// Owned copy of a [`Snapshot`], for effects and outbound consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedSnapshot {
  pub document:  Document,
  pub selection: Option<Selection>,
  pub schema:    Schema,
}

impl<'a> Snapshot<'a> {
  pub fn new(state: &'a State, schema: &'a Schema) -> Self {
    Self {
      document: &state.document,
      selection: state.selection.as_ref(),
      schema,
    }
  }

  pub fn into_owned(self) -> OwnedSnapshot {
    OwnedSnapshot {
      document:  self.document.clone(),
      selection: self.selection.cloned(),
      schema:    self.schema.clone(),
    }
  }

  pub fn is_collapsed(&self) -> bool {
    self.selection.is_some_and(Selection::is_collapsed)
  }

  pub fn focus_block(&self) -> Option<&'a Block> {
    self.document.block(&self.selection?.focus.path.block)
  }

  pub fn focus_text_block(&self) -> Option<&'a TextBlock> {
    self.focus_block().and_then(Block::as_text)
  }

  pub fn focus_child(&self) -> Option<&'a Child> {
    let child = self.selection?.focus.path.child.as_ref()?;
    self.focus_text_block()?.child(child)
  }

  pub fn focus_span(&self) -> Option<&'a Span> {
    self.focus_child().and_then(Child::as_span)
  }

  /// Caret position of the focus inside its text block, counting inline
  /// objects as one.
  pub fn focus_offset(&self) -> Option<usize> {
    let focus = &self.selection?.focus;
    self
      .focus_text_block()?
      .flat_offset(focus.path.child.as_ref(), focus.offset)
  }

  /// Text of the focus block up to the caret.
  pub fn text_before_focus(&self) -> Option<String> {
    let offset = self.focus_offset()?;
    Some(self.focus_text_block()?.text_between(0, offset))
  }

  pub fn block_index(&self, key: &Key) -> Option<usize> {
    self.document.block_index(key)
  }

  pub fn previous_block(&self, key: &Key) -> Option<&'a Block> {
    let idx = self.document.block_index(key)?;
    idx
      .checked_sub(1)
      .and_then(|prev| self.document.blocks().get(prev))
  }

  pub fn next_block(&self, key: &Key) -> Option<&'a Block> {
    let idx = self.document.block_index(key)?;
    self.document.blocks().get(idx + 1)
  }

  /// Text blocks touched by the selection, in document order.
  pub fn selected_text_blocks(&self) -> Vec<&'a TextBlock> {
    let Some((first, last)) = self.selected_block_range() else {
      return Vec::new();
    };
    self.document.blocks()[first..=last]
      .iter()
      .filter_map(Block::as_text)
      .collect()
  }

  /// Plain text covered by the selection, one line per block.
  pub fn selection_text(&self) -> String {
    let Some(selection) = self.selection else {
      return String::new();
    };
    let (start, end) = selection.ordered(self.document);
    self
      .selected_text_blocks()
      .into_iter()
      .map(|block| {
        let from = if block.key == start.path.block {
          block
            .flat_offset(start.path.child.as_ref(), start.offset)
            .unwrap_or(0)
        } else {
          0
        };
        let to = if block.key == end.path.block {
          block
            .flat_offset(end.path.child.as_ref(), end.offset)
            .unwrap_or(0)
        } else {
          block.len()
        };
        block.text_between(from, to)
      })
      .collect::<Vec<_>>()
      .join("\n")
  }

  /// Whether every span in the selection carries `decorator`. For a collapsed
  /// selection, whether the focus span does.
  pub fn is_decorator_active(&self, decorator: &str) -> bool {
    if self.is_collapsed() {
      return self.focus_span().is_some_and(|span| span.has_mark(decorator));
    }
    let spans = self.selected_spans();
    !spans.is_empty() && spans.iter().all(|span| span.has_mark(decorator))
  }

  pub fn is_style_active(&self, style: &str) -> bool {
    let blocks = self.selected_text_blocks();
    !blocks.is_empty() && blocks.iter().all(|block| block.style.as_str() == style)
  }

  pub fn is_list_item_active(&self, list_item: &str) -> bool {
    let blocks = self.selected_text_blocks();
    !blocks.is_empty()
      && blocks
        .iter()
        .all(|block| block.list_item.as_deref() == Some(list_item))
  }

  fn selected_block_range(&self) -> Option<(usize, usize)> {
    let selection = self.selection?;
    let (start, end) = selection.ordered(self.document);
    Some((
      self.document.block_index(&start.path.block)?,
      self.document.block_index(&end.path.block)?,
    ))
  }

  /// Non-empty spans with at least one char inside the selection.
  fn selected_spans(&self) -> Vec<&'a Span> {
    let Some(selection) = self.selection else {
      return Vec::new();
    };
    let (start, end) = selection.ordered(self.document);
    let mut spans = Vec::new();
    for block in self.selected_text_blocks() {
      let from = if block.key == start.path.block {
        block
          .flat_offset(start.path.child.as_ref(), start.offset)
          .unwrap_or(0)
      } else {
        0
      };
      let to = if block.key == end.path.block {
        block
          .flat_offset(end.path.child.as_ref(), end.offset)
          .unwrap_or(0)
      } else {
        block.len()
      };
      let mut pos = 0;
      for child in &block.children {
        let len = child.len();
        if let Child::Span(span) = child {
          if from.max(pos) < to.min(pos + len) {
            spans.push(span);
          }
        }
        pos += len;
      }
    }
    spans
  }
}

impl OwnedSnapshot {
  pub fn as_snapshot(&self) -> Snapshot<'_> {
    Snapshot {
      document:  &self.document,
      selection: self.selection.as_ref(),
      schema:    &self.schema,
    }
  }
}
