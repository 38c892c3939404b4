//! Default actions of the primitive events.
//!
//! A default action is a deterministic function of the current state, the
//! schema and the event payload. It is expressed as a sequence of primitive
//! [`Operation`]s which are applied one by one as they are generated, so each
//! step sees the effect of the previous ones. An operation that violates an
//! invariant is skipped and logged; the rest of the action still runs.
//!
//! Positions inside a text block are handled as *flat offsets*: spans count
//! their chars, inline objects count as one. Flat offsets survive span splits
//! and merges, which keeps range edits simple.

use tracing::{
  debug,
  warn,
};

use crate::{
  Tendril,
  document::{
    Block,
    BlockProps,
    Child,
    InlineObject,
    MarkDef,
    Span,
    State,
    TextBlock,
    char_slice,
  },
  event::{
    BlockSelect,
    DeleteUnit,
    Event,
    Placement,
  },
  grapheme,
  key::Key,
  operation::Operation,
  patch::Patch,
  schema::{
    Schema,
    fields_conform,
  },
  selection::{
    Path,
    Point,
    Selection,
  },
};

/// An operation that was applied, with the patches it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
  pub operation: Operation,
  pub patches:   Vec<Patch>,
}

/// Run the default action of `event` against `state`.
///
/// History events and custom events have no document-level default here and
/// yield nothing.
pub fn default_action(event: &Event, state: &mut State, schema: &Schema) -> Vec<Applied> {
  let mut tx = Transform {
    state,
    schema,
    applied: Vec::new(),
  };
  tx.run(event);
  tx.applied
}

/// Apply `op`, logging and skipping it when it violates an invariant.
pub(crate) fn apply_logged(op: Operation, state: &mut State) -> Option<Applied> {
  match op.apply(state) {
    Ok(patches) => {
      Some(Applied {
        operation: op,
        patches,
      })
    },
    Err(err) => {
      warn!(%err, ?op, "skipping operation");
      None
    },
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
  Add,
  Remove,
  Toggle,
}

/// A resolved point: block position plus flat offset for text blocks.
#[derive(Debug, Clone)]
struct Pos {
  block: Key,
  index: usize,
  flat:  Option<usize>,
}

#[derive(Debug, Clone)]
struct Range {
  start:    Pos,
  end:      Pos,
  backward: bool,
}

impl Range {
  fn is_collapsed(&self) -> bool {
    self.start.block == self.end.block && self.start.flat == self.end.flat
  }
}

struct ChildInfo {
  key:     Key,
  len:     usize,
  is_span: bool,
}

struct Transform<'a> {
  state:   &'a mut State,
  schema:  &'a Schema,
  applied: Vec<Applied>,
}

impl Transform<'_> {
  fn run(&mut self, event: &Event) {
    match event {
      Event::InsertText { text } => self.insert_text(text),
      Event::InsertBlock {
        block,
        placement,
        select,
      } => self.insert_block(block.clone(), *placement, *select),
      Event::InsertInlineObject { name, value } => self.insert_inline_object(name, value),
      Event::InsertSpan { text, marks } => self.insert_span(text, marks),
      Event::Delete { at } => self.delete(at),
      Event::DeleteBackward { unit } => self.delete_backward(*unit),
      Event::DeleteForward { unit } => self.delete_forward(*unit),
      Event::DeleteBlock { at } => self.delete_block(at),
      Event::Split { at } => self.split(at.as_ref()),
      Event::Select { at } => self.select(at.as_ref()),
      Event::MoveBlock { at, to, placement } => self.move_block(at, to, *placement),
      Event::DecoratorAdd { decorator } => self.decorate(decorator, Mode::Add),
      Event::DecoratorRemove { decorator } => self.decorate(decorator, Mode::Remove),
      Event::DecoratorToggle { decorator } => self.decorate(decorator, Mode::Toggle),
      Event::AnnotationAdd { name, fields } => self.annotation_add(name, fields),
      Event::AnnotationRemove { name } => self.annotation_remove(name),
      Event::StyleToggle { style } => self.style_toggle(style),
      Event::ListItemToggle { list_item } => self.list_item_toggle(list_item),
      Event::BlockSet { at, props } => self.block_set(at, props),
      Event::HistoryUndo | Event::HistoryRedo | Event::Custom { .. } => {},
    }
  }

  fn apply(&mut self, op: Operation) -> bool {
    match apply_logged(op, self.state) {
      Some(applied) => {
        self.applied.push(applied);
        true
      },
      None => false,
    }
  }

  // --- event handlers

  fn insert_text(&mut self, text: &str) {
    if text.is_empty() {
      return;
    }
    let Some(caret) = self.collapse_selection() else {
      return;
    };
    let Some(Pos {
      block,
      flat: Some(flat),
      ..
    }) = self.resolve(&caret)
    else {
      return;
    };
    let caret = self.insert_text_at(&block, &caret, flat, text);
    self.set_caret(Some(caret));
  }

  fn insert_span(&mut self, text: &str, marks: &[Tendril]) {
    let Some(caret) = self.collapse_selection() else {
      return;
    };
    let Some(Pos {
      block,
      flat: Some(flat),
      ..
    }) = self.resolve(&caret)
    else {
      return;
    };
    let idx = self.split_at_flat(&block, flat);
    let span = Span::new(text).with_marks(marks.iter().cloned());
    let key = span.key.clone();
    let len = span.len();
    if self.insert_child_at(&block, idx, Child::Span(span)) {
      self.set_caret(Some(Point::span(block, key, len)));
    }
  }

  fn insert_inline_object(&mut self, name: &Tendril, value: &serde_json::Value) {
    if self.schema.inline_object(name).is_none() {
      debug!(%name, "inline object type not in schema");
      return;
    }
    let Some(caret) = self.collapse_selection() else {
      return;
    };
    let Some(Pos {
      block,
      flat: Some(flat),
      ..
    }) = self.resolve(&caret)
    else {
      return;
    };
    let idx = self.split_at_flat(&block, flat);
    let object = InlineObject {
      key:   Key::generate(),
      name:  name.clone(),
      value: value.clone(),
    };
    if !self.insert_child_at(&block, idx, Child::Object(object)) {
      return;
    }

    // keep a span after the object so the caret has somewhere to go
    let next_span = self
      .children(&block)
      .get(idx + 1)
      .filter(|child| child.is_span)
      .map(|child| child.key.clone());
    let next_span = match next_span {
      Some(key) => Some(key),
      None => {
        let span = Span::new("");
        let key = span.key.clone();
        self
          .insert_child_at(&block, idx + 1, Child::Span(span))
          .then_some(key)
      },
    };
    if let Some(span) = next_span {
      self.set_caret(Some(Point::span(block, span, 0)));
    }
  }

  fn insert_block(&mut self, mut block: Block, placement: Placement, select: BlockSelect) {
    match &mut block {
      Block::Object(object) => {
        if self.schema.block_object(&object.name).is_none() {
          debug!(name = %object.name, "block object type not in schema");
          return;
        }
      },
      Block::Text(text) => {
        if text.children.is_empty() {
          text.children.push(Child::Span(Span::new("")));
        }
      },
    }

    let focus = self
      .state
      .selection
      .as_ref()
      .map(|selection| selection.focus.path.block.clone())
      .filter(|key| self.state.document.block_index(key).is_some());

    let (after, replace) = match focus {
      None => {
        let last = self
          .state
          .document
          .blocks()
          .last()
          .map(|block| block.key().clone());
        (last, None)
      },
      Some(focus) => {
        match placement {
          Placement::Before => (self.state.document.previous_block_key(&focus).cloned(), None),
          Placement::After => (Some(focus), None),
          Placement::Auto => {
            let empty = self
              .state
              .document
              .text_block(&focus)
              .is_some_and(TextBlock::is_empty);
            (Some(focus.clone()), empty.then_some(focus))
          },
        }
      },
    };

    let key = block.key().clone();
    if !self.apply(Operation::InsertBlock { after, block }) {
      return;
    }
    if let Some(replace) = &replace {
      self.remove_block(replace);
    }
    match select {
      BlockSelect::Start => self.set_caret(Some(self.block_start(&key))),
      BlockSelect::End => self.set_caret(Some(self.block_end(&key))),
      BlockSelect::None if replace.is_some() => self.set_caret(Some(self.block_start(&key))),
      BlockSelect::None => {},
    }
  }

  fn delete(&mut self, at: &Selection) {
    let Some(range) = self.range_of(at) else {
      return;
    };
    if range.is_collapsed() {
      return;
    }
    let caret = self.delete_range(&range);
    self.set_caret(caret);
  }

  fn delete_backward(&mut self, unit: DeleteUnit) {
    let Some(range) = self.range() else {
      return;
    };
    if !range.is_collapsed() {
      let caret = self.delete_range(&range);
      self.set_caret(caret);
      return;
    }
    let Pos { block, flat, index } = range.start;
    let Some(flat) = flat else {
      let caret = self.caret_outside(index, index);
      self.remove_block(&block);
      self.set_caret(caret);
      return;
    };

    let from = match unit {
      DeleteUnit::Character => grapheme::prev_grapheme_boundary(&self.flat_text(&block), flat),
      DeleteUnit::Word => grapheme::prev_word_boundary(&self.flat_text(&block), flat),
      DeleteUnit::Block => 0,
    };
    if from < flat {
      self.delete_flat(&block, from, flat);
      self.set_caret(Some(self.point_at(&block, from)));
    } else {
      self.merge_backward(&block);
    }
  }

  fn delete_forward(&mut self, unit: DeleteUnit) {
    let Some(range) = self.range() else {
      return;
    };
    if !range.is_collapsed() {
      let caret = self.delete_range(&range);
      self.set_caret(caret);
      return;
    }
    let Pos { block, flat, index } = range.start;
    let Some(flat) = flat else {
      let caret = self.caret_outside(index, index);
      self.remove_block(&block);
      self.set_caret(caret);
      return;
    };

    let len = self.block_len(&block);
    let to = match unit {
      DeleteUnit::Character => grapheme::next_grapheme_boundary(&self.flat_text(&block), flat),
      DeleteUnit::Word => grapheme::next_word_boundary(&self.flat_text(&block), flat),
      DeleteUnit::Block => len,
    };
    if flat < len && to > flat {
      self.delete_flat(&block, flat, to.min(len));
      self.set_caret(Some(self.point_at(&block, flat)));
    } else {
      self.merge_forward(&block, flat);
    }
  }

  fn delete_block(&mut self, at: &Key) {
    let Some(index) = self.state.document.block_index(at) else {
      return;
    };
    let focused = self
      .state
      .selection
      .as_ref()
      .is_some_and(|selection| selection.anchor.path.block == *at || selection.focus.path.block == *at);
    let caret = self.caret_outside(index, index);
    if self.remove_block(at) && focused {
      self.set_caret(caret);
    }
  }

  fn split(&mut self, at: Option<&Selection>) {
    if let Some(at) = at {
      if self.range_of(at).is_none() {
        return;
      }
      self.set_caret_selection(Some(at.clone()));
    }
    let Some(caret) = self.collapse_selection() else {
      return;
    };
    let Some(pos) = self.resolve(&caret) else {
      return;
    };

    let Some(flat) = pos.flat else {
      let mut block = TextBlock::new();
      block.style = self.schema.default_style();
      let key = block.key.clone();
      if self.apply(Operation::InsertBlock {
        after: Some(pos.block),
        block: Block::Text(block),
      }) {
        self.set_caret(Some(self.block_start(&key)));
      }
      return;
    };

    let idx = self.split_at_flat(&pos.block, flat);
    let Some(source) = self.state.document.text_block(&pos.block) else {
      return;
    };
    let props = source.props();
    let moved_keys: Vec<Key> = source.children[idx..]
      .iter()
      .map(|child| child.key().clone())
      .collect();

    let mut moved = Vec::new();
    for key in moved_keys.iter().rev() {
      if let Some(child) = self.remove_child(&pos.block, key) {
        moved.push(child);
      }
    }
    moved.reverse();
    if moved.is_empty() {
      moved.push(Child::Span(Span::new("")));
    }
    let mark_defs = self.referenced_mark_defs(&pos.block, &moved);

    let mut block = TextBlock::with_key(Key::generate());
    block.set_props(props);
    block.mark_defs = mark_defs;
    block.children = moved;
    let key = block.key.clone();

    self.ensure_child(&pos.block);
    if self.apply(Operation::InsertBlock {
      after: Some(pos.block),
      block: Block::Text(block),
    }) {
      self.set_caret(Some(self.block_start(&key)));
    }
  }

  fn select(&mut self, at: Option<&Selection>) {
    if let Some(at) = at {
      if self.range_of(at).is_none() {
        debug!(?at, "ignoring selection of unknown keys");
        return;
      }
    }
    self.set_caret_selection(at.cloned());
  }

  fn move_block(&mut self, at: &Key, to: &Key, placement: Placement) {
    let doc = &self.state.document;
    if at == to || doc.block_index(at).is_none() || doc.block_index(to).is_none() {
      return;
    }
    let from_after = doc.previous_block_key(at).cloned();
    let to_after = match placement {
      Placement::Before => {
        let others: Vec<&Key> = doc
          .blocks()
          .iter()
          .map(Block::key)
          .filter(|key| *key != at)
          .collect();
        others
          .iter()
          .position(|key| *key == to)
          .and_then(|idx| idx.checked_sub(1))
          .map(|idx| others[idx].clone())
      },
      Placement::After | Placement::Auto => Some(to.clone()),
    };
    if to_after == from_after {
      return;
    }
    self.apply(Operation::MoveBlock {
      key: at.clone(),
      from_after,
      to_after,
    });
  }

  fn decorate(&mut self, decorator: &Tendril, mode: Mode) {
    if !self.schema.has_decorator(decorator) {
      debug!(%decorator, "decorator not in schema");
      return;
    }
    let Some(range) = self.range() else {
      return;
    };
    if range.is_collapsed() {
      debug!(%decorator, "decorating a collapsed selection is a no-op");
      return;
    }

    let spans = self.split_range(&range);
    let add = match mode {
      Mode::Add => true,
      Mode::Remove => false,
      Mode::Toggle => {
        !spans
          .iter()
          .all(|(block, span)| self.span(block, span).is_some_and(|s| s.has_mark(decorator)))
      },
    };
    for (block, span) in &spans {
      let Some(before) = self.span(block, span).map(|s| s.marks.clone()) else {
        continue;
      };
      let mut after = before.clone();
      if add {
        if !after.contains(decorator) {
          after.push(decorator.clone());
        }
      } else {
        after.retain(|mark| mark != decorator);
      }
      if after != before {
        self.apply(Operation::SetMarks {
          block: block.clone(),
          child: span.clone(),
          before,
          after,
        });
      }
    }
    self.restore_range(&range);
  }

  fn annotation_add(&mut self, name: &Tendril, fields: &serde_json::Map<String, serde_json::Value>) {
    let Some(declared) = self.schema.annotation(name) else {
      debug!(%name, "annotation type not in schema");
      return;
    };
    if !fields_conform(&declared.fields, fields) {
      debug!(%name, "annotation fields do not match the schema");
      return;
    }
    let Some(range) = self.range() else {
      return;
    };
    if range.is_collapsed() {
      return;
    }

    let spans = self.split_range(&range);
    let mut blocks: Vec<Key> = spans.iter().map(|(block, _)| block.clone()).collect();
    blocks.dedup();
    for block in blocks {
      let Some(before) = self
        .state
        .document
        .text_block(&block)
        .map(|b| b.mark_defs.clone())
      else {
        continue;
      };
      let def = MarkDef {
        key:    Key::generate(),
        name:   name.clone(),
        fields: fields.clone(),
      };
      let mark: Tendril = def.key.as_str().into();
      let mut after = before.clone();
      after.push(def);
      if !self.apply(Operation::SetMarkDefs {
        block: block.clone(),
        before,
        after,
      }) {
        continue;
      }
      for (_, span) in spans.iter().filter(|(b, _)| *b == block) {
        let Some(before) = self.span(&block, span).map(|s| s.marks.clone()) else {
          continue;
        };
        let mut after = before.clone();
        after.push(mark.clone());
        self.apply(Operation::SetMarks {
          block: block.clone(),
          child: span.clone(),
          before,
          after,
        });
      }
    }
    self.restore_range(&range);
  }

  fn annotation_remove(&mut self, name: &Tendril) {
    let Some(range) = self.range() else {
      return;
    };

    // (block, span) pairs whose marks are inspected, and the annotation keys to
    // strip from them
    let targets: Vec<(Key, Key)> = if range.is_collapsed() {
      let Some(caret) = self.state.selection.as_ref().map(|s| s.focus.clone()) else {
        return;
      };
      let Some(block) = self.state.document.text_block(&caret.path.block) else {
        return;
      };
      let focus_marks: Vec<Tendril> = caret
        .path
        .child
        .as_ref()
        .and_then(|child| block.span(child))
        .map(|span| span.marks.clone())
        .unwrap_or_default();
      let wanted: Vec<&Tendril> = focus_marks
        .iter()
        .filter(|mark| block.mark_def(mark).is_some_and(|def| def.name == *name))
        .collect();
      block
        .children
        .iter()
        .filter_map(Child::as_span)
        .filter(|span| span.marks.iter().any(|mark| wanted.contains(&mark)))
        .map(|span| (block.key.clone(), span.key.clone()))
        .collect()
    } else {
      self.split_range(&range)
    };

    let mut touched: Vec<Key> = Vec::new();
    for (block, span) in &targets {
      let Some(text) = self.state.document.text_block(block) else {
        continue;
      };
      let Some(before) = text.span(span).map(|s| s.marks.clone()) else {
        continue;
      };
      let after: Vec<Tendril> = before
        .iter()
        .filter(|mark| !text.mark_def(mark).is_some_and(|def| def.name == *name))
        .cloned()
        .collect();
      if after != before {
        self.apply(Operation::SetMarks {
          block: block.clone(),
          child: span.clone(),
          before,
          after,
        });
        if !touched.contains(block) {
          touched.push(block.clone());
        }
      }
    }

    for block in touched {
      let Some(text) = self.state.document.text_block(&block) else {
        continue;
      };
      let used = |key: &Key| {
        text
          .children
          .iter()
          .filter_map(Child::as_span)
          .any(|span| span.has_mark(key.as_str()))
      };
      let before = text.mark_defs.clone();
      let after: Vec<MarkDef> = before
        .iter()
        .filter(|def| def.name != *name || used(&def.key))
        .cloned()
        .collect();
      if after != before {
        self.apply(Operation::SetMarkDefs {
          block,
          before,
          after,
        });
      }
    }
    if !range.is_collapsed() {
      self.restore_range(&range);
    }
  }

  fn style_toggle(&mut self, style: &Tendril) {
    if !self.schema.has_style(style) {
      debug!(%style, "style not in schema");
      return;
    }
    let blocks = self.selected_text_blocks();
    let all_set = blocks.iter().all(|(_, props)| props.style == *style);
    let target = if all_set {
      self.schema.default_style()
    } else {
      style.clone()
    };
    for (key, props) in blocks {
      self.set_props(&key, BlockProps {
        style: target.clone(),
        ..props
      });
    }
  }

  fn list_item_toggle(&mut self, list_item: &Tendril) {
    if !self.schema.has_list(list_item) {
      debug!(%list_item, "list item not in schema");
      return;
    }
    let blocks = self.selected_text_blocks();
    let all_set = blocks
      .iter()
      .all(|(_, props)| props.list_item.as_ref() == Some(list_item));
    for (key, props) in blocks {
      let after = if all_set {
        BlockProps {
          list_item: None,
          level: None,
          ..props
        }
      } else {
        BlockProps {
          list_item: Some(list_item.clone()),
          level: props.level.or(Some(1)),
          ..props
        }
      };
      self.set_props(&key, after);
    }
  }

  fn block_set(&mut self, at: &Key, props: &BlockProps) {
    if !self.schema.has_style(&props.style) {
      debug!(style = %props.style, "style not in schema");
      return;
    }
    if let Some(list_item) = &props.list_item {
      if !self.schema.has_list(list_item) {
        debug!(%list_item, "list item not in schema");
        return;
      }
    }
    self.set_props(at, props.clone());
  }

  // --- structural helpers

  fn merge_backward(&mut self, block: &Key) {
    let Some(prev) = self.state.document.previous_block_key(block).cloned() else {
      return;
    };
    let Some(current_empty) = self
      .state
      .document
      .text_block(block)
      .map(TextBlock::is_empty)
    else {
      return;
    };
    // `None` for a block object, otherwise whether the text block is empty
    let previous_empty = match self.state.document.block(&prev) {
      Some(Block::Object(_)) => None,
      Some(Block::Text(previous)) => Some(previous.is_empty()),
      None => return,
    };
    match previous_empty {
      None => {
        self.remove_block(&prev);
      },
      Some(_) if current_empty => {
        let caret = self.block_end(&prev);
        self.remove_block(block);
        self.set_caret(Some(caret));
      },
      Some(true) => {
        self.remove_block(&prev);
        self.set_caret(Some(self.block_start(block)));
      },
      Some(false) => {
        let len = self.block_len(&prev);
        self.move_children(block, &prev);
        self.remove_block(block);
        self.set_caret(Some(self.point_at(&prev, len)));
      },
    }
  }

  fn merge_forward(&mut self, block: &Key, flat: usize) {
    let Some(idx) = self.state.document.block_index(block) else {
      return;
    };
    let Some(next) = self
      .state
      .document
      .blocks()
      .get(idx + 1)
      .map(|b| b.key().clone())
    else {
      return;
    };
    let current_empty = self
      .state
      .document
      .text_block(block)
      .is_some_and(TextBlock::is_empty);
    let next_empty = match self.state.document.block(&next) {
      Some(Block::Object(_)) => None,
      Some(Block::Text(following)) => Some(following.is_empty()),
      None => return,
    };
    match next_empty {
      None | Some(true) => {
        self.remove_block(&next);
      },
      Some(false) if current_empty => {
        self.remove_block(block);
        self.set_caret(Some(self.block_start(&next)));
      },
      Some(false) => {
        self.move_children(&next, block);
        self.remove_block(&next);
        self.set_caret(Some(self.point_at(block, flat)));
      },
    }
  }

  /// Delete the content covered by `range`, returning where the caret ends up.
  fn delete_range(&mut self, range: &Range) -> Option<Point> {
    let Range { start, end, .. } = range;
    if start.block == end.block {
      return match (start.flat, end.flat) {
        (Some(from), Some(to)) => {
          self.delete_flat(&start.block, from, to);
          Some(self.point_at(&start.block, from))
        },
        _ => {
          let caret = self.caret_outside(start.index, end.index);
          self.remove_block(&start.block);
          caret
        },
      };
    }

    let middle: Vec<Key> = self.state.document.blocks()[start.index + 1..end.index]
      .iter()
      .map(|block| block.key().clone())
      .collect();
    let outside = self.caret_outside(start.index, end.index);
    for key in &middle {
      self.remove_block(key);
    }

    match (start.flat, end.flat) {
      (Some(from), Some(to)) => {
        let len = self.block_len(&start.block);
        self.delete_flat(&start.block, from, len);
        self.delete_flat(&end.block, 0, to);
        self.move_children(&end.block, &start.block);
        self.remove_block(&end.block);
        Some(self.point_at(&start.block, from))
      },
      (Some(from), None) => {
        let len = self.block_len(&start.block);
        self.delete_flat(&start.block, from, len);
        self.remove_block(&end.block);
        Some(self.point_at(&start.block, from))
      },
      (None, Some(to)) => {
        self.delete_flat(&end.block, 0, to);
        self.remove_block(&start.block);
        Some(self.point_at(&end.block, 0))
      },
      (None, None) => {
        self.remove_block(&start.block);
        self.remove_block(&end.block);
        outside
      },
    }
  }

  /// Remove the flat range `[from, to)` of a text block. Spans emptied by the
  /// removal are dropped, as long as the block keeps at least one child.
  fn delete_flat(&mut self, block: &Key, from: usize, to: usize) {
    if from >= to {
      return;
    }
    let children = self.children(block);
    let mut pos = 0;
    let mut emptied = Vec::new();
    let mut objects = Vec::new();
    let mut removals = Vec::new();
    for child in &children {
      let (start, end) = (pos, pos + child.len);
      pos = end;
      let (a, b) = (from.max(start), to.min(end));
      if a >= b {
        continue;
      }
      if child.is_span {
        removals.push((child.key.clone(), a - start, b - a));
        if a == start && b == end {
          emptied.push(child.key.clone());
        }
      } else {
        objects.push(child.key.clone());
      }
    }

    for (span, offset, len) in removals {
      let Some(text) = self.span(block, &span).map(|s| s.text.clone()) else {
        continue;
      };
      self.apply(Operation::RemoveText {
        block: block.clone(),
        child: span,
        offset,
        text: char_slice(&text, offset, offset + len).to_owned(),
      });
    }

    if emptied.len() + objects.len() == children.len() && !emptied.is_empty() {
      emptied.remove(0);
    }
    for key in objects.iter().chain(&emptied) {
      self.remove_child(block, key);
    }
    self.ensure_child(block);
  }

  /// Split the child at `flat` so a child boundary falls there, returning the
  /// index of the first child at or after `flat`.
  fn split_at_flat(&mut self, block: &Key, flat: usize) -> usize {
    let children = self.children(block);
    let mut pos = 0;
    for (idx, child) in children.iter().enumerate() {
      if flat == pos {
        return idx;
      }
      if flat < pos + child.len {
        if !child.is_span {
          return idx;
        }
        let offset = flat - pos;
        let Some(span) = self.span(block, &child.key).cloned() else {
          return idx;
        };
        let tail = char_slice(&span.text, offset, child.len).to_owned();
        let right = Span::new(&tail).with_marks(span.marks.iter().cloned());
        if self.apply(Operation::RemoveText {
          block: block.clone(),
          child: child.key.clone(),
          offset,
          text: tail,
        }) {
          self.apply(Operation::InsertChild {
            block: block.clone(),
            after: Some(child.key.clone()),
            child: Child::Span(right),
          });
        }
        return idx + 1;
      }
      pos += child.len;
    }
    children.len()
  }

  /// Split at both ends of `range` and return every span inside it.
  fn split_range(&mut self, range: &Range) -> Vec<(Key, Key)> {
    let keys: Vec<Key> = self.state.document.blocks()[range.start.index..=range.end.index]
      .iter()
      .map(|block| block.key().clone())
      .collect();
    let mut spans = Vec::new();
    for key in keys {
      if self.state.document.text_block(&key).is_none() {
        continue;
      }
      let from = if key == range.start.block {
        range.start.flat.unwrap_or(0)
      } else {
        0
      };
      let to = if key == range.end.block {
        range.end.flat.unwrap_or(0)
      } else {
        self.block_len(&key)
      };
      if from >= to {
        continue;
      }
      let first = self.split_at_flat(&key, from);
      let last = self.split_at_flat(&key, to);
      let children = self.children(&key);
      spans.extend(
        children[first..last]
          .iter()
          .filter(|child| child.is_span)
          .map(|child| (key.clone(), child.key.clone())),
      );
    }
    spans
  }

  fn insert_text_at(&mut self, block: &Key, caret: &Point, flat: usize, text: &str) -> Point {
    let inserted = text.chars().count();
    if let Some(child) = &caret.path.child {
      let fits = self.span(block, child).is_some_and(|span| caret.offset <= span.len());
      if fits
        && self.apply(Operation::InsertText {
          block:  block.clone(),
          child:  child.clone(),
          offset: caret.offset,
          text:   text.to_owned(),
        })
      {
        return Point::span(block.clone(), child.clone(), caret.offset + inserted);
      }
    }

    let mut pos = 0;
    for child in self.children(block) {
      if child.is_span && pos <= flat && flat <= pos + child.len {
        let offset = flat - pos;
        if self.apply(Operation::InsertText {
          block: block.clone(),
          child: child.key.clone(),
          offset,
          text: text.to_owned(),
        }) {
          return Point::span(block.clone(), child.key, offset + inserted);
        }
      }
      pos += child.len;
    }

    let idx = self.split_at_flat(block, flat);
    let span = Span::new(text);
    let key = span.key.clone();
    if self.insert_child_at(block, idx, Child::Span(span)) {
      Point::span(block.clone(), key, inserted)
    } else {
      self.point_at(block, flat)
    }
  }

  /// Move every child of `from` to the end of `to`, carrying over the mark
  /// definitions they reference.
  fn move_children(&mut self, from: &Key, to: &Key) {
    let keys: Vec<Key> = self
      .children(from)
      .into_iter()
      .map(|child| child.key)
      .collect();
    let mut moved = Vec::new();
    for key in &keys {
      if let Some(child) = self.remove_child(from, key) {
        moved.push(child);
      }
    }

    let needed = self.referenced_mark_defs(from, &moved);
    if let Some(before) = self.state.document.text_block(to).map(|b| b.mark_defs.clone()) {
      let mut after = before.clone();
      for def in needed {
        if !after.iter().any(|existing| existing.key == def.key) {
          after.push(def);
        }
      }
      if after != before {
        self.apply(Operation::SetMarkDefs {
          block: to.clone(),
          before,
          after,
        });
      }
    }

    for child in moved {
      let after = self
        .state
        .document
        .text_block(to)
        .and_then(|b| b.children.last())
        .map(|c| c.key().clone());
      self.apply(Operation::InsertChild {
        block: to.clone(),
        after,
        child,
      });
    }
  }

  fn referenced_mark_defs(&self, block: &Key, children: &[Child]) -> Vec<MarkDef> {
    let Some(text) = self.state.document.text_block(block) else {
      return Vec::new();
    };
    text
      .mark_defs
      .iter()
      .filter(|def| {
        children
          .iter()
          .filter_map(Child::as_span)
          .any(|span| span.has_mark(def.key.as_str()))
      })
      .cloned()
      .collect()
  }

  fn insert_child_at(&mut self, block: &Key, idx: usize, child: Child) -> bool {
    let after = idx
      .checked_sub(1)
      .and_then(|prev| self.children(block).get(prev).map(|c| c.key.clone()));
    self.apply(Operation::InsertChild {
      block: block.clone(),
      after,
      child,
    })
  }

  fn remove_child(&mut self, block: &Key, key: &Key) -> Option<Child> {
    let text = self.state.document.text_block(block)?;
    let child = text.child(key)?.clone();
    let after = text.previous_child_key(key).cloned();
    self
      .apply(Operation::RemoveChild {
        block: block.clone(),
        after,
        child: child.clone(),
      })
      .then_some(child)
  }

  fn remove_block(&mut self, key: &Key) -> bool {
    let Some(block) = self.state.document.block(key).cloned() else {
      return false;
    };
    let after = self.state.document.previous_block_key(key).cloned();
    self.apply(Operation::RemoveBlock { after, block })
  }

  /// Give an emptied text block a fresh empty span.
  fn ensure_child(&mut self, block: &Key) {
    if self
      .state
      .document
      .text_block(block)
      .is_some_and(|b| b.children.is_empty())
    {
      self.apply(Operation::InsertChild {
        block: block.clone(),
        after: None,
        child: Child::Span(Span::new("")),
      });
    }
  }

  fn set_props(&mut self, key: &Key, after: BlockProps) {
    let Some(before) = self.state.document.text_block(key).map(TextBlock::props) else {
      return;
    };
    if before != after {
      self.apply(Operation::SetBlock {
        key: key.clone(),
        before,
        after,
      });
    }
  }

  // --- selection helpers

  fn set_caret(&mut self, caret: Option<Point>) {
    self.set_caret_selection(caret.map(Selection::collapsed));
  }

  fn set_caret_selection(&mut self, selection: Option<Selection>) {
    if self.state.selection != selection {
      self.apply(Operation::Select {
        before: self.state.selection.clone(),
        after:  selection,
      });
    }
  }

  /// Delete an expanded selection and return the caret; a collapsed selection
  /// returns its focus.
  fn collapse_selection(&mut self) -> Option<Point> {
    let range = self.range()?;
    if range.is_collapsed() {
      return self.state.selection.as_ref().map(|s| s.focus.clone());
    }
    let caret = self.delete_range(&range);
    self.set_caret(caret.clone());
    caret
  }

  /// Rebuild the selection from the flat offsets of `range`, after span splits
  /// moved its points to other children.
  fn restore_range(&mut self, range: &Range) {
    let point = |tx: &Self, pos: &Pos| {
      match pos.flat {
        Some(flat) => tx.point_at(&pos.block, flat),
        None => Point::new(Path::block(pos.block.clone()), 0),
      }
    };
    let start = point(self, &range.start);
    let end = point(self, &range.end);
    let selection = if range.backward {
      Selection::new(end, start)
    } else {
      Selection::new(start, end)
    };
    self.set_caret_selection(Some(selection));
  }

  fn range(&self) -> Option<Range> {
    let selection = self.state.selection.clone()?;
    self.range_of(&selection)
  }

  fn range_of(&self, selection: &Selection) -> Option<Range> {
    let doc = &self.state.document;
    let backward = selection.is_backward(doc);
    let (start, end) = selection.ordered(doc);
    Some(Range {
      start: self.resolve(start)?,
      end: self.resolve(end)?,
      backward,
    })
  }

  fn resolve(&self, point: &Point) -> Option<Pos> {
    let doc = &self.state.document;
    let index = doc.block_index(&point.path.block)?;
    let flat = match &doc.blocks()[index] {
      Block::Text(text) => Some(text.flat_offset(point.path.child.as_ref(), point.offset)?),
      Block::Object(_) => None,
    };
    Some(Pos {
      block: point.path.block.clone(),
      index,
      flat,
    })
  }

  fn point_at(&self, block: &Key, flat: usize) -> Point {
    match self.state.document.text_block(block) {
      Some(text) => text.point_at(flat),
      None => Point::new(Path::block(block.clone()), 0),
    }
  }

  fn block_start(&self, key: &Key) -> Point {
    match self.state.document.block(key) {
      Some(Block::Text(_)) => self.point_at(key, 0),
      _ => Point::new(Path::block(key.clone()), 0),
    }
  }

  fn block_end(&self, key: &Key) -> Point {
    match self.state.document.block(key) {
      Some(Block::Text(_)) => self.point_at(key, self.block_len(key)),
      _ => Point::new(Path::block(key.clone()), 0),
    }
  }

  /// Caret for when blocks `first..=last` disappear: the end of the block
  /// before them, else the start of the block after them.
  fn caret_outside(&self, first: usize, last: usize) -> Option<Point> {
    let blocks = self.state.document.blocks();
    if let Some(prev) = first.checked_sub(1).and_then(|idx| blocks.get(idx)) {
      return Some(self.block_end(prev.key()));
    }
    blocks
      .get(last + 1)
      .map(|next| self.block_start(next.key()))
  }

  fn selected_text_blocks(&self) -> Vec<(Key, BlockProps)> {
    let Some(range) = self.range() else {
      return Vec::new();
    };
    self.state.document.blocks()[range.start.index..=range.end.index]
      .iter()
      .filter_map(Block::as_text)
      .map(|block| (block.key.clone(), block.props()))
      .collect()
  }

  // --- lookups

  fn children(&self, block: &Key) -> Vec<ChildInfo> {
    self
      .state
      .document
      .text_block(block)
      .map(|text| {
        text
          .children
          .iter()
          .map(|child| {
            ChildInfo {
              key:     child.key().clone(),
              len:     child.len(),
              is_span: child.as_span().is_some(),
            }
          })
          .collect()
      })
      .unwrap_or_default()
  }

  fn span(&self, block: &Key, span: &Key) -> Option<&Span> {
    self.state.document.text_block(block)?.span(span)
  }

  fn block_len(&self, block: &Key) -> usize {
    self.state.document.text_block(block).map_or(0, TextBlock::len)
  }

  fn flat_text(&self, block: &Key) -> String {
    let Some(text) = self.state.document.text_block(block) else {
      return String::new();
    };
    let mut flat = String::new();
    for child in &text.children {
      match child {
        Child::Span(span) => flat.push_str(&span.text),
        Child::Object(_) => flat.push(grapheme::OBJECT_CHAR),
      }
    }
    flat
  }
}

#[cfg(test)]
mod test {
  use serde_json::json;

  use super::*;
  use crate::document::{
    BlockObject,
    Document,
  };

  fn state(blocks: Vec<Block>, selection: Option<Selection>) -> State {
    State {
      document: Document::new(blocks),
      selection,
    }
  }

  fn text(key: &str, spans: &[(&str, &str)]) -> Block {
    let mut block = TextBlock::with_key(key);
    for (span, content) in spans {
      block = block.with_span(Span::with_key(*span, content));
    }
    Block::Text(block)
  }

  fn caret(block: &str, span: &str, offset: usize) -> Option<Selection> {
    Some(Selection::collapsed(Point::span(block, span, offset)))
  }

  fn run(state: &mut State, event: Event) -> Vec<Applied> {
    default_action(&event, state, &Schema::default())
  }

  fn invert_all(state: &mut State, applied: &[Applied]) {
    for applied in applied.iter().rev() {
      applied.operation.invert().apply(state).unwrap();
    }
  }

  #[test]
  fn insert_text_at_caret() {
    let mut state = state(vec![text("b1", &[("s1", "helo")])], caret("b1", "s1", 3));
    run(&mut state, Event::insert_text("l"));
    assert_eq!(state.document.text(), "hello");
    assert_eq!(state.selection, caret("b1", "s1", 4));
  }

  #[test]
  fn insert_text_without_selection_is_noop() {
    let mut state = state(vec![text("b1", &[("s1", "x")])], None);
    assert!(run(&mut state, Event::insert_text("y")).is_empty());
  }

  #[test]
  fn insert_text_replaces_expanded_selection() {
    let mut state = state(
      vec![text("b1", &[("s1", "hello world")])],
      Some(Selection::new(Point::span("b1", "s1", 6), Point::span("b1", "s1", 11))),
    );
    run(&mut state, Event::insert_text("rust"));
    assert_eq!(state.document.text(), "hello rust");
    assert_eq!(state.selection, caret("b1", "s1", 10));
  }

  #[test]
  fn delete_across_blocks_merges_remainder() {
    let mut state = state(
      vec![
        text("b1", &[("s1", "abc")]),
        text("b2", &[("s2", "middle")]),
        text("b3", &[("s3", "xyz")]),
      ],
      None,
    );
    let original = state.clone();
    let applied = run(&mut state, Event::Delete {
      at: Selection::new(Point::span("b3", "s3", 1), Point::span("b1", "s1", 1)),
    });
    assert_eq!(state.document.text(), "ayz");
    assert_eq!(state.document.len(), 1);
    assert_eq!(state.selection, caret("b1", "s1", 1));

    invert_all(&mut state, &applied);
    assert_eq!(state, original);
  }

  #[test]
  fn delete_backward_character_and_merge() {
    let mut state = state(
      vec![text("b1", &[("s1", "ab")]), text("b2", &[("s2", "cd")])],
      caret("b2", "s2", 1),
    );
    run(&mut state, Event::delete_backward());
    assert_eq!(state.document.text(), "ab\nd");
    assert_eq!(state.selection, caret("b2", "s2", 0));

    run(&mut state, Event::delete_backward());
    assert_eq!(state.document.text(), "abd");
    assert_eq!(state.selection, caret("b1", "s1", 2));
  }

  #[test]
  fn delete_backward_word() {
    let mut state = state(vec![text("b1", &[("s1", "hello big  world")])], caret("b1", "s1", 16));
    run(&mut state, Event::DeleteBackward {
      unit: DeleteUnit::Word,
    });
    assert_eq!(state.document.text(), "hello big  ");
    run(&mut state, Event::DeleteBackward {
      unit: DeleteUnit::Word,
    });
    assert_eq!(state.document.text(), "hello ");
  }

  #[test]
  fn delete_forward_removes_next_object_block() {
    let mut state = state(
      vec![
        text("b1", &[("s1", "ab")]),
        Block::Object(BlockObject {
          key:   "img".into(),
          name:  "image".into(),
          value: json!({}),
        }),
      ],
      caret("b1", "s1", 2),
    );
    run(&mut state, Event::delete_forward());
    assert_eq!(state.document.len(), 1);
    assert_eq!(state.selection, caret("b1", "s1", 2));
  }

  #[test]
  fn split_moves_tail_into_new_block() {
    let mut state = state(
      vec![text("b1", &[("s1", "hello "), ("s2", "world")])],
      caret("b1", "s1", 3),
    );
    let original = state.clone();
    let applied = run(&mut state, Event::split());
    assert_eq!(state.document.text(), "hel\nlo world");
    let new_block = state.document.blocks()[1].key().clone();
    assert_eq!(
      state.selection.as_ref().unwrap().focus.path.block,
      new_block
    );
    assert_eq!(state.selection.as_ref().unwrap().focus.offset, 0);

    invert_all(&mut state, &applied);
    assert_eq!(state, original);
  }

  #[test]
  fn toggle_decorator_splits_spans() {
    let mut state = state(
      vec![text("b1", &[("s1", "hello world")])],
      Some(Selection::new(Point::span("b1", "s1", 6), Point::span("b1", "s1", 11))),
    );
    run(&mut state, Event::decorator_toggle("strong"));
    let block = state.document.text_block(&"b1".into()).unwrap().clone();
    assert_eq!(block.children.len(), 2);
    let bold = block.children[1].as_span().unwrap();
    assert_eq!(bold.text, "world");
    assert!(bold.has_mark("strong"));
    assert_eq!(block.text(), "hello world");

    // toggling again removes it, the text stays put
    run(&mut state, Event::decorator_toggle("strong"));
    let block = state.document.text_block(&"b1".into()).unwrap();
    assert!(
      block
        .children
        .iter()
        .filter_map(Child::as_span)
        .all(|span| !span.has_mark("strong"))
    );
  }

  #[test]
  fn unknown_decorator_is_noop() {
    let mut state = state(
      vec![text("b1", &[("s1", "hello")])],
      Some(Selection::new(Point::span("b1", "s1", 0), Point::span("b1", "s1", 5))),
    );
    assert!(run(&mut state, Event::decorator_toggle("blink")).is_empty());
  }

  #[test]
  fn annotation_add_and_remove() {
    let mut state = state(
      vec![text("b1", &[("s1", "see docs")])],
      Some(Selection::new(Point::span("b1", "s1", 4), Point::span("b1", "s1", 8))),
    );
    let fields = json!({ "href": "https://example.com" });
    run(&mut state, Event::AnnotationAdd {
      name:   "link".into(),
      fields: fields.as_object().cloned().unwrap(),
    });
    let block = state.document.text_block(&"b1".into()).unwrap().clone();
    assert_eq!(block.mark_defs.len(), 1);
    let def = &block.mark_defs[0];
    let linked = block.children[1].as_span().unwrap();
    assert_eq!(linked.text, "docs");
    assert!(linked.has_mark(def.key.as_str()));

    // collapsed caret inside the link removes the whole annotation
    state.selection = caret("b1", linked.key.as_str(), 2);
    run(&mut state, Event::AnnotationRemove {
      name: "link".into(),
    });
    let block = state.document.text_block(&"b1".into()).unwrap();
    assert!(block.mark_defs.is_empty());
    assert!(
      block
        .children
        .iter()
        .filter_map(Child::as_span)
        .all(|span| span.marks.is_empty())
    );
  }

  #[test]
  fn style_and_list_toggle() {
    let mut state = state(
      vec![text("b1", &[("s1", "a")]), text("b2", &[("s2", "b")])],
      Some(Selection::new(Point::span("b1", "s1", 0), Point::span("b2", "s2", 1))),
    );
    run(&mut state, Event::StyleToggle { style: "h1".into() });
    assert!(
      state
        .document
        .blocks()
        .iter()
        .all(|b| b.as_text().unwrap().style.as_str() == "h1")
    );
    run(&mut state, Event::StyleToggle { style: "h1".into() });
    assert!(
      state
        .document
        .blocks()
        .iter()
        .all(|b| b.as_text().unwrap().style.as_str() == "normal")
    );

    run(&mut state, Event::ListItemToggle {
      list_item: "bullet".into(),
    });
    let first = state.document.text_block(&"b1".into()).unwrap();
    assert_eq!(first.list_item.as_deref(), Some("bullet"));
    assert_eq!(first.level, Some(1));
  }

  #[test]
  fn insert_block_auto_replaces_empty_focus() {
    let mut state = state(vec![text("b1", &[("s1", "")])], caret("b1", "s1", 0));
    let image = Block::Object(BlockObject {
      key:   "img".into(),
      name:  "image".into(),
      value: json!({ "src": "a.png" }),
    });
    run(&mut state, Event::insert_block(image));
    assert_eq!(state.document.len(), 1);
    assert_eq!(state.document.blocks()[0].key().as_str(), "img");
    assert_eq!(
      state.selection,
      Some(Selection::collapsed(Point::new(Path::block("img"), 0)))
    );
  }

  #[test]
  fn inline_object_gets_trailing_span() {
    let mut state = state(vec![text("b1", &[("s1", "ab")])], caret("b1", "s1", 1));
    run(&mut state, Event::InsertInlineObject {
      name:  "stock-ticker".into(),
      value: json!({ "symbol": "NVDA" }),
    });
    let block = state.document.text_block(&"b1".into()).unwrap();
    assert_eq!(block.children.len(), 3);
    assert!(block.children[1].as_span().is_none());
    assert_eq!(block.text(), "ab");
    let focus = &state.selection.as_ref().unwrap().focus;
    assert_eq!(focus.path.child.as_ref(), Some(block.children[2].key()));
  }

  #[test]
  fn move_block_before() {
    let mut state = state(
      vec![
        text("b1", &[("s1", "1")]),
        text("b2", &[("s2", "2")]),
        text("b3", &[("s3", "3")]),
      ],
      None,
    );
    run(&mut state, Event::MoveBlock {
      at:        "b3".into(),
      to:        "b1".into(),
      placement: Placement::Before,
    });
    assert_eq!(state.document.text(), "3\n1\n2");
  }

  #[test]
  fn delete_character_removes_whole_graphemes() {
    let cases = [
      // regional indicator pair
      ("a🇺🇸", 3),
      // combining acute accent
      ("xe\u{301}", 3),
      // man, zwj, woman, zwj, girl
      ("q👨\u{200d}👩\u{200d}👧", 6),
    ];
    for (content, end) in cases {
      let head: String = content.chars().take(1).collect();

      let mut backward = state(vec![text("b1", &[("s1", content)])], caret("b1", "s1", end));
      run(&mut backward, Event::delete_backward());
      assert_eq!(backward.document.text(), head, "backward over {content:?}");
      assert_eq!(backward.selection, caret("b1", "s1", 1));

      let mut forward = state(vec![text("b1", &[("s1", content)])], caret("b1", "s1", 1));
      run(&mut forward, Event::delete_forward());
      assert_eq!(forward.document.text(), head, "forward over {content:?}");
      assert_eq!(forward.selection, caret("b1", "s1", 1));
    }
  }

  #[test]
  fn delete_word_stops_at_inline_object() {
    let mut state = state(vec![text("b1", &[("s1", "foo bar")])], caret("b1", "s1", 4));
    run(&mut state, Event::InsertInlineObject {
      name:  "stock-ticker".into(),
      value: json!({ "symbol": "NVDA" }),
    });
    run(&mut state, Event::DeleteBackward {
      unit: DeleteUnit::Word,
    });
    assert_eq!(state.document.text(), "foo bar");
    assert_eq!(state.document.text_block(&"b1".into()).unwrap().len(), 7);
    run(&mut state, Event::DeleteBackward {
      unit: DeleteUnit::Word,
    });
    assert_eq!(state.document.text(), "bar");
  }

  #[test]
  fn delete_block_moves_focused_caret() {
    let mut state = state(
      vec![text("b1", &[("s1", "ab")]), text("b2", &[("s2", "cd")])],
      caret("b2", "s2", 1),
    );
    let applied = run(&mut state, Event::DeleteBlock { at: "b2".into() });
    assert_eq!(state.document.text(), "ab");
    assert_eq!(state.selection, caret("b1", "s1", 2));

    invert_all(&mut state, &applied);
    assert_eq!(state.document.text(), "ab\ncd");
    assert_eq!(state.selection, caret("b2", "s2", 1));

    // an unfocused block goes without touching the selection
    run(&mut state, Event::DeleteBlock { at: "b1".into() });
    assert_eq!(state.document.text(), "cd");
    assert_eq!(state.selection, caret("b2", "s2", 1));

    assert!(run(&mut state, Event::DeleteBlock { at: "gone".into() }).is_empty());
  }

  #[test]
  fn block_set_checks_schema() {
    let mut state = state(vec![text("b1", &[("s1", "ab")])], None);
    let props = BlockProps {
      style:     "h2".into(),
      list_item: Some("number".into()),
      level:     Some(2),
    };
    let applied = run(&mut state, Event::BlockSet {
      at:    "b1".into(),
      props: props.clone(),
    });
    assert_eq!(applied.len(), 1);
    assert_eq!(state.document.text_block(&"b1".into()).unwrap().props(), props);

    // setting the same props again changes nothing
    assert!(
      run(&mut state, Event::BlockSet {
        at:    "b1".into(),
        props: props.clone(),
      })
      .is_empty()
    );

    for props in [
      BlockProps {
        style:     "h9".into(),
        list_item: None,
        level:     None,
      },
      BlockProps {
        style:     "normal".into(),
        list_item: Some("checkbox".into()),
        level:     Some(1),
      },
    ] {
      assert!(
        run(&mut state, Event::BlockSet {
          at: "b1".into(),
          props,
        })
        .is_empty()
      );
    }

    invert_all(&mut state, &applied);
    assert_eq!(state.document.text_block(&"b1".into()).unwrap().style.as_str(), "normal");
  }

  #[test]
  fn insert_span_splits_at_caret() {
    let mut state = state(vec![text("b1", &[("s1", "ad")])], caret("b1", "s1", 1));
    let applied = run(&mut state, Event::InsertSpan {
      text:  "bc".into(),
      marks: vec!["strong".into()],
    });
    assert_eq!(state.document.text(), "abcd");

    let block = state.document.text_block(&"b1".into()).unwrap();
    assert_eq!(block.children.len(), 3);
    let Child::Span(inserted) = &block.children[1] else {
      panic!("expected a span");
    };
    assert_eq!(inserted.text, "bc");
    assert_eq!(inserted.marks, vec![Tendril::from("strong")]);
    assert_eq!(
      state.selection,
      Some(Selection::collapsed(Point::span("b1", inserted.key.clone(), 2)))
    );

    invert_all(&mut state, &applied);
    assert_eq!(state.document.text(), "ad");
    assert_eq!(state.selection, caret("b1", "s1", 1));
  }
}
