//! Structured document model.
//!
//! A [`Document`] is an ordered list of [`Block`]s. Text blocks own an ordered
//! list of [`Child`]ren (spans and inline objects); block objects carry an
//! opaque payload. Every block and child is addressed by its [`Key`].
//!
//! # Example
//!
//! ```
//! use the_lib::document::{
//!   Block,
//!   Document,
//!   Span,
//!   TextBlock,
//! };
//!
//! let doc = Document::new(vec![
//!   Block::Text(TextBlock::with_key("b1").with_span(Span::with_key("s1", "hello"))),
//!   Block::Text(TextBlock::with_key("b2").with_span(Span::with_key("s2", "world"))),
//! ]);
//!
//! assert_eq!(doc.text(), "hello\nworld");
//! assert_eq!(doc.block_index(&"b2".into()), Some(1));
//! ```

use serde::{
  Deserialize,
  Serialize,
};
use serde_json::{
  Map,
  Value,
};

use crate::{
  Tendril,
  key::Key,
  selection::{
    Path,
    Point,
    Selection,
  },
};

pub const DEFAULT_STYLE: &str = "normal";

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
  blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_type")]
pub enum Block {
  #[serde(rename = "block")]
  Text(TextBlock),
  #[serde(rename = "object")]
  Object(BlockObject),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
  #[serde(rename = "_key")]
  pub key:       Key,
  pub style:     Tendril,
  #[serde(rename = "listItem", default, skip_serializing_if = "Option::is_none")]
  pub list_item: Option<Tendril>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub level:     Option<u32>,
  #[serde(rename = "markDefs", default)]
  pub mark_defs: Vec<MarkDef>,
  #[serde(default)]
  pub children:  Vec<Child>,
}

/// The block-level properties a `block.set` can change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockProps {
  pub style:     Tendril,
  #[serde(rename = "listItem")]
  pub list_item: Option<Tendril>,
  pub level:     Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockObject {
  #[serde(rename = "_key")]
  pub key:   Key,
  pub name:  Tendril,
  #[serde(default)]
  pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_type")]
pub enum Child {
  #[serde(rename = "span")]
  Span(Span),
  #[serde(rename = "object")]
  Object(InlineObject),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
  #[serde(rename = "_key")]
  pub key:   Key,
  pub text:  String,
  /// Decorator names and annotation keys.
  #[serde(default)]
  pub marks: Vec<Tendril>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineObject {
  #[serde(rename = "_key")]
  pub key:   Key,
  pub name:  Tendril,
  #[serde(default)]
  pub value: Value,
}

/// An annotation instance, referenced from span marks by its key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkDef {
  #[serde(rename = "_key")]
  pub key:    Key,
  #[serde(rename = "_type")]
  pub name:   Tendril,
  #[serde(default)]
  pub fields: Map<String, Value>,
}

/// Document plus selection: the state every primitive operation transforms.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct State {
  pub document:  Document,
  pub selection: Option<Selection>,
}

impl State {
  pub fn new(document: Document) -> Self {
    Self {
      document,
      selection: None,
    }
  }
}

impl Document {
  pub fn new(blocks: Vec<Block>) -> Self {
    Self { blocks }
  }

  pub fn blocks(&self) -> &[Block] {
    &self.blocks
  }

  pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Block> {
    &mut self.blocks
  }

  pub fn len(&self) -> usize {
    self.blocks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.blocks.is_empty()
  }

  pub fn block_index(&self, key: &Key) -> Option<usize> {
    self.blocks.iter().position(|block| block.key() == key)
  }

  pub fn block(&self, key: &Key) -> Option<&Block> {
    self.blocks.iter().find(|block| block.key() == key)
  }

  pub fn block_mut(&mut self, key: &Key) -> Option<&mut Block> {
    self.blocks.iter_mut().find(|block| block.key() == key)
  }

  pub fn text_block(&self, key: &Key) -> Option<&TextBlock> {
    self.block(key).and_then(Block::as_text)
  }

  pub fn text_block_mut(&mut self, key: &Key) -> Option<&mut TextBlock> {
    self.block_mut(key).and_then(Block::as_text_mut)
  }

  /// Key of the block preceding `key`, `None` for the first block.
  pub fn previous_block_key(&self, key: &Key) -> Option<&Key> {
    let idx = self.block_index(key)?;
    idx.checked_sub(1).map(|prev| self.blocks[prev].key())
  }

  /// Whether `key` addresses any block or child.
  pub fn contains_key(&self, key: &Key) -> bool {
    self.blocks.iter().any(|block| {
      block.key() == key
        || block
          .as_text()
          .is_some_and(|text| text.children.iter().any(|child| child.key() == key))
    })
  }

  /// Plain text of every block, one line per block. Block objects render as
  /// an empty line.
  pub fn text(&self) -> String {
    self
      .blocks
      .iter()
      .map(|block| block.as_text().map(TextBlock::text).unwrap_or_default())
      .collect::<Vec<_>>()
      .join("\n")
  }
}

impl From<Vec<Block>> for Document {
  fn from(blocks: Vec<Block>) -> Self {
    Self::new(blocks)
  }
}

impl Block {
  pub fn key(&self) -> &Key {
    match self {
      Self::Text(block) => &block.key,
      Self::Object(object) => &object.key,
    }
  }

  pub fn as_text(&self) -> Option<&TextBlock> {
    match self {
      Self::Text(block) => Some(block),
      Self::Object(_) => None,
    }
  }

  pub fn as_text_mut(&mut self) -> Option<&mut TextBlock> {
    match self {
      Self::Text(block) => Some(block),
      Self::Object(_) => None,
    }
  }

  /// Every key owned by this block, the block's own key first.
  pub fn keys(&self) -> Vec<&Key> {
    let mut keys = vec![self.key()];
    if let Some(text) = self.as_text() {
      keys.extend(text.children.iter().map(Child::key));
    }
    keys
  }
}

impl TextBlock {
  /// An empty block holding a single empty span, with generated keys.
  pub fn new() -> Self {
    Self::with_key(Key::generate()).with_span(Span::new(""))
  }

  /// A block without children. Add at least one span before inserting it.
  pub fn with_key(key: impl Into<Key>) -> Self {
    Self {
      key:       key.into(),
      style:     DEFAULT_STYLE.into(),
      list_item: None,
      level:     None,
      mark_defs: Vec::new(),
      children:  Vec::new(),
    }
  }

  pub fn with_text(text: &str) -> Self {
    Self::with_key(Key::generate()).with_span(Span::new(text))
  }

  pub fn with_span(mut self, span: Span) -> Self {
    self.children.push(Child::Span(span));
    self
  }

  pub fn with_child(mut self, child: Child) -> Self {
    self.children.push(child);
    self
  }

  pub fn with_style(mut self, style: &str) -> Self {
    self.style = style.into();
    self
  }

  pub fn with_list_item(mut self, list_item: &str, level: u32) -> Self {
    self.list_item = Some(list_item.into());
    self.level = Some(level);
    self
  }

  pub fn props(&self) -> BlockProps {
    BlockProps {
      style:     self.style.clone(),
      list_item: self.list_item.clone(),
      level:     self.level,
    }
  }

  pub fn set_props(&mut self, props: BlockProps) {
    self.style = props.style;
    self.list_item = props.list_item;
    self.level = props.level;
  }

  pub fn child_index(&self, key: &Key) -> Option<usize> {
    self.children.iter().position(|child| child.key() == key)
  }

  pub fn child(&self, key: &Key) -> Option<&Child> {
    self.children.iter().find(|child| child.key() == key)
  }

  pub fn span(&self, key: &Key) -> Option<&Span> {
    self.child(key).and_then(Child::as_span)
  }

  pub fn span_mut(&mut self, key: &Key) -> Option<&mut Span> {
    self
      .children
      .iter_mut()
      .find(|child| child.key() == key)
      .and_then(Child::as_span_mut)
  }

  pub fn previous_child_key(&self, key: &Key) -> Option<&Key> {
    let idx = self.child_index(key)?;
    idx
      .checked_sub(1)
      .map(|prev| self.children[prev].key())
  }

  pub fn mark_def(&self, key: &str) -> Option<&MarkDef> {
    self.mark_defs.iter().find(|def| def.key.as_str() == key)
  }

  pub fn text(&self) -> String {
    self
      .children
      .iter()
      .filter_map(Child::as_span)
      .map(|span| span.text.as_str())
      .collect()
  }

  /// Caret positions in the block: chars of spans, one per inline object.
  pub fn len(&self) -> usize {
    self.children.iter().map(Child::len).sum()
  }

  /// Flat offset of a point inside this block, counting inline objects as
  /// one position. `None` when `child` is not in the block.
  pub fn flat_offset(&self, child: Option<&Key>, offset: usize) -> Option<usize> {
    match child {
      Some(child) => {
        let idx = self.child_index(child)?;
        let before: usize = self.children[..idx].iter().map(Child::len).sum();
        Some(before + offset.min(self.children[idx].len()))
      },
      None => Some(offset.min(self.len())),
    }
  }

  /// The point at flat offset `flat`, preferring span positions and, at a
  /// boundary between two spans, the end of the earlier one.
  pub fn point_at(&self, flat: usize) -> Point {
    let mut pos = 0;
    let mut object = None;
    for child in &self.children {
      let len = child.len();
      match child {
        Child::Span(span) if pos <= flat && flat <= pos + len => {
          return Point::span(self.key.clone(), span.key.clone(), flat - pos);
        },
        Child::Object(inline) if flat == pos && object.is_none() => object = Some(&inline.key),
        _ => {},
      }
      pos += len;
    }
    match (object, self.children.last()) {
      (Some(object), _) => Point::span(self.key.clone(), object.clone(), 0),
      (None, Some(last)) => Point::span(self.key.clone(), last.key().clone(), last.len()),
      (None, None) => Point::new(Path::block(self.key.clone()), 0),
    }
  }

  /// Span text covered by the flat range `[from, to)`.
  pub fn text_between(&self, from: usize, to: usize) -> String {
    let mut out = String::new();
    let mut pos = 0;
    for child in &self.children {
      let len = child.len();
      if let Child::Span(span) = child {
        let (a, b) = (from.max(pos), to.min(pos + len));
        if a < b {
          out.push_str(char_slice(&span.text, a - pos, b - pos));
        }
      }
      pos += len;
    }
    out
  }

  /// No inline objects and no text.
  pub fn is_empty(&self) -> bool {
    self
      .children
      .iter()
      .all(|child| child.as_span().is_some_and(|span| span.text.is_empty()))
  }
}

impl Default for TextBlock {
  fn default() -> Self {
    Self::new()
  }
}

impl Child {
  pub fn key(&self) -> &Key {
    match self {
      Self::Span(span) => &span.key,
      Self::Object(object) => &object.key,
    }
  }

  pub fn as_span(&self) -> Option<&Span> {
    match self {
      Self::Span(span) => Some(span),
      Self::Object(_) => None,
    }
  }

  pub fn as_span_mut(&mut self) -> Option<&mut Span> {
    match self {
      Self::Span(span) => Some(span),
      Self::Object(_) => None,
    }
  }

  /// Length in caret positions: chars for spans, one for inline objects.
  pub fn len(&self) -> usize {
    match self {
      Self::Span(span) => span.len(),
      Self::Object(_) => 1,
    }
  }
}

impl Span {
  pub fn new(text: &str) -> Self {
    Self::with_key(Key::generate(), text)
  }

  pub fn with_key(key: impl Into<Key>, text: &str) -> Self {
    Self {
      key:   key.into(),
      text:  text.to_owned(),
      marks: Vec::new(),
    }
  }

  pub fn with_marks<I, S>(mut self, marks: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<Tendril>,
  {
    self.marks = marks.into_iter().map(Into::into).collect();
    self
  }

  /// Length in chars.
  pub fn len(&self) -> usize {
    self.text.chars().count()
  }

  pub fn is_empty(&self) -> bool {
    self.text.is_empty()
  }

  pub fn has_mark(&self, mark: &str) -> bool {
    self.marks.iter().any(|m| m.as_str() == mark)
  }
}

/// Byte index of the char at `offset`, clamped to the end of `text`.
pub(crate) fn byte_offset(text: &str, offset: usize) -> usize {
  text
    .char_indices()
    .nth(offset)
    .map(|(idx, _)| idx)
    .unwrap_or(text.len())
}

/// The chars of `text` in `[from, to)`.
pub(crate) fn char_slice(text: &str, from: usize, to: usize) -> &str {
  let start = byte_offset(text, from);
  let end = byte_offset(text, to.max(from));
  &text[start..end]
}
