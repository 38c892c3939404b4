//! Key-addressed selections.
//!
//! A [`Point`] names a block, optionally a child inside it, and a char offset
//! into that child. A [`Selection`] is an anchor/focus pair of points.
//! Direction is derived from document order and never stored.

use std::cmp::Ordering;

use serde::{
  Deserialize,
  Serialize,
};

use crate::{
  document::Document,
  key::Key,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path {
  pub block: Key,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub child: Option<Key>,
}

impl Path {
  pub fn block(block: impl Into<Key>) -> Self {
    Self {
      block: block.into(),
      child: None,
    }
  }

  pub fn child(block: impl Into<Key>, child: impl Into<Key>) -> Self {
    Self {
      block: block.into(),
      child: Some(child.into()),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
  pub path:   Path,
  pub offset: usize,
}

impl Point {
  pub fn new(path: Path, offset: usize) -> Self {
    Self { path, offset }
  }

  /// Shorthand for a point inside a span.
  pub fn span(block: impl Into<Key>, span: impl Into<Key>, offset: usize) -> Self {
    Self::new(Path::child(block, span), offset)
  }

  /// Document order of two points. `None` when either point addresses a key
  /// that is not in `doc`.
  pub fn cmp_in(&self, other: &Point, doc: &Document) -> Option<Ordering> {
    Some(self.position(doc)?.cmp(&other.position(doc)?))
  }

  fn position(&self, doc: &Document) -> Option<(usize, usize, usize)> {
    let block_idx = doc.block_index(&self.path.block)?;
    let child_idx = match &self.path.child {
      Some(child) => {
        doc.blocks()[block_idx]
          .as_text()?
          .child_index(child)?
      },
      None => 0,
    };
    Some((block_idx, child_idx, self.offset))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
  pub anchor: Point,
  pub focus:  Point,
}

impl Selection {
  pub fn new(anchor: Point, focus: Point) -> Self {
    Self { anchor, focus }
  }

  pub fn collapsed(point: Point) -> Self {
    Self {
      anchor: point.clone(),
      focus:  point,
    }
  }

  pub fn is_collapsed(&self) -> bool {
    self.anchor == self.focus
  }

  /// Whether the focus precedes the anchor in `doc`.
  pub fn is_backward(&self, doc: &Document) -> bool {
    self.focus.cmp_in(&self.anchor, doc) == Some(Ordering::Less)
  }

  /// `(start, end)` in document order.
  pub fn ordered(&self, doc: &Document) -> (&Point, &Point) {
    if self.is_backward(doc) {
      (&self.focus, &self.anchor)
    } else {
      (&self.anchor, &self.focus)
    }
  }

  pub fn start(&self, doc: &Document) -> &Point {
    self.ordered(doc).0
  }

  pub fn end(&self, doc: &Document) -> &Point {
    self.ordered(doc).1
  }
}

impl From<Point> for Selection {
  fn from(point: Point) -> Self {
    Self::collapsed(point)
  }
}
