//! Document intents.
//!
//! Every built-in variant of [`Event`] is a primitive type with a default
//! action (see [`crate::transform`]). [`Event::Custom`] carries caller defined
//! types such as `custom.mention.open`; those have no default action and only
//! do something when a behavior reacts to them.

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
  document::{
    Block,
    BlockProps,
  },
  key::Key,
  selection::Selection,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
  Before,
  After,
  /// After the focus block, replacing it when it is an empty text block.
  #[default]
  Auto,
}

/// Where the caret goes after `insert.block`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockSelect {
  #[default]
  Start,
  End,
  None,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteUnit {
  #[default]
  Character,
  Word,
  /// Everything between the caret and the block boundary.
  Block,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
  InsertText {
    text: String,
  },
  InsertBlock {
    block:     Block,
    placement: Placement,
    select:    BlockSelect,
  },
  InsertInlineObject {
    name:  Tendril,
    value: Value,
  },
  InsertSpan {
    text:  String,
    marks: Vec<Tendril>,
  },
  Delete {
    at: Selection,
  },
  DeleteBackward {
    unit: DeleteUnit,
  },
  DeleteForward {
    unit: DeleteUnit,
  },
  DeleteBlock {
    at: Key,
  },
  Split {
    at: Option<Selection>,
  },
  Select {
    at: Option<Selection>,
  },
  MoveBlock {
    at:        Key,
    to:        Key,
    placement: Placement,
  },
  DecoratorAdd {
    decorator: Tendril,
  },
  DecoratorRemove {
    decorator: Tendril,
  },
  DecoratorToggle {
    decorator: Tendril,
  },
  AnnotationAdd {
    name:   Tendril,
    fields: Map<String, Value>,
  },
  AnnotationRemove {
    name: Tendril,
  },
  StyleToggle {
    style: Tendril,
  },
  ListItemToggle {
    list_item: Tendril,
  },
  BlockSet {
    at:    Key,
    props: BlockProps,
  },
  HistoryUndo,
  HistoryRedo,
  Custom {
    name:    Tendril,
    payload: Value,
  },
}

impl Event {
  pub fn custom(name: impl Into<Tendril>, payload: Value) -> Self {
    Self::Custom {
      name: name.into(),
      payload,
    }
  }

  pub fn insert_text(text: impl Into<String>) -> Self {
    Self::InsertText { text: text.into() }
  }

  pub fn insert_block(block: Block) -> Self {
    Self::InsertBlock {
      block,
      placement: Placement::default(),
      select: BlockSelect::default(),
    }
  }

  pub fn select(at: impl Into<Option<Selection>>) -> Self {
    Self::Select { at: at.into() }
  }

  pub fn delete_backward() -> Self {
    Self::DeleteBackward {
      unit: DeleteUnit::Character,
    }
  }

  pub fn delete_forward() -> Self {
    Self::DeleteForward {
      unit: DeleteUnit::Character,
    }
  }

  pub fn split() -> Self {
    Self::Split { at: None }
  }

  pub fn decorator_toggle(decorator: impl Into<Tendril>) -> Self {
    Self::DecoratorToggle {
      decorator: decorator.into(),
    }
  }

  /// The type tag behaviors match against.
  pub fn event_type(&self) -> &str {
    match self {
      Self::InsertText { .. } => "insert.text",
      Self::InsertBlock { .. } => "insert.block",
      Self::InsertInlineObject { .. } => "insert.inline_object",
      Self::InsertSpan { .. } => "insert.span",
      Self::Delete { .. } => "delete",
      Self::DeleteBackward { .. } => "delete.backward",
      Self::DeleteForward { .. } => "delete.forward",
      Self::DeleteBlock { .. } => "delete.block",
      Self::Split { .. } => "split",
      Self::Select { .. } => "select",
      Self::MoveBlock { .. } => "move.block",
      Self::DecoratorAdd { .. } => "decorator.add",
      Self::DecoratorRemove { .. } => "decorator.remove",
      Self::DecoratorToggle { .. } => "decorator.toggle",
      Self::AnnotationAdd { .. } => "annotation.add",
      Self::AnnotationRemove { .. } => "annotation.remove",
      Self::StyleToggle { .. } => "style.toggle",
      Self::ListItemToggle { .. } => "list_item.toggle",
      Self::BlockSet { .. } => "block.set",
      Self::HistoryUndo => "history.undo",
      Self::HistoryRedo => "history.redo",
      Self::Custom { name, .. } => name,
    }
  }

  /// Whether the event has a default action.
  pub fn is_primitive(&self) -> bool {
    !matches!(self, Self::Custom { .. })
  }

  pub fn is_history(&self) -> bool {
    matches!(self, Self::HistoryUndo | Self::HistoryRedo)
  }

  /// Payload of a custom event.
  pub fn payload(&self) -> Option<&Value> {
    match self {
      Self::Custom { payload, .. } => Some(payload),
      _ => None,
    }
  }
}
