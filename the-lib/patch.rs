//! Outbound document patches.
//!
//! Patches are the only channel through which rendering, persistence or a
//! collaboration layer observe mutations. Paths address blocks and children by
//! key, e.g. `[{"_key":"b1"},"children",{"_key":"s1"},"text"]`.

use serde::{
  Deserialize,
  Serialize,
};
use serde_json::Value;

use crate::{
  Tendril,
  key::Key,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
  Key {
    #[serde(rename = "_key")]
    key: Key,
  },
  Field(Tendril),
}

pub type PatchPath = Vec<PathSegment>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
  Before,
  After,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Patch {
  Insert {
    path:     PatchPath,
    position: Position,
    items:    Vec<Value>,
  },
  Set {
    path:  PatchPath,
    value: Value,
  },
  Unset {
    path: PatchPath,
  },
  Move {
    path:     PatchPath,
    position: Position,
    target:   PatchPath,
  },
}

impl Patch {
  pub fn path(&self) -> &PatchPath {
    match self {
      Self::Insert { path, .. }
      | Self::Set { path, .. }
      | Self::Unset { path }
      | Self::Move { path, .. } => path,
    }
  }
}

pub(crate) fn key(key: &Key) -> PathSegment {
  PathSegment::Key { key: key.clone() }
}

pub(crate) fn field(name: &str) -> PathSegment {
  PathSegment::Field(name.into())
}

pub(crate) fn block_path(block: &Key) -> PatchPath {
  vec![key(block)]
}

pub(crate) fn child_path(block: &Key, child: &Key) -> PatchPath {
  vec![key(block), field("children"), key(child)]
}

pub(crate) fn to_value<T: Serialize>(value: &T) -> Value {
  serde_json::to_value(value).unwrap_or(Value::Null)
}
