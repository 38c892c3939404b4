use std::{
  fmt,
  sync::atomic::{
    AtomicU64,
    Ordering,
  },
};

use serde::{
  Deserialize,
  Serialize,
};

use crate::Tendril;

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// Stable address of a block or child.
///
/// Keys are assigned at creation and survive every edit, unlike array
/// positions. Generated keys come from a process-wide counter and are never
/// handed out twice; caller supplied keys are accepted as-is and checked for
/// uniqueness when they enter a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(Tendril);

impl Key {
  pub fn new(key: impl Into<Tendril>) -> Self {
    Self(key.into())
  }

  /// A fresh key unique within this process.
  pub fn generate() -> Self {
    let id = NEXT_KEY.fetch_add(1, Ordering::Relaxed);
    Self(format!("k{id:x}").into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl From<&str> for Key {
  fn from(value: &str) -> Self {
    Self::new(value)
  }
}

impl fmt::Display for Key {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}
