use std::fmt;

use smartstring::{
  LazyCompact,
  SmartString,
};

pub type EventType = SmartString<LazyCompact>;

/// Which event types a registration reacts to.
///
/// Event types are dot-separated names such as `insert.text` or
/// `custom.mention.open`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventPattern {
  /// Matches exactly one event type.
  Exact(EventType),
  /// `"ns.*"`: matches any type below the namespace `ns`, at any depth.
  Namespace(EventType),
  /// `"*"`: matches every event.
  Any,
}

impl EventPattern {
  /// Parse a pattern string.
  ///
  /// `"*"` is universal, a trailing `".*"` denotes a namespace and anything
  /// else is an exact type.
  pub fn parse(pattern: &str) -> Self {
    if pattern == "*" {
      return Self::Any;
    }
    match pattern.strip_suffix(".*") {
      Some(namespace) if !namespace.is_empty() => Self::Namespace(namespace.into()),
      _ => Self::Exact(pattern.into()),
    }
  }

  pub fn matches(&self, event_type: &str) -> bool {
    match self {
      Self::Exact(ty) => ty.as_str() == event_type,
      Self::Namespace(namespace) => {
        event_type
          .strip_prefix(namespace.as_str())
          .is_some_and(|rest| rest.starts_with('.') && rest.len() > 1)
      },
      Self::Any => true,
    }
  }
}

impl From<&str> for EventPattern {
  fn from(value: &str) -> Self {
    Self::parse(value)
  }
}

impl fmt::Display for EventPattern {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Exact(ty) => f.write_str(ty),
      Self::Namespace(namespace) => write!(f, "{namespace}.*"),
      Self::Any => f.write_str("*"),
    }
  }
}

/// Every namespace an event type belongs to, innermost last.
///
/// `"a.b.c"` yields `"a"` and `"a.b"`.
pub(crate) fn namespaces(event_type: &str) -> impl Iterator<Item = &str> {
  event_type
    .match_indices('.')
    .map(move |(idx, _)| &event_type[..idx])
    .filter(|namespace| !namespace.is_empty())
}
