//! Editor session configuration.
//!
//! A [`Config`] is read from a global and a local TOML file. Tables are merged
//! key by key with the local file winning; any other value in the local file
//! replaces the global one wholesale. A missing file is the same as an empty
//! one, a malformed file is an error.
//!
//! ```toml
//! [history]
//! limit = 200
//!
//! [behaviors]
//! tie_break = "first-registered"
//! markdown_shortcuts = false
//!
//! [schema]
//! styles = ["normal", "h1", "h2"]
//! ```

use std::{
  fs,
  io,
  path::Path,
};

use serde::{
  Deserialize,
  Serialize,
};
use the_default::Groups;
use the_lib::{
  TieBreak,
  document::Document,
  editor::Editor,
  history::DEFAULT_LIMIT,
  schema::Schema,
};
use thiserror::Error;
use toml::Value;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("bad config: {0}")]
  BadConfig(#[from] toml::de::Error),
  #[error("failed to read config: {0}")]
  Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  pub history:   HistoryConfig,
  pub behaviors: BehaviorConfig,
  pub schema:    Schema,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryConfig {
  /// Maximum number of undo steps kept. `0` keeps everything.
  pub limit: usize,
}

impl Default for HistoryConfig {
  fn default() -> Self {
    Self {
      limit: DEFAULT_LIMIT,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BehaviorConfig {
  pub tie_break:          TieBreak,
  /// Master switch for every built-in behavior.
  pub builtin:            bool,
  pub markdown_shortcuts: bool,
  pub hotkeys:            bool,
}

impl Default for BehaviorConfig {
  fn default() -> Self {
    Self {
      tie_break:          TieBreak::default(),
      builtin:            true,
      markdown_shortcuts: true,
      hotkeys:            true,
    }
  }
}

impl BehaviorConfig {
  pub fn groups(&self) -> Groups {
    if !self.builtin {
      return Groups::none();
    }
    Groups {
      core:               true,
      markdown_shortcuts: self.markdown_shortcuts,
      hotkeys:            self.hotkeys,
    }
  }
}

impl Config {
  /// Merge the contents of a global and a local config file. An I/O error
  /// stands for a missing file and is skipped.
  pub fn load(global: Result<String>, local: Result<String>) -> Result<Config> {
    let mut merged = Value::Table(Default::default());
    for (source, contents) in [("global", global), ("local", local)] {
      match contents {
        Ok(contents) => merged = merge_toml_values(merged, toml::from_str(&contents)?),
        Err(ConfigError::Io(err)) => debug!(source, %err, "config not read"),
        Err(err) => return Err(err),
      }
    }
    Ok(merged.try_into()?)
  }

  pub fn load_files(global: &Path, local: &Path) -> Result<Config> {
    let read = |path: &Path| fs::read_to_string(path).map_err(ConfigError::from);
    Config::load(read(global), read(local))
  }

  /// An editor over `document` with this configuration applied and the
  /// enabled built-in behaviors registered.
  pub fn build_editor(&self, document: Document) -> Editor {
    if self.history.limit == 0 {
      debug!("history limit is 0, undo history is unbounded");
    }
    let mut editor = Editor::with_schema(document, self.schema.clone())
      .with_history_limit(self.history.limit)
      .with_tie_break(self.behaviors.tie_break);
    the_default::register(&mut editor, self.behaviors.groups());
    editor
  }
}

/// Merge `right` into `left`: tables recursively, everything else replaced.
fn merge_toml_values(left: Value, right: Value) -> Value {
  match (left, right) {
    (Value::Table(mut left_map), Value::Table(right_map)) => {
      for (name, rvalue) in right_map {
        let merged = match left_map.remove(&name) {
          Some(lvalue) => merge_toml_values(lvalue, rvalue),
          None => rvalue,
        };
        left_map.insert(name, merged);
      }
      Value::Table(left_map)
    },
    (_, value) => value,
  }
}

#[cfg(test)]
mod tests {
  use the_lib::{
    Tendril,
    document::{
      Block,
      Span,
      TextBlock,
    },
    event::Event,
    selection::{
      Point,
      Selection,
    },
  };

  use super::*;

  fn missing() -> Result<String> {
    Err(io::Error::from(io::ErrorKind::NotFound).into())
  }

  #[test]
  fn defaults_without_files() {
    let config = Config::load(missing(), missing()).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.behaviors.groups(), Groups::default());
  }

  #[test]
  fn local_wins_per_key() {
    let global = r#"
      [history]
      limit = 10

      [behaviors]
      tie_break = "first-registered"
      hotkeys = false

      [schema]
      styles = ["normal", "h1"]
    "#;
    let local = r#"
      [behaviors]
      hotkeys = true
      markdown_shortcuts = false

      [schema]
      styles = ["normal"]
    "#;
    let config = Config::load(Ok(global.into()), Ok(local.into())).unwrap();
    assert_eq!(config.history.limit, 10);
    assert_eq!(config.behaviors.tie_break, TieBreak::FirstRegisteredFirst);
    assert!(config.behaviors.hotkeys);
    assert!(!config.behaviors.markdown_shortcuts);
    assert_eq!(config.schema.styles, vec![Tendril::from("normal")]);
    // untouched schema lists keep their defaults
    assert_eq!(config.schema.decorators, Schema::default().decorators);
  }

  #[test]
  fn rejects_unknown_and_malformed() {
    let unknown = Config::load(Ok("[history]\nsize = 3".into()), missing());
    assert!(matches!(unknown, Err(ConfigError::BadConfig(_))));
    let malformed = Config::load(missing(), Ok("[behaviors".into()));
    assert!(matches!(malformed, Err(ConfigError::BadConfig(_))));
  }

  #[test]
  fn builtin_switch_disables_all_groups() {
    let config = Config::load(Ok("[behaviors]\nbuiltin = false".into()), missing()).unwrap();
    assert_eq!(config.behaviors.groups(), Groups::none());
    let editor = config.build_editor(Document::default());
    assert_eq!(editor.behaviors().count(), 0);
  }

  #[test]
  fn build_editor_applies_settings() {
    let config = Config::load(Ok("[history]\nlimit = 1".into()), missing()).unwrap();
    let block = TextBlock::with_key("b1").with_span(Span::with_key("s1", ""));
    let mut editor = config.build_editor(Document::new(vec![Block::Text(block)]));
    assert_eq!(editor.history().limit(), 1);
    assert!(editor.behaviors().count() > 0);

    editor.send(Event::select(Selection::collapsed(Point::span("b1", "s1", 0))));
    editor.send(Event::insert_text("a"));
    editor.send(Event::insert_text("b"));
    assert_eq!(editor.history().undo_len(), 1);
    assert_eq!(editor.document().text(), "ab");
  }
}
