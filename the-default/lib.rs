//! Built-in behaviors for the editor.
//!
//! Everything here is an ordinary [`Behavior`] registered at
//! [`Priority::BUILTIN`], so any caller behavior at the default priority runs
//! first and can take over.

mod blocks;
mod hotkey;
mod lists;
mod markdown;

use serde::{
  Deserialize,
  Serialize,
};
use the_lib::{
  Priority,
  ScopeId,
  behavior::Behavior,
  editor::Editor,
};
use tracing::debug;

pub use hotkey::{
  Hotkey,
  HotkeyAction,
  KEYDOWN,
  ParseHotkeyError,
  default_hotkeys,
  hotkey_behaviors,
  keydown,
};

/// Which groups of built-ins to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Groups {
  /// List editing and splitting at block start.
  pub core:               bool,
  pub markdown_shortcuts: bool,
  pub hotkeys:            bool,
}

impl Default for Groups {
  fn default() -> Self {
    Self {
      core:               true,
      markdown_shortcuts: true,
      hotkeys:            true,
    }
  }
}

impl Groups {
  pub fn none() -> Self {
    Self {
      core:               false,
      markdown_shortcuts: false,
      hotkeys:            false,
    }
  }
}

pub fn behaviors(groups: Groups) -> Vec<Behavior> {
  let mut behaviors = Vec::new();
  if groups.core {
    behaviors.push(lists::unindent_on_backspace());
    behaviors.push(lists::exit_on_empty_split());
    behaviors.push(blocks::split_at_block_start());
  }
  if groups.markdown_shortcuts {
    behaviors.push(markdown::block_shortcuts());
  }
  if groups.hotkeys {
    behaviors.extend(hotkey_behaviors(default_hotkeys()));
  }
  debug_assert!(behaviors.iter().all(|b| b.priority == Priority::BUILTIN));
  behaviors
}

/// Install the selected built-ins under one scope, so they can be removed
/// together with [`Editor::unregister_scope`].
pub fn register(editor: &mut Editor, groups: Groups) -> ScopeId {
  let scope = editor.new_scope();
  let behaviors = behaviors(groups);
  debug!(count = behaviors.len(), ?groups, "registering built-in behaviors");
  for behavior in behaviors {
    editor.register_scoped(scope, behavior);
  }
  scope
}

#[cfg(test)]
mod tests {
  use the_lib::{
    behavior::Action,
    document::{
      Block,
      Document,
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

  fn editor() -> Editor {
    let block = TextBlock::with_key("b1").with_span(Span::with_key("s1", "hello"));
    let mut editor = Editor::new(Document::new(vec![Block::Text(block)]));
    register(&mut editor, Groups::default());
    editor
  }

  fn span(editor: &Editor) -> &Span {
    editor.document().text_block(&"b1".into()).unwrap().children[0]
      .as_span()
      .unwrap()
  }

  #[test]
  fn hotkeys_toggle_and_undo() {
    let mut editor = editor();
    editor.send(Event::select(Selection::new(
      Point::span("b1", "s1", 0),
      Point::span("b1", "s1", 5),
    )));
    editor.send(keydown("mod+b"));
    assert!(span(&editor).has_mark("strong"));

    editor.send(keydown("mod+z"));
    assert!(!span(&editor).has_mark("strong"));
    editor.send(keydown("mod+shift+z"));
    assert!(span(&editor).has_mark("strong"));

    // unbound combinations do nothing
    editor.send(keydown("mod+k"));
    assert_eq!(editor.history().undo_len(), 1);
  }

  #[test]
  fn caller_behavior_overrides_builtin() {
    let mut editor = editor();
    editor.register_behavior(Behavior::on(KEYDOWN).actions(|_, _| Ok(vec![Action::noop()])));
    editor.send(Event::select(Selection::new(
      Point::span("b1", "s1", 0),
      Point::span("b1", "s1", 5),
    )));
    editor.send(keydown("mod+b"));
    assert!(!span(&editor).has_mark("strong"));
  }

  #[test]
  fn scope_removes_everything() {
    let mut editor = Editor::new(Document::default());
    let scope = register(&mut editor, Groups::default());
    let count = behaviors(Groups::default()).len();
    assert_eq!(editor.behaviors().count(), count);
    assert_eq!(editor.unregister_scope(scope), count);
    assert_eq!(editor.behaviors().count(), 0);
    assert!(behaviors(Groups::none()).is_empty());
  }
}
