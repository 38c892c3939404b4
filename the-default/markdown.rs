//! Markdown-style block shortcuts.
//!
//! Typing a space right after a marker at the start of a block (`#`, `##`,
//! `###`, `>`, `-`, `1.`) turns the block into the matching style or list
//! item. The space is inserted first as its own undo step; the marker removal
//! and block change follow in a second step, so a single undo brings the
//! literal marker back.

use the_lib::{
  Priority,
  Tendril,
  behavior::{
    Action,
    Behavior,
    Payload,
  },
  document::BlockProps,
  event::Event,
  schema::Schema,
  selection::Selection,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Shortcut {
  Style(Tendril),
  List(Tendril),
}

const SHORTCUTS: &[(&str, bool, &str)] = &[
  ("#", false, "h1"),
  ("##", false, "h2"),
  ("###", false, "h3"),
  (">", false, "blockquote"),
  ("-", true, "bullet"),
  ("1.", true, "number"),
];

fn shortcut(marker: &str, schema: &Schema) -> Option<Shortcut> {
  let (_, list, name) = SHORTCUTS.iter().find(|(prefix, ..)| *prefix == marker)?;
  if *list {
    schema.has_list(name).then(|| Shortcut::List((*name).into()))
  } else {
    schema.has_style(name).then(|| Shortcut::Style((*name).into()))
  }
}

pub fn block_shortcuts() -> Behavior {
  Behavior::on("insert.text")
    .named("markdown block shortcut")
    .priority(Priority::BUILTIN)
    .guard(|ctx| {
      if !matches!(ctx.event, Event::InsertText { text } if text == " ") || !ctx.snapshot.is_collapsed() {
        return Ok(None);
      }
      let Some(before) = ctx.snapshot.text_before_focus() else {
        return Ok(None);
      };
      // inline objects before the caret take a position but no text
      if ctx.snapshot.focus_offset() != Some(before.chars().count()) {
        return Ok(None);
      }
      Ok(
        shortcut(&before, ctx.snapshot.schema)
          .map(|shortcut| Payload::new((shortcut, before.chars().count()))),
      )
    })
    .actions(|_, _| Ok(vec![Action::execute(Event::insert_text(" "))]))
    .actions(|ctx, payload| {
      let (shortcut, marker_len) = payload
        .get::<(Shortcut, usize)>()
        .ok_or_else(|| anyhow::anyhow!("missing shortcut payload"))?;
      let Some(block) = ctx.snapshot.focus_text_block() else {
        return Ok(Vec::new());
      };
      let props = match shortcut {
        Shortcut::Style(style) => {
          BlockProps {
            style: style.clone(),
            ..block.props()
          }
        },
        Shortcut::List(list) => {
          BlockProps {
            list_item: Some(list.clone()),
            level: Some(block.level.unwrap_or(1)),
            ..block.props()
          }
        },
      };
      Ok(vec![
        Action::execute(Event::Delete {
          at: Selection::new(block.point_at(0), block.point_at(marker_len + 1)),
        }),
        Action::execute(Event::BlockSet {
          at: block.key.clone(),
          props,
        }),
      ])
    })
}

#[cfg(test)]
mod tests {
  use the_lib::{
    document::{
      Block,
      Document,
      Span,
      TextBlock,
    },
    editor::Editor,
    selection::Point,
  };

  use super::*;

  fn typed(text: &str) -> Editor {
    let block = TextBlock::with_key("b1").with_span(Span::with_key("s1", ""));
    let mut editor = Editor::new(Document::new(vec![Block::Text(block)]));
    editor.register_behavior(block_shortcuts());
    editor.send(Event::select(Selection::collapsed(Point::span("b1", "s1", 0))));
    for ch in text.chars() {
      editor.send(Event::insert_text(ch.to_string()));
    }
    editor
  }

  fn block(editor: &Editor) -> &TextBlock {
    editor.document().blocks()[0].as_text().unwrap()
  }

  #[test]
  fn heading_marker() {
    let editor = typed("## ");
    assert_eq!(block(&editor).style.as_str(), "h2");
    assert_eq!(block(&editor).text(), "");
  }

  #[test]
  fn list_marker() {
    let editor = typed("1. x");
    assert_eq!(block(&editor).list_item.as_deref(), Some("number"));
    assert_eq!(block(&editor).level, Some(1));
    assert_eq!(block(&editor).text(), "x");
  }

  #[test]
  fn undo_restores_marker() {
    let mut editor = typed("> ");
    assert_eq!(block(&editor).style.as_str(), "blockquote");
    editor.undo();
    assert_eq!(block(&editor).style.as_str(), "normal");
    assert_eq!(block(&editor).text(), "> ");
    editor.undo();
    assert_eq!(block(&editor).text(), ">");
  }

  #[test]
  fn marker_mid_text_is_plain() {
    let editor = typed("a# ");
    assert_eq!(block(&editor).style.as_str(), "normal");
    assert_eq!(block(&editor).text(), "a# ");
  }

  #[test]
  fn unknown_style_is_plain() {
    let editor = typed("#### ");
    assert_eq!(block(&editor).style.as_str(), "normal");
  }
}
