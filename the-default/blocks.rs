//! Block structure behaviors.

use the_lib::{
  Priority,
  behavior::{
    Action,
    Behavior,
  },
  document::{
    Block,
    TextBlock,
  },
  event::{
    BlockSelect,
    Event,
    Placement,
  },
};

/// Splitting at the very start of a non-empty block inserts an empty block
/// above it and leaves the caret where it was, so the block keeps its key.
pub fn split_at_block_start() -> Behavior {
  Behavior::on("split")
    .named("split at block start")
    .priority(Priority::BUILTIN)
    .when(|ctx| {
      matches!(ctx.event, Event::Split { at: None })
        && ctx.snapshot.is_collapsed()
        && ctx.snapshot.focus_offset() == Some(0)
        && ctx
          .snapshot
          .focus_text_block()
          .is_some_and(|block| !block.is_empty())
    })
    .actions(|ctx, _| {
      let Some(focus) = ctx.snapshot.focus_text_block() else {
        return Ok(Vec::new());
      };
      let mut block = TextBlock::new();
      block.set_props(focus.props());
      Ok(vec![Action::execute(Event::InsertBlock {
        block:     Block::Text(block),
        placement: Placement::Before,
        select:    BlockSelect::None,
      })])
    })
}

#[cfg(test)]
mod tests {
  use the_lib::{
    document::{
      Document,
      Span,
    },
    editor::Editor,
    selection::{
      Point,
      Selection,
    },
  };

  use super::*;

  #[test]
  fn inserts_block_above() {
    let block = TextBlock::with_key("b1")
      .with_style("h2")
      .with_span(Span::with_key("s1", "title"));
    let mut editor = Editor::new(Document::new(vec![Block::Text(block)]));
    editor.register_behavior(split_at_block_start());
    let caret = Selection::collapsed(Point::span("b1", "s1", 0));
    editor.send(Event::select(caret.clone()));
    editor.send(Event::split());

    let blocks = editor.document().blocks();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[1].key().as_str(), "b1");
    let above = blocks[0].as_text().unwrap();
    assert!(above.is_empty());
    assert_eq!(above.style.as_str(), "h2");
    assert_eq!(editor.selection(), Some(&caret));
  }

  #[test]
  fn split_mid_block_uses_default() {
    let block = TextBlock::with_key("b1").with_span(Span::with_key("s1", "title"));
    let mut editor = Editor::new(Document::new(vec![Block::Text(block)]));
    editor.register_behavior(split_at_block_start());
    editor.send(Event::select(Selection::collapsed(Point::span("b1", "s1", 2))));
    editor.send(Event::split());

    let blocks = editor.document().blocks();
    assert_eq!(blocks[0].as_text().unwrap().text(), "ti");
    assert_eq!(blocks[1].as_text().unwrap().text(), "tle");
  }
}
