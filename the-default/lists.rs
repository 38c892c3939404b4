//! List item editing: unindent on backspace, leave the list on an empty split.

use the_lib::{
  Priority,
  behavior::{
    Action,
    Behavior,
    BehaviorContext,
    Payload,
  },
  document::{
    BlockProps,
    TextBlock,
  },
  event::Event,
  key::Key,
  snapshot::Snapshot,
};

/// Backspace at the start of a nested list item moves it one level up.
pub fn unindent_on_backspace() -> Behavior {
  Behavior::on("delete.backward")
    .named("list unindent")
    .priority(Priority::BUILTIN)
    .guard(|ctx| {
      let Some(block) = caret_list_item(&ctx.snapshot) else {
        return Ok(None);
      };
      if ctx.snapshot.focus_offset() != Some(0) {
        return Ok(None);
      }
      let Some(level) = block.level.filter(|level| *level > 1) else {
        return Ok(None);
      };
      let props = BlockProps {
        level: Some(level - 1),
        ..block.props()
      };
      Ok(Some(Payload::new((block.key.clone(), props))))
    })
    .actions(block_set)
}

/// Splitting an empty list item turns it back into a plain block.
pub fn exit_on_empty_split() -> Behavior {
  Behavior::on("split")
    .named("list exit")
    .priority(Priority::BUILTIN)
    .guard(|ctx| {
      if !matches!(ctx.event, Event::Split { at: None }) {
        return Ok(None);
      }
      let Some(block) = caret_list_item(&ctx.snapshot).filter(|block| block.is_empty()) else {
        return Ok(None);
      };
      let props = BlockProps {
        list_item: None,
        level: None,
        ..block.props()
      };
      Ok(Some(Payload::new((block.key.clone(), props))))
    })
    .actions(block_set)
}

fn caret_list_item<'a>(snapshot: &Snapshot<'a>) -> Option<&'a TextBlock> {
  if !snapshot.is_collapsed() {
    return None;
  }
  snapshot
    .focus_text_block()
    .filter(|block| block.list_item.is_some())
}

fn block_set(_: &BehaviorContext<'_>, payload: &Payload) -> anyhow::Result<Vec<Action>> {
  let (at, props) = payload
    .get::<(Key, BlockProps)>()
    .cloned()
    .ok_or_else(|| anyhow::anyhow!("missing block.set payload"))?;
  Ok(vec![Action::execute(Event::BlockSet { at, props })])
}
