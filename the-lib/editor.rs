//! The editor session: dispatcher, action interpreter and emission.
//!
//! An [`Editor`] owns the document, the selection, the history and the
//! behavior registry. Every mutation enters through [`Editor::send`] (or
//! [`Editor::apply_remote`] for collaborator operations) and leaves as a
//! [`Mutation`] on the channels handed out by [`Editor::subscribe`].
//!
//! # Dispatch
//!
//! For an event, the registered behaviors matching its type are tried in
//! priority order. A behavior whose guard declines, or whose action sets only
//! yield effects (or nothing), falls through to the next candidate. The first
//! behavior yielding any other action consumes the event. When every
//! candidate falls through, the event's default action runs.
//!
//! # Example
//!
//! ```
//! use the_lib::{
//!   behavior::{
//!     Action,
//!     Behavior,
//!   },
//!   document::{
//!     Block,
//!     Document,
//!     Span,
//!     TextBlock,
//!   },
//!   editor::Editor,
//!   event::Event,
//!   selection::{
//!     Point,
//!     Selection,
//!   },
//! };
//!
//! let mut editor = Editor::new(Document::new(vec![Block::Text(
//!   TextBlock::with_key("b1").with_span(Span::with_key("s1", "")),
//! )]));
//! editor.send(Event::select(Selection::collapsed(Point::span("b1", "s1", 0))));
//!
//! editor.register_behavior(
//!   Behavior::on("insert.text")
//!     .when(|ctx| matches!(ctx.event, Event::InsertText { text } if text == "a"))
//!     .actions(|_, _| Ok(vec![Action::execute(Event::insert_text("b"))])),
//! );
//!
//! editor.send(Event::insert_text("a"));
//! assert_eq!(editor.document().text(), "b");
//!
//! editor.send(Event::HistoryUndo);
//! assert_eq!(editor.document().text(), "");
//! ```

use std::sync::Arc;

use crossbeam::channel::{
  self,
  Receiver,
  Sender,
};
use the_dispatch::{
  DispatchResult,
  Registry,
  ScopeId,
  TieBreak,
};
use tracing::{
  debug,
  trace,
  warn,
};

use crate::{
  behavior::{
    Action,
    Behavior,
    BehaviorContext,
    BehaviorId,
    Effect,
    EffectContext,
    Payload,
  },
  composer::Composer,
  document::{
    Document,
    State,
  },
  event::Event,
  history::{
    Direction,
    History,
  },
  operation::Operation,
  patch::{
    self,
    Patch,
    PatchPath,
  },
  schema::Schema,
  selection::{
    Point,
    Selection,
  },
  snapshot::Snapshot,
  transform,
};

/// Nesting bound for raised and executed events.
pub const MAX_DISPATCH_DEPTH: usize = 64;

/// Where a [`Mutation`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
  /// A committed undo step of a local dispatch.
  Local,
  Undo,
  Redo,
  /// Operations applied through [`Editor::apply_remote`].
  Remote,
  /// The whole document was replaced.
  Replace,
}

/// Patches of one committed change, in commit order.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
  pub patches: Vec<Patch>,
  pub origin:  Origin,
}

/// Queues events for the editor from effects or other threads. Queued events
/// run as fresh outer dispatches the next time [`Editor::send`] or
/// [`Editor::drain`] runs.
#[derive(Debug, Clone)]
pub struct EventSender(Sender<Event>);

impl EventSender {
  pub fn send(&self, event: Event) {
    if self.0.send(event).is_err() {
      debug!("editor is gone, dropping event");
    }
  }
}

#[derive(Debug)]
pub struct Editor {
  state:       State,
  schema:      Schema,
  registry:    Registry<Arc<Behavior>>,
  history:     History,
  subscribers: Vec<Sender<Mutation>>,
  queue_tx:    Sender<Event>,
  queue_rx:    Receiver<Event>,
}

impl Editor {
  pub fn new(document: Document) -> Self {
    Self::with_schema(document, Schema::default())
  }

  pub fn with_schema(document: Document, schema: Schema) -> Self {
    let (queue_tx, queue_rx) = channel::unbounded();
    Self {
      state: State::new(document),
      schema,
      registry: Registry::new(),
      history: History::default(),
      subscribers: Vec::new(),
      queue_tx,
      queue_rx,
    }
  }

  pub fn with_history_limit(mut self, limit: usize) -> Self {
    self.history.set_limit(limit);
    self
  }

  pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
    self.registry.set_tie_break(tie_break);
    self
  }

  // --- state

  pub fn state(&self) -> &State {
    &self.state
  }

  pub fn document(&self) -> &Document {
    &self.state.document
  }

  pub fn selection(&self) -> Option<&Selection> {
    self.state.selection.as_ref()
  }

  pub fn schema(&self) -> &Schema {
    &self.schema
  }

  pub fn history(&self) -> &History {
    &self.history
  }

  /// The last fully committed state.
  pub fn snapshot(&self) -> Snapshot<'_> {
    Snapshot::new(&self.state, &self.schema)
  }

  /// Replace the schema wholesale. History is kept.
  pub fn set_schema(&mut self, schema: Schema) {
    self.schema = schema;
  }

  /// Start over with a new document: the selection is cleared and history is
  /// reset.
  pub fn replace_document(&mut self, document: Document) {
    self.state = State::new(document);
    self.history.clear();
    let mutation = Mutation {
      patches: vec![Patch::Set {
        path:  PatchPath::new(),
        value: patch::to_value(&self.state.document),
      }],
      origin:  Origin::Replace,
    };
    self.emit(vec![mutation]);
  }

  // --- behaviors

  pub fn register_behavior(&mut self, behavior: Behavior) -> BehaviorId {
    trace!(behavior = behavior.label(), on = %behavior.on, "registering behavior");
    self
      .registry
      .register(behavior.on.clone(), behavior.priority, Arc::new(behavior))
  }

  pub fn register_behaviors(&mut self, behaviors: impl IntoIterator<Item = Behavior>) -> Vec<BehaviorId> {
    behaviors
      .into_iter()
      .map(|behavior| self.register_behavior(behavior))
      .collect()
  }

  /// Remove exactly one registration. Takes effect from the next dispatch.
  pub fn unregister_behavior(&mut self, id: BehaviorId) -> bool {
    self.registry.unregister(id).is_some()
  }

  pub fn new_scope(&mut self) -> ScopeId {
    self.registry.new_scope()
  }

  pub fn register_scoped(&mut self, scope: ScopeId, behavior: Behavior) -> BehaviorId {
    self
      .registry
      .register_scoped(scope, behavior.on.clone(), behavior.priority, Arc::new(behavior))
  }

  /// Tear down a scope, removing every behavior registered under it.
  pub fn unregister_scope(&mut self, scope: ScopeId) -> usize {
    self.registry.unregister_scope(scope).len()
  }

  pub fn behaviors(&self) -> impl Iterator<Item = (BehaviorId, &Behavior)> {
    self
      .registry
      .iter()
      .map(|(id, behavior)| (id, behavior.as_ref()))
  }

  pub fn set_tie_break(&mut self, tie_break: TieBreak) {
    self.registry.set_tie_break(tie_break);
  }

  // --- channels

  pub fn sender(&self) -> EventSender {
    EventSender(self.queue_tx.clone())
  }

  /// Receive a [`Mutation`] for every committed change from now on.
  pub fn subscribe(&mut self) -> Receiver<Mutation> {
    let (tx, rx) = channel::unbounded();
    self.subscribers.push(tx);
    rx
  }

  // --- dispatch

  /// Dispatch `event` as an outer dispatch, run the effects it scheduled and
  /// then every event queued meanwhile, in order.
  pub fn send(&mut self, event: Event) {
    self.process(&event);
    self.drain();
  }

  /// Process queued events until the queue is empty.
  pub fn drain(&mut self) {
    while let Ok(event) = self.queue_rx.try_recv() {
      self.process(&event);
    }
  }

  pub fn undo(&mut self) {
    self.send(Event::HistoryUndo);
  }

  pub fn redo(&mut self) {
    self.send(Event::HistoryRedo);
  }

  /// Apply collaborator operations. They bypass behaviors and history.
  /// Selection operations are ignored and operations that do not fit the
  /// current document are skipped.
  pub fn apply_remote(&mut self, operations: impl IntoIterator<Item = Operation>) {
    let mut patches = Vec::new();
    for op in operations {
      if !op.is_document_change() {
        debug!(?op, "ignoring remote selection operation");
        continue;
      }
      match op.apply(&mut self.state) {
        Ok(applied) => patches.extend(applied),
        Err(err) => warn!(%err, ?op, "skipping remote operation"),
      }
    }
    if self
      .state
      .selection
      .as_ref()
      .is_some_and(|selection| !selection_resolves(&self.state.document, selection))
    {
      self.state.selection = None;
    }
    self.emit(vec![Mutation {
      patches,
      origin: Origin::Remote,
    }]);
  }

  fn process(&mut self, event: &Event) {
    trace!(event = event.event_type(), "dispatch");
    let mut dispatcher = Dispatcher {
      composer:  Composer::new(self.state.selection.clone()),
      state:     &mut self.state,
      schema:    &self.schema,
      registry:  &self.registry,
      history:   &mut self.history,
      effects:   Vec::new(),
      mutations: Vec::new(),
    };
    dispatcher.dispatch(event, 0, false);
    dispatcher.flush();
    let Dispatcher {
      effects, mutations, ..
    } = dispatcher;

    self.emit(mutations);

    let sender = self.sender();
    for effect in effects {
      let ctx = EffectContext {
        snapshot: Snapshot::new(&self.state, &self.schema),
        sender:   &sender,
      };
      effect.run(&ctx);
    }
  }

  fn emit(&mut self, mutations: Vec<Mutation>) {
    for mutation in mutations {
      self
        .subscribers
        .retain(|subscriber| subscriber.send(mutation.clone()).is_ok());
    }
  }
}

/// One outer dispatch and everything it raises.
struct Dispatcher<'e> {
  state:     &'e mut State,
  schema:    &'e Schema,
  registry:  &'e Registry<Arc<Behavior>>,
  history:   &'e mut History,
  composer:  Composer,
  effects:   Vec<Effect>,
  mutations: Vec<Mutation>,
}

impl Dispatcher<'_> {
  /// Offer `event` to the matching behaviors, then to its default action.
  ///
  /// `executing` marks a traversal below an executed custom event, where
  /// raises are demoted to executes.
  fn dispatch(&mut self, event: &Event, depth: usize, executing: bool) -> DispatchResult {
    if depth > MAX_DISPATCH_DEPTH {
      warn!(event = event.event_type(), depth, "dispatch depth exceeded, dropping event");
      return DispatchResult::Continue;
    }

    // candidates are fixed for this level; registry changes apply next time
    let candidates: Vec<(BehaviorId, Arc<Behavior>)> = self
      .registry
      .candidates(event.event_type())
      .into_iter()
      .map(|candidate| (candidate.id, Arc::clone(candidate.value)))
      .collect();

    for (_, behavior) in candidates {
      let mark = self.composer.mark();
      let effects = self.effects.len();
      match self.resolve(&behavior, event, depth, executing) {
        Ok(DispatchResult::Continue) => {
          debug!(behavior = behavior.label(), event = event.event_type(), "fell through");
        },
        Ok(result) => {
          trace!(behavior = behavior.label(), event = event.event_type(), ?result, "consumed");
          return result;
        },
        Err(err) => {
          warn!(
            behavior = behavior.label(),
            event = event.event_type(),
            "behavior failed, falling through: {err:#}"
          );
          self.composer.rollback(mark, self.state);
          self.effects.truncate(effects);
        },
      }
    }

    self.default_action(event)
  }

  /// Run a behavior's guard and resolution steps.
  fn resolve(
    &mut self,
    behavior: &Behavior,
    event: &Event,
    depth: usize,
    executing: bool,
  ) -> anyhow::Result<DispatchResult> {
    let payload = match &behavior.guard {
      Some(guard) => {
        match guard(&self.context(event))? {
          Some(payload) => payload,
          None => return Ok(DispatchResult::Continue),
        }
      },
      None => Payload::none(),
    };

    let mut result = DispatchResult::Continue;
    for step in &behavior.actions {
      let actions = step(&self.context(event), &payload)?;
      let boundary = depth == 0
        && actions
          .iter()
          .any(|action| matches!(action, Action::Execute(_) | Action::Forward(_)));
      result = result.merge(classify(&actions));
      for action in actions {
        self.interpret(action, depth, executing);
      }
      if boundary {
        self.composer.commit(&self.state.selection);
      }
    }
    Ok(result)
  }

  fn interpret(&mut self, action: Action, depth: usize, executing: bool) {
    match action {
      Action::Execute(event) => self.execute(&event, depth),
      Action::Forward(event) => {
        if !event.is_primitive() {
          debug!(event = event.event_type(), "forwarded event has no default action");
        }
        self.default_action(&event);
      },
      Action::Raise(event) if executing => self.execute(&event, depth),
      Action::Raise(event) => {
        self.dispatch(&event, depth + 1, false);
      },
      Action::Effect(effect) => self.effects.push(effect),
      Action::Noop => {},
    }
  }

  fn execute(&mut self, event: &Event, depth: usize) {
    if event.is_primitive() {
      self.default_action(event);
    } else {
      self.dispatch(event, depth + 1, true);
    }
  }

  fn default_action(&mut self, event: &Event) -> DispatchResult {
    match event {
      Event::HistoryUndo => self.replay(Direction::Undo),
      Event::HistoryRedo => self.replay(Direction::Redo),
      Event::Custom { .. } => {
        trace!(event = event.event_type(), "unhandled custom event");
        return DispatchResult::Continue;
      },
      _ => {
        let applied = transform::default_action(event, self.state, self.schema);
        self.composer.record(applied);
      },
    }
    DispatchResult::Handled
  }

  /// Commit everything composed so far into history.
  fn flush(&mut self) {
    for committed in self.composer.drain(&self.state.selection) {
      self.history.commit(committed.step);
      self.mutations.push(Mutation {
        patches: committed.patches,
        origin:  Origin::Local,
      });
    }
  }

  fn replay(&mut self, direction: Direction) {
    self.flush();
    let jump = match direction {
      Direction::Undo => self.history.undo(),
      Direction::Redo => self.history.redo(),
    };
    let Some(jump) = jump else {
      debug!(?direction, "nothing to replay");
      return;
    };

    let mut patches = Vec::new();
    for op in &jump.operations {
      match op.apply(self.state) {
        Ok(applied) => patches.extend(applied),
        Err(err) => warn!(%err, ?op, "skipping operation during history replay"),
      }
    }
    let selection = jump
      .selection
      .clone()
      .filter(|selection| selection_resolves(&self.state.document, selection));
    self.state.selection = selection;
    if let Err(err) = self.history.apply_jump(&jump) {
      warn!(%err, "history changed during replay");
    }
    self.composer.reopen(&self.state.selection);

    let origin = match direction {
      Direction::Undo => Origin::Undo,
      Direction::Redo => Origin::Redo,
    };
    self.mutations.push(Mutation { patches, origin });
  }

  fn context<'a>(&'a self, event: &'a Event) -> BehaviorContext<'a> {
    BehaviorContext {
      snapshot: Snapshot::new(&*self.state, self.schema),
      event,
    }
  }
}

/// How a resolution step's actions count toward consumption.
fn classify(actions: &[Action]) -> DispatchResult {
  if actions
    .iter()
    .any(|action| matches!(action, Action::Execute(_) | Action::Forward(_) | Action::Raise(_)))
  {
    DispatchResult::Handled
  } else if actions.iter().any(|action| matches!(action, Action::Noop)) {
    DispatchResult::Suppressed
  } else {
    DispatchResult::Continue
  }
}

fn selection_resolves(document: &Document, selection: &Selection) -> bool {
  let resolves = |point: &Point| {
    match &point.path.child {
      Some(child) => {
        document
          .text_block(&point.path.block)
          .is_some_and(|block| block.child(child).is_some())
      },
      None => document.block(&point.path.block).is_some(),
    }
  };
  resolves(&selection.anchor) && resolves(&selection.focus)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::document::{
    Block,
    Span,
    TextBlock,
  };

  fn editor(text: &str) -> Editor {
    let mut editor = Editor::new(Document::new(vec![Block::Text(
      TextBlock::with_key("b1").with_span(Span::with_key("s1", text)),
    )]));
    let end = text.chars().count();
    editor.send(Event::select(Selection::collapsed(Point::span("b1", "s1", end))));
    editor
  }

  #[test]
  fn classify_actions() {
    assert_eq!(classify(&[]), DispatchResult::Continue);
    assert_eq!(classify(&[Action::effect(|_| {})]), DispatchResult::Continue);
    assert_eq!(classify(&[Action::noop()]), DispatchResult::Suppressed);
    assert_eq!(
      classify(&[Action::noop(), Action::raise(Event::split())]),
      DispatchResult::Handled
    );
  }

  #[test]
  fn raise_cycles_are_bounded() {
    let mut editor = editor("");
    editor.register_behavior(Behavior::on("custom.loop").actions(|_, _| {
      Ok(vec![Action::raise(Event::custom(
        "custom.loop",
        serde_json::Value::Null,
      ))])
    }));
    editor.send(Event::custom("custom.loop", serde_json::Value::Null));
    assert_eq!(editor.document().text(), "");
  }

  #[test]
  fn selection_only_dispatch_is_not_recorded() {
    let mut editor = editor("abc");
    editor.send(Event::select(Selection::collapsed(Point::span("b1", "s1", 1))));
    assert!(!editor.history().can_undo());
  }

  #[test]
  fn remote_operations_skip_history() {
    let mut editor = editor("abc");
    let mutations = editor.subscribe();
    editor.apply_remote([Operation::InsertText {
      block:  "b1".into(),
      child:  "s1".into(),
      offset: 0,
      text:   "x".into(),
    }]);
    assert_eq!(editor.document().text(), "xabc");
    assert!(!editor.history().can_undo());
    let mutation = mutations.try_recv().unwrap();
    assert_eq!(mutation.origin, Origin::Remote);
    assert_eq!(mutation.patches.len(), 1);
  }

  #[test]
  fn remote_removal_clears_dangling_selection() {
    let mut editor = editor("abc");
    let block = editor.document().blocks()[0].clone();
    editor.apply_remote([Operation::RemoveBlock { after: None, block }]);
    assert!(editor.document().is_empty());
    assert!(editor.selection().is_none());
  }
}
