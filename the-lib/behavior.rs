//! Behaviors: rules that intercept events.
//!
//! A [`Behavior`] matches events by [`EventPattern`], optionally filters them
//! through a guard, and then resolves an ordered list of action sets. Each
//! action set is one resolution step; it returns the [`Action`]s the editor
//! interprets for that step.
//!
//! # Example
//!
//! ```
//! use the_lib::{
//!   behavior::{
//!     Action,
//!     Behavior,
//!   },
//!   event::Event,
//! };
//!
//! // Typing "a" types "b" instead.
//! let behavior = Behavior::on("insert.text")
//!   .named("a-to-b")
//!   .when(|ctx| matches!(ctx.event, Event::InsertText { text } if text == "a"))
//!   .actions(|_, _| Ok(vec![Action::execute(Event::insert_text("b"))]));
//! assert_eq!(behavior.steps(), 1);
//! ```

use std::{
  any::Any,
  fmt,
  sync::Arc,
};

use the_dispatch::{
  EventPattern,
  Priority,
  RegistrationId,
};

use crate::{
  Tendril,
  editor::EventSender,
  event::Event,
  snapshot::Snapshot,
};

/// Handle returned by behavior registration.
pub type BehaviorId = RegistrationId;

/// What guards and action sets see: the current state and the event.
#[derive(Debug, Clone, Copy)]
pub struct BehaviorContext<'a> {
  pub snapshot: Snapshot<'a>,
  pub event:    &'a Event,
}

/// Data a guard hands to its behavior's action sets.
#[derive(Clone, Default)]
pub struct Payload(Option<Arc<dyn Any + Send + Sync>>);

impl Payload {
  /// Interested, with no extra data.
  pub fn none() -> Self {
    Self(None)
  }

  pub fn new<T: Any + Send + Sync>(value: T) -> Self {
    Self(Some(Arc::new(value)))
  }

  pub fn get<T: Any>(&self) -> Option<&T> {
    self.0.as_deref()?.downcast_ref()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_none()
  }
}

impl fmt::Debug for Payload {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.0 {
      Some(_) => f.write_str("Payload(..)"),
      None => f.write_str("Payload(none)"),
    }
  }
}

/// Returns `Ok(None)` when the behavior is not interested.
pub type Guard = Arc<dyn Fn(&BehaviorContext<'_>) -> anyhow::Result<Option<Payload>> + Send + Sync>;

/// One resolution step.
pub type ActionSet = Arc<dyn Fn(&BehaviorContext<'_>, &Payload) -> anyhow::Result<Vec<Action>> + Send + Sync>;

/// What an effect callback can do: read the committed state and queue events.
pub struct EffectContext<'a> {
  pub(crate) snapshot: Snapshot<'a>,
  pub(crate) sender:   &'a EventSender,
}

impl<'a> EffectContext<'a> {
  pub fn snapshot(&self) -> Snapshot<'a> {
    self.snapshot
  }

  /// Queue `event` as a fresh outer dispatch.
  pub fn send(&self, event: Event) {
    self.sender.send(event);
  }

  /// A sender that outlives the effect, for asynchronous follow-ups.
  pub fn sender(&self) -> EventSender {
    self.sender.clone()
  }
}

pub struct Effect(Box<dyn FnOnce(&EffectContext<'_>)>);

impl Effect {
  pub fn new(f: impl FnOnce(&EffectContext<'_>) + 'static) -> Self {
    Self(Box::new(f))
  }

  pub(crate) fn run(self, ctx: &EffectContext<'_>) {
    (self.0)(ctx)
  }
}

impl fmt::Debug for Effect {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Effect(..)")
  }
}

#[derive(Debug)]
pub enum Action {
  /// Apply an event without interception. Custom events are dispatched in an
  /// executing traversal instead.
  Execute(Event),
  /// Run only the default action of the event.
  Forward(Event),
  /// Dispatch the event again, depth first.
  Raise(Event),
  /// Run after the dispatch commits. Never consumes the event.
  Effect(Effect),
  /// Consume the event without doing anything.
  Noop,
}

impl Action {
  pub fn execute(event: Event) -> Self {
    Self::Execute(event)
  }

  pub fn forward(event: Event) -> Self {
    Self::Forward(event)
  }

  pub fn raise(event: Event) -> Self {
    Self::Raise(event)
  }

  pub fn effect(f: impl FnOnce(&EffectContext<'_>) + 'static) -> Self {
    Self::Effect(Effect::new(f))
  }

  pub fn noop() -> Self {
    Self::Noop
  }

  pub fn is_effect(&self) -> bool {
    matches!(self, Self::Effect(_))
  }
}

#[derive(Clone)]
pub struct Behavior {
  pub on:       EventPattern,
  pub guard:    Option<Guard>,
  pub actions:  Vec<ActionSet>,
  pub priority: Priority,
  pub name:     Option<Tendril>,
}

impl Behavior {
  pub fn on(pattern: impl Into<EventPattern>) -> Self {
    Self {
      on:       pattern.into(),
      guard:    None,
      actions:  Vec::new(),
      priority: Priority::DEFAULT,
      name:     None,
    }
  }

  pub fn named(mut self, name: impl Into<Tendril>) -> Self {
    self.name = Some(name.into());
    self
  }

  pub fn priority(mut self, priority: Priority) -> Self {
    self.priority = priority;
    self
  }

  pub fn guard<F>(mut self, guard: F) -> Self
  where
    F: Fn(&BehaviorContext<'_>) -> anyhow::Result<Option<Payload>> + Send + Sync + 'static,
  {
    self.guard = Some(Arc::new(guard));
    self
  }

  /// Guard without payload.
  pub fn when<F>(self, predicate: F) -> Self
  where
    F: Fn(&BehaviorContext<'_>) -> bool + Send + Sync + 'static,
  {
    self.guard(move |ctx| Ok(predicate(ctx).then(Payload::none)))
  }

  /// Append a resolution step.
  pub fn actions<F>(mut self, step: F) -> Self
  where
    F: Fn(&BehaviorContext<'_>, &Payload) -> anyhow::Result<Vec<Action>> + Send + Sync + 'static,
  {
    self.actions.push(Arc::new(step));
    self
  }

  pub fn steps(&self) -> usize {
    self.actions.len()
  }

  /// Name for logs.
  pub fn label(&self) -> &str {
    self.name.as_deref().unwrap_or("<anonymous>")
  }
}

impl fmt::Debug for Behavior {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Behavior")
      .field("on", &self.on)
      .field("name", &self.name)
      .field("priority", &self.priority)
      .field("guard", &self.guard.is_some())
      .field("steps", &self.actions.len())
      .finish()
  }
}
