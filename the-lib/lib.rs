//! # the-lib
//!
//! A behavior-driven structured rich-text editor core.
//!
//! The document is a list of key-addressed blocks. Every change is an
//! [`event::Event`] that registered [`behavior::Behavior`]s may intercept
//! before the event's default action runs. Mutations happen through invertible
//! [`operation::Operation`]s, are grouped into undo steps, and leave the editor
//! as [`patch::Patch`]es.
//!
//! Start with [`editor::Editor`].

use smartstring::{
  LazyCompact,
  SmartString,
};

pub mod behavior;
mod composer;
pub mod document;
pub mod editor;
pub mod event;
pub mod grapheme;
pub mod history;
pub mod key;
pub mod operation;
pub mod patch;
pub mod schema;
pub mod selection;
pub mod snapshot;
pub mod transform;

pub use the_dispatch::{
  EventPattern,
  Priority,
  ScopeId,
  TieBreak,
};

pub type Tendril = SmartString<LazyCompact>;
