//! # the-dispatch
//!
//! Priority-ordered registries for overridable, composable behavior graphs.
//!
//! This crate knows nothing about editors. It stores values registered against
//! event patterns and answers one question fast: which registrations react to
//! a given event type, and in which order.
//!
//! ## Core Concepts
//!
//! - **Patterns**: an exact type (`insert.text`), a namespace (`custom.*`) or
//!   the universal wildcard (`*`)
//! - **Priority**: higher tiers run first; runtime registrations default to a
//!   tier above the built-in one
//! - **Tie-break**: equal priorities resolve most-recently-registered first
//!   unless configured otherwise
//! - **Scopes**: registrations owned by one caller can be removed together
//! - **Dispatch results**: a candidate either lets the event continue, handles
//!   it, or suppresses it
//!
//! ## Basic Usage
//!
//! ```rust
//! use the_dispatch::{
//!   EventPattern,
//!   Priority,
//!   Registry,
//! };
//!
//! let mut registry = Registry::new();
//! registry.register(EventPattern::parse("insert.*"), Priority::DEFAULT, "namespace");
//! let exact = registry.register(EventPattern::parse("insert.text"), Priority::HIGH, "exact");
//! registry.register(EventPattern::parse("*"), Priority::BUILTIN, "universal");
//!
//! let order: Vec<_> = registry
//!   .candidates("insert.text")
//!   .iter()
//!   .map(|candidate| *candidate.value)
//!   .collect();
//! assert_eq!(order, vec!["exact", "namespace", "universal"]);
//!
//! registry.unregister(exact);
//! assert_eq!(registry.candidates("insert.text").len(), 2);
//! assert_eq!(registry.candidates("select").len(), 1);
//! ```

mod outcome;
mod pattern;
mod registry;

pub use outcome::DispatchResult;
pub use pattern::{
  EventPattern,
  EventType,
};
pub use registry::{
  Candidate,
  Priority,
  RegistrationId,
  Registry,
  ScopeId,
  TieBreak,
};
