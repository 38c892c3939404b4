use std::{
  cmp::{
    Ordering,
    Reverse,
  },
  collections::HashMap,
};

use serde::{
  Deserialize,
  Serialize,
};
use slotmap::{
  SlotMap,
  new_key_type,
};

use crate::pattern::{
  EventPattern,
  EventType,
  namespaces,
};

new_key_type! {
  /// Handle returned by [`Registry::register`]; removes exactly that
  /// registration when passed to [`Registry::unregister`].
  pub struct RegistrationId;

  /// Groups registrations owned by one caller so they can be torn down
  /// together.
  pub struct ScopeId;
}

/// Ordering tier of a registration. Higher runs first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(pub i32);

impl Priority {
  /// Tier used by behaviors shipped with the editor.
  pub const BUILTIN: Self = Self(-100);
  /// Tier used by behaviors registered at runtime without an explicit
  /// priority. Sits above the built-in tier so callers can override it.
  pub const DEFAULT: Self = Self(0);
  pub const HIGH: Self = Self(100);
}

impl Default for Priority {
  fn default() -> Self {
    Self::DEFAULT
  }
}

impl From<i32> for Priority {
  fn from(value: i32) -> Self {
    Self(value)
  }
}

/// How registrations of equal priority are ordered.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
  /// The most recently registered candidate runs first.
  #[default]
  #[serde(alias = "last-registered")]
  LastRegisteredFirst,
  /// Registration order.
  #[serde(alias = "first-registered")]
  FirstRegisteredFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
  priority: Priority,
  seq:      u64,
  id:       RegistrationId,
}

type Rank = (Reverse<Priority>, i128);

impl Slot {
  fn rank(&self, tie_break: TieBreak) -> Rank {
    let seq = match tie_break {
      TieBreak::LastRegisteredFirst => -i128::from(self.seq),
      TieBreak::FirstRegisteredFirst => i128::from(self.seq),
    };
    (Reverse(self.priority), seq)
  }
}

#[derive(Debug)]
struct Entry<T> {
  pattern:  EventPattern,
  priority: Priority,
  seq:      u64,
  scope:    Option<ScopeId>,
  value:    T,
}

/// A matching registration as returned by [`Registry::candidates`].
#[derive(Debug)]
pub struct Candidate<'a, T> {
  pub id:       RegistrationId,
  pub priority: Priority,
  pub pattern:  &'a EventPattern,
  pub value:    &'a T,
}

/// Priority-ordered registrations indexed by event pattern.
///
/// Exact types, namespaces and the universal pattern each have their own
/// sorted buckets, patched in place on every register/unregister. A lookup only
/// touches the buckets that can match, so its cost follows the number of
/// matching candidates rather than the size of the registry.
#[derive(Debug)]
pub struct Registry<T> {
  entries:    SlotMap<RegistrationId, Entry<T>>,
  scopes:     SlotMap<ScopeId, Vec<RegistrationId>>,
  exact:      HashMap<EventType, Vec<Slot>>,
  namespaces: HashMap<EventType, Vec<Slot>>,
  universal:  Vec<Slot>,
  next_seq:   u64,
  tie_break:  TieBreak,
}

impl<T> Default for Registry<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> Registry<T> {
  pub fn new() -> Self {
    Self::with_tie_break(TieBreak::default())
  }

  pub fn with_tie_break(tie_break: TieBreak) -> Self {
    Self {
      entries: SlotMap::with_key(),
      scopes: SlotMap::with_key(),
      exact: HashMap::new(),
      namespaces: HashMap::new(),
      universal: Vec::new(),
      next_seq: 0,
      tie_break,
    }
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn tie_break(&self) -> TieBreak {
    self.tie_break
  }

  /// Change the tie-break order. Every bucket is re-sorted.
  pub fn set_tie_break(&mut self, tie_break: TieBreak) {
    if self.tie_break == tie_break {
      return;
    }
    self.tie_break = tie_break;
    let by_rank = |a: &Slot, b: &Slot| a.rank(tie_break).cmp(&b.rank(tie_break));
    for bucket in self.exact.values_mut().chain(self.namespaces.values_mut()) {
      bucket.sort_by(by_rank);
    }
    self.universal.sort_by(by_rank);
  }

  pub fn register(&mut self, pattern: EventPattern, priority: Priority, value: T) -> RegistrationId {
    self.insert(pattern, priority, None, value)
  }

  /// Register on behalf of `scope`; see [`Registry::unregister_scope`].
  ///
  /// A stale scope registers the value unscoped.
  pub fn register_scoped(
    &mut self,
    scope: ScopeId,
    pattern: EventPattern,
    priority: Priority,
    value: T,
  ) -> RegistrationId {
    let scope = self.scopes.contains_key(scope).then_some(scope);
    let id = self.insert(pattern, priority, scope, value);
    if let Some(members) = scope.and_then(|scope| self.scopes.get_mut(scope)) {
      members.push(id);
    }
    id
  }

  pub fn new_scope(&mut self) -> ScopeId {
    self.scopes.insert(Vec::new())
  }

  /// Remove every registration made through `scope` and the scope itself.
  pub fn unregister_scope(&mut self, scope: ScopeId) -> Vec<T> {
    let Some(members) = self.scopes.remove(scope) else {
      return Vec::new();
    };
    members
      .into_iter()
      .filter_map(|id| self.unregister(id))
      .collect()
  }

  /// Remove exactly the registration `id`. Unknown or already removed ids
  /// return `None`.
  pub fn unregister(&mut self, id: RegistrationId) -> Option<T> {
    let entry = self.entries.remove(id)?;
    let slot = Slot {
      priority: entry.priority,
      seq: entry.seq,
      id,
    };
    let tie_break = self.tie_break;
    match &entry.pattern {
      EventPattern::Exact(ty) => remove_from_map(&mut self.exact, ty, slot, tie_break),
      EventPattern::Namespace(ns) => remove_from_map(&mut self.namespaces, ns, slot, tie_break),
      EventPattern::Any => remove_slot(&mut self.universal, slot, tie_break),
    }
    if let Some(members) = entry.scope.and_then(|scope| self.scopes.get_mut(scope)) {
      members.retain(|member| *member != id);
    }
    Some(entry.value)
  }

  pub fn get(&self, id: RegistrationId) -> Option<&T> {
    self.entries.get(id).map(|entry| &entry.value)
  }

  pub fn contains(&self, id: RegistrationId) -> bool {
    self.entries.contains_key(id)
  }

  /// All registrations matching `event_type`, highest priority first, ties
  /// ordered by [`TieBreak`].
  pub fn candidates(&self, event_type: &str) -> Vec<Candidate<'_, T>> {
    let mut slots: Vec<Slot> = Vec::new();
    if let Some(bucket) = self.exact.get(event_type) {
      slots.extend_from_slice(bucket);
    }
    for namespace in namespaces(event_type) {
      if let Some(bucket) = self.namespaces.get(namespace) {
        slots.extend_from_slice(bucket);
      }
    }
    slots.extend_from_slice(&self.universal);

    let tie_break = self.tie_break;
    slots.sort_by_key(|slot| slot.rank(tie_break));

    slots
      .into_iter()
      .filter_map(|slot| {
        let entry = self.entries.get(slot.id)?;
        Some(Candidate {
          id:       slot.id,
          priority: entry.priority,
          pattern:  &entry.pattern,
          value:    &entry.value,
        })
      })
      .collect()
  }

  /// Every registration in registration order.
  pub fn iter(&self) -> impl Iterator<Item = (RegistrationId, &T)> {
    let mut all: Vec<_> = self.entries.iter().collect();
    all.sort_by_key(|(_, entry)| entry.seq);
    all.into_iter().map(|(id, entry)| (id, &entry.value))
  }

  fn insert(
    &mut self,
    pattern: EventPattern,
    priority: Priority,
    scope: Option<ScopeId>,
    value: T,
  ) -> RegistrationId {
    let seq = self.next_seq;
    self.next_seq += 1;

    let bucket_key = pattern.clone();
    let id = self.entries.insert(Entry {
      pattern,
      priority,
      seq,
      scope,
      value,
    });
    let slot = Slot { priority, seq, id };
    let tie_break = self.tie_break;
    let bucket = match bucket_key {
      EventPattern::Exact(ty) => self.exact.entry(ty).or_default(),
      EventPattern::Namespace(ns) => self.namespaces.entry(ns).or_default(),
      EventPattern::Any => &mut self.universal,
    };
    let rank = slot.rank(tie_break);
    let at = bucket.partition_point(|other| other.rank(tie_break).cmp(&rank) == Ordering::Less);
    bucket.insert(at, slot);
    id
  }
}

fn remove_from_map(
  map: &mut HashMap<EventType, Vec<Slot>>,
  key: &EventType,
  slot: Slot,
  tie_break: TieBreak,
) {
  if let Some(bucket) = map.get_mut(key) {
    remove_slot(bucket, slot, tie_break);
    if bucket.is_empty() {
      map.remove(key);
    }
  }
}

fn remove_slot(bucket: &mut Vec<Slot>, slot: Slot, tie_break: TieBreak) {
  let rank = slot.rank(tie_break);
  if let Ok(at) = bucket.binary_search_by(|other| other.rank(tie_break).cmp(&rank)) {
    bucket.remove(at);
  }
}
