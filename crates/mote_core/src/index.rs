//! The query index — cached entity sets per component combination.
//!
//! Systems ask the same question every tick: "which entities currently have
//! components {A, B, …}?". Scanning every entity per call would make each
//! pass linear in world size, so the index caches the answer per
//! canonicalized key and maintains every cached entry incrementally as
//! components are attached and detached.
//!
//! The maintenance invariant: between settled mutations, every entry
//! `(K, S)` satisfies `S == { e : e has all names in K }` — exactly, not
//! eventually. The store upholds this by notifying the index synchronously
//! from every membership-changing mutation.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::entity::Entity;
use crate::store::ComponentStore;

/// A canonicalized set of component names requested together.
///
/// Order-independent and duplicate-free: `["a", "b"]`, `["b", "a"]` and
/// `["a", "b", "a"]` all canonicalize to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(BTreeSet<String>);

impl QueryKey {
    /// Canonicalize `names` into a key.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(names.into_iter().map(|n| n.as_ref().to_string()).collect())
    }

    /// Iterate the component names in canonical (sorted) order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns the number of distinct component names in the key.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the empty key, which matches every live entity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, name) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("+")?;
            }
            f.write_str(name)?;
        }
        Ok(())
    }
}

/// A set of entities that preserves insertion order.
///
/// Iteration yields entities in the order they first became members, which
/// keeps system passes stable run-to-run. Callers must not rely on more than
/// "all and only matching entities, each exactly once".
///
/// Members are keyed by a monotonically increasing insertion sequence, so
/// both insert and remove cost O(log n) and reconciling a mutation stays
/// proportional to the number of cache entries, never the number of
/// entities an entry holds.
#[derive(Debug, Default)]
pub struct EntitySet {
    next_seq: u64,
    members: HashMap<Entity, u64>,
    order: BTreeMap<u64, Entity>,
}

impl EntitySet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `entity` if absent. Returns `true` if it was newly inserted.
    pub fn insert(&mut self, entity: Entity) -> bool {
        if self.members.contains_key(&entity) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.members.insert(entity, seq);
        self.order.insert(seq, entity);
        true
    }

    /// Remove `entity` if present. Returns `true` if it was a member.
    pub fn remove(&mut self, entity: Entity) -> bool {
        match self.members.remove(&entity) {
            Some(seq) => {
                self.order.remove(&seq);
                true
            }
            None => false,
        }
    }

    /// Returns `true` if `entity` is a member.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.members.contains_key(&entity)
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterate members in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.order.values().copied()
    }
}

/// Caches, per canonical query key, the set of entities matching it.
///
/// Entries are created lazily on first query and persist until
/// [`QueryIndex::clear`]; their sets simply shrink to empty when no entity
/// matches. Maintenance cost per mutation is proportional to the number of
/// cached entries, never to the number of entities.
#[derive(Debug, Default)]
pub struct QueryIndex {
    entries: HashMap<QueryKey, EntitySet>,
}

impl QueryIndex {
    /// Create a new empty index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns the cached entity set for `key`, building it on first use.
    ///
    /// A cache miss costs one scan over the store's live entities; every
    /// later call with an equivalent key reuses the incrementally maintained
    /// entry without rescanning.
    pub fn query(&mut self, key: QueryKey, store: &ComponentStore) -> &EntitySet {
        match self.entries.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let mut set = EntitySet::new();
                for entity in store.entities() {
                    if store.has(entity, entry.key().names()) {
                        set.insert(entity);
                    }
                }
                debug!(key = %entry.key(), matched = set.len(), "built query cache entry");
                entry.insert(set)
            }
        }
    }

    /// Reconcile every cached entry with `entity`'s current component set.
    ///
    /// `has` answers whether the entity currently carries a given component
    /// name. Entries whose key is a subset of the current set gain the
    /// entity; all other entries lose it. Called synchronously by the store
    /// after every membership-changing mutation.
    pub fn entity_changed<F>(&mut self, entity: Entity, has: F)
    where
        F: Fn(&str) -> bool,
    {
        for (key, set) in &mut self.entries {
            if key.names().all(|name| has(name)) {
                set.insert(entity);
            } else {
                set.remove(entity);
            }
        }
    }

    /// Remove `entity` from every cached entry unconditionally — the
    /// destroyed entity's component set is treated as empty.
    pub fn entity_destroyed(&mut self, entity: Entity) {
        for set in self.entries.values_mut() {
            set.remove(entity);
        }
    }

    /// Drop all cache entries. A subsequent query rebuilds from whatever
    /// entities the store then holds.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the number of cached query keys.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}
