//! Per-entity component records.
//!
//! The [`ComponentStore`] maps each live entity to its component record — a
//! `HashMap<String, Value>` keyed by component name. Its map of records
//! doubles as the world's entity table: an entity is valid exactly while the
//! store holds a record for it.
//!
//! Every mutation that can change which components an entity carries must
//! reach the [`QueryIndex`] before returning. The mutators take the index as
//! a parameter so the notification cannot be skipped at a call site.

use std::collections::HashMap;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::entity::Entity;
use crate::index::QueryIndex;
use crate::registry::ComponentRegistry;

/// Errors surfaced by the store.
///
/// Most store operations are deliberately infallible-by-absence: reading a
/// missing component yields `None`, mutating an invalid entity is a no-op.
/// Only corrupted snapshot text is a genuine error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The snapshot text was not valid JSON.
    #[error("malformed component snapshot: {0}")]
    Parse(#[from] serde_json::Error),
    /// The snapshot parsed, but its root was not a JSON object.
    #[error("component snapshot root must be a JSON object")]
    NotAnObject,
}

/// Shallow-merge `partial`'s fields over `target`.
///
/// When both values are objects, `partial`'s keys overwrite matching keys in
/// `target` and untouched keys keep their current values. Any other shape
/// combination replaces `target` wholesale.
pub(crate) fn overlay(target: &mut Value, partial: &Value) {
    if !(target.is_object() && partial.is_object()) {
        *target = partial.clone();
        return;
    }
    if let (Some(dst), Some(src)) = (target.as_object_mut(), partial.as_object()) {
        for (key, value) in src {
            dst.insert(key.clone(), value.clone());
        }
    }
}

/// Holds every live entity's component record.
#[derive(Debug, Default)]
pub struct ComponentStore {
    records: HashMap<Entity, HashMap<String, Value>>,
}

impl ComponentStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
        }
    }

    /// Add `entity` to the entity table with an empty component record.
    pub fn register_entity(&mut self, entity: Entity) {
        self.records.entry(entity).or_default();
    }

    /// Returns `true` if `entity` is currently registered.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.records.contains_key(&entity)
    }

    /// Iterate over all live entities.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.records.keys().copied()
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no entities are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Attach a fresh component value to `entity`, replacing any prior value
    /// for that name, and notify the index.
    ///
    /// The value comes from the registry: factory-backed components receive
    /// `args`, defaults-backed components clone their default shape (merging
    /// a leading object argument), unregistered names get a bare record.
    /// A no-op on an invalid entity. Returns the entity for chaining.
    pub fn attach(
        &mut self,
        registry: &ComponentRegistry,
        index: &mut QueryIndex,
        entity: Entity,
        name: &str,
        args: &[Value],
    ) -> Entity {
        if let Some(record) = self.records.get_mut(&entity) {
            let value = registry.instantiate(name, args);
            record.insert(name.to_string(), value);
            index.entity_changed(entity, |n| record.contains_key(n));
        }
        entity
    }

    /// Shallow-merge `partial` into `entity`'s component `name`.
    ///
    /// If the component is absent it is first created with its registered
    /// default, so default fields not named in `partial` are preserved. The
    /// index is notified only when the component was created, since a merge
    /// over an existing value cannot change membership.
    pub fn merge(
        &mut self,
        registry: &ComponentRegistry,
        index: &mut QueryIndex,
        entity: Entity,
        name: &str,
        partial: &Value,
    ) -> Entity {
        if let Some(record) = self.records.get_mut(&entity) {
            let created = !record.contains_key(name);
            let slot = record
                .entry(name.to_string())
                .or_insert_with(|| registry.instantiate(name, &[]));
            overlay(slot, partial);
            if created {
                index.entity_changed(entity, |n| record.contains_key(n));
            }
        }
        entity
    }

    /// Returns the current value of `entity`'s component `name`. Never creates.
    #[must_use]
    pub fn get(&self, entity: Entity, name: &str) -> Option<&Value> {
        self.records.get(&entity)?.get(name)
    }

    /// Mutable access to `entity`'s component `name`. Never creates.
    pub fn get_mut(&mut self, entity: Entity, name: &str) -> Option<&mut Value> {
        self.records.get_mut(&entity)?.get_mut(name)
    }

    /// Returns `entity`'s component `name`, creating its registered default
    /// first if absent.
    ///
    /// This is the only read operation that can change membership; creation
    /// notifies the index exactly like [`ComponentStore::attach`]. Returns
    /// `None` only for an invalid entity.
    pub fn get_or_create(
        &mut self,
        registry: &ComponentRegistry,
        index: &mut QueryIndex,
        entity: Entity,
        name: &str,
    ) -> Option<&mut Value> {
        let record = self.records.get_mut(&entity)?;
        if !record.contains_key(name) {
            record.insert(name.to_string(), registry.instantiate(name, &[]));
            index.entity_changed(entity, |n| record.contains_key(n));
        }
        record.get_mut(name)
    }

    /// Returns `true` iff `entity` is valid and holds every named component.
    #[must_use]
    pub fn has<I, S>(&self, entity: Entity, names: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match self.records.get(&entity) {
            Some(record) => names.into_iter().all(|n| record.contains_key(n.as_ref())),
            None => false,
        }
    }

    /// Detach `entity`'s component `name` if present, running its teardown
    /// hook first and notifying the index.
    ///
    /// Returns `true` if a component was removed.
    pub fn detach(
        &mut self,
        registry: &ComponentRegistry,
        index: &mut QueryIndex,
        entity: Entity,
        name: &str,
    ) -> bool {
        if let Some(record) = self.records.get_mut(&entity) {
            // Hook runs while the value is still attached.
            if let Some(value) = record.get(name) {
                registry.run_teardown(name, entity, value);
                record.remove(name);
                index.entity_changed(entity, |n| record.contains_key(n));
                return true;
            }
        }
        false
    }

    /// Detach every component on `entity`, running teardown hooks per
    /// component. Removal order is unspecified.
    pub fn detach_all(
        &mut self,
        registry: &ComponentRegistry,
        index: &mut QueryIndex,
        entity: Entity,
    ) {
        if let Some(record) = self.records.get_mut(&entity) {
            for (name, value) in record.iter() {
                registry.run_teardown(name, entity, value);
            }
            record.clear();
            index.entity_changed(entity, |n| record.contains_key(n));
        }
    }

    /// Remove `entity` from the entity table entirely: teardown hooks for
    /// every component, then unconditional removal from every index entry.
    ///
    /// Returns `false` (a no-op) if the entity was already gone, making
    /// destruction idempotent.
    pub fn remove_entity(
        &mut self,
        registry: &ComponentRegistry,
        index: &mut QueryIndex,
        entity: Entity,
    ) -> bool {
        match self.records.get(&entity) {
            Some(record) => {
                for (name, value) in record {
                    registry.run_teardown(name, entity, value);
                }
                self.records.remove(&entity);
                index.entity_destroyed(entity);
                true
            }
            None => false,
        }
    }

    /// Produce a JSON snapshot of all of `entity`'s components, as an object
    /// mapping component name to value. `None` for an invalid entity.
    #[must_use]
    pub fn serialize(&self, entity: Entity) -> Option<String> {
        let record = self.records.get(&entity)?;
        let map: Map<String, Value> = record
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Some(Value::Object(map).to_string())
    }

    /// Apply a JSON snapshot to `entity`, merging each named component.
    ///
    /// Decoding goes through [`ComponentStore::merge`], so partial payloads
    /// preserve registered defaults for omitted fields and the index is
    /// notified exactly as merge does. Malformed text is surfaced as an
    /// error; applying to an invalid entity is a quiet no-op.
    pub fn deserialize(
        &mut self,
        registry: &ComponentRegistry,
        index: &mut QueryIndex,
        entity: Entity,
        text: &str,
    ) -> Result<(), StoreError> {
        let snapshot: Value = serde_json::from_str(text)?;
        let object = snapshot.as_object().ok_or(StoreError::NotAnObject)?;
        if !self.records.contains_key(&entity) {
            return Ok(());
        }
        for (name, partial) in object {
            self.merge(registry, index, entity, name, partial);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::json;

    use crate::registry::ComponentSpec;

    use super::*;

    fn fixture() -> (ComponentRegistry, QueryIndex, ComponentStore) {
        let mut registry = ComponentRegistry::new();
        registry.register(
            "position",
            ComponentSpec::factory(|args| {
                json!({
                    "x": args.first().cloned().unwrap_or(json!(0)),
                    "y": args.get(1).cloned().unwrap_or(json!(0)),
                })
            }),
        );
        registry.register("velocity", ComponentSpec::defaults(json!({"x": 0, "y": 0})));
        (registry, QueryIndex::new(), ComponentStore::new())
    }

    #[test]
    fn test_attach_and_get() {
        let (registry, mut index, mut store) = fixture();
        let e = Entity::from_raw(1);
        store.register_entity(e);

        store.attach(&registry, &mut index, e, "position", &[json!(1), json!(2)]);
        assert!(store.has(e, ["position"]));
        assert_eq!(store.get(e, "position"), Some(&json!({"x": 1, "y": 2})));
    }

    #[test]
    fn test_attach_replaces_prior_value_completely() {
        let (registry, mut index, mut store) = fixture();
        let e = Entity::from_raw(1);
        store.register_entity(e);

        store.attach(&registry, &mut index, e, "position", &[json!(5)]);
        // Give the first value an extra field, then re-attach.
        if let Some(value) = store.get_mut(e, "position") {
            value["stale"] = json!(true);
        }
        store.attach(&registry, &mut index, e, "position", &[json!(333)]);

        assert_eq!(store.get(e, "position"), Some(&json!({"x": 333, "y": 0})));
    }

    #[test]
    fn test_merge_preserves_defaults() {
        let (registry, mut index, mut store) = fixture();
        let e = Entity::from_raw(1);
        store.register_entity(e);

        store.merge(&registry, &mut index, e, "velocity", &json!({"x": 1}));
        assert_eq!(store.get(e, "velocity"), Some(&json!({"x": 1, "y": 0})));
    }

    #[test]
    fn test_merge_on_existing_overlays_fields() {
        let (registry, mut index, mut store) = fixture();
        let e = Entity::from_raw(1);
        store.register_entity(e);

        store.attach(&registry, &mut index, e, "position", &[json!(5)]);
        store.merge(&registry, &mut index, e, "position", &json!({"y": 3}));
        assert_eq!(store.get(e, "position"), Some(&json!({"x": 5, "y": 3})));
    }

    #[test]
    fn test_merge_unregistered_name_takes_arbitrary_fields() {
        let (registry, mut index, mut store) = fixture();
        let e = Entity::from_raw(1);
        store.register_entity(e);

        store.merge(&registry, &mut index, e, "empty", &json!({"testing": 100}));
        assert_eq!(store.get(e, "empty"), Some(&json!({"testing": 100})));
    }

    #[test]
    fn test_get_never_creates() {
        let (_, _, mut store) = fixture();
        let e = Entity::from_raw(1);
        store.register_entity(e);

        assert!(store.get(e, "position").is_none());
        assert!(!store.has(e, ["position"]));
    }

    #[test]
    fn test_get_or_create_creates_default_once() {
        let (registry, mut index, mut store) = fixture();
        let e = Entity::from_raw(1);
        store.register_entity(e);

        {
            let value = store
                .get_or_create(&registry, &mut index, e, "position")
                .unwrap();
            value["x"] = json!(300);
        }
        assert!(store.has(e, ["position"]));
        assert_eq!(store.get(e, "position"), Some(&json!({"x": 300, "y": 0})));

        // Second call returns the existing value untouched.
        let again = store
            .get_or_create(&registry, &mut index, e, "position")
            .unwrap();
        assert_eq!(*again, json!({"x": 300, "y": 0}));
    }

    #[test]
    fn test_has_multiple_names() {
        let (registry, mut index, mut store) = fixture();
        let e = Entity::from_raw(1);
        store.register_entity(e);

        store.attach(&registry, &mut index, e, "position", &[]);
        store.attach(&registry, &mut index, e, "velocity", &[]);

        assert!(store.has(e, ["position", "velocity"]));
        assert!(!store.has(e, ["position", "invalid"]));
        assert!(!store.has(Entity::from_raw(99), ["position"]));
    }

    #[test]
    fn test_detach_and_detach_all() {
        let (registry, mut index, mut store) = fixture();
        let e = Entity::from_raw(1);
        store.register_entity(e);

        store.attach(&registry, &mut index, e, "position", &[]);
        store.attach(&registry, &mut index, e, "velocity", &[]);

        assert!(store.detach(&registry, &mut index, e, "position"));
        assert!(!store.has(e, ["position"]));
        assert!(store.has(e, ["velocity"]));
        // Detaching again is a quiet no-op.
        assert!(!store.detach(&registry, &mut index, e, "position"));

        store.attach(&registry, &mut index, e, "position", &[]);
        store.detach_all(&registry, &mut index, e);
        assert!(!store.has(e, ["position"]));
        assert!(!store.has(e, ["velocity"]));
        assert!(store.contains(e));
    }

    #[test]
    fn test_teardown_hook_on_detach_and_remove() {
        let removed = Rc::new(RefCell::new(Vec::new()));
        let removed_in_hook = Rc::clone(&removed);

        let mut registry = ComponentRegistry::new();
        registry.register_with_teardown(
            "resource",
            ComponentSpec::defaults(json!({"handle": 0})),
            Box::new(move |entity, value| {
                removed_in_hook.borrow_mut().push((entity, value.clone()));
            }),
        );
        let mut index = QueryIndex::new();
        let mut store = ComponentStore::new();

        let e1 = Entity::from_raw(1);
        let e2 = Entity::from_raw(2);
        store.register_entity(e1);
        store.register_entity(e2);
        store.attach(&registry, &mut index, e1, "resource", &[json!({"handle": 1})]);
        store.attach(&registry, &mut index, e2, "resource", &[json!({"handle": 2})]);

        // The hook sees the value as it was at removal time.
        store.detach(&registry, &mut index, e1, "resource");
        assert_eq!(*removed.borrow(), vec![(e1, json!({"handle": 1}))]);

        store.remove_entity(&registry, &mut index, e2);
        assert_eq!(
            *removed.borrow(),
            vec![(e1, json!({"handle": 1})), (e2, json!({"handle": 2}))]
        );
    }

    #[test]
    fn test_remove_entity_is_idempotent() {
        let (registry, mut index, mut store) = fixture();
        let e = Entity::from_raw(1);
        store.register_entity(e);
        store.attach(&registry, &mut index, e, "position", &[]);

        assert!(store.remove_entity(&registry, &mut index, e));
        assert!(!store.contains(e));
        assert!(!store.has(e, ["position"]));

        assert!(!store.remove_entity(&registry, &mut index, e));
        assert!(!store.contains(e));
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let (registry, mut index, mut store) = fixture();
        let e = Entity::from_raw(1);
        store.register_entity(e);
        store.merge(&registry, &mut index, e, "position", &json!({"x": 4, "y": 6}));

        let text = store.serialize(e).unwrap();

        let fresh = Entity::from_raw(2);
        store.register_entity(fresh);
        store
            .deserialize(&registry, &mut index, fresh, &text)
            .unwrap();

        assert!(store.has(fresh, ["position"]));
        let position = store.get(fresh, "position").unwrap();
        assert_eq!(position["x"], json!(4));
        assert_eq!(position["y"], json!(6));
    }

    #[test]
    fn test_deserialize_partial_payload_preserves_defaults() {
        let (registry, mut index, mut store) = fixture();
        let e = Entity::from_raw(1);
        store.register_entity(e);

        store
            .deserialize(&registry, &mut index, e, r#"{"velocity": {"x": 9}}"#)
            .unwrap();
        assert_eq!(store.get(e, "velocity"), Some(&json!({"x": 9, "y": 0})));
    }

    #[test]
    fn test_deserialize_malformed_text_is_an_error() {
        let (registry, mut index, mut store) = fixture();
        let e = Entity::from_raw(1);
        store.register_entity(e);

        let result = store.deserialize(&registry, &mut index, e, "{not json");
        assert!(matches!(result, Err(StoreError::Parse(_))));

        let result = store.deserialize(&registry, &mut index, e, "[1, 2, 3]");
        assert!(matches!(result, Err(StoreError::NotAnObject)));
    }

    #[test]
    fn test_overlay_replaces_non_object_shapes() {
        let mut target = json!({"x": 1});
        overlay(&mut target, &json!(7));
        assert_eq!(target, json!(7));

        let mut target = json!(7);
        overlay(&mut target, &json!({"x": 1}));
        assert_eq!(target, json!({"x": 1}));
    }
}
