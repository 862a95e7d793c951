//! The world — entity lifecycle, component operations and the run pass.
//!
//! The [`World`] is the single owner of all runtime state: the entity
//! allocator and table, the component type registry, the template registry,
//! the component store, the query index and the registered systems. All
//! mutation happens synchronously inside the calling stack frame; there is
//! one logical thread of control.

use serde_json::Value;
use tracing::{debug, trace};

use mote_core::{
    ComponentRegistry, ComponentSpec, ComponentStore, Entity, EntityAllocator, QueryIndex,
    QueryKey, StoreError, TeardownFn,
};

use crate::system::{System, SystemHandle};
use crate::template::{TemplateError, TemplateRegistry};

/// The runtime container tying entities, components, templates and systems
/// together.
#[derive(Default)]
pub struct World {
    allocator: EntityAllocator,
    registry: ComponentRegistry,
    templates: TemplateRegistry,
    store: ComponentStore,
    index: QueryIndex,
    systems: Vec<Box<dyn System>>,
    next_handle: SystemHandle,
}

impl World {
    /// Create a new empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- Component type registration --

    /// Register a component type. Returns the registered name, or `None` if
    /// the descriptor is unusable (permissive failure, never an error).
    pub fn register_component(
        &mut self,
        name: impl Into<String>,
        spec: ComponentSpec,
    ) -> Option<String> {
        self.registry.register(name, spec)
    }

    /// Register a component type with a teardown hook that runs before any
    /// value of this type is removed.
    pub fn register_component_with_teardown(
        &mut self,
        name: impl Into<String>,
        spec: ComponentSpec,
        teardown: TeardownFn,
    ) -> Option<String> {
        self.registry.register_with_teardown(name, spec, teardown)
    }

    // -- Templates --

    /// Register entity templates from a structured value. Returns the number
    /// of templates registered.
    pub fn register_templates(&mut self, data: &Value) -> usize {
        self.templates.register(data)
    }

    /// Register entity templates from JSON text. Malformed text is an error.
    pub fn register_templates_json(&mut self, text: &str) -> Result<usize, TemplateError> {
        self.templates.register_json(text)
    }

    // -- Entity lifecycle --

    /// Create a new bare entity.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.allocator.allocate();
        self.store.register_entity(entity);
        // A fresh entity has no components; only empty-key entries match it.
        self.index.entity_changed(entity, |_| false);
        entity
    }

    /// Create an entity seeded from the named template.
    ///
    /// Each stored payload is applied via merge, so fields the template
    /// omits fall back to the component's registered default. An unknown
    /// template name yields a plain entity.
    pub fn create_from_template(&mut self, template: &str) -> Entity {
        let entity = self.create_entity();
        if let Some(payloads) = self.templates.get(template) {
            for (name, payload) in payloads {
                if let Ok(partial) = serde_json::from_str::<Value>(payload) {
                    self.store
                        .merge(&self.registry, &mut self.index, entity, name, &partial);
                }
            }
        } else if !template.is_empty() {
            trace!(template, %entity, "unknown template, created bare entity");
        }
        entity
    }

    /// Destroy `entity`: teardown hooks for each of its components, removal
    /// from every index entry, removal from the entity table. Destroying an
    /// already-destroyed entity is a no-op.
    pub fn destroy_entity(&mut self, entity: Entity) {
        if !self
            .store
            .remove_entity(&self.registry, &mut self.index, entity)
        {
            trace!(%entity, "destroy of invalid entity ignored");
        }
    }

    /// Returns `true` while `entity` is registered in the entity table.
    #[must_use]
    pub fn valid(&self, entity: Entity) -> bool {
        self.store.contains(entity)
    }

    /// Returns the number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.store.len()
    }

    /// Remove all entities from the world, running component teardown hooks.
    ///
    /// Registered component types, templates and systems are not affected.
    pub fn clear(&mut self) {
        let entities: Vec<Entity> = self.store.entities().collect();
        for entity in entities {
            self.store
                .remove_entity(&self.registry, &mut self.index, entity);
        }
        self.index.clear();
        debug!("world cleared");
    }

    // -- Component operations --

    /// Attach a fresh component value, replacing any prior value for that
    /// name. Returns the entity for chaining.
    pub fn attach(&mut self, entity: Entity, name: &str, args: &[Value]) -> Entity {
        self.store
            .attach(&self.registry, &mut self.index, entity, name, args)
    }

    /// Shallow-merge fields into `entity`'s component, creating the
    /// registered default first when absent.
    pub fn merge(&mut self, entity: Entity, name: &str, partial: &Value) -> Entity {
        self.store
            .merge(&self.registry, &mut self.index, entity, name, partial)
    }

    /// Returns the component value, or `None` if absent. Never creates.
    #[must_use]
    pub fn get(&self, entity: Entity, name: &str) -> Option<&Value> {
        self.store.get(entity, name)
    }

    /// Mutable access to the component value. Never creates.
    pub fn get_mut(&mut self, entity: Entity, name: &str) -> Option<&mut Value> {
        self.store.get_mut(entity, name)
    }

    /// Returns the component value, creating its default first if absent.
    /// `None` only for an invalid entity.
    pub fn get_or_create(&mut self, entity: Entity, name: &str) -> Option<&mut Value> {
        self.store
            .get_or_create(&self.registry, &mut self.index, entity, name)
    }

    /// Returns `true` iff `entity` holds every named component.
    #[must_use]
    pub fn has<I, S>(&self, entity: Entity, names: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.store.has(entity, names)
    }

    /// Detach the named component, running its teardown hook first.
    /// Returns `true` if a component was removed.
    pub fn detach(&mut self, entity: Entity, name: &str) -> bool {
        self.store
            .detach(&self.registry, &mut self.index, entity, name)
    }

    /// Detach every component on `entity`.
    pub fn detach_all(&mut self, entity: Entity) {
        self.store
            .detach_all(&self.registry, &mut self.index, entity);
    }

    /// JSON snapshot of all of `entity`'s components.
    #[must_use]
    pub fn serialize_entity(&self, entity: Entity) -> Option<String> {
        self.store.serialize(entity)
    }

    /// Apply a JSON snapshot to `entity` by merging each named component.
    pub fn deserialize_entity(&mut self, entity: Entity, text: &str) -> Result<(), StoreError> {
        self.store
            .deserialize(&self.registry, &mut self.index, entity, text)
    }

    // -- Queries --

    /// Entities currently holding every named component, snapshotted from
    /// the index's cached entry in its insertion order.
    pub fn query<I, S>(&mut self, names: I) -> Vec<Entity>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let key = QueryKey::new(names);
        self.index.query(key, &self.store).iter().collect()
    }

    // -- Systems --

    /// Register a system. Systems run in registration order; one registered
    /// from inside a running pass first runs on the next pass. Handles are
    /// unique for the lifetime of the world.
    pub fn register_system(&mut self, system: impl System + 'static) -> SystemHandle {
        self.systems.push(Box::new(system));
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    /// Returns the number of registered systems.
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Drive the one-time `initialize` hook of every registered system.
    pub fn initialize(&mut self) {
        let mut systems = std::mem::take(&mut self.systems);
        for system in systems.iter_mut() {
            system.initialize(self);
        }
        self.restore_systems(systems);
    }

    /// Run one pass over all registered systems.
    ///
    /// Per system: `pre`; then, if a component list is declared, iterate a
    /// snapshot of the matching entities taken at pass start, re-verifying
    /// membership immediately before each `every` call so that mutations by
    /// earlier callbacks in the same pass are honoured; then `post`.
    /// Entities that start matching mid-pass are picked up next pass.
    pub fn run(&mut self) {
        let mut systems = std::mem::take(&mut self.systems);
        for (position, system) in systems.iter_mut().enumerate() {
            system.pre(self);
            let names = system.components().map(|n| n.to_vec());
            if let Some(names) = names {
                let snapshot = self.query(names.iter());
                debug!(system = position, matched = snapshot.len(), "system pass");
                for entity in snapshot {
                    // The cached entry may have changed under the snapshot.
                    if self.store.has(entity, names.iter()) {
                        system.every(self, entity);
                    }
                }
            }
            system.post(self);
        }
        self.restore_systems(systems);
    }

    /// Put the driven systems back, keeping any registered mid-pass behind
    /// them in registration order.
    fn restore_systems(&mut self, mut systems: Vec<Box<dyn System>>) {
        systems.append(&mut self.systems);
        self.systems = systems;
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.store.len())
            .field("components", &self.registry.len())
            .field("templates", &self.templates.len())
            .field("systems", &self.systems.len())
            .finish()
    }
}
