//! Component type registry.
//!
//! Component types are registered per world under a string name, with a
//! descriptor saying how a fresh value is produced on attach:
//!
//! - [`ComponentSpec::Factory`] — a callable invoked with positional
//!   arguments, producing the value.
//! - [`ComponentSpec::Defaults`] — a plain JSON object cloned as the default
//!   shape, with supplied fields merged over it.
//! - Unregistered names get a bare empty record.
//!
//! A registration may also carry a teardown hook, invoked with the entity and
//! the component value just before that value is detached or its entity is
//! destroyed.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::entity::Entity;
use crate::store::overlay;

/// Produces a component value from positional arguments.
pub type FactoryFn = Box<dyn Fn(&[Value]) -> Value>;

/// Invoked with the owning entity and the component value before removal.
pub type TeardownFn = Box<dyn Fn(Entity, &Value)>;

/// How a component value is produced when attached.
pub enum ComponentSpec {
    /// Constructor-backed: the callable receives the attach arguments.
    Factory(FactoryFn),
    /// Template-object-backed: the JSON object is cloned, then supplied
    /// fields are merged over the clone.
    Defaults(Value),
}

impl ComponentSpec {
    /// Convenience constructor for a factory-backed component.
    pub fn factory<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Value + 'static,
    {
        Self::Factory(Box::new(f))
    }

    /// Convenience constructor for a defaults-backed component.
    #[must_use]
    pub fn defaults(value: Value) -> Self {
        Self::Defaults(value)
    }
}

impl std::fmt::Debug for ComponentSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Factory(_) => f.write_str("Factory(..)"),
            Self::Defaults(value) => f.debug_tuple("Defaults").field(value).finish(),
        }
    }
}

struct Registration {
    spec: ComponentSpec,
    teardown: Option<TeardownFn>,
}

/// Per-world mapping from component name to its construction descriptor.
///
/// Established up front and consulted on every attach. Registration is
/// permissive: an unusable descriptor yields `None` rather than an error.
#[derive(Default)]
pub struct ComponentRegistry {
    components: HashMap<String, Registration>,
}

impl ComponentRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            components: HashMap::new(),
        }
    }

    /// Register a component type under `name`.
    ///
    /// Returns the registered name, or `None` if the descriptor is unusable
    /// (a [`ComponentSpec::Defaults`] whose value is not a JSON object).
    /// Re-registering a name replaces the previous descriptor.
    pub fn register(&mut self, name: impl Into<String>, spec: ComponentSpec) -> Option<String> {
        self.register_with_teardown_opt(name, spec, None)
    }

    /// Register a component type with a teardown hook.
    ///
    /// The hook runs before the component value is removed, whether by
    /// detach, entity destruction, or a world-wide clear.
    pub fn register_with_teardown(
        &mut self,
        name: impl Into<String>,
        spec: ComponentSpec,
        teardown: TeardownFn,
    ) -> Option<String> {
        self.register_with_teardown_opt(name, spec, Some(teardown))
    }

    fn register_with_teardown_opt(
        &mut self,
        name: impl Into<String>,
        spec: ComponentSpec,
        teardown: Option<TeardownFn>,
    ) -> Option<String> {
        if let ComponentSpec::Defaults(value) = &spec {
            if !value.is_object() {
                return None;
            }
        }
        let name = name.into();
        self.components
            .insert(name.clone(), Registration { spec, teardown });
        Some(name)
    }

    /// Returns `true` if `name` has been registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// Returns the number of registered component types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns `true` if no component types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Produce a fresh component value for `name` from attach arguments.
    ///
    /// Factory-backed components receive `args` verbatim. Defaults-backed
    /// and unregistered components treat a leading object argument as fields
    /// to merge over the default shape.
    #[must_use]
    pub fn instantiate(&self, name: &str, args: &[Value]) -> Value {
        match self.components.get(name).map(|r| &r.spec) {
            Some(ComponentSpec::Factory(factory)) => factory(args),
            Some(ComponentSpec::Defaults(defaults)) => {
                let mut value = defaults.clone();
                if let Some(first) = args.first() {
                    if first.is_object() {
                        overlay(&mut value, first);
                    }
                }
                value
            }
            None => match args.first() {
                Some(first) if first.is_object() => first.clone(),
                _ => Value::Object(Map::new()),
            },
        }
    }

    /// Run the teardown hook for `name`, if one was registered.
    pub fn run_teardown(&self, name: &str, entity: Entity, value: &Value) {
        if let Some(hook) = self.components.get(name).and_then(|r| r.teardown.as_ref()) {
            hook(entity, value);
        }
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .finish()
    }
}
