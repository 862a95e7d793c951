//! # mote_world
//!
//! Orchestration layer of the mote entity-component store.
//!
//! The [`World`] owns entity allocation, the component type registry, the
//! template registry, the component store and the query index from
//! `mote_core`, and the registered systems list. Systems implement
//! [`System`] and are driven by [`World::run`], one synchronous pass per
//! call:
//!
//! ```rust
//! use mote_world::{System, World};
//! use mote_core::{ComponentSpec, Entity};
//! use serde_json::json;
//!
//! struct Movement {
//!     wanted: Vec<String>,
//! }
//!
//! impl System for Movement {
//!     fn components(&self) -> Option<&[String]> {
//!         Some(&self.wanted)
//!     }
//!
//!     fn every(&mut self, world: &mut World, entity: Entity) {
//!         let step = world.get(entity, "velocity").cloned().unwrap_or(json!({}));
//!         if let Some(position) = world.get_mut(entity, "position") {
//!             let dx = step["x"].as_f64().unwrap_or(0.0);
//!             position["x"] = json!(position["x"].as_f64().unwrap_or(0.0) + dx);
//!         }
//!     }
//! }
//!
//! let mut world = World::new();
//! world.register_component("position", ComponentSpec::defaults(json!({"x": 0.0})));
//! world.register_component("velocity", ComponentSpec::defaults(json!({"x": 0.0})));
//! let e = world.create_entity();
//! world.merge(e, "position", &json!({"x": 1.0}));
//! world.merge(e, "velocity", &json!({"x": 0.5}));
//! world.register_system(Movement {
//!     wanted: vec!["position".into(), "velocity".into()],
//! });
//! world.run();
//! assert_eq!(world.get(e, "position").unwrap()["x"], json!(1.5));
//! ```

pub mod system;
pub mod template;
pub mod world;

pub use system::{System, SystemHandle};
pub use template::{TemplateError, TemplateRegistry};
pub use world::World;
