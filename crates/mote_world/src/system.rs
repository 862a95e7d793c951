//! System trait — behaviour units driven by the world's run pass.
//!
//! Every hook is optional: the default bodies do nothing, so an
//! implementation overrides only the capabilities it has. Whether a system
//! iterates entities at all is decided by [`System::components`] — `None`
//! means the per-entity hook is never driven and only `pre`/`post` run.

use mote_core::Entity;

use crate::world::World;

/// Opaque handle returned by [`World::register_system`].
pub type SystemHandle = usize;

/// A behaviour unit iterating entities that match a fixed component set.
///
/// During [`World::run`], each system gets: `pre`, then — if
/// [`System::components`] declares a list — one `every` call per matching
/// entity, then `post`. The pass iterates a snapshot taken at pass start and
/// re-verifies membership immediately before each `every` call, so hooks may
/// freely attach, detach and destroy while the pass is in flight.
pub trait System {
    /// The component names this system iterates, or `None` to run hooks only.
    fn components(&self) -> Option<&[String]> {
        None
    }

    /// One-time setup, driven by [`World::initialize`].
    fn initialize(&mut self, world: &mut World) {
        let _ = world;
    }

    /// Runs once at the start of this system's slice of a pass.
    fn pre(&mut self, world: &mut World) {
        let _ = world;
    }

    /// Runs once per entity matching [`System::components`]. The entity is
    /// guaranteed to still hold every declared component at call time; its
    /// values are read through the world handle.
    fn every(&mut self, world: &mut World, entity: Entity) {
        let _ = (world, entity);
    }

    /// Runs once at the end of this system's slice of a pass.
    fn post(&mut self, world: &mut World) {
        let _ = world;
    }
}
