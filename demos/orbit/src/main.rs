//! Orbit demo — a handful of drifting bodies driven by two systems.
//!
//! Demonstrates the public surface end to end: component registration with
//! a teardown hook, entity templates, a movement system iterating a cached
//! query, a culling system destroying entities mid-pass, and a JSON
//! round-trip of one entity's components.

use anyhow::Result;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mote_core::{ComponentSpec, Entity};
use mote_world::{System, World};

const BOUND: f64 = 100.0;

/// Integrates velocity into position once per pass.
struct Movement {
    wanted: Vec<String>,
}

impl Movement {
    fn new() -> Self {
        Self {
            wanted: vec!["position".to_string(), "velocity".to_string()],
        }
    }
}

impl System for Movement {
    fn components(&self) -> Option<&[String]> {
        Some(&self.wanted)
    }

    fn every(&mut self, world: &mut World, entity: Entity) {
        let velocity = world.get(entity, "velocity").cloned().unwrap_or_default();
        if let Some(position) = world.get_mut(entity, "position") {
            let x = position["x"].as_f64().unwrap_or(0.0) + velocity["x"].as_f64().unwrap_or(0.0);
            let y = position["y"].as_f64().unwrap_or(0.0) + velocity["y"].as_f64().unwrap_or(0.0);
            position["x"] = json!(x);
            position["y"] = json!(y);
        }
    }
}

/// Destroys bodies that drift out of bounds — while the pass is running.
struct Cull {
    wanted: Vec<String>,
}

impl Cull {
    fn new() -> Self {
        Self {
            wanted: vec!["position".to_string()],
        }
    }
}

impl System for Cull {
    fn components(&self) -> Option<&[String]> {
        Some(&self.wanted)
    }

    fn every(&mut self, world: &mut World, entity: Entity) {
        let out_of_bounds = world
            .get(entity, "position")
            .map(|p| {
                p["x"].as_f64().unwrap_or(0.0).abs() > BOUND
                    || p["y"].as_f64().unwrap_or(0.0).abs() > BOUND
            })
            .unwrap_or(false);
        if out_of_bounds {
            info!(%entity, "culling out-of-bounds body");
            world.destroy_entity(entity);
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("orbit=info".parse()?))
        .init();

    let mut world = World::new();
    world.register_component("position", ComponentSpec::defaults(json!({"x": 0.0, "y": 0.0})));
    world.register_component("velocity", ComponentSpec::defaults(json!({"x": 0.0, "y": 0.0})));
    world.register_component_with_teardown(
        "body",
        ComponentSpec::defaults(json!({"name": ""})),
        Box::new(|entity, value| {
            info!(%entity, name = %value["name"], "body removed");
        }),
    );

    world.register_templates(&json!({
        "Drifter": {
            "position": {},
            "velocity": {"x": 1.5, "y": 0.5},
            "body": {"name": "drifter"}
        },
        "Rocket": {
            "position": {},
            "velocity": {"x": 40.0, "y": 0.0},
            "body": {"name": "rocket"}
        }
    }));

    for _ in 0..3 {
        world.create_from_template("Drifter");
    }
    let rocket = world.create_from_template("Rocket");

    world.register_system(Movement::new());
    world.register_system(Cull::new());
    world.initialize();

    info!(entities = world.entity_count(), "world seeded");

    for tick in 1..=10u32 {
        world.run();
        if tick % 5 == 0 {
            info!(tick, entities = world.entity_count(), "tick complete");
        }
    }

    // The rocket crossed the boundary on tick 3 and was culled mid-pass.
    assert!(!world.valid(rocket));

    // Snapshot one surviving drifter and rebuild it on a fresh entity.
    if let Some(survivor) = world.query(["position", "velocity"]).first().copied() {
        let snapshot = world
            .serialize_entity(survivor)
            .expect("survivor is a live entity");
        info!(%survivor, snapshot, "entity snapshot");

        let clone = world.create_entity();
        world.deserialize_entity(clone, &snapshot)?;
        info!(%clone, position = %world.get(clone, "position").unwrap_or(&json!(null)), "rebuilt from snapshot");
    }

    Ok(())
}
