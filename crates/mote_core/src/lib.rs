//! # mote_core
//!
//! The storage core of the mote entity-component store.
//!
//! Components are named, dynamically shaped records (not Rust types), so they
//! are stored as `serde_json::Value` keyed by component name. This crate
//! provides:
//!
//! - [`Entity`] — lightweight `u64` entity identifiers.
//! - [`EntityAllocator`] — monotonically increasing ID allocator.
//! - [`ComponentRegistry`] — per-world mapping from component name to its
//!   construction descriptor and optional teardown hook.
//! - [`ComponentStore`] — per-entity component records and the attach /
//!   merge / detach primitives.
//! - [`QueryIndex`] — the incrementally maintained cache answering "which
//!   entities have component set {A, B, …}".

pub mod entity;
pub mod index;
pub mod registry;
pub mod store;

pub use entity::{Entity, EntityAllocator};
pub use index::{EntitySet, QueryIndex, QueryKey};
pub use registry::{ComponentRegistry, ComponentSpec, FactoryFn, TeardownFn};
pub use store::{ComponentStore, StoreError};
