//! Shared types for the arcade engine core.
//!
//! # Invariants
//! - Entity ids are allocated monotonically and never reused within a world.
//! - Stages have a fixed total order; system scheduling sorts on it.

pub mod stage;
pub mod types;

pub use stage::{IntoStage, Stage, UnknownStage};
pub use types::{Entity, EntityAllocator};
