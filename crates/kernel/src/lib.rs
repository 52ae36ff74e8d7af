//! World Kernel: entity/component storage, stage-ordered systems, and the
//! per-frame `step`/`render` entry points.
//!
//! # Invariants
//! - Destroying an entity removes it from every component store.
//! - Systems run ordered by `(stage, order)`, ties in registration order.
//! - `total_time` only advances through `step`.
//! - System execution is synchronous; async work goes through the task queue
//!   and is never awaited by the scheduler.

pub mod config;
pub mod dump;
pub mod error;
pub mod scheduler;
pub mod system;
pub mod tasks;
pub mod world;

pub use arcade_common::{Entity, IntoStage, Stage};
pub use arcade_ecs::{Component, ComponentDef, ComponentValue, QueryResult, QueryRow, QuerySpec};
pub use config::{ErrorPolicy, WorldConfig};
pub use dump::{ComponentDump, EntitySnapshot, WorldDump};
pub use error::{BoxError, SystemFailure, WorldError};
pub use system::{FnSystem, System, SystemContext, SystemInfo, SystemResult};
pub use tasks::{WorldCommand, command};
pub use world::World;
