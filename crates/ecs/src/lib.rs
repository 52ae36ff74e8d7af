//! Component model for the arcade world.
//!
//! Every component definition owns one sparse store, keyed by entity and
//! looked up by the definition's name. Stores are BTreeMaps so iteration is
//! deterministic.
//!
//! # Invariants
//! - One store per component name; a name is bound to a single Rust type.
//! - Stores are created lazily on first use of a definition.
//! - Query results are ordered by ascending entity id.

pub mod component;
pub mod query;
pub mod store;

pub use component::{Component, ComponentDef, ComponentValue};
pub use query::{QueryIter, QueryResult, QueryRow, QuerySpec};
pub use store::{ComponentStore, Components, TypeConflict};
