//! Scene layer: a stack of scenes, each owning exactly one world, plus a
//! registry of transitions blended by elapsed time.
//!
//! # Invariants
//! - A scene's world is created by the manager and dropped with the scene.
//! - At most one transition is active; starting another replaces it.
//! - Transitions never pause simulation: the current scene updates every
//!   frame regardless.

pub mod error;
pub mod manager;
pub mod scene;
pub mod transition;

pub use error::SceneError;
pub use manager::{SceneEvent, SceneManager, SceneManagerConfig};
pub use scene::{ActiveScene, Scene, SceneKey, SceneResult};
pub use transition::{ActiveTransition, NOOP_TRANSITION, NoopTransition, Transition};
