use crate::scene::{ActiveScene, SceneKey};

/// Id of the zero-duration transition every manager starts with.
pub const NOOP_TRANSITION: &str = "noop";

/// A time-boxed effect played while the active scene changes.
///
/// Hooks receive the incoming scene and may change its world (a fade
/// overlay, a camera offset); that is the only way a transition affects
/// what gets drawn.
pub trait Transition {
    /// Length in the same unit as `update` deltas. Zero or less completes on
    /// the first update.
    fn duration(&self) -> f64;

    fn start(&mut self, _to: &mut ActiveScene) {}

    /// `progress` is in `[0, 1]`.
    fn update(&mut self, _to: &mut ActiveScene, _progress: f64) {}

    fn finish(&mut self, _to: &mut ActiveScene) {}
}

/// Completes immediately and touches nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTransition;

impl Transition for NoopTransition {
    fn duration(&self) -> f64 {
        0.0
    }
}

/// The transition currently being played.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveTransition {
    pub(crate) id: String,
    pub(crate) from: Option<SceneKey>,
    pub(crate) to: SceneKey,
    pub(crate) elapsed: f64,
}

impl ActiveTransition {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn from(&self) -> Option<SceneKey> {
        self.from
    }

    pub fn to(&self) -> SceneKey {
        self.to
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

/// `elapsed / duration`, clamped to 1. Non-positive durations are complete.
pub(crate) fn progress(elapsed: f64, duration: f64) -> f64 {
    if duration > 0.0 {
        (elapsed / duration).min(1.0)
    } else {
        1.0
    }
}
