use crate::scene::SceneKey;
use arcade_kernel::{BoxError, WorldError};

/// Errors from scene stack operations.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("unknown transition `{0}`")]
    UnknownTransition(String),
    #[error("scene {0} is not on the stack")]
    SceneNotFound(SceneKey),
    #[error("scene `{scene}` failed to {phase}: {source}")]
    Lifecycle {
        scene: String,
        phase: &'static str,
        #[source]
        source: BoxError,
    },
    #[error(transparent)]
    World(#[from] WorldError),
}
