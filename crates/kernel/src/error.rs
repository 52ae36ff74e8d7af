use arcade_common::{Entity, Stage, UnknownStage};
use arcade_ecs::TypeConflict;

/// Boxed error returned by system bodies and tasks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors from world operations and system execution.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("entity {0} not found")]
    EntityNotFound(Entity),
    #[error(transparent)]
    UnknownStage(#[from] UnknownStage),
    #[error("entity id {0} is above the allowed maximum")]
    EntityIdOutOfRange(Entity),
    #[error("component `{0}` is absent and has no defaults")]
    ComponentMissingDefaults(&'static str),
    #[error(transparent)]
    ComponentTypeConflict(#[from] TypeConflict),
    #[error("system `{id}` failed during {stage}: {source}")]
    SystemFailed {
        id: String,
        stage: Stage,
        #[source]
        source: BoxError,
    },
    #[error("task `{label}` failed: {source}")]
    Task {
        label: String,
        #[source]
        source: BoxError,
    },
}

/// A system error recorded under [`crate::ErrorPolicy::Continue`].
#[derive(Debug, Clone, PartialEq)]
pub struct SystemFailure {
    pub id: String,
    pub stage: Stage,
    pub frame: u64,
    pub message: String,
}
