use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Phase of a frame a system is bound to.
///
/// Declaration order is execution order: `step` runs every stage except
/// `Render`, `render` runs only `Render`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Init,
    PreUpdate,
    Update,
    PostUpdate,
    Render,
    Cleanup,
}

/// Stage name that is not one of the six known stages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown system stage `{0}`")]
pub struct UnknownStage(pub String);

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 6] = [
        Stage::Init,
        Stage::PreUpdate,
        Stage::Update,
        Stage::PostUpdate,
        Stage::Render,
        Stage::Cleanup,
    ];

    /// Position in the fixed stage order.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Canonical name, as used in configuration and logs.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::PreUpdate => "preUpdate",
            Stage::Update => "update",
            Stage::PostUpdate => "postUpdate",
            Stage::Render => "render",
            Stage::Cleanup => "cleanup",
        }
    }

    /// Whether `step` runs this stage.
    pub fn is_simulation(self) -> bool {
        self != Stage::Render
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name() == s)
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

/// Anything a system registration accepts as its stage: a [`Stage`] or a
/// stage name from configuration.
pub trait IntoStage {
    fn into_stage(self) -> Result<Stage, UnknownStage>;
}

impl IntoStage for Stage {
    fn into_stage(self) -> Result<Stage, UnknownStage> {
        Ok(self)
    }
}

impl IntoStage for &str {
    fn into_stage(self) -> Result<Stage, UnknownStage> {
        self.parse()
    }
}

impl IntoStage for String {
    fn into_stage(self) -> Result<Stage, UnknownStage> {
        self.as_str().parse()
    }
}
