use arcade_kernel::{BoxError, World, WorldError};
use async_trait::async_trait;
use std::fmt;

/// Result of a scene lifecycle hook.
pub type SceneResult = Result<(), BoxError>;

/// Lifecycle hooks of a scene.
///
/// A scene never owns its world directly: the manager creates the world,
/// keeps it next to the scene on the stack, and lends it to every hook.
/// Entering and exiting may suspend (loading assets, fading audio); the
/// manager awaits them with no timeout.
#[async_trait(?Send)]
pub trait Scene {
    fn id(&self) -> &str;

    async fn on_enter(&mut self, _world: &mut World) -> SceneResult {
        Ok(())
    }

    async fn on_exit(&mut self, _world: &mut World) -> SceneResult {
        Ok(())
    }

    /// Per-frame simulation. Steps the world by default.
    fn update(&mut self, world: &mut World, delta: f64) -> Result<(), WorldError> {
        world.step(delta)
    }

    /// Per-frame drawing. Runs the world's render stage by default.
    fn render(&mut self, world: &mut World, alpha: f64) -> Result<(), WorldError> {
        world.render(alpha)
    }
}

/// Identity of one scene instance on the stack.
///
/// Scene ids are chosen by the game and may repeat (the same level pushed
/// twice); keys never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneKey(pub u64);

impl fmt::Display for SceneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scene#{}", self.0)
    }
}

/// A scene on the stack together with the world it owns.
pub struct ActiveScene {
    key: SceneKey,
    world: World,
    scene: Box<dyn Scene>,
}

impl ActiveScene {
    pub(crate) fn new(key: SceneKey, world: World, scene: Box<dyn Scene>) -> Self {
        Self { key, world, scene }
    }

    pub fn key(&self) -> SceneKey {
        self.key
    }

    pub fn id(&self) -> &str {
        self.scene.id()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn scene(&self) -> &dyn Scene {
        self.scene.as_ref()
    }

    pub(crate) async fn enter(&mut self) -> SceneResult {
        self.scene.on_enter(&mut self.world).await
    }

    pub(crate) async fn exit(&mut self) -> SceneResult {
        self.scene.on_exit(&mut self.world).await
    }

    pub(crate) fn update(&mut self, delta: f64) -> Result<(), WorldError> {
        self.scene.update(&mut self.world, delta)
    }

    pub(crate) fn render(&mut self, alpha: f64) -> Result<(), WorldError> {
        self.scene.render(&mut self.world, alpha)
    }
}

impl fmt::Debug for ActiveScene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveScene")
            .field("key", &self.key)
            .field("id", &self.id())
            .field("world", &self.world)
            .finish()
    }
}
