use crate::error::SceneError;
use crate::scene::{ActiveScene, Scene, SceneKey};
use crate::transition::{self, ActiveTransition, NOOP_TRANSITION, NoopTransition, Transition};
use arcade_kernel::{World, WorldConfig, WorldError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::Instrument;

/// Scene manager configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SceneManagerConfig {
    /// Configuration for every world the manager creates.
    pub world: WorldConfig,
    /// Transition used by `push`, `replace` and `pop`.
    pub default_transition: String,
}

impl Default for SceneManagerConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            default_transition: NOOP_TRANSITION.to_string(),
        }
    }
}

impl SceneManagerConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Record of a change to the scene stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneEvent {
    Pushed { scene: String, key: SceneKey },
    Replaced { from: String, to: String, key: SceneKey },
    Popped { scene: String, key: SceneKey },
    /// A scene's `on_exit` failed after it had already left the stack.
    ExitFailed { scene: String, key: SceneKey, message: String },
}

/// Stack of scenes plus the transition registry.
///
/// `push`, `replace` and `pop` are async because scene enter/exit hooks may
/// suspend. `update` and `render` are synchronous and meant to be called once
/// per host frame.
pub struct SceneManager {
    config: SceneManagerConfig,
    stack: Vec<ActiveScene>,
    transitions: HashMap<String, Box<dyn Transition>>,
    active: Option<ActiveTransition>,
    next_key: u64,
    events: Vec<SceneEvent>,
}

impl Default for SceneManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneManager {
    /// Create an empty manager with only the `noop` transition registered.
    pub fn new() -> Self {
        Self::with_config(SceneManagerConfig::default())
    }

    pub fn with_config(config: SceneManagerConfig) -> Self {
        let mut transitions: HashMap<String, Box<dyn Transition>> = HashMap::new();
        transitions.insert(NOOP_TRANSITION.to_string(), Box::new(NoopTransition));
        Self {
            config,
            stack: Vec::new(),
            transitions,
            active: None,
            next_key: 0,
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &SceneManagerConfig {
        &self.config
    }

    /// Register `transition` under `id`, replacing any previous one.
    pub fn register_transition(
        &mut self,
        id: impl Into<String>,
        transition: impl Transition + 'static,
    ) {
        let id = id.into();
        tracing::debug!(transition = %id, "transition registered");
        self.transitions.insert(id, Box::new(transition));
    }

    pub fn has_transition(&self, id: &str) -> bool {
        self.transitions.contains_key(id)
    }

    // --- Inspection ---

    /// The top of the stack.
    pub fn current(&self) -> Option<&ActiveScene> {
        self.stack.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut ActiveScene> {
        self.stack.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Scene ids from bottom to top.
    pub fn scene_ids(&self) -> Vec<&str> {
        self.stack.iter().map(ActiveScene::id).collect()
    }

    pub fn active_transition(&self) -> Option<&ActiveTransition> {
        self.active.as_ref()
    }

    pub fn is_transitioning(&self) -> bool {
        self.active.is_some()
    }

    pub fn events(&self) -> &[SceneEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    // --- Stack operations ---

    /// Build a scene with the default transition and push it.
    pub async fn push<S, F>(&mut self, factory: F) -> Result<SceneKey, SceneError>
    where
        S: Scene + 'static,
        F: FnOnce(&mut World) -> Result<S, WorldError>,
    {
        let transition = self.config.default_transition.clone();
        self.push_with(factory, &transition).await
    }

    /// Build a fresh world and scene, await `on_enter`, push, and start
    /// `transition` from nothing to the new top.
    ///
    /// `transition` is checked before the factory runs: an unknown id fails
    /// with [`SceneError::UnknownTransition`] and leaves the stack untouched.
    pub async fn push_with<S, F>(
        &mut self,
        factory: F,
        transition: &str,
    ) -> Result<SceneKey, SceneError>
    where
        S: Scene + 'static,
        F: FnOnce(&mut World) -> Result<S, WorldError>,
    {
        self.require_transition(transition)?;
        let span = tracing::info_span!("scene_push", transition);
        let entry = self.build_and_enter(factory).instrument(span.clone()).await?;
        let _entered = span.enter();
        let key = entry.key();
        tracing::debug!(scene = entry.id(), %key, "scene pushed");
        self.events.push(SceneEvent::Pushed {
            scene: entry.id().to_string(),
            key,
        });
        self.stack.push(entry);
        self.begin_transition(None, key, transition)?;
        Ok(key)
    }

    /// Swap the top scene using the default transition.
    pub async fn replace<S, F>(&mut self, factory: F) -> Result<SceneKey, SceneError>
    where
        S: Scene + 'static,
        F: FnOnce(&mut World) -> Result<S, WorldError>,
    {
        let transition = self.config.default_transition.clone();
        self.replace_with(factory, &transition).await
    }

    /// Swap the top scene for a new one.
    ///
    /// The new scene is entered before it takes the old one's place; the old
    /// scene is exited after the swap and then dropped with its world. Once
    /// the swap is done the call succeeds: a failing `on_exit` is logged and
    /// recorded as [`SceneEvent::ExitFailed`]. On an empty stack this is
    /// exactly [`SceneManager::push_with`].
    pub async fn replace_with<S, F>(
        &mut self,
        factory: F,
        transition: &str,
    ) -> Result<SceneKey, SceneError>
    where
        S: Scene + 'static,
        F: FnOnce(&mut World) -> Result<S, WorldError>,
    {
        if self.stack.is_empty() {
            return self.push_with(factory, transition).await;
        }
        self.require_transition(transition)?;
        let span = tracing::info_span!("scene_replace", transition);
        let entry = self.build_and_enter(factory).instrument(span.clone()).await?;
        let entered = span.enter();
        let key = entry.key();

        let top = self.stack.len() - 1;
        let to_id = entry.id().to_string();
        let mut old = std::mem::replace(&mut self.stack[top], entry);
        tracing::debug!(from = old.id(), to = %to_id, %key, "scene replaced");
        self.events.push(SceneEvent::Replaced {
            from: old.id().to_string(),
            to: to_id,
            key,
        });
        self.begin_transition(Some(old.key()), key, transition)?;
        drop(entered);

        self.exit_scene(&mut old).instrument(span).await;
        Ok(key)
    }

    /// Pop the top scene using the default transition.
    pub async fn pop(&mut self) -> Result<Option<String>, SceneError> {
        let transition = self.config.default_transition.clone();
        self.pop_with(&transition).await
    }

    /// Pop the top scene, await its `on_exit`, and start `transition` towards
    /// the scene below, if any. Returns the popped scene's id; an empty stack
    /// is left alone.
    ///
    /// The scene leaves the stack before `on_exit` runs, so a failing hook
    /// does not undo the pop: it is logged and recorded as
    /// [`SceneEvent::ExitFailed`] ahead of the usual `Popped` event.
    pub async fn pop_with(&mut self, transition: &str) -> Result<Option<String>, SceneError> {
        if self.stack.len() > 1 {
            self.require_transition(transition)?;
        }
        let Some(mut popped) = self.stack.pop() else {
            return Ok(None);
        };
        let span = tracing::info_span!("scene_pop", scene = popped.id(), transition);
        if self.active.as_ref().is_some_and(|a| a.to == popped.key()) {
            tracing::debug!(parent: &span, "transition target popped, dropping transition");
            self.active = None;
        }

        self.exit_scene(&mut popped).instrument(span.clone()).await;
        let _entered = span.enter();
        let id = popped.id().to_string();
        tracing::debug!(scene = %id, key = %popped.key(), "scene popped");
        self.events.push(SceneEvent::Popped {
            scene: id.clone(),
            key: popped.key(),
        });

        if let Some(top) = self.stack.last() {
            let to = top.key();
            self.begin_transition(Some(popped.key()), to, transition)?;
        }
        Ok(Some(id))
    }

    /// Pop every scene, top first, without transitions. Exit failures are
    /// recorded the same way `pop` records them.
    pub async fn clear(&mut self) {
        self.active = None;
        while let Some(mut popped) = self.stack.pop() {
            self.exit_scene(&mut popped).await;
            self.events.push(SceneEvent::Popped {
                scene: popped.id().to_string(),
                key: popped.key(),
            });
        }
    }

    /// Start transition `id` into the scene `to`, replacing whatever
    /// transition was in flight.
    pub fn begin_transition(
        &mut self,
        from: Option<SceneKey>,
        to: SceneKey,
        id: &str,
    ) -> Result<(), SceneError> {
        let transition = self
            .transitions
            .get_mut(id)
            .ok_or_else(|| SceneError::UnknownTransition(id.to_string()))?;
        let target = self
            .stack
            .iter_mut()
            .find(|s| s.key() == to)
            .ok_or(SceneError::SceneNotFound(to))?;

        if let Some(previous) = self.active.take() {
            tracing::debug!(transition = %previous.id, "in-flight transition replaced");
        }
        tracing::debug!(transition = id, ?from, %to, "transition started");
        transition.start(target);
        self.active = Some(ActiveTransition {
            id: id.to_string(),
            from,
            to,
            elapsed: 0.0,
        });
        Ok(())
    }

    // --- Frame ---

    /// Advance the active transition, then update the current scene.
    ///
    /// The scene update runs every frame whether or not a transition is in
    /// flight.
    pub fn update(&mut self, delta: f64) -> Result<(), SceneError> {
        self.advance_transition(delta);
        if let Some(top) = self.stack.last_mut() {
            top.update(delta)?;
        }
        Ok(())
    }

    /// Render the current scene only.
    pub fn render(&mut self, alpha: f64) -> Result<(), SceneError> {
        if let Some(top) = self.stack.last_mut() {
            top.render(alpha)?;
        }
        Ok(())
    }

    /// Drive the current scene's task queue to completion.
    pub async fn run_tasks(&mut self) -> Result<usize, SceneError> {
        match self.stack.last_mut() {
            Some(top) => Ok(top.world_mut().run_tasks().await?),
            None => Ok(0),
        }
    }

    fn advance_transition(&mut self, delta: f64) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let (Some(transition), Some(target)) = (
            self.transitions.get_mut(&active.id),
            self.stack.iter_mut().find(|s| s.key() == active.to),
        ) else {
            tracing::debug!(transition = %active.id, "transition target gone, dropping transition");
            self.active = None;
            return;
        };

        active.elapsed += delta;
        let progress = transition::progress(active.elapsed, transition.duration());
        tracing::trace!(transition = %active.id, progress, "transition update");
        transition.update(target, progress);
        if progress >= 1.0 {
            transition.finish(target);
            tracing::debug!(transition = %active.id, "transition finished");
            self.active = None;
        }
    }

    fn require_transition(&self, id: &str) -> Result<(), SceneError> {
        if self.transitions.contains_key(id) {
            Ok(())
        } else {
            Err(SceneError::UnknownTransition(id.to_string()))
        }
    }

    /// Await `on_exit` for a scene that is already off the stack.
    async fn exit_scene(&mut self, scene: &mut ActiveScene) {
        if let Err(error) = scene.exit().await {
            tracing::warn!(scene = scene.id(), key = %scene.key(), %error, "scene exit failed");
            self.events.push(SceneEvent::ExitFailed {
                scene: scene.id().to_string(),
                key: scene.key(),
                message: error.to_string(),
            });
        }
    }

    async fn build_and_enter<S, F>(&mut self, factory: F) -> Result<ActiveScene, SceneError>
    where
        S: Scene + 'static,
        F: FnOnce(&mut World) -> Result<S, WorldError>,
    {
        let mut world = World::with_config(self.config.world.clone());
        let scene = factory(&mut world)?;
        self.next_key += 1;
        let mut entry = ActiveScene::new(SceneKey(self.next_key), world, Box::new(scene));
        let span = tracing::debug_span!("scene_enter", scene = entry.id());
        entry.enter().instrument(span).await.map_err(|source| SceneError::Lifecycle {
            scene: entry.id().to_string(),
            phase: "enter",
            source,
        })?;
        Ok(entry)
    }
}

impl std::fmt::Debug for SceneManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut transitions: Vec<&str> = self.transitions.keys().map(String::as_str).collect();
        transitions.sort_unstable();
        f.debug_struct("SceneManager")
            .field("stack", &self.scene_ids())
            .field("transitions", &transitions)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}
