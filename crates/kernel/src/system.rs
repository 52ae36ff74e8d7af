use crate::error::BoxError;
use crate::world::World;
use arcade_common::Stage;
use std::fmt;
use std::future::Future;

/// Result of a single system execution.
pub type SystemResult = Result<(), BoxError>;

/// A unit of per-frame behaviour.
///
/// Systems are synchronous. Work that has to wait on I/O is handed to
/// [`SystemContext::spawn_task`] and applied later by whoever drives the
/// world's task queue.
pub trait System {
    /// Identifier used for unregistering and in logs. Need not be unique;
    /// unregistering removes the first match.
    fn id(&self) -> &str;

    /// Position within the stage. Lower runs first.
    fn order(&self) -> i32 {
        0
    }

    fn execute(&mut self, ctx: &mut SystemContext<'_>) -> SystemResult;
}

/// Per-call state handed to every system of one `step` or `render`.
pub struct SystemContext<'w> {
    pub world: &'w mut World,
    /// Time advanced by this call. Zero during render.
    pub delta: f64,
    /// Simulation time accumulated so far, including this step.
    pub elapsed: f64,
    pub total_time: f64,
    /// Interpolation fraction between ticks; only set during render.
    pub alpha: Option<f64>,
}

impl SystemContext<'_> {
    /// Queue async work on the world's task channel. The scheduler does not
    /// wait for it.
    pub fn spawn_task<F>(&mut self, label: impl Into<String>, task: F)
    where
        F: Future<Output = Result<crate::WorldCommand, BoxError>> + 'static,
    {
        self.world.spawn_task(label, task);
    }

    pub fn is_render(&self) -> bool {
        self.alpha.is_some()
    }
}

impl fmt::Debug for SystemContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemContext")
            .field("delta", &self.delta)
            .field("elapsed", &self.elapsed)
            .field("total_time", &self.total_time)
            .field("alpha", &self.alpha)
            .finish_non_exhaustive()
    }
}

/// A system backed by a closure.
pub struct FnSystem<F> {
    id: String,
    order: i32,
    run: F,
}

impl<F> FnSystem<F>
where
    F: FnMut(&mut SystemContext<'_>) -> SystemResult,
{
    pub fn new(id: impl Into<String>, run: F) -> Self {
        Self {
            id: id.into(),
            order: 0,
            run,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&mut SystemContext<'_>) -> SystemResult,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn execute(&mut self, ctx: &mut SystemContext<'_>) -> SystemResult {
        (self.run)(ctx)
    }
}

/// Registration details of a scheduled system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    pub id: String,
    pub stage: Stage,
    pub order: i32,
}
