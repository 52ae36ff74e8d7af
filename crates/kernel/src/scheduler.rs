//! Stage-ordered system scheduling and the per-frame entry points.

use crate::config::ErrorPolicy;
use crate::error::{SystemFailure, WorldError};
use crate::system::{System, SystemContext, SystemInfo};
use crate::world::World;
use arcade_common::{IntoStage, Stage};

pub(crate) struct Scheduled {
    stage: Stage,
    order: i32,
    system: Box<dyn System>,
}

enum Deferred {
    Register(Scheduled),
    Unregister(String),
}

/// Systems sorted by `(stage, order)`.
///
/// While a pass is running the list is lent out to the pass, so changes made
/// by systems themselves are deferred until the outermost pass ends.
#[derive(Default)]
pub(crate) struct Scheduler {
    systems: Vec<Scheduled>,
    depth: usize,
    deferred: Vec<Deferred>,
}

impl Scheduler {
    pub(crate) fn len(&self) -> usize {
        self.systems.len()
    }

    fn insert(&mut self, scheduled: Scheduled) {
        self.systems.push(scheduled);
        // Stable: equal keys keep registration order.
        self.systems.sort_by_key(|s| (s.stage.index(), s.order));
    }

    fn remove(&mut self, id: &str) -> bool {
        match self.systems.iter().position(|s| s.system.id() == id) {
            Some(index) => {
                self.systems.remove(index);
                true
            }
            None => false,
        }
    }

    fn begin(&mut self) -> Vec<Scheduled> {
        self.depth += 1;
        std::mem::take(&mut self.systems)
    }

    fn end(&mut self, systems: Vec<Scheduled>) {
        self.depth -= 1;
        self.systems = systems;
        if self.depth > 0 {
            return;
        }
        for change in std::mem::take(&mut self.deferred) {
            match change {
                Deferred::Register(scheduled) => self.insert(scheduled),
                Deferred::Unregister(id) => {
                    self.remove(&id);
                }
            }
        }
    }
}

impl World {
    /// Register `system` in `stage`.
    ///
    /// Fails with [`WorldError::UnknownStage`] for a stage name outside the
    /// six known stages; the system list is left untouched in that case.
    /// Registering from inside a running system takes effect once the
    /// current `step`/`render` finishes.
    pub fn register_system<S>(&mut self, stage: impl IntoStage, system: S) -> Result<(), WorldError>
    where
        S: System + 'static,
    {
        let stage = stage.into_stage()?;
        tracing::debug!(
            system = system.id(),
            %stage,
            order = system.order(),
            "system registered"
        );
        let scheduled = Scheduled {
            stage,
            order: system.order(),
            system: Box::new(system),
        };
        if self.scheduler.depth > 0 {
            self.scheduler.deferred.push(Deferred::Register(scheduled));
        } else {
            self.scheduler.insert(scheduled);
        }
        Ok(())
    }

    /// Remove the first system with `id`. Absent ids are ignored.
    ///
    /// Called from inside a running system, the removal happens after the
    /// current pass, so a system that has not run yet still runs once.
    pub fn unregister_system(&mut self, id: &str) {
        if self.scheduler.depth > 0 {
            self.scheduler
                .deferred
                .push(Deferred::Unregister(id.to_string()));
        } else if self.scheduler.remove(id) {
            tracing::debug!(system = id, "system unregistered");
        }
    }

    /// Registered systems in execution order.
    pub fn systems(&self) -> Vec<SystemInfo> {
        self.scheduler
            .systems
            .iter()
            .map(|s| SystemInfo {
                id: s.system.id().to_string(),
                stage: s.stage,
                order: s.order,
            })
            .collect()
    }

    /// Advance simulation time by `delta` and run every non-render stage.
    pub fn step(&mut self, delta: f64) -> Result<(), WorldError> {
        self.total_time += delta;
        self.frame += 1;
        let _span = tracing::trace_span!("world_step", frame = self.frame, delta).entered();
        self.run_pass(delta, None, Stage::is_simulation)
    }

    /// Run only render-stage systems. Does not advance time.
    pub fn render(&mut self, alpha: f64) -> Result<(), WorldError> {
        let _span = tracing::trace_span!("world_render", frame = self.frame, alpha).entered();
        self.run_pass(0.0, Some(alpha), |stage| stage == Stage::Render)
    }

    fn run_pass(
        &mut self,
        delta: f64,
        alpha: Option<f64>,
        include: impl Fn(Stage) -> bool,
    ) -> Result<(), WorldError> {
        let mut systems = self.scheduler.begin();
        let result = self.execute(&mut systems, delta, alpha, include);
        self.scheduler.end(systems);
        result
    }

    fn execute(
        &mut self,
        systems: &mut [Scheduled],
        delta: f64,
        alpha: Option<f64>,
        include: impl Fn(Stage) -> bool,
    ) -> Result<(), WorldError> {
        let policy = self.config().error_policy;
        let frame = self.frame;
        let total_time = self.total_time;
        let mut ctx = SystemContext {
            world: self,
            delta,
            elapsed: total_time,
            total_time,
            alpha,
        };

        for scheduled in systems.iter_mut().filter(|s| include(s.stage)) {
            let Err(source) = scheduled.system.execute(&mut ctx) else {
                continue;
            };
            let id = scheduled.system.id().to_string();
            match policy {
                ErrorPolicy::FailFast => {
                    return Err(WorldError::SystemFailed {
                        id,
                        stage: scheduled.stage,
                        source,
                    });
                }
                ErrorPolicy::Continue => {
                    tracing::warn!(
                        system = %id,
                        stage = %scheduled.stage,
                        error = %source,
                        "system failed, continuing"
                    );
                    ctx.world.failures.push(SystemFailure {
                        id,
                        stage: scheduled.stage,
                        frame,
                        message: source.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::*;
    use serde::Serialize;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    fn recorder(
        log: &Log,
        id: &'static str,
    ) -> FnSystem<impl FnMut(&mut SystemContext<'_>) -> SystemResult + 'static> {
        let log = Rc::clone(log);
        FnSystem::new(id, move |_ctx| {
            log.borrow_mut().push(id.to_string());
            Ok(())
        })
    }

    fn ordered(log: &Log, id: &'static str, order: i32) -> impl System + 'static {
        recorder(log, id).with_order(order)
    }

    #[test]
    fn ties_run_in_registration_order() {
        let log: Log = Rc::default();
        let mut world = World::new();
        world.register_system(Stage::Update, ordered(&log, "C", 2)).unwrap();
        world.register_system(Stage::Update, ordered(&log, "A", 0)).unwrap();
        world.register_system(Stage::Update, ordered(&log, "B", 0)).unwrap();
        world.step(16.0).unwrap();
        assert_eq!(*log.borrow(), vec!["A", "B", "C"]);
    }

    #[test]
    fn stages_run_in_fixed_order() {
        let log: Log = Rc::default();
        let mut world = World::new();
        world.register_system("cleanup", recorder(&log, "cleanup")).unwrap();
        world.register_system("render", recorder(&log, "render")).unwrap();
        world.register_system("postUpdate", recorder(&log, "post")).unwrap();
        world.register_system("init", recorder(&log, "init")).unwrap();
        world.register_system("update", recorder(&log, "update")).unwrap();
        world.register_system("preUpdate", recorder(&log, "pre")).unwrap();

        world.step(1.0).unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["init", "pre", "update", "post", "cleanup"]
        );

        log.borrow_mut().clear();
        world.render(0.5).unwrap();
        assert_eq!(*log.borrow(), vec!["render"]);
    }

    #[test]
    fn unknown_stage_leaves_list_untouched() {
        let log: Log = Rc::default();
        let mut world = World::new();
        world.register_system(Stage::Update, recorder(&log, "a")).unwrap();
        let err = world
            .register_system("physics", recorder(&log, "b"))
            .unwrap_err();
        assert!(matches!(err, WorldError::UnknownStage(_)));
        assert_eq!(world.systems().len(), 1);
        assert_eq!(world.systems()[0].id, "a");
    }

    #[test]
    fn unregister_removes_first_match_only() {
        let log: Log = Rc::default();
        let mut world = World::new();
        world.register_system(Stage::Update, recorder(&log, "dup")).unwrap();
        world.register_system(Stage::Update, recorder(&log, "dup")).unwrap();
        world.unregister_system("dup");
        assert_eq!(world.systems().len(), 1);
        // Absent ids are a no-op.
        world.unregister_system("missing");
        world.unregister_system("dup");
        world.unregister_system("dup");
        assert!(world.systems().is_empty());
    }

    #[test]
    fn total_time_accumulates_only_on_step() {
        let mut world = World::new();
        for delta in [16.0, 17.5, 0.25] {
            world.step(delta).unwrap();
        }
        assert!((world.total_time() - 33.75).abs() < 1e-9);
        world.render(0.3).unwrap();
        world.render(1.0).unwrap();
        assert!((world.total_time() - 33.75).abs() < 1e-9);
        assert_eq!(world.frame(), 3);
    }

    #[test]
    fn context_fields_per_pass() {
        let seen: Rc<RefCell<Vec<(f64, f64, Option<f64>)>>> = Rc::default();
        let mut world = World::new();
        let s = Rc::clone(&seen);
        world
            .register_system(
                Stage::Update,
                FnSystem::new("probe", move |ctx| {
                    s.borrow_mut().push((ctx.delta, ctx.total_time, ctx.alpha));
                    Ok(())
                }),
            )
            .unwrap();
        let s = Rc::clone(&seen);
        world
            .register_system(
                Stage::Render,
                FnSystem::new("draw", move |ctx| {
                    assert!(ctx.is_render());
                    assert_eq!(ctx.elapsed, ctx.total_time);
                    s.borrow_mut().push((ctx.delta, ctx.total_time, ctx.alpha));
                    Ok(())
                }),
            )
            .unwrap();

        world.step(10.0).unwrap();
        world.render(0.25).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![(10.0, 10.0, None), (0.0, 10.0, Some(0.25))]
        );
    }

    #[derive(Debug, Clone, Copy, Default, Serialize)]
    struct Position {
        x: f64,
        y: f64,
    }

    const POSITION: ComponentDef<Position> = ComponentDef::with_default("Position");

    #[test]
    fn movement_end_to_end() {
        let mut world = World::new();
        let e = world.create_entity();
        world.add_component(e, &POSITION, Position::default()).unwrap();
        world
            .register_system(
                Stage::Update,
                FnSystem::new("move", move |ctx| {
                    ctx.world.ensure_component(e, &POSITION)?.x += 1.0;
                    Ok(())
                }),
            )
            .unwrap();

        for _ in 0..3 {
            world.step(16.0).unwrap();
        }
        assert_eq!(world.get_component(e, &POSITION).unwrap().x, 3.0);

        world.unregister_system("move");
        world.step(16.0).unwrap();
        assert_eq!(world.get_component(e, &POSITION).unwrap().x, 3.0);
    }

    fn failing(id: &'static str) -> impl System + 'static {
        FnSystem::new(id, |_ctx| Err("boom".into()))
    }

    #[test]
    fn fail_fast_aborts_remaining_systems() {
        let log: Log = Rc::default();
        let mut world = World::new();
        world.register_system(Stage::PreUpdate, recorder(&log, "before")).unwrap();
        world.register_system(Stage::Update, failing("broken")).unwrap();
        world.register_system(Stage::PostUpdate, recorder(&log, "after")).unwrap();

        let err = world.step(1.0).unwrap_err();
        match err {
            WorldError::SystemFailed { id, stage, source } => {
                assert_eq!(id, "broken");
                assert_eq!(stage, Stage::Update);
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(*log.borrow(), vec!["before"]);
        // The list survives the failed pass.
        assert_eq!(world.systems().len(), 3);
        // Time still advanced for the aborted frame.
        assert_eq!(world.total_time(), 1.0);
    }

    #[test]
    fn continue_policy_runs_everything_and_records() {
        let log: Log = Rc::default();
        let mut world = World::with_config(WorldConfig {
            error_policy: ErrorPolicy::Continue,
        });
        world.register_system(Stage::Update, failing("broken")).unwrap();
        world.register_system(Stage::Update, recorder(&log, "after")).unwrap();

        world.step(1.0).unwrap();
        world.step(1.0).unwrap();
        assert_eq!(*log.borrow(), vec!["after", "after"]);

        let failures = world.drain_failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].id, "broken");
        assert_eq!(failures[0].frame, 1);
        assert_eq!(failures[1].frame, 2);
        assert_eq!(failures[1].message, "boom");
        assert!(world.drain_failures().is_empty());
    }

    #[test]
    fn world_errors_propagate_out_of_systems() {
        let mut world = World::new();
        world
            .register_system(
                Stage::Update,
                FnSystem::new("ghost", |ctx| {
                    ctx.world.add_component(Entity(99), &POSITION, Position::default())?;
                    Ok(())
                }),
            )
            .unwrap();
        let err = world.step(1.0).unwrap_err();
        let WorldError::SystemFailed { source, .. } = err else {
            panic!("expected SystemFailed");
        };
        let inner = source.downcast_ref::<WorldError>().unwrap();
        assert!(matches!(inner, WorldError::EntityNotFound(Entity(99))));
    }

    #[test]
    fn changes_made_during_a_pass_apply_afterwards() {
        let log: Log = Rc::default();
        let mut world = World::new();
        let inner = Rc::clone(&log);
        world
            .register_system(
                Stage::Update,
                FnSystem::new("spawner", move |ctx| {
                    inner.borrow_mut().push("spawner".into());
                    ctx.world.unregister_system("spawner");
                    let late = Rc::clone(&inner);
                    ctx.world.register_system(
                        Stage::PostUpdate,
                        FnSystem::new("late", move |_| {
                            late.borrow_mut().push("late".into());
                            Ok(())
                        }),
                    )?;
                    Ok(())
                }),
            )
            .unwrap();

        world.step(1.0).unwrap();
        // `late` was registered mid-pass, so it only runs next frame.
        assert_eq!(*log.borrow(), vec!["spawner"]);
        let ids: Vec<String> = world.systems().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["late"]);

        world.step(1.0).unwrap();
        assert_eq!(*log.borrow(), vec!["spawner", "late"]);
    }
}
