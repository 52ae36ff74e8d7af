use crate::config::WorldConfig;
use crate::dump::{ComponentDump, EntitySnapshot, WorldDump};
use crate::error::{SystemFailure, WorldError};
use crate::scheduler::Scheduler;
use crate::tasks::TaskQueue;
use arcade_common::{Entity, EntityAllocator};
use arcade_ecs::{Component, ComponentDef, Components, QueryResult, QuerySpec};
use std::collections::BTreeSet;
use std::fmt;

/// Entities, their components, and the systems that act on them.
///
/// Entity ids are monotonic and iteration is by ascending id everywhere, so
/// two worlds fed the same operations in the same order end up identical.
#[derive(Default)]
pub struct World {
    config: WorldConfig,
    allocator: EntityAllocator,
    entities: BTreeSet<Entity>,
    components: Components,
    pub(crate) scheduler: Scheduler,
    pub(crate) tasks: TaskQueue,
    pub(crate) failures: Vec<SystemFailure>,
    pub(crate) total_time: f64,
    pub(crate) frame: u64,
}

impl World {
    /// Create an empty world with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: WorldConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Simulation time accumulated by `step`.
    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    /// Number of `step` calls so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Take the failures recorded under [`crate::ErrorPolicy::Continue`].
    pub fn drain_failures(&mut self) -> Vec<SystemFailure> {
        std::mem::take(&mut self.failures)
    }

    // --- Entities ---

    pub fn create_entity(&mut self) -> Entity {
        let entity = self.allocator.allocate();
        self.entities.insert(entity);
        tracing::trace!(%entity, "entity created");
        entity
    }

    /// Remove `entity` and every component attached to it. No-op if absent.
    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        if !self.entities.remove(&entity) {
            return false;
        }
        let removed = self.components.remove_entity(entity);
        tracing::trace!(%entity, components = removed, "entity destroyed");
        true
    }

    pub fn has_entity(&self, entity: Entity) -> bool {
        self.entities.contains(&entity)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Live entities, ascending.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter().copied()
    }

    // --- Components ---

    /// Bind `def`'s name to its type ahead of first use.
    pub fn register_component<T: Component>(
        &mut self,
        def: &ComponentDef<T>,
    ) -> Result<(), WorldError> {
        self.components.register(def)?;
        Ok(())
    }

    /// Names of all component stores, sorted.
    pub fn component_names(&self) -> Vec<&'static str> {
        self.components.names().collect()
    }

    /// Attach `data` to a live entity, replacing any previous value.
    pub fn add_component<T: Component>(
        &mut self,
        entity: Entity,
        def: &ComponentDef<T>,
        data: T,
    ) -> Result<(), WorldError> {
        if !self.has_entity(entity) {
            return Err(WorldError::EntityNotFound(entity));
        }
        self.components.insert(entity, def, data)?;
        Ok(())
    }

    /// Attach `data`, bringing `entity` to life first if needed.
    ///
    /// Fails on a component type conflict, or with
    /// [`WorldError::EntityIdOutOfRange`] for ids above [`Entity::MAX_ID`].
    pub fn upsert_component<T: Component>(
        &mut self,
        entity: Entity,
        def: &ComponentDef<T>,
        data: T,
    ) -> Result<(), WorldError> {
        if entity.id() > Entity::MAX_ID {
            return Err(WorldError::EntityIdOutOfRange(entity));
        }
        self.components.insert(entity, def, data)?;
        if self.entities.insert(entity) {
            self.allocator.observe(entity);
            tracing::trace!(%entity, "entity created by upsert");
        }
        Ok(())
    }

    pub fn get_component<T: Component>(&self, entity: Entity, def: &ComponentDef<T>) -> Option<&T> {
        self.components.get(entity, def)
    }

    pub fn get_component_mut<T: Component>(
        &mut self,
        entity: Entity,
        def: &ComponentDef<T>,
    ) -> Option<&mut T> {
        self.components.get_mut(entity, def)
    }

    /// Existing component, or a fresh default attached on the spot.
    ///
    /// Fails with [`WorldError::ComponentMissingDefaults`] when absent and
    /// `def` has no defaults, and with [`WorldError::EntityNotFound`] when a
    /// default would have to be attached to a dead entity.
    pub fn ensure_component<T: Component>(
        &mut self,
        entity: Entity,
        def: &ComponentDef<T>,
    ) -> Result<&mut T, WorldError> {
        let live = self.entities.contains(&entity);
        let value = self
            .components
            .get_or_insert_with(entity, def, || if live { def.make_default() } else { None })?;
        match value {
            Some(value) => Ok(value),
            None if !def.has_defaults() => Err(WorldError::ComponentMissingDefaults(def.name())),
            None => Err(WorldError::EntityNotFound(entity)),
        }
    }

    /// Detach and return the component. Silent when absent.
    pub fn remove_component<T: Component>(
        &mut self,
        entity: Entity,
        def: &ComponentDef<T>,
    ) -> Option<T> {
        self.components.remove(entity, def)
    }

    // --- Queries and dumps ---

    /// Evaluate `spec` against the live entities.
    pub fn query(&self, spec: &QuerySpec) -> QueryResult<'_> {
        spec.evaluate(&self.components, self.entities.iter().copied())
    }

    /// Borrowed dump of every live entity and store.
    pub fn serialize(&self) -> WorldDump<'_> {
        let components = self
            .components
            .stores()
            .map(|store| {
                let (entities, data) = store.iter().unzip();
                ComponentDump {
                    name: store.name(),
                    entities,
                    data,
                }
            })
            .collect();
        WorldDump {
            entities: self.entities().collect(),
            components,
        }
    }

    /// Every component of one live entity.
    pub fn snapshot(&self, entity: Entity) -> Result<EntitySnapshot<'_>, WorldError> {
        if !self.has_entity(entity) {
            return Err(WorldError::EntityNotFound(entity));
        }
        Ok(EntitySnapshot {
            entity,
            components: self.components.of_entity(entity).collect(),
        })
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.entities.len())
            .field("stores", &self.component_names())
            .field("systems", &self.scheduler.len())
            .field("pending_tasks", &self.tasks)
            .field("total_time", &self.total_time)
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use serde_json::json;

    #[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
    struct Position {
        x: f64,
        y: f64,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Serialize)]
    struct Velocity {
        dx: f64,
        dy: f64,
    }

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Tag(String);

    const POSITION: ComponentDef<Position> = ComponentDef::with_default("Position");
    const VELOCITY: ComponentDef<Velocity> = ComponentDef::new("Velocity");
    const TAG: ComponentDef<Tag> = ComponentDef::new("Tag");

    #[test]
    fn world_starts_empty() {
        let w = World::new();
        assert_eq!(w.entity_count(), 0);
        assert_eq!(w.total_time(), 0.0);
        assert!(w.component_names().is_empty());
    }

    #[test]
    fn create_and_destroy() {
        let mut w = World::new();
        let a = w.create_entity();
        let b = w.create_entity();
        assert!(a < b);
        assert!(w.has_entity(a));
        assert!(w.destroy_entity(a));
        assert!(!w.has_entity(a));
        // Destroying twice is a no-op.
        assert!(!w.destroy_entity(a));
        assert_eq!(w.entities().collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn ids_are_not_reused_after_destroy() {
        let mut w = World::new();
        let a = w.create_entity();
        w.destroy_entity(a);
        assert_ne!(w.create_entity(), a);
    }

    #[test]
    fn destroy_removes_from_every_store() {
        let mut w = World::new();
        let e = w.create_entity();
        w.add_component(e, &POSITION, Position::default()).unwrap();
        w.add_component(e, &VELOCITY, Velocity { dx: 1.0, dy: 0.0 }).unwrap();
        w.destroy_entity(e);

        assert!(w.get_component(e, &POSITION).is_none());
        assert!(w.get_component(e, &VELOCITY).is_none());
        let dump = w.serialize();
        assert!(dump.components.iter().all(|c| c.entities.is_empty()));
    }

    #[test]
    fn add_requires_live_entity() {
        let mut w = World::new();
        let err = w.add_component(Entity(7), &POSITION, Position::default()).unwrap_err();
        assert!(matches!(err, WorldError::EntityNotFound(Entity(7))));
        assert!(!w.has_entity(Entity(7)));
    }

    #[test]
    fn upsert_creates_missing_entity() {
        let mut w = World::new();
        w.upsert_component(Entity(7), &POSITION, Position { x: 1.0, y: 2.0 }).unwrap();
        assert!(w.has_entity(Entity(7)));
        assert_eq!(w.get_component(Entity(7), &POSITION).unwrap().y, 2.0);
        // Later allocations never collide with the upserted id.
        assert_eq!(w.create_entity(), Entity(8));
    }

    #[test]
    fn upsert_rejects_ids_past_the_ceiling() {
        let mut w = World::new();
        let err = w.upsert_component(Entity(u64::MAX), &TAG, Tag("x".into())).unwrap_err();
        assert!(matches!(err, WorldError::EntityIdOutOfRange(Entity(u64::MAX))));
        assert!(!w.has_entity(Entity(u64::MAX)));
        assert!(w.get_component(Entity(u64::MAX), &TAG).is_none());
        assert_eq!(w.create_entity(), Entity(1));

        let top = Entity(Entity::MAX_ID);
        w.upsert_component(top, &TAG, Tag("y".into())).unwrap();
        let next = w.create_entity();
        assert!(next > top);
    }

    #[test]
    fn add_overwrites_existing_value() {
        let mut w = World::new();
        let e = w.create_entity();
        w.add_component(e, &TAG, Tag("a".into())).unwrap();
        w.add_component(e, &TAG, Tag("b".into())).unwrap();
        assert_eq!(w.get_component(e, &TAG), Some(&Tag("b".into())));
    }

    #[test]
    fn get_never_fails() {
        let w = World::new();
        assert!(w.get_component(Entity(1), &POSITION).is_none());
        assert!(!w.has_entity(Entity(1)));
    }

    #[test]
    fn ensure_returns_existing_or_default() {
        let mut w = World::new();
        let e = w.create_entity();
        w.ensure_component(e, &POSITION).unwrap().x = 4.0;
        assert_eq!(w.ensure_component(e, &POSITION).unwrap().x, 4.0);
    }

    #[test]
    fn ensure_without_defaults_fails() {
        let mut w = World::new();
        let e = w.create_entity();
        let err = w.ensure_component(e, &VELOCITY).unwrap_err();
        assert!(matches!(err, WorldError::ComponentMissingDefaults("Velocity")));
        // Once present, defaults are not needed.
        w.add_component(e, &VELOCITY, Velocity { dx: 0.0, dy: 1.0 }).unwrap();
        assert_eq!(w.ensure_component(e, &VELOCITY).unwrap().dy, 1.0);
    }

    #[test]
    fn ensure_on_dead_entity_fails() {
        let mut w = World::new();
        let err = w.ensure_component(Entity(3), &POSITION).unwrap_err();
        assert!(matches!(err, WorldError::EntityNotFound(Entity(3))));
        assert!(w.get_component(Entity(3), &POSITION).is_none());
    }

    #[test]
    fn remove_is_silent_when_absent() {
        let mut w = World::new();
        let e = w.create_entity();
        assert!(w.remove_component(e, &TAG).is_none());
        w.add_component(e, &TAG, Tag("x".into())).unwrap();
        assert_eq!(w.remove_component(e, &TAG), Some(Tag("x".into())));
        assert!(w.has_entity(e));
    }

    #[test]
    fn conflicting_definitions_are_rejected() {
        const OTHER: ComponentDef<Tag> = ComponentDef::new("Position");
        let mut w = World::new();
        w.register_component(&POSITION).unwrap();
        // Re-registering the same pairing is fine.
        w.register_component(&POSITION).unwrap();
        let e = w.create_entity();
        let err = w.add_component(e, &OTHER, Tag("nope".into())).unwrap_err();
        assert!(matches!(err, WorldError::ComponentTypeConflict(_)));
        assert!(w.register_component(&OTHER).is_err());
    }

    #[test]
    fn query_against_world() {
        let mut w = World::new();
        let a = w.create_entity();
        let b = w.create_entity();
        let c = w.create_entity();
        w.add_component(a, &POSITION, Position::default()).unwrap();
        w.add_component(b, &POSITION, Position::default()).unwrap();
        w.add_component(b, &VELOCITY, Velocity { dx: 1.0, dy: 1.0 }).unwrap();
        w.add_component(c, &VELOCITY, Velocity { dx: 2.0, dy: 2.0 }).unwrap();

        let both = w.query(&QuerySpec::new().all(["Position", "Velocity"]));
        assert_eq!(both.entities(), &[b]);

        let either = w.query(&QuerySpec::new().any(["Position", "Velocity"]));
        assert_eq!(either.size(), 3);

        let still = w.query(&QuerySpec::new().all(["Position"]).none(["Velocity"]));
        assert_eq!(still.entities(), &[a]);

        let empty: [&str; 0] = [];
        assert_eq!(w.query(&QuerySpec::new().any(empty)).size(), 0);

        w.destroy_entity(b);
        assert!(w.query(&QuerySpec::new().all(["Velocity"])).entities() == [c]);
    }

    #[test]
    fn serialize_dumps_everything() {
        let mut w = World::new();
        let a = w.create_entity();
        let b = w.create_entity();
        w.add_component(a, &POSITION, Position { x: 1.0, y: 2.0 }).unwrap();
        w.add_component(b, &TAG, Tag("player".into())).unwrap();

        let dump = w.serialize();
        assert_eq!(dump.entities, vec![a, b]);
        assert_eq!(dump.components.len(), 2);
        assert_eq!(
            dump.to_json().unwrap(),
            json!({
                "entities": [1, 2],
                "components": [
                    {"name": "Position", "entities": [1], "data": [{"x": 1.0, "y": 2.0}]},
                    {"name": "Tag", "entities": [2], "data": ["player"]}
                ]
            })
        );
    }

    #[test]
    fn serialize_borrows_live_values() {
        let mut w = World::new();
        let e = w.create_entity();
        w.add_component(e, &POSITION, Position { x: 5.0, y: 0.0 }).unwrap();
        let dump = w.serialize();
        let stored = w.get_component(e, &POSITION).unwrap();
        let dumped = dump.components[0].data[0].downcast_ref::<Position>().unwrap();
        assert!(std::ptr::eq(stored, dumped));
    }

    #[test]
    fn snapshot_of_entity() {
        let mut w = World::new();
        let e = w.create_entity();
        w.add_component(e, &POSITION, Position { x: 3.0, y: 4.0 }).unwrap();
        w.add_component(e, &TAG, Tag("hero".into())).unwrap();

        let snap = w.snapshot(e).unwrap();
        assert_eq!(snap.entity, e);
        assert_eq!(snap.components.len(), 2);
        assert_eq!(
            snap.to_json().unwrap(),
            json!({"entity": 1, "components": {"Position": {"x": 3.0, "y": 4.0}, "Tag": "hero"}})
        );

        let err = w.snapshot(Entity(42)).unwrap_err();
        assert!(matches!(err, WorldError::EntityNotFound(Entity(42))));
    }

    #[test]
    fn debug_output_summarises() {
        let mut w = World::new();
        w.create_entity();
        let s = format!("{w:?}");
        assert!(s.contains("entities: 1"));
    }
}
