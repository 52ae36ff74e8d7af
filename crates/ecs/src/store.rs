use crate::component::{Component, ComponentDef, ComponentValue};
use arcade_common::Entity;
use std::any::TypeId;
use std::collections::BTreeMap;

/// A component name was used with two different Rust types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("component `{name}` is stored as `{existing}`, cannot use it as `{requested}`")]
pub struct TypeConflict {
    pub name: String,
    pub existing: &'static str,
    pub requested: &'static str,
}

/// Sparse entity → data map for one component name.
#[derive(Debug)]
pub struct ComponentStore {
    name: &'static str,
    type_id: TypeId,
    type_name: &'static str,
    data: BTreeMap<Entity, Box<dyn ComponentValue>>,
}

impl ComponentStore {
    fn for_def<T: Component>(def: &ComponentDef<T>) -> Self {
        Self {
            name: def.name(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            data: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Rust type the name is bound to.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.data.contains_key(&entity)
    }

    pub fn get(&self, entity: Entity) -> Option<&dyn ComponentValue> {
        self.data.get(&entity).map(|v| &**v)
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut dyn ComponentValue> {
        self.data.get_mut(&entity).map(|v| &mut **v)
    }

    /// Entities with data in this store, ascending.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.data.keys().copied()
    }

    /// `(entity, value)` pairs, ascending by entity.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &dyn ComponentValue)> + '_ {
        self.data.iter().map(|(e, v)| (*e, &**v))
    }

    fn insert(&mut self, entity: Entity, value: Box<dyn ComponentValue>) {
        self.data.insert(entity, value);
    }

    fn remove(&mut self, entity: Entity) -> Option<Box<dyn ComponentValue>> {
        self.data.remove(&entity)
    }

    fn check<T: Component>(&self) -> Result<(), TypeConflict> {
        if self.type_id == TypeId::of::<T>() {
            Ok(())
        } else {
            Err(TypeConflict {
                name: self.name.to_string(),
                existing: self.type_name,
                requested: std::any::type_name::<T>(),
            })
        }
    }
}

/// All component stores of one world, keyed by component name.
///
/// The collection knows nothing about entity liveness; the world is
/// responsible for only inserting data for live entities and for calling
/// [`Components::remove_entity`] on destruction.
#[derive(Debug, Default)]
pub struct Components {
    stores: BTreeMap<&'static str, ComponentStore>,
}

impl Components {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `def`'s name to `T`, creating the store on first use.
    ///
    /// Fails if the name is already bound to another type.
    pub fn register<T: Component>(
        &mut self,
        def: &ComponentDef<T>,
    ) -> Result<&mut ComponentStore, TypeConflict> {
        let store = self.stores.entry(def.name()).or_insert_with(|| {
            tracing::debug!(component = def.name(), "component store created");
            ComponentStore::for_def(def)
        });
        store.check::<T>()?;
        Ok(store)
    }

    pub fn store(&self, name: &str) -> Option<&ComponentStore> {
        self.stores.get(name)
    }

    /// Stores in name order.
    pub fn stores(&self) -> impl Iterator<Item = &ComponentStore> + '_ {
        self.stores.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.stores.keys().copied()
    }

    pub fn contains(&self, entity: Entity, name: &str) -> bool {
        self.stores.get(name).is_some_and(|s| s.contains(entity))
    }

    /// Typed lookup. A type mismatch reads as absent.
    pub fn get<T: Component>(&self, entity: Entity, def: &ComponentDef<T>) -> Option<&T> {
        self.stores.get(def.name())?.get(entity)?.downcast_ref()
    }

    pub fn get_mut<T: Component>(
        &mut self,
        entity: Entity,
        def: &ComponentDef<T>,
    ) -> Option<&mut T> {
        self.stores.get_mut(def.name())?.get_mut(entity)?.downcast_mut()
    }

    /// Insert or overwrite the value for `entity`.
    pub fn insert<T: Component>(
        &mut self,
        entity: Entity,
        def: &ComponentDef<T>,
        value: T,
    ) -> Result<(), TypeConflict> {
        self.register(def)?.insert(entity, Box::new(value));
        Ok(())
    }

    /// Existing value for `entity`, or the output of `make` inserted in its
    /// place. `Ok(None)` when absent and `make` has nothing to offer.
    pub fn get_or_insert_with<T: Component>(
        &mut self,
        entity: Entity,
        def: &ComponentDef<T>,
        make: impl FnOnce() -> Option<T>,
    ) -> Result<Option<&mut T>, TypeConflict> {
        let store = self.register(def)?;
        if !store.contains(entity) {
            match make() {
                Some(value) => store.insert(entity, Box::new(value)),
                None => return Ok(None),
            }
        }
        Ok(store.get_mut(entity).and_then(|v| v.downcast_mut()))
    }

    /// Remove and return the value. Silent when absent.
    pub fn remove<T: Component>(&mut self, entity: Entity, def: &ComponentDef<T>) -> Option<T> {
        let store = self.stores.get_mut(def.name())?;
        if store.check::<T>().is_err() {
            return None;
        }
        let boxed = store.remove(entity)?;
        boxed.into_any().downcast::<T>().ok().map(|b| *b)
    }

    /// Drop every component attached to `entity`. Returns how many were removed.
    pub fn remove_entity(&mut self, entity: Entity) -> usize {
        self.stores
            .values_mut()
            .filter_map(|store| store.remove(entity))
            .count()
    }

    /// Every `(name, value)` attached to `entity`, in name order.
    pub fn of_entity(
        &self,
        entity: Entity,
    ) -> impl Iterator<Item = (&'static str, &dyn ComponentValue)> + '_ {
        self.stores
            .values()
            .filter_map(move |store| store.get(entity).map(|v| (store.name(), v)))
    }
}
