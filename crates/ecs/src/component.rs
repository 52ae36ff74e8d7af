use serde::Serialize;
use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;

/// Marker for types that can be stored as component data.
///
/// Components must be `Serialize` so a world dump can be turned into JSON
/// without knowing the concrete types.
pub trait Component: Any + fmt::Debug + Serialize {}

impl<T: Any + fmt::Debug + Serialize> Component for T {}

/// Type-erased view of a stored component value.
pub trait ComponentValue: Any + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    /// JSON form of the value.
    fn to_json(&self) -> serde_json::Result<serde_json::Value>;
    fn type_name(&self) -> &'static str;
}

impl<T: Component> ComponentValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

impl dyn ComponentValue + '_ {
    /// Downcast to a concrete component type.
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }
}

/// Definition of a component: the store name plus an optional factory for
/// default values.
///
/// Identity is the name. Two definitions with the same name share one store,
/// as long as they agree on `T`.
///
/// ```ignore
/// const POSITION: ComponentDef<Position> = ComponentDef::with_default("Position");
/// ```
pub struct ComponentDef<T> {
    name: &'static str,
    defaults: Option<fn() -> T>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Component> ComponentDef<T> {
    /// A definition without defaults; `ensure_component` on it fails when the
    /// component is absent.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            defaults: None,
            _marker: PhantomData,
        }
    }

    /// A definition whose defaults come from `factory`.
    pub const fn with_defaults(name: &'static str, factory: fn() -> T) -> Self {
        Self {
            name,
            defaults: Some(factory),
            _marker: PhantomData,
        }
    }

    /// A definition whose defaults come from `T::default()`.
    pub const fn with_default(name: &'static str) -> Self
    where
        T: Default,
    {
        let factory: fn() -> T = T::default;
        Self::with_defaults(name, factory)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn has_defaults(&self) -> bool {
        self.defaults.is_some()
    }

    /// Build a fresh default value, if this definition has a factory.
    pub fn make_default(&self) -> Option<T> {
        self.defaults.map(|factory| factory())
    }

    pub fn type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }
}

impl<T> Clone for ComponentDef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ComponentDef<T> {}

impl<T> fmt::Debug for ComponentDef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDef")
            .field("name", &self.name)
            .field("type", &std::any::type_name::<T>())
            .field("defaults", &self.defaults.is_some())
            .finish()
    }
}
