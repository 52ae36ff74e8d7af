use arcade_common::Entity;
use arcade_ecs::ComponentValue;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Full dump of a world: every live entity and every store's contents.
///
/// Values are borrowed from the live stores, not cloned. Convert with
/// [`WorldDump::to_json`] before keeping the data across further mutation.
#[derive(Debug)]
pub struct WorldDump<'w> {
    pub entities: Vec<Entity>,
    pub components: Vec<ComponentDump<'w>>,
}

/// Contents of one component store. `entities[i]` owns `data[i]`.
#[derive(Debug)]
pub struct ComponentDump<'w> {
    pub name: &'static str,
    pub entities: Vec<Entity>,
    pub data: Vec<&'w dyn ComponentValue>,
}

/// Every component attached to one entity, keyed by component name.
#[derive(Debug)]
pub struct EntitySnapshot<'w> {
    pub entity: Entity,
    pub components: BTreeMap<&'static str, &'w dyn ComponentValue>,
}

impl WorldDump<'_> {
    /// `{"entities": [..], "components": [{"name", "entities", "data"}]}`
    pub fn to_json(&self) -> serde_json::Result<Value> {
        let components = self
            .components
            .iter()
            .map(ComponentDump::to_json)
            .collect::<serde_json::Result<Vec<_>>>()?;
        let mut root = Map::new();
        root.insert("entities".into(), serde_json::to_value(&self.entities)?);
        root.insert("components".into(), Value::Array(components));
        Ok(Value::Object(root))
    }
}

impl ComponentDump<'_> {
    pub fn to_json(&self) -> serde_json::Result<Value> {
        let data = self
            .data
            .iter()
            .map(|v| v.to_json())
            .collect::<serde_json::Result<Vec<_>>>()?;
        let mut map = Map::new();
        map.insert("name".into(), Value::String(self.name.to_string()));
        map.insert("entities".into(), serde_json::to_value(&self.entities)?);
        map.insert("data".into(), Value::Array(data));
        Ok(Value::Object(map))
    }
}

impl EntitySnapshot<'_> {
    /// `{"entity": id, "components": {name: data}}`
    pub fn to_json(&self) -> serde_json::Result<Value> {
        let mut components = Map::new();
        for (name, value) in &self.components {
            components.insert((*name).to_string(), value.to_json()?);
        }
        let mut map = Map::new();
        map.insert("entity".into(), serde_json::to_value(self.entity)?);
        map.insert("components".into(), Value::Object(components));
        Ok(Value::Object(map))
    }
}
