use crate::component::{Component, ComponentDef, ComponentValue};
use crate::store::Components;
use arcade_common::Entity;
use std::collections::BTreeSet;

/// Declarative component filter.
///
/// An entity matches when it has every `all` component, at least one `any`
/// component (when an `any` list was given), and none of the `none`
/// components. An `any` list that is given but empty matches nothing, while
/// an empty `all` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySpec {
    all: Vec<String>,
    any: Option<Vec<String>>,
    none: Vec<String>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require every listed component.
    pub fn all<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.all.extend(names.into_iter().map(|n| n.as_ref().to_string()));
        self
    }

    /// Require at least one listed component. Calling this with an empty
    /// list makes the query match nothing.
    pub fn any<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.any
            .get_or_insert_with(Vec::new)
            .extend(names.into_iter().map(|n| n.as_ref().to_string()));
        self
    }

    /// Exclude entities that have any listed component.
    pub fn none<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.none.extend(names.into_iter().map(|n| n.as_ref().to_string()));
        self
    }

    pub fn all_names(&self) -> &[String] {
        &self.all
    }

    pub fn any_names(&self) -> Option<&[String]> {
        self.any.as_deref()
    }

    pub fn none_names(&self) -> &[String] {
        &self.none
    }

    /// Whether `entity` satisfies the filter.
    pub fn matches(&self, components: &Components, entity: Entity) -> bool {
        self.all.iter().all(|n| components.contains(entity, n))
            && self
                .any
                .as_ref()
                .is_none_or(|any| any.iter().any(|n| components.contains(entity, n)))
            && !self.none.iter().any(|n| components.contains(entity, n))
    }

    /// Names reported on each row: `all` followed by `any`, deduplicated.
    fn projected(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.all
            .iter()
            .chain(self.any.iter().flatten())
            .filter(|n| seen.insert(n.as_str()))
            .cloned()
            .collect()
    }

    /// Evaluate against `components`, considering only `live` entities.
    ///
    /// Matching happens eagerly so the size is known up front; rows are
    /// assembled as the result is iterated.
    pub fn evaluate<'w, I>(&self, components: &'w Components, live: I) -> QueryResult<'w>
    where
        I: IntoIterator<Item = Entity>,
    {
        let entities: Vec<Entity> = if matches!(&self.any, Some(any) if any.is_empty()) {
            Vec::new()
        } else {
            live.into_iter()
                .filter(|e| self.matches(components, *e))
                .collect()
        };
        tracing::trace!(matched = entities.len(), "query evaluated");
        QueryResult {
            components,
            columns: self.projected(),
            entities,
        }
    }
}

/// Matched entities of a query.
#[derive(Debug)]
pub struct QueryResult<'w> {
    components: &'w Components,
    columns: Vec<String>,
    entities: Vec<Entity>,
}

impl<'w> QueryResult<'w> {
    /// Number of matched entities.
    pub fn size(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Matched entity ids, ascending.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }
}

impl<'w> IntoIterator for QueryResult<'w> {
    type Item = QueryRow<'w>;
    type IntoIter = QueryIter<'w>;

    fn into_iter(self) -> Self::IntoIter {
        QueryIter {
            components: self.components,
            columns: self.columns,
            entities: self.entities.into_iter(),
        }
    }
}

/// Single-pass iterator over query rows.
#[derive(Debug)]
pub struct QueryIter<'w> {
    components: &'w Components,
    columns: Vec<String>,
    entities: std::vec::IntoIter<Entity>,
}

impl<'w> Iterator for QueryIter<'w> {
    type Item = QueryRow<'w>;

    fn next(&mut self) -> Option<Self::Item> {
        let entity = self.entities.next()?;
        let values = self
            .columns
            .iter()
            .filter_map(|name| {
                let store = self.components.store(name)?;
                store.get(entity).map(|v| (store.name(), v))
            })
            .collect();
        Some(QueryRow { entity, values })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entities.size_hint()
    }
}

impl ExactSizeIterator for QueryIter<'_> {}

/// One matched entity with its present projected components.
#[derive(Debug)]
pub struct QueryRow<'w> {
    pub entity: Entity,
    values: Vec<(&'static str, &'w dyn ComponentValue)>,
}

impl<'w> QueryRow<'w> {
    /// Typed access by definition. Absent or mismatched reads as `None`.
    pub fn get<T: Component>(&self, def: &ComponentDef<T>) -> Option<&'w T> {
        self.value(def.name())?.downcast_ref()
    }

    /// Untyped access by component name.
    pub fn value(&self, name: &str) -> Option<&'w dyn ComponentValue> {
        self.values.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }

    pub fn has(&self, name: &str) -> bool {
        self.values.iter().any(|(n, _)| *n == name)
    }

    /// Present component names in projection order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.iter().map(|(n, _)| *n)
    }
}
