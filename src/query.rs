//! Composable entity queries.
//!
//! A query is a conjunction of predicates over one graph. Binders extend a
//! base query with the predicate for their facet; chaining several facets
//! yields their logical AND. Queries are lazy until [`EntityQuery::execute`].

use std::collections::BTreeSet;
use std::fmt;

use crate::config::ValidationOptions;
use crate::mapper::ValueMapper;
use crate::model::{Entity, EntityGraph, EntityLabel};

type EntityPredicate<'g> = Box<dyn Fn(&Entity) -> bool + 'g>;

/// A lazily evaluated filter over the entities of one graph.
pub struct EntityQuery<'g> {
    graph: &'g dyn EntityGraph,
    mapper: &'g ValueMapper,
    options: ValidationOptions,
    predicates: Vec<EntityPredicate<'g>>,
}

impl<'g> EntityQuery<'g> {
    /// A query selecting every entity in `graph`.
    #[must_use]
    pub fn over(
        graph: &'g dyn EntityGraph,
        mapper: &'g ValueMapper,
        options: ValidationOptions,
    ) -> Self {
        Self {
            graph,
            mapper,
            options,
            predicates: Vec::new(),
        }
    }

    /// Graph queried.
    #[must_use]
    pub fn graph(&self) -> &'g dyn EntityGraph {
        self.graph
    }

    /// Value mapper.
    #[must_use]
    pub fn mapper(&self) -> &'g ValueMapper {
        self.mapper
    }

    /// Evaluation options.
    #[must_use]
    pub const fn options(&self) -> ValidationOptions {
        self.options
    }

    /// Narrows the query with an additional predicate.
    #[must_use]
    pub fn filter(mut self, predicate: impl Fn(&Entity) -> bool + 'g) -> Self {
        self.predicates.push(Box::new(predicate));
        self
    }

    /// Narrows the query to entities that `other` does not select.
    #[must_use]
    pub fn exclude(self, other: EntityQuery<'g>) -> Self {
        self.filter(move |e| !other.matches(e))
    }

    /// A fresh query over the same graph with no predicates.
    #[must_use]
    pub fn unfiltered(&self) -> Self {
        Self::over(self.graph, self.mapper, self.options)
    }

    /// True if `entity` satisfies every predicate.
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        self.predicates.iter().all(|p| p(entity))
    }

    /// Matching entities in ascending label order.
    #[must_use]
    pub fn execute(&self) -> Vec<&'g Entity> {
        self.graph.entities().filter(|e| self.matches(e)).collect()
    }

    /// Labels of matching entities.
    #[must_use]
    pub fn labels(&self) -> BTreeSet<EntityLabel> {
        self.execute().into_iter().map(|e| e.label).collect()
    }
}

impl fmt::Debug for EntityQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityQuery")
            .field("graph", &self.graph.id())
            .field("predicates", &self.predicates.len())
            .finish()
    }
}
