//! Exclusion policies: remove entities from a specification's applicable
//! set before any requirement is evaluated.
//!
//! Policies compose with logical OR through [`ExclusionSet`].

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::binder::BinderRegistry;
use crate::config::ValidationOptions;
use crate::error::{EngineError, EngineResult};
use crate::facet::FacetGroup;
use crate::mapper::ValueMapper;
use crate::model::{Entity, EntityGraph, EntityLabel, GraphId};
use crate::query::EntityQuery;
use crate::specification::Specification;

/// Decides whether an entity is skipped for a specification.
pub trait ExclusionPolicy: Send + Sync {
    /// `Ok(true)` removes `entity` from the applicable set of
    /// `specification`.
    fn matches(&self, specification: &Specification, entity: &Entity) -> EngineResult<bool>;
}

/// Excludes the entities another facet group selects in one graph.
///
/// The excluded set is computed once at construction. The policy is bound
/// to that graph instance and rejects entities from any other.
#[derive(Debug, Clone)]
pub struct ApplicabilityExclusion {
    graph: GraphId,
    excluded: BTreeSet<EntityLabel>,
}

impl ApplicabilityExclusion {
    /// Runs `group`'s selection over `graph`.
    ///
    /// Fails immediately if the group is structurally invalid or names a
    /// facet kind the registry cannot bind on the graph's schema.
    pub fn new(
        group: &FacetGroup,
        graph: &dyn EntityGraph,
        registry: &BinderRegistry,
        mapper: &ValueMapper,
        options: ValidationOptions,
    ) -> EngineResult<Self> {
        group.validate()?;
        let query = registry.selection(EntityQuery::over(graph, mapper, options), group)?;
        let excluded = query.labels();
        debug!(
            graph = %graph.id(),
            excluded = excluded.len(),
            "applicability exclusion materialized"
        );
        Ok(Self {
            graph: graph.id(),
            excluded,
        })
    }

    /// Graph the exclusion was materialized against.
    #[must_use]
    pub const fn graph(&self) -> GraphId {
        self.graph
    }

    /// Labels removed from every specification.
    #[must_use]
    pub fn excluded(&self) -> &BTreeSet<EntityLabel> {
        &self.excluded
    }
}

impl ExclusionPolicy for ApplicabilityExclusion {
    fn matches(&self, _specification: &Specification, entity: &Entity) -> EngineResult<bool> {
        if entity.graph != self.graph {
            return Err(EngineError::GraphMismatch {
                expected: self.graph,
                actual: entity.graph,
            });
        }
        Ok(self.excluded.contains(&entity.label))
    }
}

/// Deny-list keyed by external stable identifier.
///
/// Each identifier maps to the specification ids or names it is excluded
/// from; an empty list excludes it from every specification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentifierExclusion {
    entries: HashMap<String, Vec<String>>,
}

impl IdentifierExclusion {
    /// Policy that excludes nothing yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Excludes `global_id` from the named specifications.
    #[must_use]
    pub fn exclude<S: Into<String>>(
        mut self,
        global_id: impl Into<String>,
        specifications: impl IntoIterator<Item = S>,
    ) -> Self {
        self.entries
            .entry(global_id.into())
            .or_default()
            .extend(specifications.into_iter().map(Into::into));
        self
    }

    /// Excludes `global_id` from every specification.
    #[must_use]
    pub fn exclude_everywhere(mut self, global_id: impl Into<String>) -> Self {
        self.entries.insert(global_id.into(), Vec::new());
        self
    }

    /// Number of excluded identifiers across all scopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no identifier is excluded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ExclusionPolicy for IdentifierExclusion {
    fn matches(&self, specification: &Specification, entity: &Entity) -> EngineResult<bool> {
        let Some(scoped) = entity
            .global_id
            .as_deref()
            .and_then(|id| self.entries.get(id))
        else {
            return Ok(false);
        };
        Ok(scoped.is_empty()
            || scoped
                .iter()
                .any(|s| *s == specification.id || *s == specification.name))
    }
}

type ExclusionFn = dyn Fn(&Specification, &Entity) -> bool + Send + Sync;

/// Wraps a caller-supplied predicate.
pub struct PredicateExclusion {
    predicate: Box<ExclusionFn>,
}

impl PredicateExclusion {
    /// Policy excluding every entity `predicate` accepts.
    #[must_use]
    pub fn new(predicate: impl Fn(&Specification, &Entity) -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Box::new(predicate),
        }
    }
}

impl ExclusionPolicy for PredicateExclusion {
    fn matches(&self, specification: &Specification, entity: &Entity) -> EngineResult<bool> {
        Ok((self.predicate)(specification, entity))
    }
}

impl fmt::Debug for PredicateExclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateExclusion").finish_non_exhaustive()
    }
}

/// The policies attached to one run; an entity is skipped if any matches.
#[derive(Clone, Default)]
pub struct ExclusionSet {
    policies: Vec<Arc<dyn ExclusionPolicy>>,
}

impl ExclusionSet {
    /// Empty set; nothing is excluded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a policy.
    #[must_use]
    pub fn with(mut self, policy: impl ExclusionPolicy + 'static) -> Self {
        self.policies.push(Arc::new(policy));
        self
    }

    /// Adds a shared policy.
    pub fn push(&mut self, policy: Arc<dyn ExclusionPolicy>) {
        self.policies.push(policy);
    }

    /// Number of policies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Whether the set has no policies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl ExclusionPolicy for ExclusionSet {
    fn matches(&self, specification: &Specification, entity: &Entity) -> EngineResult<bool> {
        for policy in &self.policies {
            if policy.matches(specification, entity)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl fmt::Debug for ExclusionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExclusionSet")
            .field("policies", &self.policies.len())
            .finish()
    }
}
