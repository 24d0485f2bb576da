//! Part-of facets: transitive walk from a part to its wholes.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::{ConfigurationError, EngineResult};
use crate::facet::{Facet, FacetKind, PartOfFacet};
use crate::model::{Entity, EntityGraph, PartOfLink, PartOfRelation};
use crate::query::EntityQuery;
use crate::validation::{FacetField, IdsValidationResult, SubjectRef, ValidationContext};

use super::type_::type_candidate;
use super::{
    kind_mismatch, select_any, validate_candidates, Candidate, FacetBinder, Quantifier, Scope,
    Shape,
};

const SHAPE: Shape = Shape {
    quantifier: Quantifier::Any,
    presence: FacetField::PartOfEntity,
    value: FacetField::PartOfEntity,
    missing: FacetField::PartOfEntity,
    missing_reason: "Not part of a matching entity",
};

/// Binds part-of facets over the entity's aggregation edges.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartOfBinder;

fn facet_of(facet: &Facet) -> Result<&PartOfFacet, ConfigurationError> {
    match facet {
        Facet::PartOf(f) => Ok(f),
        other => Err(kind_mismatch(FacetKind::PartOf, other)),
    }
}

/// Every whole reachable from `entity`, following only `relation` when
/// given. Each whole is visited once, so cycles terminate.
fn wholes<'g>(
    entity: &Entity,
    relation: Option<PartOfRelation>,
    graph: &'g dyn EntityGraph,
) -> Vec<(&'g Entity, PartOfRelation)> {
    let follows = |link: &PartOfLink| relation.map_or(true, |r| r == link.relation);
    let mut seen = BTreeSet::new();
    let mut found = Vec::new();
    let mut pending: Vec<PartOfLink> = entity.part_of.iter().copied().filter(follows).collect();
    while let Some(link) = pending.pop() {
        if !seen.insert(link.whole) {
            continue;
        }
        if let Some(whole) = graph.entity(link.whole) {
            pending.extend(whole.part_of.iter().copied().filter(follows));
            found.push((whole, link.relation));
        }
    }
    found.sort_by_key(|(whole, _)| whole.label);
    found
}

fn candidates(facet: &PartOfFacet, entity: &Entity, scope: Scope<'_>) -> Vec<Candidate> {
    wholes(entity, facet.relation, scope.graph)
        .into_iter()
        .filter_map(|(whole, relation)| {
            let subject = SubjectRef::Whole {
                label: whole.label,
                relation,
            };
            type_candidate(&facet.entity, whole, Some(subject), scope)
        })
        .collect()
}

impl FacetBinder for PartOfBinder {
    fn kind(&self) -> FacetKind {
        FacetKind::PartOf
    }

    fn build_selection<'g>(
        &self,
        query: EntityQuery<'g>,
        facet: &Arc<Facet>,
    ) -> EngineResult<EntityQuery<'g>> {
        let facet = facet_of(facet)?.clone();
        let scope = Scope::of(&query);
        Ok(query.filter(move |e| {
            select_any(
                &candidates(&facet, e, scope),
                facet.entity.predefined_type.as_ref(),
            )
        }))
    }

    fn build_constraint<'g>(
        &self,
        query: EntityQuery<'g>,
        facet: &Arc<Facet>,
    ) -> EngineResult<EntityQuery<'g>> {
        self.build_selection(query, facet)
    }

    fn validate_entity(
        &self,
        entity: &Entity,
        ctx: &ValidationContext<'_>,
        result: &mut IdsValidationResult,
    ) -> EngineResult<()> {
        let facet = facet_of(ctx.facet())?;
        let found = candidates(facet, entity, Scope::of_context(ctx));
        validate_candidates(&found, SHAPE, ctx, result);
        Ok(())
    }
}
