//! Attribute facets: plain attribute lookup by name.

use std::sync::Arc;

use crate::error::{ConfigurationError, EngineResult};
use crate::facet::{AttributeFacet, Facet, FacetKind};
use crate::model::Entity;
use crate::query::EntityQuery;
use crate::validation::{FacetField, IdsValidationResult, SubjectRef, ValidationContext};

use super::{
    kind_mismatch, satisfy, select_any, validate_candidates, Candidate, FacetBinder, Quantifier,
    Scope, Shape,
};

const SHAPE: Shape = Shape {
    quantifier: Quantifier::Each,
    presence: FacetField::AttributeName,
    value: FacetField::AttributeValue,
    missing: FacetField::AttributeValue,
    missing_reason: "No attribute found",
};

/// Binds attribute facets.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeBinder;

fn facet_of(facet: &Facet) -> Result<&AttributeFacet, ConfigurationError> {
    match facet {
        Facet::Attribute(f) => Ok(f),
        other => Err(kind_mismatch(FacetKind::Attribute, other)),
    }
}

/// Matching attributes, and how many matches were skipped as derived.
fn candidates(facet: &AttributeFacet, entity: &Entity, scope: Scope<'_>) -> (Vec<Candidate>, usize) {
    let mut found = Vec::new();
    let mut derived = 0;
    for (name, value) in &entity.attributes {
        if !facet.name.matches_name(name) {
            continue;
        }
        if entity.derived_attributes.contains(name) && !scope.options.allow_derived_attributes {
            derived += 1;
            continue;
        }
        let (mapped, _) = scope.mapper.map(value);
        found.push(Candidate::new(
            Some(SubjectRef::Attribute { name: name.clone() }),
            mapped,
        ));
    }
    (found, derived)
}

impl FacetBinder for AttributeBinder {
    fn kind(&self) -> FacetKind {
        FacetKind::Attribute
    }

    fn build_selection<'g>(
        &self,
        query: EntityQuery<'g>,
        facet: &Arc<Facet>,
    ) -> EngineResult<EntityQuery<'g>> {
        let facet = facet_of(facet)?.clone();
        let scope = Scope::of(&query);
        Ok(query.filter(move |e| select_any(&candidates(&facet, e, scope).0, facet.value.as_ref())))
    }

    fn build_constraint<'g>(
        &self,
        query: EntityQuery<'g>,
        facet: &Arc<Facet>,
    ) -> EngineResult<EntityQuery<'g>> {
        let facet = facet_of(facet)?.clone();
        let scope = Scope::of(&query);
        Ok(query.filter(move |e| {
            satisfy(
                Quantifier::Each,
                &candidates(&facet, e, scope).0,
                facet.value.as_ref(),
            )
        }))
    }

    fn validate_entity(
        &self,
        entity: &Entity,
        ctx: &ValidationContext<'_>,
        result: &mut IdsValidationResult,
    ) -> EngineResult<()> {
        let facet = facet_of(ctx.facet())?;
        let (found, derived) = candidates(facet, entity, Scope::of_context(ctx));
        if found.is_empty() && derived > 0 {
            result.push(ctx.message(
                FacetField::AttributeName,
                None,
                None,
                "Only derived attributes match and derived attributes are not evaluated",
            ));
            return Ok(());
        }
        validate_candidates(&found, SHAPE, ctx, result);
        Ok(())
    }
}
