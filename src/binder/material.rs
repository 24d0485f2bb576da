//! Material facets: assigned materials by name or category.

use std::sync::Arc;

use crate::error::{ConfigurationError, EngineResult};
use crate::facet::{Facet, FacetKind, MaterialFacet};
use crate::model::{Entity, MaterialAssignment};
use crate::query::EntityQuery;
use crate::validation::{FacetField, IdsValidationResult, SubjectRef, ValidationContext};
use crate::value::Value;

use super::{
    kind_mismatch, select_any, validate_candidates, Candidate, FacetBinder, Quantifier, Scope,
    Shape,
};

const SHAPE: Shape = Shape {
    quantifier: Quantifier::Any,
    presence: FacetField::MaterialValue,
    value: FacetField::MaterialValue,
    missing: FacetField::MaterialValue,
    missing_reason: "No material found",
};

/// Binds material facets.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaterialBinder;

fn facet_of(facet: &Facet) -> Result<&MaterialFacet, ConfigurationError> {
    match facet {
        Facet::Material(f) => Ok(f),
        other => Err(kind_mismatch(FacetKind::Material, other)),
    }
}

fn candidate(material: &MaterialAssignment) -> Candidate {
    let mut candidate = Candidate::new(
        Some(SubjectRef::Material {
            name: material.name.clone(),
        }),
        Value::from(material.name.as_str()),
    );
    if let Some(category) = &material.category {
        candidate.values.push(Value::from(category.as_str()));
    }
    candidate
}

/// The occurrence's materials, or its type object's when it has none.
fn candidates(entity: &Entity, scope: Scope<'_>) -> Vec<Candidate> {
    let materials = if entity.materials.is_empty() {
        scope
            .graph
            .type_object(entity)
            .map(|t| t.materials.as_slice())
            .unwrap_or_default()
    } else {
        entity.materials.as_slice()
    };
    materials.iter().map(candidate).collect()
}

impl FacetBinder for MaterialBinder {
    fn kind(&self) -> FacetKind {
        FacetKind::Material
    }

    fn build_selection<'g>(
        &self,
        query: EntityQuery<'g>,
        facet: &Arc<Facet>,
    ) -> EngineResult<EntityQuery<'g>> {
        let facet = facet_of(facet)?.clone();
        let scope = Scope::of(&query);
        Ok(query.filter(move |e| select_any(&candidates(e, scope), facet.value.as_ref())))
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
        facet_of(ctx.facet())?;
        let found = candidates(entity, Scope::of_context(ctx));
        validate_candidates(&found, SHAPE, ctx, result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationOptions;
    use crate::constraint::ValueConstraint;
    use crate::facet::Cardinality;
    use crate::mapper::ValueMapper;
    use crate::model::{EntityGraph, EntityLabel, InMemoryGraph, SchemaVersion};
    use crate::specification::Specification;
    use crate::validation::{FieldTable, ValidationStatus};

    fn graph() -> InMemoryGraph {
        let mut concrete = Entity::new(1, "IfcWall").with_material("C30/37");
        concrete.materials[0].category = Some("concrete".to_string());
        InMemoryGraph::from_entities(
            SchemaVersion::Ifc4,
            [
                concrete,
                Entity::new(2, "IfcWall").with_material("Brick"),
                Entity::new(3, "IfcWall").with_type_object(4),
                Entity::new(4, "IfcWallType").with_material("Timber"),
                Entity::new(5, "IfcWall"),
            ],
        )
        .unwrap()
    }

    fn validate(label: u64, facet: MaterialFacet, cardinality: Cardinality) -> IdsValidationResult {
        let g = graph();
        let entity = g.entity(EntityLabel(label)).unwrap();
        let mapper = ValueMapper::standard();
        let fields = FieldTable::standard();
        let facet: Arc<Facet> = Arc::new(facet.into());
        let ctx = ValidationContext::new(
            &facet,
            cardinality,
            &g,
            &mapper,
            &fields,
            ValidationOptions::default(),
        );
        let mut result =
            IdsValidationResult::new(entity, Arc::new(Specification::new("S", "s")), false);
        MaterialBinder.validate_entity(entity, &ctx, &mut result).unwrap();
        result
    }

    fn named(value: &str) -> MaterialFacet {
        MaterialFacet {
            value: Some(ValueConstraint::exact(value)),
        }
    }

    #[test]
    fn matches_name_or_category() {
        assert_eq!(
            validate(1, named("concrete"), Cardinality::Expected).status(),
            ValidationStatus::Pass
        );
        assert_eq!(
            validate(1, named("C30/37"), Cardinality::Expected).status(),
            ValidationStatus::Pass
        );
        assert_eq!(
            validate(2, named("concrete"), Cardinality::Expected).status(),
            ValidationStatus::Fail
        );
    }

    #[test]
    fn falls_back_to_type_object() {
        assert_eq!(
            validate(3, named("Timber"), Cardinality::Expected).status(),
            ValidationStatus::Pass
        );
    }

    #[test]
    fn no_material_passes_when_prohibited() {
        let result = validate(5, MaterialFacet::default(), Cardinality::Prohibited);
        assert_eq!(result.status(), ValidationStatus::Pass);
        let result = validate(2, MaterialFacet::default(), Cardinality::Prohibited);
        assert_eq!(result.status(), ValidationStatus::Fail);
    }
}
