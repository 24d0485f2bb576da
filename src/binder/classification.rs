//! Classification facets: reference lookup by system and identification.

use std::sync::Arc;

use crate::error::{ConfigurationError, EngineResult};
use crate::facet::{ClassificationFacet, Facet, FacetKind};
use crate::model::{ClassificationReference, Entity};
use crate::query::EntityQuery;
use crate::validation::{FacetField, IdsValidationResult, SubjectRef, ValidationContext};
use crate::value::Value;

use super::{
    kind_mismatch, select_any, validate_candidates, Candidate, FacetBinder, Quantifier, Scope,
    Shape,
};

const SHAPE: Shape = Shape {
    quantifier: Quantifier::Any,
    presence: FacetField::ClassificationSystem,
    value: FacetField::ClassificationValue,
    missing: FacetField::ClassificationValue,
    missing_reason: "No classification found",
};

/// Binds classification facets, walking the system hierarchy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassificationBinder;

fn facet_of(facet: &Facet) -> Result<&ClassificationFacet, ConfigurationError> {
    match facet {
        Facet::Classification(f) => Ok(f),
        other => Err(kind_mismatch(FacetKind::Classification, other)),
    }
}

fn candidate(facet: &ClassificationFacet, reference: &ClassificationReference) -> Candidate {
    let subject = SubjectRef::Classification {
        system: reference.system.clone(),
        identification: reference.identification.clone(),
    };
    // Without a value constraint the reference only has to exist.
    let value = if facet.value.is_some() {
        reference
            .identification
            .as_deref()
            .map_or(Value::Null, Value::from)
    } else {
        Value::from(reference.system.as_str())
    };
    Candidate::new(Some(subject), value)
}

/// References in a matching system, on the occurrence or its type object.
fn candidates(facet: &ClassificationFacet, entity: &Entity, scope: Scope<'_>) -> Vec<Candidate> {
    let inherited = scope
        .graph
        .type_object(entity)
        .map(|t| t.classifications.as_slice())
        .unwrap_or_default();
    entity
        .classifications
        .iter()
        .chain(inherited)
        .filter(|r| {
            facet
                .system
                .as_ref()
                .map_or(true, |s| s.matches_name(&r.system))
        })
        .map(|r| candidate(facet, r))
        .collect()
}

impl FacetBinder for ClassificationBinder {
    fn kind(&self) -> FacetKind {
        FacetKind::Classification
    }

    fn build_selection<'g>(
        &self,
        query: EntityQuery<'g>,
        facet: &Arc<Facet>,
    ) -> EngineResult<EntityQuery<'g>> {
        let facet = facet_of(facet)?.clone();
        let scope = Scope::of(&query);
        Ok(query.filter(move |e| select_any(&candidates(&facet, e, scope), facet.value.as_ref())))
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
        InMemoryGraph::from_entities(
            SchemaVersion::Ifc4,
            [
                Entity::new(1, "IfcWall")
                    .with_classification("Uniclass", "EF_25_10")
                    .with_classification("Uniclass", "Ss_25_10_30"),
                Entity::new(2, "IfcWall").with_classification("OmniClass", "21-02 10 10"),
                Entity::new(3, "IfcWall").with_type_object(4),
                Entity::new(4, "IfcWallType").with_classification("Uniclass", "EF_25_10"),
            ],
        )
        .unwrap()
    }

    fn validate(label: u64, facet: ClassificationFacet, cardinality: Cardinality) -> IdsValidationResult {
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
        ClassificationBinder
            .validate_entity(entity, &ctx, &mut result)
            .unwrap();
        result
    }

    #[test]
    fn any_matching_reference_is_enough() {
        let facet = ClassificationFacet::in_system("Uniclass")
            .with_value(ValueConstraint::pattern("Ss_.*").unwrap());
        let result = validate(1, facet, Cardinality::Expected);
        assert_eq!(result.status(), ValidationStatus::Pass);
        let value = result.messages().last().unwrap();
        assert_eq!(value.actual(), Some(&Value::from("Ss_25_10_30")));
    }

    #[test]
    fn other_system_is_not_found() {
        let result = validate(2, ClassificationFacet::in_system("Uniclass"), Cardinality::Expected);
        assert_eq!(result.status(), ValidationStatus::Fail);
        assert_eq!(result.messages()[0].reason(), "No classification found");
    }

    #[test]
    fn type_object_classification_counts() {
        let facet =
            ClassificationFacet::in_system("Uniclass").with_value(ValueConstraint::exact("EF_25_10"));
        let result = validate(3, facet, Cardinality::Expected);
        assert_eq!(result.status(), ValidationStatus::Pass);
    }

    #[test]
    fn any_system_selection() {
        let g = graph();
        let mapper = ValueMapper::standard();
        let facet: Arc<Facet> = Arc::new(ClassificationFacet::default().into());
        let labels: Vec<u64> = ClassificationBinder
            .build_selection(
                EntityQuery::over(&g, &mapper, ValidationOptions::default()),
                &facet,
            )
            .unwrap()
            .labels()
            .into_iter()
            .map(|l| l.0)
            .collect();
        assert_eq!(labels, vec![1, 2, 3, 4]);
    }
}
