//! Property facets: property lookup by set and name, with type-object
//! fallback.

use std::sync::Arc;

use crate::error::{ConfigurationError, EngineResult};
use crate::facet::{Facet, FacetKind, PropertyFacet};
use crate::mapper::ValueMapper;
use crate::model::{Entity, EntityLabel};
use crate::query::EntityQuery;
use crate::validation::{FacetField, IdsValidationResult, SubjectRef, ValidationContext};

use super::{
    kind_mismatch, satisfy, select_any, validate_candidates, Candidate, DataTypeCheck,
    FacetBinder, Quantifier, Scope, Shape,
};

const SHAPE: Shape = Shape {
    quantifier: Quantifier::Each,
    presence: FacetField::PropertyName,
    value: FacetField::PropertyValue,
    missing: FacetField::PropertyValue,
    missing_reason: "No property found",
};

/// Binds property facets, including properties inherited from the type object.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyBinder;

fn facet_of(facet: &Facet) -> Result<&PropertyFacet, ConfigurationError> {
    match facet {
        Facet::Property(f) => Ok(f),
        other => Err(kind_mismatch(FacetKind::Property, other)),
    }
}

fn collect(
    facet: &PropertyFacet,
    entity: &Entity,
    from_type: Option<EntityLabel>,
    mapper: &ValueMapper,
) -> Vec<Candidate> {
    entity
        .property_sets
        .iter()
        .filter(|pset| facet.property_set.matches_name(&pset.name))
        .flat_map(|pset| {
            pset.properties
                .iter()
                .filter(|p| facet.base_name.matches_name(&p.name))
                .map(move |p| (pset, p))
        })
        .map(|(pset, property)| {
            let (value, _) = mapper.map(&property.value);
            let mut candidate = Candidate::new(
                Some(SubjectRef::Property {
                    property_set: pset.name.clone(),
                    name: property.name.clone(),
                    from_type,
                }),
                value,
            );
            candidate.data_type = facet.data_type.as_deref().map(|expected| {
                let actual = property.value.type_name();
                DataTypeCheck {
                    actual: actual.to_string(),
                    matches: actual.eq_ignore_ascii_case(expected),
                }
            });
            candidate
        })
        .collect()
}

fn same_property(a: &Candidate, b: &Candidate) -> bool {
    match (&a.subject, &b.subject) {
        (
            Some(SubjectRef::Property {
                property_set: set_a,
                name: name_a,
                ..
            }),
            Some(SubjectRef::Property {
                property_set: set_b,
                name: name_b,
                ..
            }),
        ) => set_a == set_b && name_a == name_b,
        _ => false,
    }
}

/// Occurrence properties, then type-object properties the occurrence does
/// not override.
fn candidates(facet: &PropertyFacet, entity: &Entity, scope: Scope<'_>) -> Vec<Candidate> {
    let mut found = collect(facet, entity, None, scope.mapper);
    if let Some(type_object) = scope.graph.type_object(entity) {
        for inherited in collect(facet, type_object, Some(type_object.label), scope.mapper) {
            if !found.iter().any(|c| same_property(c, &inherited)) {
                found.push(inherited);
            }
        }
    }
    found
}

impl FacetBinder for PropertyBinder {
    fn kind(&self) -> FacetKind {
        FacetKind::Property
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
        let facet = facet_of(facet)?.clone();
        let scope = Scope::of(&query);
        Ok(query.filter(move |e| {
            satisfy(
                Quantifier::Each,
                &candidates(&facet, e, scope),
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
    use crate::model::{EntityGraph, InMemoryGraph, SchemaVersion};
    use crate::specification::Specification;
    use crate::validation::{FieldTable, ValidationStatus};
    use crate::value::{Logical, Measure, ModelValue, Value, WrappedText};

    fn fire_rating() -> PropertyFacet {
        PropertyFacet::new("Pset_WallCommon", "FireRating")
            .with_value(ValueConstraint::exact("60min"))
    }

    fn run_in(
        graph: &InMemoryGraph,
        label: u64,
        facet: PropertyFacet,
        cardinality: Cardinality,
    ) -> IdsValidationResult {
        let entity = graph.entity(EntityLabel(label)).unwrap();
        let mapper = ValueMapper::standard();
        let fields = FieldTable::standard();
        let facet: Arc<Facet> = Arc::new(facet.into());
        let ctx = ValidationContext::new(
            &facet,
            cardinality,
            graph,
            &mapper,
            &fields,
            ValidationOptions::default(),
        );
        let mut result =
            IdsValidationResult::new(entity, Arc::new(Specification::new("S", "s")), false);
        PropertyBinder.validate_entity(entity, &ctx, &mut result).unwrap();
        result
    }

    fn run(entity: Entity, facet: PropertyFacet, cardinality: Cardinality) -> IdsValidationResult {
        let label = entity.label.0;
        let graph = InMemoryGraph::from_entities(SchemaVersion::Ifc4, [entity]).unwrap();
        run_in(&graph, label, facet, cardinality)
    }

    #[test]
    fn missing_property_fails_when_expected() {
        let result = run(Entity::new(1, "IfcWall"), fire_rating(), Cardinality::Expected);
        assert_eq!(result.status(), ValidationStatus::Fail);
        assert_eq!(result.messages().len(), 1);
        let msg = &result.messages()[0];
        assert_eq!(msg.reason(), "No property found");
        assert_eq!(msg.expected(), "60min");
        assert!(msg.actual().is_none());
    }

    #[test]
    fn missing_property_passes_when_prohibited() {
        let result = run(Entity::new(1, "IfcWall"), fire_rating(), Cardinality::Prohibited);
        assert_eq!(result.status(), ValidationStatus::Pass);
    }

    #[test]
    fn missing_property_is_not_a_failure_when_optional() {
        let result = run(Entity::new(1, "IfcWall"), fire_rating(), Cardinality::Optional);
        assert_eq!(result.status(), ValidationStatus::Inconclusive);
    }

    #[test]
    fn matching_property_yields_two_successes() {
        let entity = Entity::new(1, "IfcWall").with_property(
            "Pset_WallCommon",
            "FireRating",
            ModelValue::domain(WrappedText::label("60min")),
        );
        let result = run(entity, fire_rating(), Cardinality::Expected);
        assert_eq!(result.status(), ValidationStatus::Pass);
        assert_eq!(result.messages().len(), 2);
        assert!(result
            .messages()
            .iter()
            .all(|m| m.status() == ValidationStatus::Pass));
        assert_eq!(result.messages()[0].field(), Some(FacetField::PropertyName));
        assert_eq!(result.messages()[1].field(), Some(FacetField::PropertyValue));
    }

    #[test]
    fn mismatch_reports_actual_value() {
        let entity =
            Entity::new(1, "IfcWall").with_property("Pset_WallCommon", "FireRating", "30min");
        let result = run(entity, fire_rating(), Cardinality::Expected);
        assert_eq!(result.status(), ValidationStatus::Fail);
        let failed = result
            .messages()
            .iter()
            .find(|m| m.status() == ValidationStatus::Fail)
            .unwrap();
        assert_eq!(failed.actual(), Some(&Value::from("30min")));
        assert!(matches!(failed.subject(), Some(SubjectRef::Property { .. })));
    }

    #[test]
    fn matching_value_fails_when_prohibited() {
        let entity =
            Entity::new(1, "IfcWall").with_property("Pset_WallCommon", "FireRating", "60min");
        let result = run(entity, fire_rating(), Cardinality::Prohibited);
        assert_eq!(result.status(), ValidationStatus::Fail);
    }

    #[test]
    fn bare_prohibition_passes_on_empty_value() {
        let entity = Entity::new(1, "IfcWall").with_property("Pset_WallCommon", "FireRating", "");
        let result = run(
            entity,
            PropertyFacet::new("Pset_WallCommon", "FireRating"),
            Cardinality::Prohibited,
        );
        assert_eq!(result.status(), ValidationStatus::Pass);
    }

    #[test]
    fn unknown_logical_is_inconclusive() {
        let entity = Entity::new(1, "IfcWall").with_property(
            "Pset_WallCommon",
            "IsExternal",
            ModelValue::domain(Logical(None)),
        );
        let facet = PropertyFacet::new("Pset_WallCommon", "IsExternal")
            .with_value(ValueConstraint::exact(true));
        let result = run(entity, facet, Cardinality::Expected);
        let value = result
            .messages()
            .iter()
            .find(|m| m.field() == Some(FacetField::PropertyValue))
            .unwrap();
        assert_eq!(value.status(), ValidationStatus::Inconclusive);
        assert_eq!(value.actual(), Some(&Value::Unknown));
        assert_ne!(result.status(), ValidationStatus::Fail);
    }

    #[test]
    fn measures_compare_numerically() {
        let entity = Entity::new(1, "IfcWall").with_property(
            "Qto_WallBaseQuantities",
            "Width",
            ModelValue::domain(Measure::new("IfcLengthMeasure", 0.2).with_unit("m")),
        );
        let facet = PropertyFacet::new("Qto_WallBaseQuantities", "Width")
            .with_value(ValueConstraint::range(Some(0.1), Some(0.3)))
            .with_data_type("IFCLENGTHMEASURE");
        let result = run(entity, facet, Cardinality::Expected);
        assert_eq!(result.status(), ValidationStatus::Pass);
        assert!(result
            .messages()
            .iter()
            .any(|m| m.field() == Some(FacetField::PropertyDataType)));
    }

    #[test]
    fn wrong_data_type_fails() {
        let entity = Entity::new(1, "IfcWall").with_property(
            "Pset_WallCommon",
            "FireRating",
            ModelValue::domain(WrappedText::identifier("60min")),
        );
        let facet = fire_rating().with_data_type("IfcLabel");
        let result = run(entity, facet, Cardinality::Expected);
        assert_eq!(result.status(), ValidationStatus::Fail);
    }

    #[test]
    fn type_object_properties_are_inherited() {
        let graph = InMemoryGraph::from_entities(
            SchemaVersion::Ifc4,
            [
                Entity::new(1, "IfcWall").with_type_object(2),
                Entity::new(2, "IfcWallType").with_property(
                    "Pset_WallCommon",
                    "FireRating",
                    "60min",
                ),
                Entity::new(3, "IfcWall")
                    .with_type_object(2)
                    .with_property("Pset_WallCommon", "FireRating", "90min"),
            ],
        )
        .unwrap();

        let inherited = run_in(&graph, 1, fire_rating(), Cardinality::Expected);
        assert_eq!(inherited.status(), ValidationStatus::Pass);
        assert!(matches!(
            inherited.messages()[0].subject(),
            Some(SubjectRef::Property {
                from_type: Some(EntityLabel(2)),
                ..
            })
        ));

        let overridden = run_in(&graph, 3, fire_rating(), Cardinality::Expected);
        assert_eq!(overridden.status(), ValidationStatus::Fail);
        assert_eq!(overridden.messages().len(), 2);
    }

    #[test]
    fn constraint_requires_every_match() {
        let graph = InMemoryGraph::from_entities(
            SchemaVersion::Ifc4,
            [
                Entity::new(1, "IfcWall").with_property("Pset_WallCommon", "FireRating", "60min"),
                Entity::new(2, "IfcWall")
                    .with_property("Pset_WallCommon", "FireRating", "60min")
                    .with_property("Pset_Custom", "FireRating", "30min"),
            ],
        )
        .unwrap();
        let mapper = ValueMapper::standard();
        let facet: Arc<Facet> = Arc::new(
            PropertyFacet {
                property_set: ValueConstraint::pattern("Pset_.*").unwrap(),
                ..fire_rating()
            }
            .into(),
        );
        let base = EntityQuery::over(&graph, &mapper, ValidationOptions::default());
        let selected = PropertyBinder
            .build_selection(base.unfiltered(), &facet)
            .unwrap()
            .labels();
        let constrained = PropertyBinder.build_constraint(base, &facet).unwrap().labels();
        assert_eq!(selected.len(), 2);
        assert_eq!(constrained.into_iter().collect::<Vec<_>>(), vec![EntityLabel(1)]);
    }
}
