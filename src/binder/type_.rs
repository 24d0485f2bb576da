//! Type facets: schema type with optional subtype widening and predefined
//! type.

use std::sync::Arc;

use crate::constraint::ValueConstraint;
use crate::error::{ConfigurationError, EngineResult};
use crate::facet::{Facet, FacetKind, TypeFacet};
use crate::model::Entity;
use crate::query::EntityQuery;
use crate::validation::{FacetField, IdsValidationResult, SubjectRef, ValidationContext};
use crate::value::Value;

use super::{
    kind_mismatch, select_any, validate_candidates, Candidate, FacetBinder, Quantifier, Scope,
    Shape,
};

const SHAPE: Shape = Shape {
    quantifier: Quantifier::Any,
    presence: FacetField::TypeName,
    value: FacetField::PredefinedType,
    missing: FacetField::TypeName,
    missing_reason: "Entity type does not match",
};

/// Binds entity type facets.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeBinder;

fn facet_of(facet: &Facet) -> Result<&TypeFacet, ConfigurationError> {
    match facet {
        Facet::Type(f) => Ok(f),
        other => Err(kind_mismatch(FacetKind::Type, other)),
    }
}

/// Type names compare case-insensitively; exact names widen to subtypes
/// when the options ask for it.
pub(crate) fn type_matches(name: &ValueConstraint, type_name: &str, scope: Scope<'_>) -> bool {
    match name.as_exact_str() {
        Some(expected) if scope.options.include_subtypes => {
            scope.graph.is_subtype_of(type_name, expected)
        }
        Some(expected) => type_name.eq_ignore_ascii_case(expected),
        None => {
            name.matches_name(type_name) || name.matches_name(&type_name.to_ascii_uppercase())
        }
    }
}

/// The entity as a candidate for `facet`, if its type matches.
///
/// The candidate value is the effective predefined type when the facet
/// constrains it, otherwise the type name itself.
pub(crate) fn type_candidate(
    facet: &TypeFacet,
    entity: &Entity,
    subject: Option<SubjectRef>,
    scope: Scope<'_>,
) -> Option<Candidate> {
    if !type_matches(&facet.name, &entity.type_name, scope) {
        return None;
    }
    let value = if facet.predefined_type.is_some() {
        entity
            .effective_predefined_type()
            .map_or(Value::Null, Value::from)
    } else {
        Value::from(entity.type_name.as_str())
    };
    Some(Candidate::new(subject, value))
}

impl FacetBinder for TypeBinder {
    fn kind(&self) -> FacetKind {
        FacetKind::Type
    }

    fn build_selection<'g>(
        &self,
        query: EntityQuery<'g>,
        facet: &Arc<Facet>,
    ) -> EngineResult<EntityQuery<'g>> {
        let facet = facet_of(facet)?.clone();
        let scope = Scope::of(&query);
        Ok(query.filter(move |e| {
            let found: Vec<Candidate> = type_candidate(&facet, e, None, scope).into_iter().collect();
            select_any(&found, facet.predefined_type.as_ref())
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
        let found: Vec<Candidate> = type_candidate(facet, entity, None, Scope::of_context(ctx))
            .into_iter()
            .collect();
        validate_candidates(&found, SHAPE, ctx, result);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationOptions;
    use crate::facet::Cardinality;
    use crate::mapper::ValueMapper;
    use crate::model::{EntityGraph, InMemoryGraph, SchemaVersion};
    use crate::specification::Specification;
    use crate::validation::{FieldTable, ValidationStatus};

    fn graph() -> InMemoryGraph {
        InMemoryGraph::from_entities(
            SchemaVersion::Ifc2x3,
            [
                Entity::new(1, "IfcWall").with_predefined_type("SHEAR"),
                Entity::new(2, "IfcWallStandardCase"),
                Entity::new(3, "IfcDoor"),
                Entity::new(4, "IFCWALL")
                    .with_predefined_type("USERDEFINED")
                    .with_object_type("ACOUSTIC"),
            ],
        )
        .unwrap()
    }

    fn select(facet: TypeFacet, options: ValidationOptions) -> Vec<u64> {
        let g = graph();
        let mapper = ValueMapper::standard();
        let facet: Arc<Facet> = Arc::new(facet.into());
        let labels = TypeBinder
            .build_selection(EntityQuery::over(&g, &mapper, options), &facet)
            .unwrap()
            .labels();
        labels.into_iter().map(|l| l.0).collect()
    }

    #[test]
    fn selection_includes_subtypes_by_default() {
        assert_eq!(
            select(TypeFacet::new("IFCWALL"), ValidationOptions::default()),
            vec![1, 2, 4]
        );
    }

    #[test]
    fn selection_without_subtypes_is_exact() {
        let options = ValidationOptions {
            include_subtypes: false,
            ..ValidationOptions::default()
        };
        assert_eq!(select(TypeFacet::new("IfcWall"), options), vec![1, 4]);
    }

    #[test]
    fn predefined_type_resolves_userdefined() {
        let facet = TypeFacet::new("IfcWall")
            .with_predefined_type(ValueConstraint::one_of(["SHEAR", "ACOUSTIC"]));
        assert_eq!(select(facet, ValidationOptions::default()), vec![1, 4]);
    }

    #[test]
    fn pattern_names_match_case_insensitively() {
        let facet = TypeFacet {
            name: ValueConstraint::pattern("IFCDOOR|IFCWINDOW").unwrap(),
            predefined_type: None,
        };
        assert_eq!(select(facet, ValidationOptions::default()), vec![3]);
    }

    fn validate(label: u64, facet: TypeFacet, cardinality: Cardinality) -> IdsValidationResult {
        let g = graph();
        let entity = g.entities().find(|e| e.label.0 == label).unwrap();
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
        TypeBinder.validate_entity(entity, &ctx, &mut result).unwrap();
        result
    }

    #[test]
    fn prohibited_type_fails_only_on_match() {
        let facet = TypeFacet::new("IfcDoor");
        assert_eq!(
            validate(3, facet.clone(), Cardinality::Prohibited).status(),
            ValidationStatus::Fail
        );
        assert_eq!(
            validate(1, facet, Cardinality::Prohibited).status(),
            ValidationStatus::Pass
        );
    }

    #[test]
    fn wrong_predefined_type_fails() {
        let facet =
            TypeFacet::new("IfcWall").with_predefined_type(ValueConstraint::exact("PARTITIONING"));
        let result = validate(1, facet, Cardinality::Expected);
        assert_eq!(result.status(), ValidationStatus::Fail);
        let failed = result
            .messages()
            .iter()
            .find(|m| m.status() == ValidationStatus::Fail)
            .unwrap();
        assert_eq!(failed.field(), Some(FacetField::PredefinedType));
        assert_eq!(failed.actual(), Some(&Value::from("SHEAR")));
    }
}
