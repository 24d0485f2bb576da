//! The validation run driver.
//!
//! A run walks the rule document's specifications in order. For each one it
//! checks schema compatibility and binder coverage, selects the applicable
//! entities, drops excluded ones, and validates every remaining entity
//! against every requirement facet. Setup problems become an `Error`
//! requirement for that specification only; binder failures for one entity
//! become an `Error` message on that entity's result.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::binder::BinderRegistry;
use crate::config::ValidationOptions;
use crate::error::{ConfigurationError, EngineError, EngineResult};
use crate::exclusion::ExclusionPolicy;
use crate::facet::Cardinality;
use crate::mapper::ValueMapper;
use crate::model::{Entity, EntityGraph, EntityLabel, SchemaVersion};
use crate::query::EntityQuery;
use crate::specification::{RuleDocument, Specification};
use crate::validation::{
    status_for, FieldTable, IdsValidationResult, ValidationContext, ValidationMessage,
    ValidationOutcome, ValidationRequirement, ValidationStatus,
};
use crate::value::Value;

/// Evaluates rule documents against entity graphs.
///
/// Cheap to clone; the registry, mapper and field table are shared and
/// read-only, so one engine can serve concurrent runs over different
/// graphs.
#[derive(Debug, Clone)]
pub struct ValidationEngine {
    registry: Arc<BinderRegistry>,
    mapper: Arc<ValueMapper>,
    fields: Arc<FieldTable>,
    options: ValidationOptions,
}

impl ValidationEngine {
    /// Engine over an explicit binder registry and value mapper.
    #[must_use]
    pub fn new(
        registry: Arc<BinderRegistry>,
        mapper: Arc<ValueMapper>,
        options: ValidationOptions,
    ) -> Self {
        Self {
            registry,
            mapper,
            fields: Arc::new(FieldTable::standard()),
            options,
        }
    }

    /// Engine with the built-in binders and value mappings.
    #[must_use]
    pub fn standard(options: ValidationOptions) -> Self {
        Self::new(
            Arc::new(BinderRegistry::standard()),
            Arc::new(ValueMapper::standard()),
            options,
        )
    }

    /// Replaces the field labels used in messages.
    #[must_use]
    pub fn with_fields(mut self, fields: Arc<FieldTable>) -> Self {
        self.fields = fields;
        self
    }

    /// Evaluation options.
    #[must_use]
    pub const fn options(&self) -> ValidationOptions {
        self.options
    }

    /// Binders used for every facet.
    #[must_use]
    pub fn registry(&self) -> &Arc<BinderRegistry> {
        &self.registry
    }

    /// Value mapper shared by all binders.
    #[must_use]
    pub fn mapper(&self) -> &Arc<ValueMapper> {
        &self.mapper
    }

    /// Runs every specification of `document` against `graph`.
    ///
    /// Always yields an outcome unless an exclusion policy reports a
    /// cross-graph mismatch, which is returned as an error.
    pub fn validate(
        &self,
        document: Arc<RuleDocument>,
        graph: &dyn EntityGraph,
        exclusions: &dyn ExclusionPolicy,
    ) -> EngineResult<ValidationOutcome> {
        let mut outcome = ValidationOutcome::new(Arc::clone(&document));

        let issues = document.audit();
        if issues.len() > self.options.audit_tolerance {
            warn!(
                document = %document.title,
                issues = issues.len(),
                tolerance = self.options.audit_tolerance,
                "rule document failed structural audit"
            );
            let details: Vec<String> = issues.iter().map(ToString::to_string).collect();
            outcome.mark_completely_failed(format!(
                "Rule document failed structural audit: {}",
                details.join("; ")
            ));
            outcome.finish();
            return Ok(outcome);
        }
        for issue in &issues {
            debug!(%issue, "audit issue within tolerance");
        }

        for specification in &document.specifications {
            outcome.push(self.validate_specification(specification, graph, exclusions)?);
        }
        outcome.finish();

        let summary = outcome.summary();
        info!(
            document = %document.title,
            graph = %graph.id(),
            status = %outcome.status(),
            passed = summary.passed,
            failed = summary.failed,
            inconclusive = summary.inconclusive,
            errors = summary.errors,
            "validation finished"
        );
        Ok(outcome)
    }

    /// Evaluates one specification into a requirement.
    pub fn validate_specification(
        &self,
        specification: &Arc<Specification>,
        graph: &dyn EntityGraph,
        exclusions: &dyn ExclusionPolicy,
    ) -> EngineResult<ValidationRequirement> {
        let mut requirement = ValidationRequirement::new(Arc::clone(specification));
        let schema = graph.schema();
        debug!(specification = %specification.id, %schema, "evaluating specification");

        if !specification.supports(schema) {
            requirement.push_message(self.incompatible(specification, schema));
            return Ok(requirement);
        }

        let applicable = match self.applicable_entities(specification, graph, exclusions) {
            Ok(applicable) => applicable,
            Err(e) if e.is_graph_mismatch() => return Err(e),
            Err(e) => {
                warn!(specification = %specification.id, error = %e, "specification setup failed");
                requirement.push_message(ValidationMessage::error(
                    None,
                    specification.cardinality,
                    e.to_string(),
                ));
                return Ok(requirement);
            }
        };
        debug!(
            specification = %specification.id,
            applicable = applicable.len(),
            "applicable entities selected"
        );

        for entity in &applicable {
            requirement.push_result(self.evaluate(specification, entity, graph));
        }
        requirement.push_message(applicability_verdict(specification, applicable.len()));
        Ok(requirement)
    }

    /// Entities the specification applies to, with exclusions removed.
    ///
    /// Fails with a configuration error if the specification is malformed
    /// or uses a facet kind with no binder for the graph's schema.
    pub fn applicable_entities<'g>(
        &'g self,
        specification: &Specification,
        graph: &'g dyn EntityGraph,
        exclusions: &dyn ExclusionPolicy,
    ) -> EngineResult<Vec<&'g Entity>> {
        self.check(specification, graph.schema())?;
        let query = self.registry.selection(self.query(graph), &specification.applicability)?;
        exclude(query.execute(), specification, exclusions)
    }

    /// Applicable entities that satisfy every requirement group as a filter.
    ///
    /// Expected groups must hold, Prohibited groups must not select the
    /// entity, Optional groups do not narrow.
    pub fn compliant_entities<'g>(
        &'g self,
        specification: &Specification,
        graph: &'g dyn EntityGraph,
        exclusions: &dyn ExclusionPolicy,
    ) -> EngineResult<Vec<&'g Entity>> {
        self.check(specification, graph.schema())?;
        let schema = graph.schema();
        let mut query = self.registry.selection(self.query(graph), &specification.applicability)?;
        for group in &specification.requirements {
            match group.cardinality {
                Cardinality::Expected => query = self.registry.constraint(query, &group.facets)?,
                Cardinality::Prohibited => {
                    for facet in group.facets.iter() {
                        let binder = self.registry.resolve(facet.kind(), schema)?;
                        let prohibited = binder.build_selection(query.unfiltered(), facet)?;
                        query = query.exclude(prohibited);
                    }
                }
                Cardinality::Optional => {}
            }
        }
        exclude(query.execute(), specification, exclusions)
    }

    /// Validates a single entity against the specification's requirements,
    /// regardless of whether the specification applies to it.
    pub fn evaluate_entity(
        &self,
        specification: &Arc<Specification>,
        graph: &dyn EntityGraph,
        label: EntityLabel,
    ) -> EngineResult<IdsValidationResult> {
        self.check(specification, graph.schema())?;
        let entity = graph
            .entity(label)
            .ok_or_else(|| EngineError::EntityNotFound {
                graph: graph.id(),
                label,
            })?;
        Ok(self.evaluate(specification, entity, graph))
    }

    fn query<'g>(&'g self, graph: &'g dyn EntityGraph) -> EntityQuery<'g> {
        EntityQuery::over(graph, &self.mapper, self.options)
    }

    /// Structural validity plus binder coverage for every facet.
    fn check(
        &self,
        specification: &Specification,
        schema: SchemaVersion,
    ) -> Result<(), ConfigurationError> {
        specification.validate()?;
        specification
            .applicability
            .iter()
            .chain(specification.requirements.iter().flat_map(|g| g.facets.iter()))
            .try_for_each(|facet| self.registry.resolve(facet.kind(), schema).map(|_| ()))
    }

    fn evaluate(
        &self,
        specification: &Arc<Specification>,
        entity: &Entity,
        graph: &dyn EntityGraph,
    ) -> IdsValidationResult {
        let mut result = IdsValidationResult::new(
            entity,
            Arc::clone(specification),
            self.options.output_full_entity,
        );
        for group in &specification.requirements {
            for facet in group.facets.iter() {
                let ctx = ValidationContext::new(
                    facet,
                    group.cardinality,
                    graph,
                    &self.mapper,
                    &self.fields,
                    self.options,
                );
                let validated = self
                    .registry
                    .resolve(facet.kind(), graph.schema())
                    .map_err(EngineError::from)
                    .and_then(|binder| binder.validate_entity(entity, &ctx, &mut result));
                if let Err(e) = validated {
                    warn!(
                        specification = %specification.id,
                        entity = %entity.label,
                        facet = %facet.kind(),
                        error = %e,
                        "facet could not be evaluated"
                    );
                    result.push(ValidationMessage::error(
                        Some(Arc::clone(facet)),
                        group.cardinality,
                        e.to_string(),
                    ));
                }
            }
        }
        result
    }

    fn incompatible(&self, specification: &Specification, schema: SchemaVersion) -> ValidationMessage {
        let targets: Vec<String> = specification.schemas.iter().map(ToString::to_string).collect();
        let targets = targets.join(", ");
        if self.options.skip_incompatible_specification {
            debug!(specification = %specification.id, %schema, "skipping incompatible specification");
            ValidationMessage::for_specification(
                ValidationStatus::Inconclusive,
                specification.cardinality,
                targets,
                Some(Value::String(schema.to_string())),
                format!("Skipped: specification does not target schema {schema}"),
            )
        } else {
            warn!(specification = %specification.id, %schema, "incompatible specification");
            ValidationMessage::error(
                None,
                specification.cardinality,
                format!("Specification targets {targets} and is not supported on schema {schema}"),
            )
        }
    }
}

fn exclude<'g>(
    entities: Vec<&'g Entity>,
    specification: &Specification,
    exclusions: &dyn ExclusionPolicy,
) -> EngineResult<Vec<&'g Entity>> {
    let mut kept = Vec::with_capacity(entities.len());
    for entity in entities {
        if exclusions.matches(specification, entity)? {
            debug!(specification = %specification.id, entity = %entity.label, "entity excluded");
            continue;
        }
        kept.push(entity);
    }
    Ok(kept)
}

/// The specification's own cardinality applied to the applicable count.
fn applicability_verdict(specification: &Specification, count: usize) -> ValidationMessage {
    let cardinality = specification.cardinality;
    let (expected, reason) = match (cardinality, count) {
        (Cardinality::Expected, 0) => ("at least one", "No applicable entities found"),
        (Cardinality::Expected, _) => ("at least one", "Applicable entities found"),
        (Cardinality::Prohibited, 0) => ("none", "No applicable entities found"),
        (Cardinality::Prohibited, _) => ("none", "Prohibited entities found"),
        (Cardinality::Optional, _) => ("any number", "Applicable entities are optional"),
    };
    ValidationMessage::for_specification(
        status_for(cardinality, Some(count > 0)),
        cardinality,
        expected,
        Some(Value::Int(i64::try_from(count).unwrap_or(i64::MAX))),
        reason,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::ValueConstraint;
    use crate::exclusion::ExclusionSet;
    use crate::facet::{FacetGroup, PropertyFacet, TypeFacet};
    use crate::model::InMemoryGraph;

    fn walls() -> FacetGroup {
        FacetGroup::new().with(TypeFacet::new("IfcWall"))
    }

    fn fire_rating() -> FacetGroup {
        FacetGroup::new().with(
            PropertyFacet::new("Pset_WallCommon", "FireRating")
                .with_value(ValueConstraint::exact("60min")),
        )
    }

    fn graph() -> InMemoryGraph {
        InMemoryGraph::from_entities(
            SchemaVersion::Ifc4,
            [
                Entity::new(1, "IfcWall").with_property("Pset_WallCommon", "FireRating", "60min"),
                Entity::new(2, "IfcWall").with_property("Pset_WallCommon", "FireRating", "30min"),
                Entity::new(3, "IfcWall"),
                Entity::new(4, "IfcDoor"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn specification_cardinality_verdicts() {
        let expected = Specification::new("S", "s").with_cardinality(Cardinality::Expected);
        assert_eq!(applicability_verdict(&expected, 0).status(), ValidationStatus::Fail);
        assert_eq!(applicability_verdict(&expected, 2).status(), ValidationStatus::Pass);

        let prohibited = expected.clone().with_cardinality(Cardinality::Prohibited);
        assert_eq!(applicability_verdict(&prohibited, 0).status(), ValidationStatus::Pass);
        assert_eq!(applicability_verdict(&prohibited, 1).status(), ValidationStatus::Fail);

        let optional = expected.with_cardinality(Cardinality::Optional);
        assert_eq!(
            applicability_verdict(&optional, 0).status(),
            ValidationStatus::Inconclusive
        );
    }

    #[test]
    fn validate_specification_collects_results() {
        let engine = ValidationEngine::standard(ValidationOptions::default());
        let g = graph();
        let spec = Arc::new(
            Specification::new("S1", "Fire rating")
                .applies_to(walls())
                .require(fire_rating(), Cardinality::Expected),
        );
        let req = engine
            .validate_specification(&spec, &g, &ExclusionSet::new())
            .unwrap();
        assert_eq!(req.applicable_results().len(), 3);
        assert_eq!(req.passed_results().count(), 1);
        assert_eq!(req.failed_results().count(), 2);
        assert_eq!(req.status(), ValidationStatus::Fail);
    }

    #[test]
    fn compliant_entities_apply_constraints() {
        let engine = ValidationEngine::standard(ValidationOptions::default());
        let g = graph();
        let spec = Specification::new("S1", "Fire rating")
            .applies_to(walls())
            .require(fire_rating(), Cardinality::Expected);
        let compliant = engine
            .compliant_entities(&spec, &g, &ExclusionSet::new())
            .unwrap();
        assert_eq!(
            compliant.iter().map(|e| e.label.0).collect::<Vec<_>>(),
            vec![1]
        );

        let spec = Specification::new("S2", "No 30min walls")
            .applies_to(walls())
            .require(
                FacetGroup::new().with(
                    PropertyFacet::new("Pset_WallCommon", "FireRating")
                        .with_value(ValueConstraint::exact("30min")),
                ),
                Cardinality::Prohibited,
            );
        let compliant = engine
            .compliant_entities(&spec, &g, &ExclusionSet::new())
            .unwrap();
        assert_eq!(
            compliant.iter().map(|e| e.label.0).collect::<Vec<_>>(),
            vec![1, 3]
        );
    }

    #[test]
    fn evaluate_entity_reports_missing_label() {
        let engine = ValidationEngine::standard(ValidationOptions::default());
        let g = graph();
        let spec = Arc::new(
            Specification::new("S1", "Fire rating")
                .applies_to(walls())
                .require(fire_rating(), Cardinality::Expected),
        );
        let result = engine.evaluate_entity(&spec, &g, EntityLabel(4)).unwrap();
        assert_eq!(result.status(), ValidationStatus::Fail);

        let err = engine.evaluate_entity(&spec, &g, EntityLabel(99)).unwrap_err();
        assert!(matches!(err, EngineError::EntityNotFound { .. }));
    }

    #[test]
    fn incompatible_schema_is_error_or_skipped() {
        let g = graph();
        let spec = Arc::new(
            Specification::new("S1", "Fire rating")
                .for_schemas([SchemaVersion::Ifc2x3])
                .applies_to(walls())
                .require(fire_rating(), Cardinality::Expected),
        );

        let strict = ValidationEngine::standard(ValidationOptions::default());
        let req = strict
            .validate_specification(&spec, &g, &ExclusionSet::new())
            .unwrap();
        assert_eq!(req.status(), ValidationStatus::Error);
        assert!(req.messages()[0].reason().contains("not supported"));

        let lenient = ValidationEngine::standard(ValidationOptions {
            skip_incompatible_specification: true,
            ..ValidationOptions::default()
        });
        let req = lenient
            .validate_specification(&spec, &g, &ExclusionSet::new())
            .unwrap();
        assert_eq!(req.status(), ValidationStatus::Inconclusive);
        assert!(req.applicable_results().is_empty());
    }
}
