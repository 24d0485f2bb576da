//! Facet binders: one per facet kind, behind a common contract.
//!
//! A binder turns a facet into a selection query (applicability), a
//! constraint query (requirements used as filters), and per-entity
//! validation messages. Binders differ only in how they find the relevant
//! sub-values on an entity; the evaluation shape is shared and lives here.

mod attribute;
mod classification;
mod material;
mod part_of;
mod property;
mod type_;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::ValidationOptions;
use crate::constraint::ValueConstraint;
use crate::error::{ConfigurationError, EngineResult};
use crate::facet::{Facet, FacetGroup, FacetKind};
use crate::mapper::ValueMapper;
use crate::model::{Entity, EntityGraph, SchemaVersion};
use crate::query::EntityQuery;
use crate::validation::{
    FacetField, IdsValidationResult, SubjectRef, ValidationContext, ValidationMessage,
};
use crate::value::Value;

pub use attribute::AttributeBinder;
pub use classification::ClassificationBinder;
pub use material::MaterialBinder;
pub use part_of::PartOfBinder;
pub use property::PropertyBinder;
pub use type_::TypeBinder;

/// Per-kind binding and validation logic.
pub trait FacetBinder: Send + Sync {
    /// The facet kind this binder handles.
    fn kind(&self) -> FacetKind;

    /// Narrows `query` to entities the facet selects as an applicability
    /// condition.
    fn build_selection<'g>(
        &self,
        query: EntityQuery<'g>,
        facet: &Arc<Facet>,
    ) -> EngineResult<EntityQuery<'g>>;

    /// Narrows `query` to entities that satisfy the facet as a requirement.
    fn build_constraint<'g>(
        &self,
        query: EntityQuery<'g>,
        facet: &Arc<Facet>,
    ) -> EngineResult<EntityQuery<'g>>;

    /// Appends messages for `entity` against the facet bound in `ctx`.
    fn validate_entity(
        &self,
        entity: &Entity,
        ctx: &ValidationContext<'_>,
        result: &mut IdsValidationResult,
    ) -> EngineResult<()>;
}

/// How candidate outcomes combine into a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Quantifier {
    /// Every found sub-value is checked and reported on its own.
    Each,
    /// One report; satisfied if any found sub-value satisfies the facet.
    Any,
}

/// What a binder reports on and how.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Shape {
    pub quantifier: Quantifier,
    pub presence: FacetField,
    pub value: FacetField,
    /// Field and reason reported when nothing relevant is found.
    pub missing: FacetField,
    pub missing_reason: &'static str,
}

/// Result of a declared data type check.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DataTypeCheck {
    pub actual: String,
    pub matches: bool,
}

/// A relevant sub-value found on an entity.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub subject: Option<SubjectRef>,
    /// Mapped values the facet's value constraint is tried against; any
    /// one satisfying it is enough.
    pub values: Vec<Value>,
    pub data_type: Option<DataTypeCheck>,
}

impl Candidate {
    pub fn new(subject: Option<SubjectRef>, value: Value) -> Self {
        Self {
            subject,
            values: vec![value],
            data_type: None,
        }
    }

    fn is_populated(&self) -> bool {
        self.values.iter().any(Value::is_populated)
    }

    fn actual(&self) -> Value {
        self.values
            .iter()
            .find(|v| v.is_populated())
            .or_else(|| self.values.first())
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Raw match outcome; with no constraint, being populated is a match.
    fn outcome(&self, constraint: Option<&ValueConstraint>) -> Option<bool> {
        let matched = any_of(self.values.iter().map(|v| match constraint {
            Some(c) => c.evaluate(v),
            None => Some(v.is_populated()),
        }));
        match &self.data_type {
            Some(check) => all_of([Some(check.matches), matched]),
            None => matched,
        }
    }

    fn satisfies(&self, constraint: Option<&ValueConstraint>) -> bool {
        self.is_populated() && self.outcome(constraint) == Some(true)
    }
}

/// Three-valued OR: true wins, then undecided, then false.
pub(crate) fn any_of(outcomes: impl IntoIterator<Item = Option<bool>>) -> Option<bool> {
    let mut result = Some(false);
    for outcome in outcomes {
        match outcome {
            Some(true) => return Some(true),
            None => result = None,
            Some(false) => {}
        }
    }
    result
}

/// Three-valued AND: false wins, then undecided, then true.
pub(crate) fn all_of(outcomes: impl IntoIterator<Item = Option<bool>>) -> Option<bool> {
    let mut result = Some(true);
    for outcome in outcomes {
        match outcome {
            Some(false) => return Some(false),
            None => result = None,
            Some(true) => {}
        }
    }
    result
}

/// Selection semantics: some candidate is populated and satisfies the facet.
pub(crate) fn select_any(candidates: &[Candidate], constraint: Option<&ValueConstraint>) -> bool {
    candidates.iter().any(|c| c.satisfies(constraint))
}

/// Constraint semantics for `quantifier`.
pub(crate) fn satisfy(
    quantifier: Quantifier,
    candidates: &[Candidate],
    constraint: Option<&ValueConstraint>,
) -> bool {
    match quantifier {
        Quantifier::Each => {
            !candidates.is_empty() && candidates.iter().all(|c| c.satisfies(constraint))
        }
        Quantifier::Any => select_any(candidates, constraint),
    }
}

fn value_reason(outcome: Option<bool>) -> &'static str {
    match outcome {
        Some(true) => "Value matches",
        Some(false) => "Value does not match",
        None => "Value could not be compared",
    }
}

fn with_subject(message: ValidationMessage, subject: Option<&SubjectRef>) -> ValidationMessage {
    match subject {
        Some(s) => message.with_subject(s.clone()),
        None => message,
    }
}

/// The shared per-entity evaluation over found candidates.
pub(crate) fn validate_candidates(
    candidates: &[Candidate],
    shape: Shape,
    ctx: &ValidationContext<'_>,
    result: &mut IdsValidationResult,
) {
    if candidates.is_empty() {
        result.push(ctx.absent(shape.missing, shape.missing_reason));
        return;
    }
    let constraint = ctx.facet().value_constraint();
    let expects_populated = ctx.expects_populated();

    match shape.quantifier {
        Quantifier::Each => {
            for candidate in candidates {
                report(candidate, candidate.outcome(constraint), shape, ctx, result, expects_populated);
            }
        }
        Quantifier::Any => {
            let outcome = any_of(candidates.iter().map(|c| c.outcome(constraint)));
            let chosen = candidates
                .iter()
                .find(|c| c.outcome(constraint) == Some(true))
                .or_else(|| candidates.iter().find(|c| c.is_populated() == expects_populated))
                .unwrap_or(&candidates[0]);
            report(chosen, outcome, shape, ctx, result, expects_populated);
        }
    }
}

fn report(
    candidate: &Candidate,
    outcome: Option<bool>,
    shape: Shape,
    ctx: &ValidationContext<'_>,
    result: &mut IdsValidationResult,
    expects_populated: bool,
) {
    let subject = candidate.subject.as_ref();
    let actual = candidate.actual();
    if candidate.is_populated() == expects_populated {
        let reason = match subject {
            Some(s) => format!("{s} present"),
            None => "Present".to_string(),
        };
        result.push(with_subject(
            ctx.success(shape.presence, Some(actual.clone()), reason),
            subject,
        ));
    }
    if let Some(check) = &candidate.data_type {
        let reason = if check.matches {
            "Data type matches"
        } else {
            "Data type does not match"
        };
        result.push(with_subject(
            ctx.message(
                FacetField::PropertyDataType,
                Some(check.matches),
                Some(Value::String(check.actual.clone())),
                reason,
            ),
            subject,
        ));
    }
    result.push(with_subject(
        ctx.message(shape.value, outcome, Some(actual), value_reason(outcome)),
        subject,
    ));
}

/// Shared state a binder's query predicates capture.
#[derive(Clone, Copy)]
pub(crate) struct Scope<'g> {
    pub graph: &'g dyn EntityGraph,
    pub mapper: &'g ValueMapper,
    pub options: ValidationOptions,
}

impl<'g> Scope<'g> {
    pub fn of(query: &EntityQuery<'g>) -> Self {
        Self {
            graph: query.graph(),
            mapper: query.mapper(),
            options: query.options(),
        }
    }

    pub fn of_context(ctx: &ValidationContext<'g>) -> Self {
        Self {
            graph: ctx.graph(),
            mapper: ctx.mapper(),
            options: ctx.options(),
        }
    }
}

/// Error for a facet of the wrong kind handed to a binder.
pub(crate) fn kind_mismatch(expected: FacetKind, facet: &Facet) -> ConfigurationError {
    ConfigurationError::FacetKindMismatch {
        expected,
        actual: facet.kind(),
    }
}

/// Maps (facet kind, schema) to a binder.
#[derive(Clone, Default)]
pub struct BinderRegistry {
    binders: HashMap<(FacetKind, SchemaVersion), Arc<dyn FacetBinder>>,
}

impl BinderRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in binder registered for every schema.
    #[must_use]
    pub fn standard() -> Self {
        let binders: [Arc<dyn FacetBinder>; 6] = [
            Arc::new(AttributeBinder),
            Arc::new(PropertyBinder),
            Arc::new(ClassificationBinder),
            Arc::new(MaterialBinder),
            Arc::new(TypeBinder),
            Arc::new(PartOfBinder),
        ];
        let mut registry = Self::new();
        for schema in SchemaVersion::ALL {
            for binder in &binders {
                registry.register(schema, Arc::clone(binder));
            }
        }
        registry
    }

    /// Registers `binder` for its kind on `schema`, replacing any previous
    /// registration.
    pub fn register(&mut self, schema: SchemaVersion, binder: Arc<dyn FacetBinder>) -> &mut Self {
        self.binders.insert((binder.kind(), schema), binder);
        self
    }

    /// Whether some binder handles `kind` on `schema`.
    #[must_use]
    pub fn supports(&self, kind: FacetKind, schema: SchemaVersion) -> bool {
        self.binders.contains_key(&(kind, schema))
    }

    /// Resolves the binder for `kind` on `schema`.
    pub fn resolve(
        &self,
        kind: FacetKind,
        schema: SchemaVersion,
    ) -> Result<&Arc<dyn FacetBinder>, ConfigurationError> {
        self.binders
            .get(&(kind, schema))
            .ok_or(ConfigurationError::UnsupportedFacet { kind, schema })
    }

    /// Chains the selection of every facet in `group` (logical AND).
    pub fn selection<'g>(
        &self,
        mut query: EntityQuery<'g>,
        group: &FacetGroup,
    ) -> EngineResult<EntityQuery<'g>> {
        let schema = query.graph().schema();
        for facet in group.iter() {
            query = self.resolve(facet.kind(), schema)?.build_selection(query, facet)?;
        }
        Ok(query)
    }

    /// Chains the constraint of every facet in `group` (logical AND).
    pub fn constraint<'g>(
        &self,
        mut query: EntityQuery<'g>,
        group: &FacetGroup,
    ) -> EngineResult<EntityQuery<'g>> {
        let schema = query.graph().schema();
        for facet in group.iter() {
            query = self.resolve(facet.kind(), schema)?.build_constraint(query, facet)?;
        }
        Ok(query)
    }
}

impl fmt::Debug for BinderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.binders.keys().collect();
        keys.sort();
        f.debug_struct("BinderRegistry").field("binders", &keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facet::{PropertyFacet, TypeFacet};
    use crate::model::InMemoryGraph;

    #[test]
    fn three_valued_logic() {
        assert_eq!(any_of([Some(false), None, Some(true)]), Some(true));
        assert_eq!(any_of([Some(false), None]), None);
        assert_eq!(any_of([]), Some(false));
        assert_eq!(all_of([Some(true), None]), None);
        assert_eq!(all_of([None, Some(false)]), Some(false));
        assert_eq!(all_of([]), Some(true));
    }

    #[test]
    fn each_requires_every_candidate() {
        let c = ValueConstraint::exact("60min");
        let good = Candidate::new(None, Value::from("60min"));
        let bad = Candidate::new(None, Value::from("30min"));
        assert!(select_any(&[good.clone(), bad.clone()], Some(&c)));
        assert!(!satisfy(Quantifier::Each, &[good.clone(), bad], Some(&c)));
        assert!(satisfy(Quantifier::Each, &[good], Some(&c)));
        assert!(!satisfy(Quantifier::Each, &[], Some(&c)));
    }

    #[test]
    fn unconstrained_candidate_needs_a_value() {
        let empty = Candidate::new(None, Value::from("  "));
        assert!(!select_any(&[empty], None));
        let unknown = Candidate::new(None, Value::Unknown);
        assert!(select_any(&[unknown.clone()], None));
        assert!(!select_any(&[unknown], Some(&ValueConstraint::exact(true))));
    }

    #[test]
    fn standard_registry_covers_all_pairs() {
        let registry = BinderRegistry::standard();
        for schema in SchemaVersion::ALL {
            for kind in FacetKind::ALL {
                assert!(registry.supports(kind, schema));
            }
        }
    }

    #[test]
    fn missing_registration_is_unsupported() {
        let mut registry = BinderRegistry::new();
        registry.register(SchemaVersion::Ifc4, Arc::new(TypeBinder));
        let err = registry
            .resolve(FacetKind::Property, SchemaVersion::Ifc4)
            .err()
            .unwrap();
        assert!(matches!(err, ConfigurationError::UnsupportedFacet { .. }));
        assert!(registry.resolve(FacetKind::Type, SchemaVersion::Ifc4).is_ok());
        assert!(!registry.supports(FacetKind::Type, SchemaVersion::Ifc2x3));
    }

    #[test]
    fn selection_chains_facets() {
        let graph = InMemoryGraph::from_entities(
            SchemaVersion::Ifc4,
            [
                Entity::new(1, "IfcWall").with_property("Pset_WallCommon", "FireRating", "60min"),
                Entity::new(2, "IfcWall"),
                Entity::new(3, "IfcDoor").with_property("Pset_WallCommon", "FireRating", "60min"),
            ],
        )
        .unwrap();
        let mapper = ValueMapper::standard();
        let group = FacetGroup::new()
            .with(TypeFacet::new("IfcWall"))
            .with(PropertyFacet::new("Pset_WallCommon", "FireRating"));
        let query = BinderRegistry::standard()
            .selection(
                EntityQuery::over(&graph, &mapper, ValidationOptions::default()),
                &group,
            )
            .unwrap();
        let labels: Vec<u64> = query.labels().into_iter().map(|l| l.0).collect();
        assert_eq!(labels, vec![1]);
    }
}
