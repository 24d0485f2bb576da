//! Per-call validation context.

use std::sync::Arc;

use crate::config::ValidationOptions;
use crate::facet::{Cardinality, Facet};
use crate::mapper::ValueMapper;
use crate::model::EntityGraph;
use crate::value::Value;

use super::field::{FacetField, FieldTable};
use super::message::ValidationMessage;
use super::status::{status_for, ValidationStatus};

/// Text used when a facet leaves a field unconstrained.
const ANY_VALUE: &str = "<any>";

/// Binds one facet and cardinality for the duration of one validation call.
pub struct ValidationContext<'a> {
    facet: &'a Arc<Facet>,
    cardinality: Cardinality,
    graph: &'a dyn EntityGraph,
    mapper: &'a ValueMapper,
    fields: &'a FieldTable,
    options: ValidationOptions,
}

impl<'a> ValidationContext<'a> {
    /// Context for evaluating `facet` under `cardinality`.
    #[must_use]
    pub fn new(
        facet: &'a Arc<Facet>,
        cardinality: Cardinality,
        graph: &'a dyn EntityGraph,
        mapper: &'a ValueMapper,
        fields: &'a FieldTable,
        options: ValidationOptions,
    ) -> Self {
        Self {
            facet,
            cardinality,
            graph,
            mapper,
            fields,
            options,
        }
    }

    /// Facet being evaluated.
    #[must_use]
    pub fn facet(&self) -> &'a Arc<Facet> {
        self.facet
    }

    /// Cardinality the facet is held to.
    #[must_use]
    pub const fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Graph the entity belongs to.
    #[must_use]
    pub fn graph(&self) -> &'a dyn EntityGraph {
        self.graph
    }

    /// Value mapper.
    #[must_use]
    pub fn mapper(&self) -> &'a ValueMapper {
        self.mapper
    }

    /// Evaluation options.
    #[must_use]
    pub const fn options(&self) -> ValidationOptions {
        self.options
    }

    /// Decoded expected value of `field` on the bound facet.
    #[must_use]
    pub fn expected(&self, field: FacetField) -> String {
        self.fields
            .expected(field, self.facet)
            .unwrap_or_else(|| ANY_VALUE.to_string())
    }

    /// Decoded label of `field`.
    #[must_use]
    pub fn field_name(&self, field: FacetField) -> &'static str {
        self.fields.describe(field)
    }

    /// Whether a found value is expected to be populated.
    ///
    /// Only false for a prohibited facet with no value constraint, where
    /// any populated value is itself the violation.
    #[must_use]
    pub fn expects_populated(&self) -> bool {
        !(self.cardinality == Cardinality::Prohibited && self.facet.value_constraint().is_none())
    }

    /// Status of a single match under this cardinality; `None` is an unknown match.
    #[must_use]
    pub const fn status_for(&self, matched: Option<bool>) -> ValidationStatus {
        status_for(self.cardinality, matched)
    }

    /// Message for a raw match outcome on `field`.
    #[must_use]
    pub fn message(
        &self,
        field: FacetField,
        matched: Option<bool>,
        actual: Option<Value>,
        reason: impl Into<String>,
    ) -> ValidationMessage {
        ValidationMessage::for_field(
            self.status_for(matched),
            self.cardinality,
            Arc::clone(self.facet),
            field,
            self.field_name(field),
            self.expected(field),
            actual,
            reason,
        )
    }

    /// Message recording that the requirement is satisfied for `field`.
    ///
    /// Pass under Expected and Prohibited, Inconclusive under Optional.
    #[must_use]
    pub fn success(
        &self,
        field: FacetField,
        actual: Option<Value>,
        reason: impl Into<String>,
    ) -> ValidationMessage {
        let satisfied = Some(self.cardinality != Cardinality::Prohibited);
        self.message(field, satisfied, actual, reason)
    }

    /// Message recording that nothing relevant was found for `field`.
    ///
    /// Fail under Expected only; absence satisfies a prohibition.
    #[must_use]
    pub fn absent(&self, field: FacetField, reason: impl Into<String>) -> ValidationMessage {
        self.message(field, Some(false), None, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::ValueConstraint;
    use crate::facet::PropertyFacet;
    use crate::model::{InMemoryGraph, SchemaVersion};

    fn facet(with_value: bool) -> Arc<Facet> {
        let mut f = PropertyFacet::new("Pset_WallCommon", "FireRating");
        if with_value {
            f = f.with_value(ValueConstraint::exact("60min"));
        }
        Arc::new(f.into())
    }

    #[test]
    fn success_and_absent_follow_cardinality() {
        let graph = InMemoryGraph::new(SchemaVersion::Ifc4);
        let mapper = ValueMapper::standard();
        let fields = FieldTable::standard();
        let f = facet(true);
        let cases = [
            (Cardinality::Expected, ValidationStatus::Pass, ValidationStatus::Fail),
            (Cardinality::Prohibited, ValidationStatus::Pass, ValidationStatus::Pass),
            (
                Cardinality::Optional,
                ValidationStatus::Inconclusive,
                ValidationStatus::Inconclusive,
            ),
        ];
        for (cardinality, success, absent) in cases {
            let ctx = ValidationContext::new(
                &f,
                cardinality,
                &graph,
                &mapper,
                &fields,
                ValidationOptions::default(),
            );
            assert_eq!(ctx.success(FacetField::PropertyName, None, "ok").status(), success);
            assert_eq!(ctx.absent(FacetField::PropertyName, "none").status(), absent);
        }
    }

    #[test]
    fn expects_populated_only_false_for_bare_prohibition() {
        let graph = InMemoryGraph::new(SchemaVersion::Ifc4);
        let mapper = ValueMapper::standard();
        let fields = FieldTable::standard();
        let bare = facet(false);
        let valued = facet(true);
        let ctx = |f, c| {
            ValidationContext::new(f, c, &graph, &mapper, &fields, ValidationOptions::default())
                .expects_populated()
        };
        assert!(!ctx(&bare, Cardinality::Prohibited));
        assert!(ctx(&valued, Cardinality::Prohibited));
        assert!(ctx(&bare, Cardinality::Expected));
        assert!(ctx(&bare, Cardinality::Optional));
    }

    #[test]
    fn expected_falls_back_to_any() {
        let graph = InMemoryGraph::new(SchemaVersion::Ifc4);
        let mapper = ValueMapper::standard();
        let fields = FieldTable::standard();
        let f = facet(false);
        let ctx = ValidationContext::new(
            &f,
            Cardinality::Expected,
            &graph,
            &mapper,
            &fields,
            ValidationOptions::default(),
        );
        assert_eq!(ctx.expected(FacetField::PropertyValue), "<any>");
        assert_eq!(ctx.expected(FacetField::PropertyName), "FireRating");
        assert_eq!(ctx.field_name(FacetField::PropertyName), "Property name");
    }
}
