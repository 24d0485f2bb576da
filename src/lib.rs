//! # ids-engine - Facet evaluation for information delivery specifications
//!
//! Validates a building-model entity graph against a parsed rule document.
//! Each specification selects applicable entities through an applicability
//! facet group, then checks them against requirement facet groups under an
//! expected, prohibited, or optional cardinality.
//!
//! ## Core Concepts
//!
//! - **Facet**: one condition on an entity (attribute, property,
//!   classification, material, type, part-of)
//! - **Binder**: per-kind logic that turns a facet into a query filter, and
//!   validates one entity into structured messages
//! - **Exclusion policy**: removes entities from a specification's
//!   applicable set before any requirement is evaluated
//! - **Outcome**: per-specification requirements, per-entity results, and an
//!   aggregated status
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ids_engine::{
//!     Cardinality, Entity, ExclusionSet, FacetGroup, InMemoryGraph, PropertyFacet,
//!     RuleDocument, SchemaVersion, Specification, TypeFacet, ValidationEngine,
//!     ValidationOptions, ValueConstraint,
//! };
//!
//! let graph = InMemoryGraph::from_entities(
//!     SchemaVersion::Ifc4,
//!     [Entity::new(1, "IfcWall").with_property("Pset_WallCommon", "FireRating", "60min")],
//! )?;
//! let document = RuleDocument::new("Fire safety").with_specification(
//!     Specification::new("S1", "Wall fire rating")
//!         .applies_to(FacetGroup::new().with(TypeFacet::new("IfcWall")))
//!         .require(
//!             FacetGroup::new().with(
//!                 PropertyFacet::new("Pset_WallCommon", "FireRating")
//!                     .with_value(ValueConstraint::exact("60min")),
//!             ),
//!             Cardinality::Expected,
//!         ),
//! );
//!
//! let engine = ValidationEngine::standard(ValidationOptions::default());
//! let outcome = engine.validate(Arc::new(document), &graph, &ExclusionSet::new())?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Values and the collaborator contracts
/// Evaluation options.
pub mod config;
/// Value constraints.
pub mod constraint;
/// Error types.
pub mod error;
/// Mapping of domain values to primitives.
pub mod mapper;
/// Entity graph model.
pub mod model;
/// Primitive and domain values.
pub mod value;

// Rule model
/// Facets and facet groups.
pub mod facet;
/// Specifications and rule documents.
pub mod specification;

// Evaluation
/// Per-kind facet binders.
pub mod binder;
/// Validation driver.
pub mod engine;
/// Exclusion policies.
pub mod exclusion;
/// Entity queries.
pub mod query;
/// Validation results and messages.
pub mod validation;

pub use binder::{BinderRegistry, FacetBinder};
pub use config::ValidationOptions;
pub use constraint::ValueConstraint;
pub use engine::ValidationEngine;
pub use error::{ConfigurationError, EngineError, EngineResult};
pub use exclusion::{
    ApplicabilityExclusion, ExclusionPolicy, ExclusionSet, IdentifierExclusion,
    PredicateExclusion,
};
pub use facet::{
    AttributeFacet, Cardinality, ClassificationFacet, Facet, FacetGroup, FacetKind,
    MaterialFacet, PartOfFacet, PropertyFacet, TypeFacet,
};
pub use mapper::{ValueMapProvider, ValueMapper};
pub use model::{Entity, EntityGraph, EntityLabel, GraphId, InMemoryGraph, SchemaVersion};
pub use query::EntityQuery;
pub use specification::{AuditIssue, RequirementGroup, RuleDocument, Specification};
pub use validation::{
    IdsValidationResult, OutcomeSummary, ValidationMessage, ValidationOutcome,
    ValidationRequirement, ValidationStatus,
};
pub use value::{ModelValue, Value};
