//! Error types for the facet evaluation engine.
//!
//! All errors are strongly typed using thiserror. Callers must be able to
//! tell "the rule could not be evaluated" (a [`ConfigurationError`]) apart
//! from "the rule was evaluated and failed", which is never an error: facet
//! mismatches are recorded as `Fail` messages on the validation result.

use thiserror::Error;

use crate::facet::FacetKind;
use crate::model::{EntityLabel, GraphId, SchemaVersion};

/// Errors raised while setting up an evaluation (never a validation verdict).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// No binder handles this facet kind on the schema.
    #[error("{kind} facets are not supported on schema {schema}")]
    UnsupportedFacet {
        /// Facet kind.
        kind: FacetKind,
        /// Target schema.
        schema: SchemaVersion,
    },

    /// A binder was called with a facet of another kind.
    #[error("Binder for {expected} facets was handed a {actual} facet")]
    FacetKindMismatch {
        /// Kind the binder handles.
        expected: FacetKind,
        /// Kind it was given.
        actual: FacetKind,
    },

    /// A facet group is structurally unusable.
    #[error("Invalid facet group: {reason}")]
    InvalidFacetGroup {
        /// What is wrong with it.
        reason: String,
    },

    /// A value constraint cannot be evaluated.
    #[error("Invalid value constraint: {reason}")]
    InvalidConstraint {
        /// What is wrong with it.
        reason: String,
    },

    /// A specification is structurally unusable.
    #[error("Invalid specification '{specification}': {reason}")]
    InvalidSpecification {
        /// Specification id.
        specification: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Options are out of range.
    #[error("Invalid options: {reason}")]
    InvalidOptions {
        /// Offending option.
        reason: String,
    },
}

/// Top-level error type for the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Setup failed.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// An exclusion policy saw an entity from another graph.
    #[error("Exclusion policy is bound to graph {expected}, called with an entity from graph {actual}")]
    GraphMismatch {
        /// Graph the policy was built for.
        expected: GraphId,
        /// Graph of the entity.
        actual: GraphId,
    },

    /// A label does not resolve.
    #[error("Entity #{label} not found in graph {graph}")]
    EntityNotFound {
        /// Graph searched.
        graph: GraphId,
        /// Missing label.
        label: EntityLabel,
    },

    /// Two entities share a label.
    #[error("Entity #{label} already exists in graph {graph}")]
    DuplicateLabel {
        /// Graph being built.
        graph: GraphId,
        /// Repeated label.
        label: EntityLabel,
    },
}

impl EngineError {
    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns true if the facet/schema pairing has no registered binder.
    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::Configuration(ConfigurationError::UnsupportedFacet { .. })
        )
    }

    /// Returns true if a single-graph component was called against another graph.
    #[must_use]
    pub const fn is_graph_mismatch(&self) -> bool {
        matches!(self, Self::GraphMismatch { .. })
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
