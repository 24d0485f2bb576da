//! A single evaluated check.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::facet::{Cardinality, Facet};
use crate::model::{EntityLabel, PartOfRelation};
use crate::value::Value;

use super::field::FacetField;
use super::status::ValidationStatus;

/// The sub-entity a message is about, when narrower than the entity itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubjectRef {
    /// An attribute.
    Attribute {
        /// Attribute name.
        name: String,
    },
    /// A property.
    Property {
        /// Property set name.
        property_set: String,
        /// Property name.
        name: String,
        /// Set when the property was inherited from the type object.
        from_type: Option<EntityLabel>,
    },
    /// A classification reference.
    Classification {
        /// System name.
        system: String,
        /// Code within the system.
        identification: Option<String>,
    },
    /// A material.
    Material {
        /// Material name.
        name: String,
    },
    /// The whole of an aggregation.
    Whole {
        /// Label of the whole.
        label: EntityLabel,
        /// Aggregation kind.
        relation: PartOfRelation,
    },
}

impl fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attribute { name } => write!(f, "{name}"),
            Self::Property {
                property_set, name, ..
            } => write!(f, "{property_set}.{name}"),
            Self::Classification {
                system,
                identification,
            } => match identification {
                Some(id) => write!(f, "{system}:{id}"),
                None => write!(f, "{system}"),
            },
            Self::Material { name } => write!(f, "{name}"),
            Self::Whole { label, relation } => write!(f, "#{label} via {relation}"),
        }
    }
}

/// One evaluated check. Immutable once constructed.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationMessage {
    status: ValidationStatus,
    cardinality: Cardinality,
    #[serde(skip_serializing_if = "Option::is_none")]
    facet: Option<Arc<Facet>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<FacetField>,
    field_name: String,
    expected: String,
    actual: Option<Value>,
    reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<SubjectRef>,
}

impl ValidationMessage {
    /// Message for a facet field check. Use
    /// [`ValidationContext`](super::ValidationContext) to build these so the
    /// status goes through the cardinality table.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn for_field(
        status: ValidationStatus,
        cardinality: Cardinality,
        facet: Arc<Facet>,
        field: FacetField,
        field_name: &str,
        expected: String,
        actual: Option<Value>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            status,
            cardinality,
            facet: Some(facet),
            field: Some(field),
            field_name: field_name.to_string(),
            expected,
            actual,
            reason: reason.into(),
            subject: None,
        }
    }

    /// A check that could not be carried out.
    #[must_use]
    pub fn error(
        facet: Option<Arc<Facet>>,
        cardinality: Cardinality,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            status: ValidationStatus::Error,
            cardinality,
            facet,
            field: None,
            field_name: String::new(),
            expected: String::new(),
            actual: None,
            reason: reason.into(),
            subject: None,
        }
    }

    /// A specification-level verdict not tied to a facet field.
    #[must_use]
    pub fn for_specification(
        status: ValidationStatus,
        cardinality: Cardinality,
        expected: impl Into<String>,
        actual: Option<Value>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            status,
            cardinality,
            facet: None,
            field: None,
            field_name: "Applicable entities".to_string(),
            expected: expected.into(),
            actual,
            reason: reason.into(),
            subject: None,
        }
    }

    /// Narrows the message to `subject`.
    #[must_use]
    pub fn with_subject(mut self, subject: SubjectRef) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Verdict.
    #[must_use]
    pub const fn status(&self) -> ValidationStatus {
        self.status
    }

    /// Cardinality the facet was held to.
    #[must_use]
    pub const fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Facet evaluated; `None` for specification-level messages.
    #[must_use]
    pub fn facet(&self) -> Option<&Arc<Facet>> {
        self.facet.as_ref()
    }

    /// Field reported on.
    #[must_use]
    pub const fn field(&self) -> Option<FacetField> {
        self.field
    }

    /// Display label of the field.
    #[must_use]
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Rendered expectation.
    #[must_use]
    pub fn expected(&self) -> &str {
        &self.expected
    }

    /// Value found, if any.
    #[must_use]
    pub const fn actual(&self) -> Option<&Value> {
        self.actual.as_ref()
    }

    /// Human-readable explanation.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Sub-entity the message is about.
    #[must_use]
    pub const fn subject(&self) -> Option<&SubjectRef> {
        self.subject.as_ref()
    }
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.status, self.field_name, self.reason)?;
        if !self.expected.is_empty() {
            write!(f, " (expected {}", self.expected)?;
            match &self.actual {
                Some(actual) => write!(f, ", actual {actual})")?,
                None => write!(f, ", actual <nothing>)")?,
            }
        }
        Ok(())
    }
}
