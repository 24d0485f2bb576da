//! Specifications and the rule document that owns them.
//!
//! Parsing the rule document is done elsewhere; these are the parsed,
//! immutable forms the engine evaluates.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::facet::{Cardinality, FacetGroup};
use crate::model::SchemaVersion;

/// A requirement facet group and the cardinality it is evaluated under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementGroup {
    /// Facets every applicable entity is checked against.
    pub facets: FacetGroup,
    /// How the facets must hold.
    #[serde(default)]
    pub cardinality: Cardinality,
}

impl RequirementGroup {
    /// Group of `facets` under `cardinality`.
    #[must_use]
    pub fn new(facets: FacetGroup, cardinality: Cardinality) -> Self {
        Self { facets, cardinality }
    }
}

/// One named rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    /// Identifier, unique within the document.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Target schema versions; empty means any.
    #[serde(default)]
    pub schemas: Vec<SchemaVersion>,
    /// Whether applicable entities must exist (`Expected`), must not exist
    /// (`Prohibited`), or may exist (`Optional`).
    #[serde(default = "optional")]
    pub cardinality: Cardinality,
    /// Facets selecting the entities this specification applies to.
    pub applicability: FacetGroup,
    /// Requirement groups checked on every applicable entity.
    #[serde(default)]
    pub requirements: Vec<RequirementGroup>,
}

const fn optional() -> Cardinality {
    Cardinality::Optional
}

impl Specification {
    /// Creates a specification with no facets, applying to any schema.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            schemas: Vec::new(),
            cardinality: Cardinality::Optional,
            applicability: FacetGroup::new(),
            requirements: Vec::new(),
        }
    }

    /// Sets the applicability.
    #[must_use]
    pub fn applies_to(mut self, applicability: FacetGroup) -> Self {
        self.applicability = applicability;
        self
    }

    /// Adds a requirement group.
    #[must_use]
    pub fn require(mut self, facets: FacetGroup, cardinality: Cardinality) -> Self {
        self.requirements.push(RequirementGroup::new(facets, cardinality));
        self
    }

    /// Sets how many entities must be applicable.
    #[must_use]
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    /// Restricts the schemas this specification targets.
    #[must_use]
    pub fn for_schemas(mut self, schemas: impl IntoIterator<Item = SchemaVersion>) -> Self {
        self.schemas = schemas.into_iter().collect();
        self
    }

    /// True if the specification can be evaluated against `schema`.
    #[must_use]
    pub fn supports(&self, schema: SchemaVersion) -> bool {
        self.schemas.is_empty() || self.schemas.contains(&schema)
    }

    /// Structural checks on this specification alone.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidSpecification {
            specification: self.id.clone(),
            reason,
        };
        if self.id.trim().is_empty() {
            return Err(invalid("identifier is empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(invalid("name is empty".to_string()));
        }
        self.applicability
            .validate()
            .map_err(|e| invalid(format!("applicability: {e}")))?;
        if self.requirements.is_empty() && self.cardinality != Cardinality::Prohibited {
            return Err(invalid("no requirement groups".to_string()));
        }
        for (i, group) in self.requirements.iter().enumerate() {
            group
                .facets
                .validate()
                .map_err(|e| invalid(format!("requirement group {i}: {e}")))?;
        }
        Ok(())
    }
}

impl fmt::Display for Specification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// A structural problem found while auditing a rule document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditIssue {
    /// Id of the specification involved, if any.
    pub specification: Option<String>,
    /// Description of the issue.
    pub message: String,
}

impl fmt::Display for AuditIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.specification {
            Some(id) => write!(f, "[{id}] {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// A parsed rule document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDocument {
    /// Document title.
    pub title: String,
    /// Specifications in document order.
    pub specifications: Vec<Arc<Specification>>,
}

impl RuleDocument {
    /// Empty document.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            specifications: Vec::new(),
        }
    }

    /// Appends a specification.
    #[must_use]
    pub fn with_specification(mut self, specification: Specification) -> Self {
        self.specifications.push(Arc::new(specification));
        self
    }

    /// Collects document-level structural issues.
    ///
    /// Only problems that make the document as a whole unusable are
    /// reported. A malformed specification is not an audit issue; it is
    /// rejected when that specification is evaluated.
    #[must_use]
    pub fn audit(&self) -> Vec<AuditIssue> {
        let mut issues = Vec::new();
        if self.specifications.is_empty() {
            issues.push(AuditIssue {
                specification: None,
                message: "document has no specifications".to_string(),
            });
        }
        let mut seen: HashSet<&str> = HashSet::with_capacity(self.specifications.len());
        for spec in &self.specifications {
            if !seen.insert(spec.id.as_str()) {
                issues.push(AuditIssue {
                    specification: Some(spec.id.clone()),
                    message: "duplicate specification identifier".to_string(),
                });
            }
        }
        issues
    }
}
