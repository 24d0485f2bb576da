//! Facets: typed predicates over entities.
//!
//! The set of facet kinds is closed. Each variant carries the fields its
//! binder needs to build a query and to validate an entity.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::constraint::ValueConstraint;
use crate::error::ConfigurationError;
use crate::model::PartOfRelation;

/// Facet kind, used as half of the binder registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetKind {
    /// Attribute facet.
    Attribute,
    /// Property facet.
    Property,
    /// Classification facet.
    Classification,
    /// Material facet.
    Material,
    /// Entity type facet.
    Type,
    /// Part-of facet.
    PartOf,
}

impl FacetKind {
    /// Every kind, in evaluation order.
    pub const ALL: [Self; 6] = [
        Self::Attribute,
        Self::Property,
        Self::Classification,
        Self::Material,
        Self::Type,
        Self::PartOf,
    ];
}

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Attribute => "attribute",
            Self::Property => "property",
            Self::Classification => "classification",
            Self::Material => "material",
            Self::Type => "type",
            Self::PartOf => "part-of",
        };
        f.write_str(s)
    }
}

/// How a raw match outcome is turned into a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// The facet must hold.
    #[default]
    Expected,
    /// The facet must not hold.
    Prohibited,
    /// The facet is informative only; its matches are never decisive.
    Optional,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expected => write!(f, "expected"),
            Self::Prohibited => write!(f, "prohibited"),
            Self::Optional => write!(f, "optional"),
        }
    }
}

/// Matches a named entity attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeFacet {
    /// Attribute name.
    pub name: ValueConstraint,
    /// Constraint on the attribute's value.
    #[serde(default)]
    pub value: Option<ValueConstraint>,
}

impl AttributeFacet {
    /// Facet on the attribute named `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: ValueConstraint::exact(name),
            value: None,
        }
    }

    /// Constrains the value.
    #[must_use]
    pub fn with_value(mut self, value: ValueConstraint) -> Self {
        self.value = Some(value);
        self
    }
}

/// Matches a property within a property set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyFacet {
    /// Property set name.
    pub property_set: ValueConstraint,
    /// Property name.
    pub base_name: ValueConstraint,
    /// Required schema type of the stored value, e.g. `IfcLabel`.
    #[serde(default)]
    pub data_type: Option<String>,
    /// Constraint on the property's value.
    #[serde(default)]
    pub value: Option<ValueConstraint>,
}

impl PropertyFacet {
    /// Facet on `property_set`.`base_name`.
    #[must_use]
    pub fn new(property_set: &str, base_name: &str) -> Self {
        Self {
            property_set: ValueConstraint::exact(property_set),
            base_name: ValueConstraint::exact(base_name),
            data_type: None,
            value: None,
        }
    }

    /// Constrains the value.
    #[must_use]
    pub fn with_value(mut self, value: ValueConstraint) -> Self {
        self.value = Some(value);
        self
    }

    /// Requires the property's value type.
    #[must_use]
    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }
}

/// Matches a classification reference.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassificationFacet {
    /// Classification system; any system when absent.
    #[serde(default)]
    pub system: Option<ValueConstraint>,
    /// Constraint on the reference identification.
    #[serde(default)]
    pub value: Option<ValueConstraint>,
}

impl ClassificationFacet {
    /// Facet on references in `system`.
    #[must_use]
    pub fn in_system(system: &str) -> Self {
        Self {
            system: Some(ValueConstraint::exact(system)),
            value: None,
        }
    }

    /// Constrains the identification.
    #[must_use]
    pub fn with_value(mut self, value: ValueConstraint) -> Self {
        self.value = Some(value);
        self
    }
}

/// Matches an assigned material by name or category.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MaterialFacet {
    /// Constraint on the material name or category.
    #[serde(default)]
    pub value: Option<ValueConstraint>,
}

/// Matches the entity's schema type and predefined type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeFacet {
    /// Entity type name.
    pub name: ValueConstraint,
    /// Constraint on the predefined type.
    #[serde(default)]
    pub predefined_type: Option<ValueConstraint>,
}

impl TypeFacet {
    /// Facet on entities of type `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: ValueConstraint::exact(name),
            predefined_type: None,
        }
    }

    /// Constrains the predefined type.
    #[must_use]
    pub fn with_predefined_type(mut self, predefined_type: ValueConstraint) -> Self {
        self.predefined_type = Some(predefined_type);
        self
    }
}

/// Matches when the entity is part of a whole matching `entity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartOfFacet {
    /// Type the whole must have.
    pub entity: TypeFacet,
    /// Required relation; any relation when absent.
    #[serde(default)]
    pub relation: Option<PartOfRelation>,
}

/// A typed predicate over entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "facet", rename_all = "snake_case")]
pub enum Facet {
    /// See [`AttributeFacet`].
    Attribute(AttributeFacet),
    /// See [`PropertyFacet`].
    Property(PropertyFacet),
    /// See [`ClassificationFacet`].
    Classification(ClassificationFacet),
    /// See [`MaterialFacet`].
    Material(MaterialFacet),
    /// See [`TypeFacet`].
    Type(TypeFacet),
    /// See [`PartOfFacet`].
    PartOf(PartOfFacet),
}

impl Facet {
    /// Kind of this facet.
    #[must_use]
    pub const fn kind(&self) -> FacetKind {
        match self {
            Self::Attribute(_) => FacetKind::Attribute,
            Self::Property(_) => FacetKind::Property,
            Self::Classification(_) => FacetKind::Classification,
            Self::Material(_) => FacetKind::Material,
            Self::Type(_) => FacetKind::Type,
            Self::PartOf(_) => FacetKind::PartOf,
        }
    }

    /// The facet's own value constraint; `None` means "any value".
    #[must_use]
    pub const fn value_constraint(&self) -> Option<&ValueConstraint> {
        match self {
            Self::Attribute(f) => f.value.as_ref(),
            Self::Property(f) => f.value.as_ref(),
            Self::Classification(f) => f.value.as_ref(),
            Self::Material(f) => f.value.as_ref(),
            Self::Type(f) => f.predefined_type.as_ref(),
            Self::PartOf(f) => f.entity.predefined_type.as_ref(),
        }
    }

    /// Checks every constraint in the facet is well-formed.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let constraints: Vec<&ValueConstraint> = match self {
            Self::Attribute(f) => std::iter::once(&f.name).chain(f.value.as_ref()).collect(),
            Self::Property(f) => [&f.property_set, &f.base_name]
                .into_iter()
                .chain(f.value.as_ref())
                .collect(),
            Self::Classification(f) => f.system.iter().chain(f.value.as_ref()).collect(),
            Self::Material(f) => f.value.iter().collect(),
            Self::Type(f) => std::iter::once(&f.name).chain(f.predefined_type.as_ref()).collect(),
            Self::PartOf(f) => std::iter::once(&f.entity.name)
                .chain(f.entity.predefined_type.as_ref())
                .collect(),
        };
        constraints.into_iter().try_for_each(ValueConstraint::validate)?;
        if let Self::Property(f) = self {
            if f.data_type.as_deref().is_some_and(|t| t.trim().is_empty()) {
                return Err(ConfigurationError::InvalidConstraint {
                    reason: "property data type must not be blank".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl From<AttributeFacet> for Facet {
    fn from(f: AttributeFacet) -> Self {
        Self::Attribute(f)
    }
}

impl From<PropertyFacet> for Facet {
    fn from(f: PropertyFacet) -> Self {
        Self::Property(f)
    }
}

impl From<ClassificationFacet> for Facet {
    fn from(f: ClassificationFacet) -> Self {
        Self::Classification(f)
    }
}

impl From<MaterialFacet> for Facet {
    fn from(f: MaterialFacet) -> Self {
        Self::Material(f)
    }
}

impl From<TypeFacet> for Facet {
    fn from(f: TypeFacet) -> Self {
        Self::Type(f)
    }
}

impl From<PartOfFacet> for Facet {
    fn from(f: PartOfFacet) -> Self {
        Self::PartOf(f)
    }
}

/// An ordered conjunction of facets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FacetGroup {
    facets: Vec<Arc<Facet>>,
}

impl FacetGroup {
    /// Empty group.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a facet.
    #[must_use]
    pub fn with(mut self, facet: impl Into<Facet>) -> Self {
        self.facets.push(Arc::new(facet.into()));
        self
    }

    /// Facets in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Facet>> {
        self.facets.iter()
    }

    /// Number of facets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.facets.len()
    }

    /// Whether the group has no facets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    /// Rejects empty groups and groups with malformed facets.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.facets.is_empty() {
            return Err(ConfigurationError::InvalidFacetGroup {
                reason: "facet group is empty".to_string(),
            });
        }
        for (i, facet) in self.facets.iter().enumerate() {
            facet
                .validate()
                .map_err(|e| ConfigurationError::InvalidFacetGroup {
                    reason: format!("facet {i} ({}): {e}", facet.kind()),
                })?;
        }
        Ok(())
    }
}

impl FromIterator<Facet> for FacetGroup {
    fn from_iter<I: IntoIterator<Item = Facet>>(iter: I) -> Self {
        Self {
            facets: iter.into_iter().map(Arc::new).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_value_constraint() {
        let f: Facet = PropertyFacet::new("Pset_WallCommon", "FireRating")
            .with_value(ValueConstraint::exact("60min"))
            .into();
        assert_eq!(f.kind(), FacetKind::Property);
        assert_eq!(f.value_constraint(), Some(&ValueConstraint::exact("60min")));

        let f: Facet = TypeFacet::new("IfcWall").into();
        assert!(f.value_constraint().is_none());
    }

    #[test]
    fn empty_group_is_invalid() {
        let err = FacetGroup::new().validate().unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidFacetGroup { .. }));
    }

    #[test]
    fn group_reports_bad_facet() {
        let group = FacetGroup::new()
            .with(TypeFacet::new("IfcWall"))
            .with(AttributeFacet {
                name: ValueConstraint::Pattern {
                    pattern: "[".to_string(),
                },
                value: None,
            });
        let err = group.validate().unwrap_err();
        assert!(err.to_string().contains("facet 1 (attribute)"));
    }

    #[test]
    fn blank_data_type_is_invalid() {
        let f: Facet = PropertyFacet::new("P", "N").with_data_type(" ").into();
        assert!(f.validate().is_err());
    }

    #[test]
    fn facet_serde_is_tagged() {
        let f: Facet = serde_json::from_str(
            r#"{"facet":"type","name":{"kind":"exact","value":{"type":"string","value":"IfcWall"}}}"#,
        )
        .unwrap();
        assert_eq!(f, Facet::Type(TypeFacet::new("IfcWall")));
    }

    #[test]
    fn kind_display() {
        assert_eq!(FacetKind::PartOf.to_string(), "part-of");
        assert_eq!(Cardinality::default(), Cardinality::Expected);
    }
}
