//! Symbolic facet fields used to label messages.
//!
//! Each field maps to a description and an accessor that renders the
//! facet's expected value for that field. The table is built once and
//! shared read-only.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constraint::ValueConstraint;
use crate::facet::{Facet, FacetKind};

/// A declared member of a facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetField {
    /// Attribute name.
    AttributeName,
    /// Attribute value.
    AttributeValue,
    /// Property set name.
    PropertySet,
    /// Property name.
    PropertyName,
    /// Property data type.
    PropertyDataType,
    /// Property value.
    PropertyValue,
    /// Classification system.
    ClassificationSystem,
    /// Classification identification.
    ClassificationValue,
    /// Material name or category.
    MaterialValue,
    /// Entity type name.
    TypeName,
    /// Predefined type.
    PredefinedType,
    /// Part-of relation.
    PartOfRelation,
    /// Type of the whole.
    PartOfEntity,
}

impl FacetField {
    /// The facet kind this field belongs to.
    #[must_use]
    pub const fn kind(self) -> FacetKind {
        match self {
            Self::AttributeName | Self::AttributeValue => FacetKind::Attribute,
            Self::PropertySet
            | Self::PropertyName
            | Self::PropertyDataType
            | Self::PropertyValue => FacetKind::Property,
            Self::ClassificationSystem | Self::ClassificationValue => FacetKind::Classification,
            Self::MaterialValue => FacetKind::Material,
            Self::TypeName | Self::PredefinedType => FacetKind::Type,
            Self::PartOfRelation | Self::PartOfEntity => FacetKind::PartOf,
        }
    }
}

type Accessor = fn(&Facet) -> Option<String>;

#[derive(Clone, Copy)]
struct FieldDescriptor {
    description: &'static str,
    accessor: Accessor,
}

fn render(c: Option<&ValueConstraint>) -> Option<String> {
    c.map(ToString::to_string)
}

/// Field descriptions and expected-value accessors, keyed by field.
#[derive(Clone)]
pub struct FieldTable {
    fields: HashMap<FacetField, FieldDescriptor>,
}

impl FieldTable {
    /// Table covering every built-in facet kind.
    #[must_use]
    pub fn standard() -> Self {
        let entries: [(FacetField, &'static str, Accessor); 13] = [
            (FacetField::AttributeName, "Attribute name", |f| match f {
                Facet::Attribute(a) => render(Some(&a.name)),
                _ => None,
            }),
            (FacetField::AttributeValue, "Attribute value", |f| match f {
                Facet::Attribute(a) => render(a.value.as_ref()),
                _ => None,
            }),
            (FacetField::PropertySet, "Property set", |f| match f {
                Facet::Property(p) => render(Some(&p.property_set)),
                _ => None,
            }),
            (FacetField::PropertyName, "Property name", |f| match f {
                Facet::Property(p) => render(Some(&p.base_name)),
                _ => None,
            }),
            (FacetField::PropertyDataType, "Property data type", |f| match f {
                Facet::Property(p) => p.data_type.clone(),
                _ => None,
            }),
            (FacetField::PropertyValue, "Property value", |f| match f {
                Facet::Property(p) => render(p.value.as_ref()),
                _ => None,
            }),
            (FacetField::ClassificationSystem, "Classification system", |f| match f {
                Facet::Classification(c) => render(c.system.as_ref()),
                _ => None,
            }),
            (FacetField::ClassificationValue, "Classification reference", |f| match f {
                Facet::Classification(c) => render(c.value.as_ref()),
                _ => None,
            }),
            (FacetField::MaterialValue, "Material", |f| match f {
                Facet::Material(m) => render(m.value.as_ref()),
                _ => None,
            }),
            (FacetField::TypeName, "Entity type", |f| match f {
                Facet::Type(t) => render(Some(&t.name)),
                _ => None,
            }),
            (FacetField::PredefinedType, "Predefined type", |f| match f {
                Facet::Type(t) => render(t.predefined_type.as_ref()),
                _ => None,
            }),
            (FacetField::PartOfRelation, "Part-of relation", |f| match f {
                Facet::PartOf(p) => p.relation.map(|r| r.to_string()),
                _ => None,
            }),
            (FacetField::PartOfEntity, "Part of", |f| match f {
                Facet::PartOf(p) => Some(match &p.entity.predefined_type {
                    Some(pt) => format!("{} ({pt})", p.entity.name),
                    None => p.entity.name.to_string(),
                }),
                _ => None,
            }),
        ];
        let fields = entries
            .into_iter()
            .map(|(field, description, accessor)| {
                (field, FieldDescriptor { description, accessor })
            })
            .collect();
        Self { fields }
    }

    /// Human-readable label of `field`.
    #[must_use]
    pub fn describe(&self, field: FacetField) -> &'static str {
        self.fields
            .get(&field)
            .map_or("Unknown field", |d| d.description)
    }

    /// Expected value of `field` as declared on `facet`; `None` if the facet
    /// leaves the field unconstrained.
    #[must_use]
    pub fn expected(&self, field: FacetField, facet: &Facet) -> Option<String> {
        self.fields.get(&field).and_then(|d| (d.accessor)(facet))
    }
}

impl Default for FieldTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for FieldTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldTable")
            .field("fields", &self.fields.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facet::{PropertyFacet, TypeFacet};

    #[test]
    fn every_field_is_described() {
        let table = FieldTable::standard();
        for field in [
            FacetField::AttributeName,
            FacetField::PropertyValue,
            FacetField::ClassificationValue,
            FacetField::MaterialValue,
            FacetField::PredefinedType,
            FacetField::PartOfEntity,
        ] {
            assert_ne!(table.describe(field), "Unknown field");
        }
    }

    #[test]
    fn expected_reads_facet_member() {
        let table = FieldTable::standard();
        let facet: Facet = PropertyFacet::new("Pset_WallCommon", "FireRating")
            .with_value(ValueConstraint::exact("60min"))
            .into();
        assert_eq!(
            table.expected(FacetField::PropertyValue, &facet).as_deref(),
            Some("60min")
        );
        assert_eq!(
            table.expected(FacetField::PropertyName, &facet).as_deref(),
            Some("FireRating")
        );
        assert!(table.expected(FacetField::PropertyDataType, &facet).is_none());
    }

    #[test]
    fn expected_is_none_for_other_kinds() {
        let table = FieldTable::standard();
        let facet: Facet = TypeFacet::new("IfcWall").into();
        assert!(table.expected(FacetField::PropertyValue, &facet).is_none());
        assert_eq!(FacetField::PropertyValue.kind(), FacetKind::Property);
    }

    #[test]
    fn repeated_lookups_agree() {
        let table = FieldTable::standard();
        let facet: Facet = TypeFacet::new("IfcWall").into();
        let a = table.expected(FacetField::TypeName, &facet);
        let b = table.expected(FacetField::TypeName, &facet);
        assert_eq!(a, b);
    }
}
