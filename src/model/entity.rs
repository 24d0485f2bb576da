//! Entity types of the building-model graph.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value::ModelValue;

/// Stable integer label of an entity within one graph instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityLabel(pub u64);

impl fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one loaded graph instance.
///
/// Two loads of the same file produce different `GraphId`s; components that
/// precompute per-graph state compare against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphId(Uuid);

impl GraphId {
    /// Creates a new random graph ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing id.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for GraphId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Relationship through which an entity is part of a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartOfRelation {
    /// Decomposition (`IfcRelAggregates`).
    Aggregates,
    /// Spatial containment (`IfcRelContainedInSpatialStructure`).
    Contained,
    /// Nesting (`IfcRelNests`).
    Nests,
    /// Group membership (`IfcRelAssignsToGroup`).
    Groups,
    /// Opening voids an element (`IfcRelVoidsElement`).
    Voids,
    /// Element fills an opening (`IfcRelFillsElement`).
    Fills,
}

impl PartOfRelation {
    /// Schema name of the relationship entity.
    #[must_use]
    pub const fn schema_name(&self) -> &'static str {
        match self {
            Self::Aggregates => "IFCRELAGGREGATES",
            Self::Contained => "IFCRELCONTAINEDINSPATIALSTRUCTURE",
            Self::Nests => "IFCRELNESTS",
            Self::Groups => "IFCRELASSIGNSTOGROUP",
            Self::Voids => "IFCRELVOIDSELEMENT",
            Self::Fills => "IFCRELFILLSELEMENT",
        }
    }
}

impl fmt::Display for PartOfRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.schema_name())
    }
}

/// A named property value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    /// Property name.
    pub name: String,
    /// Stored value.
    pub value: ModelValue,
}

/// A named group of properties.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySet {
    /// Set name.
    pub name: String,
    /// Member properties.
    pub properties: Vec<Property>,
}

/// Reference into a classification system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationReference {
    /// System name.
    pub system: String,
    /// Code within the system.
    pub identification: Option<String>,
    /// Display name.
    pub name: Option<String>,
}

/// A material associated with an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialAssignment {
    /// Material name.
    pub name: String,
    /// Material category.
    pub category: Option<String>,
}

/// Edge from a part to its whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartOfLink {
    /// Kind of aggregation.
    pub relation: PartOfRelation,
    /// Label of the whole.
    pub whole: EntityLabel,
}

/// A node in the entity graph. The engine never mutates entities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    /// Instance label, unique within the graph.
    pub label: EntityLabel,
    /// Owning graph instance; assigned on insertion.
    pub graph: GraphId,
    /// Globally unique identifier.
    pub global_id: Option<String>,
    /// Schema type name.
    pub type_name: String,
    /// Predefined type enumeration value.
    pub predefined_type: Option<String>,
    /// User-defined type, used when the predefined type is USERDEFINED.
    pub object_type: Option<String>,
    /// Attribute values by name.
    pub attributes: BTreeMap<String, ModelValue>,
    /// Attribute names whose values are computed rather than stored.
    pub derived_attributes: BTreeSet<String>,
    /// Property sets, own ones only.
    pub property_sets: Vec<PropertySet>,
    /// Classification references.
    pub classifications: Vec<ClassificationReference>,
    /// Material assignments.
    pub materials: Vec<MaterialAssignment>,
    /// Type object this entity is an occurrence of.
    pub type_object: Option<EntityLabel>,
    /// Wholes this entity is part of.
    pub part_of: Vec<PartOfLink>,
}

impl Entity {
    /// Creates an entity with the given label and schema type name.
    #[must_use]
    pub fn new(label: u64, type_name: impl Into<String>) -> Self {
        Self {
            label: EntityLabel(label),
            graph: GraphId::from_uuid(Uuid::nil()),
            global_id: None,
            type_name: type_name.into(),
            predefined_type: None,
            object_type: None,
            attributes: BTreeMap::new(),
            derived_attributes: BTreeSet::new(),
            property_sets: Vec::new(),
            classifications: Vec::new(),
            materials: Vec::new(),
            type_object: None,
            part_of: Vec::new(),
        }
    }

    /// Sets the global id.
    #[must_use]
    pub fn with_global_id(mut self, global_id: impl Into<String>) -> Self {
        let global_id = global_id.into();
        self.attributes
            .insert("GlobalId".to_string(), ModelValue::from(global_id.as_str()));
        self.global_id = Some(global_id);
        self
    }

    /// Sets the predefined type.
    #[must_use]
    pub fn with_predefined_type(mut self, predefined_type: impl Into<String>) -> Self {
        self.predefined_type = Some(predefined_type.into());
        self
    }

    /// Sets the object type.
    #[must_use]
    pub fn with_object_type(mut self, object_type: impl Into<String>) -> Self {
        self.object_type = Some(object_type.into());
        self
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<ModelValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Adds an attribute whose value is computed.
    #[must_use]
    pub fn with_derived_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<ModelValue>,
    ) -> Self {
        let name = name.into();
        self.derived_attributes.insert(name.clone());
        self.attributes.insert(name, value.into());
        self
    }

    /// Adds a property, creating the property set on first use.
    #[must_use]
    pub fn with_property(
        mut self,
        property_set: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<ModelValue>,
    ) -> Self {
        let property_set = property_set.into();
        let property = Property {
            name: name.into(),
            value: value.into(),
        };
        match self.property_sets.iter_mut().find(|p| p.name == property_set) {
            Some(pset) => pset.properties.push(property),
            None => self.property_sets.push(PropertySet {
                name: property_set,
                properties: vec![property],
            }),
        }
        self
    }

    /// Adds a classification reference.
    #[must_use]
    pub fn with_classification(
        mut self,
        system: impl Into<String>,
        identification: impl Into<String>,
    ) -> Self {
        self.classifications.push(ClassificationReference {
            system: system.into(),
            identification: Some(identification.into()),
            name: None,
        });
        self
    }

    /// Adds a material.
    #[must_use]
    pub fn with_material(mut self, name: impl Into<String>) -> Self {
        self.materials.push(MaterialAssignment {
            name: name.into(),
            category: None,
        });
        self
    }

    /// Links the type object.
    #[must_use]
    pub fn with_type_object(mut self, label: u64) -> Self {
        self.type_object = Some(EntityLabel(label));
        self
    }

    /// Adds an aggregation edge to `whole`.
    #[must_use]
    pub fn part_of(mut self, relation: PartOfRelation, whole: u64) -> Self {
        self.part_of.push(PartOfLink {
            relation,
            whole: EntityLabel(whole),
        });
        self
    }

    /// Predefined type with `USERDEFINED` resolved through `ObjectType`.
    #[must_use]
    pub fn effective_predefined_type(&self) -> Option<&str> {
        match self.predefined_type.as_deref() {
            Some("USERDEFINED") => self.object_type.as_deref(),
            other => other,
        }
    }
}
