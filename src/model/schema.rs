//! Schema versions and the entity type hierarchy.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Schema version of a model or a specification target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SchemaVersion {
    /// IFC 2x3.
    #[serde(rename = "IFC2X3")]
    Ifc2x3,
    /// IFC 4.
    #[serde(rename = "IFC4")]
    Ifc4,
    /// IFC 4.3.
    #[serde(rename = "IFC4X3")]
    Ifc4x3,
}

impl SchemaVersion {
    /// Every supported version.
    pub const ALL: [Self; 3] = [Self::Ifc2x3, Self::Ifc4, Self::Ifc4x3];
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ifc2x3 => write!(f, "IFC2X3"),
            Self::Ifc4 => write!(f, "IFC4"),
            Self::Ifc4x3 => write!(f, "IFC4X3"),
        }
    }
}

/// Single-inheritance type tree, keyed case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct TypeHierarchy {
    parents: HashMap<String, String>,
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}

impl TypeHierarchy {
    /// Empty hierarchy; every type is its own only ancestor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `child` as a direct subtype of `parent`.
    pub fn declare(&mut self, child: &str, parent: &str) -> &mut Self {
        self.parents.insert(normalize(child), normalize(parent));
        self
    }

    /// The common product types of a schema version.
    #[must_use]
    pub fn for_schema(schema: SchemaVersion) -> Self {
        let built = match schema {
            SchemaVersion::Ifc4x3 => "IfcBuiltElement",
            SchemaVersion::Ifc2x3 | SchemaVersion::Ifc4 => "IfcBuildingElement",
        };
        let mut h = Self::new();
        h.declare("IfcObjectDefinition", "IfcRoot")
            .declare("IfcObject", "IfcObjectDefinition")
            .declare("IfcTypeObject", "IfcObjectDefinition")
            .declare("IfcProduct", "IfcObject")
            .declare("IfcGroup", "IfcObject")
            .declare("IfcElement", "IfcProduct")
            .declare(built, "IfcElement")
            .declare("IfcWall", built)
            .declare("IfcSlab", built)
            .declare("IfcBeam", built)
            .declare("IfcColumn", built)
            .declare("IfcDoor", built)
            .declare("IfcWindow", built)
            .declare("IfcRoof", built)
            .declare("IfcStair", built)
            .declare("IfcFeatureElement", "IfcElement")
            .declare("IfcFeatureElementSubtraction", "IfcFeatureElement")
            .declare("IfcOpeningElement", "IfcFeatureElementSubtraction")
            .declare("IfcTypeProduct", "IfcTypeObject")
            .declare("IfcElementType", "IfcTypeProduct")
            .declare("IfcWallType", "IfcElementType")
            .declare("IfcDoorType", "IfcElementType")
            .declare("IfcSlabType", "IfcElementType");
        match schema {
            SchemaVersion::Ifc2x3 => {
                h.declare("IfcSpatialStructureElement", "IfcProduct")
                    .declare("IfcWallStandardCase", "IfcWall");
            }
            SchemaVersion::Ifc4 => {
                h.declare("IfcSpatialElement", "IfcProduct")
                    .declare("IfcSpatialStructureElement", "IfcSpatialElement")
                    .declare("IfcWallStandardCase", "IfcWall");
            }
            SchemaVersion::Ifc4x3 => {
                h.declare("IfcSpatialElement", "IfcProduct")
                    .declare("IfcSpatialStructureElement", "IfcSpatialElement")
                    .declare("IfcFacility", "IfcSpatialStructureElement")
                    .declare("IfcFacilityPart", "IfcSpatialStructureElement");
            }
        }
        h.declare("IfcSite", "IfcSpatialStructureElement")
            .declare("IfcBuilding", "IfcSpatialStructureElement")
            .declare("IfcBuildingStorey", "IfcSpatialStructureElement")
            .declare("IfcSpace", "IfcSpatialStructureElement");
        h
    }

    /// True if `type_name` is `ancestor` or inherits from it.
    #[must_use]
    pub fn is_subtype_of(&self, type_name: &str, ancestor: &str) -> bool {
        let target = normalize(ancestor);
        let mut current = normalize(type_name);
        // The tree is acyclic when built through `declare`, but bound the walk anyway.
        for _ in 0..64 {
            if current == target {
                return true;
            }
            match self.parents.get(&current) {
                Some(parent) => current.clone_from(parent),
                None => return false,
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtype_walks_up_the_tree() {
        let h = TypeHierarchy::for_schema(SchemaVersion::Ifc4);
        assert!(h.is_subtype_of("IfcWallStandardCase", "IfcWall"));
        assert!(h.is_subtype_of("IFCWALL", "IfcBuildingElement"));
        assert!(h.is_subtype_of("IfcWall", "IfcWall"));
        assert!(!h.is_subtype_of("IfcWall", "IfcWallStandardCase"));
        assert!(!h.is_subtype_of("IfcSpace", "IfcElement"));
    }

    #[test]
    fn ifc4x3_uses_built_element() {
        let h = TypeHierarchy::for_schema(SchemaVersion::Ifc4x3);
        assert!(h.is_subtype_of("IfcWall", "IfcBuiltElement"));
        assert!(!h.is_subtype_of("IfcWall", "IfcBuildingElement"));
    }

    #[test]
    fn unknown_types_only_match_themselves() {
        let h = TypeHierarchy::new();
        assert!(h.is_subtype_of("IfcProxy", "ifcproxy"));
        assert!(!h.is_subtype_of("IfcProxy", "IfcProduct"));
    }

    #[test]
    fn schema_display() {
        assert_eq!(SchemaVersion::Ifc2x3.to_string(), "IFC2X3");
        assert_eq!(
            serde_json::to_string(&SchemaVersion::Ifc4x3).unwrap(),
            "\"IFC4X3\""
        );
    }
}
