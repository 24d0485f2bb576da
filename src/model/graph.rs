//! Read-only graph access trait and the in-memory implementation.

use std::collections::BTreeMap;

use crate::error::{EngineError, EngineResult};

use super::entity::{Entity, EntityLabel, GraphId};
use super::schema::{SchemaVersion, TypeHierarchy};

/// Read access to one loaded entity graph.
///
/// Implementations must be safe for concurrent reads; the engine never
/// mutates a graph.
pub trait EntityGraph: Send + Sync {
    /// Identity of this graph instance.
    fn id(&self) -> GraphId;

    /// Schema the graph was authored in.
    fn schema(&self) -> SchemaVersion;

    /// All entities in ascending label order.
    fn entities(&self) -> Box<dyn Iterator<Item = &Entity> + '_>;

    /// Looks up an entity by label.
    fn entity(&self, label: EntityLabel) -> Option<&Entity>;

    /// True if `type_name` equals `ancestor` or is one of its subtypes.
    fn is_subtype_of(&self, type_name: &str, ancestor: &str) -> bool;

    /// Looks up an entity by its external stable identifier.
    fn find_by_global_id(&self, global_id: &str) -> Option<&Entity> {
        self.entities()
            .find(|e| e.global_id.as_deref() == Some(global_id))
    }

    /// The type object an occurrence is typed by, if any.
    fn type_object(&self, entity: &Entity) -> Option<&Entity> {
        entity.type_object.and_then(|label| self.entity(label))
    }
}

/// Entity graph held entirely in memory.
#[derive(Debug, Clone)]
pub struct InMemoryGraph {
    id: GraphId,
    schema: SchemaVersion,
    hierarchy: TypeHierarchy,
    entities: BTreeMap<EntityLabel, Entity>,
}

impl InMemoryGraph {
    /// Creates an empty graph using the schema's standard type hierarchy.
    #[must_use]
    pub fn new(schema: SchemaVersion) -> Self {
        Self {
            id: GraphId::new(),
            schema,
            hierarchy: TypeHierarchy::for_schema(schema),
            entities: BTreeMap::new(),
        }
    }

    /// Replaces the type hierarchy.
    #[must_use]
    pub fn with_hierarchy(mut self, hierarchy: TypeHierarchy) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    /// Inserts an entity, stamping it with this graph's identity.
    pub fn insert(&mut self, mut entity: Entity) -> EngineResult<EntityLabel> {
        let label = entity.label;
        if self.entities.contains_key(&label) {
            return Err(EngineError::DuplicateLabel {
                graph: self.id,
                label,
            });
        }
        entity.graph = self.id;
        self.entities.insert(label, entity);
        Ok(label)
    }

    /// Builds a graph from a list of entities.
    pub fn from_entities(
        schema: SchemaVersion,
        entities: impl IntoIterator<Item = Entity>,
    ) -> EngineResult<Self> {
        let mut graph = Self::new(schema);
        for entity in entities {
            graph.insert(entity)?;
        }
        Ok(graph)
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the graph has no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl EntityGraph for InMemoryGraph {
    fn id(&self) -> GraphId {
        self.id
    }

    fn schema(&self) -> SchemaVersion {
        self.schema
    }

    fn entities(&self) -> Box<dyn Iterator<Item = &Entity> + '_> {
        Box::new(self.entities.values())
    }

    fn entity(&self, label: EntityLabel) -> Option<&Entity> {
        self.entities.get(&label)
    }

    fn is_subtype_of(&self, type_name: &str, ancestor: &str) -> bool {
        self.hierarchy.is_subtype_of(type_name, ancestor)
    }
}
