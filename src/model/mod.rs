//! Entity graph collaborator contract.
//!
//! Model loading is not part of the engine. The engine consumes any
//! [`EntityGraph`] implementation with read-only access; [`InMemoryGraph`] is
//! provided for embedding and tests.

mod entity;
mod graph;
mod schema;

pub use entity::{
    ClassificationReference, Entity, EntityLabel, GraphId, MaterialAssignment, PartOfLink,
    PartOfRelation, Property, PropertySet,
};
pub use graph::{EntityGraph, InMemoryGraph};
pub use schema::{SchemaVersion, TypeHierarchy};
