//! Schema registry.
//!
//! - [`resource`] - per-type allow-lists ([`ResourceSchema`])
//! - [`graph`] - typed relationship graph ([`RelationshipGraph`])
//! - [`registry`] - validated registry of every type ([`SchemaRegistry`])
//! - [`builtin`] - the users / posts / comments declarations

pub mod builtin;
pub mod graph;
pub mod registry;
pub mod resource;

pub use graph::{Relation, RelationDecl, RelationEdge, RelationKind, RelationshipGraph, ResourceNode};
pub use registry::{SchemaRegistry, SchemaRegistryBuilder};
pub use resource::{
    FieldTarget, FilterRule, ParameterStyle, RelationPath, ResourceSchema, ResourceSchemaBuilder,
};
