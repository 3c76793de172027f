//! RelationshipGraph - resource types as nodes, named relations as edges.
//!
//! Path resolution walks this graph one hop at a time. Edges are directed:
//! `posts --writer--> users` and `users --posts--> posts` are two separate
//! declarations with opposite kinds.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;

use crate::error::{QueryError, QueryResult};

/// Cardinality of a relation, seen from its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Each source row points at one target row (belongs-to).
    ManyToOne,
    /// Each source row owns many target rows (has-many).
    OneToMany,
}

impl RelationKind {
    /// Does joining along this relation multiply source rows?
    pub fn causes_fanout(self) -> bool {
        matches!(self, RelationKind::OneToMany)
    }
}

/// A resource type in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNode {
    pub resource_type: String,
    pub table: String,
    pub primary_key: String,
}

/// A named relation.
///
/// For `ManyToOne` the foreign key lives on the source table and the local key
/// is the target's key. For `OneToMany` the local key lives on the source and
/// the foreign key on the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationEdge {
    pub name: String,
    pub kind: RelationKind,
    pub foreign_key_column: String,
    pub local_key_column: String,
}

impl RelationEdge {
    /// `(source column, target column)` equated when following this edge.
    pub fn join_columns(&self) -> (&str, &str) {
        match self.kind {
            RelationKind::ManyToOne => (&self.foreign_key_column, &self.local_key_column),
            RelationKind::OneToMany => (&self.local_key_column, &self.foreign_key_column),
        }
    }
}

/// A relation looked up from a source type: both endpoints plus the edge.
#[derive(Debug, Clone, Copy)]
pub struct Relation<'g> {
    pub source: &'g ResourceNode,
    pub target: &'g ResourceNode,
    pub edge: &'g RelationEdge,
}

/// Declaration of a relation, resolved into a [`RelationEdge`] when added.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "builders have no effect until used"]
pub struct RelationDecl {
    pub source: String,
    pub name: String,
    pub target: String,
    pub kind: RelationKind,
    pub foreign_key: String,
    pub local_key: Option<String>,
}

impl RelationDecl {
    /// `source.<foreign_key>` references `target.<key>`.
    pub fn many_to_one(source: &str, name: &str, target: &str, foreign_key: &str) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
            target: target.into(),
            kind: RelationKind::ManyToOne,
            foreign_key: foreign_key.into(),
            local_key: None,
        }
    }

    /// `target.<foreign_key>` references `source.<key>`.
    pub fn one_to_many(source: &str, name: &str, target: &str, foreign_key: &str) -> Self {
        Self {
            source: source.into(),
            name: name.into(),
            target: target.into(),
            kind: RelationKind::OneToMany,
            foreign_key: foreign_key.into(),
            local_key: None,
        }
    }

    /// Override the referenced key (defaults to the relevant primary key).
    pub fn local_key(mut self, column: &str) -> Self {
        self.local_key = Some(column.into());
        self
    }
}

/// Graph of resource types and the relations between them.
#[derive(Debug, Clone, Default)]
pub struct RelationshipGraph {
    graph: DiGraph<ResourceNode, RelationEdge>,
    node_indices: HashMap<String, NodeIndex>,
}

impl RelationshipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource type. Each type may be added once.
    pub fn add_resource(&mut self, node: ResourceNode) -> QueryResult<()> {
        if self.node_indices.contains_key(&node.resource_type) {
            return Err(QueryError::configuration(format!(
                "resource type `{}` is declared twice",
                node.resource_type
            )));
        }
        let name = node.resource_type.clone();
        let idx = self.graph.add_node(node);
        self.node_indices.insert(name, idx);
        Ok(())
    }

    /// Add a relation between two declared types.
    pub fn add_relation(&mut self, decl: RelationDecl) -> QueryResult<()> {
        let source_idx = self.index_of(&decl.source)?;
        let target_idx = self.index_of(&decl.target)?;

        if self.relation(&decl.source, &decl.name).is_some() {
            return Err(QueryError::configuration(format!(
                "relation `{}.{}` is declared twice",
                decl.source, decl.name
            )));
        }

        let local_key = match (decl.local_key, decl.kind) {
            (Some(column), _) => column,
            (None, RelationKind::ManyToOne) => self.graph[target_idx].primary_key.clone(),
            (None, RelationKind::OneToMany) => self.graph[source_idx].primary_key.clone(),
        };

        self.graph.add_edge(
            source_idx,
            target_idx,
            RelationEdge {
                name: decl.name,
                kind: decl.kind,
                foreign_key_column: decl.foreign_key,
                local_key_column: local_key,
            },
        );
        Ok(())
    }

    pub fn node(&self, resource_type: &str) -> Option<&ResourceNode> {
        self.node_indices
            .get(resource_type)
            .map(|idx| &self.graph[*idx])
    }

    /// Find the relation called `name` leaving `source_type`.
    pub fn relation(&self, source_type: &str, name: &str) -> Option<Relation<'_>> {
        let idx = *self.node_indices.get(source_type)?;
        self.graph
            .edges(idx)
            .find(|edge| edge.weight().name == name)
            .map(|edge| Relation {
                source: &self.graph[edge.source()],
                target: &self.graph[edge.target()],
                edge: edge.weight(),
            })
    }

    /// All relations leaving `source_type`, in no particular order.
    pub fn relations_of(&self, source_type: &str) -> Vec<Relation<'_>> {
        let Some(idx) = self.node_indices.get(source_type) else {
            return vec![];
        };
        self.graph
            .edges(*idx)
            .map(|edge| Relation {
                source: &self.graph[edge.source()],
                target: &self.graph[edge.target()],
                edge: edge.weight(),
            })
            .collect()
    }

    /// Follow `relations` hop by hop from `source_type`.
    ///
    /// Returns the relations walked, or `None` if any hop is undeclared.
    pub fn follow(&self, source_type: &str, relations: &[String]) -> Option<Vec<Relation<'_>>> {
        let mut current = source_type;
        let mut walked = Vec::with_capacity(relations.len());
        for name in relations {
            let relation = self.relation(current, name)?;
            current = &relation.target.resource_type;
            walked.push(relation);
        }
        Some(walked)
    }

    fn index_of(&self, resource_type: &str) -> QueryResult<NodeIndex> {
        self.node_indices.get(resource_type).copied().ok_or_else(|| {
            QueryError::configuration(format!(
                "relation references undeclared resource type `{resource_type}`"
            ))
        })
    }
}
