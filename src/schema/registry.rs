//! SchemaRegistry - the allow-lists of every resource type plus the graph
//! they are checked against.
//!
//! Built once at startup and read-only afterwards. [`SchemaRegistryBuilder::build`]
//! refuses to produce a registry whose declarations disagree with the graph,
//! so authoring mistakes surface before the first request.

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::graph::{RelationDecl, RelationshipGraph, ResourceNode};
use super::resource::{FieldTarget, ResourceSchema};
use crate::error::{QueryError, QueryResult};
use crate::resolve::{resolve, JoinSet, PathUsage};

/// Immutable registry of resource schemas, indexed by type.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    resources: BTreeMap<String, ResourceSchema>,
    graph: RelationshipGraph,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    /// Look up a resource type.
    pub fn get(&self, resource_type: &str) -> QueryResult<&ResourceSchema> {
        self.resources
            .get(resource_type)
            .ok_or_else(|| QueryError::UnknownResourceType(resource_type.to_string()))
    }

    pub fn graph(&self) -> &RelationshipGraph {
        &self.graph
    }

    /// Declared types in sorted order.
    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn schemas(&self) -> impl Iterator<Item = &ResourceSchema> {
        self.resources.values()
    }
}

/// Collects schemas and relations, then validates them together.
#[derive(Debug, Clone, Default)]
#[must_use = "builders have no effect until build() is called"]
pub struct SchemaRegistryBuilder {
    resources: Vec<ResourceSchema>,
    relations: Vec<RelationDecl>,
}

impl SchemaRegistryBuilder {
    pub fn resource(mut self, schema: ResourceSchema) -> Self {
        self.resources.push(schema);
        self
    }

    pub fn relation(mut self, decl: RelationDecl) -> Self {
        self.relations.push(decl);
        self
    }

    /// Build the graph and check every schema against it.
    pub fn build(self) -> QueryResult<SchemaRegistry> {
        let mut graph = RelationshipGraph::new();
        let mut resources = BTreeMap::new();

        for schema in self.resources {
            graph.add_resource(ResourceNode {
                resource_type: schema.resource_type.clone(),
                table: schema.table.clone(),
                primary_key: schema.primary_key.clone(),
            })?;
            resources.insert(schema.resource_type.clone(), schema);
        }

        let relation_count = self.relations.len();
        for decl in self.relations {
            graph.add_relation(decl)?;
        }

        for resource_type in resources.keys() {
            check_join_aliases(&graph, resource_type)?;
        }

        for schema in resources.values() {
            validate_schema(&graph, schema)?;
            debug!(resource_type = %schema.resource_type, "schema validated");
        }

        info!(
            resources = resources.len(),
            relations = relation_count,
            "schema registry validated"
        );

        Ok(SchemaRegistry { resources, graph })
    }
}

/// Join aliases are `<alias>_<target table>`, so two relations leaving one
/// type must not land on the same table.
fn check_join_aliases(graph: &RelationshipGraph, resource_type: &str) -> QueryResult<()> {
    let mut by_table: BTreeMap<&str, &str> = BTreeMap::new();
    let mut relations = graph.relations_of(resource_type);
    relations.sort_by(|a, b| a.edge.name.cmp(&b.edge.name));

    for relation in relations {
        let table = relation.target.table.as_str();
        if let Some(first) = by_table.insert(table, &relation.edge.name) {
            return Err(QueryError::configuration(format!(
                "relations `{resource_type}.{first}` and `{resource_type}.{}` both join table `{table}`",
                relation.edge.name
            )));
        }
    }
    Ok(())
}

fn validate_schema(graph: &RelationshipGraph, schema: &ResourceSchema) -> QueryResult<()> {
    let resource_type = schema.resource_type.as_str();

    for (token, relation) in &schema.relation_fields {
        if graph.relation(resource_type, relation).is_none() {
            return Err(QueryError::configuration(format!(
                "relationship field `{resource_type}.{token}` names no declared relation"
            )));
        }
    }

    for (token, target) in &schema.sortable {
        if let FieldTarget::Path { path } = target {
            resolve(graph, resource_type, path, PathUsage::Join, &mut JoinSet::new()).map_err(
                |err| QueryError::configuration(format!("sortable `{resource_type}.{token}`: {err}")),
            )?;
        }
    }

    for (token, rule) in &schema.filterable {
        if rule.operators.is_empty() {
            return Err(QueryError::configuration(format!(
                "filterable `{resource_type}.{token}` allows no operators"
            )));
        }
        if let FieldTarget::Path { path } = &rule.target {
            resolve(graph, resource_type, path, PathUsage::Exists, &mut JoinSet::new()).map_err(
                |err| {
                    QueryError::configuration(format!("filterable `{resource_type}.{token}`: {err}"))
                },
            )?;
        }
    }

    Ok(())
}
