//! Per-resource allow-lists.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::operator::Operator;

/// How `sort` and `filter` are keyed for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterStyle {
    /// `sort=...`, `filter[<field>][<op>]=...`
    #[default]
    Flat,
    /// `sort[<type>]=...`, `filter[<type>][<field>][<op>]=...`
    Namespaced,
}

/// A dotted path through named relations ending in a column,
/// e.g. `post.writer.email`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RelationPath {
    pub relations: Vec<String>,
    pub column: String,
}

impl RelationPath {
    /// Split a dotted declaration. Returns `None` when there is no relation hop.
    pub fn parse(declared: &str) -> Option<Self> {
        let mut segments: Vec<String> = declared.split('.').map(String::from).collect();
        if segments.len() < 2 {
            return None;
        }
        let column = segments.pop()?;
        Some(Self {
            relations: segments,
            column,
        })
    }
}

impl fmt::Display for RelationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for relation in &self.relations {
            write!(f, "{relation}.")?;
        }
        f.write_str(&self.column)
    }
}

/// Where a sortable or filterable token points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldTarget {
    /// A column on the resource's own table.
    Column { column: String },
    /// A column reached through relations.
    Path { path: RelationPath },
}

impl FieldTarget {
    /// `"title"` is a column, `"writer.name"` is a relation path.
    pub fn parse(declared: &str) -> Self {
        match RelationPath::parse(declared) {
            Some(path) => FieldTarget::Path { path },
            None => FieldTarget::Column {
                column: declared.to_string(),
            },
        }
    }
}

/// A filterable token: its target plus the operators it accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterRule {
    pub target: FieldTarget,
    pub operators: BTreeSet<Operator>,
}

impl FilterRule {
    pub fn allows(&self, operator: Operator) -> bool {
        self.operators.contains(&operator)
    }
}

/// Declarative allow-lists for one resource type. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub table: String,
    pub primary_key: String,
    pub style: ParameterStyle,
    /// Requestable attribute token -> column.
    pub fields: BTreeMap<String, String>,
    /// Requestable relationship token -> relation name in the graph.
    pub relation_fields: BTreeMap<String, String>,
    pub sortable: BTreeMap<String, FieldTarget>,
    pub filterable: BTreeMap<String, FilterRule>,
}

impl ResourceSchema {
    pub fn builder(resource_type: &str, table: &str) -> ResourceSchemaBuilder {
        ResourceSchemaBuilder {
            schema: ResourceSchema {
                resource_type: resource_type.into(),
                table: table.into(),
                primary_key: "id".into(),
                style: ParameterStyle::Flat,
                fields: BTreeMap::new(),
                relation_fields: BTreeMap::new(),
                sortable: BTreeMap::new(),
                filterable: BTreeMap::new(),
            },
        }
    }

    pub fn field_column(&self, token: &str) -> Option<&str> {
        self.fields.get(token).map(String::as_str)
    }

    pub fn relation_field(&self, token: &str) -> Option<&str> {
        self.relation_fields.get(token).map(String::as_str)
    }

    pub fn sort_target(&self, token: &str) -> Option<&FieldTarget> {
        self.sortable.get(token)
    }

    pub fn filter_rule(&self, token: &str) -> Option<&FilterRule> {
        self.filterable.get(token)
    }
}

/// Fluent builder for [`ResourceSchema`].
#[derive(Debug, Clone)]
#[must_use = "builders have no effect until build() is called"]
pub struct ResourceSchemaBuilder {
    schema: ResourceSchema,
}

impl ResourceSchemaBuilder {
    pub fn primary_key(mut self, column: &str) -> Self {
        self.schema.primary_key = column.into();
        self
    }

    /// Use `sort[<type>]` / `filter[<type>][...]` parameters.
    pub fn namespaced(mut self) -> Self {
        self.schema.style = ParameterStyle::Namespaced;
        self
    }

    /// Requestable attribute whose token differs from its column.
    pub fn field(mut self, token: &str, column: &str) -> Self {
        self.schema.fields.insert(token.into(), column.into());
        self
    }

    /// Requestable attributes whose tokens are their column names.
    pub fn fields(mut self, columns: &[&str]) -> Self {
        for column in columns {
            self.schema.fields.insert((*column).into(), (*column).into());
        }
        self
    }

    /// Requestable relationship, named after the relation it loads.
    pub fn relation_field(mut self, relation: &str) -> Self {
        self.schema
            .relation_fields
            .insert(relation.into(), relation.into());
        self
    }

    /// Sortable token. A dotted target (`writer.name`) sorts through relations.
    pub fn sortable(mut self, token: &str, target: &str) -> Self {
        self.schema
            .sortable
            .insert(token.into(), FieldTarget::parse(target));
        self
    }

    /// Filterable token with its allowed operators.
    pub fn filterable(mut self, token: &str, target: &str, operators: &[Operator]) -> Self {
        self.schema.filterable.insert(
            token.into(),
            FilterRule {
                target: FieldTarget::parse(target),
                operators: operators.iter().copied().collect(),
            },
        );
        self
    }

    pub fn build(self) -> ResourceSchema {
        self.schema
    }
}
