//! Relation path resolution.
//!
//! Walks a dotted path (`post.writer.email`) through the relationship graph
//! one hop at a time, turning each hop into an aliased join. Aliases are built
//! as `<currentAlias>_<targetTable>`, so the same table reached through two
//! different paths gets two different aliases, and the same path reached
//! twice reuses one.

use std::fmt;

use serde::Serialize;

use crate::error::{QueryError, QueryResult};
use crate::schema::graph::{RelationKind, RelationshipGraph};
use crate::schema::resource::RelationPath;
use crate::sql::{table_col, Expr, ExprExt};

/// What the resolved path will be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathUsage {
    /// Joined into the main query (sorting). Every hop must be many-to-one.
    Join,
    /// Inside an EXISTS subquery (relation filters). Only the last hop may be
    /// one-to-many.
    Exists,
}

/// A column qualified by a table alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: &str, column: &str) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn to_expr(&self) -> Expr {
        table_col(&self.table, &self.column)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// One aliased hop: `INNER JOIN <table> AS <alias> ON <left> = <right>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinSpec {
    pub relation: String,
    pub kind: RelationKind,
    pub table: String,
    pub alias: String,
    /// Column on the table being joined from.
    pub left: ColumnRef,
    /// Column on the joined table.
    pub right: ColumnRef,
}

impl JoinSpec {
    pub fn on_expr(&self) -> Expr {
        self.left.to_expr().eq(self.right.to_expr())
    }
}

/// Ordered set of joins, unique by alias.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct JoinSet {
    joins: Vec<JoinSpec>,
}

impl JoinSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the same join is already present under its alias.
    /// Returns whether the join was new.
    ///
    /// An alias already bound to different ON columns is a configuration
    /// error: sharing it would silently read the other relation's row.
    pub fn insert(&mut self, join: JoinSpec) -> QueryResult<bool> {
        match self.joins.iter().find(|j| j.alias == join.alias) {
            None => {
                self.joins.push(join);
                Ok(true)
            }
            Some(existing) if existing.left == join.left && existing.right == join.right => {
                Ok(false)
            }
            Some(existing) => Err(QueryError::configuration(format!(
                "join alias `{}` is claimed by both `{}` ({} = {}) and `{}` ({} = {})",
                join.alias,
                existing.relation,
                existing.left,
                existing.right,
                join.relation,
                join.left,
                join.right
            ))),
        }
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.joins.iter().any(|j| j.alias == alias)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, JoinSpec> {
        self.joins.iter()
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    pub fn into_vec(self) -> Vec<JoinSpec> {
        self.joins
    }
}

impl<'a> IntoIterator for &'a JoinSet {
    type Item = &'a JoinSpec;
    type IntoIter = std::slice::Iter<'a, JoinSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.joins.iter()
    }
}

/// Result of walking a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub final_alias: String,
    pub final_column: String,
    /// Joins this call added to the set, in hop order.
    pub joins_introduced: Vec<JoinSpec>,
}

impl ResolvedPath {
    pub fn column(&self) -> ColumnRef {
        ColumnRef::new(&self.final_alias, &self.final_column)
    }
}

/// Walk `path` from `base_type`, adding any missing joins to `joins`.
///
/// The base table is addressed by its table name. Fails with a configuration
/// error when a hop is undeclared or crosses a one-to-many edge where `usage`
/// forbids it.
pub fn resolve(
    graph: &RelationshipGraph,
    base_type: &str,
    path: &RelationPath,
    usage: PathUsage,
    joins: &mut JoinSet,
) -> QueryResult<ResolvedPath> {
    let base = graph.node(base_type).ok_or_else(|| {
        QueryError::configuration(format!("resource type `{base_type}` is not in the graph"))
    })?;

    let mut current_type = base.resource_type.as_str();
    let mut current_alias = base.table.clone();
    let mut introduced = Vec::new();
    let last_hop = path.relations.len().saturating_sub(1);

    for (hop, name) in path.relations.iter().enumerate() {
        let relation = graph.relation(current_type, name).ok_or_else(|| {
            QueryError::configuration(format!(
                "path `{path}` names unknown relation `{current_type}.{name}`"
            ))
        })?;

        if relation.edge.kind.causes_fanout() {
            let allowed = usage == PathUsage::Exists && hop == last_hop;
            if !allowed {
                return Err(QueryError::configuration(format!(
                    "path `{path}` crosses one-to-many relation `{current_type}.{name}`"
                )));
            }
        }

        let alias = format!("{current_alias}_{}", relation.target.table);
        let (left, right) = relation.edge.join_columns();
        let join = JoinSpec {
            relation: name.clone(),
            kind: relation.edge.kind,
            table: relation.target.table.clone(),
            alias: alias.clone(),
            left: ColumnRef::new(&current_alias, left),
            right: ColumnRef::new(&alias, right),
        };
        if joins.insert(join.clone())? {
            introduced.push(join);
        }

        current_type = &relation.target.resource_type;
        current_alias = alias;
    }

    Ok(ResolvedPath {
        final_alias: current_alias,
        final_column: path.column.clone(),
        joins_introduced: introduced,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::schema::builtin;

    fn path(declared: &str) -> RelationPath {
        RelationPath::parse(declared).unwrap()
    }

    #[test]
    fn test_single_many_to_one_hop() {
        let registry = builtin::registry().unwrap();
        let mut joins = JoinSet::new();
        let resolved = resolve(
            registry.graph(),
            "posts",
            &path("writer.name"),
            PathUsage::Join,
            &mut joins,
        )
        .unwrap();

        assert_eq!(resolved.column(), ColumnRef::new("posts_users", "name"));
        assert_eq!(resolved.joins_introduced.len(), 1);
        let join = &resolved.joins_introduced[0];
        assert_eq!(join.table, "users");
        assert_eq!(join.left, ColumnRef::new("posts", "writer_id"));
        assert_eq!(join.right, ColumnRef::new("posts_users", "id"));
    }

    #[test]
    fn test_two_hops_and_dedup_by_alias() {
        let registry = builtin::registry().unwrap();
        let mut joins = JoinSet::new();

        let first = resolve(
            registry.graph(),
            "comments",
            &path("post.writer.name"),
            PathUsage::Join,
            &mut joins,
        )
        .unwrap();
        assert_eq!(first.final_alias, "comments_posts_users");
        assert_eq!(first.joins_introduced.len(), 2);

        // Same prefix: nothing new.
        let second = resolve(
            registry.graph(),
            "comments",
            &path("post.writer.email"),
            PathUsage::Join,
            &mut joins,
        )
        .unwrap();
        assert!(second.joins_introduced.is_empty());

        // Same physical table through another relation: separate alias.
        let third = resolve(
            registry.graph(),
            "comments",
            &path("writer.name"),
            PathUsage::Join,
            &mut joins,
        )
        .unwrap();
        assert_eq!(third.final_alias, "comments_users");
        assert_eq!(joins.len(), 3);
    }

    #[test]
    fn test_one_to_many_rejected_for_join() {
        let registry = builtin::registry().unwrap();
        let err = resolve(
            registry.graph(),
            "users",
            &path("posts.title"),
            PathUsage::Join,
            &mut JoinSet::new(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_one_to_many_allowed_as_last_exists_hop() {
        let registry = builtin::registry().unwrap();
        let resolved = resolve(
            registry.graph(),
            "users",
            &path("posts.title"),
            PathUsage::Exists,
            &mut JoinSet::new(),
        )
        .unwrap();
        let join = &resolved.joins_introduced[0];
        assert_eq!(join.left, ColumnRef::new("users", "id"));
        assert_eq!(join.right, ColumnRef::new("users_posts", "writer_id"));
    }

    #[test]
    fn test_one_to_many_rejected_before_last_exists_hop() {
        let registry = builtin::registry().unwrap();
        let err = resolve(
            registry.graph(),
            "users",
            &path("posts.writer.name"),
            PathUsage::Exists,
            &mut JoinSet::new(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("one-to-many"));
    }

    #[test]
    fn test_alias_clash_is_rejected() {
        let join = |relation: &str, fk: &str| JoinSpec {
            relation: relation.into(),
            kind: RelationKind::ManyToOne,
            table: "users".into(),
            alias: "posts_users".into(),
            left: ColumnRef::new("posts", fk),
            right: ColumnRef::new("posts_users", "id"),
        };
        let mut joins = JoinSet::new();

        assert!(joins.insert(join("writer", "writer_id")).unwrap());
        assert!(!joins.insert(join("writer", "writer_id")).unwrap());

        let err = joins.insert(join("editor", "editor_id")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("posts_users"));
        assert_eq!(joins.len(), 1);
    }

    #[test]
    fn test_unknown_relation() {
        let registry = builtin::registry().unwrap();
        let err = resolve(
            registry.graph(),
            "posts",
            &path("author.name"),
            PathUsage::Join,
            &mut JoinSet::new(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
