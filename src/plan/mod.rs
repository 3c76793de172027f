//! Compiled query plans.
//!
//! A [`CompiledQueryPlan`] is the fully-resolved form of one request: what to
//! project, which joins the sort keys need, the predicate list, which
//! relations to eager-load and which page to fetch. It is built per request,
//! rendered to SQL, executed once and dropped.
//!
//! - [`compiler`] - validated request -> plan
//! - [`coerce`] - list, date and LIKE value handling
//! - [`lower`] - predicate tree -> SQL expression

pub mod coerce;
pub mod compiler;
pub mod lower;

pub use compiler::compile;

use chrono::NaiveDate;
use serde::Serialize;

use crate::operator::ComparisonOp;
use crate::pagination::PageRequest;
use crate::params::SortDirection;
use crate::resolve::{ColumnRef, JoinSpec};
use crate::schema::RelationKind;
use crate::sql::{count_star, table_star, Dialect, OrderByExpr, Query, TableRef};

/// Columns selected from the base table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    /// `<table>.*`
    All,
    /// Primary key first, then the requested columns.
    Columns(Vec<ColumnRef>),
}

/// An attribute of the output rows and the column it is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeColumn {
    pub token: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderKey {
    pub column: ColumnRef,
    pub direction: SortDirection,
}

/// Predicate tree. Top-level predicates of a plan AND together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    And(Vec<Predicate>),
    /// Never produced from request parameters; for callers composing plans.
    Or(Vec<Predicate>),
    Compare {
        column: ColumnRef,
        op: ComparisonOp,
        value: String,
    },
    /// `pattern` is final: already escaped and wrapped.
    Like {
        column: ColumnRef,
        pattern: String,
        negated: bool,
    },
    IsNull {
        column: ColumnRef,
        negated: bool,
    },
    Between {
        column: ColumnRef,
        low: String,
        high: String,
        negated: bool,
    },
    InList {
        column: ColumnRef,
        values: Vec<String>,
        negated: bool,
    },
    /// Compares the date portion of `column`.
    DateCompare {
        column: ColumnRef,
        op: ComparisonOp,
        date: NaiveDate,
    },
    /// Holds when some related row reached through `hops` satisfies
    /// `condition`. The first hop correlates with the outer query.
    Exists {
        hops: Vec<JoinSpec>,
        condition: Box<Predicate>,
    },
}

/// A relation to load after the page query, with one query per relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EagerLoad {
    /// Relationship token in the output.
    pub relation: String,
    pub kind: RelationKind,
    pub table: String,
    /// Identifier returned for each related row.
    pub key_column: String,
    /// Related column matched against the parent values.
    pub match_column: String,
    /// Base-row column holding the parent values.
    pub parent_column: String,
}

/// Everything needed to run one collection request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledQueryPlan {
    pub resource_type: String,
    pub table: String,
    pub primary_key: String,
    pub projection: Projection,
    pub attributes: Vec<AttributeColumn>,
    pub joins: Vec<JoinSpec>,
    pub order_by: Vec<OrderKey>,
    pub predicates: Vec<Predicate>,
    pub eager_loads: Vec<EagerLoad>,
    pub page: PageRequest,
}

impl CompiledQueryPlan {
    /// FROM, joins and WHERE shared by the row and count queries.
    fn scoped(&self, select: Vec<crate::sql::Expr>) -> Query {
        let mut query = Query::new()
            .select(select)
            .from(TableRef::new(&self.table));
        for join in &self.joins {
            query = query.inner_join(
                TableRef::new(&join.table).with_alias(&join.alias),
                join.on_expr(),
            );
        }
        for predicate in &self.predicates {
            query = query.filter(lower::lower(predicate));
        }
        query
    }

    /// The row query without LIMIT/OFFSET.
    pub fn unpaged_query(&self) -> Query {
        let select = match &self.projection {
            Projection::All => vec![table_star(&self.table)],
            Projection::Columns(columns) => columns.iter().map(ColumnRef::to_expr).collect(),
        };
        self.scoped(select).order_by(
            self.order_by
                .iter()
                .map(|key| match key.direction {
                    SortDirection::Ascending => OrderByExpr::asc(key.column.to_expr()),
                    SortDirection::Descending => OrderByExpr::desc(key.column.to_expr()),
                })
                .collect(),
        )
    }

    /// The row query for the requested page.
    pub fn to_query(&self) -> Query {
        self.unpaged_query()
            .limit(self.page.limit())
            .offset(self.page.offset())
    }

    /// `COUNT(*)` over the filtered, unpaged result.
    pub fn count_query(&self) -> Query {
        self.scoped(vec![count_star()])
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_query().to_sql(dialect)
    }

    pub fn count_sql(&self, dialect: Dialect) -> String {
        self.count_query().to_sql(dialect)
    }
}
