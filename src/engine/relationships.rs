//! Relationship loading.
//!
//! Every eager load in a plan costs exactly one query, whatever the page
//! size: the parent values of the whole page go into a single `IN` list and
//! the results are matched back in memory.

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::QueryResult;
use crate::plan::{CompiledQueryPlan, EagerLoad};
use crate::schema::RelationKind;
use crate::sql::{lit_int, lit_str, table_col, Dialect, Expr, ExprExt, OrderByExpr, Query, TableRef};
use crate::store::{ReadSession, Record, RelationData, ResourceRow};

/// Shape page records into rows and attach every eager-loaded relationship.
pub fn attach<S: ReadSession>(
    session: &mut S,
    plan: &CompiledQueryPlan,
    dialect: Dialect,
    records: Vec<Record>,
) -> QueryResult<Vec<ResourceRow>> {
    let mut rows: Vec<ResourceRow> = records.iter().map(|record| shape(plan, record)).collect();

    for load in &plan.eager_loads {
        let parents = parent_values(&records, &load.parent_column);
        let related = if parents.is_empty() {
            Vec::new()
        } else {
            let sql = load_query(load, parents).to_sql(dialect);
            debug!(relation = %load.relation, %sql, "eager load");
            session.fetch(&sql)?
        };

        match load.kind {
            RelationKind::ManyToOne => {
                let by_match: HashMap<String, Value> = related
                    .iter()
                    .map(|r| (key(field(r, &load.match_column)), field(r, &load.key_column).clone()))
                    .collect();
                for (row, record) in rows.iter_mut().zip(&records) {
                    let parent = field(record, &load.parent_column);
                    let target = (!parent.is_null())
                        .then(|| by_match.get(&key(parent)).cloned())
                        .flatten();
                    row.relationships
                        .insert(load.relation.clone(), RelationData::ToOne(target));
                }
            }
            RelationKind::OneToMany => {
                let mut by_parent: HashMap<String, Vec<Value>> = HashMap::new();
                for r in &related {
                    by_parent
                        .entry(key(field(r, &load.match_column)))
                        .or_default()
                        .push(field(r, &load.key_column).clone());
                }
                for (row, record) in rows.iter_mut().zip(&records) {
                    let children = by_parent
                        .get(&key(field(record, &load.parent_column)))
                        .cloned()
                        .unwrap_or_default();
                    row.relationships
                        .insert(load.relation.clone(), RelationData::ToMany(children));
                }
            }
        }
    }

    Ok(rows)
}

fn shape(plan: &CompiledQueryPlan, record: &Record) -> ResourceRow {
    let attributes: Map<String, Value> = plan
        .attributes
        .iter()
        .map(|a| (a.token.clone(), field(record, &a.column).clone()))
        .collect();
    ResourceRow {
        id: field(record, &plan.primary_key).clone(),
        attributes,
        relationships: BTreeMap::new(),
    }
}

/// `SELECT key[, match] FROM table WHERE match IN (...)`, ordered by key for
/// one-to-many loads so children come back in a stable order.
fn load_query(load: &EagerLoad, parents: Vec<Expr>) -> Query {
    let key_col = table_col(&load.table, &load.key_column);
    let match_col = table_col(&load.table, &load.match_column);

    let mut select = vec![key_col.clone()];
    if load.match_column != load.key_column {
        select.push(match_col.clone());
    }

    let query = Query::new()
        .select(select)
        .from(TableRef::new(&load.table))
        .filter(match_col.in_list(parents));
    match load.kind {
        RelationKind::ManyToOne => query,
        RelationKind::OneToMany => query.order_by(vec![OrderByExpr::asc(key_col)]),
    }
}

/// Distinct non-null values of `column`, in first-seen order.
fn parent_values(records: &[Record], column: &str) -> Vec<Expr> {
    let mut seen = Vec::new();
    let mut values = Vec::new();
    for record in records {
        let value = field(record, column);
        if value.is_null() {
            continue;
        }
        let k = key(value);
        if seen.contains(&k) {
            continue;
        }
        seen.push(k);
        values.push(match value {
            Value::Number(n) => n.as_i64().map_or_else(|| lit_str(&n.to_string()), lit_int),
            Value::String(s) => lit_str(s),
            other => lit_str(&other.to_string()),
        });
    }
    values
}

fn field<'r>(record: &'r Record, column: &str) -> &'r Value {
    record.get(column).unwrap_or(&Value::Null)
}

/// Values keyed by their JSON text, so `1` and `"1"` stay distinct.
fn key(value: &Value) -> String {
    value.to_string()
}
