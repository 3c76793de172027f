//! Query compiler.
//!
//! Merges a [`ValidatedRequest`] into a [`CompiledQueryPlan`]:
//!
//! - projection: primary key first, then requested columns, plus the key
//!   columns each requested relationship needs to be attached later
//! - order: sort keys in request order, relation keys through aliased joins
//! - predicates: own-field comparisons grouped per field, relation filters as
//!   EXISTS subqueries so one-to-many relations never multiply rows

use tracing::debug;

use super::coerce::{like_pattern, parse_date, split_list, split_range};
use super::{AttributeColumn, CompiledQueryPlan, EagerLoad, OrderKey, Predicate, Projection};
use crate::config::PaginationSettings;
use crate::error::{QueryError, QueryResult};
use crate::operator::{ComparisonOp, OperatorSpec};
use crate::pagination::PageRequest;
use crate::resolve::{resolve, ColumnRef, JoinSet, PathUsage};
use crate::schema::{FieldTarget, Relation, RelationKind, RelationshipGraph, ResourceSchema};
use crate::validate::{FieldSelection, ValidatedCondition, ValidatedFilter, ValidatedRequest};

/// Compile a validated request against `schema`.
pub fn compile(
    graph: &RelationshipGraph,
    schema: &ResourceSchema,
    request: ValidatedRequest,
    pagination: &PaginationSettings,
) -> QueryResult<CompiledQueryPlan> {
    let table = schema.table.as_str();
    let base = |column: &str| ColumnRef::new(table, column);

    // Projection and relationships
    let mut attributes = Vec::new();
    let mut eager_loads = Vec::new();
    let projection = match request.fields {
        None => {
            for (token, column) in &schema.fields {
                attributes.push(AttributeColumn {
                    token: token.clone(),
                    column: column.clone(),
                });
            }
            for (token, relation) in &schema.relation_fields {
                let relation = lookup_relation(graph, schema, relation)?;
                eager_loads.push(eager_load(token, &relation));
            }
            Projection::All
        }
        Some(selections) => {
            let mut columns = vec![base(&schema.primary_key)];
            let mut project = |column: ColumnRef| {
                if !columns.contains(&column) {
                    columns.push(column);
                }
            };
            for selection in selections {
                match selection {
                    FieldSelection::Attribute { token, column } => {
                        project(base(&column));
                        attributes.push(AttributeColumn { token, column });
                    }
                    FieldSelection::Relation { token, relation } => {
                        let relation = lookup_relation(graph, schema, &relation)?;
                        let load = eager_load(&token, &relation);
                        project(base(&load.parent_column));
                        eager_loads.push(load);
                    }
                }
            }
            Projection::Columns(columns)
        }
    };

    // Order
    let mut joins = JoinSet::new();
    let mut order_by = Vec::with_capacity(request.sort.len());
    for sort in &request.sort {
        let column = match &sort.target {
            FieldTarget::Column { column } => base(column),
            FieldTarget::Path { path } => {
                resolve(graph, &schema.resource_type, path, PathUsage::Join, &mut joins)?.column()
            }
        };
        order_by.push(OrderKey {
            column,
            direction: sort.direction,
        });
    }

    // Predicates
    let mut predicates = Vec::new();
    for filter in &request.filters {
        match &filter.target {
            FieldTarget::Column { column } => {
                own_field_predicates(filter, base(column), &mut predicates)?;
            }
            FieldTarget::Path { path } => {
                let resolved = resolve(
                    graph,
                    &schema.resource_type,
                    path,
                    PathUsage::Exists,
                    &mut JoinSet::new(),
                )?;
                let column = resolved.column();
                for condition in &filter.conditions {
                    predicates.push(Predicate::Exists {
                        hops: resolved.joins_introduced.clone(),
                        condition: Box::new(leaf(&filter.token, column.clone(), condition)?),
                    });
                }
            }
        }
    }

    let plan = CompiledQueryPlan {
        resource_type: schema.resource_type.clone(),
        table: schema.table.clone(),
        primary_key: schema.primary_key.clone(),
        projection,
        attributes,
        joins: joins.into_vec(),
        order_by,
        predicates,
        eager_loads,
        page: PageRequest::resolve(&request.page, pagination),
    };

    debug!(
        resource_type = %plan.resource_type,
        joins = plan.joins.len(),
        order_keys = plan.order_by.len(),
        predicates = plan.predicates.len(),
        eager_loads = plan.eager_loads.len(),
        page_size = plan.page.size,
        page_number = plan.page.number,
        "compiled query plan"
    );

    Ok(plan)
}

/// Comparisons on one own field share a single AND group, placed after the
/// field's other conditions.
fn own_field_predicates(
    filter: &ValidatedFilter,
    column: ColumnRef,
    predicates: &mut Vec<Predicate>,
) -> QueryResult<()> {
    let mut comparisons = Vec::new();
    for condition in &filter.conditions {
        let predicate = leaf(&filter.token, column.clone(), condition)?;
        if matches!(condition.operator.spec(), OperatorSpec::Comparison(_)) {
            comparisons.push(predicate);
        } else {
            predicates.push(predicate);
        }
    }
    if !comparisons.is_empty() {
        predicates.push(Predicate::And(comparisons));
    }
    Ok(())
}

/// Coerce one condition's value and build its predicate.
fn leaf(field: &str, column: ColumnRef, condition: &ValidatedCondition) -> QueryResult<Predicate> {
    let bad_format = || QueryError::FilterFormat {
        field: field.to_string(),
        operator: condition.operator.token().to_string(),
    };
    let value = condition.value.as_str();

    Ok(match condition.operator.spec() {
        OperatorSpec::Comparison(ComparisonOp::Like) => Predicate::Like {
            column,
            pattern: like_pattern(value),
            negated: false,
        },
        OperatorSpec::Comparison(ComparisonOp::NotLike) => Predicate::Like {
            column,
            pattern: like_pattern(value),
            negated: true,
        },
        OperatorSpec::Comparison(op) => Predicate::Compare {
            column,
            op,
            value: value.to_string(),
        },
        OperatorSpec::NullCheck { is_null } => Predicate::IsNull {
            column,
            negated: !is_null,
        },
        OperatorSpec::Range { negated } => {
            let (low, high) = split_range(value).ok_or_else(bad_format)?;
            Predicate::Between {
                column,
                low,
                high,
                negated,
            }
        }
        OperatorSpec::ListMembership { negated } => Predicate::InList {
            column,
            values: split_list(value).ok_or_else(bad_format)?,
            negated,
        },
        OperatorSpec::DateComparison(op) => Predicate::DateCompare {
            column,
            op,
            date: parse_date(value).ok_or_else(bad_format)?,
        },
    })
}

fn lookup_relation<'g>(
    graph: &'g RelationshipGraph,
    schema: &ResourceSchema,
    name: &str,
) -> QueryResult<Relation<'g>> {
    graph.relation(&schema.resource_type, name).ok_or_else(|| {
        QueryError::configuration(format!(
            "relationship field `{}.{name}` names no declared relation",
            schema.resource_type
        ))
    })
}

fn eager_load(token: &str, relation: &Relation<'_>) -> EagerLoad {
    let edge = relation.edge;
    let (match_column, parent_column) = match edge.kind {
        RelationKind::ManyToOne => (&edge.local_key_column, &edge.foreign_key_column),
        RelationKind::OneToMany => (&edge.foreign_key_column, &edge.local_key_column),
    };
    EagerLoad {
        relation: token.to_string(),
        kind: edge.kind,
        table: relation.target.table.clone(),
        key_column: relation.target.primary_key.clone(),
        match_column: match_column.clone(),
        parent_column: parent_column.clone(),
    }
}
