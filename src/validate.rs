//! Allow-list validation.
//!
//! Cross-checks a [`ParsedRequest`] against the resource's schema. The first
//! violation ends the request; nothing is compiled from a request that fails
//! here.

use serde::Serialize;

use crate::error::{QueryError, QueryResult};
use crate::operator::Operator;
use crate::params::{PageParams, ParsedRequest, SortDirection};
use crate::schema::{FieldTarget, RelationshipGraph, ResourceSchema};

/// A requested field, resolved to what it projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldSelection {
    Attribute { token: String, column: String },
    Relation { token: String, relation: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedSort {
    pub token: String,
    pub target: FieldTarget,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedCondition {
    pub operator: Operator,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedFilter {
    pub token: String,
    pub target: FieldTarget,
    pub conditions: Vec<ValidatedCondition>,
}

/// A request that passed every allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedRequest {
    /// `None` when no sparse fieldset was requested.
    pub fields: Option<Vec<FieldSelection>>,
    pub sort: Vec<ValidatedSort>,
    pub filters: Vec<ValidatedFilter>,
    pub page: PageParams,
}

/// Check `parsed` against `schema`, in the order fields, sort, filter.
pub fn validate(
    graph: &RelationshipGraph,
    schema: &ResourceSchema,
    parsed: ParsedRequest,
) -> QueryResult<ValidatedRequest> {
    let fields = validate_fields(schema, parsed.fields)?;

    let sort = parsed
        .sort
        .into_iter()
        .map(|key| {
            let target = schema
                .sort_target(&key.field)
                .ok_or_else(|| QueryError::SortNotAllowed {
                    field: key.field.clone(),
                })?;
            confirm_path(graph, schema, target)?;
            Ok(ValidatedSort {
                token: key.field,
                target: target.clone(),
                direction: key.direction,
            })
        })
        .collect::<QueryResult<Vec<_>>>()?;

    let mut filters = Vec::new();
    for group in parsed.filter {
        // A field named with no operators filters nothing.
        if group.conditions.is_empty() {
            continue;
        }

        let rule = schema
            .filter_rule(&group.field)
            .ok_or_else(|| QueryError::FilterNotAllowed {
                field: group.field.clone(),
            })?;

        let mut conditions = Vec::with_capacity(group.conditions.len());
        for condition in group.conditions {
            let operator = Operator::from_token(&condition.operator)
                .filter(|op| rule.allows(*op))
                .ok_or_else(|| QueryError::FilterOperatorNotAllowed {
                    field: group.field.clone(),
                    operator: condition.operator.clone(),
                })?;
            conditions.push(ValidatedCondition {
                operator,
                value: condition.value,
            });
        }

        confirm_path(graph, schema, &rule.target)?;
        filters.push(ValidatedFilter {
            token: group.field,
            target: rule.target.clone(),
            conditions,
        });
    }

    Ok(ValidatedRequest {
        fields,
        sort,
        filters,
        page: parsed.page,
    })
}

fn validate_fields(
    schema: &ResourceSchema,
    tokens: Vec<String>,
) -> QueryResult<Option<Vec<FieldSelection>>> {
    if tokens.is_empty() {
        return Ok(None);
    }

    tokens
        .into_iter()
        .map(|token| {
            if let Some(column) = schema.field_column(&token) {
                return Ok(FieldSelection::Attribute {
                    column: column.to_string(),
                    token,
                });
            }
            if let Some(relation) = schema.relation_field(&token) {
                return Ok(FieldSelection::Relation {
                    relation: relation.to_string(),
                    token,
                });
            }
            Err(QueryError::FieldNotAllowed {
                resource_type: schema.resource_type.clone(),
                field: token,
            })
        })
        .collect::<QueryResult<Vec<_>>>()
        .map(Some)
}

/// The registry checked every path at startup; a path that no longer
/// resolves means the schema and graph drifted apart.
fn confirm_path(
    graph: &RelationshipGraph,
    schema: &ResourceSchema,
    target: &FieldTarget,
) -> QueryResult<()> {
    let FieldTarget::Path { path } = target else {
        return Ok(());
    };
    match graph.follow(&schema.resource_type, &path.relations) {
        Some(_) => Ok(()),
        None => Err(QueryError::configuration(format!(
            "path `{path}` on `{}` does not match the relationship graph",
            schema.resource_type
        ))),
    }
}
