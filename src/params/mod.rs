//! Parameter parser.
//!
//! Turns decoded query parameters into a [`ParsedRequest`]. Only shape and
//! grammar are checked here; whether a token is *allowed* is the validator's
//! job. Parameters are parsed in a fixed order (`fields`, `sort`, `filter`,
//! `page`) and the first malformed one aborts the request.

mod decode;

pub use decode::QueryParams;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{QueryError, QueryResult};
use crate::schema::{ParameterStyle, ResourceSchema};

/// `[-]segment(.segment)*` separated by commas, where a segment is
/// `[a-z][a-zA-Z0-9]*`.
static SORT_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^-?[a-z][a-zA-Z0-9]*(\.[a-z][a-zA-Z0-9]*)*(,-?[a-z][a-zA-Z0-9]*(\.[a-z][a-zA-Z0-9]*)*)*$",
    )
    .expect("sort grammar is a valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// One requested sort key, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

/// `filter[<field>][<operator>]=<value>`, before any allow-list check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterCondition {
    pub operator: String,
    pub value: String,
}

/// All conditions on one field, in request order. They AND together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterGroup {
    pub field: String,
    pub conditions: Vec<FilterCondition>,
}

/// `page[size]` and `page[number]`, when given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageParams {
    pub size: Option<u64>,
    pub number: Option<u64>,
}

/// The structured form of one request's query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedRequest {
    /// Requested field tokens. Empty means every declared field.
    pub fields: Vec<String>,
    pub sort: Vec<SortKey>,
    pub filter: Vec<FilterGroup>,
    pub page: PageParams,
}

/// Parse `params` for the collection described by `schema`.
pub fn parse(schema: &ResourceSchema, params: &QueryParams) -> QueryResult<ParsedRequest> {
    let fields = parse_fields(&schema.resource_type, params.get("fields"))?;
    let sort = parse_sort(schema, params.get("sort"))?;
    let filter = parse_filter(schema, params.get("filter"))?;
    let page = parse_page(params.get("page"))?;

    Ok(ParsedRequest {
        fields,
        sort,
        filter,
        page,
    })
}

fn parse_fields(resource_type: &str, value: Option<&Value>) -> QueryResult<Vec<String>> {
    let malformed = || QueryError::FieldsMalformed {
        resource_type: resource_type.to_string(),
    };

    let Some(value) = value else {
        return Ok(vec![]);
    };
    let Value::Object(by_type) = value else {
        return Err(malformed());
    };
    let list = match by_type.get(resource_type) {
        None => return Ok(vec![]),
        Some(Value::String(list)) => list,
        Some(_) => return Err(malformed()),
    };
    if list.is_empty() {
        return Ok(vec![]);
    }

    let mut fields: Vec<String> = Vec::new();
    for token in list.split(',') {
        if token.is_empty() {
            return Err(malformed());
        }
        if !fields.iter().any(|f| f == token) {
            fields.push(token.to_string());
        }
    }
    Ok(fields)
}

fn parse_sort(schema: &ResourceSchema, value: Option<&Value>) -> QueryResult<Vec<SortKey>> {
    let raw = match (schema.style, value) {
        (_, None) => return Ok(vec![]),
        (ParameterStyle::Flat, Some(Value::String(raw))) => raw,
        (ParameterStyle::Flat, Some(_)) => return Err(QueryError::SortMalformed),
        (ParameterStyle::Namespaced, Some(Value::Object(by_type))) => {
            match by_type.get(&schema.resource_type) {
                None => return Ok(vec![]),
                Some(Value::String(raw)) => raw,
                Some(_) => return Err(QueryError::SortMalformed),
            }
        }
        (ParameterStyle::Namespaced, Some(_)) => return Err(QueryError::SortMalformed),
    };

    if !SORT_GRAMMAR.is_match(raw) {
        return Err(QueryError::SortMalformed);
    }

    Ok(raw
        .split(',')
        .map(|token| match token.strip_prefix('-') {
            Some(field) => SortKey {
                field: field.to_string(),
                direction: SortDirection::Descending,
            },
            None => SortKey {
                field: token.to_string(),
                direction: SortDirection::Ascending,
            },
        })
        .collect())
}

fn parse_filter(schema: &ResourceSchema, value: Option<&Value>) -> QueryResult<Vec<FilterGroup>> {
    let Some(value) = value else {
        return Ok(vec![]);
    };
    let Value::Object(top) = value else {
        return Err(QueryError::FilterMalformed);
    };

    // A namespaced collection only reads `filter[<type>]`. Any other key is
    // either another type's filter or the flat form, and must not be dropped.
    let groups: &Map<String, Value> = match schema.style {
        ParameterStyle::Flat => top,
        ParameterStyle::Namespaced if top.keys().any(|key| *key != schema.resource_type) => {
            return Err(QueryError::FilterMalformed);
        }
        ParameterStyle::Namespaced => match top.get(&schema.resource_type) {
            None => return Ok(vec![]),
            Some(Value::Object(groups)) => groups,
            Some(_) => return Err(QueryError::FilterMalformed),
        },
    };

    let mut parsed = Vec::with_capacity(groups.len());
    for (field, operators) in groups {
        let Value::Object(operators) = operators else {
            return Err(QueryError::FilterMalformed);
        };
        let conditions = operators
            .iter()
            .map(|(operator, value)| {
                Ok(FilterCondition {
                    operator: operator.clone(),
                    value: scalar_string(value).ok_or(QueryError::FilterMalformed)?,
                })
            })
            .collect::<QueryResult<Vec<_>>>()?;
        parsed.push(FilterGroup {
            field: field.clone(),
            conditions,
        });
    }
    Ok(parsed)
}

/// Filter values arrive as strings; JSON scalars are accepted in their
/// textual form. `null` reads as the empty string.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn parse_page(value: Option<&Value>) -> QueryResult<PageParams> {
    let Some(value) = value else {
        return Ok(PageParams::default());
    };
    let Value::Object(page) = value else {
        return Err(QueryError::PageMalformed {
            parameter: "page".into(),
        });
    };

    Ok(PageParams {
        size: page_value(page, "size")?,
        number: page_value(page, "number")?,
    })
}

fn page_value(page: &Map<String, Value>, key: &str) -> QueryResult<Option<u64>> {
    let parsed = match page.get(key) {
        None => return Ok(None),
        Some(Value::String(s)) => s.parse::<u64>().ok(),
        Some(Value::Number(n)) => n.as_u64(),
        Some(_) => None,
    };
    match parsed {
        Some(n) if n >= 1 => Ok(Some(n)),
        _ => Err(QueryError::PageMalformed {
            parameter: format!("page[{key}]"),
        }),
    }
}
