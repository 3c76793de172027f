//! Error taxonomy for request handling.
//!
//! Every rejection carries enough context to build a JSON:API error object
//! (see [`QueryError::to_error_object`]). Errors fall into four classes:
//!
//! - **Malformed**: the parameter does not have the expected shape or grammar
//! - **NotAllowed**: well-formed, but outside the resource's allow-lists
//! - **Configuration**: the declared schema is inconsistent with the relationship graph
//! - **Storage**: the backing store failed while executing a compiled query

use serde_json::{json, Value};

/// Result alias used throughout the engine.
pub type QueryResult<T> = Result<T, QueryError>;

/// Coarse classification of a [`QueryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Malformed,
    NotAllowed,
    Configuration,
    Storage,
}

/// Errors raised while parsing, validating, compiling or executing a request.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    // === Malformed ===
    #[error("The fields parameter is malformed.")]
    FieldsMalformed { resource_type: String },

    #[error("The sort parameter is malformed.")]
    SortMalformed,

    #[error("The filter parameter is malformed.")]
    FilterMalformed,

    #[error("The page parameter is malformed.")]
    PageMalformed { parameter: String },

    #[error("The value of the filter {field}[{operator}] has a wrong format.")]
    FilterFormat { field: String, operator: String },

    // === NotAllowed ===
    #[error("The field {field} is not allowed to be requested.")]
    FieldNotAllowed {
        resource_type: String,
        field: String,
    },

    #[error("The field {field} is not allowed to sort.")]
    SortNotAllowed { field: String },

    #[error("The field {field} is not allowed to filter.")]
    FilterNotAllowed { field: String },

    #[error("The filter operator {operator} is not allowed for the field {field}.")]
    FilterOperatorNotAllowed { field: String, operator: String },

    #[error("The resource type {0} does not exist.")]
    UnknownResourceType(String),

    // === Configuration ===
    #[error("Invalid resource configuration: {0}")]
    Configuration(String),

    // === Storage ===
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl QueryError {
    /// Build a configuration error from anything displayable.
    pub fn configuration(message: impl Into<String>) -> Self {
        QueryError::Configuration(message.into())
    }

    /// The error class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::FieldsMalformed { .. }
            | QueryError::SortMalformed
            | QueryError::FilterMalformed
            | QueryError::PageMalformed { .. }
            | QueryError::FilterFormat { .. } => ErrorKind::Malformed,
            QueryError::FieldNotAllowed { .. }
            | QueryError::SortNotAllowed { .. }
            | QueryError::FilterNotAllowed { .. }
            | QueryError::FilterOperatorNotAllowed { .. }
            | QueryError::UnknownResourceType(_) => ErrorKind::NotAllowed,
            QueryError::Configuration(_) => ErrorKind::Configuration,
            QueryError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// HTTP status the boundary layer should answer with.
    pub fn status(&self) -> u16 {
        match self {
            QueryError::UnknownResourceType(_) => 404,
            _ => match self.kind() {
                ErrorKind::Malformed | ErrorKind::NotAllowed => 400,
                ErrorKind::Configuration | ErrorKind::Storage => 500,
            },
        }
    }

    /// The offending query parameter, when the error points at one.
    pub fn parameter(&self) -> Option<String> {
        match self {
            QueryError::FieldsMalformed { resource_type }
            | QueryError::FieldNotAllowed { resource_type, .. } => {
                Some(format!("fields[{resource_type}]"))
            }
            QueryError::SortMalformed | QueryError::SortNotAllowed { .. } => Some("sort".into()),
            QueryError::FilterMalformed => Some("filter".into()),
            QueryError::FilterNotAllowed { field } => Some(format!("filter[{field}]")),
            QueryError::FilterOperatorNotAllowed { field, operator }
            | QueryError::FilterFormat { field, operator } => {
                Some(format!("filter[{field}][{operator}]"))
            }
            QueryError::PageMalformed { parameter } => Some(parameter.clone()),
            QueryError::UnknownResourceType(_)
            | QueryError::Configuration(_)
            | QueryError::Storage(_) => None,
        }
    }

    /// Render as a JSON:API error object.
    ///
    /// Server-side failures get a generic detail so schema and storage
    /// internals never reach the client.
    pub fn to_error_object(&self) -> Value {
        let status = self.status();
        let (title, detail) = match self.kind() {
            ErrorKind::Configuration | ErrorKind::Storage => (
                "Internal server error",
                "The request could not be processed.".to_string(),
            ),
            _ if status == 404 => ("Not found", self.to_string()),
            _ => ("Bad request", self.to_string()),
        };

        let mut object = json!({
            "status": status.to_string(),
            "title": title,
            "detail": detail,
        });
        if let Some(parameter) = self.parameter() {
            object["source"] = json!({ "parameter": parameter });
        }
        object
    }
}
