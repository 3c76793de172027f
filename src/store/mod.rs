//! Storage boundary.
//!
//! The engine never talks to a database directly. It asks an [`Executor`] for
//! a [`ReadSession`], runs every query of one request through it, and then
//! finishes the session, so a request is one atomic read.

pub mod sqlite;

pub use sqlite::SqliteExecutor;

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::QueryResult;
use crate::sql::Dialect;

/// One result row, keyed by column name.
pub type Record = Map<String, Value>;

/// Identifiers of a related resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RelationData {
    ToOne(Option<Value>),
    ToMany(Vec<Value>),
}

/// A resource ready for the serialization layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceRow {
    pub id: Value,
    pub attributes: Map<String, Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, RelationData>,
}

/// A backend that can open read sessions.
pub trait Executor {
    type Session<'a>: ReadSession
    where
        Self: 'a;

    /// SQL dialect the backend speaks.
    fn dialect(&self) -> Dialect;

    fn begin_read(&self) -> QueryResult<Self::Session<'_>>;
}

/// A consistent read over several queries.
pub trait ReadSession {
    fn fetch(&mut self, sql: &str) -> QueryResult<Vec<Record>>;

    /// Run a query whose first column of the first row is a count.
    fn fetch_count(&mut self, sql: &str) -> QueryResult<u64>;

    fn finish(self) -> QueryResult<()>;
}
