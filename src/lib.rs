//! # resq
//!
//! Compiles JSON:API-style query strings (`fields`, `sort`, `filter`, `page`)
//! into safe, dialect-aware SQL over a declared resource graph, and runs the
//! result against a read-only store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │             Query string (QueryParams)                   │
//! │  fields[posts]=title  sort=-title  filter[x][op]=v  page │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [params]
//! ┌─────────────────────────────────────────────────────────┐
//! │         ParsedRequest (shape checked, still strings)     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [validate]  <── SchemaRegistry
//! ┌─────────────────────────────────────────────────────────┐
//! │   ValidatedRequest (every token allow-listed, operators) │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [plan]  <── RelationshipGraph + resolve
//! ┌─────────────────────────────────────────────────────────┐
//! │   CompiledQueryPlan (joins, predicates, order, page)     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [sql]  dialect rendering
//! ┌─────────────────────────────────────────────────────────┐
//! │   page query + count query + eager-load queries          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [engine / store]
//! ┌─────────────────────────────────────────────────────────┐
//! │                      Page                                │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Client input never reaches SQL as an identifier: every field, sort and
//! filter token is looked up in a [`ResourceSchema`](schema::ResourceSchema)
//! and only the declared column is emitted. Values are rendered as quoted
//! literals by the dialect.

pub mod config;
pub mod engine;
pub mod error;
pub mod operator;
pub mod pagination;
pub mod params;
pub mod plan;
pub mod resolve;
pub mod schema;
pub mod sql;
pub mod store;
pub mod validate;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::config::{PaginationSettings, Settings};
    pub use crate::engine::QueryEngine;
    pub use crate::error::{ErrorKind, QueryError, QueryResult};
    pub use crate::operator::Operator;
    pub use crate::pagination::{Page, PageMode, PageRequest};
    pub use crate::params::QueryParams;
    pub use crate::plan::CompiledQueryPlan;
    pub use crate::schema::{
        RelationDecl, RelationKind, ResourceSchema, SchemaRegistry, SchemaRegistryBuilder,
    };
    pub use crate::sql::Dialect;
    pub use crate::store::{Executor, ReadSession, ResourceRow, SqliteExecutor};
}

// Also export at crate root for convenience
pub use engine::QueryEngine;
pub use error::{QueryError, QueryResult};
pub use params::QueryParams;
pub use sql::Dialect;
