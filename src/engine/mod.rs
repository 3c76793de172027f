//! QueryEngine - the entry point the HTTP layer calls.
//!
//! ```text
//! QueryParams -> parse -> validate -> compile -> CompiledQueryPlan
//!                                                     |
//!                          Executor::begin_read <-----+
//!                          page query, count query, eager loads
//!                                                     |
//!                                                   Page
//! ```
//!
//! The engine keeps no per-request state. The registry sits behind an
//! [`Arc`] and is never mutated, so one engine can serve many threads.

pub mod relationships;

use std::sync::Arc;

use tracing::debug;

use crate::config::PaginationSettings;
use crate::error::QueryResult;
use crate::pagination::{fetch_window, Page};
use crate::params::{parse, QueryParams};
use crate::plan::{compile, CompiledQueryPlan};
use crate::schema::SchemaRegistry;
use crate::store::{Executor, ReadSession};
use crate::validate::validate;

#[derive(Debug, Clone)]
pub struct QueryEngine {
    registry: Arc<SchemaRegistry>,
    pagination: PaginationSettings,
}

impl QueryEngine {
    pub fn new(registry: impl Into<Arc<SchemaRegistry>>, pagination: PaginationSettings) -> Self {
        Self {
            registry: registry.into(),
            pagination,
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn pagination(&self) -> &PaginationSettings {
        &self.pagination
    }

    /// Parse, validate and compile a request. Nothing touches storage.
    pub fn compile(
        &self,
        resource_type: &str,
        params: &QueryParams,
    ) -> QueryResult<CompiledQueryPlan> {
        self.compile_request(resource_type, params)
            .inspect_err(|err| {
                debug!(
                    resource_type,
                    kind = ?err.kind(),
                    error = %err,
                    "request rejected"
                );
            })
    }

    fn compile_request(
        &self,
        resource_type: &str,
        params: &QueryParams,
    ) -> QueryResult<CompiledQueryPlan> {
        let schema = self.registry.get(resource_type)?;
        let parsed = parse(schema, params)?;
        let validated = validate(self.registry.graph(), schema, parsed)?;
        compile(self.registry.graph(), schema, validated, &self.pagination)
    }

    /// Run a compiled plan inside one read session.
    pub fn execute<E: Executor>(
        &self,
        executor: &E,
        plan: &CompiledQueryPlan,
    ) -> QueryResult<Page> {
        let dialect = executor.dialect();
        let mut session = executor.begin_read()?;

        let window = fetch_window(&mut session, plan, dialect)?;
        let rows = relationships::attach(&mut session, plan, dialect, window.records)?;
        session.finish()?;

        debug!(
            resource_type = %plan.resource_type,
            rows = rows.len(),
            total = ?window.total_count,
            "page fetched"
        );
        Ok(Page::new(&plan.page, rows, window.total_count, window.has_more))
    }

    /// Compile and execute in one call.
    pub fn query<E: Executor>(
        &self,
        executor: &E,
        resource_type: &str,
        params: &QueryParams,
    ) -> QueryResult<Page> {
        let plan = self.compile(resource_type, params)?;
        self.execute(executor, &plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, QueryError};
    use crate::schema::builtin;

    fn engine() -> QueryEngine {
        QueryEngine::new(builtin::registry().unwrap(), PaginationSettings::default())
    }

    #[test]
    fn test_unknown_resource_type() {
        let err = engine().compile("tags", &QueryParams::new()).unwrap_err();
        assert!(matches!(err, QueryError::UnknownResourceType(_)));
        assert_eq!(err.status(), 404);
    }

    #[test]
    fn test_malformed_before_not_allowed() {
        // `content` is not sortable, but the filter shape is checked first.
        let params = QueryParams::from_pairs([("sort", "content"), ("filter", "x")]);
        let err = engine().compile("posts", &params).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn test_foreign_namespace_filter_is_rejected() {
        let params = QueryParams::from_pairs([("filter[secret][equal]", "x")]);
        let err = engine().compile("comments", &params).unwrap_err();
        assert!(matches!(err, QueryError::FilterMalformed));
        assert_eq!(err.parameter().as_deref(), Some("filter"));
    }

    #[test]
    fn test_engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<QueryEngine>();
    }
}
