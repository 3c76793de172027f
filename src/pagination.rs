//! Pagination adapter.
//!
//! Page-number pagination in two modes:
//!
//! - [`PageMode::LengthAware`]: LIMIT/OFFSET plus a `COUNT(*)` over the same
//!   filtered scope, giving a total and a last page
//! - [`PageMode::Simple`]: fetches one extra row to learn whether another page
//!   exists, with no count query

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PaginationSettings;
use crate::error::QueryResult;
use crate::params::PageParams;
use crate::plan::CompiledQueryPlan;
use crate::sql::Dialect;
use crate::store::{ReadSession, Record, ResourceRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageMode {
    #[default]
    LengthAware,
    Simple,
}

/// The page a plan fetches. Size and number are at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub size: u64,
    pub number: u64,
    pub mode: PageMode,
}

impl PageRequest {
    /// Apply defaults and the size cap to the requested page.
    pub fn resolve(params: &PageParams, settings: &PaginationSettings) -> Self {
        let size = params
            .size
            .unwrap_or(settings.default_size)
            .clamp(1, settings.max_size.max(1));
        Self {
            size,
            number: params.number.unwrap_or(1).max(1),
            mode: settings.mode,
        }
    }

    /// Rows to fetch. Simple mode reads one past the page.
    pub fn limit(&self) -> u64 {
        match self.mode {
            PageMode::LengthAware => self.size,
            PageMode::Simple => self.size.saturating_add(1),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.number - 1).saturating_mul(self.size)
    }
}

/// Raw rows of one page, before relationships are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct PageWindow {
    pub records: Vec<Record>,
    pub total_count: Option<u64>,
    pub has_more: bool,
}

/// Run the page query, and the count query in length-aware mode.
pub fn fetch_window<S: ReadSession>(
    session: &mut S,
    plan: &CompiledQueryPlan,
    dialect: Dialect,
) -> QueryResult<PageWindow> {
    let page = plan.page;
    let sql = plan.to_sql(dialect);
    debug!(%sql, "page query");
    let mut records = session.fetch(&sql)?;

    match page.mode {
        PageMode::LengthAware => {
            let count_sql = plan.count_sql(dialect);
            debug!(sql = %count_sql, "count query");
            let total = session.fetch_count(&count_sql)?;
            Ok(PageWindow {
                records,
                total_count: Some(total),
                has_more: page.number.saturating_mul(page.size) < total,
            })
        }
        PageMode::Simple => {
            let has_more = records.len() as u64 > page.size;
            records.truncate(page.size as usize);
            Ok(PageWindow {
                records,
                total_count: None,
                has_more,
            })
        }
    }
}

/// One page of results with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub rows: Vec<ResourceRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
    pub page_size: u64,
    pub page_number: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_page: Option<u64>,
    pub has_more: bool,
}

impl Page {
    pub fn new(
        request: &PageRequest,
        rows: Vec<ResourceRow>,
        total_count: Option<u64>,
        has_more: bool,
    ) -> Self {
        let last_page = total_count.map(|total| total.div_ceil(request.size).max(1));
        Self {
            rows,
            total_count,
            page_size: request.size,
            page_number: request.number,
            last_page,
            has_more,
        }
    }
}
