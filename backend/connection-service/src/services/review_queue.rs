//! Review queue and general listing
//!
//! Both share one set of query rules: `page`/`limit` must be positive, `limit` is clamped to
//! the configured maximum, the sort key comes from a closed allow-list, and the date range must
//! be ordered. Anything else is a validation error, never a silent default.

use std::sync::Arc;

use connection_types::{
    ConnectionListQuery, ConnectionRequest, ConnectionState, SortDirection, SortField,
};
use error_types::Page;

use super::{Result, WorkflowError};
use crate::config::ReviewQueueConfig;
use crate::models::{ConnectionSearch, ReviewQueueFilter};
use crate::repository::ConnectionStore;

/// Turn the raw query string into a validated filter.
pub fn parse_filter(
    query: &ConnectionListQuery,
    config: ReviewQueueConfig,
) -> Result<ReviewQueueFilter> {
    let page = match query.page {
        Some(0) => return Err(WorkflowError::Validation("page must be at least 1".into())),
        Some(page) => page,
        None => 1,
    };
    let limit = match query.limit {
        Some(0) => return Err(WorkflowError::Validation("limit must be at least 1".into())),
        Some(limit) => limit.min(config.max_page_size),
        None => config.default_page_size,
    };

    let sort_field = match query.sort_by.as_deref() {
        Some(value) => value
            .parse::<SortField>()
            .map_err(|e| WorkflowError::Validation(e.to_string()))?,
        None => SortField::RequestDate,
    };
    let sort_direction = match query.sort_dir.as_deref() {
        Some(value) => value
            .parse::<SortDirection>()
            .map_err(|e| WorkflowError::Validation(e.to_string()))?,
        None => SortDirection::Desc,
    };

    if let (Some(from), Some(to)) = (query.date_from, query.date_to) {
        if from > to {
            return Err(WorkflowError::Validation(format!(
                "fecha_desde ({from}) must not be after fecha_hasta ({to})"
            )));
        }
    }

    let client_name = query
        .client_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    Ok(ReviewQueueFilter {
        page,
        limit,
        sort_field,
        sort_direction,
        district_id: query.district_id,
        plan_id: query.plan_id,
        client_name,
        date_from: query.date_from,
        date_to: query.date_to,
        province_id: query.province_id,
        department_id: query.department_id,
    })
}

#[derive(Clone)]
pub struct ReviewQueue {
    store: Arc<dyn ConnectionStore>,
    config: ReviewQueueConfig,
}

impl ReviewQueue {
    pub fn new(store: Arc<dyn ConnectionStore>, config: ReviewQueueConfig) -> Self {
        Self { store, config }
    }

    /// Requests awaiting staff action. Any `estado` in the query is ignored.
    pub async fn pending(&self, query: &ConnectionListQuery) -> Result<Page<ConnectionRequest>> {
        let filter = parse_filter(query, self.config)?;
        self.run(ConnectionSearch {
            filter,
            state: Some(ConnectionState::PendingReview),
            person_id: None,
        })
        .await
    }

    /// Requests in any state, optionally narrowed by `estado` and scoped to one person.
    pub async fn list(
        &self,
        query: &ConnectionListQuery,
        person_id: Option<i64>,
    ) -> Result<Page<ConnectionRequest>> {
        let filter = parse_filter(query, self.config)?;
        let state = query
            .state
            .as_deref()
            .map(|value| value.parse::<ConnectionState>())
            .transpose()
            .map_err(|e| WorkflowError::Validation(format!("estado: {e}")))?;

        self.run(ConnectionSearch {
            filter,
            state,
            person_id,
        })
        .await
    }

    async fn run(&self, search: ConnectionSearch) -> Result<Page<ConnectionRequest>> {
        let (items, total) = self.store.search(&search).await?;

        tracing::debug!(
            page = search.filter.page,
            limit = search.filter.limit,
            sort = %search.filter.sort_field,
            state = ?search.state,
            total,
            "connection listing served"
        );

        Ok(Page {
            items,
            page: search.filter.page,
            limit: search.filter.limit,
            total,
        })
    }
}
