use chrono::NaiveDate;
use connection_types::{ConnectionState, SortDirection, SortField};

/// Validated listing intent. Built from the raw query by the review queue service; never
/// persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewQueueFilter {
    /// 1-based
    pub page: u32,
    /// Already clamped to the configured maximum
    pub limit: u32,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    pub district_id: Option<i64>,
    pub plan_id: Option<i64>,
    pub client_name: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub province_id: Option<i64>,
    pub department_id: Option<i64>,
}

impl ReviewQueueFilter {
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }
}

/// What the store is asked for: the filter plus state and person scoping.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionSearch {
    pub filter: ReviewQueueFilter,
    pub state: Option<ConnectionState>,
    pub person_id: Option<i64>,
}
