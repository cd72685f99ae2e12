//! The remote record source the buffer is paged from.

use async_trait::async_trait;
use gridview_core::{
    AggregationKind, CellValues, FieldId, FieldOptions, Filter, FilterType, GridError, Record,
    RecordId, SearchState, SortRule, View,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

/// One page request against the view's ordering.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageQuery {
    pub offset: usize,
    pub limit: usize,
    pub filter_type: FilterType,
    /// Empty when the view's filters are disabled.
    pub filters: Vec<Filter>,
    pub sorts: Vec<SortRule>,
    /// Only set when rows not matching the search are hidden.
    pub search: Option<String>,
}

impl PageQuery {
    pub fn for_view(view: &View, search: &SearchState, offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit,
            filter_type: view.filter_type,
            filters: if view.filters_disabled {
                Vec::new()
            } else {
                view.filters.clone()
            },
            sorts: view.sorts.clone(),
            search: search.server_term().map(str::to_string),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,
    /// Rows matching the query, ignoring offset and limit.
    pub total_count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordUpdate {
    pub id: RecordId,
    pub values: CellValues,
}

/// Server-side storage of one table's records.
///
/// Every operation may fail with [`GridError::Transport`]. Fetches given a
/// cancellation token resolve to [`GridError::Cancelled`] once it fires.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn fetch_page(
        &self,
        query: &PageQuery,
        cancel: &CancellationToken,
    ) -> Result<Page, GridError>;

    /// Number of rows matching `query`; offset and limit are ignored.
    async fn fetch_count(
        &self,
        query: &PageQuery,
        cancel: &CancellationToken,
    ) -> Result<usize, GridError>;

    /// Create a record, before `before` when given, otherwise last.
    async fn create_record(
        &self,
        values: &CellValues,
        before: Option<RecordId>,
    ) -> Result<Record, GridError>;

    async fn update_record(&self, id: RecordId, values: &CellValues) -> Result<Record, GridError>;

    /// Move a record before `before`, or to the end.
    async fn move_record(&self, id: RecordId, before: Option<RecordId>)
        -> Result<Record, GridError>;

    /// # Errors
    /// [`GridError::NotFound`] when the record is already gone.
    async fn delete_record(&self, id: RecordId) -> Result<(), GridError>;

    async fn batch_update(&self, updates: &[RecordUpdate]) -> Result<Vec<Record>, GridError>;

    async fn batch_create(&self, values: &[CellValues]) -> Result<Vec<Record>, GridError>;

    async fn batch_delete(&self, ids: &[RecordId]) -> Result<(), GridError>;

    /// Footer values for `fields` over the rows matching `query`.
    async fn fetch_field_aggregations(
        &self,
        query: &PageQuery,
        fields: &[(FieldId, AggregationKind)],
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<FieldId, serde_json::Value>, GridError>;

    async fn update_field_options(
        &self,
        view_id: u64,
        options: &BTreeMap<FieldId, FieldOptions>,
    ) -> Result<(), GridError>;
}
