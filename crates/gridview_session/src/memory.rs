//! In-memory [`RecordSource`] used by tests and the simulator.
//!
//! Filtering, sorting and search use the same matching engine as the client,
//! so pages it serves agree with what the reconciler computes locally. Every
//! request is logged, failures can be injected per operation, and an optional
//! latency honours cancellation.

use crate::source::{Page, PageQuery, RecordSource, RecordUpdate};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use gridview_core::ordering::{self, plain_decimal};
use gridview_core::{
    AggregationKind, CellValues, FieldId, FieldOptions, FieldSet, FieldTypeRegistry, GridError,
    OrderKey, Record, RecordId, RowMatcher, SearchState, View,
};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Operation kinds, for failure injection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceOperation {
    FetchPage,
    FetchCount,
    Create,
    Update,
    Move,
    Delete,
    BatchUpdate,
    BatchCreate,
    BatchDelete,
    Aggregations,
    FieldOptions,
}

/// A logged request.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceRequest {
    FetchPage(PageQuery),
    FetchCount(PageQuery),
    Create { before: Option<RecordId> },
    Update(RecordId),
    Move { id: RecordId, before: Option<RecordId> },
    Delete(RecordId),
    BatchUpdate(Vec<RecordId>),
    BatchCreate(usize),
    BatchDelete(Vec<RecordId>),
    Aggregations(Vec<FieldId>),
    FieldOptions(u64),
}

impl SourceRequest {
    fn operation(&self) -> SourceOperation {
        match self {
            Self::FetchPage(_) => SourceOperation::FetchPage,
            Self::FetchCount(_) => SourceOperation::FetchCount,
            Self::Create { .. } => SourceOperation::Create,
            Self::Update(_) => SourceOperation::Update,
            Self::Move { .. } => SourceOperation::Move,
            Self::Delete(_) => SourceOperation::Delete,
            Self::BatchUpdate(_) => SourceOperation::BatchUpdate,
            Self::BatchCreate(_) => SourceOperation::BatchCreate,
            Self::BatchDelete(_) => SourceOperation::BatchDelete,
            Self::Aggregations(_) => SourceOperation::Aggregations,
            Self::FieldOptions(_) => SourceOperation::FieldOptions,
        }
    }
}

#[derive(Default)]
struct MemoryState {
    records: Vec<Record>,
    next_id: u64,
    requests: Vec<SourceRequest>,
    failures: Vec<(SourceOperation, GridError)>,
    field_options: BTreeMap<u64, BTreeMap<FieldId, FieldOptions>>,
}

impl MemoryState {
    fn position(&self, id: RecordId) -> Result<usize, GridError> {
        self.records
            .iter()
            .position(|record| record.id == id)
            .ok_or_else(|| GridError::NotFound(format!("record {id}")))
    }

    /// Order key for a record placed before `before`, or after every record.
    fn order_for(
        &self,
        before: Option<RecordId>,
        moving: Option<RecordId>,
    ) -> Result<OrderKey, GridError> {
        let others = self
            .records
            .iter()
            .filter(|record| Some(record.id) != moving);
        match before {
            Some(before) => {
                let index = self.position(before)?;
                let upper = &self.records[index].order;
                let lower = others
                    .map(|record| &record.order)
                    .filter(|order| *order < upper)
                    .max();
                Ok(ordering::between(lower, Some(upper)))
            }
            None => {
                let highest = ordering::highest(others.map(|record| &record.order));
                Ok(OrderKey::after_highest(&highest))
            }
        }
    }

    fn create(&mut self, values: &CellValues, before: Option<RecordId>) -> Result<Record, GridError> {
        let order = self.order_for(before, None)?;
        let id = RecordId::from(self.next_id);
        self.next_id += 1;
        let mut record = Record::new(id, order);
        record.merge_values(values);
        self.records.push(record.clone());
        Ok(record)
    }

    fn update(&mut self, id: RecordId, values: &CellValues) -> Result<(Record, Record), GridError> {
        let index = self.position(id)?;
        let before = self.records[index].clone();
        self.records[index].merge_values(values);
        Ok((before, self.records[index].clone()))
    }

    fn relocate(
        &mut self,
        id: RecordId,
        before: Option<RecordId>,
    ) -> Result<(Record, Record), GridError> {
        let index = self.position(id)?;
        let order = self.order_for(before, Some(id))?;
        let previous = self.records[index].clone();
        self.records[index].order = order;
        Ok((previous, self.records[index].clone()))
    }

    fn delete(&mut self, id: RecordId) -> Result<Record, GridError> {
        let index = self.position(id)?;
        Ok(self.records.remove(index))
    }
}

/// A table held in memory.
pub struct MemorySource {
    table_id: u64,
    fields: FieldSet,
    registry: FieldTypeRegistry,
    latency: Option<Duration>,
    state: Mutex<MemoryState>,
}

impl MemorySource {
    pub fn new(table_id: u64, fields: FieldSet, records: Vec<Record>) -> Self {
        let next_id = records
            .iter()
            .filter_map(|record| match record.id {
                RecordId::Persisted(id) => Some(id),
                RecordId::Temporary(_) => None,
            })
            .max()
            .unwrap_or(0)
            + 1;
        Self {
            table_id,
            fields,
            registry: FieldTypeRegistry::with_builtins(),
            latency: None,
            state: Mutex::new(MemoryState {
                records,
                next_id,
                ..MemoryState::default()
            }),
        }
    }

    /// Delay every fetch by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn table_id(&self) -> u64 {
        self.table_id
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, GridError> {
        self.state
            .lock()
            .map_err(|_| GridError::Transport("memory source lock poisoned".to_string()))
    }

    /// Make the next request of kind `operation` fail with `error`.
    pub fn fail_next(&self, operation: SourceOperation, error: GridError) {
        if let Ok(mut state) = self.lock() {
            state.failures.push((operation, error));
        }
    }

    /// Every request issued so far, oldest first.
    pub fn requests(&self) -> Vec<SourceRequest> {
        self.lock()
            .map(|state| state.requests.clone())
            .unwrap_or_default()
    }

    /// `(offset, limit)` of every page fetch issued so far.
    pub fn page_requests(&self) -> Vec<(usize, usize)> {
        self.requests()
            .into_iter()
            .filter_map(|request| match request {
                SourceRequest::FetchPage(query) => Some((query.offset, query.limit)),
                _ => None,
            })
            .collect()
    }

    pub fn clear_requests(&self) {
        if let Ok(mut state) = self.lock() {
            state.requests.clear();
        }
    }

    /// All records in order-key order.
    pub fn records(&self) -> Vec<Record> {
        let mut records = self
            .lock()
            .map(|state| state.records.clone())
            .unwrap_or_default();
        records.sort_by(|a, b| a.order.cmp(&b.order).then(a.id.cmp(&b.id)));
        records
    }

    pub fn len(&self) -> usize {
        self.lock().map(|state| state.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn field_options(&self, view_id: u64) -> BTreeMap<FieldId, FieldOptions> {
        self.lock()
            .ok()
            .and_then(|state| state.field_options.get(&view_id).cloned())
            .unwrap_or_default()
    }

    /// Create a record as another client would; nothing is logged.
    pub fn insert_remote(
        &self,
        values: &CellValues,
        before: Option<RecordId>,
    ) -> Result<Record, GridError> {
        self.lock()?.create(values, before)
    }

    /// Update a record as another client would, returning `(before, after)`.
    pub fn update_remote(
        &self,
        id: RecordId,
        values: &CellValues,
    ) -> Result<(Record, Record), GridError> {
        self.lock()?.update(id, values)
    }

    /// Move a record as another client would, returning `(before, after)`.
    pub fn move_remote(
        &self,
        id: RecordId,
        before: Option<RecordId>,
    ) -> Result<(Record, Record), GridError> {
        self.lock()?.relocate(id, before)
    }

    pub fn delete_remote(&self, id: RecordId) -> Result<Record, GridError> {
        self.lock()?.delete(id)
    }

    /// Log `request` and pop an injected failure for its operation.
    fn begin(&self, request: SourceRequest) -> Result<(), GridError> {
        let operation = request.operation();
        let mut state = self.lock()?;
        state.requests.push(request);
        if let Some(index) = state.failures.iter().position(|(op, _)| *op == operation) {
            let (_, error) = state.failures.remove(index);
            return Err(error);
        }
        Ok(())
    }

    async fn wait(&self, cancel: &CancellationToken) -> Result<(), GridError> {
        if let Some(latency) = self.latency {
            tokio::select! {
                _ = cancel.cancelled() => return Err(GridError::Cancelled),
                _ = tokio::time::sleep(latency) => {}
            }
        }
        if cancel.is_cancelled() {
            return Err(GridError::Cancelled);
        }
        Ok(())
    }

    fn query_view(&self, query: &PageQuery) -> View {
        View {
            filter_type: query.filter_type,
            filters: query.filters.clone(),
            sorts: query.sorts.clone(),
            ..View::new(0, self.table_id)
        }
    }

    /// Records matching `query`, sorted.
    fn matching(&self, query: &PageQuery) -> Result<Vec<Record>, GridError> {
        let view = self.query_view(query);
        let search = query
            .search
            .as_deref()
            .map(|term| SearchState::new(term, true))
            .unwrap_or_default();
        let matcher = RowMatcher::new(&view, &self.fields, &self.registry);
        let mut records: Vec<Record> = self
            .lock()?
            .records
            .iter()
            .filter(|record| matcher.is_visible(record, &search))
            .cloned()
            .collect();
        matcher.comparator().sort(&mut records);
        Ok(records)
    }

    fn aggregate(&self, records: &[Record], field: FieldId, kind: AggregationKind) -> Value {
        let Some((field, field_type)) = self
            .fields
            .get(field)
            .and_then(|field| Some((field, self.registry.for_field(field)?)))
        else {
            return Value::Null;
        };
        let values = records.iter().map(|record| record.value(field.id));
        let numbers = || {
            records
                .iter()
                .filter_map(move |record| field_type.as_number(record.value(field.id)))
        };
        match kind {
            AggregationKind::EmptyCount => {
                json!(values.filter(|value| field_type.is_empty(value)).count())
            }
            AggregationKind::NotEmptyCount => {
                json!(values.filter(|value| !field_type.is_empty(value)).count())
            }
            AggregationKind::UniqueCount => {
                let unique: BTreeSet<String> = values
                    .filter(|value| !field_type.is_empty(value))
                    .map(|value| field_type.to_text(field, value))
                    .collect();
                json!(unique.len())
            }
            AggregationKind::Min => numbers()
                .min()
                .map_or(Value::Null, |min| json!(plain_decimal(&min))),
            AggregationKind::Max => numbers()
                .max()
                .map_or(Value::Null, |max| json!(plain_decimal(&max))),
            AggregationKind::Sum => {
                let sum = numbers().fold(BigDecimal::from(0), |acc, n| acc + n);
                json!(plain_decimal(&sum))
            }
            AggregationKind::Average => {
                let (sum, n) = numbers().fold((BigDecimal::from(0), 0u64), |(acc, n), value| {
                    (acc + value, n + 1)
                });
                if n == 0 {
                    return Value::Null;
                }
                let places = i64::from(field.number_decimal_places);
                let average = (sum / BigDecimal::from(n)).round(places);
                json!(plain_decimal(&average))
            }
        }
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    async fn fetch_page(
        &self,
        query: &PageQuery,
        cancel: &CancellationToken,
    ) -> Result<Page, GridError> {
        self.begin(SourceRequest::FetchPage(query.clone()))?;
        self.wait(cancel).await?;
        let matching = self.matching(query)?;
        let total_count = matching.len();
        let records = matching
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect();
        debug!(offset = query.offset, limit = query.limit, total_count, "served page");
        Ok(Page {
            records,
            total_count,
        })
    }

    async fn fetch_count(
        &self,
        query: &PageQuery,
        cancel: &CancellationToken,
    ) -> Result<usize, GridError> {
        self.begin(SourceRequest::FetchCount(query.clone()))?;
        self.wait(cancel).await?;
        Ok(self.matching(query)?.len())
    }

    async fn create_record(
        &self,
        values: &CellValues,
        before: Option<RecordId>,
    ) -> Result<Record, GridError> {
        self.begin(SourceRequest::Create { before })?;
        self.lock()?.create(values, before)
    }

    async fn update_record(&self, id: RecordId, values: &CellValues) -> Result<Record, GridError> {
        self.begin(SourceRequest::Update(id))?;
        let (_, updated) = self.lock()?.update(id, values)?;
        Ok(updated)
    }

    async fn move_record(
        &self,
        id: RecordId,
        before: Option<RecordId>,
    ) -> Result<Record, GridError> {
        self.begin(SourceRequest::Move { id, before })?;
        let (_, moved) = self.lock()?.relocate(id, before)?;
        Ok(moved)
    }

    async fn delete_record(&self, id: RecordId) -> Result<(), GridError> {
        self.begin(SourceRequest::Delete(id))?;
        self.lock()?.delete(id).map(|_| ())
    }

    async fn batch_update(&self, updates: &[RecordUpdate]) -> Result<Vec<Record>, GridError> {
        self.begin(SourceRequest::BatchUpdate(
            updates.iter().map(|update| update.id).collect(),
        ))?;
        let mut state = self.lock()?;
        for update in updates {
            state.position(update.id)?;
        }
        updates
            .iter()
            .map(|update| state.update(update.id, &update.values).map(|(_, new)| new))
            .collect()
    }

    async fn batch_create(&self, values: &[CellValues]) -> Result<Vec<Record>, GridError> {
        self.begin(SourceRequest::BatchCreate(values.len()))?;
        let mut state = self.lock()?;
        values.iter().map(|values| state.create(values, None)).collect()
    }

    async fn batch_delete(&self, ids: &[RecordId]) -> Result<(), GridError> {
        self.begin(SourceRequest::BatchDelete(ids.to_vec()))?;
        let mut state = self.lock()?;
        state.records.retain(|record| !ids.contains(&record.id));
        Ok(())
    }

    async fn fetch_field_aggregations(
        &self,
        query: &PageQuery,
        fields: &[(FieldId, AggregationKind)],
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<FieldId, Value>, GridError> {
        self.begin(SourceRequest::Aggregations(
            fields.iter().map(|(field, _)| *field).collect(),
        ))?;
        self.wait(cancel).await?;
        let records = self.matching(query)?;
        Ok(fields
            .iter()
            .map(|(field, kind)| (*field, self.aggregate(&records, *field, *kind)))
            .collect())
    }

    async fn update_field_options(
        &self,
        view_id: u64,
        options: &BTreeMap<FieldId, FieldOptions>,
    ) -> Result<(), GridError> {
        self.begin(SourceRequest::FieldOptions(view_id))?;
        let mut state = self.lock()?;
        let stored = state.field_options.entry(view_id).or_default();
        for (field, value) in options {
            stored.insert(*field, value.clone());
        }
        Ok(())
    }
}
