//! Per-view session: the row buffer plus everything that mutates it.
//!
//! A [`GridSession`] owns one view's buffer, selection state and aggregation
//! cache. All mutation goes through `&mut self`, so local edits, scroll
//! fetches and realtime events apply strictly one after another. Network
//! calls go to a caller supplied [`RecordSource`].
//!
//! Fetches that can be superseded (buffer extension, refresh, aggregations)
//! carry a [`CancellationToken`]. Starting a newer request of the same kind
//! cancels the older one; a cancelled request completes with
//! [`GridError::Cancelled`] and leaves the buffer untouched.

mod events;
mod options;
mod rows;
mod selection;

pub use selection::PasteSummary;

use crate::aggregation::AggregationCache;
use crate::buffer::scroll::{ScrollDecision, ScrollThrottle};
use crate::buffer::window::FetchPlan;
use crate::buffer::{BufferPhase, RowBuffer};
use crate::multi_select::MultiSelect;
use crate::reconcile::Reconciler;
use crate::source::{Page, PageQuery, RecordSource};
use gridview_core::config::env_flag_enabled;
use gridview_core::{
    Field, FieldId, FieldSet, FieldTypeRegistry, GridConfig, GridError, Record, RecordId,
    RowMatcher, SearchState, View,
};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Env var enabling fetch timing logs on the `gridview_session::buffer_perf` target.
pub const BUFFER_PERF_LOG_ENV: &str = "GRIDVIEW_BUFFER_PERF_LOG";

/// View definition, fields and search: everything rows are judged against.
pub struct ViewContext {
    view: View,
    fields: FieldSet,
    registry: FieldTypeRegistry,
    search: SearchState,
}

impl ViewContext {
    pub fn new(
        view: View,
        fields: FieldSet,
        registry: FieldTypeRegistry,
        search: SearchState,
    ) -> Self {
        Self {
            view,
            fields,
            registry,
            search,
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn registry(&self) -> &FieldTypeRegistry {
        &self.registry
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn matcher(&self) -> RowMatcher<'_> {
        RowMatcher::new(&self.view, &self.fields, &self.registry)
    }

    pub fn reconciler(&self) -> Reconciler<'_> {
        Reconciler::new(self.matcher(), &self.search)
    }

    /// Columns in display order; multi-select field indices point into this.
    pub fn visible_fields(&self) -> Vec<&Field> {
        self.view.visible_fields(&self.fields)
    }

    pub fn page_query(&self, offset: usize, limit: usize) -> PageQuery {
        PageQuery::for_view(&self.view, &self.search, offset, limit)
    }
}

/// A planned buffer extension waiting for its page.
#[derive(Clone, Debug)]
pub struct PendingExtend {
    pub plan: FetchPlan,
    pub query: PageQuery,
    pub cancel: CancellationToken,
}

/// A started refresh.
#[derive(Clone, Debug)]
pub struct PendingRefresh {
    pub cancel: CancellationToken,
}

/// One open grid view.
pub struct GridSession {
    config: GridConfig,
    context: ViewContext,
    buffer: RowBuffer,
    throttle: ScrollThrottle,
    multi_select: MultiSelect,
    aggregations: AggregationCache,
    selected_cell: Option<(RecordId, FieldId)>,
    extend_cancel: Option<CancellationToken>,
    refresh_cancel: Option<CancellationToken>,
    force_refresh: bool,
    perf_log_enabled: bool,
}

impl GridSession {
    pub fn new(
        config: GridConfig,
        view: View,
        fields: FieldSet,
        registry: FieldTypeRegistry,
    ) -> Self {
        let search = SearchState::new("", config.hide_rows_not_matching_search);
        Self {
            buffer: RowBuffer::new(&config),
            throttle: ScrollThrottle::new(&config, Instant::now()),
            multi_select: MultiSelect::new(config.multi_select_row_limit),
            aggregations: AggregationCache::new(),
            context: ViewContext::new(view, fields, registry, search),
            selected_cell: None,
            extend_cancel: None,
            refresh_cancel: None,
            force_refresh: false,
            perf_log_enabled: env_flag_enabled(BUFFER_PERF_LOG_ENV),
            config,
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn context(&self) -> &ViewContext {
        &self.context
    }

    pub fn view(&self) -> &View {
        &self.context.view
    }

    pub fn fields(&self) -> &FieldSet {
        &self.context.fields
    }

    pub fn search(&self) -> &SearchState {
        &self.context.search
    }

    pub fn buffer(&self) -> &RowBuffer {
        &self.buffer
    }

    pub fn multi_select(&self) -> &MultiSelect {
        &self.multi_select
    }

    pub fn aggregations(&self) -> &AggregationCache {
        &self.aggregations
    }

    pub fn selected_cell(&self) -> Option<(RecordId, FieldId)> {
        self.selected_cell
    }

    pub fn visible_rows(&self) -> &[Record] {
        self.buffer.visible_rows()
    }

    pub fn window_top_offset(&self) -> f64 {
        self.buffer.window_top_offset()
    }

    pub fn placeholder_height(&self) -> f64 {
        self.buffer.placeholder_height()
    }

    pub fn visible_fields(&self) -> Vec<&Field> {
        self.context.visible_fields()
    }

    /// Set when the server asked for a refetch; cleared by [`Self::refresh`].
    pub fn needs_refresh(&self) -> bool {
        self.force_refresh
    }

    /// Table-wide index of a buffered row.
    pub fn global_index(&self, id: RecordId) -> Option<usize> {
        self.buffer.index_of(id).map(|index| self.buffer.start() + index)
    }

    fn log_fetch_timing(&self, kind: &'static str, started: Instant, rows: usize) {
        if !self.perf_log_enabled {
            return;
        }
        info!(
            target: "gridview_session::buffer_perf",
            kind,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            rows,
            start = self.buffer.start(),
            limit = self.buffer.limit(),
            count = self.buffer.count(),
            "buffer fetch timing"
        );
    }

    /// Fill view flags of fetched rows and restore the remembered selection.
    fn prepare_fetched(&self, records: &mut [Record]) {
        let reconciler = self.context.reconciler();
        for record in records.iter_mut() {
            reconciler.populate(record);
            if let Some((row, field)) = self.selected_cell {
                if record.id == row {
                    record.state.selected = true;
                    record.state.selected_field = Some(field);
                }
            }
        }
    }

    fn cancel_in_flight(&mut self) {
        if let Some(previous) = self.extend_cancel.take() {
            previous.cancel();
        }
        if let Some(previous) = self.refresh_cancel.take() {
            previous.cancel();
        }
        self.throttle.set_processing(false);
    }

    /// Load the first rows of the view, discarding all buffer state.
    ///
    /// # Errors
    /// Returns the source error; the buffer is left empty.
    pub async fn fetch_initial(&mut self, source: &dyn RecordSource) -> Result<(), GridError> {
        let started = Instant::now();
        self.cancel_in_flight();
        self.context.search = SearchState::new("", self.config.hide_rows_not_matching_search);
        self.throttle.reset(Instant::now());
        self.multi_select.clear();
        self.selected_cell = None;
        self.force_refresh = false;
        self.buffer.clear();
        self.buffer.set_phase(BufferPhase::LoadingInitial);

        let cancel = CancellationToken::new();
        self.refresh_cancel = Some(cancel.clone());
        let limit = self.buffer.chunk_size() * 2;
        let query = self.context.page_query(0, limit);
        let page = match source.fetch_page(&query, &cancel).await {
            Ok(page) => page,
            Err(err) => {
                if !err.is_cancelled() {
                    self.refresh_cancel = None;
                    self.buffer.set_phase(BufferPhase::Empty);
                }
                return Err(err);
            }
        };
        if cancel.is_cancelled() {
            return Err(GridError::Cancelled);
        }
        self.refresh_cancel = None;
        let Page {
            mut records,
            total_count,
        } = page;
        self.prepare_fetched(&mut records);
        self.buffer.replace(records, 0, total_count);
        info!(count = total_count, rows = self.buffer.limit(), "loaded initial rows");
        self.log_fetch_timing("initial", started, self.buffer.limit());
        Ok(())
    }

    /// Record a scroll position and decide whether to fetch for it now.
    pub fn on_scroll(&mut self, scroll_top: f64, now: Instant) -> ScrollDecision {
        self.buffer.set_scroll_top(scroll_top);
        self.buffer.recompute_visible();
        self.throttle.on_scroll(scroll_top, now)
    }

    /// A deferred scroll position that is due at `now`.
    pub fn poll_scroll(&mut self, now: Instant) -> Option<f64> {
        self.throttle.poll(now)
    }

    pub fn scroll_deadline(&self) -> Option<Instant> {
        self.throttle.deadline()
    }

    /// Window height changed.
    pub fn on_resize(&mut self, height: f64) {
        self.buffer.set_window_height(height);
        debug!(
            height,
            padding = self.buffer.viewport().padding,
            "window resized"
        );
    }

    /// Plan the fetch `scroll_top` needs, superseding any extension in flight.
    ///
    /// Returns `None` when the buffer already covers the desired window or
    /// the same request was just issued.
    pub fn plan_extend(&mut self, scroll_top: f64) -> Option<PendingExtend> {
        let plan = self.buffer.plan_scroll(scroll_top)?;
        if let Some(previous) = self.extend_cancel.take() {
            previous.cancel();
            debug!("superseded buffer extension");
        }
        let cancel = CancellationToken::new();
        self.extend_cancel = Some(cancel.clone());
        self.throttle.set_processing(true);
        debug!(
            offset = plan.offset,
            limit = plan.limit,
            direction = ?plan.direction,
            "planned buffer extension"
        );
        Some(PendingExtend {
            query: self.context.page_query(plan.offset, plan.limit),
            plan,
            cancel,
        })
    }

    /// Apply the page fetched for `pending`.
    ///
    /// # Errors
    /// [`GridError::Cancelled`] when a newer extension or a refresh superseded
    /// this one, otherwise the fetch error.
    pub fn complete_extend(
        &mut self,
        pending: &PendingExtend,
        result: Result<Page, GridError>,
    ) -> Result<(), GridError> {
        if pending.cancel.is_cancelled() {
            return Err(GridError::Cancelled);
        }
        self.extend_cancel = None;
        self.throttle.set_processing(false);
        match result {
            Ok(Page {
                mut records,
                total_count,
            }) => {
                self.prepare_fetched(&mut records);
                self.buffer.apply_fetch(&pending.plan, records, total_count);
                Ok(())
            }
            Err(err) => {
                self.buffer.clear_last_request();
                self.buffer.set_phase(BufferPhase::Ready);
                Err(err)
            }
        }
    }

    /// Bring the buffer in line with `scroll_top`, fetching if needed.
    ///
    /// Returns whether a fetch was made.
    ///
    /// # Errors
    /// See [`Self::complete_extend`].
    pub async fn fetch_by_scroll(
        &mut self,
        source: &dyn RecordSource,
        scroll_top: f64,
    ) -> Result<bool, GridError> {
        let Some(pending) = self.plan_extend(scroll_top) else {
            self.buffer.recompute_visible();
            return Ok(false);
        };
        let started = Instant::now();
        let result = source.fetch_page(&pending.query, &pending.cancel).await;
        self.complete_extend(&pending, result)?;
        self.log_fetch_timing("extend", started, pending.plan.limit);
        Ok(true)
    }

    /// Start a refresh, superseding an earlier one and any extension.
    pub fn begin_refresh(&mut self) -> PendingRefresh {
        self.cancel_in_flight();
        self.buffer.clear_last_request();
        self.buffer.set_phase(BufferPhase::Refreshing);
        let cancel = CancellationToken::new();
        self.refresh_cancel = Some(cancel.clone());
        PendingRefresh { cancel }
    }

    /// Offset and limit a refresh fetches once the table holds `count` rows.
    pub fn refresh_window(&self, count: usize) -> (usize, usize) {
        let limit = self.buffer.chunk_size() * 3;
        let offset = if count >= self.buffer.end() {
            self.buffer.start()
        } else {
            count.saturating_sub(limit)
        };
        (offset, limit)
    }

    /// Replace the buffer with the page a refresh fetched at `offset`.
    ///
    /// # Errors
    /// [`GridError::Cancelled`] when superseded, otherwise the fetch error.
    pub fn complete_refresh(
        &mut self,
        pending: &PendingRefresh,
        offset: usize,
        result: Result<Page, GridError>,
    ) -> Result<(), GridError> {
        if pending.cancel.is_cancelled() {
            return Err(GridError::Cancelled);
        }
        self.refresh_cancel = None;
        match result {
            Ok(Page {
                mut records,
                total_count,
            }) => {
                self.prepare_fetched(&mut records);
                self.buffer.replace(records, offset, total_count);
                self.force_refresh = false;
                Ok(())
            }
            Err(err) => {
                self.buffer.set_phase(BufferPhase::Ready);
                Err(err)
            }
        }
    }

    /// Refetch the current window after filters, sorts or search changed.
    ///
    /// # Errors
    /// [`GridError::Cancelled`] when superseded by another refresh or an
    /// initial load, otherwise the first source error.
    pub async fn refresh(&mut self, source: &dyn RecordSource) -> Result<(), GridError> {
        let started = Instant::now();
        let pending = self.begin_refresh();
        let count_query = self.context.page_query(0, 0);
        let count = match source.fetch_count(&count_query, &pending.cancel).await {
            Ok(count) => count,
            Err(err) => {
                return self.complete_refresh(&pending, 0, Err(err));
            }
        };
        if pending.cancel.is_cancelled() {
            return Err(GridError::Cancelled);
        }
        let (offset, limit) = self.refresh_window(count);
        let query = self.context.page_query(offset, limit);
        let result = source.fetch_page(&query, &pending.cancel).await;
        self.complete_refresh(&pending, offset, result)?;
        info!(
            start = self.buffer.start(),
            rows = self.buffer.limit(),
            count = self.buffer.count(),
            "refreshed rows"
        );
        self.log_fetch_timing("refresh", started, self.buffer.limit());
        self.fetch_aggregations(source).await
    }

    /// Change the search term or the hide toggle.
    ///
    /// Every buffered row's search state is recomputed. Returns whether the
    /// term sent to the source changed, in which case a refresh is due.
    pub fn set_search(&mut self, term: &str, hide_non_matching: bool) -> bool {
        let previous = self.context.search.server_term().map(str::to_string);
        self.context.search = SearchState::new(term, hide_non_matching);
        let matcher = self.context.matcher();
        for row in self.buffer.rows_mut() {
            matcher
                .search(row, &self.context.search)
                .apply_to(&mut row.state);
        }
        previous.as_deref() != self.context.search.server_term()
    }

    /// [`Self::set_search`] followed by a refresh when one is due.
    ///
    /// # Errors
    /// See [`Self::refresh`].
    pub async fn search_and_refresh(
        &mut self,
        source: &dyn RecordSource,
        term: &str,
        hide_non_matching: bool,
    ) -> Result<(), GridError> {
        if self.set_search(term, hide_non_matching) {
            self.refresh(source).await?;
        }
        Ok(())
    }

    /// Fetch `limit` rows at table index `offset` without touching the buffer.
    ///
    /// # Errors
    /// Returns the source error.
    pub async fn fetch_rows_by_index(
        &self,
        source: &dyn RecordSource,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Record>, GridError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let query = self.context.page_query(offset, limit);
        let page = source.fetch_page(&query, &CancellationToken::new()).await?;
        let mut records = page.records;
        self.prepare_fetched(&mut records);
        Ok(records)
    }
}

#[cfg(test)]
mod tests;
