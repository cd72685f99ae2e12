//! The windowed row buffer.
//!
//! A [`RowBuffer`] holds a contiguous slice `[start, start + limit)` of the
//! server-side ordering together with the total `count` of matching rows. The
//! limit is always the number of rows held, so the bookkeeping cannot drift
//! from the data. Structural changes go through the methods here; the
//! reconciliation engine decides which ones to apply.

pub mod scroll;
pub mod window;

use gridview_core::{GridConfig, OrderKey, Record, RecordId};
use tracing::debug;
use window::{FetchPlan, ScrollDirection, VisibleSlice, Viewport};

/// Lifecycle of the buffer within one view session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BufferPhase {
    #[default]
    Empty,
    LoadingInitial,
    Ready,
    Extending,
    Refreshing,
}

/// Windowed cache of records backed by a paged source.
#[derive(Debug)]
pub struct RowBuffer {
    rows: Vec<Record>,
    start: usize,
    count: usize,
    phase: BufferPhase,
    viewport: Viewport,
    chunk: usize,
    visible: VisibleSlice,
    last_request: Option<(usize, usize)>,
}

impl RowBuffer {
    pub fn new(config: &GridConfig) -> Self {
        Self {
            rows: Vec::new(),
            start: 0,
            count: 0,
            phase: BufferPhase::Empty,
            viewport: Viewport {
                scroll_top: 0.0,
                window_height: 0.0,
                row_height: config.row_height,
                padding: config.row_padding,
            },
            chunk: config.buffer_request_size.max(1),
            visible: VisibleSlice::default(),
            last_request: None,
        }
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Global index of the first buffered row.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Number of buffered rows.
    pub fn limit(&self) -> usize {
        self.rows.len()
    }

    /// Global index one past the last buffered row.
    pub fn end(&self) -> usize {
        self.start + self.rows.len()
    }

    /// Total rows matching the view on the server.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn phase(&self) -> BufferPhase {
        self.phase
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn visible(&self) -> VisibleSlice {
        self.visible
    }

    /// Rows currently rendered.
    pub fn visible_rows(&self) -> &[Record] {
        let range = self.visible.range();
        let end = range.end.min(self.rows.len());
        let start = range.start.min(end);
        &self.rows[start..end]
    }

    pub fn window_top_offset(&self) -> f64 {
        self.visible.rows_top
    }

    /// Height of the full table, used to size the scroll area.
    pub fn placeholder_height(&self) -> f64 {
        self.count as f64 * self.viewport.row_height
    }

    pub fn index_of(&self, id: RecordId) -> Option<usize> {
        self.rows.iter().position(|row| row.id == id)
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.rows.iter().find(|row| row.id == id)
    }

    pub fn get_mut(&mut self, id: RecordId) -> Option<&mut Record> {
        self.rows.iter_mut().find(|row| row.id == id)
    }

    pub fn row_at(&self, index: usize) -> Option<&Record> {
        self.rows.get(index)
    }

    /// Record at a global index, when buffered.
    pub fn row_at_global(&self, global: usize) -> Option<&Record> {
        global
            .checked_sub(self.start)
            .and_then(|local| self.rows.get(local))
    }

    /// Highest order key among the buffered rows, or zero.
    pub fn highest_order(&self) -> OrderKey {
        gridview_core::ordering::highest(self.rows.iter().map(|row| &row.order))
    }

    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut Record> {
        self.rows.iter_mut()
    }

    /// Whether the buffer reaches the first row of the table.
    pub fn touches_start(&self) -> bool {
        self.start == 0
    }

    /// Whether the buffer reaches the last row of the table.
    pub fn touches_end(&self) -> bool {
        self.end() >= self.count
    }

    pub(crate) fn set_phase(&mut self, phase: BufferPhase) {
        self.phase = phase;
    }

    /// Replace all rows and bookkeeping at once.
    pub fn replace(&mut self, rows: Vec<Record>, start: usize, count: usize) {
        self.rows = rows;
        self.count = count;
        self.start = start.min(count);
        self.truncate_to_count();
        self.last_request = None;
        self.phase = BufferPhase::Ready;
        self.recompute_visible();
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.start = 0;
        self.count = 0;
        self.last_request = None;
        self.visible = VisibleSlice::default();
        self.phase = BufferPhase::Empty;
    }

    pub fn set_scroll_top(&mut self, scroll_top: f64) {
        self.viewport.scroll_top = scroll_top.max(0.0);
    }

    /// Apply a new window height; padding becomes half the rows that fit.
    pub fn set_window_height(&mut self, height: f64) {
        self.viewport.window_height = height.max(0.0);
        if self.viewport.row_height > 0.0 {
            let rows = self.viewport.window_height / self.viewport.row_height / 2.0;
            self.viewport.padding = rows.ceil() as usize;
        }
        self.recompute_visible();
    }

    /// Recompute the rendered slice; returns whether it changed.
    pub fn recompute_visible(&mut self) -> bool {
        let next = window::visible_slice(&self.viewport, self.count, self.start, self.rows.len());
        if next == self.visible {
            return false;
        }
        self.visible = next;
        true
    }

    /// Plan the fetch needed for `scroll_top`.
    ///
    /// Returns `None` if nothing is missing or the same request was already
    /// issued. Otherwise the request is remembered until it completes.
    pub fn plan_scroll(&mut self, scroll_top: f64) -> Option<FetchPlan> {
        self.set_scroll_top(scroll_top);
        let desired = window::desired_window(&self.viewport, self.chunk, self.count);
        let plan = window::plan_fetch(self.start, self.rows.len(), &desired)?;
        if self.last_request == Some((plan.offset, plan.limit)) {
            return None;
        }
        self.last_request = Some((plan.offset, plan.limit));
        self.phase = BufferPhase::Extending;
        debug!(
            offset = plan.offset,
            limit = plan.limit,
            direction = ?plan.direction,
            "planned buffer extension"
        );
        Some(plan)
    }

    /// Forget the remembered request so an identical one may be issued again.
    pub fn clear_last_request(&mut self) {
        self.last_request = None;
        if self.phase == BufferPhase::Extending {
            self.phase = BufferPhase::Ready;
        }
    }

    /// Splice a completed extension fetch into the buffer.
    ///
    /// Positive `prepend`/`append` amounts take rows from `fetched`; negative
    /// amounts trim that many rows from the respective side. A short page
    /// (the table shrank meanwhile) is applied as far as it goes.
    pub fn apply_fetch(&mut self, plan: &FetchPlan, fetched: Vec<Record>, count: usize) {
        let fetched_len = fetched.len();
        match plan.direction {
            ScrollDirection::Down => {
                self.trim_front(plan.prepend);
                self.trim_back(plan.append);
                if plan.append > 0 {
                    let take = usize::try_from(plan.append).unwrap_or(0).min(fetched_len);
                    if self.rows.is_empty() {
                        self.start = plan.offset;
                    }
                    self.rows.extend(fetched.into_iter().take(take));
                }
            }
            ScrollDirection::Up => {
                self.trim_back(plan.append);
                self.trim_front(plan.prepend);
                if plan.prepend > 0 {
                    let take = usize::try_from(plan.prepend).unwrap_or(0).min(fetched_len);
                    let mut merged: Vec<Record> = fetched.into_iter().take(take).collect();
                    if self.rows.is_empty() {
                        self.start = plan.offset;
                    } else {
                        self.start = self.start.saturating_sub(merged.len());
                    }
                    merged.append(&mut self.rows);
                    self.rows = merged;
                }
            }
        }
        self.count = count;
        self.truncate_to_count();
        self.last_request = None;
        self.phase = BufferPhase::Ready;
        self.recompute_visible();
    }

    fn trim_front(&mut self, amount: isize) {
        if amount < 0 {
            let trim = amount.unsigned_abs().min(self.rows.len());
            self.rows.drain(..trim);
            self.start += trim;
        }
    }

    fn trim_back(&mut self, amount: isize) {
        if amount < 0 {
            let keep = self.rows.len().saturating_sub(amount.unsigned_abs());
            self.rows.truncate(keep);
        }
    }

    fn truncate_to_count(&mut self) {
        if self.start > self.count {
            self.start = self.count;
        }
        let room = self.count - self.start;
        self.rows.truncate(room);
    }

    pub(crate) fn insert(&mut self, index: usize, record: Record) {
        let index = index.min(self.rows.len());
        self.rows.insert(index, record);
        self.count += 1;
    }

    /// Insert a record that was already counted.
    pub(crate) fn insert_counted(&mut self, index: usize, record: Record) {
        let index = index.min(self.rows.len());
        self.rows.insert(index, record);
    }

    pub(crate) fn remove(&mut self, index: usize) -> Record {
        self.count = self.count.saturating_sub(1);
        self.rows.remove(index)
    }

    /// Remove a record without touching the count.
    pub(crate) fn remove_counted(&mut self, index: usize) -> Record {
        self.rows.remove(index)
    }

    pub(crate) fn replace_at(&mut self, index: usize, record: Record) {
        if let Some(slot) = self.rows.get_mut(index) {
            *slot = record;
        }
    }

    /// Move the window without touching rows; it never passes the count.
    pub(crate) fn shift_start(&mut self, delta: isize) {
        let max_start = self.count.saturating_sub(self.rows.len());
        self.start = self.start.saturating_add_signed(delta).min(max_start);
    }

    /// Shift the total count; it never drops below the buffered end.
    pub(crate) fn adjust_count(&mut self, delta: isize) {
        self.count = self.count.saturating_add_signed(delta).max(self.end());
    }

    /// Whether the window bookkeeping is internally consistent.
    pub fn is_consistent(&self) -> bool {
        let visible = self.visible.range();
        self.end() <= self.count
            && visible.start <= visible.end
            && visible.end <= self.rows.len()
    }
}

#[cfg(test)]
mod tests;
