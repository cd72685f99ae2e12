//! Applying record changes to the row buffer.
//!
//! Every create, update, move and delete, whether local or remote, ends up
//! here. The [`Reconciler`] decides whether the changed record belongs in the
//! view, where it sorts relative to the buffered slice, and applies the
//! smallest structural change that keeps `start`, `limit` and `count` exact.

use crate::buffer::RowBuffer;
use gridview_core::{CellValues, OrderKey, Record, RecordId, RowMatcher, SearchState};
use tracing::debug;

/// Where a record sorts relative to the buffered slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Before the first buffered row, which is not the first row of the table.
    Before,
    /// At this buffer index.
    Inside(usize),
    /// After the last buffered row, which is not the last row of the table.
    After,
}

/// What a reconciliation step did to the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing changed.
    Unchanged,
    /// The record does not belong in the view and never did.
    Ignored,
    UpdatedInPlace { index: usize },
    Moved { from: usize, to: usize },
    Inserted { index: usize },
    Removed { index: usize },
    /// Only the bookkeeping moved; no buffered row was touched.
    Boundary { start_delta: isize, count_delta: isize },
}

impl Outcome {
    /// Whether the buffered rows or counters changed.
    pub fn is_structural(&self) -> bool {
        !matches!(
            self,
            Self::Unchanged
                | Self::Ignored
                | Self::UpdatedInPlace { .. }
                | Self::Boundary {
                    start_delta: 0,
                    count_delta: 0
                }
        )
    }
}

/// Applies record changes to a [`RowBuffer`] under one view's rules.
#[derive(Clone, Copy)]
pub struct Reconciler<'a> {
    matcher: RowMatcher<'a>,
    search: &'a SearchState,
}

impl<'a> Reconciler<'a> {
    pub fn new(matcher: RowMatcher<'a>, search: &'a SearchState) -> Self {
        Self { matcher, search }
    }

    /// Whether `record` passes the view's filters and search.
    pub fn is_visible(&self, record: &Record) -> bool {
        self.matcher.is_visible(record, self.search)
    }

    /// Sorted position of `record` against the buffered rows.
    ///
    /// `count` is the table size not counting `record`. A record sorting
    /// first is only inside when the buffer starts at the top of the table;
    /// one sorting last only when the buffer reaches the bottom.
    pub fn placement(&self, buffer: &RowBuffer, record: &Record, count: usize) -> Placement {
        let rows = buffer.rows();
        let len = rows.len();
        let index = self.matcher.comparator().position_in(rows, record);
        let first = index == 0;
        let last = index == len;
        if (first && buffer.start() == 0)
            || (last && buffer.start() + len >= count)
            || (!first && !last)
        {
            Placement::Inside(index)
        } else if first {
            Placement::Before
        } else {
            Placement::After
        }
    }

    /// Recompute the filter, search and view flags of `record`.
    pub fn populate(&self, record: &mut Record) {
        self.matcher.refresh_state(record, self.search);
    }

    /// A record was created, here or elsewhere.
    pub fn created(&self, buffer: &mut RowBuffer, mut record: Record) -> Outcome {
        self.populate(&mut record);
        if !self.is_visible(&record) {
            return Outcome::Ignored;
        }
        if buffer.index_of(record.id).is_some() {
            return self.updated_known(buffer, record);
        }
        let outcome = match self.placement(buffer, &record, buffer.count()) {
            Placement::Inside(index) => {
                let index = self.make_room(buffer, &record, index);
                buffer.insert(index, record);
                Outcome::Inserted { index }
            }
            Placement::Before => {
                buffer.adjust_count(1);
                buffer.shift_start(1);
                Outcome::Boundary {
                    start_delta: 1,
                    count_delta: 1,
                }
            }
            Placement::After => {
                buffer.adjust_count(1);
                Outcome::Boundary {
                    start_delta: 0,
                    count_delta: 1,
                }
            }
        };
        debug!(outcome = ?outcome, "reconciled created row");
        outcome
    }

    /// A record was deleted.
    ///
    /// A buffered row is removed outright. Otherwise the record only affects
    /// the counters, and only if it belonged to the view.
    pub fn deleted(&self, buffer: &mut RowBuffer, record: &Record) -> Outcome {
        if let Some(index) = buffer.index_of(record.id) {
            buffer.remove(index);
            debug!(index, "reconciled deleted row");
            return Outcome::Removed { index };
        }
        if !self.is_visible(record) {
            return Outcome::Ignored;
        }
        let before = buffer.start() > 0
            && self.placement(buffer, record, buffer.count()) == Placement::Before;
        let start_delta = if before {
            buffer.shift_start(-1);
            -1
        } else {
            0
        };
        buffer.adjust_count(-1);
        Outcome::Boundary {
            start_delta,
            count_delta: -1,
        }
    }

    /// A record changed from `old` to `new`.
    ///
    /// Depending on whether either version belongs in the view this becomes a
    /// delete, a create, a reposition or an in-place update. Rows held by an
    /// open editor are updated in place and never evicted or moved.
    pub fn updated(&self, buffer: &mut RowBuffer, old: &Record, new: Record) -> Outcome {
        if buffer.index_of(new.id).is_some() {
            return self.updated_known(buffer, new);
        }
        let mut new = new;
        self.populate(&mut new);
        let old_visible = self.is_visible(old);
        let new_visible = self.is_visible(&new);
        match (old_visible, new_visible) {
            (false, false) => Outcome::Ignored,
            (true, false) => self.deleted(buffer, old),
            (false, true) => self.created(buffer, new),
            (true, true) => {
                let start_delta = if buffer.start() > 0
                    && self.placement(buffer, old, buffer.count()) == Placement::Before
                {
                    buffer.shift_start(-1);
                    -1
                } else {
                    0
                };
                let outcome = self.place_counted(buffer, new);
                match outcome {
                    Outcome::Boundary {
                        start_delta: placed,
                        ..
                    } => Outcome::Boundary {
                        start_delta: start_delta + placed,
                        count_delta: 0,
                    },
                    other => other,
                }
            }
        }
    }

    /// Update of a record currently in the buffer.
    fn updated_known(&self, buffer: &mut RowBuffer, new: Record) -> Outcome {
        let Some(index) = buffer.index_of(new.id) else {
            return Outcome::Ignored;
        };
        let Some(current) = buffer.row_at(index) else {
            return Outcome::Ignored;
        };
        let held = !current.state.selected_by.is_empty();
        let mut next = new;
        next.state = current.state.clone();
        let content_changed = !current.same_content(&next);
        self.populate(&mut next);

        let sorted = self.matcher.comparator().position_in(buffer.rows(), &next) == index;
        if !content_changed && sorted {
            return Outcome::Unchanged;
        }
        if held {
            next.state.match_sortings = sorted;
            buffer.replace_at(index, next);
            return Outcome::UpdatedInPlace { index };
        }
        if !self.is_visible(&next) {
            buffer.remove(index);
            debug!(index, "updated row left the view");
            return Outcome::Removed { index };
        }
        next.state.match_sortings = true;
        if sorted {
            buffer.replace_at(index, next);
            return Outcome::UpdatedInPlace { index };
        }
        buffer.remove_counted(index);
        match self.place_counted(buffer, next) {
            Outcome::Inserted { index: to } if to == index => Outcome::UpdatedInPlace { index },
            Outcome::Inserted { index: to } => Outcome::Moved { from: index, to },
            other => other,
        }
    }

    /// Place a record that is already part of `count` but not in the rows.
    fn place_counted(&self, buffer: &mut RowBuffer, record: Record) -> Outcome {
        let others = buffer.count().saturating_sub(1);
        match self.placement(buffer, &record, others) {
            Placement::Inside(index) => {
                let index = self.make_room(buffer, &record, index);
                if buffer.end() < buffer.count() {
                    buffer.insert_counted(index, record);
                } else {
                    buffer.insert(index, record);
                }
                Outcome::Inserted { index }
            }
            Placement::Before => {
                buffer.shift_start(1);
                Outcome::Boundary {
                    start_delta: 1,
                    count_delta: 0,
                }
            }
            Placement::After => Outcome::Boundary {
                start_delta: 0,
                count_delta: 0,
            },
        }
    }

    /// Resolve an order collision for a record about to be inserted at `index`.
    ///
    /// Shifted rows now sort before the claimant, so the position is taken
    /// again after the shift.
    fn make_room(&self, buffer: &mut RowBuffer, record: &Record, index: usize) -> usize {
        if resolve_collision(buffer, record) == 0 {
            return index;
        }
        self.matcher.comparator().position_in(buffer.rows(), record)
    }

    /// Recompute a buffered row's flags, optionally against pending values.
    ///
    /// The row is never moved; `match_sortings` records whether it would be.
    pub fn on_row_change(&self, buffer: &mut RowBuffer, id: RecordId, overrides: &CellValues) {
        let Some(index) = buffer.index_of(id) else {
            return;
        };
        let Some(current) = buffer.row_at(index) else {
            return;
        };
        let mut projected = current.clone();
        projected.merge_values(overrides);
        let match_filters = self.matcher.matches_filters(&projected);
        let search = self.matcher.search(&projected, self.search);
        let sorted = self.matcher.comparator().position_in(buffer.rows(), &projected) == index;
        if let Some(row) = buffer.get_mut(id) {
            row.state.match_filters = match_filters;
            row.state.match_sortings = sorted;
            search.apply_to(&mut row.state);
        }
    }

    /// Settle a row once nothing holds it.
    ///
    /// A row that no longer matches is evicted; one whose sorted position
    /// changed is moved there.
    pub fn refresh_row(&self, buffer: &mut RowBuffer, id: RecordId) -> Outcome {
        let Some(index) = buffer.index_of(id) else {
            return Outcome::Ignored;
        };
        let Some(current) = buffer.row_at(index) else {
            return Outcome::Ignored;
        };
        if !current.state.selected_by.is_empty() {
            return Outcome::Unchanged;
        }
        if !current.state.match_filters || !current.state.match_search {
            buffer.remove(index);
            return Outcome::Removed { index };
        }
        if current.state.match_sortings {
            return Outcome::Unchanged;
        }
        let mut record = buffer.remove_counted(index);
        record.state.match_sortings = true;
        match self.place_counted(buffer, record) {
            Outcome::Inserted { index: to } => Outcome::Moved { from: index, to },
            other => other,
        }
    }
}

/// Shift rows out of the way of a record claiming an occupied order.
///
/// When another buffered row already has `record.order`, every other row
/// whose order lies in `(floor(order), order]` moves down one epsilon step.
/// Returns the number of shifted rows.
pub fn resolve_collision(buffer: &mut RowBuffer, record: &Record) -> usize {
    let anchor: &OrderKey = &record.order;
    let collides = buffer
        .rows()
        .iter()
        .any(|row| row.id != record.id && &row.order == anchor);
    if !collides {
        return 0;
    }
    let mut shifted = 0;
    for row in buffer.rows_mut() {
        if row.id != record.id && row.order.in_collision_band(anchor) {
            row.order = row.order.step_down();
            shifted += 1;
        }
    }
    debug!(shifted, order = %anchor, "shifted colliding orders");
    shifted
}
