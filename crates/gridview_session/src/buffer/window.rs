//! Window arithmetic: which global rows should be buffered and rendered.
//!
//! All functions here are pure. Indices are global positions in the
//! server-side ordering unless stated otherwise.

use std::ops::Range;

/// Geometry inputs shared by the window computations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub scroll_top: f64,
    pub window_height: f64,
    pub row_height: f64,
    /// Rows rendered above and below the middle row.
    pub padding: usize,
}

impl Viewport {
    /// Global index of the row under the vertical centre of the window,
    /// clamped to `[0, count - 1]`.
    pub fn middle_row(&self, count: usize) -> usize {
        if count == 0 || self.row_height <= 0.0 {
            return 0;
        }
        let middle_px = self.scroll_top + self.window_height / 2.0;
        let row = ((middle_px / self.row_height).ceil() - 1.0).max(0.0);
        // Saturating float to int conversion.
        (row as usize).min(count - 1)
    }
}

/// The global range to buffer for the current viewport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DesiredWindow {
    pub visible_start: usize,
    /// Inclusive upper bound of the visible range.
    pub visible_end: usize,
    pub buffer_start: usize,
    /// Exclusive.
    pub buffer_end: usize,
}

impl DesiredWindow {
    pub fn buffer_limit(&self) -> usize {
        self.buffer_end - self.buffer_start
    }
}

/// Compute the desired buffer for `viewport` over `count` rows.
///
/// The visible range is `middle ± padding`. The buffer range is that range
/// snapped outward to multiples of `chunk` with one extra chunk on each side,
/// clamped to `[0, count)`.
pub fn desired_window(viewport: &Viewport, chunk: usize, count: usize) -> DesiredWindow {
    if count == 0 {
        return DesiredWindow {
            visible_start: 0,
            visible_end: 0,
            buffer_start: 0,
            buffer_end: 0,
        };
    }
    let chunk = chunk.max(1);
    let middle = viewport.middle_row(count);
    let visible_start = middle.saturating_sub(viewport.padding);
    let visible_end = (middle + viewport.padding).min(count - 1);
    let buffer_start = visible_start.div_ceil(chunk).saturating_sub(1) * chunk;
    let buffer_end = ((visible_end.div_ceil(chunk) + 1) * chunk).min(count);
    DesiredWindow {
        visible_start,
        visible_end,
        buffer_start,
        buffer_end,
    }
}

/// Direction of a buffer extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollDirection {
    Down,
    Up,
}

/// Rows to fetch and how to splice them into the buffer.
///
/// `prepend` and `append` are signed: a positive amount adds that many
/// fetched rows on that side, a negative amount trims that many rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchPlan {
    pub direction: ScrollDirection,
    pub prepend: isize,
    pub append: isize,
    pub offset: usize,
    pub limit: usize,
    pub new_start: usize,
    pub new_limit: usize,
}

fn signed(value: usize) -> isize {
    isize::try_from(value).unwrap_or(isize::MAX)
}

/// Plan the minimal fetch moving the buffer `[start, start + limit)` toward `desired`.
///
/// Returns `None` when the desired range needs no new rows. When scrolling
/// down while the desired start lies before the current start, the current
/// start is kept; the next scroll event extends upward if still needed.
pub fn plan_fetch(start: usize, limit: usize, desired: &DesiredWindow) -> Option<FetchPlan> {
    let end = start + limit;
    let down = desired.buffer_start > start || desired.buffer_end > end;
    let up = desired.buffer_start < start || desired.buffer_end < end;

    let plan = if down {
        let new_start = desired.buffer_start.max(start);
        let new_limit = desired.buffer_end.saturating_sub(new_start);
        let prepend = (signed(start) - signed(new_start)).max(-signed(limit));
        let append = (signed(desired.buffer_end) - signed(end)).min(signed(new_limit));
        FetchPlan {
            direction: ScrollDirection::Down,
            prepend,
            append,
            offset: end.max(new_start),
            limit: usize::try_from(append).unwrap_or(0),
            new_start,
            new_limit,
        }
    } else if up {
        let new_limit = desired.buffer_limit();
        let prepend = (signed(start) - signed(desired.buffer_start)).min(signed(new_limit));
        let append = (signed(desired.buffer_end) - signed(end)).max(-signed(limit));
        FetchPlan {
            direction: ScrollDirection::Up,
            prepend,
            append,
            offset: desired.buffer_start,
            limit: usize::try_from(prepend).unwrap_or(0),
            new_start: desired.buffer_start,
            new_limit,
        }
    } else {
        return None;
    };
    (plan.limit > 0).then_some(plan)
}

/// The sub-slice of the buffer to render, and its pixel offset.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VisibleSlice {
    /// Buffer-relative start, inclusive.
    pub rows_start: usize,
    /// Buffer-relative end, exclusive.
    pub rows_end: usize,
    /// Pixel offset of the first rendered row from the top of the table.
    pub rows_top: f64,
}

impl VisibleSlice {
    pub fn range(&self) -> Range<usize> {
        self.rows_start..self.rows_end
    }
}

/// Compute which buffered rows are on screen.
pub fn visible_slice(
    viewport: &Viewport,
    count: usize,
    buffer_start: usize,
    buffer_limit: usize,
) -> VisibleSlice {
    let buffer_end = buffer_start + buffer_limit;
    let middle = viewport.middle_row(count);
    let visible_start = middle.saturating_sub(viewport.padding);
    let visible_end = (middle + viewport.padding + 1).min(count);

    let rows_start = visible_start.max(buffer_start).min(buffer_end) - buffer_start;
    let rows_end = visible_end.min(buffer_end).max(buffer_start) - buffer_start;
    VisibleSlice {
        rows_start,
        rows_end: rows_end.max(rows_start),
        rows_top: visible_start.min(buffer_end) as f64 * viewport.row_height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(scroll_top: f64) -> Viewport {
        Viewport {
            scroll_top,
            window_height: 660.0,
            row_height: 33.0,
            padding: 16,
        }
    }

    #[test]
    fn middle_row_is_clamped_to_count() {
        assert_eq!(viewport(0.0).middle_row(1000), 9);
        assert_eq!(viewport(16_203.0).middle_row(1000), 500);
        assert_eq!(viewport(1.0e9).middle_row(1000), 999);
        assert_eq!(viewport(0.0).middle_row(0), 0);
    }

    #[test]
    fn desired_window_snaps_to_chunks_with_slack() {
        let desired = desired_window(&viewport(16_203.0), 40, 1000);
        assert_eq!(desired.visible_start, 484);
        assert_eq!(desired.visible_end, 516);
        assert_eq!(desired.buffer_start, 480);
        assert_eq!(desired.buffer_end, 560);

        let top = desired_window(&viewport(0.0), 40, 1000);
        assert_eq!((top.buffer_start, top.buffer_end), (0, 80));

        let bottom = desired_window(&viewport(1.0e9), 40, 1000);
        assert_eq!((bottom.buffer_start, bottom.buffer_end), (960, 1000));
    }

    #[test]
    fn jump_down_replaces_whole_buffer() {
        let desired = desired_window(&viewport(16_203.0), 40, 1000);
        let plan = plan_fetch(0, 80, &desired).expect("plan");
        assert_eq!(plan.direction, ScrollDirection::Down);
        assert_eq!((plan.offset, plan.limit), (480, 80));
        assert_eq!((plan.prepend, plan.append), (-80, 80));
        assert_eq!((plan.new_start, plan.new_limit), (480, 80));
    }

    #[test]
    fn overlapping_scroll_down_fetches_only_missing_slice() {
        let desired = DesiredWindow {
            visible_start: 56,
            visible_end: 88,
            buffer_start: 40,
            buffer_end: 120,
        };
        let plan = plan_fetch(0, 80, &desired).expect("plan");
        assert_eq!((plan.offset, plan.limit), (80, 40));
        assert_eq!((plan.prepend, plan.append), (-40, 40));
        assert_eq!((plan.new_start, plan.new_limit), (40, 80));
    }

    #[test]
    fn scroll_down_never_extends_upward() {
        let desired = DesiredWindow {
            visible_start: 30,
            visible_end: 110,
            buffer_start: 0,
            buffer_end: 160,
        };
        let plan = plan_fetch(40, 80, &desired).expect("plan");
        assert_eq!(plan.prepend, 0);
        assert_eq!((plan.offset, plan.limit), (120, 40));
        assert_eq!((plan.new_start, plan.new_limit), (40, 120));
    }

    #[test]
    fn overlapping_scroll_up_prepends_and_trims_tail() {
        let desired = DesiredWindow {
            visible_start: 456,
            visible_end: 488,
            buffer_start: 440,
            buffer_end: 520,
        };
        let plan = plan_fetch(480, 80, &desired).expect("plan");
        assert_eq!(plan.direction, ScrollDirection::Up);
        assert_eq!((plan.offset, plan.limit), (440, 40));
        assert_eq!((plan.prepend, plan.append), (40, -40));
    }

    #[test]
    fn unchanged_or_shrinking_window_needs_no_fetch() {
        let desired = DesiredWindow {
            visible_start: 0,
            visible_end: 30,
            buffer_start: 0,
            buffer_end: 80,
        };
        assert!(plan_fetch(0, 80, &desired).is_none());
        let smaller = DesiredWindow {
            buffer_end: 40,
            ..desired
        };
        assert!(plan_fetch(0, 80, &smaller).is_none());
    }

    #[test]
    fn visible_slice_is_relative_to_buffer() {
        let slice = visible_slice(&viewport(16_203.0), 1000, 480, 80);
        assert_eq!(slice.range(), 4..37);
        assert_eq!(slice.rows_top, 484.0 * 33.0);

        // Buffer entirely above the visible rows.
        let stale = visible_slice(&viewport(16_203.0), 1000, 0, 80);
        assert_eq!(stale.range(), 80..80);

        let empty = visible_slice(&viewport(0.0), 0, 0, 0);
        assert_eq!(empty.range(), 0..0);
    }
}
