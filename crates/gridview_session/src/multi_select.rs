//! Rectangular multi-cell selection.
//!
//! Rows are global indices into the view's ordering, fields are indices into
//! the visible field list. The row span is capped because the server rejects
//! batch requests touching more rows than that.

use std::ops::RangeInclusive;

/// One corner of the selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRef {
    pub row: usize,
    pub field: usize,
}

impl CellRef {
    pub fn new(row: usize, field: usize) -> Self {
        Self { row, field }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiSelect {
    head: Option<CellRef>,
    tail: Option<CellRef>,
    /// The pointer is down and moves extend the selection.
    holding: bool,
    /// The selection spans more than the starting cell.
    active: bool,
    row_limit: usize,
}

impl MultiSelect {
    pub fn new(row_limit: usize) -> Self {
        Self {
            head: None,
            tail: None,
            holding: false,
            active: false,
            row_limit: row_limit.max(1),
        }
    }

    pub fn head(&self) -> Option<CellRef> {
        self.head
    }

    pub fn tail(&self) -> Option<CellRef> {
        self.tail
    }

    pub fn is_holding(&self) -> bool {
        self.holding
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn row_limit(&self) -> usize {
        self.row_limit
    }

    /// Begin a selection at one cell.
    pub fn start(&mut self, row: usize, field: usize) {
        self.clear();
        let cell = CellRef::new(row, field);
        self.head = Some(cell);
        self.tail = Some(cell);
        self.holding = true;
        self.active = false;
    }

    /// Move the tail while holding; returns whether the tail was accepted.
    pub fn extend(&mut self, row: usize, field: usize) -> bool {
        if !self.holding {
            return false;
        }
        self.active = true;
        self.set_tail(row, field)
    }

    pub fn release(&mut self) {
        self.holding = false;
    }

    /// Select the block spanned by `head` and `tail` directly, as a paste does.
    pub fn select_block(&mut self, head: CellRef, tail: CellRef) -> bool {
        self.head = Some(head);
        self.tail = Some(head);
        self.active = true;
        self.set_tail(tail.row, tail.field)
    }

    /// Drop the selection entirely.
    pub fn clear(&mut self) {
        self.head = None;
        self.tail = None;
        self.holding = false;
        self.active = false;
    }

    fn set_tail(&mut self, row: usize, field: usize) -> bool {
        let Some(head) = self.head else {
            return false;
        };
        if head.row.abs_diff(row) > self.row_limit - 1 {
            return false;
        }
        self.tail = Some(CellRef::new(row, field));
        true
    }

    /// Selected rows, lowest first.
    pub fn row_range(&self) -> Option<RangeInclusive<usize>> {
        let (head, tail) = self.head.zip(self.tail)?;
        Some(head.row.min(tail.row)..=head.row.max(tail.row))
    }

    /// Selected field indices, lowest first.
    pub fn field_range(&self) -> Option<RangeInclusive<usize>> {
        let (head, tail) = self.head.zip(self.tail)?;
        Some(head.field.min(tail.field)..=head.field.max(tail.field))
    }

    pub fn contains(&self, row: usize, field: usize) -> bool {
        self.active
            && self.row_range().is_some_and(|rows| rows.contains(&row))
            && self.field_range().is_some_and(|fields| fields.contains(&field))
    }

    /// Whether every selected row lies in the buffered slice `[start, end)`.
    pub fn is_fully_buffered(&self, start: usize, end: usize) -> bool {
        self.row_range()
            .is_some_and(|rows| *rows.start() >= start && *rows.end() < end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_selects_a_single_inactive_cell() {
        let mut select = MultiSelect::new(200);
        select.start(4, 2);
        assert!(select.is_holding());
        assert!(!select.is_active());
        assert_eq!(select.row_range(), Some(4..=4));
        assert!(!select.contains(4, 2));
    }

    #[test]
    fn extend_only_while_holding() {
        let mut select = MultiSelect::new(200);
        select.start(4, 2);
        assert!(select.extend(1, 0));
        assert!(select.is_active());
        assert_eq!(select.row_range(), Some(1..=4));
        assert_eq!(select.field_range(), Some(0..=2));
        assert!(select.contains(3, 1));

        select.release();
        assert!(!select.extend(9, 9));
        assert_eq!(select.tail(), Some(CellRef::new(1, 0)));
    }

    #[test]
    fn tail_beyond_the_row_limit_is_rejected() {
        let mut select = MultiSelect::new(200);
        select.start(10, 0);
        assert!(select.extend(100, 1));
        assert!(!select.extend(215, 1));
        assert_eq!(select.tail(), Some(CellRef::new(100, 1)));
        assert!(select.extend(209, 1));
        assert!(!select.extend(210, 1));
        assert_eq!(select.row_range(), Some(10..=209));
    }

    #[test]
    fn buffered_check_uses_both_endpoints() {
        let mut select = MultiSelect::new(200);
        select.start(45, 0);
        select.extend(50, 0);
        assert!(select.is_fully_buffered(40, 80));
        assert!(!select.is_fully_buffered(46, 80));
        assert!(!select.is_fully_buffered(40, 50));
        select.clear();
        assert!(!select.is_fully_buffered(0, 100));
    }

    #[test]
    fn select_block_marks_the_range_active() {
        let mut select = MultiSelect::new(200);
        assert!(select.select_block(CellRef::new(3, 1), CellRef::new(5, 2)));
        assert!(select.is_active());
        assert!(!select.is_holding());
        assert_eq!(select.row_range(), Some(3..=5));
    }
}
