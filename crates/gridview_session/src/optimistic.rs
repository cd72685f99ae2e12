//! Optimistic mutation support.
//!
//! Local edits are applied before the server confirms them. The rows touched
//! are captured first as pre-images; if the request fails, the pre-images are
//! written back verbatim and the error is passed on.

use crate::buffer::RowBuffer;
use gridview_core::{GridError, Record, RecordId};
use std::future::Future;
use tracing::warn;

/// Captured state of rows before an optimistic change.
#[derive(Clone, Debug, Default)]
pub struct PreImages {
    rows: Vec<Record>,
}

impl PreImages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `record` as it is now; later captures of the same row are ignored.
    pub fn capture(&mut self, record: &Record) {
        if !self.rows.iter().any(|row| row.id == record.id) {
            self.rows.push(record.clone());
        }
    }

    /// Capture the buffered row `id`, if present.
    pub fn capture_from(&mut self, buffer: &RowBuffer, id: RecordId) {
        if let Some(record) = buffer.get(id) {
            self.capture(record);
        }
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.rows.iter().find(|row| row.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Write order and values of every captured row still buffered back.
    ///
    /// View state stays as it is now. Returns the number of restored rows.
    pub fn restore(&self, buffer: &mut RowBuffer) -> usize {
        let mut restored = 0;
        for pre in &self.rows {
            if let Some(row) = buffer.get_mut(pre.id) {
                row.order = pre.order.clone();
                row.values = pre.values.clone();
                restored += 1;
            }
        }
        restored
    }

    pub fn into_records(self) -> Vec<Record> {
        self.rows
    }
}

/// Await `request`; on failure hand `pre_image` to `rollback` and return the error.
///
/// Cancellation is passed through without rolling back, since a superseding
/// request owns the state from then on.
pub async fn settle<T, P, Fut, R>(request: Fut, pre_image: P, rollback: R) -> Result<T, GridError>
where
    Fut: Future<Output = Result<T, GridError>>,
    R: FnOnce(P),
{
    match request.await {
        Ok(value) => Ok(value),
        Err(err) if err.is_cancelled() => Err(err),
        Err(err) => {
            warn!(error = %err, "optimistic change rejected; rolling back");
            rollback(pre_image);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridview_core::test_support::{numbered_records, order, NAME_FIELD};
    use gridview_core::{CellValue, GridConfig};

    fn buffer() -> RowBuffer {
        let mut buffer = RowBuffer::new(&GridConfig::default());
        buffer.replace(numbered_records(3), 0, 3);
        buffer
    }

    #[test]
    fn restore_writes_back_the_first_capture() {
        let mut buffer = buffer();
        let id = RecordId::from(2);
        let mut pre = PreImages::new();
        pre.capture_from(&buffer, id);
        if let Some(row) = buffer.get_mut(id) {
            row.set_value(NAME_FIELD, CellValue::text("changed"));
            row.order = order("9");
            row.state.selected = true;
        }
        pre.capture_from(&buffer, id);
        assert_eq!(pre.len(), 1);

        assert_eq!(pre.restore(&mut buffer), 1);
        let row = buffer.get(id).expect("row");
        assert_eq!(row.value(NAME_FIELD), &CellValue::text("row 2"));
        assert_eq!(row.order.to_string(), "2");
        assert!(row.state.selected);
    }

    #[tokio::test]
    async fn settle_rolls_back_only_on_failure() {
        let mut rolled_back = Vec::new();
        let ok: Result<u32, GridError> = settle(async { Ok(1) }, "a", |p| rolled_back.push(p)).await;
        assert_eq!(ok.expect("ok"), 1);

        let failed: Result<u32, GridError> = settle(
            async { Err(GridError::Transport("down".to_string())) },
            "b",
            |p| rolled_back.push(p),
        )
        .await;
        assert!(failed.is_err());

        let cancelled: Result<u32, GridError> =
            settle(async { Err(GridError::Cancelled) }, "c", |p| rolled_back.push(p)).await;
        assert!(cancelled.expect_err("cancelled").is_cancelled());
        assert_eq!(rolled_back, vec!["b"]);
    }
}
