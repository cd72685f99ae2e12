//! Multi-cell selection and the block operations built on it.

use super::GridSession;
use crate::multi_select::CellRef;
use crate::source::{RecordSource, RecordUpdate};
use gridview_core::{CellValues, Field, GridError, Record, RecordId};
use tracing::{debug, info};

/// Rows touched by a paste.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PasteSummary {
    pub updated: usize,
    pub created: usize,
}

impl GridSession {
    /// Mouse down on a cell: start a selection at table row `row`.
    pub fn multi_select_start_at(&mut self, row: usize, field: usize) {
        self.multi_select.start(row, field);
    }

    pub fn multi_select_start(&mut self, id: RecordId, field: usize) {
        if let Some(row) = self.global_index(id) {
            self.multi_select_start_at(row, field);
        }
    }

    /// Drag over a cell. Returns false when the span would exceed the row limit.
    pub fn multi_select_hold_at(&mut self, row: usize, field: usize) -> bool {
        let extended = self.multi_select.extend(row, field);
        if extended && self.multi_select.is_active() {
            self.clear_selected_cell();
        }
        extended
    }

    pub fn multi_select_hold(&mut self, id: RecordId, field: usize) -> bool {
        match self.global_index(id) {
            Some(row) => self.multi_select_hold_at(row, field),
            None => false,
        }
    }

    pub fn multi_select_release(&mut self) {
        self.multi_select.release();
    }

    pub fn clear_multi_select(&mut self) {
        self.multi_select.clear();
    }

    /// Rows of the selected block, from the buffer when it holds them all.
    ///
    /// # Errors
    /// The source error when rows had to be fetched.
    pub async fn multi_select_rows(
        &self,
        source: &dyn RecordSource,
    ) -> Result<Vec<Record>, GridError> {
        let Some(rows) = self.multi_select.row_range() else {
            return Ok(Vec::new());
        };
        if self
            .multi_select
            .is_fully_buffered(self.buffer.start(), self.buffer.end())
        {
            return Ok(rows
                .filter_map(|row| self.buffer.row_at_global(row).cloned())
                .collect());
        }
        let (first, last) = (*rows.start(), *rows.end());
        debug!(first, last, "fetching selected rows outside the buffer");
        self.fetch_rows_by_index(source, first, last - first + 1)
            .await
    }

    /// Visible fields covered by the selection, cloned.
    fn selected_fields(&self) -> Vec<Field> {
        let Some(range) = self.multi_select.field_range() else {
            return Vec::new();
        };
        self.context
            .visible_fields()
            .into_iter()
            .skip(*range.start())
            .take(range.end() - range.start() + 1)
            .cloned()
            .collect()
    }

    /// Copy text of the selected block, row by row.
    ///
    /// # Errors
    /// The source error when rows had to be fetched.
    pub async fn export_selected(
        &self,
        source: &dyn RecordSource,
    ) -> Result<Vec<Vec<String>>, GridError> {
        if !self.multi_select.is_active() {
            return Ok(Vec::new());
        }
        let fields = self.selected_fields();
        let rows = self.multi_select_rows(source).await?;
        let registry = &self.context.registry;
        Ok(rows
            .iter()
            .map(|row| {
                fields
                    .iter()
                    .map(|field| {
                        registry
                            .for_field(field)
                            .map(|field_type| field_type.prepare_for_copy(field, row.value(field.id)))
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect())
    }

    /// Delete every row of the selected block.
    ///
    /// Returns the number of deleted rows.
    ///
    /// # Errors
    /// The source error; nothing is removed locally then.
    pub async fn delete_selected(&mut self, source: &dyn RecordSource) -> Result<usize, GridError> {
        if !self.multi_select.is_active() {
            return Ok(0);
        }
        let rows = self.multi_select_rows(source).await?;
        let ids: Vec<RecordId> = rows.iter().map(|row| row.id).collect();
        source.batch_delete(&ids).await?;
        let reconciler = self.context.reconciler();
        for row in &rows {
            reconciler.deleted(&mut self.buffer, row);
        }
        if self
            .selected_cell
            .is_some_and(|(selected, _)| ids.contains(&selected))
        {
            self.selected_cell = None;
        }
        self.multi_select.clear();
        self.buffer.recompute_visible();
        info!(rows = ids.len(), "deleted selected rows");
        self.refresh_aggregations_quietly(source).await;
        Ok(ids.len())
    }

    /// Paste a block of clipboard text with its top-left cell at `anchor`,
    /// or at the selection head.
    ///
    /// The selection grows to cover the pasted cells. Lines running past the
    /// end of the table become new rows when `create_remainder_by` names a
    /// column that is non-empty on that line.
    ///
    /// # Errors
    /// [`GridError::BadRequest`] without a target cell; otherwise the source
    /// error.
    pub async fn paste(
        &mut self,
        source: &dyn RecordSource,
        data: &[Vec<String>],
        anchor: Option<CellRef>,
        create_remainder_by: Option<usize>,
    ) -> Result<PasteSummary, GridError> {
        let Some(width) = data.first().map(Vec::len).filter(|width| *width > 0) else {
            return Ok(PasteSummary::default());
        };
        let head = anchor
            .or_else(|| self.multi_select.head())
            .ok_or_else(|| GridError::BadRequest("no cell to paste into".to_string()))?;
        let count = self.buffer.count();
        let field_count = self.context.visible_fields().len();
        if head.row >= count || head.field >= field_count {
            return Ok(PasteSummary::default());
        }
        let row_limit = self.multi_select.row_limit().max(1);
        let row_tail = (head.row + data.len()).min(count).min(head.row + row_limit) - 1;
        let field_tail = (head.field + width).min(field_count) - 1;
        self.multi_select
            .select_block(head, CellRef::new(row_tail, field_tail));
        self.clear_selected_cell();

        let fields = self.selected_fields();
        let registry = &self.context.registry;
        let writable = fields.iter().any(|field| {
            registry
                .for_field(field)
                .is_some_and(|field_type| !field_type.is_read_only())
        });
        if !writable {
            return Ok(PasteSummary::default());
        }

        let targets = self.multi_select_rows(source).await?;
        let line_values = |line: &[String]| {
            let mut values = CellValues::new();
            for (offset, field) in fields.iter().enumerate() {
                let Some(field_type) = registry.for_field(field) else {
                    continue;
                };
                if field_type.is_read_only() {
                    continue;
                }
                let raw = line.get(offset).map(String::as_str).unwrap_or_default();
                let pasted = field_type.prepare_for_paste(field, raw);
                values.insert(field.id, field_type.prepare_for_update(field, &pasted));
            }
            values
        };
        let updates: Vec<RecordUpdate> = targets
            .iter()
            .zip(data)
            .map(|(row, line)| RecordUpdate {
                id: row.id,
                values: line_values(line),
            })
            .collect();
        let updated = source.batch_update(&updates).await?;

        let reconciler = self.context.reconciler();
        for old in &targets {
            if let Some(new) = updated.iter().find(|record| record.id == old.id) {
                reconciler.updated(&mut self.buffer, old, new.clone());
            }
        }

        let mut summary = PasteSummary {
            updated: updated.len(),
            created: 0,
        };
        if let Some(column) = create_remainder_by {
            let pasted_rows = row_tail - head.row + 1;
            let reaches_end = row_tail + 1 == count;
            let remainder: Vec<CellValues> = data
                .iter()
                .skip(pasted_rows)
                .filter(|line| {
                    reaches_end
                        && line
                            .get(column)
                            .is_some_and(|value| !value.trim().is_empty())
                })
                .map(|line| line_values(line))
                .collect();
            if !remainder.is_empty() {
                let created = source.batch_create(&remainder).await?;
                for record in created {
                    reconciler.created(&mut self.buffer, record);
                    summary.created += 1;
                }
            }
        }
        self.buffer.recompute_visible();
        info!(
            updated = summary.updated,
            created = summary.created,
            "pasted block"
        );
        self.refresh_aggregations_quietly(source).await;
        Ok(summary)
    }
}
