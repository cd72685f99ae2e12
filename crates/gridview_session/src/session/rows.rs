//! Single-row operations: create, edit, move, delete, selection holds.

use super::GridSession;
use crate::optimistic::{settle, PreImages};
use crate::reconcile::{resolve_collision, Outcome};
use crate::source::RecordSource;
use gridview_core::ordering::{self, between};
use gridview_core::{
    CellValue, CellValues, Field, FieldId, GridError, OrderKey, Record, RecordId,
};
use serde_json::Value;
use tracing::{debug, info, warn};

impl GridSession {
    /// Create a row before `before`, or after every row.
    ///
    /// The row shows up immediately under a temporary id with an estimated
    /// order, and takes the server's id and order once created.
    ///
    /// # Errors
    /// [`GridError::UnknownRecord`] if `before` is not buffered; otherwise
    /// the source error, after the optimistic row was withdrawn.
    pub async fn create_row(
        &mut self,
        source: &dyn RecordSource,
        before: Option<RecordId>,
        values: &CellValues,
    ) -> Result<RecordId, GridError> {
        let mut local_values = CellValues::new();
        let mut request_values = CellValues::new();
        for field in self.context.fields.all() {
            let Some(field_type) = self.context.registry.for_field(field) else {
                continue;
            };
            let value = values
                .get(&field.id)
                .cloned()
                .unwrap_or_else(|| field_type.empty_value(field));
            if !field_type.is_read_only() {
                request_values.insert(field.id, field_type.prepare_for_update(field, &value));
            }
            local_values.insert(field.id, value);
        }

        let (order, index) = match before {
            Some(before_id) => {
                let index = self
                    .buffer
                    .index_of(before_id)
                    .ok_or_else(|| GridError::UnknownRecord(before_id.to_string()))?;
                (self.order_before(index, None), Some(index))
            }
            None => {
                let order = OrderKey::after_highest(&self.buffer.highest_order());
                let index = self.buffer.touches_end().then(|| self.buffer.limit());
                (order, index)
            }
        };

        let temporary = RecordId::temporary();
        let mut record = Record::new(temporary, order);
        record.values = local_values;
        record.state.loading = true;
        self.context.reconciler().populate(&mut record);
        match index {
            Some(index) => {
                resolve_collision(&mut self.buffer, &record);
                self.buffer.insert(index, record);
            }
            None => self.buffer.adjust_count(1),
        }
        self.buffer.recompute_visible();

        let created = match source.create_record(&request_values, before).await {
            Ok(created) => created,
            Err(err) => {
                warn!(error = %err, "row creation rejected; withdrawing optimistic row");
                match self.buffer.index_of(temporary) {
                    Some(index) => {
                        self.buffer.remove(index);
                    }
                    None => self.buffer.adjust_count(-1),
                }
                self.buffer.recompute_visible();
                return Err(err);
            }
        };

        if let Some(row) = self.buffer.get_mut(temporary) {
            row.id = created.id;
            row.order = created.order.clone();
            row.merge_values(&created.values);
            row.state.loading = false;
        }
        self.context
            .reconciler()
            .on_row_change(&mut self.buffer, created.id, &CellValues::new());
        info!(id = %created.id, order = %created.order, "created row");
        self.refresh_aggregations_quietly(source).await;
        Ok(created.id)
    }

    /// Estimated order for a row placed before the buffered row at `index`.
    fn order_before(&self, index: usize, moving: Option<RecordId>) -> OrderKey {
        let rows = self.buffer.rows();
        let target = &rows[index].order;
        let predecessor = rows[..index]
            .iter()
            .rev()
            .find(|row| Some(row.id) != moving)
            .map(|row| &row.order);
        between(predecessor, Some(target))
    }

    /// Set one cell of a buffered row.
    ///
    /// Dependent fields are updated through their field type hooks. The row
    /// keeps its position; its flags record whether it still matches.
    ///
    /// # Errors
    /// [`GridError::UnknownField`] / [`GridError::UnknownRecord`] for bad
    /// targets; otherwise the source error, after every changed cell was
    /// restored.
    pub async fn update_row_value(
        &mut self,
        source: &dyn RecordSource,
        id: RecordId,
        field_id: FieldId,
        value: CellValue,
    ) -> Result<(), GridError> {
        let field = self
            .context
            .fields
            .get(field_id)
            .cloned()
            .ok_or(GridError::UnknownField(field_id))?;
        let field_type = self
            .context
            .registry
            .for_field(&field)
            .ok_or(GridError::UnknownField(field_id))?;
        let current = self
            .buffer
            .get(id)
            .cloned()
            .ok_or_else(|| GridError::UnknownRecord(id.to_string()))?;

        let mut changed = CellValues::new();
        changed.insert(field_id, value.clone());
        for other in self.context.fields.all() {
            if other.id == field_id {
                continue;
            }
            let Some(other_type) = self.context.registry.for_field(other) else {
                continue;
            };
            if let Some(derived) = other_type.on_record_changed(other, &current, &field, &value) {
                changed.insert(other.id, derived);
            }
        }
        let mut request = CellValues::new();
        request.insert(field_id, field_type.prepare_for_update(&field, &value));

        let mut pre_images = PreImages::new();
        pre_images.capture(&current);
        if let Some(row) = self.buffer.get_mut(id) {
            row.merge_values(&changed);
        }
        let reconciler = self.context.reconciler();
        reconciler.on_row_change(&mut self.buffer, id, &CellValues::new());

        let buffer = &mut self.buffer;
        let result = settle(source.update_record(id, &request), pre_images, |pre_images| {
            pre_images.restore(buffer);
            reconciler.on_row_change(buffer, id, &CellValues::new());
        })
        .await;
        let updated = result?;
        if let Some(row) = self.buffer.get_mut(id) {
            row.merge_values(&updated.values);
        }
        self.context
            .reconciler()
            .on_row_change(&mut self.buffer, id, &CellValues::new());
        debug!(id = %id, field = %field_id, "updated cell");
        self.refresh_aggregations_quietly(source).await;
        Ok(())
    }

    /// Move a buffered row before `before`, or after every row.
    ///
    /// # Errors
    /// [`GridError::UnknownRecord`] for rows that are not buffered;
    /// otherwise the source error, after the row went back to where it was.
    pub async fn move_row(
        &mut self,
        source: &dyn RecordSource,
        id: RecordId,
        before: Option<RecordId>,
    ) -> Result<(), GridError> {
        let current = self
            .buffer
            .get(id)
            .cloned()
            .ok_or_else(|| GridError::UnknownRecord(id.to_string()))?;
        let order = match before {
            Some(before_id) => {
                let index = self
                    .buffer
                    .index_of(before_id)
                    .ok_or_else(|| GridError::UnknownRecord(before_id.to_string()))?;
                self.order_before(index, Some(id))
            }
            None => {
                let highest = ordering::highest(
                    self.buffer
                        .rows()
                        .iter()
                        .filter(|row| row.id != id)
                        .map(|row| &row.order),
                );
                OrderKey::after_highest(&highest)
            }
        };

        let mut moved = current.clone();
        moved.order = order;
        for field in self.context.fields.all() {
            let Some(field_type) = self.context.registry.for_field(field) else {
                continue;
            };
            if let Some(value) = field_type.on_record_moved(field, &moved) {
                moved.set_value(field.id, value);
            }
        }
        let mut pre_images = PreImages::new();
        pre_images.capture(&current);
        let reconciler = self.context.reconciler();
        let outcome = reconciler.updated(&mut self.buffer, &current, moved.clone());
        debug!(id = %id, outcome = ?outcome, "moved row locally");

        let buffer = &mut self.buffer;
        let result = settle(source.move_record(id, before), pre_images, |pre_images| {
            for original in pre_images.into_records() {
                let displaced = buffer.get(original.id).cloned().unwrap_or_else(|| moved.clone());
                reconciler.updated(buffer, &displaced, original);
            }
        })
        .await;
        let confirmed = result?;
        if let Some(row) = self.buffer.get_mut(id) {
            row.order = confirmed.order.clone();
            row.merge_values(&confirmed.values);
        }
        info!(id = %id, order = %confirmed.order, "moved row");
        Ok(())
    }

    /// Delete a buffered row.
    ///
    /// A record the source no longer knows counts as deleted.
    ///
    /// # Errors
    /// [`GridError::UnknownRecord`] for rows that are not buffered; any
    /// other source error leaves the row in place.
    pub async fn delete_row(
        &mut self,
        source: &dyn RecordSource,
        id: RecordId,
    ) -> Result<(), GridError> {
        let record = self
            .buffer
            .get(id)
            .cloned()
            .ok_or_else(|| GridError::UnknownRecord(id.to_string()))?;
        if let Some(row) = self.buffer.get_mut(id) {
            row.state.loading = true;
        }
        match source.delete_record(id).await {
            Ok(()) | Err(GridError::NotFound(_)) => {
                self.context.reconciler().deleted(&mut self.buffer, &record);
                self.buffer.recompute_visible();
                if self.selected_cell.is_some_and(|(row, _)| row == id) {
                    self.selected_cell = None;
                }
                info!(id = %id, "deleted row");
                self.refresh_aggregations_quietly(source).await;
                Ok(())
            }
            Err(err) => {
                if let Some(row) = self.buffer.get_mut(id) {
                    row.state.loading = false;
                }
                Err(err)
            }
        }
    }

    /// Mark exactly one cell as selected.
    pub fn select_cell(&mut self, id: RecordId, field: FieldId) {
        self.clear_selected_cell();
        if let Some(row) = self.buffer.get_mut(id) {
            row.state.selected = true;
            row.state.selected_field = Some(field);
        }
        self.selected_cell = Some((id, field));
    }

    /// Track the pointer entering or leaving a row.
    pub fn set_row_hover(&mut self, id: RecordId, hover: bool) -> bool {
        match self.buffer.get_mut(id) {
            Some(row) => {
                row.state.hover = hover;
                true
            }
            None => false,
        }
    }

    pub fn clear_selected_cell(&mut self) {
        if let Some((id, _)) = self.selected_cell.take() {
            if let Some(row) = self.buffer.get_mut(id) {
                row.state.selected = false;
                row.state.selected_field = None;
            }
        }
    }

    /// An editor on `field` holds the row where it is.
    pub fn add_row_selected_by(&mut self, id: RecordId, field: FieldId) {
        if let Some(row) = self.buffer.get_mut(id) {
            row.state.selected_by.insert(field);
        }
    }

    /// Release the hold of `field`; the last release settles the row.
    pub fn remove_row_selected_by(&mut self, id: RecordId, field: FieldId) -> Outcome {
        let Some(row) = self.buffer.get_mut(id) else {
            return Outcome::Ignored;
        };
        row.state.selected_by.remove(&field);
        if !row.state.selected_by.is_empty() {
            return Outcome::Unchanged;
        }
        let outcome = self.refresh_row(id);
        if matches!(outcome, Outcome::Removed { .. })
            && self.selected_cell.is_some_and(|(row, _)| row == id)
        {
            self.selected_cell = None;
        }
        outcome
    }

    /// Recompute the flags of one row, optionally against pending values.
    pub fn on_row_change(&mut self, id: RecordId, overrides: &CellValues) {
        self.context
            .reconciler()
            .on_row_change(&mut self.buffer, id, overrides);
    }

    /// Evict or reposition a row whose flags say it is out of place.
    pub fn refresh_row(&mut self, id: RecordId) -> Outcome {
        let outcome = self.context.reconciler().refresh_row(&mut self.buffer, id);
        if outcome.is_structural() {
            self.buffer.recompute_visible();
            debug!(id = %id, outcome = ?outcome, "settled row");
        }
        outcome
    }

    /// Rewrite one metadata entry of a buffered row.
    pub fn update_row_metadata<F>(&mut self, id: RecordId, key: &str, update: F) -> bool
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        let Some(row) = self.buffer.get_mut(id) else {
            return false;
        };
        let value = update(row.state.metadata.get(key));
        row.state.metadata.insert(key.to_string(), value);
        true
    }

    /// A field was added to the table; rows lacking it get `value`.
    pub fn add_field(&mut self, field: Field, value: CellValue) {
        let id = field.id;
        self.context.fields.upsert(field);
        for row in self.buffer.rows_mut() {
            row.values.entry(id).or_insert_with(|| value.clone());
        }
        debug!(field = %id, "added field");
    }

    /// A field was deleted from the table.
    ///
    /// Drops its options, footer value and buffered cell values. The primary
    /// field cannot be removed.
    pub fn remove_field(&mut self, field_id: FieldId) -> bool {
        if self.context.fields.remove(field_id).is_none() {
            return false;
        }
        self.context.view.field_options.remove(&field_id);
        self.aggregations.remove_field(field_id);
        for row in self.buffer.rows_mut() {
            row.values.remove(&field_id);
            row.state.selected_by.remove(&field_id);
        }
        if self
            .selected_cell
            .is_some_and(|(_, field)| field == field_id)
        {
            self.clear_selected_cell();
        }
        debug!(field = %field_id, "removed field");
        true
    }

    pub(super) async fn refresh_aggregations_quietly(&mut self, source: &dyn RecordSource) {
        if let Err(err) = self.fetch_aggregations(source).await {
            if !err.is_cancelled() {
                warn!(error = %err, "failed to refresh aggregations");
            }
        }
    }
}
