//! Realtime events from other clients.

use super::GridSession;
use crate::buffer::RowBuffer;
use crate::realtime::{RealtimeEvent, RealtimeInbox};
use crate::reconcile::Outcome;
use crate::source::RecordSource;
use gridview_core::{GridError, Record, RecordId};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

fn merge_metadata(buffer: &mut RowBuffer, id: RecordId, metadata: BTreeMap<String, Value>) {
    if metadata.is_empty() {
        return;
    }
    if let Some(row) = buffer.get_mut(id) {
        row.state.metadata.extend(metadata);
    }
}

fn before_image<'a>(before: &'a [Record], row: &'a Record) -> &'a Record {
    before
        .iter()
        .find(|candidate| candidate.id == row.id)
        .unwrap_or(row)
}

impl GridSession {
    /// Reconcile one event into the buffer.
    ///
    /// Events for other tables are dropped. A forced refresh for this view
    /// only raises [`GridSession::needs_refresh`].
    pub fn apply_realtime(&mut self, event: RealtimeEvent) -> Vec<Outcome> {
        if let Some(table_id) = event.table_id() {
            if table_id != self.context.view.table_id {
                debug!(table_id, "ignored event for another table");
                return Vec::new();
            }
        }
        let reconciler = self.context.reconciler();
        let buffer = &mut self.buffer;
        let outcomes = match event {
            RealtimeEvent::RowCreated { row, metadata, .. } => {
                let id = row.id;
                let outcome = reconciler.created(buffer, row);
                merge_metadata(buffer, id, metadata);
                vec![outcome]
            }
            RealtimeEvent::RowsCreated { rows, .. } => rows
                .into_iter()
                .map(|row| reconciler.created(buffer, row))
                .collect(),
            RealtimeEvent::RowUpdated {
                row_before_update,
                row,
                metadata,
                ..
            } => {
                let id = row.id;
                let outcome = reconciler.updated(buffer, &row_before_update, row);
                merge_metadata(buffer, id, metadata);
                vec![outcome]
            }
            RealtimeEvent::RowsUpdated {
                rows_before_update,
                rows,
                ..
            } => rows
                .into_iter()
                .map(|row| {
                    let before = before_image(&rows_before_update, &row).clone();
                    reconciler.updated(buffer, &before, row)
                })
                .collect(),
            RealtimeEvent::RowMoved {
                row_before_update,
                row,
                ..
            } => vec![reconciler.updated(buffer, &row_before_update, row)],
            RealtimeEvent::RowDeleted { row, .. } => vec![reconciler.deleted(buffer, &row)],
            RealtimeEvent::RowsDeleted { rows, .. } => rows
                .iter()
                .map(|row| reconciler.deleted(buffer, row))
                .collect(),
            RealtimeEvent::ForceViewRowsRefresh { view_id } => {
                if view_id == self.context.view.id {
                    info!(view_id, "server requested a refresh");
                    self.force_refresh = true;
                }
                Vec::new()
            }
        };
        if outcomes.iter().any(Outcome::is_structural) {
            self.buffer.recompute_visible();
        }
        debug!(
            outcomes = outcomes.len(),
            start = self.buffer.start(),
            count = self.buffer.count(),
            "applied realtime event"
        );
        outcomes
    }

    /// Apply every queued event, then catch up the window and footer.
    ///
    /// Rows removed from the buffer may leave the visible window short, so a
    /// scroll fetch follows structural changes. A pending forced refresh runs
    /// last.
    ///
    /// # Errors
    /// The first non-cancellation error of the follow-up fetches.
    pub async fn drain_realtime(
        &mut self,
        source: &dyn RecordSource,
        inbox: &RealtimeInbox,
    ) -> Result<Vec<Outcome>, GridError> {
        let mut outcomes = Vec::new();
        for event in inbox.drain() {
            outcomes.extend(self.apply_realtime(event));
        }
        if self.force_refresh {
            self.refresh(source).await?;
            return Ok(outcomes);
        }
        if outcomes.iter().any(Outcome::is_structural) {
            let scroll_top = self.buffer.viewport().scroll_top;
            match self.fetch_by_scroll(source, scroll_top).await {
                Ok(_) | Err(GridError::Cancelled) => {}
                Err(err) => return Err(err),
            }
            self.refresh_aggregations_quietly(source).await;
        }
        Ok(outcomes)
    }
}
