//! Inbound realtime events and the queue they wait in.
//!
//! Events arrive on whatever thread owns the socket and are pushed into a
//! [`RealtimeInbox`]. The session drains the inbox on its own loop so remote
//! changes apply in arrival order between local operations.

use crossbeam_channel::{unbounded, Receiver, Sender, TrySendError};
use gridview_core::{GridError, Record};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Row change pushed by the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeEvent {
    RowCreated {
        table_id: u64,
        row: Record,
        #[serde(default)]
        metadata: BTreeMap<String, serde_json::Value>,
    },
    RowsCreated {
        table_id: u64,
        rows: Vec<Record>,
    },
    RowUpdated {
        table_id: u64,
        row_before_update: Record,
        row: Record,
        #[serde(default)]
        metadata: BTreeMap<String, serde_json::Value>,
    },
    RowsUpdated {
        table_id: u64,
        rows_before_update: Vec<Record>,
        rows: Vec<Record>,
    },
    RowMoved {
        table_id: u64,
        row_before_update: Record,
        row: Record,
    },
    RowDeleted {
        table_id: u64,
        row: Record,
    },
    RowsDeleted {
        table_id: u64,
        rows: Vec<Record>,
    },
    /// The server asks every client showing the view to refetch it.
    ForceViewRowsRefresh {
        view_id: u64,
    },
}

impl RealtimeEvent {
    /// Decode one event from its JSON payload.
    ///
    /// # Errors
    /// Returns [`GridError::Serialization`] for malformed payloads.
    pub fn from_json(payload: &str) -> Result<Self, GridError> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Table the event belongs to, if it is table scoped.
    pub fn table_id(&self) -> Option<u64> {
        match self {
            Self::RowCreated { table_id, .. }
            | Self::RowsCreated { table_id, .. }
            | Self::RowUpdated { table_id, .. }
            | Self::RowsUpdated { table_id, .. }
            | Self::RowMoved { table_id, .. }
            | Self::RowDeleted { table_id, .. }
            | Self::RowsDeleted { table_id, .. } => Some(*table_id),
            Self::ForceViewRowsRefresh { .. } => None,
        }
    }
}

/// Producer half handed to the transport.
#[derive(Clone, Debug)]
pub struct RealtimeSender {
    tx: Sender<RealtimeEvent>,
}

impl RealtimeSender {
    /// Queue an event; returns false once the inbox is gone.
    pub fn send(&self, event: RealtimeEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Disconnected(_)) | Err(TrySendError::Full(_)) => false,
        }
    }
}

/// Unbounded FIFO of realtime events awaiting reconciliation.
#[derive(Debug)]
pub struct RealtimeInbox {
    tx: Sender<RealtimeEvent>,
    rx: Receiver<RealtimeEvent>,
}

impl RealtimeInbox {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> RealtimeSender {
        RealtimeSender {
            tx: self.tx.clone(),
        }
    }

    pub fn push(&self, event: RealtimeEvent) {
        // The inbox owns a receiver, so the channel cannot be disconnected here.
        let _ = self.tx.send(event);
    }

    /// Take every queued event, oldest first.
    pub fn drain(&self) -> Vec<RealtimeEvent> {
        self.rx.try_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for RealtimeInbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridview_core::{CellValue, FieldId, RecordId};
    use std::thread;

    #[test]
    fn decodes_wire_payloads() {
        let payload = r#"{
            "type": "row_updated",
            "table_id": 7,
            "row_before_update": {"id": 3, "order": "3", "values": {"1": {"type": "text", "value": "old"}}},
            "row": {"id": 3, "order": "3", "values": {"1": {"type": "text", "value": "new"}}}
        }"#;
        let event = RealtimeEvent::from_json(payload).expect("decode");
        assert_eq!(event.table_id(), Some(7));
        let RealtimeEvent::RowUpdated { row, metadata, .. } = event else {
            panic!("unexpected event");
        };
        assert_eq!(row.id, RecordId::from(3));
        assert_eq!(row.value(FieldId(1)), &CellValue::text("new"));
        assert!(metadata.is_empty());

        let refresh = RealtimeEvent::from_json(r#"{"type":"force_view_rows_refresh","view_id":2}"#)
            .expect("decode refresh");
        assert_eq!(refresh.table_id(), None);
    }

    #[test]
    fn malformed_payload_is_a_serialization_error() {
        let result = RealtimeEvent::from_json(r#"{"type":"row_teleported"}"#);
        assert!(matches!(result, Err(GridError::Serialization(_))));
    }

    #[test]
    fn inbox_preserves_arrival_order_across_threads() {
        let inbox = RealtimeInbox::new();
        let sender = inbox.sender();
        let producer = thread::spawn(move || {
            for view_id in 0..5 {
                assert!(sender.send(RealtimeEvent::ForceViewRowsRefresh { view_id }));
            }
        });
        producer.join().expect("producer thread");
        assert_eq!(inbox.len(), 5);
        let drained: Vec<u64> = inbox
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                RealtimeEvent::ForceViewRowsRefresh { view_id } => Some(view_id),
                _ => None,
            })
            .collect();
        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
        assert!(inbox.is_empty());
    }
}
