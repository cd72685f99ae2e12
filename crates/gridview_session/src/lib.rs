//! Row buffering and reconciliation for one open grid view.

/// Footer aggregation values.
pub mod aggregation;
/// The sliding window of buffered rows and the scroll math around it.
pub mod buffer;
/// In-memory record source with the server's matching rules.
pub mod memory;
/// Rectangular cell selection.
pub mod multi_select;
/// Optimistic updates with rollback.
pub mod optimistic;
/// Realtime event payloads and their inbox.
pub mod realtime;
/// Applying record changes to the buffer.
pub mod reconcile;
/// The per-view session tying the pieces together.
pub mod session;
/// The record source boundary.
pub mod source;

pub use aggregation::AggregationCache;
pub use buffer::scroll::ScrollDecision;
pub use buffer::{BufferPhase, RowBuffer};
pub use memory::MemorySource;
pub use multi_select::{CellRef, MultiSelect};
pub use realtime::{RealtimeEvent, RealtimeInbox, RealtimeSender};
pub use reconcile::{Outcome, Reconciler};
pub use session::{
    GridSession, PasteSummary, PendingExtend, PendingRefresh, ViewContext, BUFFER_PERF_LOG_ENV,
};
pub use source::{Page, PageQuery, RecordSource, RecordUpdate};
