//! Root crate facade for the grid view engine.

pub use gridview_core::{
    config, error, field_types, matching, models, ordering, AggregationKind, CellValue,
    CellValues, Field, FieldId, FieldKind, FieldOptions, FieldSet, FieldType, FieldTypeRegistry,
    Filter, FilterOperator, FilterType, GridConfig, GridError, OrderKey, Record, RecordId,
    RowState, SearchState, SortDirection, SortRule, View,
};
pub use gridview_session::{
    aggregation, buffer, memory, multi_select, optimistic, realtime, reconcile, session, source,
    BufferPhase, CellRef, GridSession, MemorySource, MultiSelect, Outcome, Page, PageQuery,
    PasteSummary, RealtimeEvent, RealtimeInbox, RealtimeSender, RecordSource, RecordUpdate,
    RowBuffer, ScrollDecision,
};
