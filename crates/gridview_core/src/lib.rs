//! Core domain library for the grid view engine (records, ordering, matching).

/// Configuration loading and defaults.
pub mod config;
/// Shared engine constants.
pub mod constants;
/// Process-global environment helpers used by configuration tests.
pub mod env;
/// Engine error type.
pub mod error;
/// Per-field-type capabilities (compare, search, paste/copy, hooks).
pub mod field_types;
/// Filter, sort and search evaluation.
pub mod matching;
/// Records, fields and view definitions.
pub mod models;
/// Fractional order keys.
pub mod ordering;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::GridConfig;
pub use constants::*;
pub use error::GridError;
pub use field_types::{FieldType, FieldTypeRegistry};
pub use matching::{RowComparator, RowMatcher, SearchMatch, SearchState};
pub use models::{
    field::{Field, FieldId, FieldKind, FieldSet},
    record::{CellValue, CellValues, LinkRef, Record, RecordId, RowState, SelectOption},
    view::{
        AggregationKind, FieldOptions, Filter, FilterOperator, FilterType, SortDirection,
        SortRule, View,
    },
};
pub use ordering::OrderKey;
