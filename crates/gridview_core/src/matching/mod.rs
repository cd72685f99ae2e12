//! Filter, sort and search evaluation for one view.
//!
//! Everything here is pure: a [`RowMatcher`] borrows the view definition,
//! the table's fields and the field type registry, and answers questions
//! about individual records without touching any buffer state.

pub mod filter;
mod search;
mod sort;

pub use search::{SearchMatch, SearchState};
pub use sort::RowComparator;

use crate::field_types::FieldTypeRegistry;
use crate::models::field::FieldSet;
use crate::models::record::{CellValues, Record};
use crate::models::view::View;

/// Evaluates a view's filters, sorts and search against records.
#[derive(Clone, Copy)]
pub struct RowMatcher<'a> {
    view: &'a View,
    fields: &'a FieldSet,
    registry: &'a FieldTypeRegistry,
}

impl<'a> RowMatcher<'a> {
    pub fn new(view: &'a View, fields: &'a FieldSet, registry: &'a FieldTypeRegistry) -> Self {
        Self {
            view,
            fields,
            registry,
        }
    }

    pub fn matches_filters(&self, record: &Record) -> bool {
        self.matches_filters_with(record, &CellValues::new())
    }

    /// Filter result with `overrides` standing in for the record's own values.
    ///
    /// Disabled filters match every record. Filters on fields that no longer
    /// exist are ignored.
    pub fn matches_filters_with(&self, record: &Record, overrides: &CellValues) -> bool {
        if self.view.filters_disabled {
            return true;
        }
        let leaves = self.view.filters.iter().filter_map(|leaf| {
            let field = self.fields.get(leaf.field)?;
            let field_type = self.registry.for_field(field)?;
            let value = overrides
                .get(&field.id)
                .unwrap_or_else(|| record.value(field.id));
            Some(filter::leaf_matches(
                field_type,
                field,
                leaf.operator,
                value,
                &leaf.value,
            ))
        });
        filter::combine(self.view.filter_type, leaves)
    }

    pub fn search(&self, record: &Record, search: &SearchState) -> SearchMatch {
        self.search_with(record, &CellValues::new(), search)
    }

    pub fn search_with(
        &self,
        record: &Record,
        overrides: &CellValues,
        search: &SearchState,
    ) -> SearchMatch {
        search::search_record(record, overrides, search, self.fields, self.registry)
    }

    /// Whether the record belongs in the view: it passes filters and search.
    pub fn is_visible(&self, record: &Record, search: &SearchState) -> bool {
        self.matches_filters(record) && self.search(record, search).matches
    }

    pub fn comparator(&self) -> RowComparator<'a> {
        RowComparator::new(&self.view.sorts, self.fields, self.registry)
    }

    /// Recompute `match_filters` and search state of `record` in place.
    pub fn refresh_state(&self, record: &mut Record, search: &SearchState) {
        record.state.match_filters = self.matches_filters(record);
        self.search(record, search).apply_to(&mut record.state);
    }

    pub fn view(&self) -> &'a View {
        self.view
    }

    pub fn fields(&self) -> &'a FieldSet {
        self.fields
    }

    pub fn registry(&self) -> &'a FieldTypeRegistry {
        self.registry
    }
}
