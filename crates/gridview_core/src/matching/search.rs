//! Search-term matching.

use crate::field_types::FieldTypeRegistry;
use crate::models::field::{FieldId, FieldSet};
use crate::models::record::{CellValues, Record, RowState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The active search term and the "hide rows not matching search" toggle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchState {
    pub term: String,
    pub hide_non_matching: bool,
}

impl SearchState {
    pub fn new(term: impl Into<String>, hide_non_matching: bool) -> Self {
        Self {
            term: term.into(),
            hide_non_matching,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.term.trim().is_empty()
    }

    /// Term forwarded to the record source.
    ///
    /// Only sent when non-matching rows are hidden; otherwise the term merely
    /// highlights and the server returns every row.
    pub fn server_term(&self) -> Option<&str> {
        (self.hide_non_matching && !self.is_blank()).then_some(self.term.trim())
    }
}

/// Search result for one record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchMatch {
    /// Whether the record stays visible under the current search.
    pub matches: bool,
    pub fields: BTreeSet<FieldId>,
    pub id_match: bool,
}

impl SearchMatch {
    pub fn apply_to(&self, state: &mut RowState) {
        state.match_search = self.matches;
        state.field_search_matches = self.fields.clone();
        state.id_search_match = self.id_match;
    }
}

pub(crate) fn search_record(
    record: &Record,
    overrides: &CellValues,
    search: &SearchState,
    fields: &FieldSet,
    registry: &FieldTypeRegistry,
) -> SearchMatch {
    if search.is_blank() {
        return SearchMatch {
            matches: true,
            ..SearchMatch::default()
        };
    }
    let term = search.term.trim();
    // Loading rows still carry their temporary id.
    let id_match = !record.state.loading
        && !record.id.is_temporary()
        && record.id.to_string().contains(term);
    let matched: BTreeSet<FieldId> = fields
        .all()
        .filter(|field| {
            let Some(field_type) = registry.for_field(field) else {
                return false;
            };
            let value = overrides
                .get(&field.id)
                .unwrap_or_else(|| record.value(field.id));
            !field_type.is_empty(value) && field_type.contains(field, value, term)
        })
        .map(|field| field.id)
        .collect();
    SearchMatch {
        matches: !search.hide_non_matching || id_match || !matched.is_empty(),
        fields: matched,
        id_match,
    }
}
