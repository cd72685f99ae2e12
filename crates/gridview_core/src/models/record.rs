//! Records (rows) and their cell values.

use crate::models::field::FieldId;
use crate::ordering::OrderKey;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

/// Record identifier.
///
/// Optimistically created records carry a client-generated temporary id
/// until the server confirms them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Persisted(u64),
    Temporary(Uuid),
}

impl RecordId {
    pub fn temporary() -> Self {
        Self::Temporary(Uuid::new_v4())
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, Self::Temporary(_))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Persisted(id) => write!(f, "{id}"),
            Self::Temporary(id) => write!(f, "{id}"),
        }
    }
}

impl From<u64> for RecordId {
    fn from(value: u64) -> Self {
        Self::Persisted(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub id: u64,
    pub value: String,
}

/// A reference to a record in another table, with its primary value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRef {
    pub id: u64,
    pub value: String,
}

/// A single cell value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(#[serde(with = "decimal_string")] BigDecimal),
    Boolean(bool),
    Date(DateTime<Utc>),
    Select(SelectOption),
    Links(Vec<LinkRef>),
}

mod decimal_string {
    use bigdecimal::BigDecimal;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
    use std::str::FromStr;

    pub(super) fn serialize<S: Serializer>(value: &BigDecimal, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&crate::ordering::plain_decimal(value))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BigDecimal, D::Error> {
        let raw = String::deserialize(d)?;
        BigDecimal::from_str(raw.trim()).map_err(D::Error::custom)
    }
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.is_empty(),
            Self::Links(links) => links.is_empty(),
            _ => false,
        }
    }
}

/// Cell values keyed by field.
pub type CellValues = BTreeMap<FieldId, CellValue>;

/// Client-only view state attached to each buffered record.
#[derive(Clone, Debug, PartialEq)]
pub struct RowState {
    /// A request touching this record is in flight.
    pub loading: bool,
    pub hover: bool,
    pub selected: bool,
    pub selected_field: Option<FieldId>,
    /// Fields holding an open editor on this row; a held row is never evicted.
    pub selected_by: BTreeSet<FieldId>,
    pub match_filters: bool,
    pub match_search: bool,
    /// Whether the row's buffer position still equals its sorted position.
    pub match_sortings: bool,
    pub field_search_matches: BTreeSet<FieldId>,
    /// The record id itself matched the active search term.
    pub id_search_match: bool,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Default for RowState {
    fn default() -> Self {
        Self {
            loading: false,
            hover: false,
            selected: false,
            selected_field: None,
            selected_by: BTreeSet::new(),
            match_filters: true,
            match_search: true,
            match_sortings: true,
            field_search_matches: BTreeSet::new(),
            id_search_match: false,
            metadata: BTreeMap::new(),
        }
    }
}

/// One row of the table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub order: OrderKey,
    #[serde(default)]
    pub values: CellValues,
    #[serde(skip)]
    pub state: RowState,
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl Record {
    pub fn new(id: RecordId, order: OrderKey) -> Self {
        Self {
            id,
            order,
            values: CellValues::new(),
            state: RowState::default(),
        }
    }

    pub fn with_value(mut self, field: FieldId, value: CellValue) -> Self {
        self.values.insert(field, value);
        self
    }

    /// Value of `field`, or [`CellValue::Empty`] when the record lacks it.
    pub fn value(&self, field: FieldId) -> &CellValue {
        self.values.get(&field).unwrap_or(&EMPTY_CELL)
    }

    pub fn set_value(&mut self, field: FieldId, value: CellValue) {
        self.values.insert(field, value);
    }

    /// Overwrite the given cells, leaving the rest untouched.
    pub fn merge_values(&mut self, values: &CellValues) {
        for (field, value) in values {
            self.values.insert(*field, value.clone());
        }
    }

    /// Whether id, order and every cell value equal `other`'s, ignoring view state.
    pub fn same_content(&self, other: &Record) -> bool {
        self.id == other.id && self.order == other.order && self.values == other.values
    }
}
