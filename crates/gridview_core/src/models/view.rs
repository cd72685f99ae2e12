//! Grid view definitions: filters, sorts and per-field display options.

use crate::constants::MAX_FIELD_OPTION_ORDER;
use crate::models::field::{Field, FieldId, FieldSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How the leaves of a filter tree combine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterType {
    #[default]
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equal,
    NotEqual,
    Contains,
    ContainsNot,
    Empty,
    NotEmpty,
    HigherThan,
    LowerThan,
    Boolean,
}

/// One leaf of the filter tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: FieldId,
    #[serde(rename = "type")]
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: String,
}

impl Filter {
    pub fn new(field: FieldId, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            field,
            operator,
            value: value.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "ASC")]
    Ascending,
    #[serde(rename = "DESC")]
    Descending,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortRule {
    pub field: FieldId,
    #[serde(rename = "order", default)]
    pub direction: SortDirection,
}

impl SortRule {
    pub fn ascending(field: FieldId) -> Self {
        Self {
            field,
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: FieldId) -> Self {
        Self {
            field,
            direction: SortDirection::Descending,
        }
    }
}

/// Footer aggregation computed by the server for one field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationKind {
    EmptyCount,
    NotEmptyCount,
    UniqueCount,
    Min,
    Max,
    Sum,
    Average,
}

/// Per-field display options of a grid view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldOptions {
    pub width: u32,
    pub hidden: bool,
    pub order: u32,
    #[serde(default)]
    pub aggregation: Option<AggregationKind>,
}

impl Default for FieldOptions {
    fn default() -> Self {
        Self {
            width: 200,
            hidden: false,
            order: MAX_FIELD_OPTION_ORDER,
            aggregation: None,
        }
    }
}

/// A grid view over one table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub id: u64,
    pub table_id: u64,
    #[serde(default)]
    pub filter_type: FilterType,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub filters_disabled: bool,
    #[serde(default, rename = "sortings")]
    pub sorts: Vec<SortRule>,
    #[serde(default)]
    pub field_options: BTreeMap<FieldId, FieldOptions>,
}

impl View {
    pub fn new(id: u64, table_id: u64) -> Self {
        Self {
            id,
            table_id,
            ..Self::default()
        }
    }

    /// Field options for `field`, falling back to defaults when none are stored.
    pub fn options_for(&self, field: FieldId) -> FieldOptions {
        self.field_options.get(&field).cloned().unwrap_or_default()
    }

    fn option_order(&self, field: FieldId) -> u32 {
        self.field_options
            .get(&field)
            .map(|options| options.order)
            .unwrap_or(MAX_FIELD_OPTION_ORDER)
    }

    fn is_hidden(&self, field: FieldId) -> bool {
        self.field_options
            .get(&field)
            .is_some_and(|options| options.hidden)
    }

    /// Columns as rendered: primary first, then visible fields by option order, then id.
    ///
    /// Multi-select field indices index into this list.
    pub fn visible_fields<'a>(&self, fields: &'a FieldSet) -> Vec<&'a Field> {
        let mut visible: Vec<&Field> = fields
            .fields()
            .iter()
            .filter(|field| !self.is_hidden(field.id))
            .collect();
        visible.sort_by(|a, b| {
            self.option_order(a.id)
                .cmp(&self.option_order(b.id))
                .then(a.id.cmp(&b.id))
        });
        std::iter::once(fields.primary()).chain(visible).collect()
    }

    /// Fields carrying a footer aggregation.
    pub fn aggregated_fields(&self) -> impl Iterator<Item = (FieldId, AggregationKind)> + '_ {
        self.field_options
            .iter()
            .filter_map(|(id, options)| options.aggregation.map(|kind| (*id, kind)))
    }

    /// Reorder field options: listed fields take positions `0..n`, the rest follow.
    pub fn reorder_fields(&mut self, order: &[FieldId]) {
        let mut next = u32::try_from(order.len()).unwrap_or(u32::MAX);
        for (id, options) in self.field_options.iter_mut() {
            if !order.contains(id) {
                options.order = next;
                next = next.saturating_add(1);
            }
        }
        for (index, id) in order.iter().enumerate() {
            if let Some(options) = self.field_options.get_mut(id) {
                options.order = u32::try_from(index).unwrap_or(u32::MAX);
            }
        }
    }
}
