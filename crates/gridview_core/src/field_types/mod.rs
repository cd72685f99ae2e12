//! Field type capabilities.
//!
//! Each [`FieldKind`] maps to one [`FieldType`] implementation that knows how
//! to compare, search, format, copy and paste values of that kind. The buffer
//! and matching engine only ever talk to fields through this trait.

mod builtin;

pub use builtin::{
    BooleanType, DateType, LastModifiedType, LinkRowType, NumberType, SingleSelectType, TextType,
};

use crate::models::field::{Field, FieldKind};
use crate::models::record::{CellValue, Record};
use bigdecimal::BigDecimal;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-kind field behaviour consumed by the grid engine.
pub trait FieldType: Send + Sync {
    fn kind(&self) -> FieldKind;

    /// Ascending comparison of two values of this field.
    fn compare(&self, field: &Field, a: &CellValue, b: &CellValue) -> Ordering;

    /// Whether `value` contains the search `term`.
    fn contains(&self, field: &Field, value: &CellValue, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        !term.is_empty() && self.to_text(field, value).to_lowercase().contains(&term)
    }

    /// Human readable representation.
    fn to_text(&self, field: &Field, value: &CellValue) -> String;

    fn empty_value(&self, _field: &Field) -> CellValue {
        CellValue::Empty
    }

    fn is_empty(&self, value: &CellValue) -> bool {
        value.is_empty()
    }

    /// Numeric interpretation used by comparison filters.
    fn as_number(&self, _value: &CellValue) -> Option<BigDecimal> {
        None
    }

    fn is_read_only(&self) -> bool {
        false
    }

    /// Normalize a value before it is sent to the record source.
    fn prepare_for_update(&self, _field: &Field, value: &CellValue) -> CellValue {
        value.clone()
    }

    fn prepare_for_copy(&self, field: &Field, value: &CellValue) -> String {
        self.to_text(field, value)
    }

    /// Convert clipboard text into a value of this field.
    fn prepare_for_paste(&self, field: &Field, raw: &str) -> CellValue;

    /// Value this field takes after `record` is moved, when it depends on position.
    fn on_record_moved(&self, _field: &Field, _record: &Record) -> Option<CellValue> {
        None
    }

    /// Value this field takes after another cell of `record` changed.
    fn on_record_changed(
        &self,
        _field: &Field,
        _record: &Record,
        _changed: &Field,
        _new_value: &CellValue,
    ) -> Option<CellValue> {
        None
    }
}

/// Lookup from [`FieldKind`] to its capabilities.
#[derive(Clone)]
pub struct FieldTypeRegistry {
    types: HashMap<FieldKind, Arc<dyn FieldType>>,
}

impl FieldTypeRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    /// A registry holding every built-in field type.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(TextType::single_line()));
        registry.register(Arc::new(TextType::long()));
        registry.register(Arc::new(NumberType));
        registry.register(Arc::new(BooleanType));
        registry.register(Arc::new(DateType));
        registry.register(Arc::new(SingleSelectType));
        registry.register(Arc::new(LinkRowType));
        registry.register(Arc::new(LastModifiedType));
        registry
    }

    /// Register `field_type`, replacing any existing type of the same kind.
    pub fn register(&mut self, field_type: Arc<dyn FieldType>) {
        self.types.insert(field_type.kind(), field_type);
    }

    pub fn get(&self, kind: FieldKind) -> Option<&dyn FieldType> {
        self.types.get(&kind).map(|field_type| field_type.as_ref())
    }

    pub fn for_field(&self, field: &Field) -> Option<&dyn FieldType> {
        self.get(field.kind)
    }
}

impl Default for FieldTypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for FieldTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<&FieldKind> = self.types.keys().collect();
        kinds.sort();
        f.debug_struct("FieldTypeRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}
