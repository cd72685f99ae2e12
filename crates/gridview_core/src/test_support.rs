//! Shared test-only fixtures for grid view crates.

use crate::models::field::{Field, FieldId, FieldKind, FieldSet};
use crate::models::record::{CellValue, Record, RecordId};
use crate::models::view::View;
use crate::ordering::OrderKey;
use bigdecimal::BigDecimal;

/// Primary text field.
pub const NAME_FIELD: FieldId = FieldId(1);
/// Number field with two decimal places.
pub const AMOUNT_FIELD: FieldId = FieldId(2);
/// Boolean field.
pub const DONE_FIELD: FieldId = FieldId(3);
/// Long text field.
pub const NOTES_FIELD: FieldId = FieldId(4);

/// A small table: `Name` (primary), `Amount`, `Done`, `Notes`.
pub fn sample_fields() -> FieldSet {
    FieldSet::new(
        Field::new(NAME_FIELD.0, "Name", FieldKind::Text),
        vec![
            Field::new(AMOUNT_FIELD.0, "Amount", FieldKind::Number).with_decimal_places(2),
            Field::new(DONE_FIELD.0, "Done", FieldKind::Boolean),
            Field::new(NOTES_FIELD.0, "Notes", FieldKind::LongText),
        ],
    )
}

/// An unfiltered, unsorted view over table 1.
pub fn sample_view() -> View {
    View::new(1, 1)
}

/// A persisted record with integer order and the given name.
pub fn named_record(id: u64, order: i64, name: &str) -> Record {
    Record::new(RecordId::from(id), OrderKey::from_integer(order))
        .with_value(NAME_FIELD, CellValue::text(name))
}

/// Records `1..=count`, each ordered by its id, named `row {id}` with amount `id`.
///
/// # Panics
/// Panics if `count` exceeds `i64::MAX`.
pub fn numbered_records(count: u64) -> Vec<Record> {
    (1..=count)
        .map(|id| {
            let order = i64::try_from(id).expect("order fits i64");
            named_record(id, order, &format!("row {id}"))
                .with_value(AMOUNT_FIELD, CellValue::Number(BigDecimal::from(order)))
                .with_value(DONE_FIELD, CellValue::Boolean(id % 2 == 0))
        })
        .collect()
}

/// Parse an order key.
///
/// # Panics
/// Panics if `raw` is not a decimal.
pub fn order(raw: &str) -> OrderKey {
    OrderKey::parse(raw).expect("order key")
}
