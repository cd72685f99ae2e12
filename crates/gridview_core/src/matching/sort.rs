//! Composite row ordering.

use crate::field_types::{FieldType, FieldTypeRegistry};
use crate::models::field::{Field, FieldSet};
use crate::models::record::Record;
use crate::models::view::{SortDirection, SortRule};
use std::cmp::Ordering;

struct SortKey<'a> {
    field: &'a Field,
    field_type: &'a dyn FieldType,
    direction: SortDirection,
}

/// Strict total order over records for one sort configuration.
///
/// Sort rules apply in list order; ties fall back to the order key and then
/// to the record id, so two distinct records never compare equal. Rules
/// pointing at unknown fields are skipped.
pub struct RowComparator<'a> {
    keys: Vec<SortKey<'a>>,
}

impl<'a> RowComparator<'a> {
    pub fn new(sorts: &[SortRule], fields: &'a FieldSet, registry: &'a FieldTypeRegistry) -> Self {
        let keys = sorts
            .iter()
            .filter_map(|rule| {
                let field = fields.get(rule.field)?;
                let field_type = registry.for_field(field)?;
                Some(SortKey {
                    field,
                    field_type,
                    direction: rule.direction,
                })
            })
            .collect();
        Self { keys }
    }

    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        for key in &self.keys {
            let ordering = key.field_type.compare(
                key.field,
                a.value(key.field.id),
                b.value(key.field.id),
            );
            let ordering = match key.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id))
    }

    /// Number of `rows` sorting before `record`, skipping `record` itself.
    ///
    /// This is the index `record` would take if inserted into `rows`.
    pub fn position_in(&self, rows: &[Record], record: &Record) -> usize {
        rows.iter()
            .filter(|row| row.id != record.id)
            .filter(|row| self.compare(row, record) == Ordering::Less)
            .count()
    }

    /// Sort `rows` in place.
    pub fn sort(&self, rows: &mut [Record]) {
        rows.sort_by(|a, b| self.compare(a, b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::field::{FieldId, FieldKind};
    use crate::models::record::{CellValue, RecordId};
    use crate::ordering::OrderKey;

    fn fields() -> FieldSet {
        FieldSet::new(
            Field::new(1, "Name", FieldKind::Text),
            vec![Field::new(2, "Score", FieldKind::Boolean)],
        )
    }

    fn record(id: u64, order: i64, name: &str) -> Record {
        Record::new(RecordId::from(id), OrderKey::from_integer(order))
            .with_value(FieldId(1), CellValue::text(name))
    }

    #[test]
    fn falls_back_to_order_then_id() {
        let fields = fields();
        let registry = FieldTypeRegistry::with_builtins();
        let comparator = RowComparator::new(&[], &fields, &registry);

        assert_eq!(
            comparator.compare(&record(9, 1, "b"), &record(1, 2, "a")),
            Ordering::Less
        );
        assert_eq!(
            comparator.compare(&record(1, 3, "a"), &record(2, 3, "a")),
            Ordering::Less
        );
    }

    #[test]
    fn applies_rules_in_order_and_honours_direction() {
        let fields = fields();
        let registry = FieldTypeRegistry::with_builtins();
        let rules = [SortRule::descending(FieldId(1))];
        let comparator = RowComparator::new(&rules, &fields, &registry);

        let mut rows = vec![record(1, 1, "alpha"), record(2, 2, "gamma"), record(3, 3, "beta")];
        comparator.sort(&mut rows);
        let ids: Vec<RecordId> = rows.iter().map(|row| row.id).collect();
        assert_eq!(ids, vec![RecordId::from(2), RecordId::from(3), RecordId::from(1)]);
    }

    #[test]
    fn unknown_sort_fields_are_skipped() {
        let fields = fields();
        let registry = FieldTypeRegistry::with_builtins();
        let rules = [SortRule::ascending(FieldId(99))];
        let comparator = RowComparator::new(&rules, &fields, &registry);
        assert_eq!(
            comparator.compare(&record(2, 1, "z"), &record(1, 2, "a")),
            Ordering::Less
        );
    }

    #[test]
    fn distinct_records_never_compare_equal() {
        let fields = fields();
        let registry = FieldTypeRegistry::with_builtins();
        let rules = [SortRule::ascending(FieldId(2)), SortRule::ascending(FieldId(1))];
        let comparator = RowComparator::new(&rules, &fields, &registry);
        let rows: Vec<Record> = (0..12)
            .map(|id| record(id, (id % 3) as i64, if id % 2 == 0 { "same" } else { "other" }))
            .collect();
        for a in &rows {
            for b in &rows {
                let ordering = comparator.compare(a, b);
                assert_eq!(ordering == Ordering::Equal, a.id == b.id);
                assert_eq!(ordering.reverse(), comparator.compare(b, a));
            }
        }
    }

    #[test]
    fn position_in_skips_the_record_itself() {
        let fields = fields();
        let registry = FieldTypeRegistry::with_builtins();
        let comparator = RowComparator::new(&[], &fields, &registry);
        let rows = vec![record(1, 1, ""), record(2, 2, ""), record(3, 3, "")];

        assert_eq!(comparator.position_in(&rows, &record(2, 10, "")), 2);
        assert_eq!(comparator.position_in(&rows, &record(9, 0, "")), 0);
    }
}
