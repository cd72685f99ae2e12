//! Filter leaf evaluation and AND/OR combination.

use crate::field_types::FieldType;
use crate::models::field::Field;
use crate::models::record::CellValue;
use crate::models::view::{FilterOperator, FilterType};
use bigdecimal::BigDecimal;
use std::str::FromStr;

/// Whether a single cell passes one filter leaf.
///
/// A blank filter value matches everything except for the operators that
/// ignore the value (`empty`, `not_empty`, `boolean`). A numeric comparison
/// against a value that does not parse as a number also matches.
pub fn leaf_matches(
    field_type: &dyn FieldType,
    field: &Field,
    operator: FilterOperator,
    value: &CellValue,
    filter_value: &str,
) -> bool {
    let needle = filter_value.trim().to_lowercase();
    match operator {
        FilterOperator::Empty => field_type.is_empty(value),
        FilterOperator::NotEmpty => !field_type.is_empty(value),
        FilterOperator::Boolean => {
            let wanted = matches!(needle.as_str(), "1" | "true" | "yes" | "on");
            matches!(value, CellValue::Boolean(true)) == wanted
        }
        _ if needle.is_empty() => true,
        FilterOperator::Equal => equals(field_type, field, value, &needle),
        FilterOperator::NotEqual => !equals(field_type, field, value, &needle),
        FilterOperator::Contains => field_type.contains(field, value, &needle),
        FilterOperator::ContainsNot => !field_type.contains(field, value, &needle),
        FilterOperator::HigherThan => {
            compare_number(field_type, value, &needle, |cell, bound| cell > bound)
        }
        FilterOperator::LowerThan => {
            compare_number(field_type, value, &needle, |cell, bound| cell < bound)
        }
    }
}

fn equals(field_type: &dyn FieldType, field: &Field, value: &CellValue, needle: &str) -> bool {
    if let Some(number) = field_type.as_number(value) {
        return match BigDecimal::from_str(needle) {
            Ok(wanted) => number == wanted,
            Err(_) => true,
        };
    }
    field_type.to_text(field, value).trim().to_lowercase() == needle
}

fn compare_number(
    field_type: &dyn FieldType,
    value: &CellValue,
    needle: &str,
    test: impl Fn(&BigDecimal, &BigDecimal) -> bool,
) -> bool {
    let Ok(bound) = BigDecimal::from_str(needle) else {
        return true;
    };
    field_type
        .as_number(value)
        .is_some_and(|number| test(&number, &bound))
}

/// Fold leaf results with short-circuiting; an empty tree matches.
pub fn combine<I>(filter_type: FilterType, leaves: I) -> bool
where
    I: IntoIterator<Item = bool>,
{
    let mut leaves = leaves.into_iter().peekable();
    if leaves.peek().is_none() {
        return true;
    }
    match filter_type {
        FilterType::And => leaves.all(|matched| matched),
        FilterType::Or => leaves.any(|matched| matched),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_types::FieldTypeRegistry;
    use crate::models::field::FieldKind;

    fn number(raw: &str) -> CellValue {
        CellValue::Number(BigDecimal::from_str(raw).expect("decimal"))
    }

    #[test]
    fn blank_filter_value_matches_value_operators() {
        let registry = FieldTypeRegistry::with_builtins();
        let field = Field::new(1, "Name", FieldKind::Text);
        let text = registry.for_field(&field).expect("text");
        for operator in [
            FilterOperator::Equal,
            FilterOperator::NotEqual,
            FilterOperator::Contains,
            FilterOperator::ContainsNot,
            FilterOperator::HigherThan,
        ] {
            assert!(leaf_matches(text, &field, operator, &CellValue::text("x"), "  "));
        }
        assert!(!leaf_matches(
            text,
            &field,
            FilterOperator::Empty,
            &CellValue::text("x"),
            ""
        ));
    }

    #[test]
    fn text_operators_ignore_case_and_padding() {
        let registry = FieldTypeRegistry::with_builtins();
        let field = Field::new(1, "Name", FieldKind::Text);
        let text = registry.for_field(&field).expect("text");
        let value = CellValue::text(" Ada Lovelace ");

        assert!(leaf_matches(text, &field, FilterOperator::Equal, &value, "ada lovelace"));
        assert!(leaf_matches(text, &field, FilterOperator::Contains, &value, "LOVE"));
        assert!(leaf_matches(text, &field, FilterOperator::ContainsNot, &value, "turing"));
        assert!(leaf_matches(text, &field, FilterOperator::NotEqual, &value, "ada"));
        assert!(leaf_matches(text, &field, FilterOperator::Empty, &CellValue::Empty, ""));
    }

    #[test]
    fn numeric_operators_compare_decimals() {
        let registry = FieldTypeRegistry::with_builtins();
        let field = Field::new(2, "Amount", FieldKind::Number);
        let numbers = registry.for_field(&field).expect("number");

        assert!(leaf_matches(numbers, &field, FilterOperator::HigherThan, &number("10"), "9.5"));
        assert!(!leaf_matches(numbers, &field, FilterOperator::LowerThan, &number("10"), "9.5"));
        assert!(leaf_matches(numbers, &field, FilterOperator::Equal, &number("2.50"), "2.5"));
        assert!(!leaf_matches(
            numbers,
            &field,
            FilterOperator::HigherThan,
            &CellValue::Empty,
            "1"
        ));
        // Unparsable bound.
        assert!(leaf_matches(numbers, &field, FilterOperator::LowerThan, &number("1"), "abc"));
    }

    #[test]
    fn boolean_operator_compares_flag() {
        let registry = FieldTypeRegistry::with_builtins();
        let field = Field::new(3, "Done", FieldKind::Boolean);
        let flags = registry.for_field(&field).expect("boolean");
        let checked = CellValue::Boolean(true);

        assert!(leaf_matches(flags, &field, FilterOperator::Boolean, &checked, "1"));
        assert!(!leaf_matches(flags, &field, FilterOperator::Boolean, &checked, ""));
        assert!(leaf_matches(flags, &field, FilterOperator::Boolean, &CellValue::Empty, "0"));
    }

    #[test]
    fn combine_short_circuits_and_accepts_empty_tree() {
        assert!(combine(FilterType::And, Vec::<bool>::new()));
        assert!(combine(FilterType::Or, Vec::<bool>::new()));
        assert!(!combine(FilterType::And, [true, false, true]));
        assert!(combine(FilterType::Or, [false, true, false]));
        assert!(!combine(FilterType::Or, [false, false]));

        let mut evaluated = 0;
        let leaves = [false, true, true].into_iter().inspect(|_| evaluated += 1);
        assert!(!combine(FilterType::And, leaves));
        assert_eq!(evaluated, 1);
    }
}
