//! Built-in field types.

use super::FieldType;
use crate::models::field::{Field, FieldKind};
use crate::models::record::{CellValue, LinkRef, Record};
use crate::ordering::plain_decimal;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::cmp::Ordering;
use std::str::FromStr;

const TRUTHY_PASTE_VALUES: &[&str] = &["1", "y", "t", "yes", "true", "on", "checked"];

/// Empty values sort before everything else.
fn compare_present<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.cmp(&b),
    }
}

fn as_date(value: &CellValue) -> Option<DateTime<Utc>> {
    match value {
        CellValue::Date(date) => Some(*date),
        _ => None,
    }
}

fn format_date(field: &Field, value: &CellValue, with_time: bool) -> String {
    match as_date(value) {
        Some(date) if with_time || field.date_include_time => {
            date.format("%Y-%m-%d %H:%M").to_string()
        }
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => String::new(),
    }
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn round_to_places(value: &BigDecimal, places: u32) -> BigDecimal {
    let places = i64::from(places);
    value.round(places).with_scale(places)
}

/// Single and multi line text.
#[derive(Debug, Clone, Copy)]
pub struct TextType {
    kind: FieldKind,
}

impl TextType {
    pub fn single_line() -> Self {
        Self {
            kind: FieldKind::Text,
        }
    }

    pub fn long() -> Self {
        Self {
            kind: FieldKind::LongText,
        }
    }
}

impl FieldType for TextType {
    fn kind(&self) -> FieldKind {
        self.kind
    }

    fn compare(&self, field: &Field, a: &CellValue, b: &CellValue) -> Ordering {
        self.to_text(field, a)
            .to_lowercase()
            .cmp(&self.to_text(field, b).to_lowercase())
    }

    fn to_text(&self, _field: &Field, value: &CellValue) -> String {
        match value {
            CellValue::Text(text) => text.clone(),
            CellValue::Number(number) => plain_decimal(number),
            CellValue::Boolean(flag) => flag.to_string(),
            _ => String::new(),
        }
    }

    fn prepare_for_paste(&self, _field: &Field, raw: &str) -> CellValue {
        match self.kind {
            FieldKind::Text => CellValue::text(raw.replace(['\r', '\n'], " ")),
            _ => CellValue::text(raw),
        }
    }
}

/// Decimal numbers with a fixed amount of decimal places.
#[derive(Debug, Clone, Copy)]
pub struct NumberType;

impl FieldType for NumberType {
    fn kind(&self) -> FieldKind {
        FieldKind::Number
    }

    fn compare(&self, _field: &Field, a: &CellValue, b: &CellValue) -> Ordering {
        compare_present(self.as_number(a), self.as_number(b))
    }

    fn to_text(&self, field: &Field, value: &CellValue) -> String {
        match value {
            CellValue::Number(number) => {
                plain_decimal(&round_to_places(number, field.number_decimal_places))
            }
            _ => String::new(),
        }
    }

    fn as_number(&self, value: &CellValue) -> Option<BigDecimal> {
        match value {
            CellValue::Number(number) => Some(number.clone()),
            _ => None,
        }
    }

    fn prepare_for_update(&self, field: &Field, value: &CellValue) -> CellValue {
        match value {
            CellValue::Number(number) => {
                CellValue::Number(round_to_places(number, field.number_decimal_places))
            }
            other => other.clone(),
        }
    }

    fn prepare_for_paste(&self, field: &Field, raw: &str) -> CellValue {
        match BigDecimal::from_str(raw.trim()) {
            Ok(number) => CellValue::Number(round_to_places(&number, field.number_decimal_places)),
            Err(_) => CellValue::Empty,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BooleanType;

impl FieldType for BooleanType {
    fn kind(&self) -> FieldKind {
        FieldKind::Boolean
    }

    fn compare(&self, _field: &Field, a: &CellValue, b: &CellValue) -> Ordering {
        let flag = |value: &CellValue| matches!(value, CellValue::Boolean(true));
        flag(a).cmp(&flag(b))
    }

    fn contains(&self, _field: &Field, _value: &CellValue, _term: &str) -> bool {
        false
    }

    fn to_text(&self, _field: &Field, value: &CellValue) -> String {
        matches!(value, CellValue::Boolean(true)).to_string()
    }

    fn empty_value(&self, _field: &Field) -> CellValue {
        CellValue::Boolean(false)
    }

    fn is_empty(&self, value: &CellValue) -> bool {
        !matches!(value, CellValue::Boolean(true))
    }

    fn prepare_for_paste(&self, _field: &Field, raw: &str) -> CellValue {
        let raw = raw.trim().to_lowercase();
        CellValue::Boolean(TRUTHY_PASTE_VALUES.contains(&raw.as_str()))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DateType;

impl FieldType for DateType {
    fn kind(&self) -> FieldKind {
        FieldKind::Date
    }

    fn compare(&self, _field: &Field, a: &CellValue, b: &CellValue) -> Ordering {
        compare_present(as_date(a), as_date(b))
    }

    fn to_text(&self, field: &Field, value: &CellValue) -> String {
        format_date(field, value, false)
    }

    fn prepare_for_paste(&self, _field: &Field, raw: &str) -> CellValue {
        parse_date(raw).map_or(CellValue::Empty, CellValue::Date)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SingleSelectType;

impl FieldType for SingleSelectType {
    fn kind(&self) -> FieldKind {
        FieldKind::SingleSelect
    }

    fn compare(&self, field: &Field, a: &CellValue, b: &CellValue) -> Ordering {
        self.to_text(field, a)
            .to_lowercase()
            .cmp(&self.to_text(field, b).to_lowercase())
    }

    fn to_text(&self, _field: &Field, value: &CellValue) -> String {
        match value {
            CellValue::Select(option) => option.value.clone(),
            _ => String::new(),
        }
    }

    fn prepare_for_paste(&self, field: &Field, raw: &str) -> CellValue {
        let raw = raw.trim();
        let by_value = field
            .select_options
            .iter()
            .find(|option| option.value.eq_ignore_ascii_case(raw));
        let by_id = || {
            raw.parse::<u64>()
                .ok()
                .and_then(|id| field.select_options.iter().find(|option| option.id == id))
        };
        by_value
            .or_else(by_id)
            .map_or(CellValue::Empty, |option| CellValue::Select(option.clone()))
    }
}

/// Links to records of another table.
#[derive(Debug, Clone, Copy)]
pub struct LinkRowType;

impl FieldType for LinkRowType {
    fn kind(&self) -> FieldKind {
        FieldKind::LinkRow
    }

    fn compare(&self, field: &Field, a: &CellValue, b: &CellValue) -> Ordering {
        self.to_text(field, a)
            .to_lowercase()
            .cmp(&self.to_text(field, b).to_lowercase())
    }

    fn contains(&self, _field: &Field, value: &CellValue, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        match value {
            CellValue::Links(links) if !term.is_empty() => links
                .iter()
                .any(|link| link.value.to_lowercase().contains(&term)),
            _ => false,
        }
    }

    fn to_text(&self, _field: &Field, value: &CellValue) -> String {
        match value {
            CellValue::Links(links) => links
                .iter()
                .map(|link| link.value.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            _ => String::new(),
        }
    }

    fn empty_value(&self, _field: &Field) -> CellValue {
        CellValue::Links(Vec::new())
    }

    fn prepare_for_paste(&self, _field: &Field, raw: &str) -> CellValue {
        serde_json::from_str::<Vec<LinkRef>>(raw.trim())
            .map_or_else(|_| CellValue::Links(Vec::new()), CellValue::Links)
    }
}

/// Read-only timestamp of the last change to the record.
#[derive(Debug, Clone, Copy)]
pub struct LastModifiedType;

impl FieldType for LastModifiedType {
    fn kind(&self) -> FieldKind {
        FieldKind::LastModified
    }

    fn compare(&self, _field: &Field, a: &CellValue, b: &CellValue) -> Ordering {
        compare_present(as_date(a), as_date(b))
    }

    fn to_text(&self, field: &Field, value: &CellValue) -> String {
        format_date(field, value, true)
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn prepare_for_paste(&self, _field: &Field, _raw: &str) -> CellValue {
        CellValue::Empty
    }

    fn on_record_moved(&self, _field: &Field, _record: &Record) -> Option<CellValue> {
        Some(CellValue::Date(Utc::now()))
    }

    fn on_record_changed(
        &self,
        field: &Field,
        _record: &Record,
        changed: &Field,
        _new_value: &CellValue,
    ) -> Option<CellValue> {
        (changed.id != field.id).then(|| CellValue::Date(Utc::now()))
    }
}
