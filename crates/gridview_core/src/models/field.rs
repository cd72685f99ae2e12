//! Column definitions.

use crate::models::record::SelectOption;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable, server-assigned field identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(pub u64);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field_{}", self.0)
    }
}

/// Type tag selecting a field's capabilities in the [`crate::FieldTypeRegistry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    LongText,
    Number,
    Boolean,
    Date,
    SingleSelect,
    LinkRow,
    LastModified,
}

/// A column of the table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub primary: bool,
    /// Decimal places for number fields.
    #[serde(default)]
    pub number_decimal_places: u32,
    /// Whether date fields carry a time component.
    #[serde(default)]
    pub date_include_time: bool,
    /// Choices of single select fields.
    #[serde(default)]
    pub select_options: Vec<SelectOption>,
}

impl Field {
    pub fn new(id: u64, name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id: FieldId(id),
            name: name.into(),
            kind,
            primary: false,
            number_decimal_places: 0,
            date_include_time: false,
            select_options: Vec::new(),
        }
    }

    pub fn with_decimal_places(mut self, places: u32) -> Self {
        self.number_decimal_places = places;
        self
    }

    pub fn with_select_options(mut self, options: Vec<SelectOption>) -> Self {
        self.select_options = options;
        self
    }

    pub fn into_primary(mut self) -> Self {
        self.primary = true;
        self
    }
}

/// The table's columns: exactly one primary field held apart from the rest.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSet {
    primary: Field,
    fields: Vec<Field>,
}

impl FieldSet {
    /// Build a field set; the primary flag is forced on `primary` and off the rest.
    pub fn new(primary: Field, fields: Vec<Field>) -> Self {
        let primary = primary.into_primary();
        let fields = fields
            .into_iter()
            .filter(|field| field.id != primary.id)
            .map(|mut field| {
                field.primary = false;
                field
            })
            .collect();
        Self { primary, fields }
    }

    pub fn primary(&self) -> &Field {
        &self.primary
    }

    /// Non-primary fields in definition order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Primary first, then every other field.
    pub fn all(&self) -> impl Iterator<Item = &Field> {
        std::iter::once(&self.primary).chain(self.fields.iter())
    }

    pub fn get(&self, id: FieldId) -> Option<&Field> {
        self.all().find(|field| field.id == id)
    }

    /// Add or replace a non-primary field.
    pub fn upsert(&mut self, field: Field) {
        if field.id == self.primary.id {
            self.primary = field.into_primary();
            return;
        }
        match self.fields.iter_mut().find(|existing| existing.id == field.id) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    pub fn remove(&mut self, id: FieldId) -> Option<Field> {
        let index = self.fields.iter().position(|field| field.id == id)?;
        Some(self.fields.remove(index))
    }
}
