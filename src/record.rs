use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// One row with a schema discovered at read time: ordered `(column, value)`
/// pairs with unique columns.
///
/// Equality is full-row equality over the union of both column sets, where a
/// column missing on one side compares as the empty string. That is the
/// identity a row keeps after a round trip through a tabular store, which
/// writes missing values as empty cells.
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == column)
    }

    /// Set `column`, keeping its original position when it already exists.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == column) {
            Some((_, v)) => *v = value,
            None => self.fields.push((column, value)),
        }
    }

    /// Copy every field of `other` onto `self`; `other` wins on collision.
    pub fn overlay(&mut self, other: &Record) {
        for (k, v) in &other.fields {
            self.insert(k.clone(), v.clone());
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut String)> {
        self.fields.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Canonical identity: non-empty fields sorted by column.
    pub fn row_key(&self) -> Vec<(&str, &str)> {
        let mut key: Vec<(&str, &str)> = self
            .fields
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        key.sort_unstable();
        key
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.row_key() == other.row_key()
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.row_key().hash(state);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// One review widget: course metadata plus its participant rows.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewBlock {
    pub course_info: Record,
    pub participants: Vec<Record>,
}

/// Union of the columns of `rows`, in first-seen order.
pub fn union_columns(rows: &[Record]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for column in rows.iter().flat_map(Record::columns) {
        if seen.insert(column) {
            columns.push(column.to_string());
        }
    }
    columns
}
