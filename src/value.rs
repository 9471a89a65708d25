//! Raw values and rows as they come back from the engine
//!
//! Rows are ordered: columns keep the order the engine returned them in, and a
//! row serialises as a JSON object with keys in that order.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// A single field value.
///
/// `Bytes` and the temporal variants only exist before normalization; the
/// charset normalizer turns them into `Text`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    List(Vec<RawValue>),
    Map(Row),
}

impl RawValue {
    /// Integer view of the value (integral floats included).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RawValue::Integer(n) => Some(*n),
            RawValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            RawValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Catalog-name view of the value: text or bytes with padding removed.
    ///
    /// Catalog identifiers are ASCII, so bytes are read as UTF-8 here; user
    /// data goes through the charset normalizer instead.
    pub fn as_trimmed_text(&self) -> Option<String> {
        let text = match self {
            RawValue::Text(s) => s.trim().to_string(),
            RawValue::Bytes(b) => String::from_utf8_lossy(b).trim().to_string(),
            RawValue::Integer(n) => n.to_string(),
            _ => return None,
        };
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<i64> for RawValue {
    fn from(n: i64) -> Self {
        RawValue::Integer(n)
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(b: Vec<u8>) -> Self {
        RawValue::Bytes(b)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(RawValue::Null)
    }
}

/// One result row: column name to value, in engine order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, RawValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column, replacing an existing column of the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<RawValue>) {
        let name = name.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.columns.push((name, value)),
        }
    }

    /// Builder form of [`Row::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Trimmed text of a column, `None` when absent, null, or blank.
    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).and_then(RawValue::as_trimmed_text)
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(RawValue::as_i64)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Apply `f` to every value, keeping column order.
    pub fn map_values(self, mut f: impl FnMut(RawValue) -> RawValue) -> Row {
        Row {
            columns: self
                .columns
                .into_iter()
                .map(|(n, v)| (n, f(v)))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_preserves_order_in_json() {
        let row = Row::new()
            .with("ZETA", 1i64)
            .with("ALPHA", "a")
            .with("MID", RawValue::Null);
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"ZETA":1,"ALPHA":"a","MID":null}"#);
    }

    #[test]
    fn test_row_insert_replaces() {
        let mut row = Row::new().with("A", 1i64);
        row.insert("A", 2i64);
        assert_eq!(row.len(), 1);
        assert_eq!(row.integer("A"), Some(2));
    }

    #[test]
    fn test_trimmed_text_from_padded_bytes() {
        let row = Row::new().with("RDB$FIELD_NAME", b"PCODE                          ".to_vec());
        assert_eq!(row.text("RDB$FIELD_NAME"), Some("PCODE".to_string()));
    }

    #[test]
    fn test_blank_text_is_none() {
        let row = Row::new().with("DEFAULT", "   ");
        assert_eq!(row.text("DEFAULT"), None);
        assert_eq!(row.text("MISSING"), None);
    }
}
