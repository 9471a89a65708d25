//! Recognised search fields and per-request filter sets

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{FbscopeError, Result};

/// How a search field's value is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Integer identifier: exact match, or `LIKE` over its text form when the
    /// value carries a wildcard
    NumericId,
    /// Text: always `LIKE`, substring match unless the value has a wildcard
    FreeText,
    /// Date passed through as `YYYY-MM-DD` for an exact match
    ExactDate,
}

/// A query-string parameter mapped onto a table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchField {
    pub param: String,
    pub column: String,
    pub kind: FieldKind,
}

impl SearchField {
    pub fn new(param: &str, column: &str, kind: FieldKind) -> Self {
        Self {
            param: param.to_string(),
            column: column.to_string(),
            kind,
        }
    }
}

/// The configured set of search fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFields {
    fields: Vec<SearchField>,
}

impl SearchFields {
    /// Validate and wrap a field list.
    ///
    /// Columns end up in statement text, so they must be plain identifiers.
    /// Parameter names must be unique and must not shadow paging parameters.
    pub fn new(fields: Vec<SearchField>) -> Result<Self> {
        if fields.is_empty() {
            return Err(FbscopeError::config("search.fields", "at least one field is required"));
        }
        for (i, field) in fields.iter().enumerate() {
            if !is_plain_identifier(&field.column) {
                return Err(FbscopeError::config(
                    "search.fields",
                    format!("'{}' is not a valid column identifier", field.column),
                ));
            }
            if field.param.is_empty() || matches!(field.param.as_str(), "page" | "limit") {
                return Err(FbscopeError::config(
                    "search.fields",
                    format!("'{}' cannot be used as a search parameter", field.param),
                ));
            }
            if fields[..i].iter().any(|f| f.param == field.param) {
                return Err(FbscopeError::config(
                    "search.fields",
                    format!("duplicate search parameter '{}'", field.param),
                ));
            }
        }
        Ok(Self { fields })
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchField> {
        self.fields.iter()
    }

    pub fn params(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.param.as_str()).collect()
    }

    /// Column used for deterministic ordering: the first numeric identifier,
    /// else the first field.
    pub fn order_column(&self) -> &str {
        self.fields
            .iter()
            .find(|f| f.kind == FieldKind::NumericId)
            .or_else(|| self.fields.first())
            .map(|f| f.column.as_str())
            .unwrap_or_default()
    }
}

impl Default for SearchFields {
    fn default() -> Self {
        Self {
            fields: default_fields(),
        }
    }
}

/// `pcode`/`pname`/`pbirth` over the patient-style `PCODE`/`PNAME`/`PBIRTH`.
pub fn default_fields() -> Vec<SearchField> {
    vec![
        SearchField::new("pcode", "PCODE", FieldKind::NumericId),
        SearchField::new("pname", "PNAME", FieldKind::FreeText),
        SearchField::new("pbirth", "PBIRTH", FieldKind::ExactDate),
    ]
}

/// `[A-Za-z_][A-Za-z0-9_$]*`
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Filter values recognised in one request, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    entries: Vec<(SearchField, String)>,
}

impl FilterSet {
    /// Pick the recognised, non-empty values out of a query string.
    pub fn from_query(fields: &SearchFields, query: &HashMap<String, String>) -> Self {
        let entries = fields
            .iter()
            .filter_map(|field| {
                query
                    .get(&field.param)
                    .filter(|v| !v.trim().is_empty())
                    .map(|v| (field.clone(), v.clone()))
            })
            .collect();
        Self { entries }
    }

    pub fn with(mut self, field: SearchField, value: impl Into<String>) -> Self {
        self.entries.push((field, value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SearchField, &str)> {
        self.entries.iter().map(|(f, v)| (f, v.as_str()))
    }

    /// Echo block of a search response: every configured parameter with its
    /// value, or null when absent.
    pub fn echo(&self, fields: &SearchFields) -> serde_json::Map<String, serde_json::Value> {
        fields
            .iter()
            .map(|field| {
                let value = self
                    .entries
                    .iter()
                    .find(|(f, _)| f.param == field.param)
                    .map(|(_, v)| serde_json::Value::String(v.clone()))
                    .unwrap_or(serde_json::Value::Null);
                (field.param.clone(), value)
            })
            .collect()
    }
}

/// Whether a raw value carries a wildcard marker.
pub fn has_wildcard(value: &str) -> bool {
    value.contains('%') || value.contains('*')
}

/// Normalise `*` to `%`.
pub fn normalize_wildcards(value: &str) -> String {
    value.replace('*', "%")
}

/// `LIKE` pattern of a free-text value: verbatim with wildcards, else
/// substring.
pub fn free_text_pattern(value: &str) -> String {
    if has_wildcard(value) {
        normalize_wildcards(value)
    } else {
        format!("%{}%", value)
    }
}
