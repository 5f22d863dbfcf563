use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LoadError;

/// A single untyped spreadsheet cell.
///
/// Cells are coerced at the use site (see [`crate::coerce`]); nothing here
/// decides whether a column is numeric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Bool(bool),
    Text(String),
    Empty,
}

impl CellValue {
    /// Interpret a raw text cell the way a spreadsheet export does:
    /// blank is empty, anything that parses as a number is a number.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => CellValue::Number(n),
            _ => CellValue::Text(raw.to_string()),
        }
    }
}

/// One row of the dataset: field name -> cell, in column order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(IndexMap<String, CellValue>);

impl Record {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn get(&self, field: &str) -> Option<&CellValue> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: CellValue) {
        self.0.insert(field.into(), value);
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, CellValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, CellValue)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// The loaded row store. Immutable once built; a new load replaces it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    headers: Vec<String>,
    records: Vec<Record>,
}

impl Dataset {
    /// Build a dataset from records. Headers are the union of record fields in
    /// first-seen order.
    pub fn new(records: Vec<Record>) -> Self {
        let headers: IndexSet<String> = records
            .iter()
            .flat_map(|r| r.fields().map(str::to_string))
            .collect();
        Self {
            headers: headers.into_iter().collect(),
            records,
        }
    }

    /// Build a dataset from a header row and raw text rows (CSV shaped).
    /// Short rows are padded with empty cells.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let records = rows
            .into_iter()
            .map(|row| {
                headers
                    .iter()
                    .enumerate()
                    .map(|(idx, header)| {
                        let cell = row
                            .get(idx)
                            .map(|raw| CellValue::infer(raw))
                            .unwrap_or(CellValue::Empty);
                        (header.clone(), cell)
                    })
                    .collect()
            })
            .collect();
        Self { headers, records }
    }

    /// Create a dataset from a JSON array of flat objects.
    pub fn from_json(value: &Value) -> Result<Self, LoadError> {
        let array = value
            .as_array()
            .ok_or_else(|| LoadError::InvalidShape("input data must be a JSON array of objects".into()))?;

        let mut records = Vec::with_capacity(array.len());
        for item in array {
            let obj = item
                .as_object()
                .ok_or_else(|| LoadError::InvalidShape("items in array must be objects".into()))?;

            let mut record = Record::new();
            for (field, val) in obj {
                let cell = match val {
                    Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Empty),
                    Value::String(s) => CellValue::Text(s.clone()),
                    Value::Bool(b) => CellValue::Bool(*b),
                    Value::Null => CellValue::Empty,
                    _ => {
                        return Err(LoadError::InvalidShape(format!(
                            "unsupported value type for field '{}'",
                            field
                        )))
                    }
                };
                record.insert(field.clone(), cell);
            }
            records.push(record);
        }

        Ok(Self::new(records))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
