//! Row composition
//!
//! The engine hands back column names once per statement and bare value
//! tuples per row. A [`Row`] zips the two into a keyed record that still
//! iterates in column order.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::ser::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::value::Value;

/// One result row keyed by column name
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    fields: IndexMap<String, Value>,
}

impl Row {
    /// Value of the named column
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// Column name and value at a position
    pub fn get_index(&self, index: usize) -> Option<(&str, &Value)> {
        self.fields
            .get_index(index)
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Column names in result order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Values in result order
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn into_inner(self) -> IndexMap<String, Value> {
        self.fields
    }

    /// Decode the row into a typed record, matching fields by column name.
    ///
    /// Blobs decode as byte sequences, SQL NULL as `None`/unit.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let value = serde_json::to_value(self)?;
        Ok(serde_json::from_value(value)?)
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.fields.iter())
    }
}

impl IntoIterator for Row {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// Zip column names with one row of values.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] when the counts differ.
pub fn compose_row(names: &[String], values: Vec<Value>) -> Result<Row> {
    check_shape(names, &values)?;
    Ok(zip_row(names, values))
}

/// Compose a whole result set.
///
/// Only the first row is checked against `names`; every row of one result
/// set has the same width.
pub fn compose_rows(names: &[String], rows: Vec<Vec<Value>>) -> Result<Vec<Row>> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    check_shape(names, first)?;

    Ok(rows
        .into_iter()
        .map(|values| zip_row(names, values))
        .collect())
}

fn check_shape(names: &[String], values: &[Value]) -> Result<()> {
    if names.len() != values.len() {
        return Err(Error::ShapeMismatch {
            columns: names.len(),
            values: values.len(),
        });
    }
    Ok(())
}

fn zip_row(names: &[String], values: Vec<Value>) -> Row {
    Row {
        fields: names.iter().cloned().zip(values).collect(),
    }
}
