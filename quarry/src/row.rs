//! Row records and schema grouping
//!
//! A [`Row`] is an ordered mapping from column name to scalar value. The
//! bulk-insert contract requires every row in one call to share an
//! identical, ordered column set, so each row derives a [`SchemaKey`] used
//! to partition mixed batches into homogeneous ones.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Ordered column-name tuple identifying a row's shape.
///
/// Rows with equal schema keys can travel in the same bulk-insert call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaKey(Vec<String>);

impl SchemaKey {
    /// Column names in row order
    pub fn columns(&self) -> &[String] {
        &self.0
    }
}

/// An insertion-ordered mapping from column name to value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
        }
    }

    /// Set a column value, replacing in place when the column already exists
    /// so the column order stays stable.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.columns.push((column, value)),
        }
    }

    /// Builder-style variant of [`set`](Self::set)
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate columns in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Value of the first column, consuming the row
    pub fn into_first_value(self) -> Option<Value> {
        self.columns.into_iter().next().map(|(_, value)| value)
    }

    /// Derive the ordered column tuple used for grouping
    pub fn schema(&self) -> SchemaKey {
        SchemaKey(self.columns.iter().map(|(name, _)| name.clone()).collect())
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.set(column, value);
        }
        row
    }
}

// Rows serialize as plain JSON objects. A custom implementation keeps the
// column order of the source text instead of going through serde_json's
// sorted map.
impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in &self.columns {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

struct RowVisitor;

impl<'de> Visitor<'de> for RowVisitor {
    type Value = Row;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map of column names to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Row, A::Error> {
        let mut row = Row::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((name, value)) = access.next_entry::<String, Value>()? {
            row.set(name, value);
        }
        Ok(row)
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Row, D::Error> {
        deserializer.deserialize_map(RowVisitor)
    }
}

/// Partition rows into batches sharing an identical ordered column set.
///
/// Groups appear in first-seen order and the relative order of rows within
/// each group is preserved. Required because one bulk-insert call cannot mix
/// differing column sets.
pub fn group_by_schema(rows: Vec<Row>) -> Vec<Vec<Row>> {
    let mut groups: Vec<(SchemaKey, Vec<Row>)> = Vec::new();
    for row in rows {
        let key = row.schema();
        match groups.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, group)) => group.push(row),
            None => groups.push((key, vec![row])),
        }
    }
    groups.into_iter().map(|(_, group)| group).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_set_preserves_order() {
        let mut row = Row::new();
        row.set("zulu", 1);
        row.set("alpha", 2);
        row.set("zulu", 3);

        let columns: Vec<&str> = row.iter().map(|(name, _)| name).collect();
        assert_eq!(columns, vec!["zulu", "alpha"]);
        assert_eq!(row.get("zulu"), Some(&json!(3)));
    }

    #[test]
    fn test_serde_preserves_order() {
        let row = row(&[("b", json!(1)), ("a", json!(2))]);
        let text = serde_json::to_string(&row).unwrap();
        assert_eq!(text, r#"{"b":1,"a":2}"#);

        let back: Row = serde_json::from_str(&text).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn test_schema_key() {
        let first = row(&[("a", json!(1)), ("b", json!(2))]);
        let second = row(&[("a", json!(9)), ("b", json!(8))]);
        let reordered = row(&[("b", json!(2)), ("a", json!(1))]);

        assert_eq!(first.schema(), second.schema());
        assert_ne!(first.schema(), reordered.schema());
        assert_eq!(first.schema().columns(), &["a", "b"]);
    }

    #[test]
    fn test_group_by_schema() {
        let rows = vec![
            row(&[("a", json!(1)), ("b", json!(2))]),
            row(&[("a", json!(3)), ("c", json!(4))]),
            row(&[("a", json!(5)), ("b", json!(6))]),
        ];

        let groups = group_by_schema(rows);
        assert_eq!(groups.len(), 2);

        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[0][0].get("b"), Some(&json!(2)));
        assert_eq!(groups[0][1].get("b"), Some(&json!(6)));

        assert_eq!(groups[1].len(), 1);
        assert_eq!(groups[1][0].get("c"), Some(&json!(4)));
    }

    #[test]
    fn test_group_by_schema_empty() {
        assert!(group_by_schema(Vec::new()).is_empty());
    }

    #[test]
    fn test_into_first_value() {
        let row = row(&[("count", json!(5)), ("other", json!(9))]);
        assert_eq!(row.into_first_value(), Some(json!(5)));
        assert_eq!(Row::new().into_first_value(), None);
    }
}
