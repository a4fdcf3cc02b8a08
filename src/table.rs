use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A single cell value, as found in a type library or broadcast as a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Null,
}

impl Value {
    /// Missing cell: `null`, or NaN in a float column.
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            Value::Str(_) | Value::Null => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) => float_to_int(*v),
            Value::Bool(v) => Some(*v as i64),
            Value::Str(_) | Value::Null => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::Int(v) => Some(*v != 0),
            Value::Float(v) if v.is_nan() => None,
            Value::Float(v) => Some(*v != 0.0),
            Value::Str(_) | Value::Null => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

/// Integral floats only; NaN and fractional values have no integer reading.
pub(crate) fn float_to_int(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 {
        Some(v as i64)
    } else {
        None
    }
}

/// A homogeneous column of a source table.
///
/// A column of nothing but `null` decodes as floats (NaN). Null cells read
/// as missing values whatever the requested type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Column {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    Float(#[serde(deserialize_with = "nullable_floats")] Vec<f64>),
    Str(#[serde(deserialize_with = "nullable_strings")] Vec<String>),
    NullableBool(Vec<Option<bool>>),
}

/// Missing strings (e.g. the tap side of a transformer without tap changer)
/// read back as empty strings.
fn nullable_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Option<String>>::deserialize(deserializer)?;
    Ok(values.into_iter().map(Option::unwrap_or_default).collect())
}

/// Missing floats are stored as `null` in JSON and read back as NaN.
fn nullable_floats<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Option<f64>>::deserialize(deserializer)?;
    Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Bool(v) => v.len(),
            Column::Int(v) => v.len(),
            Column::Float(v) => v.len(),
            Column::Str(v) => v.len(),
            Column::NullableBool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at row position `i`.
    pub fn value(&self, i: usize) -> Value {
        match self {
            Column::Bool(v) => Value::Bool(v[i]),
            Column::Int(v) => Value::Int(v[i]),
            Column::Float(v) => Value::Float(v[i]),
            Column::Str(v) => Value::Str(v[i].clone()),
            Column::NullableBool(v) => v[i].map(Value::Bool).unwrap_or(Value::Null),
        }
    }

    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            Column::Float(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Vec<f64>> for Column {
    fn from(v: Vec<f64>) -> Self {
        Column::Float(v)
    }
}

impl From<Vec<i64>> for Column {
    fn from(v: Vec<i64>) -> Self {
        Column::Int(v)
    }
}

impl From<Vec<bool>> for Column {
    fn from(v: Vec<bool>) -> Self {
        Column::Bool(v)
    }
}

impl From<Vec<&str>> for Column {
    fn from(v: Vec<&str>) -> Self {
        Column::Str(v.into_iter().map(String::from).collect())
    }
}

/// Table is one named collection of rows, addressed by a stable integer
/// index per row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Source index of each row.
    pub index: Vec<i64>,

    /// Columns by name, each holding one value per row.
    #[serde(default)]
    pub columns: BTreeMap<String, Column>,
}

impl Table {
    pub fn new(index: Vec<i64>) -> Self {
        Self {
            index,
            columns: BTreeMap::new(),
        }
    }

    /// Table with rows indexed `0..n`.
    pub fn with_rows(n: usize) -> Self {
        Self::new((0..n as i64).collect())
    }

    pub fn with_column(mut self, name: &str, column: impl Into<Column>) -> Self {
        self.insert(name, column);
        self
    }

    pub fn insert(&mut self, name: &str, column: impl Into<Column>) {
        self.columns.insert(name.to_string(), column.into());
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Float value of `column` at the row with source index `index`.
    pub fn float_at(&self, column: &str, index: i64) -> Option<f64> {
        let row = self.index.iter().position(|&i| i == index)?;
        self.column(column)?.as_floats().map(|v| v[row])
    }
}

/// TableSet maps table names to tables. It is used both for the source
/// network and for the converted results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableSet(BTreeMap<String, Table>);

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: &str, table: Table) -> Self {
        self.insert(name, table);
        self
    }

    pub fn insert(&mut self, name: &str, table: Table) {
        self.0.insert(name.to_string(), table);
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_table_json() -> Result<()> {
        let json = r#"{
            "bus": {
                "index": [3, 7],
                "columns": {
                    "vn_kv": [20.0, null],
                    "in_service": [true, false],
                    "zone": [1, 2],
                    "name": ["a", "b"]
                }
            }
        }"#;
        let tables: TableSet = serde_json::from_str(json)?;
        let bus = tables.get("bus").unwrap();

        assert_eq!(bus.index, vec![3, 7]);
        assert_eq!(bus.column("in_service"), Some(&Column::Bool(vec![true, false])));
        assert_eq!(bus.column("zone"), Some(&Column::Int(vec![1, 2])));
        assert_eq!(bus.column("name"), Some(&Column::from(vec!["a", "b"])));

        let vn_kv = bus.column("vn_kv").and_then(|c| c.as_floats()).unwrap();
        assert_eq!(vn_kv[0], 20.0);
        assert!(vn_kv[1].is_nan());
        Ok(())
    }

    #[test]
    fn test_value_casts() {
        assert_eq!(Value::Float(2.0).as_i64(), Some(2));
        assert_eq!(Value::Float(2.5).as_i64(), None);
        assert_eq!(Value::Float(f64::NAN).as_i64(), None);
        assert_eq!(Value::Int(0).as_bool(), Some(false));
        assert_eq!(Value::from("x").as_f64(), None);
        assert_eq!(Value::Float(f64::NAN).as_bool(), None);
        assert!(Value::Float(f64::NAN).is_null());
        assert!(!Value::from("").is_null());
    }

    #[test]
    fn test_null_columns() -> Result<()> {
        let json = r#"{
            "index": [0, 1],
            "columns": {
                "tap_side": [null, null],
                "closed": [true, null]
            }
        }"#;
        let table: Table = serde_json::from_str(json)?;

        let tap_side = table.column("tap_side").unwrap();
        assert!(matches!(tap_side, Column::Float(_)));
        assert!(tap_side.value(0).is_null());

        let closed = table.column("closed").unwrap();
        assert_eq!(closed, &Column::NullableBool(vec![Some(true), None]));
        assert_eq!(closed.value(0), Value::Bool(true));
        assert_eq!(closed.value(1), Value::Null);
        Ok(())
    }
}
