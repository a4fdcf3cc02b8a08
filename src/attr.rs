use crate::error::{ConvertError, Result};
use crate::table::{Column, Table, TableSet, Value};
use std::collections::{BTreeMap, HashMap};

/// Named equipment types: table name -> type name -> attribute -> value.
pub type StdTypes = BTreeMap<String, BTreeMap<String, BTreeMap<String, Value>>>;

/// Column that names the library type of each row.
pub const STD_TYPE: &str = "std_type";

/// Resolved attribute of a source table.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute<'a> {
    /// The table has a column with the attribute name.
    Column(&'a Column),

    /// Per-row values expanded from the type library.
    PerRow(Vec<Value>),

    /// Default value, broadcast to every row.
    Scalar(Value),
}

impl<'a> Attribute<'a> {
    /// Reads every row with `f`. Null cells that `f` cannot read take the
    /// default.
    fn cast<T: Clone>(
        &self,
        table: &str,
        attribute: &str,
        n: usize,
        expected: &'static str,
        default: Option<&Value>,
        f: impl Fn(&Value) -> Option<T>,
    ) -> Result<Vec<T>> {
        let read = |v: &Value| match f(v) {
            Some(x) => Ok(x),
            None if v.is_null() => default.and_then(&f).ok_or_else(|| {
                ConvertError::MissingAttribute {
                    table: table.to_string(),
                    attribute: attribute.to_string(),
                }
            }),
            None => Err(ConvertError::AttributeType {
                table: table.to_string(),
                attribute: attribute.to_string(),
                expected,
            }),
        };
        let actual = match self {
            Attribute::Column(c) => c.len(),
            Attribute::PerRow(v) => v.len(),
            Attribute::Scalar(_) => n,
        };
        if actual != n {
            return Err(ConvertError::ColumnLength {
                table: table.to_string(),
                column: attribute.to_string(),
                expected: n,
                actual,
            });
        }
        match self {
            Attribute::Column(c) => (0..n).map(|i| read(&c.value(i))).collect(),
            Attribute::PerRow(v) => v.iter().map(read).collect(),
            Attribute::Scalar(x) => {
                let x = read(x)?;
                Ok((0..n).map(|_| x.clone()).collect())
            }
        }
    }
}

/// Reads source attributes with a three-tier fallback: a column of the same
/// name, then the type library through the `std_type` column, then the
/// caller's default.
pub struct AttributeResolver<'a> {
    data: &'a TableSet,
    std_types: &'a StdTypes,
}

impl<'a> AttributeResolver<'a> {
    pub fn new(data: &'a TableSet, std_types: &'a StdTypes) -> Self {
        Self { data, std_types }
    }

    /// Source table, if present.
    pub fn table(&self, table: &str) -> Option<&'a Table> {
        self.data.get(table)
    }

    /// Number of rows in `table`. Absent tables are empty.
    pub fn len(&self, table: &str) -> usize {
        self.table(table).map(|t| t.len()).unwrap_or(0)
    }

    /// Source indices of `table`.
    pub fn index(&self, table: &str) -> &'a [i64] {
        self.table(table).map(|t| t.index.as_slice()).unwrap_or(&[])
    }

    pub fn get(&self, table: &str, attribute: &str, default: Option<Value>) -> Result<Attribute<'a>> {
        let missing = || ConvertError::MissingAttribute {
            table: table.to_string(),
            attribute: attribute.to_string(),
        };

        let source = match self.table(table) {
            Some(source) => source,
            None => return default.map(Attribute::Scalar).ok_or_else(missing),
        };

        if let Some(column) = source.column(attribute) {
            return Ok(Attribute::Column(column));
        }

        if let (Some(types), Some(Column::Str(names))) =
            (self.std_types.get(table), source.column(STD_TYPE))
        {
            // One lookup per distinct type name, broadcast back to the rows.
            let mut resolved: HashMap<&str, Value> = HashMap::new();
            let mut values = Vec::with_capacity(names.len());
            for name in names {
                if let Some(v) = resolved.get(name.as_str()) {
                    values.push(v.clone());
                    continue;
                }
                let std_type = types.get(name).ok_or_else(|| ConvertError::UnknownStdType {
                    table: table.to_string(),
                    std_type: name.clone(),
                })?;
                let v = match std_type.get(attribute) {
                    Some(v) => v.clone(),
                    None => default.clone().ok_or_else(missing)?,
                };
                log::trace!("{}.{} for std_type '{}': {:?}", table, attribute, name, v);
                resolved.insert(name.as_str(), v.clone());
                values.push(v);
            }
            return Ok(Attribute::PerRow(values));
        }

        default.map(Attribute::Scalar).ok_or_else(missing)
    }

    pub fn floats(&self, table: &str, attribute: &str, default: Option<f64>) -> Result<Vec<f64>> {
        let default = default.map(Value::Float);
        self.get(table, attribute, default.clone())?.cast(
            table,
            attribute,
            self.len(table),
            "float",
            default.as_ref(),
            Value::as_f64,
        )
    }

    pub fn ints(&self, table: &str, attribute: &str, default: Option<i64>) -> Result<Vec<i64>> {
        let default = default.map(Value::Int);
        self.get(table, attribute, default.clone())?.cast(
            table,
            attribute,
            self.len(table),
            "integer",
            default.as_ref(),
            Value::as_i64,
        )
    }

    pub fn bools(&self, table: &str, attribute: &str, default: Option<bool>) -> Result<Vec<bool>> {
        let default = default.map(Value::Bool);
        self.get(table, attribute, default.clone())?.cast(
            table,
            attribute,
            self.len(table),
            "bool",
            default.as_ref(),
            Value::as_bool,
        )
    }

    pub fn strings(&self, table: &str, attribute: &str, default: Option<&str>) -> Result<Vec<String>> {
        let default = default.map(Value::from);
        self.get(table, attribute, default.clone())?.cast(
            table,
            attribute,
            self.len(table),
            "string",
            default.as_ref(),
            |v| v.as_str().map(String::from),
        )
    }
}
