//! Small dataset operations that custom transform scripts can call in
//! addition to the catalog transforms.
//!
//! Every primitive takes the dataset and the target column first, like a
//! transform, followed by its own arguments.

use indexmap::IndexMap;

use crate::error::{KilnError, Result};
use crate::input::{Cell, DataTable, parse_number};
use crate::script::Value;

/// Extra arguments of a primitive call.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    name: &'a str,
    positional: &'a [Value],
    keywords: &'a IndexMap<String, Value>,
}

impl<'a> Args<'a> {
    pub fn new(
        name: &'a str,
        positional: &'a [Value],
        keywords: &'a IndexMap<String, Value>,
    ) -> Self {
        Self {
            name,
            positional,
            keywords,
        }
    }

    /// Argument by position, or by keyword when not given positionally.
    pub fn get(&self, index: usize, keyword: &str) -> Option<&'a Value> {
        self.positional
            .get(index)
            .or_else(|| self.keywords.get(keyword))
    }

    fn required(&self, index: usize, keyword: &str) -> Result<&'a Value> {
        self.get(index, keyword).ok_or_else(|| {
            KilnError::runtime(
                self.name,
                format!("missing required argument '{}'", keyword),
            )
        })
    }

    fn string(&self, index: usize, keyword: &str) -> Result<&'a str> {
        match self.required(index, keyword)? {
            Value::Str(s) => Ok(s),
            other => Err(self.type_error(keyword, "a string", other)),
        }
    }

    fn bound(&self, index: usize, keyword: &str) -> Result<Option<f64>> {
        match self.get(index, keyword) {
            None | Some(Value::None) => Ok(None),
            Some(Value::Number(n)) => Ok(Some(*n)),
            Some(other) => Err(self.type_error(keyword, "a number or None", other)),
        }
    }

    fn type_error(&self, keyword: &str, expected: &str, got: &Value) -> KilnError {
        KilnError::runtime(
            self.name,
            format!("argument '{}' must be {}, got {}", keyword, expected, got),
        )
    }

    /// Reject arguments beyond what the primitive accepts.
    fn at_most(&self, count: usize, keywords: &[&str]) -> Result<()> {
        if self.positional.len() > count {
            return Err(KilnError::runtime(
                self.name,
                format!(
                    "takes at most {} extra arguments, got {}",
                    count,
                    self.positional.len()
                ),
            ));
        }
        if let Some(unknown) = self.keywords.keys().find(|k| !keywords.contains(&k.as_str())) {
            return Err(KilnError::runtime(
                self.name,
                format!("unexpected keyword argument '{}'", unknown),
            ));
        }
        Ok(())
    }
}

/// A primitive operation.
pub type Primitive = fn(DataTable, &str, &Args<'_>) -> Result<DataTable>;

/// Names of all primitives.
pub const PRIMITIVES: &[&str] = &[
    "map_values",
    "clip",
    "drop_column",
    "copy_column",
    "fill_value",
    "rename_column",
];

/// Find a primitive by name.
pub fn lookup(name: &str) -> Option<Primitive> {
    let primitive: Primitive = match name {
        "map_values" => map_values,
        "clip" => clip,
        "drop_column" => drop_column,
        "copy_column" => copy_column,
        "fill_value" => fill_value,
        "rename_column" => rename_column,
        _ => return None,
    };
    Some(primitive)
}

fn column_index(dataset: &DataTable, args: &Args<'_>, column: &str) -> Result<usize> {
    dataset.require_column(args.name, column)
}

/// `map_values(dataset, column, {from: to, ...}, default=None)`
///
/// Values without an entry become `default`. Keys match a cell when their
/// text forms are equal, so `{"1": "one"}` and `{1: "one"}` both match the
/// number 1.
fn map_values(mut dataset: DataTable, column: &str, args: &Args<'_>) -> Result<DataTable> {
    args.at_most(2, &["mapping", "default"])?;
    let col = column_index(&dataset, args, column)?;
    let entries = match args.required(0, "mapping")? {
        Value::Map(entries) => entries,
        other => return Err(args.type_error("mapping", "a {key: value} map", other)),
    };

    let mut table: Vec<(Option<String>, Cell)> = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        let key = match key {
            Value::None => None,
            Value::Map(_) => return Err(args.type_error("mapping", "scalar keys", key)),
            other => Some(other.key_text()),
        };
        let value = value
            .to_cell()
            .ok_or_else(|| args.type_error("mapping", "scalar values", value))?;
        table.push((key, value));
    }

    let default = match args.get(1, "default") {
        Some(value) => value
            .to_cell()
            .ok_or_else(|| args.type_error("default", "a scalar", value))?,
        None => Cell::Null,
    };

    dataset.map_column(col, |cell| {
        let text = (!cell.is_null()).then(|| cell.to_string());
        table
            .iter()
            .find(|(key, _)| *key == text)
            .map(|(_, value)| value.clone())
            .unwrap_or_else(|| default.clone())
    });
    Ok(dataset)
}

/// `clip(dataset, column, low, high)`; `None` leaves a side unbounded.
fn clip(mut dataset: DataTable, column: &str, args: &Args<'_>) -> Result<DataTable> {
    args.at_most(2, &["lower", "upper"])?;
    let col = column_index(&dataset, args, column)?;
    let lower = args.bound(0, "lower")?;
    let upper = args.bound(1, "upper")?;

    let mut offender = None;
    dataset.map_column(col, |cell| {
        let value = match cell {
            Cell::Null => return Cell::Null,
            Cell::Number(n) => *n,
            Cell::Text(s) => match parse_number(s) {
                Some(n) => n,
                None => {
                    offender.get_or_insert_with(|| cell.clone());
                    return cell.clone();
                }
            },
            Cell::DateTime(_) => {
                offender.get_or_insert_with(|| cell.clone());
                return cell.clone();
            }
        };
        let value = lower.map_or(value, |low| value.max(low));
        Cell::Number(upper.map_or(value, |high| value.min(high)))
    });

    match offender {
        Some(cell) => Err(KilnError::runtime(
            args.name,
            format!("cannot clip non-numeric value '{}'", cell),
        )),
        None => Ok(dataset),
    }
}

/// `drop_column(dataset, column)`
fn drop_column(mut dataset: DataTable, column: &str, args: &Args<'_>) -> Result<DataTable> {
    args.at_most(0, &[])?;
    column_index(&dataset, args, column)?;
    dataset.drop_column(column);
    Ok(dataset)
}

/// `copy_column(dataset, column, "target")`; overwrites an existing target.
fn copy_column(mut dataset: DataTable, column: &str, args: &Args<'_>) -> Result<DataTable> {
    args.at_most(1, &["target"])?;
    let col = column_index(&dataset, args, column)?;
    let target = args.string(0, "target")?;
    let values: Vec<Cell> = dataset.column_values(col).cloned().collect();
    dataset.put_column(target, values)?;
    Ok(dataset)
}

/// `fill_value(dataset, column, value)`: replace missing values.
fn fill_value(mut dataset: DataTable, column: &str, args: &Args<'_>) -> Result<DataTable> {
    args.at_most(1, &["value"])?;
    let col = column_index(&dataset, args, column)?;
    let value = args.required(0, "value")?;
    let fill = value
        .to_cell()
        .ok_or_else(|| args.type_error("value", "a scalar", value))?;
    dataset.map_column(col, |cell| {
        if cell.is_null() {
            fill.clone()
        } else {
            cell.clone()
        }
    });
    Ok(dataset)
}

/// `rename_column(dataset, column, "new_name")`
fn rename_column(mut dataset: DataTable, column: &str, args: &Args<'_>) -> Result<DataTable> {
    args.at_most(1, &["new_name"])?;
    column_index(&dataset, args, column)?;
    let new_name = args.string(0, "new_name")?;
    dataset
        .rename_column(column, new_name)
        .map_err(|e| KilnError::runtime(args.name, e.to_string()))?;
    Ok(dataset)
}
