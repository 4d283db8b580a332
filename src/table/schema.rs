// src/table/schema.rs

use super::{Cell, Table};
use crate::error::SchemaError;
use serde::Deserialize;
use std::collections::BTreeMap;

/// One output column: its name and an optional value remapping.
///
/// Keys of `map` are matched against the cell's CSV text, so `1` matches
/// both an integer and the string `"1"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(default)]
    pub map: BTreeMap<String, String>,
}

/// Rename the columns of `table` in order and remap their values.
pub fn apply_schema(table: Table, schema: &[ColumnSpec]) -> Result<Table, SchemaError> {
    if schema.len() != table.columns.len() {
        return Err(SchemaError::ColumnCount {
            expected: schema.len(),
            found: table.columns.len(),
        });
    }

    let columns = schema.iter().map(|spec| spec.name.clone()).collect();
    let rows = table
        .rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(schema)
                .map(|(cell, spec)| remap(cell, &spec.map))
                .collect()
        })
        .collect();

    Ok(Table { columns, rows })
}

fn remap(cell: Cell, map: &BTreeMap<String, String>) -> Cell {
    if map.is_empty() {
        return cell;
    }
    match map.get(&cell.to_string()) {
        Some(mapped) => Cell::String(mapped.clone()),
        None => cell,
    }
}
