// src/table/mod.rs

pub mod csv;
pub mod parse;
pub mod schema;

pub use self::csv::to_csv_bytes;
pub use parse::parse_workbook;
pub use schema::{apply_schema, ColumnSpec};

use crate::error::ParseError;
use chrono::{NaiveDateTime, NaiveTime};
use std::fmt;

/// A single spreadsheet value, kept in its source type.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

/// Text form used for CSV fields and schema value lookups.
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Int(v) => write!(f, "{}", v),
            // NaN is a missing value
            Cell::Float(v) if v.is_nan() => Ok(()),
            Cell::Float(v) => f.write_str(&float_repr(*v)),
            Cell::String(v) => f.write_str(v),
            Cell::Bool(true) => f.write_str("True"),
            Cell::Bool(false) => f.write_str("False"),
            Cell::DateTime(v) if v.time() == NaiveTime::MIN => {
                write!(f, "{}", v.format("%Y-%m-%d"))
            }
            Cell::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Shortest round-trip form, with exponents written `e-05` / `e+16`.
fn float_repr(v: f64) -> String {
    let repr = format!("{:?}", v);
    match repr.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => repr,
    }
}

/// In-memory table: named columns plus rows holding exactly one cell per column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from literal rows, checking every row's width.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, ParseError> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), ParseError> {
        if row.len() != self.columns.len() {
            return Err(ParseError::RowWidth {
                row: self.rows.len(),
                found: row.len(),
                expected: self.columns.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
}
