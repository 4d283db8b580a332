// src/table/parse.rs

use super::{Cell, Table};
use crate::error::ParseError;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::{collections::HashSet, io::Cursor};

/// Parse spreadsheet bytes (`.xls` or `.xlsx`) into a [`Table`].
///
/// Only the first worksheet is read. The first non-blank row is the header;
/// fully blank rows are skipped.
pub fn parse_workbook(bytes: &[u8]) -> Result<Table, ParseError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(ParseError::NoSheets)?;
    let range = workbook.worksheet_range_at(0).ok_or(ParseError::NoSheets)??;

    // calamine ranges start at the first used cell; keep leading blank columns
    let col_offset = range.start().map_or(0, |(_, col)| col as usize);

    let mut rows = range
        .rows()
        .map(|row| {
            let mut cells = vec![Cell::Empty; col_offset];
            cells.extend(row.iter().map(convert_cell));
            cells
        })
        .filter(|cells| !cells.iter().all(Cell::is_empty));

    let header = rows.next().ok_or(ParseError::Empty(sheet_name))?;
    let columns = column_names(&header);
    let width = columns.len();

    let mut table = Table::new(columns);
    for mut cells in rows {
        if cells.len() < width {
            cells.resize(width, Cell::Empty);
        }
        table.push_row(cells)?;
    }
    Ok(table)
}

fn convert_cell(value: &Data) -> Cell {
    match value {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(v) => Cell::Int(*v),
        Data::Float(v) => number(*v),
        Data::String(v) => Cell::String(v.clone()),
        Data::Bool(v) => Cell::Bool(*v),
        Data::DateTime(v) if v.is_duration() => number(v.as_f64()),
        Data::DateTime(v) => v
            .as_datetime()
            .map(Cell::DateTime)
            .unwrap_or_else(|| number(v.as_f64())),
        Data::DateTimeIso(v) => parse_iso(v)
            .map(Cell::DateTime)
            .unwrap_or_else(|| Cell::String(v.clone())),
        Data::DurationIso(v) => Cell::String(v.clone()),
    }
}

/// Spreadsheets store every number as a double; integral values become `Int`.
fn number(v: f64) -> Cell {
    if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Cell::Int(v as i64)
    } else {
        Cell::Float(v)
    }
}

fn parse_iso(s: &str) -> Option<NaiveDateTime> {
    s.parse::<NaiveDateTime>().ok().or_else(|| {
        s.parse::<NaiveDate>()
            .ok()
            .map(|d| d.and_time(NaiveTime::MIN))
    })
}

/// Header cells become names; blanks get `Unnamed: {i}`, repeats get `.1`, `.2`, …
fn column_names(header: &[Cell]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(header.len());
    header
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let base = match cell {
                Cell::Empty => format!("Unnamed: {}", i),
                other => other.to_string(),
            };
            let mut name = base.clone();
            let mut suffix = 0;
            while !seen.insert(name.clone()) {
                suffix += 1;
                name = format!("{}.{}", base, suffix);
            }
            name
        })
        .collect()
}
