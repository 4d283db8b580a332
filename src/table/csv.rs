// src/table/csv.rs

use super::Table;
use ::csv::{Terminator, WriterBuilder};

/// Serialize `table` as UTF-8 CSV: no header row, no index column, `\n` line endings.
pub fn to_csv_bytes(table: &Table) -> Result<Vec<u8>, ::csv::Error> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::with_capacity(table.num_rows() * table.num_columns() * 8));

    for row in table.rows() {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| ::csv::Error::from(e.into_error()))
}
