// CSV import/export

use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, Local, NaiveDate};

use gridkit_engine::column::{ColumnDef, ColumnSet, ColumnType};
use gridkit_engine::value::{CellValue, Row};

use crate::error::{ExportError, LoadError};

/// Date format used for date columns in exported files
pub const EXPORT_DATE_FORMAT: &str = "%m/%d/%Y";

// =============================================================================
// Export
// =============================================================================

/// `export-<YYYY-MM-DD>.csv`
pub fn export_filename(date: NaiveDate) -> String {
    format!("export-{}.csv", date.format("%Y-%m-%d"))
}

/// Export filename for today's local date
pub fn default_export_filename() -> String {
    export_filename(Local::now().date_naive())
}

/// Text written for one cell.
///
/// Null and absent are empty, lists join with ";", booleans are Yes/No and
/// dates are reformatted when they parse.
pub fn cell_text(column: &ColumnDef, row: &Row) -> String {
    match row.value(&column.key) {
        CellValue::Null => String::new(),
        CellValue::List(items) => items.join(";"),
        CellValue::Bool(true) => "Yes".to_string(),
        CellValue::Bool(false) => "No".to_string(),
        CellValue::Text(s) if column.column_type == ColumnType::Date => locale_date(s),
        other => other.to_string(),
    }
}

/// ISO date or RFC 3339 timestamp as a short date; anything else unchanged.
pub fn locale_date(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.format(EXPORT_DATE_FORMAT).to_string();
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return ts
            .with_timezone(&Local)
            .date_naive()
            .format(EXPORT_DATE_FORMAT)
            .to_string();
    }
    raw.to_string()
}

/// Write a header row of labels and one record per row. Every field is
/// quoted.
pub fn export_to_writer<W: Write>(
    writer: W,
    columns: &[&ColumnDef],
    rows: &[&Row],
) -> Result<(), ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    writer.write_record(columns.iter().map(|c| c.label.as_str()))?;
    for row in rows {
        writer.write_record(columns.iter().map(|c| cell_text(c, row)))?;
    }

    writer.flush()?;
    Ok(())
}

pub fn export_to_string(columns: &[&ColumnDef], rows: &[&Row]) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    export_to_writer(&mut buf, columns, rows)?;
    Ok(String::from_utf8(buf)?)
}

pub fn export_to_path(path: &Path, columns: &[&ColumnDef], rows: &[&Row]) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    export_to_writer(std::io::BufWriter::new(file), columns, rows)?;
    log::debug!("exported {} rows to {}", rows.len(), path.display());
    Ok(())
}

// =============================================================================
// Import
// =============================================================================

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, LoadError> {
    let mut file = std::fs::File::open(path).map_err(|e| LoadError::read(path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| LoadError::read(path, e))?;

    // Try UTF-8 first; on failure, recover the buffer from the error
    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Fall back to Windows-1252 (common for Excel-exported CSVs)
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

pub fn import_rows(path: &Path, columns: &ColumnSet) -> Result<Vec<Row>, LoadError> {
    let content = read_file_as_utf8(path)?;
    import_rows_from_str(&content, columns)
}

/// Parse rows from CSV text.
///
/// The header names columns by key or label; an `id` header supplies row ids
/// (otherwise the 1-based record number is used). Unknown headers are kept
/// as text fields and empty cells are left absent.
pub fn import_rows_from_str(content: &str, columns: &ColumnSet) -> Result<Vec<Row>, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<(String, Option<&ColumnDef>)> = reader
        .headers()?
        .iter()
        .map(|h| {
            let column = columns
                .get(h)
                .or_else(|| columns.iter().find(|c| c.label == h));
            let key = column.map(|c| c.key.clone()).unwrap_or_else(|| h.to_string());
            (key, column)
        })
        .collect();
    let id_index = headers.iter().position(|(key, _)| key == "id");

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let line = i + 2;
        let id = id_index
            .and_then(|idx| record.get(idx))
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| (i + 1).to_string());

        let mut row = Row::new(id);
        for (idx, field) in record.iter().enumerate() {
            let Some((key, column)) = headers.get(idx) else {
                continue;
            };
            if Some(idx) == id_index || field.is_empty() {
                continue;
            }
            let value = match column {
                Some(col) => parse_cell(col, field, line)?,
                None => CellValue::Text(field.to_string()),
            };
            row.set(key.clone(), value);
        }
        rows.push(row);
    }

    columns.validate_rows(&rows)?;
    Ok(rows)
}

fn parse_cell(column: &ColumnDef, field: &str, line: usize) -> Result<CellValue, LoadError> {
    let bad = |expected: &'static str| LoadError::BadCell {
        line,
        field: column.key.clone(),
        expected,
        value: field.to_string(),
    };
    match column.column_type {
        ColumnType::Number => field
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(CellValue::number)
            .ok_or_else(|| bad("a finite number")),
        ColumnType::Toggle => match field.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(CellValue::Bool(true)),
            "false" | "no" | "0" => Ok(CellValue::Bool(false)),
            _ => Err(bad("yes/no")),
        },
        ColumnType::Tags => Ok(CellValue::List(
            field
                .split(';')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        )),
        _ => Ok(CellValue::Text(field.to_string())),
    }
}
