// File I/O operations

pub mod csv;
pub mod error;
pub mod json;

pub use error::{ExportError, LoadError};
pub use json::ColumnSpec;

use std::path::Path;

use gridkit_engine::column::ColumnSet;
use gridkit_engine::value::Row;

/// Load rows from a `.csv` file, or a JSON array for any other extension.
pub fn load_rows_auto(path: &Path, columns: &ColumnSet) -> Result<Vec<Row>, LoadError> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        csv::import_rows(path, columns)
    } else {
        json::load_rows(path, columns)
    }
}
