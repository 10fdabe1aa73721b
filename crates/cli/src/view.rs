// show / export: build a grid from files and a stored view

use std::io::Write;
use std::path::{Path, PathBuf};

use gridkit_config::{JsonFileStore, Settings};
use gridkit_engine::column::ColumnSet;
use gridkit_engine::layout::FixedProbe;
use gridkit_engine::{DataGrid, GridOptions};
use gridkit_io::csv::{default_export_filename, export_to_path, export_to_writer};

use crate::table;
use crate::CliError;

/// Input files plus the stored view to apply
#[derive(Debug, Clone, clap::Args)]
pub struct GridArgs {
    /// Rows file (.json array of objects, or .csv with a header row)
    #[arg(long)]
    pub rows: PathBuf,

    /// Column descriptors (.json)
    #[arg(long)]
    pub columns: PathBuf,

    /// Storage key of the view state to apply (and update)
    #[arg(long)]
    pub view: Option<String>,

    /// Global search text
    #[arg(long, short = 's')]
    pub search: Option<String>,
}

fn require_file(path: &Path, what: &str) -> Result<(), CliError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CliError::args(format!("{} file not found: {}", what, path.display())))
    }
}

pub fn load_columns(path: &Path) -> Result<ColumnSet, CliError> {
    require_file(path, "columns")?;
    gridkit_io::json::load_columns(path).map_err(|e| CliError::load(path, e))
}

/// Load the files, then hydrate the stored view (if any).
pub fn open_grid(settings: &Settings, store: JsonFileStore, args: &GridArgs) -> Result<DataGrid, CliError> {
    let columns = load_columns(&args.columns)?;
    require_file(&args.rows, "rows")?;
    let rows = gridkit_io::load_rows_auto(&args.rows, &columns).map_err(|e| CliError::load(&args.rows, e))?;

    let mut options = GridOptions::new(columns.iter().cloned().collect(), rows)
        .with_features(settings.features)
        .with_layout(settings.layout_config());
    if let Some(search) = &args.search {
        options = options.with_search(search.clone());
    }
    if let Some(key) = &args.view {
        options = options.with_storage_key(key.clone());
    }

    let mut grid = DataGrid::new(options, store).map_err(|e| CliError::error(e.to_string()))?;
    if grid.hydrate() {
        log::info!("applied stored view '{}'", args.view.as_deref().unwrap_or_default());
    }
    Ok(grid)
}

// ============================================================================
// show
// ============================================================================

pub fn cmd_show(
    settings: &Settings,
    store: JsonFileStore,
    args: &GridArgs,
    limit: Option<usize>,
) -> Result<(), CliError> {
    let mut grid = open_grid(settings, store, args)?;
    let frame = grid
        .frame(&FixedProbe::default())
        .ok_or_else(|| CliError::error("view state was not hydrated"))?;

    let out = table::render(&frame, limit);
    std::io::stdout()
        .lock()
        .write_all(out.as_bytes())
        .map_err(|e| CliError::error(e.to_string()))
}

// ============================================================================
// export
// ============================================================================

/// Write the current view as CSV. `-` writes to stdout.
pub fn cmd_export(
    settings: &Settings,
    store: JsonFileStore,
    args: &GridArgs,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let mut grid = open_grid(settings, store, args)?;
    let view = grid.export_rows().ok_or_else(|| {
        CliError::args("CSV export is disabled").with_hint("set \"grid.features\": { \"exportCsv\": true } in settings.json")
    })?;

    match output {
        Some(path) if path.as_os_str() == "-" => {
            export_to_writer(std::io::stdout().lock(), &view.columns, &view.rows)
                .map_err(|e| CliError::error(e.to_string()))?;
        }
        output => {
            let path = output.unwrap_or_else(|| PathBuf::from(default_export_filename()));
            export_to_path(&path, &view.columns, &view.rows)
                .map_err(|e| CliError::error(format!("{}: {}", path.display(), e)))?;
            eprintln!("wrote {} rows to {}", view.rows.len(), path.display());
        }
    }
    Ok(())
}
