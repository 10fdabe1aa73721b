// state: inspect and edit stored view states

use std::path::PathBuf;

use clap::Subcommand;

use gridkit_config::JsonFileStore;
use gridkit_engine::sort::{SortDirection, SortRule};
use gridkit_engine::store::ViewStatePort;
use gridkit_engine::{PersistedViewState, ViewAction, ViewStateStore};

use crate::view::load_columns;
use crate::CliError;

#[derive(Subcommand)]
pub enum StateCommands {
    /// Print a stored view state as JSON
    #[command(after_help = "\
With --columns the state is reconciled first: unknown columns are dropped,
new columns appended and the freeze count clamped.

Examples:
  gridkit state show people
  gridkit state show people --columns columns.json")]
    Show {
        /// Storage key
        key: String,

        /// Column descriptors to reconcile against
        #[arg(long)]
        columns: Option<PathBuf>,
    },

    /// Delete a stored view state
    Reset {
        /// Storage key
        key: String,
    },

    /// Set how many leading columns stay frozen (-1 = off, 0 = selection only)
    #[command(allow_negative_numbers = true)]
    Freeze {
        /// Storage key
        key: String,

        /// Freeze count
        count: i32,

        /// Column descriptors
        #[arg(long)]
        columns: PathBuf,
    },

    /// Replace the sort with a single column
    Sort {
        /// Storage key
        key: String,

        /// Column key to sort by
        field: String,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// Column descriptors
        #[arg(long)]
        columns: PathBuf,
    },

    /// List stored view keys
    List,
}

pub fn run(store: JsonFileStore, command: StateCommands) -> Result<(), CliError> {
    match command {
        StateCommands::Show { key, columns } => cmd_show(&store, &key, columns),
        StateCommands::Reset { key } => {
            store.remove(&key).map_err(|e| CliError::error(e.to_string()))?;
            eprintln!("reset view '{}'", key);
            Ok(())
        }
        StateCommands::Freeze { key, count, columns } => {
            let mut views = open_store(store, &key, &columns)?;
            views.dispatch(ViewAction::SetFreezeCount(count));
            print_state(views.state())
        }
        StateCommands::Sort {
            key,
            field,
            desc,
            columns,
        } => {
            let mut views = open_store(store, &key, &columns)?;
            let Some(column) = views.columns().get(&field) else {
                return Err(CliError::args(format!("unknown column '{}'", field)));
            };
            if !column.sortable {
                return Err(CliError::args(format!("column '{}' is not sortable", field)));
            }
            let direction = if desc { SortDirection::Desc } else { SortDirection::Asc };
            views.dispatch(ViewAction::SetSorts(vec![SortRule {
                key: field,
                direction,
            }]));
            print_state(views.state())
        }
        StateCommands::List => {
            for key in store.list_keys() {
                println!("{}", key);
            }
            Ok(())
        }
    }
}

fn open_store(store: JsonFileStore, key: &str, columns: &std::path::Path) -> Result<ViewStateStore, CliError> {
    let columns = load_columns(columns)?;
    let mut views = ViewStateStore::new(columns, Box::new(store), Some(key.to_string()));
    views.hydrate();
    Ok(views)
}

fn cmd_show(store: &JsonFileStore, key: &str, columns: Option<PathBuf>) -> Result<(), CliError> {
    let state = match columns {
        Some(path) => {
            let columns = load_columns(&path)?;
            let mut views = ViewStateStore::new(columns, Box::new(store.clone()), Some(key.to_string()));
            if !views.hydrate() {
                return Err(no_such_view(key));
            }
            views.state().clone()
        }
        None => {
            let json = store
                .load(key)
                .map_err(|e| CliError::error(e.to_string()))?
                .ok_or_else(|| no_such_view(key))?;
            PersistedViewState::from_json(&json).map_err(|e| CliError::error(format!("view '{}': {}", key, e)))?
        }
    };
    print_state(&state)
}

fn no_such_view(key: &str) -> CliError {
    CliError::args(format!("no stored view '{}'", key)).with_hint("list stored views with `gridkit state list`")
}

fn print_state(state: &PersistedViewState) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(state).map_err(|e| CliError::error(e.to_string()))?;
    println!("{}", json);
    Ok(())
}
