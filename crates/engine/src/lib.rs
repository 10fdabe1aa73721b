pub mod column;
pub mod display;
pub mod drag;
pub mod editing;
pub mod error;
pub mod filter;
pub mod grid;
pub mod group;
pub mod layout;
pub mod pipeline;
pub mod sort;
pub mod store;
pub mod value;
pub mod view_state;

pub use column::{ColumnDef, ColumnSet, ColumnType};
pub use error::{GridError, StoreError};
pub use grid::{DataGrid, GridFeatures, GridFrame, GridOptions};
pub use store::{MemoryPort, ViewStatePort, ViewStateStore};
pub use value::{CellValue, Row};
pub use view_state::{PersistedViewState, ViewAction};
