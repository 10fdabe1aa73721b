//! Error types for the grid engine.

/// Errors raised while building or driving a grid.
///
/// Persistence problems never show up here: they are absorbed by the
/// view-state store (see [`StoreError`]).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    /// A column was declared with an empty key.
    #[error("column at position {index} has an empty key")]
    EmptyColumnKey { index: usize },

    /// Two columns share a key.
    #[error("duplicate column key '{key}'")]
    DuplicateColumnKey { key: String },

    /// Two rows share an id.
    #[error("duplicate row id '{id}'")]
    DuplicateRowId { id: String },

    /// A row field holds a value of the wrong variant for its column.
    #[error("row '{row_id}' field '{field}' type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        row_id: String,
        field: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A column key that the grid does not know.
    #[error("unknown column '{key}'")]
    UnknownColumn { key: String },

    /// A drag gesture was started while another one is still active.
    #[error("a drag gesture is already in progress")]
    DragInProgress,

    /// Pointer ids start at 1; 0 is reserved for "no pointer".
    #[error("drag gestures require a non-zero pointer id")]
    ZeroPointerId,

    /// The grid was asked for something that needs hydrated view state.
    #[error("view state has not been hydrated yet")]
    NotHydrated,

    /// The operation needs a feature the grid was built without.
    #[error("grid feature '{0}' is disabled")]
    FeatureDisabled(&'static str),
}

impl GridError {
    pub fn unknown_column(key: impl Into<String>) -> Self {
        Self::UnknownColumn { key: key.into() }
    }
}

/// Failure reported by a [`ViewStatePort`](crate::store::ViewStatePort).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("view state I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("view state is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("view state backend unavailable: {0}")]
    Backend(String),
}
