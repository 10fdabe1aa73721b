//! Column descriptors
//!
//! A [`ColumnDef`] is static, caller-supplied metadata for one grid column.
//! Columns are grouped into a validated [`ColumnSet`] once per grid instance;
//! changing the set of columns means building a new set and re-deriving the
//! view state from it.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::editing::EditHandler;
use crate::error::GridError;
use crate::value::{CellValue, Row, ValueKind};

// =============================================================================
// Column types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Number,
    Toggle,
    Select,
    Tags,
    Thumbnail,
    Date,
}

impl ColumnType {
    /// The value variant rows must hold for this column (null always allowed).
    pub fn expected_kind(self) -> ValueKind {
        match self {
            ColumnType::Text | ColumnType::Select | ColumnType::Thumbnail | ColumnType::Date => {
                ValueKind::Text
            }
            ColumnType::Number => ValueKind::Number,
            ColumnType::Toggle => ValueKind::Bool,
            ColumnType::Tags => ValueKind::List,
        }
    }

    pub fn accepts(self, value: &CellValue) -> bool {
        value.is_null() || value.kind() == self.expected_kind()
    }

    /// Searched when the column leaves `searchable` unset
    pub fn is_default_searchable(self) -> bool {
        matches!(self, ColumnType::Text | ColumnType::Select)
    }

    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Number => "number",
            ColumnType::Toggle => "toggle",
            ColumnType::Select => "select",
            ColumnType::Tags => "tags",
            ColumnType::Thumbnail => "thumbnail",
            ColumnType::Date => "date",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// One choice of a select column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Labels shown for a toggle's two states
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleLabels {
    pub on: String,
    pub off: String,
}

impl Default for ToggleLabels {
    fn default() -> Self {
        Self {
            on: "Yes".to_string(),
            off: "No".to_string(),
        }
    }
}

/// Colors (host-interpreted tokens) for a toggle's two states
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleColors {
    pub on: String,
    pub off: String,
}

pub type SortValueFn = Arc<dyn Fn(&Row) -> CellValue + Send + Sync>;
pub type RenderFn = Arc<dyn Fn(&Row) -> String + Send + Sync>;

// =============================================================================
// ColumnDef
// =============================================================================

#[derive(Clone)]
pub struct ColumnDef {
    /// Stable identifier used for storage, sort and filter
    pub key: String,
    pub label: String,
    pub column_type: ColumnType,
    pub default_width: Option<f64>,
    pub max_width: Option<f64>,
    pub default_visible: bool,
    pub sortable: bool,
    /// Custom sort key extractor
    pub sort_value: Option<SortValueFn>,
    /// Choices for select columns
    pub options: Vec<SelectOption>,
    pub toggle_labels: Option<ToggleLabels>,
    pub toggle_colors: Option<ToggleColors>,
    /// Field-picker group
    pub group: Option<String>,
    /// Read-only rendering override
    pub render: Option<RenderFn>,
    /// Mutation callback; columns without one are read-only
    pub on_edit: Option<EditHandler>,
    pub tag_suggestions: Vec<String>,
    pub groupable: bool,
    pub align: Align,
    /// `None` = searchable when the type is text or select
    pub searchable: Option<bool>,
}

impl ColumnDef {
    pub fn new(key: impl Into<String>, label: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            column_type,
            default_width: None,
            max_width: None,
            default_visible: true,
            sortable: true,
            sort_value: None,
            options: Vec::new(),
            toggle_labels: None,
            toggle_colors: None,
            group: None,
            render: None,
            on_edit: None,
            tag_suggestions: Vec::new(),
            groupable: true,
            align: Align::Left,
            searchable: None,
        }
    }

    pub fn with_default_width(mut self, width: f64) -> Self {
        self.default_width = Some(width);
        self
    }

    pub fn with_max_width(mut self, width: f64) -> Self {
        self.max_width = Some(width);
        self
    }

    pub fn hidden_by_default(mut self) -> Self {
        self.default_visible = false;
        self
    }

    pub fn with_sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn with_sort_value<F>(mut self, f: F) -> Self
    where
        F: Fn(&Row) -> CellValue + Send + Sync + 'static,
    {
        self.sort_value = Some(Arc::new(f));
        self
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_toggle_labels(mut self, on: impl Into<String>, off: impl Into<String>) -> Self {
        self.toggle_labels = Some(ToggleLabels {
            on: on.into(),
            off: off.into(),
        });
        self
    }

    pub fn with_toggle_colors(mut self, on: impl Into<String>, off: impl Into<String>) -> Self {
        self.toggle_colors = Some(ToggleColors {
            on: on.into(),
            off: off.into(),
        });
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_render<F>(mut self, f: F) -> Self
    where
        F: Fn(&Row) -> String + Send + Sync + 'static,
    {
        self.render = Some(Arc::new(f));
        self
    }

    pub fn with_on_edit(mut self, handler: EditHandler) -> Self {
        self.on_edit = Some(handler);
        self
    }

    pub fn with_tag_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.tag_suggestions = suggestions;
        self
    }

    pub fn with_groupable(mut self, groupable: bool) -> Self {
        self.groupable = groupable;
        self
    }

    pub fn with_align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn with_searchable(mut self, searchable: bool) -> Self {
        self.searchable = Some(searchable);
        self
    }

    pub fn is_searchable(&self) -> bool {
        self.searchable
            .unwrap_or_else(|| self.column_type.is_default_searchable())
    }

    pub fn is_editable(&self) -> bool {
        self.on_edit.is_some()
    }

    /// Label of a select option, falling back to the raw value
    pub fn option_label<'a>(&'a self, value: &'a str) -> &'a str {
        self.options
            .iter()
            .find(|o| o.value == value)
            .map(|o| o.label.as_str())
            .unwrap_or(value)
    }

    pub fn toggle_label(&self, on: bool) -> String {
        let labels = self.toggle_labels.clone().unwrap_or_default();
        if on { labels.on } else { labels.off }
    }

    /// Value used to order rows by this column
    pub fn sort_key<'a>(&self, row: &'a Row) -> std::borrow::Cow<'a, CellValue> {
        match &self.sort_value {
            Some(f) => std::borrow::Cow::Owned(f(row)),
            None => std::borrow::Cow::Borrowed(row.value(&self.key)),
        }
    }
}

impl fmt::Debug for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDef")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("column_type", &self.column_type)
            .field("default_width", &self.default_width)
            .field("default_visible", &self.default_visible)
            .field("sortable", &self.sortable)
            .field("custom_sort", &self.sort_value.is_some())
            .field("editable", &self.on_edit.is_some())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// ColumnSet
// =============================================================================

/// Validated, immutable, declaration-ordered set of columns.
///
/// Cloning is cheap; all clones share the same definitions.
#[derive(Debug, Clone)]
pub struct ColumnSet {
    inner: Arc<ColumnSetInner>,
}

#[derive(Debug)]
struct ColumnSetInner {
    columns: Vec<ColumnDef>,
    index: HashMap<String, usize>,
}

impl ColumnSet {
    /// Rejects empty and duplicate keys.
    pub fn new(columns: Vec<ColumnDef>) -> Result<Self, GridError> {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, col) in columns.iter().enumerate() {
            if col.key.is_empty() {
                return Err(GridError::EmptyColumnKey { index: i });
            }
            if index.insert(col.key.clone(), i).is_some() {
                return Err(GridError::DuplicateColumnKey {
                    key: col.key.clone(),
                });
            }
        }
        Ok(Self {
            inner: Arc::new(ColumnSetInner { columns, index }),
        })
    }

    pub fn get(&self, key: &str) -> Option<&ColumnDef> {
        self.inner.index.get(key).map(|&i| &self.inner.columns[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.index.contains_key(key)
    }

    /// Declaration index of a column
    pub fn position(&self, key: &str) -> Option<usize> {
        self.inner.index.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnDef> {
        self.inner.columns.iter()
    }

    /// Keys in declaration order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.columns.iter().map(|c| c.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.inner.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.columns.is_empty()
    }

    /// Check every row against the declared column types and id uniqueness.
    ///
    /// Fields without a matching column are ignored.
    pub fn validate_rows(&self, rows: &[Row]) -> Result<(), GridError> {
        let mut seen = HashSet::with_capacity(rows.len());
        for row in rows {
            if !seen.insert(row.id()) {
                return Err(GridError::DuplicateRowId {
                    id: row.id().to_string(),
                });
            }
            for (field, value) in row.fields() {
                let Some(col) = self.get(field) else {
                    continue;
                };
                if !col.column_type.accepts(value) {
                    return Err(GridError::TypeMismatch {
                        row_id: row.id().to_string(),
                        field: field.to_string(),
                        expected: col.column_type.expected_kind().name(),
                        actual: value.kind().name(),
                    });
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
