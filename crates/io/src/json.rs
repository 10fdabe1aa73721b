// JSON column descriptors and row files

use std::path::Path;

use serde::{Deserialize, Serialize};

use gridkit_engine::column::{
    Align, ColumnDef, ColumnSet, ColumnType, SelectOption, ToggleColors, ToggleLabels,
};
use gridkit_engine::value::Row;

use crate::error::LoadError;

/// Serializable form of a [`ColumnDef`]. Callbacks (custom sort values,
/// renderers, edit handlers) can only be attached in code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSpec {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<f64>,
    #[serde(default = "yes")]
    pub default_visible: bool,
    #[serde(default = "yes")]
    pub sortable: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toggle_labels: Option<ToggleLabels>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toggle_colors: Option<ToggleColors>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag_suggestions: Vec<String>,
    #[serde(default = "yes")]
    pub groupable: bool,
    #[serde(default)]
    pub align: Align,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub searchable: Option<bool>,
}

fn yes() -> bool {
    true
}

impl ColumnSpec {
    pub fn into_column_def(self) -> ColumnDef {
        let mut column = ColumnDef::new(self.key, self.label, self.column_type)
            .with_sortable(self.sortable)
            .with_options(self.options)
            .with_tag_suggestions(self.tag_suggestions)
            .with_groupable(self.groupable)
            .with_align(self.align);
        column.default_width = self.width;
        column.max_width = self.max_width;
        column.default_visible = self.default_visible;
        column.toggle_labels = self.toggle_labels;
        column.toggle_colors = self.toggle_colors;
        column.group = self.group;
        column.searchable = self.searchable;
        column
    }
}

impl From<&ColumnDef> for ColumnSpec {
    fn from(column: &ColumnDef) -> Self {
        Self {
            key: column.key.clone(),
            label: column.label.clone(),
            column_type: column.column_type,
            width: column.default_width,
            max_width: column.max_width,
            default_visible: column.default_visible,
            sortable: column.sortable,
            options: column.options.clone(),
            toggle_labels: column.toggle_labels.clone(),
            toggle_colors: column.toggle_colors.clone(),
            group: column.group.clone(),
            tag_suggestions: column.tag_suggestions.clone(),
            groupable: column.groupable,
            align: column.align,
            searchable: column.searchable,
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Parse a JSON array of column descriptors into column definitions.
pub fn parse_columns(json: &str) -> Result<Vec<ColumnDef>, LoadError> {
    let specs: Vec<ColumnSpec> = serde_json::from_str(json)?;
    Ok(specs.into_iter().map(ColumnSpec::into_column_def).collect())
}

pub fn load_columns(path: &Path) -> Result<ColumnSet, LoadError> {
    let json = std::fs::read_to_string(path).map_err(|e| LoadError::read(path, e))?;
    let columns = ColumnSet::new(parse_columns(&json)?)?;
    log::debug!("loaded {} columns from {}", columns.len(), path.display());
    Ok(columns)
}

/// Parse a JSON array of row objects and check them against `columns`.
pub fn parse_rows(json: &str, columns: &ColumnSet) -> Result<Vec<Row>, LoadError> {
    let rows: Vec<Row> = serde_json::from_str(json)?;
    columns.validate_rows(&rows)?;
    Ok(rows)
}

pub fn load_rows(path: &Path, columns: &ColumnSet) -> Result<Vec<Row>, LoadError> {
    let json = std::fs::read_to_string(path).map_err(|e| LoadError::read(path, e))?;
    let rows = parse_rows(&json, columns)?;
    log::debug!("loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridkit_engine::error::GridError;
    use gridkit_engine::value::CellValue;
    use std::fs;
    use tempfile::tempdir;

    const COLUMNS: &str = r#"[
        {"key": "name", "label": "Name", "type": "text", "width": 160},
        {"key": "status", "label": "Status", "type": "select",
         "options": [{"value": "open", "label": "Open"}, {"value": "done", "label": "Done"}]},
        {"key": "active", "label": "Active", "type": "toggle",
         "toggleLabels": {"on": "On", "off": "Off"}, "defaultVisible": false},
        {"key": "tags", "label": "Tags", "type": "tags", "groupable": false, "align": "center"}
    ]"#;

    #[test]
    fn test_parse_columns() {
        let columns = ColumnSet::new(parse_columns(COLUMNS).unwrap()).unwrap();
        assert_eq!(columns.len(), 4);

        let name = columns.get("name").unwrap();
        assert_eq!(name.default_width, Some(160.0));
        assert!(name.sortable);
        assert_eq!(columns.get("status").unwrap().option_label("done"), "Done");

        let active = columns.get("active").unwrap();
        assert!(!active.default_visible);
        assert_eq!(active.toggle_label(true), "On");

        let tags = columns.get("tags").unwrap();
        assert!(!tags.groupable);
        assert_eq!(tags.align, Align::Center);
    }

    #[test]
    fn test_spec_from_column_def() {
        let column = ColumnDef::new("score", "Score", ColumnType::Number)
            .with_default_width(80.0)
            .with_sortable(false);
        let spec = ColumnSpec::from(&column);
        let json = serde_json::to_string(&spec).unwrap();
        let back: ColumnSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
        assert!(!back.into_column_def().sortable);
    }

    #[test]
    fn test_duplicate_column_key_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("columns.json");
        fs::write(
            &path,
            r#"[{"key":"a","label":"A","type":"text"},{"key":"a","label":"B","type":"text"}]"#,
        )
        .unwrap();
        let err = load_columns(&path).unwrap_err();
        assert!(matches!(err, LoadError::Grid(GridError::DuplicateColumnKey { .. })));
    }

    #[test]
    fn test_load_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.json");
        fs::write(
            &path,
            r#"[{"id": 1, "name": "Bob", "active": true, "tags": ["x"]},
                {"id": "2", "name": null}]"#,
        )
        .unwrap();
        let columns = ColumnSet::new(parse_columns(COLUMNS).unwrap()).unwrap();
        let rows = load_rows(&path, &columns).unwrap();
        assert_eq!(rows[0].id(), "1");
        assert_eq!(rows[0].value("active"), &CellValue::Bool(true));
        assert!(rows[1].value("name").is_null());
    }

    #[test]
    fn test_row_type_mismatch() {
        let columns = ColumnSet::new(parse_columns(COLUMNS).unwrap()).unwrap();
        let err = parse_rows(r#"[{"id": 1, "active": "yes"}]"#, &columns).unwrap_err();
        assert!(matches!(err, LoadError::Grid(GridError::TypeMismatch { .. })));
    }

    #[test]
    fn test_missing_file() {
        let err = load_columns(Path::new("/nonexistent/columns.json")).unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }));
    }
}
