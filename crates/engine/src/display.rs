//! Read-only cell text

use crate::column::{ColumnDef, ColumnType};
use crate::value::{CellValue, Row};

/// What a non-editing cell shows.
pub fn display_value(column: &ColumnDef, row: &Row) -> String {
    if let Some(render) = &column.render {
        return render(row);
    }

    let value = row.value(&column.key);
    match (column.column_type, value) {
        (_, CellValue::Null) => String::new(),
        (ColumnType::Toggle, CellValue::Bool(b)) => column.toggle_label(*b),
        (ColumnType::Select, CellValue::Text(s)) => column.option_label(s).to_string(),
        (_, CellValue::List(items)) => items.join(", "),
        (_, other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::SelectOption;

    #[test]
    fn test_display_by_type() {
        let row = Row::new("1")
            .with("active", true)
            .with("status", "open")
            .with("tags", vec!["a", "b"])
            .with("score", 3.0)
            .with("due", "2024-05-01");

        let toggle = ColumnDef::new("active", "Active", ColumnType::Toggle);
        assert_eq!(display_value(&toggle, &row), "Yes");
        let toggle = toggle.with_toggle_labels("On", "Off");
        assert_eq!(display_value(&toggle, &row), "On");

        let select = ColumnDef::new("status", "Status", ColumnType::Select)
            .with_options(vec![SelectOption::new("open", "Open")]);
        assert_eq!(display_value(&select, &row), "Open");

        let tags = ColumnDef::new("tags", "Tags", ColumnType::Tags);
        assert_eq!(display_value(&tags, &row), "a, b");

        let score = ColumnDef::new("score", "Score", ColumnType::Number);
        assert_eq!(display_value(&score, &row), "3");

        let due = ColumnDef::new("due", "Due", ColumnType::Date);
        assert_eq!(display_value(&due, &row), "2024-05-01");

        let missing = ColumnDef::new("nope", "Nope", ColumnType::Text);
        assert_eq!(display_value(&missing, &row), "");
    }

    #[test]
    fn test_render_override() {
        let col = ColumnDef::new("score", "Score", ColumnType::Number)
            .with_render(|row| format!("{} pts", row.value("score")));
        let row = Row::new("1").with("score", 7.0);
        assert_eq!(display_value(&col, &row), "7 pts");
    }
}
