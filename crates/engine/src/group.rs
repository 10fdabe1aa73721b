//! Single-key grouping
//!
//! Partitions already filtered and sorted rows into labelled groups. Groups
//! appear in first-seen order and keep the incoming row order inside.

use std::collections::HashMap;

use crate::value::{CellValue, Row};

/// Label used for rows whose group value is null or absent
pub const EMPTY_GROUP_LABEL: &str = "(empty)";

/// A labelled run of rows
#[derive(Debug, Clone, PartialEq)]
pub struct RowGroup<'a> {
    pub label: String,
    pub rows: Vec<&'a Row>,
}

/// Stringified group key of a value
pub fn group_label(value: &CellValue) -> String {
    match value {
        CellValue::Null => EMPTY_GROUP_LABEL.to_string(),
        CellValue::Bool(true) => "Yes".to_string(),
        CellValue::Bool(false) => "No".to_string(),
        other => other.to_string(),
    }
}

pub fn group_rows<'a>(rows: &[&'a Row], field: &str) -> Vec<RowGroup<'a>> {
    let mut groups: Vec<RowGroup<'a>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for &row in rows {
        let label = group_label(row.value(field));
        match index.get(&label) {
            Some(&i) => groups[i].rows.push(row),
            None => {
                index.insert(label.clone(), groups.len());
                groups.push(RowGroup {
                    label,
                    rows: vec![row],
                });
            }
        }
    }

    groups
}
