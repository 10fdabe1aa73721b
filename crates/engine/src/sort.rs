//! Multi-key stable sorting
//!
//! Invariants:
//! - Rules apply in priority order; the first non-equal comparison wins
//! - Null (or absent) values sort last under both directions
//! - Complete ties keep their input order (stable sort)

use std::borrow::Cow;
use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::column::{ColumnDef, ColumnSet};
use crate::value::{CellValue, Row};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// One ordering constraint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortRule {
    pub key: String,
    pub direction: SortDirection,
}

impl SortRule {
    pub fn asc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            direction: SortDirection::Desc,
        }
    }
}

// =============================================================================
// Comparison
// =============================================================================

/// Locale-style string ordering: case-folded first, then lowercase before
/// uppercase for strings that differ only in case.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    let folded = a.to_lowercase().cmp(&b.to_lowercase());
    if folded != Ordering::Equal {
        return folded;
    }
    b.cmp(a)
}

/// Type-aware comparison of two non-null values.
pub fn compare_values(a: &CellValue, b: &CellValue) -> Ordering {
    match (a, b) {
        (CellValue::Text(x), CellValue::Text(y)) => locale_cmp(x, y),
        (CellValue::Number(x), CellValue::Number(y)) => x.cmp(y),
        // false < true, i.e. 0/1
        (CellValue::Bool(x), CellValue::Bool(y)) => x.cmp(y),
        _ => locale_cmp(&a.to_string(), &b.to_string()),
    }
}

/// Compare under a direction. Nulls go last no matter the direction.
pub fn compare_directed(a: &CellValue, b: &CellValue, direction: SortDirection) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = compare_values(a, b);
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
    }
}

// =============================================================================
// Sorting
// =============================================================================

/// Stable multi-key sort. Rules naming unknown columns are skipped; an empty
/// rule list returns `rows` as given.
pub fn sort_rows<'a>(rows: Vec<&'a Row>, columns: &ColumnSet, sorts: &[SortRule]) -> Vec<&'a Row> {
    let rules: Vec<(&ColumnDef, SortDirection)> = sorts
        .iter()
        .filter_map(|rule| columns.get(&rule.key).map(|col| (col, rule.direction)))
        .collect();
    if rules.is_empty() {
        return rows;
    }

    // Resolve keys once per row; custom extractors may be expensive.
    let mut keyed: Vec<(Vec<Cow<'a, CellValue>>, &'a Row)> = rows
        .into_iter()
        .map(|row| {
            let keys = rules.iter().map(|(col, _)| col.sort_key(row)).collect();
            (keys, row)
        })
        .collect();

    // slice::sort_by is stable
    keyed.sort_by(|(ka, _), (kb, _)| {
        for (i, (_, direction)) in rules.iter().enumerate() {
            let ord = compare_directed(&ka[i], &kb[i], *direction);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });

    keyed.into_iter().map(|(_, row)| row).collect()
}

// =============================================================================
// Tests
// =============================================================================
