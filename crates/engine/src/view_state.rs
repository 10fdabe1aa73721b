//! Persisted view state and the reducer that mutates it
//!
//! A snapshot holds everything about how the user looks at a grid (sorts,
//! filters, grouping, column visibility/order/widths, freeze panes) and
//! nothing about the rows themselves. It is stored as one JSON object per
//! storage key.
//!
//! Invariants after [`PersistedViewState::reconcile`]:
//! - `col_order` is a permutation of the current column keys
//! - `visible_cols` and `col_widths` only name current columns
//! - `freeze_count` is -1 or within `[0, visible column count]`

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::column::ColumnSet;
use crate::filter::FilterRule;
use crate::layout::{reorder_columns, FREEZE_OFF};
use crate::sort::{SortDirection, SortRule};

/// Snapshots written by this engine carry this marker. Snapshots without it
/// predate the "0 = checkbox column only" freeze meaning.
pub const FREEZE_VERSION: u32 = 2;

fn freeze_off() -> i32 {
    FREEZE_OFF
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedViewState {
    #[serde(default)]
    pub sorts: Vec<SortRule>,
    #[serde(default)]
    pub filters: Vec<FilterRule>,
    #[serde(default)]
    pub group_field: Option<String>,
    #[serde(default)]
    pub collapsed_groups: BTreeSet<String>,
    #[serde(default)]
    pub visible_cols: BTreeSet<String>,
    #[serde(default)]
    pub col_widths: BTreeMap<String, f64>,
    #[serde(default)]
    pub col_order: Vec<String>,
    #[serde(default = "freeze_off")]
    pub freeze_count: i32,
    #[serde(default)]
    pub freeze_version: u32,
}

impl PersistedViewState {
    /// Declaration order, `default_visible` columns shown, nothing else set.
    pub fn defaults(columns: &ColumnSet) -> Self {
        Self {
            sorts: Vec::new(),
            filters: Vec::new(),
            group_field: None,
            collapsed_groups: BTreeSet::new(),
            visible_cols: default_visible(columns),
            col_widths: BTreeMap::new(),
            col_order: columns.keys().map(str::to_string).collect(),
            freeze_count: FREEZE_OFF,
            freeze_version: FREEZE_VERSION,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Number of visible columns that still exist
    pub fn visible_count(&self, columns: &ColumnSet) -> usize {
        self.visible_cols
            .iter()
            .filter(|key| columns.contains(key))
            .count()
    }

    pub fn is_visible(&self, key: &str) -> bool {
        self.visible_cols.contains(key)
    }

    /// Keep `freeze_count` within `[-1, visible count]`
    pub fn clamp_freeze(&mut self, columns: &ColumnSet) {
        let max = self.visible_count(columns) as i32;
        self.freeze_count = self.freeze_count.clamp(FREEZE_OFF, max);
    }

    pub fn sort_for(&self, key: &str) -> Option<(usize, SortDirection)> {
        self.sorts
            .iter()
            .position(|s| s.key == key)
            .map(|i| (i, self.sorts[i].direction))
    }

    /// Fit a snapshot loaded from storage to the current column set.
    pub fn reconcile(mut self, columns: &ColumnSet) -> Self {
        if self.freeze_version < FREEZE_VERSION {
            if self.freeze_count == 0 {
                log::debug!("legacy freezeCount 0 read as 'off'");
                self.freeze_count = FREEZE_OFF;
            }
            self.freeze_version = FREEZE_VERSION;
        }

        self.col_order = merge_order(&self.col_order, columns);

        self.visible_cols.retain(|key| columns.contains(key));
        if self.visible_cols.is_empty() {
            self.visible_cols = default_visible(columns);
        }
        self.col_widths
            .retain(|key, width| columns.contains(key) && width.is_finite());

        if let Some(field) = &self.group_field {
            if !columns.contains(field) {
                log::debug!("dropping group field '{}': no such column", field);
                self.group_field = None;
                self.collapsed_groups.clear();
            }
        }

        self.clamp_freeze(columns);
        self
    }

    /// Apply one action. The result equals `self` when the action had no
    /// effect.
    pub fn reduce(&self, action: ViewAction, columns: &ColumnSet) -> Self {
        let mut next = self.clone();
        match action {
            ViewAction::SetSorts(sorts) => {
                next.sorts = sorts
                    .into_iter()
                    .filter(|s| columns.get(&s.key).is_some_and(|c| c.sortable))
                    .collect();
            }
            ViewAction::ToggleSort { key, additive } => {
                if columns.get(&key).is_some_and(|c| c.sortable) {
                    next.sorts = toggle_sort(&self.sorts, &key, additive);
                }
            }
            ViewAction::SetFilters(filters) => {
                next.filters = filters.into_iter().map(FilterRule::normalized).collect();
            }
            ViewAction::AddFilter(rule) => next.filters.push(rule.normalized()),
            ViewAction::UpdateFilter { index, rule } => {
                if let Some(slot) = next.filters.get_mut(index) {
                    *slot = rule.normalized();
                }
            }
            ViewAction::RemoveFilter(index) => {
                if index < next.filters.len() {
                    next.filters.remove(index);
                }
            }
            ViewAction::ClearFilters => next.filters.clear(),
            ViewAction::SetGroupField(field) => match field {
                Some(field) if columns.get(&field).is_some_and(|c| c.groupable) => {
                    if self.group_field.as_deref() != Some(field.as_str()) {
                        next.group_field = Some(field);
                        next.collapsed_groups.clear();
                    }
                }
                Some(_) => {}
                None => {
                    next.group_field = None;
                    next.collapsed_groups.clear();
                }
            },
            ViewAction::ToggleGroupCollapsed(label) => {
                if !next.collapsed_groups.remove(&label) {
                    next.collapsed_groups.insert(label);
                }
            }
            ViewAction::SetColumnVisible { key, visible } => {
                if columns.contains(&key) {
                    if visible {
                        next.visible_cols.insert(key);
                    } else if next.visible_count(columns) > 1 || !next.is_visible(&key) {
                        next.visible_cols.remove(&key);
                    }
                    next.clamp_freeze(columns);
                }
            }
            ViewAction::ShowAllColumns => {
                next.visible_cols = columns.keys().map(str::to_string).collect();
            }
            ViewAction::ResetColumns => {
                let defaults = Self::defaults(columns);
                next.visible_cols = defaults.visible_cols;
                next.col_order = defaults.col_order;
                next.col_widths.clear();
                next.clamp_freeze(columns);
            }
            ViewAction::SetColumnWidths(widths) => {
                for (key, width) in widths {
                    if columns.contains(&key) && width.is_finite() {
                        next.col_widths.insert(key, width);
                    }
                }
            }
            ViewAction::SetColumnWidth { key, width } => {
                if columns.contains(&key) && width.is_finite() {
                    next.col_widths.insert(key, width);
                }
            }
            ViewAction::SetColumnOrder(order) => {
                next.col_order = merge_order(&order, columns);
            }
            ViewAction::MoveColumn { from, to, pinned } => {
                if let Some(order) = reorder_columns(&self.col_order, &from, &to) {
                    next.col_order = order;
                    for (key, width) in pinned {
                        if columns.contains(&key) && width.is_finite() {
                            next.col_widths.entry(key).or_insert(width);
                        }
                    }
                }
            }
            ViewAction::SetFreezeCount(count) => {
                next.freeze_count = count;
                next.clamp_freeze(columns);
            }
            ViewAction::Reset => next = Self::defaults(columns),
        }
        next
    }
}

/// A change requested by the user or the host
#[derive(Debug, Clone, PartialEq)]
pub enum ViewAction {
    SetSorts(Vec<SortRule>),
    /// Cycle asc, desc, removed. Without `additive` the key replaces all
    /// other sorts.
    ToggleSort { key: String, additive: bool },
    SetFilters(Vec<FilterRule>),
    AddFilter(FilterRule),
    UpdateFilter { index: usize, rule: FilterRule },
    RemoveFilter(usize),
    ClearFilters,
    SetGroupField(Option<String>),
    ToggleGroupCollapsed(String),
    SetColumnVisible { key: String, visible: bool },
    ShowAllColumns,
    ResetColumns,
    SetColumnWidths(BTreeMap<String, f64>),
    SetColumnWidth { key: String, width: f64 },
    SetColumnOrder(Vec<String>),
    /// Move `from` to the slot of `to`. `pinned` widths are written for
    /// columns without an override so flex columns keep their size.
    MoveColumn {
        from: String,
        to: String,
        pinned: BTreeMap<String, f64>,
    },
    SetFreezeCount(i32),
    Reset,
}

/// `default_visible` columns, or the first column when none are.
fn default_visible(columns: &ColumnSet) -> BTreeSet<String> {
    let mut visible: BTreeSet<String> = columns
        .iter()
        .filter(|c| c.default_visible)
        .map(|c| c.key.clone())
        .collect();
    if visible.is_empty() {
        visible.extend(columns.keys().next().map(str::to_string));
    }
    visible
}

/// Known keys keep their stored order, unknown keys are dropped, columns
/// missing from `stored` are appended in declaration order.
fn merge_order(stored: &[String], columns: &ColumnSet) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut order: Vec<String> = stored
        .iter()
        .filter(|key| columns.contains(key) && seen.insert(key.as_str()))
        .cloned()
        .collect();
    for key in columns.keys() {
        if !seen.contains(key) {
            order.push(key.to_string());
        }
    }
    order
}

fn toggle_sort(sorts: &[SortRule], key: &str, additive: bool) -> Vec<SortRule> {
    let existing = sorts.iter().position(|s| s.key == key);
    let cycled = match existing.map(|i| sorts[i].direction) {
        None => Some(SortRule::asc(key)),
        Some(SortDirection::Asc) => Some(SortRule::desc(key)),
        Some(SortDirection::Desc) => None,
    };

    if !additive {
        return cycled.into_iter().collect();
    }

    let mut next = sorts.to_vec();
    match (existing, cycled) {
        (Some(i), Some(rule)) => next[i] = rule,
        (Some(i), None) => {
            next.remove(i);
        }
        (None, Some(rule)) => next.push(rule),
        (None, None) => {}
    }
    next
}

// =============================================================================
// Tests
// =============================================================================
