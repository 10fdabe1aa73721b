//! Column Layout Engine
//!
//! Computes which columns show and in what order, their pixel widths, and the
//! sticky offsets of frozen leading columns. Also holds the pure math behind
//! the pointer gestures (resize, reorder, freeze divider); the gestures
//! themselves live in [`crate::drag`].
//!
//! Frozen offsets come from *rendered* widths, not from the override map:
//! most columns are flex-sized, so the host lays out once, measures through a
//! [`LayoutProbe`], and then applies offsets.

use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

use crate::column::{ColumnDef, ColumnSet};

/// Narrowest a column can be dragged
pub const MIN_COLUMN_WIDTH: f64 = 40.0;
/// Width of the row-selection checkbox column
pub const SELECTION_COLUMN_WIDTH: f64 = 40.0;
/// How long a finished drag swallows header clicks
pub const CLICK_SUPPRESS_WINDOW: Duration = Duration::from_millis(200);

/// Freeze count meaning "no frozen columns"
pub const FREEZE_OFF: i32 = -1;

/// Offsets closer than this are treated as equal (sub-pixel jitter)
const OFFSET_EPSILON: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    pub min_width: f64,
    pub selection_width: f64,
    pub click_suppress: Duration,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_width: MIN_COLUMN_WIDTH,
            selection_width: SELECTION_COLUMN_WIDTH,
            click_suppress: CLICK_SUPPRESS_WINDOW,
        }
    }
}

// =============================================================================
// Visible columns
// =============================================================================

/// `order` filtered by `visible`, restricted to known columns.
///
/// Visibility never touches `order`, so a column hidden and shown again comes
/// back in its old place.
pub fn ordered_visible_columns<'a>(
    columns: &'a ColumnSet,
    order: &[String],
    visible: &BTreeSet<String>,
) -> Vec<&'a ColumnDef> {
    order
        .iter()
        .filter(|key| visible.contains(key.as_str()))
        .filter_map(|key| columns.get(key))
        .collect()
}

// =============================================================================
// Measurement
// =============================================================================

/// Post-layout measurement supplied by the host (DOM, headless layout, or a
/// test double).
pub trait LayoutProbe {
    /// Rendered widths of the visible data columns, in display order
    fn measure_column_widths(&self) -> Vec<f64>;

    /// Rendered width of the selection column (0 when not rendered)
    fn measure_selection_width(&self) -> f64 {
        0.0
    }
}

/// Probe that reports fixed widths
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixedProbe {
    pub selection: f64,
    pub widths: Vec<f64>,
}

impl FixedProbe {
    pub fn new(widths: Vec<f64>) -> Self {
        Self {
            selection: 0.0,
            widths,
        }
    }

    pub fn with_selection(mut self, width: f64) -> Self {
        self.selection = width;
        self
    }
}

impl LayoutProbe for FixedProbe {
    fn measure_column_widths(&self) -> Vec<f64> {
        self.widths.clone()
    }

    fn measure_selection_width(&self) -> f64 {
        self.selection
    }
}

/// Width a column should be rendered at: the user's override, else its
/// declared default. `None` means flex.
pub fn declared_width(column: &ColumnDef, overrides: &BTreeMap<String, f64>) -> Option<f64> {
    overrides.get(&column.key).copied().or(column.default_width)
}

/// Best known rendered width of the column at display index `i`.
pub fn rendered_width(
    i: usize,
    column: &ColumnDef,
    overrides: &BTreeMap<String, f64>,
    measured: &[f64],
    min_width: f64,
) -> f64 {
    measured
        .get(i)
        .copied()
        .filter(|w| *w > 0.0)
        .or_else(|| declared_width(column, overrides))
        .unwrap_or(min_width)
}

/// Rendered width of every visible column, measured where the probe knows
/// it and declared otherwise.
pub fn effective_widths(
    visible: &[&ColumnDef],
    overrides: &BTreeMap<String, f64>,
    probe: &dyn LayoutProbe,
    min_width: f64,
) -> Vec<f64> {
    let measured = probe.measure_column_widths();
    visible
        .iter()
        .enumerate()
        .map(|(i, col)| rendered_width(i, col, overrides, &measured, min_width))
        .collect()
}

// =============================================================================
// Resize
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ResizeNeighbor {
    pub key: String,
    pub start_width: f64,
    pub max_width: Option<f64>,
}

/// Widths captured when a resize gesture starts.
///
/// Dragging a column's right edge grows it and shrinks its right neighbor by
/// the same amount, so total width stays constant while a neighbor exists.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizePlan {
    pub key: String,
    pub start_width: f64,
    pub max_width: Option<f64>,
    pub neighbor: Option<ResizeNeighbor>,
    pub min_width: f64,
}

impl ResizePlan {
    pub fn new(
        column: &ColumnDef,
        start_width: f64,
        neighbor: Option<(&ColumnDef, f64)>,
        min_width: f64,
    ) -> Self {
        Self {
            key: column.key.clone(),
            start_width,
            max_width: column.max_width,
            neighbor: neighbor.map(|(col, width)| ResizeNeighbor {
                key: col.key.clone(),
                start_width: width,
                max_width: col.max_width,
            }),
            min_width,
        }
    }

    /// New widths after the pointer moved `delta` pixels from the start.
    pub fn widths_for_delta(&self, delta: f64) -> Vec<(String, f64)> {
        let mut lower = self.min_width - self.start_width;
        let mut upper = self
            .max_width
            .map(|max| max - self.start_width)
            .unwrap_or(f64::INFINITY);

        let Some(neighbor) = &self.neighbor else {
            let d = delta.min(upper).max(lower);
            return vec![(self.key.clone(), self.start_width + d)];
        };

        upper = upper.min(neighbor.start_width - self.min_width);
        if let Some(max) = neighbor.max_width {
            lower = lower.max(neighbor.start_width - max);
        }
        // When bounds cross (both columns already under the floor), the
        // target column's floor wins.
        let d = delta.min(upper).max(lower);

        vec![
            (self.key.clone(), self.start_width + d),
            (neighbor.key.clone(), neighbor.start_width - d),
        ]
    }
}

/// Swallows header clicks right after a drag that moved.
#[derive(Debug, Clone, Default)]
pub struct ClickGuard {
    suppress_until: Option<Instant>,
}

impl ClickGuard {
    pub fn arm(&mut self, now: Instant, window: Duration) {
        self.suppress_until = Some(now + window);
    }

    /// True while the suppression window is open
    pub fn suppresses(&mut self, now: Instant) -> bool {
        match self.suppress_until {
            Some(until) if now < until => true,
            Some(_) => {
                self.suppress_until = None;
                false
            }
            None => false,
        }
    }
}

// =============================================================================
// Reorder
// =============================================================================

/// Move `from` to the index currently held by `to`.
///
/// Returns `None` when either key is missing or they are the same.
pub fn reorder_columns(order: &[String], from: &str, to: &str) -> Option<Vec<String>> {
    let from_idx = order.iter().position(|k| k == from)?;
    let to_idx = order.iter().position(|k| k == to)?;
    if from_idx == to_idx {
        return None;
    }
    let mut next = order.to_vec();
    let key = next.remove(from_idx);
    next.insert(to_idx, key);
    Some(next)
}

/// Pin the rendered width of every visible column that has no override, so a
/// reorder doesn't make flex columns jump to a new computed size.
pub fn snapshot_unwidthed(
    visible: &[&ColumnDef],
    overrides: &BTreeMap<String, f64>,
    rendered: &[f64],
) -> BTreeMap<String, f64> {
    let mut pinned = BTreeMap::new();
    for (col, &width) in visible.iter().zip(rendered) {
        if !overrides.contains_key(&col.key) && width > 0.0 {
            pinned.insert(col.key.clone(), width);
        }
    }
    pinned
}

// =============================================================================
// Freeze panes
// =============================================================================

/// Sticky left offsets for frozen columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrozenOffsets {
    /// Offset of the selection column, if it is frozen
    pub selection: Option<f64>,
    /// Offsets of the first N data columns
    pub columns: Vec<f64>,
}

impl FrozenOffsets {
    pub fn column(&self, index: usize) -> Option<f64> {
        self.columns.get(index).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.selection.is_none() && self.columns.is_empty()
    }

    fn approx_eq(&self, other: &FrozenOffsets) -> bool {
        let close = |a: f64, b: f64| (a - b).abs() < OFFSET_EPSILON;
        let selection = match (self.selection, other.selection) {
            (Some(a), Some(b)) => close(a, b),
            (None, None) => true,
            _ => false,
        };
        selection
            && self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| close(*a, *b))
    }
}

/// Offsets for `freeze_count`: -1 off, 0 selection column only, N adds the
/// first N data columns. `selection_width` is `None` when rows aren't
/// selectable.
pub fn compute_frozen_offsets(
    selection_width: Option<f64>,
    rendered: &[f64],
    freeze_count: i32,
) -> FrozenOffsets {
    if freeze_count < 0 {
        return FrozenOffsets::default();
    }

    let mut left = selection_width.unwrap_or(0.0);
    let frozen = (freeze_count as usize).min(rendered.len());
    let mut columns = Vec::with_capacity(frozen);
    for &width in &rendered[..frozen] {
        columns.push(left);
        left += width;
    }

    FrozenOffsets {
        selection: selection_width.map(|_| 0.0),
        columns,
    }
}

/// Committed frozen offsets; only changes when the new offsets differ, so
/// recomputing after every layout pass settles instead of looping.
#[derive(Debug, Default)]
pub struct FrozenLayout {
    current: FrozenOffsets,
    commits: u64,
}

impl FrozenLayout {
    pub fn offsets(&self) -> &FrozenOffsets {
        &self.current
    }

    /// Returns true when the offsets changed (caller should re-render)
    pub fn commit(&mut self, next: FrozenOffsets) -> bool {
        if self.current.approx_eq(&next) {
            return false;
        }
        self.current = next;
        self.commits += 1;
        true
    }

    pub fn commits(&self) -> u64 {
        self.commits
    }
}

/// Freeze count for a divider dragged to `pointer_x`: the number of data
/// columns whose rendered midpoint lies left of the pointer.
pub fn snap_freeze_count(pointer_x: f64, selection_width: f64, rendered: &[f64]) -> i32 {
    let mut left = selection_width;
    let mut count = 0;
    for &width in rendered {
        if pointer_x <= left + width / 2.0 {
            break;
        }
        count += 1;
        left += width;
    }
    count
}

// =============================================================================
// Tests
// =============================================================================
