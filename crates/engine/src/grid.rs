//! Grid shell
//!
//! [`DataGrid`] wires rows, columns, the view-state store, the query
//! pipeline, layout and the editing bridge into one headless component. It
//! renders into a [`GridFrame`] value; the host turns frames into pixels and
//! feeds pointer/keyboard events back through the methods here.
//!
//! Nothing is rendered before hydration: [`DataGrid::frame`] returns `None`
//! until the stored view state has been applied, so a user never sees the
//! default layout flash before their own.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::column::{Align, ColumnDef, ColumnSet};
use crate::display::display_value;
use crate::drag::{DragKind, DragOutcome, DragSession, NoCapture, PointerCapture};
use crate::editing::{self, CellEditor, EditGesture, EditRequest, EditSequencer, TagEditor};
use crate::error::GridError;
use crate::layout::{
    compute_frozen_offsets, declared_width, effective_widths, ordered_visible_columns,
    snap_freeze_count, snapshot_unwidthed, ClickGuard, FrozenLayout, FrozenOffsets,
    LayoutConfig, LayoutProbe, ResizePlan, FREEZE_OFF,
};
use crate::pipeline::{DerivedView, QueryInput, QueryPipeline};
use crate::sort::SortDirection;
use crate::store::{ViewStatePort, ViewStateStore};
use crate::value::Row;
use crate::view_state::{PersistedViewState, ViewAction};

// =============================================================================
// Options
// =============================================================================

/// Feature switches. A disabled feature turns its interactions into no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridFeatures {
    pub sortable: bool,
    pub filterable: bool,
    pub groupable: bool,
    pub column_visibility: bool,
    pub column_reorder: bool,
    pub column_resize: bool,
    pub selectable: bool,
    pub freeze_panes: bool,
    pub export_csv: bool,
}

impl Default for GridFeatures {
    fn default() -> Self {
        Self {
            sortable: true,
            filterable: true,
            groupable: true,
            column_visibility: true,
            column_reorder: true,
            column_resize: true,
            selectable: true,
            freeze_panes: true,
            export_csv: true,
        }
    }
}

impl GridFeatures {
    /// Whether `action` is allowed under these switches
    pub fn allows(&self, action: &ViewAction) -> bool {
        match action {
            ViewAction::SetSorts(_) | ViewAction::ToggleSort { .. } => self.sortable,
            ViewAction::SetFilters(_)
            | ViewAction::AddFilter(_)
            | ViewAction::UpdateFilter { .. }
            | ViewAction::RemoveFilter(_)
            | ViewAction::ClearFilters => self.filterable,
            ViewAction::SetGroupField(_) | ViewAction::ToggleGroupCollapsed(_) => self.groupable,
            ViewAction::SetColumnVisible { .. }
            | ViewAction::ShowAllColumns
            | ViewAction::ResetColumns => self.column_visibility,
            ViewAction::SetColumnWidths(_) | ViewAction::SetColumnWidth { .. } => {
                self.column_resize
            }
            ViewAction::SetColumnOrder(_) | ViewAction::MoveColumn { .. } => self.column_reorder,
            ViewAction::SetFreezeCount(_) => self.freeze_panes,
            ViewAction::Reset => true,
        }
    }
}

pub type BatchFn = Arc<dyn Fn(&[String], &[&Row]) + Send + Sync>;
pub type RowFn = Arc<dyn Fn(&Row) + Send + Sync>;

/// Toolbar action over the selected rows
#[derive(Clone)]
pub struct BatchAction {
    pub label: String,
    pub run: BatchFn,
}

/// Per-row menu action
#[derive(Clone)]
pub struct RowAction {
    pub label: String,
    pub run: RowFn,
}

pub struct GridOptions {
    pub rows: Vec<Row>,
    pub columns: Vec<ColumnDef>,
    pub storage_key: Option<String>,
    pub features: GridFeatures,
    pub layout: LayoutConfig,
    pub batch_actions: Vec<BatchAction>,
    pub row_actions: Vec<RowAction>,
    pub on_row_click: Option<RowFn>,
    /// Initial search text (hosts that drive search from outside)
    pub search: String,
    pub pointer_capture: Arc<dyn PointerCapture>,
}

impl GridOptions {
    pub fn new(columns: Vec<ColumnDef>, rows: Vec<Row>) -> Self {
        Self {
            rows,
            columns,
            storage_key: None,
            features: GridFeatures::default(),
            layout: LayoutConfig::default(),
            batch_actions: Vec::new(),
            row_actions: Vec::new(),
            on_row_click: None,
            search: String::new(),
            pointer_capture: Arc::new(NoCapture),
        }
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = Some(key.into());
        self
    }

    pub fn with_features(mut self, features: GridFeatures) -> Self {
        self.features = features;
        self
    }

    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_batch_action<F>(mut self, label: impl Into<String>, run: F) -> Self
    where
        F: Fn(&[String], &[&Row]) + Send + Sync + 'static,
    {
        self.batch_actions.push(BatchAction {
            label: label.into(),
            run: Arc::new(run),
        });
        self
    }

    pub fn with_row_action<F>(mut self, label: impl Into<String>, run: F) -> Self
    where
        F: Fn(&Row) + Send + Sync + 'static,
    {
        self.row_actions.push(RowAction {
            label: label.into(),
            run: Arc::new(run),
        });
        self
    }

    pub fn on_row_click<F>(mut self, f: F) -> Self
    where
        F: Fn(&Row) + Send + Sync + 'static,
    {
        self.on_row_click = Some(Arc::new(f));
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_pointer_capture(mut self, capture: Arc<dyn PointerCapture>) -> Self {
        self.pointer_capture = capture;
        self
    }
}

// =============================================================================
// Frame
// =============================================================================

/// Everything a host needs to draw one state of the grid
#[derive(Debug, Clone, PartialEq)]
pub struct GridFrame {
    pub toolbar: Toolbar,
    pub headers: Vec<HeaderCell>,
    pub body: FrameBody,
    /// Present while rows are selected
    pub selection: Option<SelectionBar>,
    pub frozen: FrozenOffsets,
    /// Rows after search and filters, across all groups
    pub row_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toolbar {
    pub search: String,
    pub active_filters: usize,
    pub group_field: Option<String>,
    /// Column label and direction, in priority order
    pub sorts: Vec<(String, SortDirection)>,
    pub hidden_columns: usize,
    pub freeze_count: i32,
    pub export_enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCell {
    pub key: String,
    pub label: String,
    /// Direction and 1-based priority
    pub sort: Option<(SortDirection, usize)>,
    pub sortable: bool,
    /// `None` = flex
    pub width: Option<f64>,
    pub frozen_offset: Option<f64>,
    pub align: Align,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameBody {
    Flat(Vec<FrameRow>),
    Grouped(Vec<FrameGroup>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameRow {
    pub id: String,
    /// Display text per visible column
    pub cells: Vec<String>,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameGroup {
    pub label: String,
    pub count: usize,
    pub collapsed: bool,
    /// Empty when collapsed
    pub rows: Vec<FrameRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectionBar {
    pub selected: usize,
    pub actions: Vec<String>,
}

/// Visible columns and derived rows, ready for the CSV exporter
#[derive(Debug, Clone)]
pub struct ExportView<'a> {
    pub columns: Vec<&'a ColumnDef>,
    pub rows: Vec<&'a Row>,
}

/// An open inline editor
#[derive(Debug, Clone)]
pub enum Editor {
    Cell(CellEditor),
    Tags(TagEditor),
}

// =============================================================================
// DataGrid
// =============================================================================

pub struct DataGrid {
    columns: ColumnSet,
    rows: Vec<Row>,
    rows_revision: u64,
    store: ViewStateStore,
    features: GridFeatures,
    layout: LayoutConfig,
    batch_actions: Vec<BatchAction>,
    row_actions: Vec<RowAction>,
    on_row_click: Option<RowFn>,
    search: String,
    pipeline: QueryPipeline,
    selection: BTreeSet<String>,
    capture: Arc<dyn PointerCapture>,
    drag: Option<DragSession<Arc<dyn PointerCapture>>>,
    click_guard: ClickGuard,
    frozen: FrozenLayout,
    sequencer: EditSequencer,
}

impl DataGrid {
    /// Validates columns and rows. View state starts unhydrated.
    pub fn new(options: GridOptions, port: impl ViewStatePort + 'static) -> Result<Self, GridError> {
        let columns = ColumnSet::new(options.columns)?;
        columns.validate_rows(&options.rows)?;
        let store = ViewStateStore::new(columns.clone(), Box::new(port), options.storage_key);

        Ok(Self {
            columns,
            rows: options.rows,
            rows_revision: 0,
            store,
            features: options.features,
            layout: options.layout,
            batch_actions: options.batch_actions,
            row_actions: options.row_actions,
            on_row_click: options.on_row_click,
            search: options.search,
            pipeline: QueryPipeline::new(),
            selection: BTreeSet::new(),
            capture: options.pointer_capture,
            drag: None,
            click_guard: ClickGuard::default(),
            frozen: FrozenLayout::default(),
            sequencer: EditSequencer::new(),
        })
    }

    pub fn hydrate(&mut self) -> bool {
        self.store.hydrate()
    }

    pub fn is_hydrated(&self) -> bool {
        self.store.is_hydrated()
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn features(&self) -> GridFeatures {
        self.features
    }

    pub fn view_state(&self) -> Arc<PersistedViewState> {
        self.store.snapshot()
    }

    pub fn store(&self) -> &ViewStateStore {
        &self.store
    }

    pub fn sequencer(&self) -> &EditSequencer {
        &self.sequencer
    }

    /// Replace the rows (the host refetched). Selection keeps only ids that
    /// still exist.
    pub fn set_rows(&mut self, rows: Vec<Row>) -> Result<(), GridError> {
        self.columns.validate_rows(&rows)?;
        let ids: BTreeSet<&str> = rows.iter().map(Row::id).collect();
        self.selection.retain(|id| ids.contains(id.as_str()));
        self.rows = rows;
        self.rows_revision += 1;
        Ok(())
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
    }

    // -------------------------------------------------------------------------
    // Derived rows
    // -------------------------------------------------------------------------

    /// Query inputs with disabled features masked out
    pub fn query_input(&self) -> QueryInput {
        let state = self.store.state();
        QueryInput {
            search: self.search.clone(),
            filters: if self.features.filterable {
                state.filters.clone()
            } else {
                Vec::new()
            },
            sorts: if self.features.sortable {
                state.sorts.clone()
            } else {
                Vec::new()
            },
            group_field: if self.features.groupable {
                state.group_field.clone()
            } else {
                None
            },
        }
    }

    /// Filtered, sorted (and grouped) row indices. Memoized.
    pub fn derived(&mut self) -> Arc<DerivedView> {
        let input = self.query_input();
        self.pipeline
            .derive(&self.rows, self.rows_revision, &self.columns, &input)
    }

    pub fn derived_rows(&mut self) -> Vec<&Row> {
        let view = self.derived();
        view.resolve(&self.rows)
    }

    pub fn pipeline_computations(&self) -> u64 {
        self.pipeline.computations()
    }

    pub fn visible_columns(&self) -> Vec<&ColumnDef> {
        let state = self.store.state();
        ordered_visible_columns(&self.columns, &state.col_order, &state.visible_cols)
    }

    // -------------------------------------------------------------------------
    // View-state actions
    // -------------------------------------------------------------------------

    /// Apply a view action unless its feature is disabled. Returns true when
    /// the view changed.
    pub fn dispatch(&mut self, action: ViewAction) -> bool {
        if !self.features.allows(&action) {
            log::debug!("ignoring {:?}: feature disabled", action);
            return false;
        }
        self.store.dispatch(action)
    }

    /// Header click: cycle the column's sort. Swallowed right after a drag.
    pub fn click_header(&mut self, key: &str, additive: bool, now: Instant) -> bool {
        if self.click_guard.suppresses(now) {
            log::trace!("header click on '{}' suppressed after drag", key);
            return false;
        }
        self.dispatch(ViewAction::ToggleSort {
            key: key.to_string(),
            additive,
        })
    }

    pub fn set_freeze_count(&mut self, count: i32) -> bool {
        self.dispatch(ViewAction::SetFreezeCount(count))
    }

    pub fn toggle_group(&mut self, label: &str) -> bool {
        self.dispatch(ViewAction::ToggleGroupCollapsed(label.to_string()))
    }

    // -------------------------------------------------------------------------
    // Drag gestures
    // -------------------------------------------------------------------------

    fn check_drag(&self, enabled: bool, feature: &'static str) -> Result<(), GridError> {
        if !enabled {
            return Err(GridError::FeatureDisabled(feature));
        }
        if self.drag.is_some() {
            return Err(GridError::DragInProgress);
        }
        Ok(())
    }

    fn start_drag(&mut self, pointer_id: u32, kind: DragKind, x: f64) -> Result<(), GridError> {
        let session = DragSession::begin(Arc::clone(&self.capture), pointer_id, kind, x)?;
        self.drag = Some(session);
        Ok(())
    }

    /// Pointer down on a column's right edge
    pub fn begin_resize(
        &mut self,
        key: &str,
        pointer_id: u32,
        x: f64,
        probe: &dyn LayoutProbe,
    ) -> Result<(), GridError> {
        self.check_drag(self.features.column_resize, "columnResize")?;

        let state = self.store.snapshot();
        let visible = self.visible_columns();
        let index = visible
            .iter()
            .position(|c| c.key == key)
            .ok_or_else(|| GridError::unknown_column(key))?;
        let widths = effective_widths(&visible, &state.col_widths, probe, self.layout.min_width);
        let neighbor = visible.get(index + 1).map(|c| (*c, widths[index + 1]));
        let plan = ResizePlan::new(visible[index], widths[index], neighbor, self.layout.min_width);

        self.start_drag(pointer_id, DragKind::Resize(plan), x)
    }

    /// Pointer down on a header to drag it elsewhere
    pub fn begin_reorder(
        &mut self,
        key: &str,
        pointer_id: u32,
        x: f64,
        probe: &dyn LayoutProbe,
    ) -> Result<(), GridError> {
        self.check_drag(self.features.column_reorder, "columnReorder")?;

        let state = self.store.snapshot();
        let visible = self.visible_columns();
        if !visible.iter().any(|c| c.key == key) {
            return Err(GridError::unknown_column(key));
        }
        let rendered = probe.measure_column_widths();
        let pinned = snapshot_unwidthed(&visible, &state.col_widths, &rendered);

        let kind = DragKind::Reorder {
            key: key.to_string(),
            pinned,
        };
        self.start_drag(pointer_id, kind, x)
    }

    /// Pointer down on the freeze divider
    pub fn begin_freeze_drag(
        &mut self,
        pointer_id: u32,
        x: f64,
        probe: &dyn LayoutProbe,
    ) -> Result<(), GridError> {
        self.check_drag(self.features.freeze_panes, "freezePanes")?;

        let state = self.store.snapshot();
        let visible = self.visible_columns();
        let widths = effective_widths(&visible, &state.col_widths, probe, self.layout.min_width);
        let kind = DragKind::FreezeDivider {
            selection_width: self.selection_width(probe).unwrap_or(0.0),
            widths,
        };
        self.start_drag(pointer_id, kind, x)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Pointer move during a drag. Resize and freeze apply live.
    pub fn drag_move(&mut self, x: f64) -> bool {
        let Some(session) = self.drag.as_mut() else {
            return false;
        };
        let delta = session.update(x);

        let action = match session.kind() {
            Some(DragKind::Resize(plan)) => {
                let widths: BTreeMap<String, f64> = plan.widths_for_delta(delta).into_iter().collect();
                Some(ViewAction::SetColumnWidths(widths))
            }
            Some(DragKind::FreezeDivider {
                selection_width,
                widths,
            }) => Some(ViewAction::SetFreezeCount(snap_freeze_count(
                x,
                *selection_width,
                widths,
            ))),
            Some(DragKind::Reorder { .. }) | None => None,
        };

        match action {
            Some(action) => self.dispatch(action),
            None => false,
        }
    }

    /// Pointer up. A reorder drag commits when dropped on another visible
    /// column. A drag that moved opens the click suppression window.
    pub fn drag_end(&mut self, drop_key: Option<&str>, now: Instant) -> Option<DragOutcome> {
        let outcome = self.drag.take()?.end()?;
        if outcome.moved {
            self.click_guard.arm(now, self.layout.click_suppress);
        }

        if let DragKind::Reorder { key, pinned } = &outcome.kind {
            if let Some(target) = drop_key.filter(|t| *t != key.as_str()) {
                if self.store.state().is_visible(target) {
                    self.dispatch(ViewAction::MoveColumn {
                        from: key.clone(),
                        to: target.to_string(),
                        pinned: pinned.clone(),
                    });
                }
            }
        }
        Some(outcome)
    }

    /// Tear down an active drag without committing anything further.
    pub fn cancel_drag(&mut self) {
        if let Some(session) = self.drag.take() {
            session.cancel();
        }
    }

    // -------------------------------------------------------------------------
    // Freeze panes
    // -------------------------------------------------------------------------

    fn selection_width(&self, probe: &dyn LayoutProbe) -> Option<f64> {
        if !self.features.selectable {
            return None;
        }
        let measured = probe.measure_selection_width();
        Some(if measured > 0.0 {
            measured
        } else {
            self.layout.selection_width
        })
    }

    /// Recompute sticky offsets from measured widths. Returns true when they
    /// changed and the host should re-render.
    pub fn update_frozen_offsets(&mut self, probe: &dyn LayoutProbe) -> bool {
        let state = self.store.snapshot();
        let freeze_count = if self.features.freeze_panes {
            state.freeze_count
        } else {
            FREEZE_OFF
        };
        let visible = self.visible_columns();
        let widths = effective_widths(&visible, &state.col_widths, probe, self.layout.min_width);
        let offsets = compute_frozen_offsets(self.selection_width(probe), &widths, freeze_count);
        self.frozen.commit(offsets)
    }

    pub fn frozen_offsets(&self) -> &FrozenOffsets {
        self.frozen.offsets()
    }

    // -------------------------------------------------------------------------
    // Selection and actions
    // -------------------------------------------------------------------------

    pub fn toggle_row(&mut self, id: &str) -> bool {
        if !self.features.selectable || !self.rows.iter().any(|r| r.id() == id) {
            return false;
        }
        if !self.selection.remove(id) {
            self.selection.insert(id.to_string());
        }
        true
    }

    /// Header checkbox: select every derived row, or clear them when all
    /// are already selected.
    pub fn select_all_visible(&mut self) -> bool {
        if !self.features.selectable {
            return false;
        }
        let ids: Vec<String> = self
            .derived_rows()
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        if !ids.is_empty() && ids.iter().all(|id| self.selection.contains(id)) {
            for id in &ids {
                self.selection.remove(id);
            }
        } else {
            self.selection.extend(ids);
        }
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.contains(id)
    }

    /// Selected ids in row order
    pub fn selected_ids(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter(|r| self.selection.contains(r.id()))
            .map(|r| r.id().to_string())
            .collect()
    }

    pub fn run_batch_action(&self, index: usize) -> bool {
        let Some(action) = self.batch_actions.get(index) else {
            return false;
        };
        let rows: Vec<&Row> = self
            .rows
            .iter()
            .filter(|r| self.selection.contains(r.id()))
            .collect();
        if rows.is_empty() {
            return false;
        }
        let ids: Vec<String> = rows.iter().map(|r| r.id().to_string()).collect();
        log::debug!("batch action '{}' on {} rows", action.label, ids.len());
        (action.run)(&ids, &rows);
        true
    }

    pub fn run_row_action(&self, index: usize, row_id: &str) -> bool {
        match (self.row_actions.get(index), self.row(row_id)) {
            (Some(action), Some(row)) => {
                (action.run)(row);
                true
            }
            _ => false,
        }
    }

    pub fn row_click(&self, row_id: &str) -> bool {
        match (&self.on_row_click, self.row(row_id)) {
            (Some(f), Some(row)) => {
                f(row);
                true
            }
            _ => false,
        }
    }

    pub fn row(&self, id: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.id() == id)
    }

    // -------------------------------------------------------------------------
    // Editing
    // -------------------------------------------------------------------------

    /// Open the editor a gesture calls for, if any
    pub fn begin_edit(&self, key: &str, row_id: &str, gesture: EditGesture) -> Option<Editor> {
        let column = self.columns.get(key)?;
        let row = self.row(row_id)?;
        CellEditor::activate(column, row, gesture)
            .map(Editor::Cell)
            .or_else(|| TagEditor::activate(column, row, gesture).map(Editor::Tags))
    }

    pub fn commit_toggle(&self, key: &str, row_id: &str) -> Option<EditRequest> {
        let column = self.columns.get(key)?;
        editing::commit_toggle(column, self.row(row_id)?, &self.sequencer)
    }

    pub fn commit_select(&self, key: &str, row_id: &str, value: &str) -> Option<EditRequest> {
        let column = self.columns.get(key)?;
        editing::commit_select(column, self.row(row_id)?, value, &self.sequencer)
    }

    // -------------------------------------------------------------------------
    // Export and rendering
    // -------------------------------------------------------------------------

    /// Visible columns and derived rows (ungrouped, collapsed groups
    /// included). `None` when CSV export is disabled.
    pub fn export_rows(&mut self) -> Option<ExportView<'_>> {
        if !self.features.export_csv {
            return None;
        }
        let view = self.derived();
        Some(ExportView {
            columns: self.visible_columns(),
            rows: view.resolve(&self.rows),
        })
    }

    /// Build the current frame. `None` until hydrated.
    pub fn frame(&mut self, probe: &dyn LayoutProbe) -> Option<GridFrame> {
        if !self.is_hydrated() {
            return None;
        }
        self.update_frozen_offsets(probe);
        let view = self.derived();
        let state = self.store.snapshot();
        let visible = self.visible_columns();
        let frozen = self.frozen.offsets().clone();

        let headers = visible
            .iter()
            .enumerate()
            .map(|(i, col)| HeaderCell {
                key: col.key.clone(),
                label: col.label.clone(),
                sort: state.sort_for(&col.key).map(|(p, d)| (d, p + 1)),
                sortable: self.features.sortable && col.sortable,
                width: declared_width(col, &state.col_widths),
                frozen_offset: frozen.column(i),
                align: col.align,
            })
            .collect();

        let frame_row = |index: usize| -> Option<FrameRow> {
            let row = self.rows.get(index)?;
            Some(FrameRow {
                id: row.id().to_string(),
                cells: visible.iter().map(|col| display_value(col, row)).collect(),
                selected: self.selection.contains(row.id()),
            })
        };

        let body = match &view.groups {
            Some(groups) => FrameBody::Grouped(
                groups
                    .iter()
                    .map(|g| {
                        let collapsed = state.collapsed_groups.contains(&g.label);
                        FrameGroup {
                            label: g.label.clone(),
                            count: g.rows.len(),
                            collapsed,
                            rows: if collapsed {
                                Vec::new()
                            } else {
                                g.rows.iter().filter_map(|&i| frame_row(i)).collect()
                            },
                        }
                    })
                    .collect(),
            ),
            None => FrameBody::Flat(view.rows.iter().filter_map(|&i| frame_row(i)).collect()),
        };

        let toolbar = Toolbar {
            search: self.search.clone(),
            active_filters: if self.features.filterable {
                state.filters.len()
            } else {
                0
            },
            group_field: view.groups.as_ref().and(state.group_field.clone()),
            sorts: state
                .sorts
                .iter()
                .filter(|_| self.features.sortable)
                .filter_map(|s| self.columns.get(&s.key).map(|c| (c.label.clone(), s.direction)))
                .collect(),
            hidden_columns: self.columns.len() - visible.len(),
            freeze_count: state.freeze_count,
            export_enabled: self.features.export_csv,
        };

        let selection = (self.features.selectable && !self.selection.is_empty()).then(|| SelectionBar {
            selected: self.selection.len(),
            actions: self.batch_actions.iter().map(|a| a.label.clone()).collect(),
        });

        Some(GridFrame {
            toolbar,
            headers,
            body,
            selection,
            frozen,
            row_count: view.len(),
        })
    }
}

impl std::fmt::Debug for DataGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataGrid")
            .field("columns", &self.columns.len())
            .field("rows", &self.rows.len())
            .field("store", &self.store)
            .field("dragging", &self.drag.is_some())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::column::ColumnType;
    use crate::filter::{FilterOperator, FilterRule};
    use crate::layout::FixedProbe;
    use crate::store::MemoryPort;

    fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("name", "Name", ColumnType::Text),
            ColumnDef::new("active", "Active", ColumnType::Toggle),
            ColumnDef::new("score", "Score", ColumnType::Number),
        ]
    }

    fn rows() -> Vec<Row> {
        vec![
            Row::new("1").with("name", "Bob").with("active", true).with("score", 3.0),
            Row::new("2").with("name", "Ann").with("active", false).with("score", 5.0),
        ]
    }

    fn grid(port: MemoryPort) -> DataGrid {
        let options = GridOptions::new(columns(), rows()).with_storage_key("people");
        DataGrid::new(options, port).unwrap()
    }

    fn probe() -> FixedProbe {
        FixedProbe::new(vec![100.0, 100.0, 100.0]).with_selection(40.0)
    }

    fn flat_ids(frame: &GridFrame) -> Vec<String> {
        match &frame.body {
            FrameBody::Flat(rows) => rows.iter().map(|r| r.id.clone()).collect(),
            FrameBody::Grouped(_) => panic!("expected flat body"),
        }
    }

    #[test]
    fn test_invalid_rows_rejected() {
        let bad = vec![Row::new("1").with("active", "yes")];
        let err = DataGrid::new(GridOptions::new(columns(), bad), MemoryPort::new()).unwrap_err();
        assert!(matches!(err, GridError::TypeMismatch { .. }));
    }

    #[test]
    fn test_no_frame_before_hydration() {
        let mut g = grid(MemoryPort::new());
        assert!(g.frame(&probe()).is_none());
        g.hydrate();
        let frame = g.frame(&probe()).unwrap();
        assert_eq!(flat_ids(&frame), vec!["1", "2"]);
        assert_eq!(frame.headers.len(), 3);
    }

    #[test]
    fn test_header_click_sorts_and_persists() {
        let port = MemoryPort::new();
        let mut g = grid(port.clone());
        g.hydrate();
        assert!(g.click_header("name", false, Instant::now()));
        let frame = g.frame(&probe()).unwrap();
        assert_eq!(flat_ids(&frame), vec!["2", "1"]);
        assert_eq!(frame.headers[0].sort, Some((SortDirection::Asc, 1)));
        assert!(port.get("people").unwrap().contains("\"key\":\"name\""));
    }

    #[test]
    fn test_disabled_feature_is_noop() {
        let features = GridFeatures {
            sortable: false,
            ..GridFeatures::default()
        };
        let options = GridOptions::new(columns(), rows()).with_features(features);
        let mut g = DataGrid::new(options, MemoryPort::new()).unwrap();
        g.hydrate();
        assert!(!g.click_header("name", false, Instant::now()));
        assert!(g.view_state().sorts.is_empty());
        assert!(matches!(
            g.begin_freeze_drag(1, 0.0, &probe()),
            Ok(())
        ));
    }

    #[test]
    fn test_derived_rows_are_memoized() {
        let mut g = grid(MemoryPort::new());
        g.hydrate();
        g.derived();
        g.derived();
        assert_eq!(g.pipeline_computations(), 1);
        g.set_search("an");
        assert_eq!(g.derived_rows().len(), 1);
        assert_eq!(g.pipeline_computations(), 2);
        g.set_rows(rows()).unwrap();
        g.derived();
        assert_eq!(g.pipeline_computations(), 3);
    }

    #[test]
    fn test_resize_drag_updates_widths_and_suppresses_click() {
        let mut g = grid(MemoryPort::new());
        g.hydrate();
        g.begin_resize("name", 1, 200.0, &probe()).unwrap();
        assert_eq!(g.begin_resize("score", 2, 0.0, &probe()), Err(GridError::DragInProgress));

        g.drag_move(230.0);
        let state = g.view_state();
        assert_eq!(state.col_widths.get("name"), Some(&130.0));
        assert_eq!(state.col_widths.get("active"), Some(&70.0));

        let t0 = Instant::now();
        let outcome = g.drag_end(None, t0).unwrap();
        assert!(outcome.moved);
        assert!(!g.click_header("name", false, t0 + Duration::from_millis(100)));
        assert!(g.click_header("name", false, t0 + Duration::from_millis(300)));
    }

    #[test]
    fn test_zero_movement_drag_does_not_suppress() {
        let mut g = grid(MemoryPort::new());
        g.hydrate();
        g.begin_resize("name", 1, 200.0, &probe()).unwrap();
        let t0 = Instant::now();
        assert!(!g.drag_end(None, t0).unwrap().moved);
        assert!(g.click_header("name", false, t0));
    }

    #[test]
    fn test_reorder_drop_pins_widths_and_moves() {
        let mut g = grid(MemoryPort::new());
        g.hydrate();
        g.begin_reorder("name", 1, 10.0, &probe()).unwrap();
        g.drag_move(250.0);
        g.drag_end(Some("score"), Instant::now());

        let state = g.view_state();
        assert_eq!(state.col_order, vec!["active", "score", "name"]);
        assert_eq!(state.col_widths.len(), 3);
        assert!(!g.is_dragging());
    }

    #[test]
    fn test_reorder_pins_widths_with_resize_disabled() {
        let port = MemoryPort::new();
        let features = GridFeatures {
            column_resize: false,
            ..GridFeatures::default()
        };
        let options = GridOptions::new(columns(), rows())
            .with_storage_key("people")
            .with_features(features);
        let mut g = DataGrid::new(options, port.clone()).unwrap();
        g.hydrate();
        g.begin_reorder("name", 1, 10.0, &probe()).unwrap();
        g.drag_move(250.0);
        g.drag_end(Some("score"), Instant::now());

        let state = g.view_state();
        assert_eq!(state.col_order, vec!["active", "score", "name"]);
        assert_eq!(state.col_widths.get("name"), Some(&100.0));
        assert_eq!(state.col_widths.len(), 3);
        assert!(port.get("people").unwrap().contains("\"colWidths\":{\"active\":100.0"));

        assert!(!g.dispatch(ViewAction::SetColumnWidth {
            key: "name".into(),
            width: 300.0,
        }));
    }

    #[test]
    fn test_freeze_drag_snaps_on_move() {
        let mut g = grid(MemoryPort::new());
        g.hydrate();
        g.begin_freeze_drag(1, 40.0, &probe()).unwrap();
        g.drag_move(100.0);
        assert_eq!(g.view_state().freeze_count, 1);
        g.drag_move(260.0);
        assert_eq!(g.view_state().freeze_count, 2);
        g.drag_end(None, Instant::now());

        assert!(g.update_frozen_offsets(&probe()));
        assert_eq!(g.frozen_offsets().columns, vec![40.0, 140.0]);
        assert!(!g.update_frozen_offsets(&probe()));
    }

    #[test]
    fn test_cancel_drag_releases() {
        let mut g = grid(MemoryPort::new());
        g.hydrate();
        g.begin_reorder("name", 1, 0.0, &probe()).unwrap();
        g.cancel_drag();
        assert!(!g.is_dragging());
        assert!(g.begin_reorder("name", 2, 0.0, &probe()).is_ok());
    }

    #[test]
    fn test_grouped_frame_with_collapsed_group() {
        let mut g = grid(MemoryPort::new());
        g.hydrate();
        g.dispatch(ViewAction::SetGroupField(Some("active".into())));
        g.toggle_group("Yes");
        let frame = g.frame(&probe()).unwrap();
        let FrameBody::Grouped(groups) = frame.body else {
            panic!("expected groups");
        };
        assert_eq!(groups[0].label, "Yes");
        assert!(groups[0].collapsed);
        assert_eq!(groups[0].count, 1);
        assert!(groups[0].rows.is_empty());
        assert_eq!(groups[1].rows[0].cells[1], "No");
    }

    #[test]
    fn test_selection_and_batch_actions() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let options = GridOptions::new(columns(), rows())
            .with_batch_action("Archive", move |ids: &[String], _rows: &[&Row]| {
                sink.lock().unwrap().extend(ids.iter().cloned());
            });
        let mut g = DataGrid::new(options, MemoryPort::new()).unwrap();
        g.hydrate();

        assert!(!g.run_batch_action(0));
        g.select_all_visible();
        assert_eq!(g.selected_ids(), vec!["1", "2"]);
        let frame = g.frame(&probe()).unwrap();
        assert_eq!(frame.selection.unwrap().actions, vec!["Archive"]);
        assert!(g.run_batch_action(0));
        assert_eq!(*seen.lock().unwrap(), vec!["1", "2"]);

        g.select_all_visible();
        assert!(g.selected_ids().is_empty());

        g.toggle_row("2");
        g.set_rows(vec![Row::new("1")]).unwrap();
        assert!(g.selected_ids().is_empty());
    }

    #[test]
    fn test_filters_and_export_view() {
        let mut g = grid(MemoryPort::new());
        g.hydrate();
        g.dispatch(ViewAction::AddFilter(FilterRule::unary("active", FilterOperator::IsTrue)));
        g.dispatch(ViewAction::SetColumnVisible {
            key: "score".into(),
            visible: false,
        });
        let export = g.export_rows().unwrap();
        assert_eq!(export.columns.len(), 2);
        assert_eq!(export.rows.len(), 1);
        assert_eq!(export.rows[0].id(), "1");
    }

    #[test]
    fn test_edit_helpers_route_to_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut cols = columns();
        cols[1] = ColumnDef::new("active", "Active", ColumnType::Toggle).with_on_edit(Arc::new(
            move |req: EditRequest| sink.lock().unwrap().push(req),
        ));
        let g = DataGrid::new(GridOptions::new(cols, rows()), MemoryPort::new()).unwrap();

        let req = g.commit_toggle("active", "1").unwrap();
        assert_eq!(req.value, crate::value::CellValue::Bool(false));
        assert!(g.sequencer().is_latest("1", "active", req.sequence));
        assert_eq!(seen.lock().unwrap().len(), 1);
        // rows are owned by the host
        assert_eq!(g.row("1").unwrap().value("active").as_bool(), Some(true));

        assert!(g.begin_edit("name", "1", EditGesture::DoubleClick).is_none());
    }
}
