//! Cell editing bridge
//!
//! Turns edit gestures into [`EditRequest`]s for the column's `on_edit`
//! handler. The grid never mutates its own rows and never waits for the
//! handler: the host owns the data and pushes new rows back when it has
//! them.
//!
//! Each request carries a per-cell sequence number from an
//! [`EditSequencer`] so a host with asynchronous persistence can drop
//! completions that arrive out of order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::column::{ColumnDef, ColumnType};
use crate::value::{CellValue, Row};

/// Mutation callback. Fire-and-forget.
pub type EditHandler = Arc<dyn Fn(EditRequest) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct EditRequest {
    pub row_id: String,
    pub field: String,
    pub value: CellValue,
    pub sequence: u64,
}

#[derive(Debug, Default)]
struct SequenceBook {
    counter: u64,
    latest: HashMap<(String, String), u64>,
}

/// Hands out increasing sequence numbers and remembers the newest per cell.
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct EditSequencer {
    book: Arc<Mutex<SequenceBook>>,
}

impl EditSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, row_id: &str, field: &str) -> u64 {
        match self.book.lock() {
            Ok(mut book) => {
                book.counter += 1;
                let seq = book.counter;
                book.latest
                    .insert((row_id.to_string(), field.to_string()), seq);
                seq
            }
            Err(_) => 0,
        }
    }

    /// True when `sequence` is the newest request issued for the cell
    pub fn is_latest(&self, row_id: &str, field: &str, sequence: u64) -> bool {
        self.book
            .lock()
            .ok()
            .and_then(|book| {
                book.latest
                    .get(&(row_id.to_string(), field.to_string()))
                    .copied()
            })
            == Some(sequence)
    }
}

/// Send `value` to the column's handler. Returns the request that was sent,
/// or `None` when the column is read-only.
pub fn send_edit(
    column: &ColumnDef,
    row_id: &str,
    value: CellValue,
    sequencer: &EditSequencer,
) -> Option<EditRequest> {
    let handler = column.on_edit.as_ref()?;
    let request = EditRequest {
        row_id: row_id.to_string(),
        field: column.key.clone(),
        value,
        sequence: sequencer.next(row_id, &column.key),
    };
    log::debug!(
        "edit {}.{} (seq {})",
        request.row_id,
        request.field,
        request.sequence
    );
    handler(request.clone());
    Some(request)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditGesture {
    Click,
    DoubleClick,
}

/// Which editor, if any, a gesture opens on a cell of this column
pub fn editor_kind(column: &ColumnDef, gesture: EditGesture) -> Option<ColumnType> {
    if !column.is_editable() {
        return None;
    }
    match (column.column_type, gesture) {
        (ColumnType::Text | ColumnType::Number, EditGesture::DoubleClick) => {
            Some(column.column_type)
        }
        (ColumnType::Tags, EditGesture::Click) => Some(ColumnType::Tags),
        _ => None,
    }
}

// =============================================================================
// Text / number editor
// =============================================================================

/// Inline editor for a text or number cell
#[derive(Debug, Clone)]
pub struct CellEditor {
    column: ColumnDef,
    row_id: String,
    original: CellValue,
    draft: String,
}

impl CellEditor {
    /// Opens on double-click for editable text and number columns.
    pub fn activate(column: &ColumnDef, row: &Row, gesture: EditGesture) -> Option<Self> {
        match editor_kind(column, gesture)? {
            ColumnType::Text | ColumnType::Number => {}
            _ => return None,
        }
        let original = row.value(&column.key).clone();
        Some(Self {
            column: column.clone(),
            row_id: row.id().to_string(),
            draft: original.to_string(),
            original,
        })
    }

    pub fn field(&self) -> &str {
        &self.column.key
    }

    pub fn row_id(&self) -> &str {
        &self.row_id
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
    }

    /// Draft as a cell value. `None` for a number draft that doesn't parse.
    pub fn parsed(&self) -> Option<CellValue> {
        match self.column.column_type {
            ColumnType::Number => {
                let text = self.draft.trim();
                if text.is_empty() {
                    return Some(CellValue::Null);
                }
                text.parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .map(CellValue::number)
            }
            _ => {
                if self.draft.is_empty() && self.original.is_null() {
                    Some(CellValue::Null)
                } else {
                    Some(CellValue::Text(self.draft.clone()))
                }
            }
        }
    }

    /// Blur or Enter. Sends once when the value changed.
    pub fn commit(self, sequencer: &EditSequencer) -> Option<EditRequest> {
        let Some(value) = self.parsed() else {
            log::debug!("discarding unparsable draft '{}' for {}", self.draft, self.column.key);
            return None;
        };
        if value == self.original {
            return None;
        }
        send_edit(&self.column, &self.row_id, value, sequencer)
    }

    /// Escape
    pub fn cancel(self) {}
}

// =============================================================================
// Toggle / select
// =============================================================================

/// Flip a toggle cell and send immediately
pub fn commit_toggle(column: &ColumnDef, row: &Row, sequencer: &EditSequencer) -> Option<EditRequest> {
    if column.column_type != ColumnType::Toggle {
        return None;
    }
    let current = row.value(&column.key).as_bool().unwrap_or(false);
    send_edit(column, row.id(), CellValue::Bool(!current), sequencer)
}

/// Pick a select option; sends only when it differs from the current value.
/// An empty choice clears the cell.
pub fn commit_select(
    column: &ColumnDef,
    row: &Row,
    value: &str,
    sequencer: &EditSequencer,
) -> Option<EditRequest> {
    if column.column_type != ColumnType::Select {
        return None;
    }
    let next = if value.is_empty() {
        CellValue::Null
    } else {
        CellValue::Text(value.to_string())
    };
    if &next == row.value(&column.key) {
        return None;
    }
    send_edit(column, row.id(), next, sequencer)
}

// =============================================================================
// Tag editor
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKey {
    Enter,
    Backspace,
    ArrowUp,
    ArrowDown,
    Escape,
}

/// Popover editor for a tags cell
#[derive(Debug, Clone)]
pub struct TagEditor {
    column: ColumnDef,
    row_id: String,
    original: Vec<String>,
    tags: Vec<String>,
    input: String,
    highlight: Option<usize>,
}

impl TagEditor {
    /// Opens on a single click for editable tags columns.
    pub fn activate(column: &ColumnDef, row: &Row, gesture: EditGesture) -> Option<Self> {
        if editor_kind(column, gesture)? != ColumnType::Tags {
            return None;
        }
        let original = row
            .value(&column.key)
            .as_list()
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        Some(Self {
            column: column.clone(),
            row_id: row.id().to_string(),
            tags: original.clone(),
            original,
            input: String::new(),
            highlight: None,
        })
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn highlight(&self) -> Option<usize> {
        self.highlight
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
        self.highlight = None;
    }

    /// Suggestions containing the input (case-insensitive), minus tags
    /// already on the cell.
    pub fn suggestions(&self) -> Vec<&str> {
        let needle = self.input.trim().to_lowercase();
        self.column
            .tag_suggestions
            .iter()
            .filter(|s| !self.tags.contains(s))
            .filter(|s| s.to_lowercase().contains(&needle))
            .map(String::as_str)
            .collect()
    }

    /// Add a tag; empty and duplicate tags are ignored.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        self.input.clear();
        self.highlight = None;
        true
    }

    pub fn remove_tag(&mut self, index: usize) -> Option<String> {
        (index < self.tags.len()).then(|| self.tags.remove(index))
    }

    /// Returns false once the editor should close (Escape).
    pub fn handle_key(&mut self, key: TagKey) -> bool {
        match key {
            TagKey::Enter => {
                let chosen = self
                    .highlight
                    .and_then(|i| self.suggestions().get(i).map(|s| s.to_string()));
                let tag = chosen.unwrap_or_else(|| self.input.clone());
                self.add_tag(&tag);
            }
            TagKey::Backspace => {
                if self.input.is_empty() {
                    self.tags.pop();
                }
            }
            TagKey::ArrowDown => {
                let count = self.suggestions().len();
                if count > 0 {
                    self.highlight = Some(match self.highlight {
                        Some(i) => (i + 1).min(count - 1),
                        None => 0,
                    });
                }
            }
            TagKey::ArrowUp => {
                self.highlight = self.highlight.map(|i| i.saturating_sub(1));
            }
            TagKey::Escape => {
                self.tags = self.original.clone();
                self.input.clear();
                self.highlight = None;
                return false;
            }
        }
        true
    }

    pub fn is_changed(&self) -> bool {
        self.tags != self.original
    }

    /// Blur. Sends once when the tag list changed.
    pub fn close(self, sequencer: &EditSequencer) -> Option<EditRequest> {
        if !self.is_changed() {
            return None;
        }
        send_edit(&self.column, &self.row_id, CellValue::List(self.tags), sequencer)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn recording(ty: ColumnType, key: &str) -> (ColumnDef, Arc<Mutex<Vec<EditRequest>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let column = ColumnDef::new(key, key, ty).with_on_edit(Arc::new(move |req: EditRequest| {
            sink.lock().unwrap().push(req);
        }));
        (column, log)
    }

    #[test]
    fn test_text_commit_fires_once_when_changed() {
        let (col, log) = recording(ColumnType::Text, "name");
        let row = Row::new("1").with("name", "Bob");
        let seq = EditSequencer::new();

        let editor = CellEditor::activate(&col, &row, EditGesture::DoubleClick).unwrap();
        assert_eq!(editor.draft(), "Bob");
        assert!(editor.commit(&seq).is_none());

        let mut editor = CellEditor::activate(&col, &row, EditGesture::DoubleClick).unwrap();
        editor.set_draft("Robert");
        let req = editor.commit(&seq).unwrap();
        assert_eq!(req.value, CellValue::from("Robert"));

        let reqs = log.lock().unwrap();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].row_id, "1");
        assert_eq!(reqs[0].field, "name");
    }

    #[test]
    fn test_cancel_sends_nothing() {
        let (col, log) = recording(ColumnType::Text, "name");
        let row = Row::new("1").with("name", "Bob");
        let mut editor = CellEditor::activate(&col, &row, EditGesture::DoubleClick).unwrap();
        editor.set_draft("zzz");
        editor.cancel();
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_gestures_and_read_only_columns() {
        let (text, _) = recording(ColumnType::Text, "name");
        let (tags, _) = recording(ColumnType::Tags, "tags");
        let row = Row::new("1");
        assert!(CellEditor::activate(&text, &row, EditGesture::Click).is_none());
        assert!(TagEditor::activate(&tags, &row, EditGesture::Click).is_some());
        assert!(TagEditor::activate(&tags, &row, EditGesture::DoubleClick).is_none());

        let read_only = ColumnDef::new("name", "Name", ColumnType::Text);
        assert!(CellEditor::activate(&read_only, &row, EditGesture::DoubleClick).is_none());
    }

    #[test]
    fn test_number_editor_parsing() {
        let (col, log) = recording(ColumnType::Number, "score");
        let row = Row::new("1").with("score", 5.0);
        let seq = EditSequencer::new();

        let mut editor = CellEditor::activate(&col, &row, EditGesture::DoubleClick).unwrap();
        assert_eq!(editor.draft(), "5");
        editor.set_draft("abc");
        assert!(editor.commit(&seq).is_none());

        let mut editor = CellEditor::activate(&col, &row, EditGesture::DoubleClick).unwrap();
        editor.set_draft("  ");
        assert_eq!(editor.commit(&seq).unwrap().value, CellValue::Null);

        let mut editor = CellEditor::activate(&col, &row, EditGesture::DoubleClick).unwrap();
        editor.set_draft("5.0");
        assert!(editor.commit(&seq).is_none());

        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_empty_text_over_null_is_unchanged() {
        let (col, log) = recording(ColumnType::Text, "name");
        let row = Row::new("1");
        let editor = CellEditor::activate(&col, &row, EditGesture::DoubleClick).unwrap();
        assert!(editor.commit(&EditSequencer::new()).is_none());
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_toggle_and_select() {
        let (toggle, toggles) = recording(ColumnType::Toggle, "active");
        let (select, selects) = recording(ColumnType::Select, "status");
        let row = Row::new("1").with("active", true).with("status", "open");
        let seq = EditSequencer::new();

        assert_eq!(
            commit_toggle(&toggle, &row, &seq).unwrap().value,
            CellValue::Bool(false)
        );
        assert!(commit_select(&select, &row, "open", &seq).is_none());
        assert!(commit_select(&select, &row, "closed", &seq).is_some());
        assert_eq!(toggles.lock().unwrap().len(), 1);
        assert_eq!(selects.lock().unwrap().len(), 1);

        // absent toggle counts as false
        let blank = Row::new("2");
        assert_eq!(
            commit_toggle(&toggle, &blank, &seq).unwrap().value,
            CellValue::Bool(true)
        );
    }

    #[test]
    fn test_tag_editor_keys() {
        let (col, log) = recording(ColumnType::Tags, "tags");
        let col = col.with_tag_suggestions(vec!["alpha".into(), "beta".into(), "Alpine".into()]);
        let row = Row::new("1").with("tags", vec!["beta"]);
        let seq = EditSequencer::new();

        let mut editor = TagEditor::activate(&col, &row, EditGesture::Click).unwrap();
        editor.set_input("AL");
        assert_eq!(editor.suggestions(), vec!["alpha", "Alpine"]);
        editor.handle_key(TagKey::ArrowDown);
        editor.handle_key(TagKey::ArrowDown);
        editor.handle_key(TagKey::ArrowDown);
        assert_eq!(editor.highlight(), Some(1));
        editor.handle_key(TagKey::ArrowUp);
        editor.handle_key(TagKey::Enter);
        assert_eq!(editor.tags(), &["beta".to_string(), "alpha".to_string()]);

        editor.set_input("  custom ");
        editor.handle_key(TagKey::Enter);
        editor.set_input("beta");
        editor.handle_key(TagKey::Enter);
        assert_eq!(editor.tags().len(), 3);

        editor.set_input("");
        editor.handle_key(TagKey::Backspace);
        assert_eq!(editor.tags().last().map(String::as_str), Some("alpha"));

        let req = editor.close(&seq).unwrap();
        assert_eq!(req.value, CellValue::from(vec!["beta", "alpha"]));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_tag_editor_escape_reverts() {
        let (col, log) = recording(ColumnType::Tags, "tags");
        let row = Row::new("1").with("tags", vec!["x"]);
        let mut editor = TagEditor::activate(&col, &row, EditGesture::Click).unwrap();
        editor.add_tag("y");
        assert_eq!(editor.remove_tag(0).as_deref(), Some("x"));
        assert!(!editor.handle_key(TagKey::Escape));
        assert!(editor.close(&EditSequencer::new()).is_none());
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_sequencer_tracks_latest_per_cell() {
        let seq = EditSequencer::new();
        let a1 = seq.next("1", "name");
        let b1 = seq.next("1", "score");
        let a2 = seq.next("1", "name");
        assert!(a2 > a1);
        assert!(!seq.is_latest("1", "name", a1));
        assert!(seq.is_latest("1", "name", a2));
        assert!(seq.is_latest("1", "score", b1));
        assert!(!seq.is_latest("2", "name", a2));
    }
}
