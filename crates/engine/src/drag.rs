//! Pointer drag sessions
//!
//! A [`DragSession`] owns the pointer capture for one gesture (column resize,
//! column reorder, freeze divider) and releases it exactly once: on
//! [`end`](DragSession::end), on [`cancel`](DragSession::cancel), or when the
//! session is dropped mid-gesture.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::GridError;
use crate::layout::ResizePlan;

/// Host hook standing in for global pointer move/up listeners.
pub trait PointerCapture {
    fn capture(&self, pointer_id: u32);
    fn release(&self, pointer_id: u32);
}

impl<T: PointerCapture + ?Sized> PointerCapture for Arc<T> {
    fn capture(&self, pointer_id: u32) {
        (**self).capture(pointer_id)
    }

    fn release(&self, pointer_id: u32) {
        (**self).release(pointer_id)
    }
}

/// For hosts that deliver move/up events regardless of capture
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapture;

impl PointerCapture for NoCapture {
    fn capture(&self, _pointer_id: u32) {}
    fn release(&self, _pointer_id: u32) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum DragKind {
    Resize(ResizePlan),
    /// `pinned` holds rendered widths for columns without an override,
    /// committed together with the move
    Reorder { key: String, pinned: BTreeMap<String, f64> },
    /// Rendered widths are captured at drag start
    FreezeDivider { selection_width: f64, widths: Vec<f64> },
}

impl DragKind {
    pub fn name(&self) -> &'static str {
        match self {
            DragKind::Resize(_) => "resize",
            DragKind::Reorder { .. } => "reorder",
            DragKind::FreezeDivider { .. } => "freeze",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragOutcome {
    pub kind: DragKind,
    /// Net movement was non-zero
    pub moved: bool,
    pub delta: f64,
    pub last_x: f64,
}

pub struct DragSession<C: PointerCapture> {
    capture: C,
    pointer_id: u32,
    kind: Option<DragKind>,
    origin_x: f64,
    last_x: f64,
}

impl<C: PointerCapture> DragSession<C> {
    /// Capture the pointer and start tracking. Pointer id 0 is rejected.
    pub fn begin(capture: C, pointer_id: u32, kind: DragKind, origin_x: f64) -> Result<Self, GridError> {
        if pointer_id == 0 {
            return Err(GridError::ZeroPointerId);
        }
        capture.capture(pointer_id);
        log::trace!("{} drag started (pointer {})", kind.name(), pointer_id);
        Ok(Self {
            capture,
            pointer_id,
            kind: Some(kind),
            origin_x,
            last_x: origin_x,
        })
    }

    /// Record a move; returns the delta from the origin.
    pub fn update(&mut self, x: f64) -> f64 {
        self.last_x = x;
        log::trace!("drag move x={} delta={}", x, self.delta());
        self.delta()
    }

    pub fn delta(&self) -> f64 {
        self.last_x - self.origin_x
    }

    pub fn last_x(&self) -> f64 {
        self.last_x
    }

    pub fn pointer_id(&self) -> u32 {
        self.pointer_id
    }

    pub fn kind(&self) -> Option<&DragKind> {
        self.kind.as_ref()
    }

    /// Finish the gesture and release the pointer.
    pub fn end(mut self) -> Option<DragOutcome> {
        let kind = self.kind.take()?;
        self.capture.release(self.pointer_id);
        let delta = self.delta();
        Some(DragOutcome {
            kind,
            moved: delta != 0.0,
            delta,
            last_x: self.last_x,
        })
    }

    /// Abandon the gesture (Escape, window blur). Nothing is committed.
    pub fn cancel(self) {
        log::trace!("drag cancelled (pointer {})", self.pointer_id);
    }
}

impl<C: PointerCapture> Drop for DragSession<C> {
    fn drop(&mut self) {
        if self.kind.take().is_some() {
            self.capture.release(self.pointer_id);
        }
    }
}

impl<C: PointerCapture> std::fmt::Debug for DragSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DragSession")
            .field("pointer_id", &self.pointer_id)
            .field("kind", &self.kind)
            .field("origin_x", &self.origin_x)
            .field("last_x", &self.last_x)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl PointerCapture for Recorder {
        fn capture(&self, id: u32) {
            self.events.lock().unwrap().push(format!("capture {id}"));
        }

        fn release(&self, id: u32) {
            self.events.lock().unwrap().push(format!("release {id}"));
        }
    }

    fn reorder() -> DragKind {
        DragKind::Reorder {
            key: "name".into(),
            pinned: BTreeMap::new(),
        }
    }

    #[test]
    fn test_zero_pointer_rejected() {
        let rec = Arc::new(Recorder::default());
        let err = DragSession::begin(Arc::clone(&rec), 0, reorder(), 0.0).unwrap_err();
        assert_eq!(err, GridError::ZeroPointerId);
        assert!(rec.events().is_empty());
    }

    #[test]
    fn test_end_releases_once() {
        let rec = Arc::new(Recorder::default());
        let mut session = DragSession::begin(Arc::clone(&rec), 7, reorder(), 100.0).unwrap();
        assert_eq!(session.update(130.0), 30.0);
        let outcome = session.end().unwrap();
        assert!(outcome.moved);
        assert_eq!(outcome.delta, 30.0);
        assert_eq!(rec.events(), vec!["capture 7", "release 7"]);
    }

    #[test]
    fn test_cancel_and_drop_release() {
        let rec = Arc::new(Recorder::default());
        DragSession::begin(Arc::clone(&rec), 3, reorder(), 0.0).unwrap().cancel();
        {
            let _session = DragSession::begin(Arc::clone(&rec), 4, reorder(), 0.0).unwrap();
        }
        assert_eq!(
            rec.events(),
            vec!["capture 3", "release 3", "capture 4", "release 4"]
        );
    }

    #[test]
    fn test_no_net_movement() {
        let mut session = DragSession::begin(NoCapture, 1, reorder(), 50.0).unwrap();
        session.update(80.0);
        session.update(50.0);
        assert!(!session.end().unwrap().moved);
    }
}
