//! The sprite store's single in-flight operation descriptor (spec
//! §4.9 "Operation descriptor").
//!
//! At most one operation exists at a time; callers are expected to
//! serialise them themselves, so this type does not guard against a
//! second `start` overwriting the first.

/// What kind of bulk action an operation describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Import,
    Export,
    Replace,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteOperation {
    pub kind: OperationKind,
    pub ids: Vec<u32>,
    pub total: usize,
    pub completed: usize,
}

impl SpriteOperation {
    fn new(kind: OperationKind, ids: Vec<u32>) -> Self {
        let total = ids.len();
        SpriteOperation {
            kind,
            ids,
            total,
            completed: 0,
        }
    }
}

/// Lifecycle: `start` → `update_progress`* → (`complete` | `cancel`).
/// `update_progress` outside an active operation is a no-op.
#[derive(Default)]
pub struct OperationTracker {
    current: Option<SpriteOperation>,
}

impl OperationTracker {
    pub fn current(&self) -> Option<&SpriteOperation> {
        self.current.as_ref()
    }

    pub fn start(&mut self, kind: OperationKind, ids: Vec<u32>) {
        self.current = Some(SpriteOperation::new(kind, ids));
    }

    pub fn update_progress(&mut self, completed: usize) {
        if let Some(operation) = &mut self.current {
            operation.completed = completed.min(operation.total);
        }
    }

    /// Ends the operation and returns its final state, if one was active.
    pub fn complete(&mut self) -> Option<SpriteOperation> {
        self.current.take()
    }

    /// Ends the operation without requiring it to have reached 100%.
    pub fn cancel(&mut self) -> Option<SpriteOperation> {
        self.current.take()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_outside_an_operation_is_a_no_op() {
        let mut tracker = OperationTracker::default();
        tracker.update_progress(5);
        assert!(tracker.current().is_none());
    }

    #[test]
    fn progress_clamps_to_total() {
        let mut tracker = OperationTracker::default();
        tracker.start(OperationKind::Import, vec![1, 2, 3]);
        tracker.update_progress(100);
        assert_eq!(tracker.current().unwrap().completed, 3);
    }

    #[test]
    fn complete_clears_the_current_operation() {
        let mut tracker = OperationTracker::default();
        tracker.start(OperationKind::Export, vec![1]);
        let finished = tracker.complete().unwrap();
        assert_eq!(finished.kind, OperationKind::Export);
        assert!(tracker.current().is_none());
    }
}
