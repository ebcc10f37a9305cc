//! Undo/redo log for graph edits.
//!
//! [`HistoryLog`] is the pointer bookkeeping: an array of records and the
//! index of the last applied one. It knows nothing about graphs; replaying
//! a record is the caller's closure. [`HistoryRecord`] is the reversible
//! graph edit stored in the log.

pub mod record;

pub use record::HistoryRecord;

/// Result of an undo or redo request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryStep {
    /// A record was replayed and the pointer moved.
    Applied,
    /// Nothing left in that direction.
    Exhausted,
}

/// Append-only record array with a movable top pointer.
#[derive(Debug, Clone)]
pub struct HistoryLog<R> {
    records: Vec<R>,
    /// Index of the last applied record; `None` when nothing can be undone.
    top: Option<usize>,
}

impl<R> Default for HistoryLog<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            top: None,
        }
    }
}

impl<R> HistoryLog<R> {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self) -> usize {
        self.top.map_or(0, |top| top + 1)
    }

    /// Record an applied edit. Anything that could have been redone is discarded
    /// and handed back, oldest first.
    pub fn push(&mut self, record: R) -> Vec<R> {
        let next = self.next();
        let discarded = self.records.split_off(next);
        self.records.push(record);
        self.top = Some(next);
        discarded
    }

    /// Reverse the record at the top, then move the pointer down.
    ///
    /// If `reverse` fails the pointer stays where it was.
    pub fn undo<E>(&mut self, reverse: impl FnOnce(&R) -> Result<(), E>) -> Result<HistoryStep, E> {
        let Some(top) = self.top else {
            return Ok(HistoryStep::Exhausted);
        };
        reverse(&self.records[top])?;
        self.top = top.checked_sub(1);
        Ok(HistoryStep::Applied)
    }

    /// Re-apply the record after the top, then move the pointer up.
    ///
    /// If `execute` fails the pointer stays where it was.
    pub fn redo<E>(&mut self, execute: impl FnOnce(&R) -> Result<(), E>) -> Result<HistoryStep, E> {
        let next = self.next();
        let Some(record) = self.records.get(next) else {
            return Ok(HistoryStep::Exhausted);
        };
        execute(record)?;
        self.top = Some(next);
        Ok(HistoryStep::Applied)
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.top = None;
    }

    pub fn top(&self) -> Option<usize> {
        self.top
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.top.is_some()
    }

    pub fn can_redo(&self) -> bool {
        self.next() < self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(_: &&str) -> Result<(), ()> {
        Ok(())
    }

    #[test]
    fn test_undo_then_redo_restores_top() {
        let mut log = HistoryLog::new();
        log.push("r1");
        log.push("r2");
        assert_eq!(log.undo(ok), Ok(HistoryStep::Applied));
        assert_eq!(log.redo(ok), Ok(HistoryStep::Applied));
        assert_eq!(log.top(), Some(1));
        assert_eq!(log.records(), &["r1", "r2"]);
    }

    #[test]
    fn test_push_discards_redo_tail() {
        let mut log = HistoryLog::new();
        log.push("r1");
        log.push("r2");
        log.undo(ok).unwrap();
        assert_eq!(log.push("r3"), vec!["r2"]);
        assert_eq!(log.records(), &["r1", "r3"]);
        assert_eq!(log.top(), Some(1));
        assert!(!log.can_redo());
    }

    #[test]
    fn test_exhausted_both_ways() {
        let mut log: HistoryLog<&str> = HistoryLog::new();
        assert_eq!(log.undo(ok), Ok(HistoryStep::Exhausted));
        assert_eq!(log.redo(ok), Ok(HistoryStep::Exhausted));

        log.push("r1");
        assert_eq!(log.redo(ok), Ok(HistoryStep::Exhausted));
        log.undo(ok).unwrap();
        assert_eq!(log.top(), None);
        assert_eq!(log.undo(ok), Ok(HistoryStep::Exhausted));
    }

    #[test]
    fn test_failed_replay_keeps_pointer() {
        let mut log = HistoryLog::new();
        log.push("r1");
        assert_eq!(log.undo(|_| Err("gone")), Err("gone"));
        assert_eq!(log.top(), Some(0));

        log.undo(ok).unwrap();
        assert_eq!(log.redo(|_| Err("gone")), Err("gone"));
        assert_eq!(log.top(), None);
    }

    #[test]
    fn test_clear() {
        let mut log = HistoryLog::new();
        log.push(1);
        log.push(2);
        log.clear();
        assert!(log.is_empty());
        assert!(!log.can_undo());
        assert!(!log.can_redo());
    }
}
