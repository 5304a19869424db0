//! Linear undo/redo log for single-image sessions.
//!
//! The log is an ordered list of produced results plus a cursor. A cursor of
//! `None` stands for "before the first entry", i.e. the unedited original.

#[derive(Debug, Clone)]
pub struct HistoryLog<T> {
    entries: Vec<T>,
    cursor: Option<usize>,
}

impl<T> Default for HistoryLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HistoryLog<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
        }
    }

    /// Appends after the cursor, dropping every entry past it first.
    pub fn push(&mut self, entry: T) {
        let keep = self.cursor.map_or(0, |c| c + 1);
        self.entries.truncate(keep);
        self.entries.push(entry);
        self.cursor = Some(self.entries.len() - 1);
    }

    /// Steps back one entry. Returns `false` when already at the original.
    pub fn undo(&mut self) -> bool {
        match self.cursor {
            Some(0) => {
                self.cursor = None;
                true
            }
            Some(c) => {
                self.cursor = Some(c - 1);
                true
            }
            None => false,
        }
    }

    /// Steps forward one entry. Returns `false` when already at the newest.
    pub fn redo(&mut self) -> bool {
        let next = self.cursor.map_or(0, |c| c + 1);
        if next < self.entries.len() {
            self.cursor = Some(next);
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> Option<&T> {
        self.cursor.and_then(|c| self.entries.get(c))
    }

    /// The entry to show, falling back to `original` at cursor -1.
    pub fn display<'a>(&'a self, original: &'a T) -> &'a T {
        self.current().unwrap_or(original)
    }

    /// Cursor as a signed index, `-1` meaning the original.
    pub fn cursor(&self) -> isize {
        self.cursor.map_or(-1, |c| c as isize)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn can_redo(&self) -> bool {
        self.cursor.map_or(0, |c| c + 1) < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }
}
