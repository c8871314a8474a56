use std::collections::{HashSet, VecDeque};

use crate::domain::Note;

/// Newest-first note buffer.
///
/// With `dedupe` on, no two held notes share an id.
#[derive(Debug, Clone)]
pub struct NoteBuffer {
    notes: VecDeque<Note>,
    ids: HashSet<String>,
    dedupe: bool,
}

impl NoteBuffer {
    pub fn new(dedupe: bool) -> Self {
        Self {
            notes: VecDeque::new(),
            ids: HashSet::new(),
            dedupe,
        }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn to_vec(&self) -> Vec<Note> {
        self.notes.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.notes.clear();
        self.ids.clear();
    }

    /// Put a live note at the newest end. Returns false if it was a duplicate.
    pub fn prepend(&mut self, note: Note) -> bool {
        if !self.admit(&note) {
            return false;
        }
        self.notes.push_front(note);
        true
    }

    /// Put a page at the oldest end, keeping its order. Returns how many
    /// notes were added.
    pub fn append(&mut self, page: Vec<Note>) -> usize {
        let mut added = 0;
        for note in page {
            if self.admit(&note) {
                self.notes.push_back(note);
                added += 1;
            }
        }
        added
    }

    fn admit(&mut self, note: &Note) -> bool {
        let fresh = self.ids.insert(note.id.clone());
        fresh || !self.dedupe
    }
}
