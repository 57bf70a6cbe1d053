use std::collections::BTreeSet;

use crate::types::BookId;

/// Multi-select state for bulk operations on the library
#[derive(Debug, Default, Clone)]
pub struct Selection {
    active: bool,
    ids: BTreeSet<BookId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Flip selection mode; the set starts empty either way
    pub fn toggle_mode(&mut self) -> bool {
        self.active = !self.active;
        self.ids.clear();
        self.active
    }

    pub fn exit(&mut self) {
        self.active = false;
        self.ids.clear();
    }

    pub fn set(&mut self, id: BookId, checked: bool) {
        if checked {
            self.ids.insert(id);
        } else {
            self.ids.remove(&id);
        }
    }

    pub fn contains(&self, id: BookId) -> bool {
        self.ids.contains(&id)
    }

    /// Add every id of the current view to the selection
    pub fn select_all<I>(&mut self, view: I)
    where
        I: IntoIterator<Item = BookId>,
    {
        self.ids.extend(view);
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = BookId> + '_ {
        self.ids.iter().copied()
    }
}
