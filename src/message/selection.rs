use super::tags::{MAX_TAGS, TagHandle};

/// Per-recipient tag visibility: bit *i* set means the tag with handle *i*
/// is shown.
///
/// Only meaningful against the tag map it was computed from. Positions past
/// the width read as unselected and are ignored on write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TagSelection(u64);

impl TagSelection {
    pub const EMPTY: TagSelection = TagSelection(0);

    #[inline]
    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    #[inline]
    pub fn bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn select(&mut self, handle: TagHandle) {
        self.select_position(handle.index());
    }

    #[inline]
    pub fn is_selected(self, handle: TagHandle) -> bool {
        self.is_selected_position(handle.index())
    }

    pub fn select_position(&mut self, position: usize) {
        if position < MAX_TAGS {
            self.0 |= 1u64 << position;
        }
    }

    pub fn is_selected_position(self, position: usize) -> bool {
        position < MAX_TAGS && self.0 & (1u64 << position) != 0
    }
}
