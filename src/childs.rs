use smallvec::SmallVec;

use crate::NodeKey;

/// A child slot: the first byte of the child's edge label plus the arena
/// key of the child node. The rest of the edge label lives on the child.
#[derive(Clone, Copy)]
pub(crate) struct ChildEntry {
    pub(crate) radix: u8,
    pub(crate) node: NodeKey,
}

/// Per-node child table. Entries keep insertion order and are scanned
/// linearly; sibling radix bytes are unique, so at most one entry can
/// match a key byte. Removal swaps with the last entry.
#[derive(Default)]
pub(crate) struct Childs {
    entries: SmallVec<[ChildEntry; 4]>,
}

impl Childs {
    pub(crate) fn find(&self, radix: u8) -> Option<NodeKey> {
        self.entries
            .iter()
            .find(|entry| entry.radix == radix)
            .map(|entry| entry.node)
    }

    pub(crate) fn push(&mut self, radix: u8, node: NodeKey) {
        debug_assert!(self.find(radix).is_none(), "duplicate sibling radix");
        self.entries.push(ChildEntry { radix, node });
    }

    pub(crate) fn remove(&mut self, radix: u8) -> Option<NodeKey> {
        let pos = self.entries.iter().position(|entry| entry.radix == radix)?;
        Some(self.entries.swap_remove(pos).node)
    }

    pub(crate) fn get(&self, index: usize) -> ChildEntry {
        self.entries[index]
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the sole entry if the table holds exactly one child.
    pub(crate) fn single_child(&self) -> Option<ChildEntry> {
        if self.entries.len() == 1 {
            Some(self.entries[0])
        } else {
            None
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = ChildEntry> + '_ {
        self.entries.iter().copied()
    }
}
