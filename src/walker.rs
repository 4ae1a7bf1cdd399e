use bytes::Bytes;
use parking_lot::RwLockReadGuard;

use crate::{NodeKey, TreeInner};

/// A streaming cursor over every `(key, value)` pair under a prefix, in
/// depth-first pre-order following child insertion order.
///
/// Constructed by [`RadixTree::walk_prefix`](crate::RadixTree::walk_prefix).
/// The walker holds the tree's shared read lock from construction until it
/// is exhausted or dropped, so it observes one consistent snapshot and
/// writers wait for it. Yielded keys and values are owned copies.
pub struct Walker<'a> {
    /// `Some` while there is anything left to yield; dropped eagerly on
    /// exhaustion so an already-drained walker does not pin writers.
    guard: Option<RwLockReadGuard<'a, TreeInner>>,
    stack: Vec<Frame>,
    /// Concatenation of the edge chunks of every frame on the stack: the
    /// full key of the node currently on top.
    path: Vec<u8>,
}

struct Frame {
    node: NodeKey,
    /// Index of the next child to descend into.
    cursor: usize,
    /// How many bytes this frame contributed to `path`. For the mount
    /// frame this covers the queried prefix plus any bridged label tail;
    /// for every other frame it is the full edge label length.
    chunk_len: usize,
    /// The node's own value has been considered (emitted or absent).
    emitted: bool,
}

impl<'a> Walker<'a> {
    /// A walker that yields nothing and holds no lock.
    pub(crate) fn empty() -> Self {
        Self {
            guard: None,
            stack: Vec::new(),
            path: Vec::new(),
        }
    }

    /// Mounts the walk at `node`, reached by consuming `consumed` bytes of
    /// edge labels for `prefix`. When the prefix ends inside the mount
    /// node's edge label, `consumed` overshoots the prefix length and the
    /// unmatched label tail is bridged into the emitted keys.
    pub(crate) fn mount(
        guard: RwLockReadGuard<'a, TreeInner>,
        node: NodeKey,
        prefix: &[u8],
        consumed: usize,
    ) -> Self {
        let mut path = Vec::with_capacity(consumed);
        path.extend_from_slice(prefix);
        if consumed > prefix.len() {
            let label = &guard.node(node).label;
            let tail = consumed - prefix.len();
            path.extend_from_slice(&label[label.len() - tail..]);
        }
        Self {
            guard: Some(guard),
            stack: vec![Frame {
                node,
                cursor: 0,
                chunk_len: consumed,
                emitted: false,
            }],
            path,
        }
    }
}

impl Iterator for Walker<'_> {
    type Item = (Bytes, Bytes);

    fn next(&mut self) -> Option<(Bytes, Bytes)> {
        loop {
            let Some(top) = self.stack.last_mut() else {
                // Exhausted: let go of the read lock before the walker is
                // even dropped.
                self.guard = None;
                return None;
            };
            let inner = self.guard.as_deref()?;
            let node = inner.node(top.node);

            if !top.emitted {
                top.emitted = true;
                if let Some(value) = &node.value {
                    return Some((Bytes::copy_from_slice(&self.path), value.clone()));
                }
            }

            if top.cursor == node.childs.len() {
                let chunk_len = top.chunk_len;
                self.path.truncate(self.path.len() - chunk_len);
                self.stack.pop();
                if let Some(parent) = self.stack.last_mut() {
                    parent.cursor += 1;
                }
                continue;
            }

            let entry = node.childs.get(top.cursor);
            let child_label = &inner.node(entry.node).label;
            self.path.push(entry.radix);
            self.path.extend_from_slice(child_label);
            let chunk_len = 1 + child_label.len();
            self.stack.push(Frame {
                node: entry.node,
                cursor: 0,
                chunk_len,
                emitted: false,
            });
        }
    }
}
