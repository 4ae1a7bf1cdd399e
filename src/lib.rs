//! # raxtree
//!
//! A concurrent, in-memory compressed radix tree keyed by arbitrary byte
//! strings, mapping to byte-string values.
//!
//! ## Features
//!
//! - **Path compression**: single-descendant chains share one edge label,
//!   keeping the tree minimal under arbitrary insert/delete interleavings
//! - **Prefix operations**: `walk_prefix` streams every entry under a
//!   prefix; `delete_prefix` removes them in one pass
//! - **Single-writer / many-readers**: one tree-wide reader/writer lock;
//!   walkers hold a shared read lock for their whole lifetime
//! - **Cheap values**: keys and values are `bytes::Bytes`; splitting an
//!   edge sub-slices its label without copying
//!
//! ## Example
//!
//! ```rust,ignore
//! use raxtree::RadixTree;
//! use bytes::Bytes;
//!
//! let tree = RadixTree::new();
//!
//! tree.set(b"user:alice", Bytes::from_static(b"admin"));
//! tree.set(b"user:bob", Bytes::from_static(b"guest"));
//!
//! assert_eq!(tree.get(b"user:alice"), Some(Bytes::from_static(b"admin")));
//!
//! for (key, value) in tree.walk_prefix(b"user:") {
//!     println!("{:?} = {:?}", key, value);
//! }
//!
//! assert_eq!(tree.delete_prefix(b"user:"), 2);
//! ```

pub mod codec;

mod childs;
mod walker;

#[cfg(test)]
mod proptests;

use bytes::Bytes;
use parking_lot::RwLock;
use slotmap::SlotMap;

use crate::childs::Childs;
pub use crate::walker::Walker;

slotmap::new_key_type! {
    pub(crate) struct NodeKey;
}

/// A concurrent compressed radix tree.
///
/// Keys are arbitrary byte strings; so are values. All methods take
/// `&self`: the tree owns a single reader/writer lock, acquired in shared
/// mode by [`get`](RadixTree::get) and [`walk_prefix`](RadixTree::walk_prefix)
/// and in exclusive mode by every mutating operation.
///
/// # Example
///
/// ```rust,ignore
/// use raxtree::RadixTree;
/// use bytes::Bytes;
///
/// let tree = RadixTree::new();
/// tree.set(b"key", Bytes::from_static(b"value"));
///
/// assert_eq!(tree.get(b"key"), Some(Bytes::from_static(b"value")));
/// ```
pub struct RadixTree {
    inner: RwLock<TreeInner>,
}

impl Default for RadixTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RadixTree {
    /// Creates a new empty tree.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(TreeInner::new()),
        }
    }

    /// Retrieves the value stored under `key`.
    ///
    /// Returns an owned copy of the value, or `None` if the key is not
    /// present. An empty value is still `Some`: present-but-empty and
    /// absent are distinct.
    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        let inner = self.inner.read();
        let found = inner.descend(key, false);
        if found.consumed != key.len() {
            return None;
        }
        inner.node(found.node).value.clone()
    }

    /// Inserts or overwrites the value stored under `key`.
    ///
    /// Returns `true` iff an existing value was replaced. The key bytes
    /// are copied; the value buffer is moved into the tree and released
    /// when the entry is overwritten or deleted.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use raxtree::RadixTree;
    /// use bytes::Bytes;
    ///
    /// let tree = RadixTree::new();
    /// assert!(!tree.set(b"key", Bytes::from_static(b"one")));
    /// assert!(tree.set(b"key", Bytes::from_static(b"two")));
    /// ```
    pub fn set(&self, key: &[u8], value: Bytes) -> bool {
        self.inner.write().set(key, value)
    }

    /// Like [`set`](RadixTree::set), but copies the value bytes instead of
    /// taking an owned buffer.
    pub fn set_from_slice(&self, key: &[u8], value: &[u8]) -> bool {
        self.set(key, Bytes::copy_from_slice(value))
    }

    /// Deletes the value stored under `key`.
    ///
    /// Returns `true` iff a value was removed. A key that only exists as
    /// an interior routing point is not a present key and yields `false`.
    pub fn delete_key(&self, key: &[u8]) -> bool {
        self.inner.write().delete_key(key)
    }

    /// Deletes every key that starts with `prefix`.
    ///
    /// Returns the number of keys removed. An empty prefix deletes every
    /// key in the tree, including the empty key when present.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use raxtree::RadixTree;
    /// use bytes::Bytes;
    ///
    /// let tree = RadixTree::new();
    /// tree.set(b"user:1", Bytes::from_static(b"alice"));
    /// tree.set(b"user:2", Bytes::from_static(b"bob"));
    /// tree.set(b"post:1", Bytes::from_static(b"hello"));
    ///
    /// assert_eq!(tree.delete_prefix(b"user:"), 2);
    /// assert_eq!(tree.get(b"post:1"), Some(Bytes::from_static(b"hello")));
    /// ```
    pub fn delete_prefix(&self, prefix: &[u8]) -> usize {
        self.inner.write().delete_prefix(prefix)
    }

    /// Destroys every entry. The tree is immediately reusable.
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Enumerates every `(key, value)` pair whose key starts with `prefix`,
    /// in depth-first pre-order following child insertion order.
    ///
    /// The walker holds the tree's shared read lock until it is exhausted
    /// or dropped, so writers wait for it. Dropping a walker early is
    /// fine and releases the lock; other readers and walkers can run
    /// concurrently with it.
    ///
    /// A prefix with no matching keys yields an empty walker.
    pub fn walk_prefix(&self, prefix: &[u8]) -> Walker<'_> {
        let guard = self.inner.read();
        let found = guard.descend(prefix, true);
        if found.consumed < prefix.len() {
            return Walker::empty();
        }
        Walker::mount(guard, found.node, prefix, found.consumed)
    }
}

/// Lock-protected tree state: the node arena plus the key of the dummy
/// root. The root has an empty label, is never merged and never removed.
pub(crate) struct TreeInner {
    arena: SlotMap<NodeKey, Node>,
    root: NodeKey,
}

#[derive(Default)]
pub(crate) struct Node {
    /// Edge-label tail: the full edge label is the dispatch byte held by
    /// the parent's child table followed by these bytes. Empty for the
    /// root. Splits sub-slice this buffer; merges replace it with a fresh
    /// concatenation.
    pub(crate) label: Bytes,
    pub(crate) value: Option<Bytes>,
    pub(crate) childs: Childs,
}

/// Number of leading bytes `a` and `b` agree on.
fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Where a descent through the tree came to rest.
#[derive(Clone, Copy)]
struct Descent {
    /// Deepest node reached.
    node: NodeKey,
    /// Dispatch byte and parent of `node`; `None` when `node` is the root.
    parent: Option<(NodeKey, u8)>,
    /// Key bytes consumed by edge labels on the way down. Equal to the
    /// key length on an exact hit, short of it when the walk stalled, and
    /// past it when an edge was entered mid-label.
    consumed: usize,
}

impl TreeInner {
    fn new() -> Self {
        let mut arena = SlotMap::with_key();
        let root = arena.insert(Node::default());
        Self { arena, root }
    }

    pub(crate) fn node(&self, key: NodeKey) -> &Node {
        self.arena.get(key).expect("stale node key")
    }

    fn node_mut(&mut self, key: NodeKey) -> &mut Node {
        self.arena.get_mut(key).expect("stale node key")
    }

    fn find_child(&self, node: NodeKey, radix: u8) -> Option<NodeKey> {
        self.node(node).childs.find(radix)
    }

    /// The shared descent primitive. Follows edge labels from the root as
    /// far as `key` allows and reports the deepest node, its parent link
    /// and the bytes consumed.
    ///
    /// An edge is taken only when its whole label matches the next key
    /// bytes. With `enter_edges`, a key that runs out partway through a
    /// label additionally descends into that edge's node, leaving
    /// `consumed` past the key length by the unmatched label tail; the
    /// prefix operations use this to treat an edge interior as a match.
    fn descend(&self, key: &[u8], enter_edges: bool) -> Descent {
        let mut here = Descent {
            node: self.root,
            parent: None,
            consumed: 0,
        };
        while here.consumed < key.len() {
            let radix = key[here.consumed];
            let Some(child_key) = self.find_child(here.node, radix) else {
                break;
            };
            let label = &self.node(child_key).label;
            let rest = &key[here.consumed + 1..];
            let common = common_prefix(label, rest);

            if common == label.len() {
                // Whole edge matched; the loop decides whether key bytes
                // remain.
                here = Descent {
                    node: child_key,
                    parent: Some((here.node, radix)),
                    consumed: here.consumed + 1 + common,
                };
            } else if enter_edges && common == rest.len() {
                // The key ends inside this edge label.
                here = Descent {
                    node: child_key,
                    parent: Some((here.node, radix)),
                    consumed: here.consumed + 1 + label.len(),
                };
                break;
            } else {
                break;
            }
        }
        here
    }

    fn set(&mut self, key: &[u8], value: Bytes) -> bool {
        let found = self.descend(key, false);
        if found.consumed == key.len() {
            return self.node_mut(found.node).value.replace(value).is_some();
        }

        let rest = &key[found.consumed..];
        match self.find_child(found.node, rest[0]) {
            // A child shares at least the first byte: split its edge.
            Some(child_key) => self.split_child(child_key, rest, value),
            None => {
                self.insert_leaf(found.node, rest, value);
            }
        }
        false
    }

    /// Splits `child_key`'s edge at the point where `rest` diverges from
    /// it. The child keeps the common bytes and becomes a router; its old
    /// tail, value and children move to a new first child. The inserted
    /// value lands either on the router (when `rest` ends at the split
    /// point) or on a second new leaf. Both label fragments are sub-slices
    /// of the old label buffer.
    fn split_child(&mut self, child_key: NodeKey, rest: &[u8], value: Bytes) {
        let (old_label, old_value, old_childs, common) = {
            let child = self.node_mut(child_key);
            // The dispatch byte already matched, so common >= 1 and the
            // divergence sits strictly inside the label tail.
            let common = 1 + common_prefix(&child.label, &rest[1..]);
            let old_label = std::mem::take(&mut child.label);
            let old_value = child.value.take();
            let old_childs = std::mem::take(&mut child.childs);

            child.label = old_label.slice(..common - 1);

            (old_label, old_value, old_childs, common)
        };

        // New node for the child's previous contents.
        let tail_radix = old_label[common - 1];
        let tail_key = self.arena.insert(Node {
            label: old_label.slice(common..),
            value: old_value,
            childs: old_childs,
        });
        self.node_mut(child_key).childs.push(tail_radix, tail_key);

        if common == rest.len() {
            // The split point spells the inserted key itself.
            self.node_mut(child_key).value = Some(value);
        } else {
            self.insert_leaf(child_key, &rest[common..], value);
        }
    }

    fn insert_leaf(&mut self, parent: NodeKey, rest: &[u8], value: Bytes) -> NodeKey {
        let leaf_key = self.arena.insert(Node {
            label: Bytes::copy_from_slice(&rest[1..]),
            value: Some(value),
            childs: Childs::default(),
        });
        self.node_mut(parent).childs.push(rest[0], leaf_key);
        leaf_key
    }

    fn delete_key(&mut self, key: &[u8]) -> bool {
        if key.is_empty() {
            let root = self.root;
            return self.node_mut(root).value.take().is_some();
        }

        let found = self.descend(key, false);
        if found.consumed != key.len() {
            return false;
        }
        // A bare router spells no key.
        if self.node(found.node).value.is_none() {
            return false;
        }
        let Some((parent, radix)) = found.parent else {
            // A non-empty key never ends on the root.
            return false;
        };

        if self.node(found.node).childs.is_empty() {
            self.arena.remove(found.node);
            self.node_mut(parent).childs.remove(radix);
            if parent != self.root {
                self.recompress(parent);
            }
        } else {
            // Keep the node as a router for its subtree.
            self.node_mut(found.node).value = None;
            self.recompress(found.node);
        }
        true
    }

    fn delete_prefix(&mut self, prefix: &[u8]) -> usize {
        if prefix.is_empty() {
            let root = self.root;
            let node = self.node_mut(root);
            let had_value = node.value.take().is_some();
            let detached = std::mem::take(&mut node.childs);
            let freed = self.free_subtrees(detached.iter().map(|entry| entry.node).collect());
            return freed + usize::from(had_value);
        }

        // An edge entered mid-label is covered by the prefix, so the
        // entering descent already lands on the node to cut.
        let found = self.descend(prefix, true);
        if found.consumed < prefix.len() {
            return 0;
        }
        let Some((parent, radix)) = found.parent else {
            return 0;
        };

        self.node_mut(parent).childs.remove(radix);
        let count = self.free_subtrees(vec![found.node]);
        if parent != self.root {
            self.recompress(parent);
        }
        count
    }

    fn clear(&mut self) {
        let root = self.root;
        let node = self.node_mut(root);
        node.value = None;
        let detached = std::mem::take(&mut node.childs);
        self.free_subtrees(detached.iter().map(|entry| entry.node).collect());
    }

    /// Frees whole subtrees iteratively. Returns the number of values
    /// released, which is the number of keys those subtrees spelled.
    fn free_subtrees(&mut self, mut stack: Vec<NodeKey>) -> usize {
        let mut count = 0;
        while let Some(node_key) = stack.pop() {
            let Some(node) = self.arena.remove(node_key) else {
                continue;
            };
            if node.value.is_some() {
                count += 1;
            }
            stack.extend(node.childs.iter().map(|entry| entry.node));
        }
        count
    }

    /// If the node is a valueless non-root with exactly one child, absorb
    /// the child: labels concatenate and the child's value and children
    /// move up. Runs at most once; ancestors were already minimal before
    /// the current operation, so no cascade is needed.
    fn recompress(&mut self, node_key: NodeKey) {
        if node_key == self.root {
            return;
        }
        if self.node(node_key).value.is_some() {
            return;
        }
        let Some(entry) = self.node(node_key).childs.single_child() else {
            return;
        };
        let Some(child) = self.arena.remove(entry.node) else {
            return;
        };

        let node = self.node_mut(node_key);
        let mut merged = Vec::with_capacity(node.label.len() + 1 + child.label.len());
        merged.extend_from_slice(&node.label);
        merged.push(entry.radix);
        merged.extend_from_slice(&child.label);
        node.label = Bytes::from(merged);
        node.value = child.value;
        node.childs = child.childs;
    }
}
