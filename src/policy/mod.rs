//! Eviction-policy internals: the entry arena, the shared index, and the two
//! tiered list structures built on top of them.
//!
//! All entries — window, probation, and protected — live in one [`Slots`]
//! arena and are addressed by stable `usize` handles.  The shared index maps
//! a key fingerprint to the handle of the one node that currently holds it;
//! each tier list links handles through per-list HEAD/TAIL sentinel nodes.
//! Moving an entry between tiers therefore never reallocates: it is either a
//! relink of the same handle or an in-place content swap between two handles.

pub(crate) mod sketch;
pub(crate) mod slru;
pub(crate) mod window;

use std::sync::Arc;

use ahash::AHashMap;

/// Sentinel link value for a detached node.
const NULL: usize = usize::MAX;

/// Which structure currently owns an entry.
///
/// Carried on the entry itself so a hit can route its promotion logic
/// without asking each tier in turn.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Tier {
    Window,
    Probation,
    Protected,
}

/// The unit stored in every tier.
pub(crate) struct Entry<V> {
    /// Primary hash; unique across the whole cache while the entry is live.
    pub(crate) fingerprint: u64,
    /// Second, independent hash used to detect fingerprint collisions.
    /// Zero for integer keys (which cannot collide without being equal).
    pub(crate) conflict: u64,
    pub(crate) tier: Tier,
    pub(crate) value: Arc<V>,
}

struct Node<V> {
    /// `None` for sentinel and free slots.
    entry: Option<Entry<V>>,
    prev: usize,
    next: usize,
}

/// The entry arena plus the shared fingerprint index.
///
/// Single owner of all entry storage.  The tier structures hold only
/// sentinel handles and capacity counters and borrow the arena per call.
pub(crate) struct Slots<V> {
    nodes: Vec<Node<V>>,
    /// fingerprint → handle of the node holding that entry.
    index: AHashMap<u64, usize>,
    /// Recycled handles.
    free: Vec<usize>,
}

impl<V> Slots<V> {
    pub(crate) fn new(capacity_hint: usize) -> Self {
        Slots {
            nodes: Vec::with_capacity(capacity_hint + 8),
            index: AHashMap::with_capacity(capacity_hint),
            free: Vec::new(),
        }
    }

    /// Allocates a linked HEAD/TAIL sentinel pair for a new list.
    pub(crate) fn sentinel_pair(&mut self) -> (usize, usize) {
        let head = self.nodes.len();
        let tail = head + 1;
        self.nodes.push(Node {
            entry: None,
            prev: NULL,
            next: tail,
        });
        self.nodes.push(Node {
            entry: None,
            prev: head,
            next: NULL,
        });
        (head, tail)
    }

    // -----------------------------------------------------------------------
    // Linked-list plumbing (operates on handles)
    // -----------------------------------------------------------------------

    /// Inserts `idx` immediately after `head` (the MRU position).
    pub(crate) fn link_after(&mut self, head: usize, idx: usize) {
        let old_first = self.nodes[head].next;
        self.nodes[idx].prev = head;
        self.nodes[idx].next = old_first;
        self.nodes[head].next = idx;
        self.nodes[old_first].prev = idx;
    }

    /// Detaches `idx` from whichever list links it.
    pub(crate) fn unlink(&mut self, idx: usize) {
        let prev = self.nodes[idx].prev;
        let next = self.nodes[idx].next;
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
        self.nodes[idx].prev = NULL;
        self.nodes[idx].next = NULL;
    }

    /// Relinks `idx` at the MRU position of the list headed by `head`.
    pub(crate) fn move_to_front(&mut self, head: usize, idx: usize) {
        self.unlink(idx);
        self.link_after(head, idx);
    }

    /// Handle of the node preceding `tail` — the LRU entry of that list, or
    /// the HEAD sentinel when the list is empty.
    #[inline]
    pub(crate) fn lru_of(&self, tail: usize) -> usize {
        self.nodes[tail].prev
    }

    #[inline]
    pub(crate) fn next_of(&self, idx: usize) -> usize {
        self.nodes[idx].next
    }

    // -----------------------------------------------------------------------
    // Entry lifecycle
    // -----------------------------------------------------------------------

    /// Stores `entry` in a fresh (or recycled) detached node and registers
    /// its fingerprint in the index.  Returns the handle.
    pub(crate) fn insert(&mut self, entry: Entry<V>) -> usize {
        let fingerprint = entry.fingerprint;
        let idx = if let Some(idx) = self.free.pop() {
            self.nodes[idx].entry = Some(entry);
            idx
        } else {
            let idx = self.nodes.len();
            self.nodes.push(Node {
                entry: Some(entry),
                prev: NULL,
                next: NULL,
            });
            idx
        };
        self.index.insert(fingerprint, idx);
        idx
    }

    /// Overwrites the entry at `idx` in place, keeping the node's list
    /// position, and swaps the index over to the new fingerprint.
    ///
    /// Returns the displaced entry.  This is how a full window (or a full
    /// probation segment) recycles its LRU slot without relinking.
    pub(crate) fn replace(&mut self, idx: usize, entry: Entry<V>) -> Option<Entry<V>> {
        let fingerprint = entry.fingerprint;
        let old = self.nodes[idx].entry.replace(entry);
        if let Some(old) = &old {
            self.index.remove(&old.fingerprint);
        }
        self.index.insert(fingerprint, idx);
        old
    }

    /// Swaps the entries held by two nodes, fixing both index mappings.
    /// List positions and link pointers are untouched; the caller retags the
    /// tiers afterwards.
    pub(crate) fn swap(&mut self, a: usize, b: usize) {
        let entry_a = self.nodes[a].entry.take();
        let entry_b = self.nodes[b].entry.take();
        if let Some(e) = &entry_a {
            self.index.insert(e.fingerprint, b);
        }
        if let Some(e) = &entry_b {
            self.index.insert(e.fingerprint, a);
        }
        self.nodes[a].entry = entry_b;
        self.nodes[b].entry = entry_a;
    }

    /// Frees an **already unlinked** node: removes the fingerprint from the
    /// index, recycles the handle, and returns the owned entry.
    pub(crate) fn release(&mut self, idx: usize) -> Option<Entry<V>> {
        let entry = self.nodes[idx].entry.take()?;
        self.index.remove(&entry.fingerprint);
        self.free.push(idx);
        Some(entry)
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    #[inline]
    pub(crate) fn lookup(&self, fingerprint: u64) -> Option<usize> {
        self.index.get(&fingerprint).copied()
    }

    #[inline]
    pub(crate) fn entry(&self, idx: usize) -> Option<&Entry<V>> {
        self.nodes[idx].entry.as_ref()
    }

    #[inline]
    pub(crate) fn entry_mut(&mut self, idx: usize) -> Option<&mut Entry<V>> {
        self.nodes[idx].entry.as_mut()
    }

    pub(crate) fn set_tier(&mut self, idx: usize, tier: Tier) {
        if let Some(entry) = self.nodes[idx].entry.as_mut() {
            entry.tier = tier;
        }
    }

    /// Number of live entries (index size, by the shared-index invariant).
    pub(crate) fn len(&self) -> usize {
        self.index.len()
    }

    #[cfg(test)]
    pub(crate) fn index_handle(&self, fingerprint: u64) -> Option<usize> {
        self.index.get(&fingerprint).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(fp: u64) -> Entry<u32> {
        Entry {
            fingerprint: fp,
            conflict: 0,
            tier: Tier::Window,
            value: Arc::new(fp as u32),
        }
    }

    #[test]
    fn insert_registers_index() {
        let mut slots: Slots<u32> = Slots::new(4);
        let idx = slots.insert(entry(9));
        assert_eq!(slots.lookup(9), Some(idx));
        assert_eq!(slots.len(), 1);
    }

    #[test]
    fn release_recycles_handles() {
        let mut slots: Slots<u32> = Slots::new(4);
        let idx = slots.insert(entry(1));
        let removed = slots.release(idx).map(|e| e.fingerprint);
        assert_eq!(removed, Some(1));
        assert_eq!(slots.lookup(1), None);
        let idx2 = slots.insert(entry(2));
        assert_eq!(idx2, idx, "freed handle should be reused");
    }

    #[test]
    fn replace_moves_index_to_new_fingerprint() {
        let mut slots: Slots<u32> = Slots::new(4);
        let idx = slots.insert(entry(1));
        let old = slots.replace(idx, entry(2));
        assert_eq!(old.map(|e| e.fingerprint), Some(1));
        assert_eq!(slots.lookup(1), None);
        assert_eq!(slots.lookup(2), Some(idx));
    }

    #[test]
    fn swap_exchanges_entries_and_index() {
        let mut slots: Slots<u32> = Slots::new(4);
        let a = slots.insert(entry(10));
        let b = slots.insert(entry(20));
        slots.swap(a, b);
        assert_eq!(slots.lookup(10), Some(b));
        assert_eq!(slots.lookup(20), Some(a));
        assert_eq!(slots.entry(a).map(|e| e.fingerprint), Some(20));
    }

    #[test]
    fn link_unlink_round_trip() {
        let mut slots: Slots<u32> = Slots::new(4);
        let (head, tail) = slots.sentinel_pair();
        let a = slots.insert(entry(1));
        let b = slots.insert(entry(2));
        slots.link_after(head, a);
        slots.link_after(head, b); // list: head, b, a, tail
        assert_eq!(slots.next_of(head), b);
        assert_eq!(slots.lru_of(tail), a);
        slots.unlink(a);
        assert_eq!(slots.lru_of(tail), b);
        slots.unlink(b);
        assert_eq!(slots.lru_of(tail), head, "empty list points back at head");
    }
}
