//! The window tier: a small, pure-recency LRU absorbing all fresh inserts.
//!
//! Every new key spends its first moments here (≈1 % of total capacity,
//! minimum one slot) so it gets a grace period of recency before it has to
//! compete for permanent residency in the main cache.  No frequency or
//! admission logic lives in this tier.

use super::{Entry, Slots, Tier};

pub(crate) struct WindowLru {
    head: usize,
    tail: usize,
    cap: usize,
    len: usize,
}

impl WindowLru {
    pub(crate) fn new<V>(slots: &mut Slots<V>, cap: usize) -> Self {
        let (head, tail) = slots.sentinel_pair();
        WindowLru {
            head,
            tail,
            cap,
            len: 0,
        }
    }

    /// Inserts a fresh entry at the MRU end.
    ///
    /// When the window is full, the LRU slot is recycled in place: its entry
    /// is handed back to the caller (detached, for the admission decision)
    /// and the node is reused for the newcomer, moving to the MRU end.
    pub(crate) fn add<V>(&mut self, slots: &mut Slots<V>, entry: Entry<V>) -> Option<Entry<V>> {
        debug_assert_eq!(entry.tier, Tier::Window);
        if self.len < self.cap {
            let idx = slots.insert(entry);
            slots.link_after(self.head, idx);
            self.len += 1;
            return None;
        }
        let lru = slots.lru_of(self.tail);
        let evicted = slots.replace(lru, entry);
        slots.move_to_front(self.head, lru);
        evicted
    }

    /// Recency bump on a window hit.
    pub(crate) fn touch<V>(&mut self, slots: &mut Slots<V>, idx: usize) {
        slots.move_to_front(self.head, idx);
    }

    /// Eagerly removes the entry at `idx` (explicit deletion).
    pub(crate) fn remove<V>(&mut self, slots: &mut Slots<V>, idx: usize) -> Option<Entry<V>> {
        slots.unlink(idx);
        self.len -= 1;
        slots.release(idx)
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn head(&self) -> usize {
        self.head
    }

    pub(crate) fn tail(&self) -> usize {
        self.tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn entry(fp: u64) -> Entry<u64> {
        Entry {
            fingerprint: fp,
            conflict: 0,
            tier: Tier::Window,
            value: Arc::new(fp),
        }
    }

    #[test]
    fn fills_up_to_capacity_without_evicting() {
        let mut slots: Slots<u64> = Slots::new(8);
        let mut window = WindowLru::new(&mut slots, 3);
        for fp in 0..3 {
            assert!(window.add(&mut slots, entry(fp)).is_none());
        }
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn full_window_recycles_the_lru_slot() {
        let mut slots: Slots<u64> = Slots::new(4);
        let mut window = WindowLru::new(&mut slots, 2);
        window.add(&mut slots, entry(1));
        window.add(&mut slots, entry(2));
        let old_handle = slots.index_handle(1);

        let evicted = window.add(&mut slots, entry(3));
        assert_eq!(evicted.map(|e| e.fingerprint), Some(1), "1 was LRU");
        assert_eq!(window.len(), 2);
        assert_eq!(
            slots.index_handle(3),
            old_handle,
            "newcomer must reuse the evicted entry's node"
        );
        assert_eq!(slots.lookup(1), None);
    }

    #[test]
    fn touch_moves_entry_to_mru() {
        let mut slots: Slots<u64> = Slots::new(4);
        let mut window = WindowLru::new(&mut slots, 2);
        window.add(&mut slots, entry(1));
        window.add(&mut slots, entry(2));
        let idx1 = slots.lookup(1).unwrap();
        window.touch(&mut slots, idx1); // 2 is now LRU

        let evicted = window.add(&mut slots, entry(3));
        assert_eq!(evicted.map(|e| e.fingerprint), Some(2));
        assert!(slots.lookup(1).is_some(), "touched entry must survive");
    }

    #[test]
    fn remove_frees_the_slot() {
        let mut slots: Slots<u64> = Slots::new(4);
        let mut window = WindowLru::new(&mut slots, 2);
        window.add(&mut slots, entry(1));
        let idx = slots.lookup(1).unwrap();
        let removed = window.remove(&mut slots, idx);
        assert_eq!(removed.map(|e| e.fingerprint), Some(1));
        assert_eq!(window.len(), 0);
        assert_eq!(slots.lookup(1), None);
        assert_eq!(slots.lru_of(window.tail()), window.head(), "list must be empty");
    }
}
