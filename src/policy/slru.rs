//! The segmented main cache: probation and protected LRU lists sharing one
//! combined budget.
//!
//! Admitted candidates always land in probation.  A second access promotes a
//! probation entry into protected; when protected is full the promotion is a
//! **content swap** with the protected LRU entry — the two nodes trade
//! entries (and index mappings) rather than relinking, so both lists keep
//! their node counts stable.  The probation LRU is the segment's eviction
//! victim once combined occupancy reaches the budget.

use super::{Entry, Slots, Tier};

pub(crate) struct SegmentedLru {
    probation_head: usize,
    probation_tail: usize,
    protected_head: usize,
    protected_tail: usize,
    probation_cap: usize,
    protected_cap: usize,
    probation_len: usize,
    protected_len: usize,
}

impl SegmentedLru {
    pub(crate) fn new<V>(slots: &mut Slots<V>, probation_cap: usize, protected_cap: usize) -> Self {
        let (probation_head, probation_tail) = slots.sentinel_pair();
        let (protected_head, protected_tail) = slots.sentinel_pair();
        SegmentedLru {
            probation_head,
            probation_tail,
            protected_head,
            protected_tail,
            probation_cap,
            protected_cap,
            probation_len: 0,
            protected_len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.probation_len + self.protected_len
    }

    fn combined_cap(&self) -> usize {
        self.probation_cap + self.protected_cap
    }

    /// Admits a candidate into probation.
    ///
    /// While probation is under its own cap, or the segment as a whole is
    /// under the combined budget, the entry is linked at probation's MRU end.
    /// Otherwise the probation LRU slot — the current victim — is recycled in
    /// place and its displaced entry returned to the caller.
    pub(crate) fn add<V>(&mut self, slots: &mut Slots<V>, mut entry: Entry<V>) -> Option<Entry<V>> {
        entry.tier = Tier::Probation;
        if self.probation_len < self.probation_cap || self.len() < self.combined_cap() {
            let idx = slots.insert(entry);
            slots.link_after(self.probation_head, idx);
            self.probation_len += 1;
            return None;
        }
        let lru = slots.lru_of(self.probation_tail);
        let displaced = slots.replace(lru, entry);
        slots.move_to_front(self.probation_head, lru);
        displaced
    }

    /// Promotion logic for a hit in either segment.
    ///
    /// Protected hit: recency bump only.  Probation hit: move into protected
    /// if it has spare room; otherwise swap contents with the protected LRU,
    /// demoting that entry into the probation slot, and bump both to their
    /// MRU ends.
    pub(crate) fn touch<V>(&mut self, slots: &mut Slots<V>, idx: usize) {
        let tier = match slots.entry(idx) {
            Some(entry) => entry.tier,
            None => return,
        };
        match tier {
            Tier::Protected => slots.move_to_front(self.protected_head, idx),
            Tier::Probation => {
                if self.protected_len < self.protected_cap {
                    slots.unlink(idx);
                    self.probation_len -= 1;
                    slots.set_tier(idx, Tier::Protected);
                    slots.link_after(self.protected_head, idx);
                    self.protected_len += 1;
                } else {
                    let demote = slots.lru_of(self.protected_tail);
                    slots.swap(idx, demote);
                    slots.set_tier(idx, Tier::Probation);
                    slots.set_tier(demote, Tier::Protected);
                    slots.move_to_front(self.probation_head, idx);
                    slots.move_to_front(self.protected_head, demote);
                }
            }
            Tier::Window => debug_assert!(false, "window entries are not routed here"),
        }
    }

    /// Recency bump without promotion, used when an existing entry is
    /// overwritten by `set` rather than read.
    pub(crate) fn refresh<V>(&mut self, slots: &mut Slots<V>, idx: usize) {
        match slots.entry(idx).map(|e| e.tier) {
            Some(Tier::Probation) => slots.move_to_front(self.probation_head, idx),
            Some(Tier::Protected) => slots.move_to_front(self.protected_head, idx),
            _ => {}
        }
    }

    /// Handle of the probation LRU entry the segment would evict next, or
    /// `None` while combined occupancy is still under budget.
    pub(crate) fn victim<V>(&self, slots: &Slots<V>) -> Option<usize> {
        if self.len() < self.combined_cap() {
            return None;
        }
        let lru = slots.lru_of(self.probation_tail);
        if lru == self.probation_head {
            return None;
        }
        Some(lru)
    }

    /// Eagerly removes the entry at `idx` (explicit deletion).
    pub(crate) fn remove<V>(&mut self, slots: &mut Slots<V>, idx: usize) -> Option<Entry<V>> {
        match slots.entry(idx).map(|e| e.tier) {
            Some(Tier::Probation) => self.probation_len -= 1,
            Some(Tier::Protected) => self.protected_len -= 1,
            _ => return None,
        }
        slots.unlink(idx);
        slots.release(idx)
    }

    pub(crate) fn probation_len(&self) -> usize {
        self.probation_len
    }

    pub(crate) fn protected_len(&self) -> usize {
        self.protected_len
    }

    pub(crate) fn probation_head(&self) -> usize {
        self.probation_head
    }

    pub(crate) fn probation_tail(&self) -> usize {
        self.probation_tail
    }

    pub(crate) fn protected_head(&self) -> usize {
        self.protected_head
    }

    pub(crate) fn protected_tail(&self) -> usize {
        self.protected_tail
    }
}
