use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;

use ahash::RandomState;
use parking_lot::Mutex;

use crate::builder::CacheBuilder;
use crate::error::ConfigError;
use crate::key::CacheKey;
use crate::metrics::stats::{Metrics, StatsCounter};
use crate::policy::slru::SegmentedLru;
use crate::policy::window::WindowLru;
use crate::policy::sketch::{Doorkeeper, FrequencySketch};
use crate::policy::{Entry, Slots, Tier};

/// Target false-positive rate for the doorkeeper filter.
const DOORKEEPER_FP_RATE: f64 = 0.01;

/// Splits the configured capacity into per-tier budgets.
///
/// Window gets ≈1 % of the total, the main cache the rest; probation is
/// ≈20 % of main and protected the remaining ≈80 %.  Every floor clamps to
/// one slot, so degenerate capacities yield small but functional tiers
/// (their sum may then exceed the configured total — that is the documented
/// trade-off, not an error).
pub(crate) fn split_capacity(capacity: usize) -> (usize, usize, usize) {
    let window = (capacity / 100).max(1);
    let main = capacity.saturating_sub(window).max(1);
    let probation = (main / 5).max(1);
    let protected = main.saturating_sub(probation).max(1);
    (window, probation, protected)
}

// ---------------------------------------------------------------------------
// State — everything behind the single lock
// ---------------------------------------------------------------------------

/// The mutable aggregate: arena + shared index, both eviction tiers, the
/// admission filter, the frequency sketch, and the periodic-reset counter.
///
/// Every public cache operation takes the one mutex around this struct for
/// its full duration — reads included, because a hit reorders lists and may
/// move entries between tiers.
struct State<V> {
    slots: Slots<V>,
    window: WindowLru,
    main: SegmentedLru,
    doorkeeper: Doorkeeper,
    sketch: FrequencySketch,
    /// Read operations since the last decay pass.
    ops: u64,
    /// Reads between decay passes (sketch halving + doorkeeper clear).
    reset_interval: u64,
    capacity: usize,
}

impl<V> State<V> {
    fn new(capacity: usize, reset_interval: u64) -> Self {
        let (window_cap, probation_cap, protected_cap) = split_capacity(capacity);
        let mut slots = Slots::new(window_cap + probation_cap + protected_cap);
        let window = WindowLru::new(&mut slots, window_cap);
        let main = SegmentedLru::new(&mut slots, probation_cap, protected_cap);
        State {
            slots,
            window,
            main,
            doorkeeper: Doorkeeper::new(capacity, DOORKEEPER_FP_RATE),
            sketch: FrequencySketch::new(capacity),
            ops: 0,
            reset_interval,
            capacity,
        }
    }

    // -----------------------------------------------------------------------
    // Set
    // -----------------------------------------------------------------------

    fn set(&mut self, fingerprint: u64, conflict: u64, value: V, metrics: &StatsCounter) -> bool {
        // Overwrite of a live fingerprint: update in place and bump recency
        // within the current tier.  Never insert a second node for the same
        // fingerprint — the shared index must stay one-to-one.
        if let Some(idx) = self.slots.lookup(fingerprint) {
            let tier = match self.slots.entry_mut(idx) {
                Some(entry) => {
                    entry.conflict = conflict;
                    entry.value = Arc::new(value);
                    entry.tier
                }
                None => return true,
            };
            match tier {
                Tier::Window => self.window.touch(&mut self.slots, idx),
                Tier::Probation | Tier::Protected => self.main.refresh(&mut self.slots, idx),
            }
            return true;
        }

        let entry = Entry {
            fingerprint,
            conflict,
            tier: Tier::Window,
            value: Arc::new(value),
        };
        let Some(candidate) = self.window.add(&mut self.slots, entry) else {
            return true;
        };

        self.admit(candidate, metrics);
        true
    }

    /// The admission decision for a window-evicted candidate.
    ///
    /// 1. Main cache not yet at budget → admit unconditionally.
    /// 2. First doorkeeper sighting → drop the candidate; one touch is not
    ///    enough evidence to displace a resident.
    /// 3. Otherwise compare sketch estimates; the victim wins ties.
    fn admit(&mut self, candidate: Entry<V>, metrics: &StatsCounter) {
        let Some(victim_idx) = self.main.victim(&self.slots) else {
            if self.main.add(&mut self.slots, candidate).is_some() {
                metrics.record_eviction();
            }
            return;
        };

        if !self.doorkeeper.allow(candidate.fingerprint) {
            metrics.record_rejection();
            metrics.record_eviction();
            return;
        }

        let victim_fingerprint = match self.slots.entry(victim_idx) {
            Some(entry) => entry.fingerprint,
            None => {
                // Victim slot vanished between peek and use; admit.
                if self.main.add(&mut self.slots, candidate).is_some() {
                    metrics.record_eviction();
                }
                return;
            }
        };

        let candidate_freq = self.sketch.estimate(candidate.fingerprint);
        let victim_freq = self.sketch.estimate(victim_fingerprint);
        if victim_freq >= candidate_freq {
            metrics.record_rejection();
            metrics.record_eviction();
            return;
        }

        // Candidate wins: adding at full occupancy recycles the probation
        // LRU slot, which is exactly the victim we just compared against.
        if self.main.add(&mut self.slots, candidate).is_some() {
            metrics.record_eviction();
        }
    }

    // -----------------------------------------------------------------------
    // Get
    // -----------------------------------------------------------------------

    fn get(&mut self, fingerprint: u64, conflict: u64) -> Option<Arc<V>> {
        self.ops += 1;
        if self.ops >= self.reset_interval {
            self.sketch.reset();
            self.doorkeeper.clear();
            self.ops = 0;
        }

        let Some(idx) = self.slots.lookup(fingerprint) else {
            self.doorkeeper.allow(fingerprint);
            self.sketch.increment(fingerprint);
            return None;
        };

        // A conflict-hash mismatch means a different original key collided
        // on the fingerprint: report a miss, never the resident's value.
        let (value, tier) = match self.slots.entry(idx) {
            Some(entry) if entry.conflict == conflict => (Arc::clone(&entry.value), entry.tier),
            _ => {
                self.doorkeeper.allow(fingerprint);
                self.sketch.increment(fingerprint);
                return None;
            }
        };

        self.doorkeeper.allow(fingerprint);
        self.sketch.increment(fingerprint);

        match tier {
            Tier::Window => self.window.touch(&mut self.slots, idx),
            Tier::Probation | Tier::Protected => self.main.touch(&mut self.slots, idx),
        }
        Some(value)
    }

    // -----------------------------------------------------------------------
    // Del
    // -----------------------------------------------------------------------

    fn del(&mut self, fingerprint: u64, conflict: u64) -> Option<u64> {
        let idx = self.slots.lookup(fingerprint)?;
        let (entry_conflict, tier) = {
            let entry = self.slots.entry(idx)?;
            (entry.conflict, entry.tier)
        };
        // A caller-supplied non-zero conflict hash must match; zero means
        // "no collision check" (integer keys).
        if conflict != 0 && conflict != entry_conflict {
            return None;
        }
        let removed = match tier {
            Tier::Window => self.window.remove(&mut self.slots, idx),
            Tier::Probation | Tier::Protected => self.main.remove(&mut self.slots, idx),
        }?;
        Some(removed.conflict)
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    fn render(&self) -> String
    where
        V: fmt::Debug,
    {
        let mut out = String::new();
        out.push_str("window: ");
        self.render_list(self.window.head(), self.window.tail(), &mut out);
        out.push_str(" | protected: ");
        self.render_list(self.main.protected_head(), self.main.protected_tail(), &mut out);
        out.push_str(" | probation: ");
        self.render_list(self.main.probation_head(), self.main.probation_tail(), &mut out);
        out
    }

    fn render_list(&self, head: usize, tail: usize, out: &mut String)
    where
        V: fmt::Debug,
    {
        out.push('[');
        let mut idx = self.slots.next_of(head);
        let mut first = true;
        while idx != tail {
            if let Some(entry) = self.slots.entry(idx) {
                if !first {
                    out.push_str(", ");
                }
                let _ = write!(out, "{:?}", entry.value);
                first = false;
            }
            idx = self.slots.next_of(idx);
        }
        out.push(']');
    }

    #[cfg(test)]
    fn assert_invariants(&self) {
        let window = self.count_list(self.window.head(), self.window.tail(), Tier::Window);
        let probation = self.count_list(
            self.main.probation_head(),
            self.main.probation_tail(),
            Tier::Probation,
        );
        let protected = self.count_list(
            self.main.protected_head(),
            self.main.protected_tail(),
            Tier::Protected,
        );
        assert_eq!(window, self.window.len(), "window length drift");
        assert_eq!(probation, self.main.probation_len(), "probation length drift");
        assert_eq!(protected, self.main.protected_len(), "protected length drift");
        assert_eq!(
            window + probation + protected,
            self.slots.len(),
            "index and lists disagree on live entry count"
        );
        let (window_cap, probation_cap, protected_cap) = split_capacity(self.capacity);
        assert!(window <= window_cap, "window over budget");
        assert!(protected <= protected_cap, "protected over budget");
        assert!(
            probation + protected <= probation_cap + protected_cap,
            "main cache over combined budget"
        );
    }

    #[cfg(test)]
    fn count_list(&self, head: usize, tail: usize, tier: Tier) -> usize {
        let mut count = 0;
        let mut idx = self.slots.next_of(head);
        while idx != tail {
            let entry = self
                .slots
                .entry(idx)
                .unwrap_or_else(|| panic!("linked node {idx} holds no entry"));
            assert_eq!(entry.tier, tier, "entry tagged with the wrong tier");
            assert_eq!(
                self.slots.lookup(entry.fingerprint),
                Some(idx),
                "index does not point back at the list node"
            );
            count += 1;
            idx = self.slots.next_of(idx);
        }
        count
    }
}

// ---------------------------------------------------------------------------
// Cache handle
// ---------------------------------------------------------------------------

struct CacheInner<V> {
    state: Mutex<State<V>>,
    /// Hasher for byte-key fingerprints; lives outside the lock so hashing
    /// never extends the critical section.
    build_hasher: RandomState,
    metrics: StatsCounter,
}

/// A fixed-capacity in-memory cache with W-TinyLFU admission.
///
/// New entries pass through a small recency window; on window overflow the
/// evicted candidate must get past a doorkeeper filter and out-score the
/// main cache's probation victim on estimated access frequency before it is
/// granted residency.  Keys may be fixed-width integers or byte sequences
/// (see [`CacheKey`]); values are handed out as `Arc<V>`.
///
/// The handle is cheap to clone and shares one cache.
///
/// # Example
/// ```
/// let cache: lungo::Cache<String> = lungo::Cache::new(100).unwrap();
/// cache.set("answer", "42".to_string());
/// assert_eq!(cache.get("answer").as_deref(), Some(&"42".to_string()));
/// ```
pub struct Cache<V> {
    inner: Arc<CacheInner<V>>,
}

impl<V> Clone for Cache<V> {
    fn clone(&self) -> Self {
        Cache {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> Cache<V> {
    /// Creates a cache with the given capacity and default configuration.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        CacheBuilder::new(capacity).build()
    }

    /// Returns a [`CacheBuilder`] for custom configuration.
    pub fn builder(capacity: usize) -> CacheBuilder {
        CacheBuilder::new(capacity)
    }

    /// Called by the builder after validation.
    pub(crate) fn with_config(capacity: usize, reset_interval: u64) -> Self {
        Cache {
            inner: Arc::new(CacheInner {
                state: Mutex::new(State::new(capacity, reset_interval)),
                build_hasher: RandomState::new(),
                metrics: StatsCounter::new(),
            }),
        }
    }

    #[inline]
    fn hashes<K: CacheKey + ?Sized>(&self, key: &K) -> (u64, u64) {
        key.key_ref().fingerprints(&self.inner.build_hasher)
    }

    // -----------------------------------------------------------------------
    // Public operations
    // -----------------------------------------------------------------------

    /// Inserts or overwrites the entry for `key`.
    ///
    /// Always returns `true` once the window insertion completes — the
    /// return value signals acceptance of the operation, not retention:
    /// the admission policy may drop the entry as soon as it leaves the
    /// window.
    pub fn set<K: CacheKey + ?Sized>(&self, key: &K, value: V) -> bool {
        let (fingerprint, conflict) = self.hashes(key);
        self.set_hashed(fingerprint, conflict, value)
    }

    /// Returns the value for `key`, if resident.
    ///
    /// A hit refreshes the entry's recency and may promote it
    /// (window → stays windowed, probation → protected); both hits and
    /// misses feed the admission filter and the frequency sketch.
    pub fn get<K: CacheKey + ?Sized>(&self, key: &K) -> Option<Arc<V>> {
        let (fingerprint, conflict) = self.hashes(key);
        self.get_hashed(fingerprint, conflict)
    }

    /// Removes the entry for `key`.
    ///
    /// Returns the removed entry's conflict hash, or `None` if the key was
    /// not resident (or its conflict hash did not match).
    pub fn del<K: CacheKey + ?Sized>(&self, key: &K) -> Option<u64> {
        let (fingerprint, conflict) = self.hashes(key);
        self.del_hashed(fingerprint, conflict)
    }

    // Pre-hashed entry points.  These mirror the public operations and let
    // tests exercise fingerprint collisions directly.

    pub(crate) fn set_hashed(&self, fingerprint: u64, conflict: u64, value: V) -> bool {
        self.inner
            .state
            .lock()
            .set(fingerprint, conflict, value, &self.inner.metrics)
    }

    pub(crate) fn get_hashed(&self, fingerprint: u64, conflict: u64) -> Option<Arc<V>> {
        let hit = self.inner.state.lock().get(fingerprint, conflict);
        match hit {
            Some(value) => {
                self.inner.metrics.record_hit();
                Some(value)
            }
            None => {
                self.inner.metrics.record_miss();
                None
            }
        }
    }

    pub(crate) fn del_hashed(&self, fingerprint: u64, conflict: u64) -> Option<u64> {
        self.inner.state.lock().del(fingerprint, conflict)
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// Number of live entries across all tiers.
    pub fn len(&self) -> usize {
        self.inner.state.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configured total capacity.
    pub fn capacity(&self) -> usize {
        self.inner.state.lock().capacity
    }

    /// Live entry counts per tier: `(window, probation, protected)`.
    ///
    /// Diagnostic surface, alongside [`dump`](Cache::dump); not a stability
    /// contract.
    pub fn tier_lengths(&self) -> (usize, usize, usize) {
        let state = self.inner.state.lock();
        (
            state.window.len(),
            state.main.probation_len(),
            state.main.protected_len(),
        )
    }

    /// Hit/miss/eviction counters since construction.
    pub fn stats(&self) -> Metrics {
        self.inner.metrics.snapshot()
    }

    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        self.inner.state.lock().assert_invariants();
    }
}

impl<V: fmt::Debug> Cache<V> {
    /// Renders the current tier contents, each most-recent first:
    /// `window: [..] | protected: [..] | probation: [..]`.
    ///
    /// Debugging aid only; the format is not a stability contract.
    pub fn dump(&self) -> String {
        self.inner.state.lock().render()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CacheBuilder;

    #[test]
    fn capacity_split_matches_the_documented_table() {
        assert_eq!(split_capacity(100), (1, 19, 80));
        assert_eq!(split_capacity(1000), (10, 198, 792));
        // Floors clamp to one slot each.
        assert_eq!(split_capacity(1), (1, 1, 1));
        assert_eq!(split_capacity(2), (1, 1, 1));
        assert_eq!(split_capacity(10), (1, 1, 8));
    }

    // -- collision guard ----------------------------------------------------

    #[test]
    fn colliding_fingerprint_with_different_conflict_is_a_miss() {
        let cache: Cache<&str> = Cache::new(16).unwrap();
        cache.set_hashed(7, 111, "resident");
        assert!(cache.get_hashed(7, 222).is_none(), "collision must not leak the resident");
        assert_eq!(cache.get_hashed(7, 111).as_deref(), Some(&"resident"));
    }

    #[test]
    fn del_with_mismatched_conflict_leaves_entry_alone() {
        let cache: Cache<&str> = Cache::new(16).unwrap();
        cache.set_hashed(7, 111, "resident");
        assert_eq!(cache.del_hashed(7, 222), None);
        assert_eq!(cache.get_hashed(7, 111).as_deref(), Some(&"resident"));
    }

    #[test]
    fn del_with_zero_conflict_skips_the_guard() {
        let cache: Cache<&str> = Cache::new(16).unwrap();
        cache.set_hashed(7, 111, "resident");
        assert_eq!(cache.del_hashed(7, 0), Some(111));
        assert!(cache.get_hashed(7, 111).is_none());
    }

    #[test]
    fn del_returns_the_conflict_marker() {
        let cache: Cache<u64> = Cache::new(16).unwrap();
        cache.set_hashed(1, 42, 10);
        assert_eq!(cache.del_hashed(1, 42), Some(42));
    }

    // -- periodic reset -----------------------------------------------------

    #[test]
    fn reads_trigger_decay_at_the_configured_interval() {
        let cache: Cache<u64> = CacheBuilder::new(64).reset_interval(10).build().unwrap();
        cache.set(&1u64, 1);
        for _ in 0..9 {
            cache.get(&1u64);
        }
        let before = cache.inner.state.lock().sketch.estimate(1);
        assert_eq!(before, 9);

        // The 10th read fires the decay pass before its own increment.
        cache.get(&1u64);
        let state = cache.inner.state.lock();
        assert_eq!(state.ops, 0, "op counter must restart after decay");
        let after = state.sketch.estimate(1);
        assert!(after <= before / 2 + 1, "estimate {after} not decayed from {before}");
        assert!(after >= 1, "the triggering read still counts");
    }

    #[test]
    fn decay_clears_doorkeeper_marks() {
        let cache: Cache<u64> = CacheBuilder::new(64).reset_interval(10).build().unwrap();
        // Mark fingerprint 1, then burn reads on other keys to cross the
        // interval.
        cache.get(&1u64);
        for k in 2u64..10 {
            cache.get(&k);
        }
        assert!(cache.inner.state.lock().doorkeeper.contains(1));

        cache.get(&99u64); // 10th read: clear, then re-mark 99
        let state = cache.inner.state.lock();
        assert!(!state.doorkeeper.contains(1), "old marks must be gone");
        assert!(state.doorkeeper.contains(99), "the triggering read re-marks");
    }

    // -- overwrite ----------------------------------------------------------

    #[test]
    fn overwrite_keeps_a_single_index_entry() {
        let cache: Cache<&str> = Cache::new(100).unwrap();
        cache.set(&5u64, "v1");
        cache.set(&5u64, "v2");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&5u64).as_deref(), Some(&"v2"));
        cache.assert_invariants();
    }

    #[test]
    fn overwrite_refreshes_without_promoting() {
        let cache: Cache<u64> = Cache::new(100).unwrap();
        // Push key 1 through the one-slot window into probation.
        cache.set(&1u64, 1);
        cache.set(&2u64, 2);
        assert_eq!(cache.tier_lengths(), (1, 1, 0));

        // Overwriting must bump recency in place, not promote.
        cache.set(&1u64, 10);
        assert_eq!(cache.tier_lengths(), (1, 1, 0));

        // A read does promote.
        cache.get(&1u64);
        assert_eq!(cache.tier_lengths(), (1, 0, 1));
        cache.assert_invariants();
    }

    // -- invariants under random workloads ---------------------------------

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn random_operations_preserve_structural_invariants(
            ops in proptest::collection::vec((0u8..3, 0u64..48), 1..300),
        ) {
            let cache: Cache<u64> = Cache::new(16).unwrap();
            for (op, key) in ops {
                match op {
                    0 => {
                        cache.set(&key, key);
                    }
                    1 => {
                        cache.get(&key);
                    }
                    _ => {
                        cache.del(&key);
                    }
                }
                cache.assert_invariants();
            }
        }
    }
}
