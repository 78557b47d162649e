//! Approximate per-fingerprint access counting (count-min sketch).

/// 4-bit count-min sketch over nibble-packed `u64` words.
///
/// Each word in `table` holds sixteen saturating 4-bit counters, so counter
/// values live in `[0, 15]`.  For each fingerprint, four independent
/// `(word, nibble)` slots are derived — one per depth — and:
///
/// - [`increment`] adds one to all four counters (saturating),
/// - [`estimate`] returns their minimum (the count-min estimator),
/// - [`reset`] halves every counter in the table.
///
/// The sketch never decays on its own.  The cache facade counts read
/// operations and calls `reset` once per configured interval, clearing the
/// doorkeeper in the same breath so "seen before" information does not
/// outlive the halved counters.
///
/// [`increment`]: FrequencySketch::increment
/// [`estimate`]: FrequencySketch::estimate
/// [`reset`]: FrequencySketch::reset
pub(crate) struct FrequencySketch {
    table: Vec<u64>,
    /// `table.len()`, always a power of two.
    size: usize,
}

/// One multiplicative mixing seed per depth.
const SEEDS: [u64; 4] = [
    0xC3A5_C85C_97CB_3127,
    0xB492_B66F_BE98_F273,
    0x9AE1_6A3B_2F90_404F,
    0xCBF2_9CE4_8422_2325,
];

/// Zeroes the low bit of every nibble before a right-shift so no bit bleeds
/// into the neighbouring counter during `reset`.
const HALVE_MASK: u64 = 0x7777_7777_7777_7777;

impl FrequencySketch {
    /// Creates a sketch sized for roughly `capacity` distinct fingerprints.
    pub(crate) fn new(capacity: usize) -> Self {
        let size = capacity.next_power_of_two().max(8);
        FrequencySketch {
            table: vec![0u64; size],
            size,
        }
    }

    /// Estimated access count for `fingerprint`, in `[0, 15]`.
    #[inline]
    pub(crate) fn estimate(&self, fingerprint: u64) -> u8 {
        let mut freq = 0x0Fu8;
        for depth in 0..4 {
            let (word, shift) = self.slot(fingerprint, depth);
            freq = freq.min(((self.table[word] >> shift) & 0xF) as u8);
        }
        freq
    }

    /// Adds one to the four counters for `fingerprint`, saturating at 15.
    #[inline]
    pub(crate) fn increment(&mut self, fingerprint: u64) {
        for depth in 0..4 {
            let (word, shift) = self.slot(fingerprint, depth);
            if (self.table[word] >> shift) & 0xF < 15 {
                self.table[word] += 1u64 << shift;
            }
        }
    }

    /// Halves every counter, preserving relative ordering while forgetting
    /// old history.
    pub(crate) fn reset(&mut self) {
        for word in &mut self.table {
            *word = (*word >> 1) & HALVE_MASK;
        }
    }

    /// Returns `(word_index, nibble_bit_shift)` for `fingerprint` at `depth`.
    ///
    /// The word index comes from the high 32 bits of the seed-mixed hash and
    /// bits `[28..32)` pick one of the sixteen nibbles, giving a bit shift in
    /// `{0, 4, …, 60}`.
    #[inline]
    fn slot(&self, fingerprint: u64, depth: usize) -> (usize, usize) {
        let mixed = fingerprint.wrapping_mul(SEEDS[depth]);
        let word = ((mixed >> 32) as usize) & (self.size - 1);
        let shift = ((mixed >> 28) as usize & 0xF) << 2;
        (word, shift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_fingerprint_estimates_zero() {
        let sketch = FrequencySketch::new(64);
        assert_eq!(sketch.estimate(0xBAD_F00D), 0);
    }

    #[test]
    fn increments_accumulate() {
        let mut sketch = FrequencySketch::new(64);
        for _ in 0..6 {
            sketch.increment(17);
        }
        assert_eq!(sketch.estimate(17), 6);
    }

    #[test]
    fn counters_saturate_at_fifteen() {
        let mut sketch = FrequencySketch::new(64);
        for _ in 0..40 {
            sketch.increment(3);
        }
        assert_eq!(sketch.estimate(3), 15);
    }

    #[test]
    fn estimate_never_underestimates() {
        let mut sketch = FrequencySketch::new(128);
        for _ in 0..5 {
            sketch.increment(1);
        }
        for _ in 0..3 {
            sketch.increment(2);
        }
        assert!(sketch.estimate(1) >= 5);
        assert!(sketch.estimate(2) >= 3);
    }

    #[test]
    fn reset_halves_counters() {
        let mut sketch = FrequencySketch::new(32);
        for _ in 0..10 {
            sketch.increment(7);
        }
        let before = sketch.estimate(7);
        sketch.reset();
        let after = sketch.estimate(7);
        assert!(after <= before / 2 + 1, "after={after} before={before}");
        assert!(after > 0, "a hot counter should survive one halving");
    }

    #[test]
    fn reset_preserves_relative_order() {
        let mut sketch = FrequencySketch::new(64);
        for _ in 0..12 {
            sketch.increment(100);
        }
        for _ in 0..4 {
            sketch.increment(200);
        }
        sketch.reset();
        assert!(sketch.estimate(100) > sketch.estimate(200));
    }
}
