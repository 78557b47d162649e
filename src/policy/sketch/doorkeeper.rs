//! The admission filter ("doorkeeper"): a probabilistic seen-before test.

/// A Bloom filter gating first-touch admissions.
///
/// A key observed exactly once carries no evidence of popularity, so when the
/// window evicts a candidate whose fingerprint has never been marked here,
/// the candidate is dropped without consulting the frequency sketch at all.
/// Only on a second sighting does the candidate compete with the probation
/// victim on estimated frequency.
///
/// [`allow`] is also called on every read — hit or miss — purely for its
/// marking side effect, so the filter reflects *lookups*, not just inserts.
/// [`clear`] is invoked on the same cadence as the frequency sketch's decay
/// so "seen" marks describe recent history rather than all-time history.
///
/// Backed by a bit vector of `u64` words with four derived bit positions per
/// fingerprint.  Sizing targets the configured false-positive rate at
/// `expected` distinct keys; false negatives cannot occur between clears.
///
/// [`allow`]: Doorkeeper::allow
/// [`clear`]: Doorkeeper::clear
pub(crate) struct Doorkeeper {
    bits: Vec<u64>,
    /// Total bit count; always a power of two.
    mask: usize,
}

/// One multiplicative seed per derived bit position.
const SEEDS: [u64; 4] = [
    0x8A91_3D4B_77C5_3F19,
    0x6C62_272E_07BB_0142,
    0xD6E8_FEB8_6659_FD93,
    0xA0B4_2C8D_5E17_3F6B,
];

impl Doorkeeper {
    /// Creates a doorkeeper sized for `expected` distinct fingerprints at the
    /// given target false-positive rate (the cache uses 1 %).
    ///
    /// Standard Bloom sizing, `m = -n·ln(p) / ln(2)²`, rounded up to a power
    /// of two with a 64-bit floor so the mask arithmetic stays trivial.
    pub(crate) fn new(expected: usize, fp_rate: f64) -> Self {
        let n = expected.max(1) as f64;
        let ln2 = std::f64::consts::LN_2;
        let bits = (-(n * fp_rate.ln()) / (ln2 * ln2)).ceil() as usize;
        let num_bits = bits.next_power_of_two().max(64);
        Doorkeeper {
            bits: vec![0u64; num_bits / 64],
            mask: num_bits - 1,
        }
    }

    /// Returns `true` if `fingerprint` is (probably) already marked.
    #[inline]
    pub(crate) fn contains(&self, fingerprint: u64) -> bool {
        SEEDS.iter().all(|&seed| {
            let bit = self.bit_index(fingerprint, seed);
            (self.bits[bit >> 6] >> (bit & 63)) & 1 == 1
        })
    }

    /// The doorkeeper test: reports whether `fingerprint` was seen before,
    /// and marks it as seen either way.
    ///
    /// The first call for a fingerprint returns `false`; every later call
    /// before the next [`clear`] returns `true`.
    ///
    /// [`clear`]: Doorkeeper::clear
    #[inline]
    pub(crate) fn allow(&mut self, fingerprint: u64) -> bool {
        let seen = self.contains(fingerprint);
        if !seen {
            for &seed in &SEEDS {
                let bit = self.bit_index(fingerprint, seed);
                self.bits[bit >> 6] |= 1u64 << (bit & 63);
            }
        }
        seen
    }

    /// Drops every mark.  Called together with the sketch's decay.
    pub(crate) fn clear(&mut self) {
        self.bits.fill(0);
    }

    #[inline]
    fn bit_index(&self, fingerprint: u64, seed: u64) -> usize {
        (fingerprint.wrapping_mul(seed) >> 32) as usize & self.mask
    }
}
