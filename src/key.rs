//! Key shapes and fingerprinting.
//!
//! Every caller-supplied key is reduced to two fixed-width hashes before it
//! touches the cache:
//!
//! - the **fingerprint** — the fast primary hash used as the shared-index key;
//! - the **conflict hash** — a second, independent hash of the same bytes,
//!   stored alongside the entry so a primary-hash collision between two
//!   distinct keys is detected on lookup instead of returning the wrong value.
//!
//! The set of supported key shapes is a closed enumeration: fixed-width
//! integers and byte sequences.  An integer *is* its own fingerprint (two
//! integers collide only when they are equal, so the conflict hash is 0 and
//! the guard is skipped).  Byte keys are hashed with two different
//! algorithms — `ahash` for the fingerprint and `XxHash64` for the conflict
//! hash — so a collision in one is independent of a collision in the other.
//!
//! Anything that is not an integer or a byte sequence simply does not
//! implement [`CacheKey`] and is rejected at compile time; there is no
//! runtime fallback that could silently coerce a key to the wrong hash.

use std::hash::Hasher;

use ahash::RandomState;
use twox_hash::XxHash64;

/// A borrowed view of a key in one of the supported shapes.
#[derive(Clone, Copy, Debug)]
pub enum KeyRef<'a> {
    /// A fixed-width integer, widened to `u64`.
    Uint(u64),
    /// An arbitrary byte sequence (also covers text keys).
    Bytes(&'a [u8]),
}

impl KeyRef<'_> {
    /// Computes `(fingerprint, conflict)` for this key.
    ///
    /// `hasher` is the cache's own `RandomState`, so fingerprints are stable
    /// for the lifetime of one cache but differ between cache instances.
    pub(crate) fn fingerprints(&self, hasher: &RandomState) -> (u64, u64) {
        match *self {
            KeyRef::Uint(n) => (n, 0),
            KeyRef::Bytes(b) => (hasher.hash_one(b), xxhash64(b)),
        }
    }
}

fn xxhash64(bytes: &[u8]) -> u64 {
    let mut h = XxHash64::with_seed(0);
    h.write(bytes);
    h.finish()
}

/// Conversion from a caller-supplied key to a [`KeyRef`].
///
/// Implemented for the closed set of supported shapes; implementing it for
/// other types is possible but they must resolve to one of the two `KeyRef`
/// variants, so every key still goes through the same dual-hash path.
pub trait CacheKey {
    fn key_ref(&self) -> KeyRef<'_>;
}

macro_rules! impl_uint_key {
    ($($t:ty),*) => {
        $(
            impl CacheKey for $t {
                #[inline]
                fn key_ref(&self) -> KeyRef<'_> {
                    KeyRef::Uint(*self as u64)
                }
            }
        )*
    };
}

impl_uint_key!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl CacheKey for str {
    #[inline]
    fn key_ref(&self) -> KeyRef<'_> {
        KeyRef::Bytes(self.as_bytes())
    }
}

impl CacheKey for String {
    #[inline]
    fn key_ref(&self) -> KeyRef<'_> {
        KeyRef::Bytes(self.as_bytes())
    }
}

impl CacheKey for [u8] {
    #[inline]
    fn key_ref(&self) -> KeyRef<'_> {
        KeyRef::Bytes(self)
    }
}

impl<const N: usize> CacheKey for [u8; N] {
    #[inline]
    fn key_ref(&self) -> KeyRef<'_> {
        KeyRef::Bytes(self)
    }
}

impl CacheKey for Vec<u8> {
    #[inline]
    fn key_ref(&self) -> KeyRef<'_> {
        KeyRef::Bytes(self)
    }
}
