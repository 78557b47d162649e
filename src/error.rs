use thiserror::Error;

/// Error returned by fallible construction ([`CacheBuilder::build`] and
/// [`Cache::new`]).
///
/// Runtime operations never produce errors: admission and eviction outcomes
/// are policy decisions, and a collision-guard mismatch is reported as an
/// ordinary miss.
///
/// [`CacheBuilder::build`]: crate::CacheBuilder::build
/// [`Cache::new`]: crate::Cache::new
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The requested capacity was zero.  Every tier floor clamps to 1, but a
    /// zero total capacity cannot be split at all.
    #[error("capacity must be greater than zero")]
    ZeroCapacity,
    /// The periodic decay interval was zero, which would trigger a sketch
    /// reset on every single read.
    #[error("reset interval must be greater than zero")]
    ZeroResetInterval,
}
