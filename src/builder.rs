use crate::cache::Cache;
use crate::error::ConfigError;

/// Builder for configuring and constructing a [`Cache`].
///
/// # Example
/// ```
/// use lungo::CacheBuilder;
///
/// let cache: lungo::Cache<u64> = CacheBuilder::new(10_000)
///     .reset_interval(50_000)
///     .build()
///     .unwrap();
/// cache.set(&1u64, 100);
/// ```
pub struct CacheBuilder {
    capacity: usize,
    reset_interval: Option<u64>,
}

impl CacheBuilder {
    pub fn new(capacity: usize) -> Self {
        CacheBuilder {
            capacity,
            reset_interval: None,
        }
    }

    /// Number of reads between decay passes (frequency-sketch halving plus
    /// doorkeeper clear).
    ///
    /// Defaults to `10 × capacity`: large enough that a working set builds
    /// real frequency history, small enough that yesterday's hot keys cannot
    /// squat on their counters forever.
    pub fn reset_interval(mut self, reads: u64) -> Self {
        self.reset_interval = Some(reads);
        self
    }

    /// Validates the configuration and constructs the cache.
    pub fn build<V>(self) -> Result<Cache<V>, ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        let reset_interval = self
            .reset_interval
            .unwrap_or(self.capacity as u64 * 10);
        if reset_interval == 0 {
            return Err(ConfigError::ZeroResetInterval);
        }
        Ok(Cache::with_config(self.capacity, reset_interval))
    }
}
