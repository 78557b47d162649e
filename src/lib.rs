//! Fixed-capacity in-memory cache with W-TinyLFU admission.
//!
//! Fresh inserts land in a small recency window.  When the window overflows,
//! its LRU entry becomes a candidate for the segmented main cache and must
//! pass a two-stage gate: a doorkeeper filter that rejects keys seen only
//! once, then a count-min frequency comparison against the probation
//! victim.  This keeps one-hit-wonders out of the main cache while entries
//! with sustained popularity graduate from probation into the protected
//! segment.

mod builder;
mod cache;
mod error;
mod key;
mod metrics;
mod policy;

pub use builder::CacheBuilder;
pub use cache::Cache;
pub use error::ConfigError;
pub use key::{CacheKey, KeyRef};
pub use metrics::stats::Metrics;
