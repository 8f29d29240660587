//! In-memory, TTL-tiered cache for visa artifacts.
//!
//! - Normalized keys (`domain:country:visa_type:nationality`)
//! - One bounded store per artifact type, each with its own TTL table
//! - Lazy expiry on read plus an explicit sweep for the optimizer
//! - Provenance recorded per entry; confidence derived from it

pub mod entry;
pub mod key;
pub mod store;
pub mod ttl;

pub use entry::CacheEntry;
pub use key::{CacheKey, Domain, normalize_component};
pub use store::{CacheMaintenance, CacheStats, CacheStore, LowConfidenceEntry, Lookup};
pub use ttl::TtlPolicy;
