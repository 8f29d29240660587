//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and maintaining the in-memory caches.

pub mod get;
pub mod optimize;
pub mod purge;
pub mod stats;

pub use get::{CacheGetParams, get_impl};
pub use optimize::optimize_impl;
pub use purge::{CachePurgeParams, purge_impl};
pub use stats::stats_impl;
