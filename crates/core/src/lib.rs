//! Core types and shared functionality for visarag.
//!
//! This crate provides:
//! - Domain model (status, requirements, catalog, provenance)
//! - Normalized cache keys and the TTL-tiered in-memory store
//! - The ground-truth/generated merger and static fallbacks
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod fallback;
pub mod merge;
pub mod model;
pub mod query;

pub use cache::{CacheEntry, CacheKey, CacheStore, Lookup, TtlPolicy};
pub use config::AppConfig;
pub use error::Error;
pub use query::{StatusQuery, VisaQuery};
