//! Upstream clients and request orchestration for visarag.
//!
//! This crate provides the ground-truth fetch chain, the generative client,
//! the rate-limited scheduler, and the [`VisaService`] that ties them to the
//! caches defined in `visarag-core`.

pub mod generate;
pub mod ground_truth;
pub mod optimizer;
pub mod scheduler;
pub mod service;
pub mod single_flight;

pub use generate::{ChatCompletionsClient, EnhancementClient, GenerationError, GenerationPolicy, TextGenerator};
pub use ground_truth::{ChainLink, FetchChain, GroundTruthSource, SourceError, SourceHit};
pub use optimizer::{BackgroundOptimizer, MaintenanceTargets, OptimizationReport, OptimizerHandle};
pub use scheduler::{RateBudget, Scheduler, SchedulerError, SchedulerStats};
pub use service::{
    CachedArtifact, CachedEntry, Origin, RequestOptions, Resolved, ServiceStats, VisaService, VisaServiceBuilder,
};
