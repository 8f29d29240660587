//! Domain types shared by the cache, the fetch chain, the generator and the merger.
//!
//! Everything here is plain data: serde for the wire/JSON shape (camelCase to
//! match the artifact schema consumers already parse) and schemars where the
//! type doubles as a structured-output schema for the generative step.

pub mod catalog;
pub mod generated;
pub mod ground_truth;
pub mod provenance;
pub mod requirements;
pub mod status;

pub use catalog::{VisaTypeCatalog, VisaTypeInfo};
pub use generated::{GeneratedCatalog, GeneratedRequirements, SchemaViolation};
pub use ground_truth::{GroundTruthContext, SourceLabel};
pub use provenance::{Provenance, VERIFY_THRESHOLD};
pub use requirements::{EnhancedRequirementSet, Fees, GeneralInfo, OfficialSource, Requirement};
pub use status::{OfficialVisaStatus, StatusCategory};
