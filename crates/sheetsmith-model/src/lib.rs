//! Sheetsmith Model - shared data types
//!
//! Types exchanged between the profiling stage, the generation providers, the
//! output validator and the orchestrator:
//! - [`Profile`] and its sheets, columns, formulas and domain tag
//! - [`GenerationRequest`] with per-stage [`ModelSelection`]
//! - [`GeneratedCode`] candidates and their [`DependencyManifest`]

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod code;
pub mod error;
pub mod manifest;
pub mod profile;
pub mod request;

pub use code::GeneratedCode;
pub use error::ProfileError;
pub use manifest::{normalize_name, DependencyManifest, ManifestDiff};
pub use profile::{
    ColumnDescriptor, ColumnType, DomainAssessment, DomainTag, FormulaCategory, FormulaRef,
    Profile, ProfileMetrics, SheetProfile,
};
pub use request::{
    GenerationRequest, ModelSelection, RequestId, StageModels, DEFAULT_INSTRUCTIONS,
};
