// src/lib.rs
//! Extraction and normalization of Promob-style furniture project exports.
//!
//! [`ExtractionOrchestrator::run`] takes the raw XML and an optional section
//! filter and returns an [`ExtractionResult`] (records per material section,
//! recomputed total, fingerprint, warnings) or a [`ValidationFailure`].
pub mod config;
pub mod extractors;
pub mod source;
pub mod storage;
pub mod utils;

pub use config::ExtractionConfig;
pub use extractors::{
    ExtractionOrchestrator, ExtractionResult, ExtractionWarning, SectionName, ValidationFailure,
    ValidationReport,
};
pub use utils::AppError;
