// src/extractors/mod.rs
pub mod fingerprint;
pub mod model;
pub mod money;
pub mod orchestrator;
pub mod product_line;
pub mod validator;
pub mod xml;

// Re-export key extraction types for convenience
pub use fingerprint::fingerprint;
pub use model::{
    ExtractionResult, ExtractionWarning, FieldKey, FieldValue, MaterialFingerprint, Money,
    SectionName, SectionRecord, ValidationReport,
};
pub use money::{MonetaryAnomaly, MonetaryNormalizer};
pub use orchestrator::{ExtractionOrchestrator, PipelineStage, ValidationFailure};
pub use product_line::ProductLineTable;
pub use validator::SectionValidator;
pub use xml::XmlExtractor;
