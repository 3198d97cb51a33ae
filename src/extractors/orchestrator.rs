// src/extractors/orchestrator.rs

// --- Imports ---
use crate::config::ExtractionConfig;
use crate::extractors::fingerprint::fingerprint;
use crate::extractors::model::{ExtractionResult, SectionName, ValidationReport};
use crate::extractors::money::MonetaryNormalizer;
use crate::extractors::validator::{parse_document, SectionValidator};
use crate::extractors::xml::XmlExtractor;
use crate::utils::error::ExtractError;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

// --- Data Structures ---

/// Stages of one extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Validated,
    Extracted,
    Fingerprinted,
    Done,
    Rejected,
}

impl PipelineStage {
    pub fn can_advance_to(self, next: PipelineStage) -> bool {
        use PipelineStage::*;
        matches!(
            (self, next),
            (Received, Validated)
                | (Received, Rejected)
                | (Validated, Extracted)
                | (Validated, Rejected)
                | (Extracted, Fingerprinted)
                | (Fingerprinted, Done)
        )
    }
}

/// A document the pipeline refused to extract.
#[derive(Error, Debug, Serialize)]
#[error("{reason}")]
pub struct ValidationFailure {
    #[serde(skip)]
    pub reason: ExtractError,
    #[serde(flatten)]
    pub report: ValidationReport,
}

// --- Orchestrator ---

/// Entry point: validate, extract, fingerprint.
///
/// Holds only read-only configuration. Every [`run`](Self::run) builds its
/// own extraction context, so concurrent runs share no mutable state.
#[derive(Debug, Clone)]
pub struct ExtractionOrchestrator {
    config: Arc<ExtractionConfig>,
}

impl Default for ExtractionOrchestrator {
    fn default() -> Self {
        Self::new(Arc::new(ExtractionConfig::default()))
    }
}

impl ExtractionOrchestrator {
    pub fn new(config: Arc<ExtractionConfig>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn run(
        &self,
        raw_xml: &str,
        sections: Option<&BTreeSet<SectionName>>,
    ) -> Result<ExtractionResult, ValidationFailure> {
        ExtractionContext::new(&self.config).run(raw_xml, sections)
    }

    /// Pre-flight probe without extraction. Applies the same size limit as `run`.
    pub fn validate(&self, raw_xml: &str) -> ValidationReport {
        if let Err(e) = check_size(raw_xml, self.config.max_document_bytes) {
            return ValidationReport::rejected(e.to_string());
        }
        SectionValidator::new(&self.config.product_lines).validate(raw_xml)
    }
}

fn check_size(raw_xml: &str, limit: usize) -> Result<(), ExtractError> {
    if raw_xml.len() > limit {
        return Err(ExtractError::DocumentTooLarge { size: raw_xml.len(), limit });
    }
    Ok(())
}

// --- Per-run Context ---

/// State owned by a single run and dropped with it.
struct ExtractionContext<'c> {
    config: &'c ExtractionConfig,
    normalizer: MonetaryNormalizer,
    stage: PipelineStage,
}

impl<'c> ExtractionContext<'c> {
    fn new(config: &'c ExtractionConfig) -> Self {
        Self {
            config,
            normalizer: config.normalizer(),
            stage: PipelineStage::Received,
        }
    }

    fn advance(&mut self, next: PipelineStage) {
        debug_assert!(self.stage.can_advance_to(next), "{:?} -> {:?}", self.stage, next);
        tracing::trace!("Extraction stage {:?} -> {:?}", self.stage, next);
        self.stage = next;
    }

    fn reject(&mut self, reason: ExtractError, mut report: ValidationReport) -> ValidationFailure {
        self.advance(PipelineStage::Rejected);
        tracing::warn!("Document rejected: {}", reason);
        report.valid = false;
        if report.errors.is_empty() {
            report.errors.push(reason.to_string());
        }
        ValidationFailure { reason, report }
    }

    fn run(
        mut self,
        raw_xml: &str,
        sections: Option<&BTreeSet<SectionName>>,
    ) -> Result<ExtractionResult, ValidationFailure> {
        tracing::info!("Extraction received ({} bytes)", raw_xml.len());

        if let Err(e) = check_size(raw_xml, self.config.max_document_bytes) {
            let report = ValidationReport::rejected(e.to_string());
            return Err(self.reject(e, report));
        }

        let doc = match parse_document(raw_xml) {
            Ok(doc) => doc,
            Err(e) => {
                let report = ValidationReport::rejected(e.to_string());
                return Err(self.reject(e, report));
            }
        };

        let validator = SectionValidator::new(&self.config.product_lines);
        let survey = validator.survey(&doc);
        let report = validator.report(&survey);
        self.advance(PipelineStage::Validated);

        if !survey.has_material_content() {
            return Err(self.reject(ExtractError::NoMaterialContent, report));
        }

        let extractor = XmlExtractor::new(&self.config.product_lines, &self.normalizer);
        let mut result = extractor.extract_surveyed(&doc, &survey, sections);
        self.advance(PipelineStage::Extracted);

        result.fingerprint = Some(fingerprint(&result));
        self.advance(PipelineStage::Fingerprinted);

        self.advance(PipelineStage::Done);
        tracing::info!(
            "Extraction done: {} record(s) in {} section(s), total {}, {} warning(s)",
            result.total_records(),
            result.sections.len(),
            result.valor_total_formatado,
            result.warnings.len()
        );
        Ok(result)
    }
}
