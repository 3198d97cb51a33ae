// src/extractors/xml.rs

// --- Imports ---
use crate::extractors::model::{
    ExtractionResult, ExtractionWarning, FieldKey, FieldValue, Money, SectionName, SectionRecord,
    SectionSchema,
};
use crate::extractors::money::{self, MonetaryNormalizer};
use crate::extractors::product_line::{FieldMap, ProductLineTable};
use crate::extractors::validator::{
    attribute_ignore_case, is_item, parse_document, DocumentSurvey, SectionBlock, SectionValidator,
};
use crate::utils::error::ExtractError;
use bigdecimal::BigDecimal;
use roxmltree::{Document, Node};
use std::collections::{BTreeMap, BTreeSet};

// --- Main Extractor Structure ---

/// Turns surveyed section blocks into [`SectionRecord`]s.
pub struct XmlExtractor<'c> {
    table: &'c ProductLineTable,
    normalizer: &'c MonetaryNormalizer,
}

impl<'c> XmlExtractor<'c> {
    pub fn new(table: &'c ProductLineTable, normalizer: &'c MonetaryNormalizer) -> Self {
        Self { table, normalizer }
    }

    /// Parses and extracts in one go. `sections: None` extracts everything present.
    pub fn extract(
        &self,
        document: &str,
        sections: Option<&BTreeSet<SectionName>>,
    ) -> Result<ExtractionResult, ExtractError> {
        let doc = parse_document(document)?;
        let survey = SectionValidator::new(self.table).survey(&doc);
        Ok(self.extract_surveyed(&doc, &survey, sections))
    }

    /// Extracts the requested sections of an already surveyed document.
    /// Never fails: problems inside a section become warnings.
    pub fn extract_surveyed(
        &self,
        doc: &Document,
        survey: &DocumentSurvey,
        sections: Option<&BTreeSet<SectionName>>,
    ) -> ExtractionResult {
        let mut warnings = Vec::new();

        let line = survey.product_line.as_deref().and_then(|id| self.table.line(id));
        let fields = match line {
            Some(line) => {
                tracing::debug!("Using field map of line '{}' ({})", line.id, line.nome);
                &line.fields
            }
            None => {
                tracing::warn!("Product line not recognised, falling back to generic field map");
                warnings.push(ExtractionWarning::UnknownProductLine);
                self.table.generic_fields()
            }
        };

        if survey.unclassified_items > 0 {
            warnings.push(ExtractionWarning::UnclassifiedItems { count: survey.unclassified_items });
        }

        let mut extracted = BTreeMap::new();
        for (section, blocks) in &survey.blocks {
            if sections.is_some_and(|wanted| !wanted.contains(section)) {
                continue;
            }
            let accessor = SectionAccessor::new(*section, fields, self.normalizer);
            let records = accessor.read_blocks(doc, blocks, &mut warnings);
            tracing::info!("Extracted {} record(s) for {}", records.len(), section);
            if !records.is_empty() {
                extracted.insert(*section, records);
            }
        }

        if extracted.is_empty() {
            let requested = match sections {
                Some(wanted) => wanted.iter().copied().collect(),
                None => survey.blocks.keys().copied().collect(),
            };
            warnings.push(ExtractionWarning::NoExtractableContent { requested });
        }

        let valor_total = sum_line_totals(&extracted);
        ExtractionResult {
            linha_detectada: line.map(|l| l.id.clone()),
            nome_ambiente: survey.nome_ambiente.clone(),
            valor_total_formatado: money::format_brl(&valor_total),
            valor_total: Money(valor_total),
            sections: extracted,
            fingerprint: None,
            low_confidence: line.is_none(),
            warnings,
        }
    }
}

/// Sum of every record's line total; the document's own totals are ignored.
pub fn sum_line_totals(sections: &BTreeMap<SectionName, Vec<SectionRecord>>) -> BigDecimal {
    let mut total = BigDecimal::from(0);
    for record in sections.values().flatten() {
        if let Some(amount) = record.line_total() {
            total += amount;
        }
    }
    total
}

// --- Typed Section Access ---

/// Reads the fields of one section's schema from its item elements.
struct SectionAccessor<'a> {
    section: SectionName,
    schema: &'static SectionSchema,
    fields: &'a FieldMap,
    normalizer: &'a MonetaryNormalizer,
}

impl<'a> SectionAccessor<'a> {
    fn new(section: SectionName, fields: &'a FieldMap, normalizer: &'a MonetaryNormalizer) -> Self {
        Self { section, schema: section.schema(), fields, normalizer }
    }

    fn read_blocks(
        &self,
        doc: &Document,
        blocks: &[SectionBlock],
        warnings: &mut Vec<ExtractionWarning>,
    ) -> Vec<SectionRecord> {
        let mut records = Vec::new();
        let mut posicao = 0;

        for block in blocks {
            if block.items.is_empty() {
                self.warn(warnings, format!("block '{}' has no items", block.label));
                continue;
            }
            for id in &block.items {
                let Some(item) = doc.get_node(*id) else { continue };
                match self.read_record(item, posicao) {
                    Ok((record, anomalies)) => {
                        records.push(record);
                        warnings.extend(anomalies);
                    }
                    Err(missing) => {
                        let names: Vec<&str> = missing.iter().map(|k| k.as_str()).collect();
                        self.warn(
                            warnings,
                            format!(
                                "item {} in block '{}' skipped, missing {}",
                                posicao,
                                block.label,
                                names.join(", ")
                            ),
                        );
                    }
                }
                posicao += 1;
            }
        }
        records
    }

    /// The record for `item`, or the required fields it lacks.
    fn read_record(
        &self,
        item: Node,
        posicao: usize,
    ) -> Result<(SectionRecord, Vec<ExtractionWarning>), Vec<FieldKey>> {
        let mut fields = BTreeMap::new();
        let mut missing = Vec::new();
        let mut anomalies = Vec::new();

        for key in self.schema.fields() {
            let raw = lookup(item, self.fields.candidates(key));
            let value = match raw {
                Some(raw) if key.is_monetary() => {
                    let parsed = self.normalizer.inspect(raw.as_str());
                    if let Some(anomaly) = parsed.anomaly {
                        tracing::warn!("{} item {}: {} '{}' zeroed ({})", self.section, posicao, key, raw, anomaly);
                        anomalies.push(ExtractionWarning::MonetaryAnomaly {
                            section: self.section,
                            posicao,
                            field: key,
                            raw,
                            anomaly,
                        });
                    }
                    Some(FieldValue::Money(Money(parsed.value)))
                }
                Some(raw) if !raw.is_empty() => Some(FieldValue::Text(raw)),
                _ => None,
            };

            match value {
                Some(value) => {
                    fields.insert(key, value);
                }
                None if self.schema.is_required(key) => missing.push(key),
                None => {}
            }
        }

        if missing.is_empty() {
            Ok((SectionRecord { posicao, fields }, anomalies))
        } else {
            Err(missing)
        }
    }

    fn warn(&self, warnings: &mut Vec<ExtractionWarning>, message: String) {
        tracing::warn!("{}: {}", self.section, message);
        warnings.push(ExtractionWarning::SectionExtraction { section: self.section, message });
    }
}

/// Looks a field up on an item: its own attributes, then the text of a
/// direct child element, then attributes of direct child elements.
/// Nested component items are never read. The first non-empty value wins;
/// an empty one is returned only as a fallback.
fn lookup(item: Node, candidates: &[String]) -> Option<String> {
    let mut fallback: Option<String> = None;
    let mut consider = |value: &str| -> Option<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            fallback.get_or_insert_with(String::new);
            None
        } else {
            Some(trimmed.to_string())
        }
    };

    for name in candidates {
        if let Some(found) = attribute_ignore_case(item, name).and_then(&mut consider) {
            return Some(found);
        }
    }

    let children: Vec<Node> = item.children().filter(|c| c.is_element() && !is_item(*c)).collect();
    for name in candidates {
        for child in &children {
            if child.tag_name().name().eq_ignore_ascii_case(name) {
                if let Some(found) = consider(child.text().unwrap_or_default()) {
                    return Some(found);
                }
            }
        }
    }
    for name in candidates {
        for child in &children {
            if let Some(found) = attribute_ignore_case(*child, name).and_then(&mut consider) {
                return Some(found);
            }
        }
    }

    fallback
}
