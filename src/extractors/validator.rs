// src/extractors/validator.rs

// --- Imports ---
use crate::extractors::model::{SectionName, ValidationReport};
use crate::extractors::product_line::ProductLineTable;
use crate::utils::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::{Document, Node, NodeId};
use std::collections::{BTreeMap, BTreeSet, HashMap};

// --- Structural Markers ---
const CATEGORY_TAGS: &[&str] = &["CATEGORY", "CATEGORIA", "GROUP", "GRUPO"];
const ITEM_TAGS: &[&str] = &["ITEM"];
const ENVIRONMENT_TAGS: &[&str] = &["AMBIENT", "AMBIENTE"];
const PROJECT_TAGS: &[&str] = &["PROJECT", "PROJETO"];
const LABEL_ATTRIBUTES: &[&str] = &["DESCRIPTION", "NAME", "DESCRICAO", "NOME"];

// --- Section Label Patterns (Lazy Static) ---
// Checked in order: trim and colored panels must win over the broader
// door and panel patterns.
static SECTION_LABEL_RE: Lazy<Vec<(SectionName, Regex)>> = Lazy::new(|| {
    [
        (SectionName::PortaPerfil, r"(?i)\bportas?[\s_\-]*(?:de[\s_\-]+)?perfil|\bperfil\b"),
        (SectionName::BrilhartColor, r"(?i)\bbrilhart"),
        (SectionName::Portas, r"(?i)\bportas?\b|\bdoors?\b"),
        (SectionName::Ferragens, r"(?i)\bferragens?\b|\bhardware\b"),
        (SectionName::Paineis, r"(?i)\bpain[eé]is\b|\bpainel\b|\bpanels?\b"),
        (SectionName::Caixa, r"(?i)\bcaixas?\b|\bm[oó]dulos?\b|\bcarcass"),
    ]
    .into_iter()
    .map(|(section, pattern)| {
        (section, Regex::new(pattern).expect("Failed to compile SECTION_LABEL_RE"))
    })
    .collect()
});

/// Maps a category label to its section, if any.
pub fn classify_label(label: &str) -> Option<SectionName> {
    SECTION_LABEL_RE
        .iter()
        .find(|(_, re)| re.is_match(label))
        .map(|(section, _)| *section)
}

// --- Data Structures ---

/// One category element classified as a section, with the items it owns.
#[derive(Debug, Clone)]
pub struct SectionBlock {
    pub category: NodeId,
    pub label: String,
    pub items: Vec<NodeId>,
}

/// Everything the structural pass learned about a document.
#[derive(Debug, Clone, Default)]
pub struct DocumentSurvey {
    pub blocks: BTreeMap<SectionName, Vec<SectionBlock>>,
    pub product_line: Option<String>,
    pub nome_ambiente: Option<String>,
    pub total_items: usize,
    pub unclassified_items: usize,
}

impl DocumentSurvey {
    pub fn available_sections(&self) -> BTreeSet<SectionName> {
        self.blocks.keys().copied().collect()
    }

    /// False when the document has neither section markers nor items.
    pub fn has_material_content(&self) -> bool {
        !self.blocks.is_empty() || self.total_items > 0
    }
}

// --- Helpers ---

pub fn parse_document(text: &str) -> Result<Document<'_>, ExtractError> {
    Document::parse(text).map_err(|e| ExtractError::MalformedInput(e.to_string()))
}

fn tag_is(node: Node, tags: &[&str]) -> bool {
    node.is_element() && tags.iter().any(|t| node.tag_name().name().eq_ignore_ascii_case(t))
}

/// True for item elements, including components nested in another item.
pub(crate) fn is_item(node: Node) -> bool {
    tag_is(node, ITEM_TAGS)
}

pub(crate) fn attribute_ignore_case<'a>(node: Node<'a, '_>, name: &str) -> Option<&'a str> {
    node.attributes()
        .find(|a| a.name().eq_ignore_ascii_case(name))
        .map(|a| a.value())
}

fn label_of<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    LABEL_ATTRIBUTES
        .iter()
        .filter_map(|name| attribute_ignore_case(node, name))
        .map(str::trim)
        .find(|label| !label.is_empty())
}

// --- Validator ---

/// Structural pre-flight over a vendor export. Never reads field values.
pub struct SectionValidator<'c> {
    table: &'c ProductLineTable,
}

impl<'c> SectionValidator<'c> {
    pub fn new(table: &'c ProductLineTable) -> Self {
        Self { table }
    }

    /// Parses `document` and reports which sections can be extracted.
    pub fn validate(&self, document: &str) -> ValidationReport {
        match parse_document(document) {
            Ok(doc) => self.report(&self.survey(&doc)),
            Err(e) => {
                tracing::warn!("Validation failed: {}", e);
                ValidationReport::rejected(e.to_string())
            }
        }
    }

    pub fn report(&self, survey: &DocumentSurvey) -> ValidationReport {
        ValidationReport {
            valid: true,
            available_sections: survey.available_sections(),
            errors: Vec::new(),
            linha_detectada: survey.product_line.clone(),
        }
    }

    /// Single pass in document order: classifies categories, assigns items to
    /// their nearest classified category and detects the product line.
    pub fn survey(&self, doc: &Document) -> DocumentSurvey {
        let mut survey = DocumentSurvey::default();
        let mut scopes: HashMap<NodeId, Scope> = HashMap::new();
        let mut project_name: Option<String> = None;

        // Pre-order: a parent's scope is always recorded before its children.
        for node in doc.descendants().filter(|n| n.is_element()) {
            let inherited = node
                .parent()
                .and_then(|parent| scopes.get(&parent.id()).copied())
                .unwrap_or(Scope::Loose);
            let mut scope = inherited;

            if survey.product_line.is_none() {
                survey.product_line = self.detect_line(node);
            }

            if survey.nome_ambiente.is_none() && tag_is(node, ENVIRONMENT_TAGS) {
                survey.nome_ambiente = label_of(node).map(str::to_string);
            }
            if project_name.is_none() && tag_is(node, PROJECT_TAGS) {
                project_name = label_of(node).map(str::to_string);
            }

            if tag_is(node, CATEGORY_TAGS) {
                if let Some((label, section)) = label_of(node).and_then(|l| classify_label(l).map(|s| (l, s))) {
                    let blocks = survey.blocks.entry(section).or_default();
                    scope = Scope::Block(section, blocks.len());
                    blocks.push(SectionBlock {
                        category: node.id(),
                        label: label.to_string(),
                        items: Vec::new(),
                    });
                    tracing::trace!("Category '{}' classified as {}", label, section);
                }
            } else if is_item(node) {
                match inherited {
                    Scope::Block(section, index) => {
                        survey.total_items += 1;
                        if let Some(block) = survey.blocks.get_mut(&section).and_then(|b| b.get_mut(index)) {
                            block.items.push(node.id());
                        }
                    }
                    Scope::Item => {}
                    Scope::Loose => {
                        survey.total_items += 1;
                        survey.unclassified_items += 1;
                    }
                }
                scope = Scope::Item;
            }

            scopes.insert(node.id(), scope);
        }

        // The project name stands in when no environment element is labelled.
        if survey.nome_ambiente.is_none() {
            survey.nome_ambiente = project_name;
        }

        tracing::debug!(
            "Survey: {} section(s), {} item(s), {} unclassified, line {:?}",
            survey.blocks.len(),
            survey.total_items,
            survey.unclassified_items,
            survey.product_line
        );
        survey
    }

    fn detect_line(&self, node: Node) -> Option<String> {
        node.attributes()
            .filter(|a| self.table.is_signature_attribute(a.name()))
            .find_map(|a| self.table.detect(a.value()))
            .map(|line| line.id.clone())
    }
}

/// What the items below an element belong to.
#[derive(Debug, Clone, Copy)]
enum Scope {
    Block(SectionName, usize),
    /// Inside another item; nested items are components, not records.
    Item,
    Loose,
}
