// src/extractors/model.rs

// --- Imports ---
use crate::extractors::money::{self, MonetaryAnomaly};
use crate::utils::error::ExtractError;
use bigdecimal::BigDecimal;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

// --- Section Vocabulary ---

/// Material categories of a vendor export. Variants are declared in wire-name
/// order so that `Ord` matches sorting by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionName {
    BrilhartColor,
    Caixa,
    Ferragens,
    Paineis,
    PortaPerfil,
    Portas,
}

impl SectionName {
    pub const ALL: [SectionName; 6] = [
        SectionName::BrilhartColor,
        SectionName::Caixa,
        SectionName::Ferragens,
        SectionName::Paineis,
        SectionName::PortaPerfil,
        SectionName::Portas,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SectionName::BrilhartColor => "brilhart_color",
            SectionName::Caixa => "caixa",
            SectionName::Ferragens => "ferragens",
            SectionName::Paineis => "paineis",
            SectionName::PortaPerfil => "porta_perfil",
            SectionName::Portas => "portas",
        }
    }

    /// Fields each record of this section carries.
    pub fn schema(self) -> &'static SectionSchema {
        match self {
            SectionName::Caixa => &CAIXA_SCHEMA,
            SectionName::Portas => &PORTAS_SCHEMA,
            SectionName::Ferragens => &FERRAGENS_SCHEMA,
            SectionName::Paineis => &PAINEIS_SCHEMA,
            SectionName::PortaPerfil => &PORTA_PERFIL_SCHEMA,
            SectionName::BrilhartColor => &BRILHART_COLOR_SCHEMA,
        }
    }

    /// Parses a section filter given either as a JSON array (`["caixa","portas"]`)
    /// or as a comma/whitespace separated list. Names are case-insensitive.
    /// An empty filter is an error; omit the filter to extract every section.
    pub fn parse_filter(input: &str) -> Result<BTreeSet<SectionName>, ExtractError> {
        let trimmed = input.trim();
        let names: Vec<String> = if trimmed.starts_with('[') {
            serde_json::from_str(trimmed)
                .map_err(|e| ExtractError::InvalidSectionFilter(e.to_string()))?
        } else {
            trimmed
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };
        if names.is_empty() {
            return Err(ExtractError::InvalidSectionFilter("no section names given".to_string()));
        }
        names.iter().map(|name| name.parse()).collect()
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionName {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        SectionName::ALL
            .into_iter()
            .find(|section| section.as_str() == wanted)
            .ok_or_else(|| ExtractError::UnknownSection(s.trim().to_string()))
    }
}

// --- Record Fields ---

/// Canonical field names of a [`SectionRecord`], in name order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    Acabamento,
    Altura,
    Comprimento,
    Cor,
    Descricao,
    Espessura,
    Largura,
    Profundidade,
    Quantidade,
    Referencia,
    ValorTotal,
    ValorUnitario,
}

impl FieldKey {
    pub const ALL: [FieldKey; 12] = [
        FieldKey::Acabamento,
        FieldKey::Altura,
        FieldKey::Comprimento,
        FieldKey::Cor,
        FieldKey::Descricao,
        FieldKey::Espessura,
        FieldKey::Largura,
        FieldKey::Profundidade,
        FieldKey::Quantidade,
        FieldKey::Referencia,
        FieldKey::ValorTotal,
        FieldKey::ValorUnitario,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKey::Acabamento => "acabamento",
            FieldKey::Altura => "altura",
            FieldKey::Comprimento => "comprimento",
            FieldKey::Cor => "cor",
            FieldKey::Descricao => "descricao",
            FieldKey::Espessura => "espessura",
            FieldKey::Largura => "largura",
            FieldKey::Profundidade => "profundidade",
            FieldKey::Quantidade => "quantidade",
            FieldKey::Referencia => "referencia",
            FieldKey::ValorTotal => "valor_total",
            FieldKey::ValorUnitario => "valor_unitario",
        }
    }

    pub fn is_monetary(self) -> bool {
        matches!(self, FieldKey::ValorTotal | FieldKey::ValorUnitario)
    }

    /// The field summed into the result's `valor_total`.
    pub fn is_line_total(self) -> bool {
        self == FieldKey::ValorTotal
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct SectionSchema {
    pub required: &'static [FieldKey],
    pub optional: &'static [FieldKey],
}

impl SectionSchema {
    pub fn is_required(&self, key: FieldKey) -> bool {
        self.required.contains(&key)
    }

    pub fn fields(&self) -> impl Iterator<Item = FieldKey> + '_ {
        self.required.iter().chain(self.optional).copied()
    }
}

const REQUIRED_FIELDS: &[FieldKey] = &[FieldKey::Descricao, FieldKey::Quantidade, FieldKey::ValorTotal];

static CAIXA_SCHEMA: SectionSchema = SectionSchema {
    required: REQUIRED_FIELDS,
    optional: &[
        FieldKey::Referencia,
        FieldKey::Largura,
        FieldKey::Altura,
        FieldKey::Profundidade,
        FieldKey::Acabamento,
        FieldKey::ValorUnitario,
    ],
};

static PORTAS_SCHEMA: SectionSchema = SectionSchema {
    required: REQUIRED_FIELDS,
    optional: &[
        FieldKey::Referencia,
        FieldKey::Largura,
        FieldKey::Altura,
        FieldKey::Acabamento,
        FieldKey::ValorUnitario,
    ],
};

static FERRAGENS_SCHEMA: SectionSchema = SectionSchema {
    required: REQUIRED_FIELDS,
    optional: &[FieldKey::Referencia, FieldKey::ValorUnitario],
};

static PAINEIS_SCHEMA: SectionSchema = SectionSchema {
    required: REQUIRED_FIELDS,
    optional: &[
        FieldKey::Referencia,
        FieldKey::Largura,
        FieldKey::Altura,
        FieldKey::Espessura,
        FieldKey::Acabamento,
        FieldKey::ValorUnitario,
    ],
};

static PORTA_PERFIL_SCHEMA: SectionSchema = SectionSchema {
    required: REQUIRED_FIELDS,
    optional: &[
        FieldKey::Referencia,
        FieldKey::Comprimento,
        FieldKey::Largura,
        FieldKey::Altura,
        FieldKey::Acabamento,
        FieldKey::ValorUnitario,
    ],
};

static BRILHART_COLOR_SCHEMA: SectionSchema = SectionSchema {
    required: REQUIRED_FIELDS,
    optional: &[
        FieldKey::Referencia,
        FieldKey::Largura,
        FieldKey::Altura,
        FieldKey::Espessura,
        FieldKey::Cor,
        FieldKey::ValorUnitario,
    ],
};

// --- Values ---

/// Exact monetary amount; serialized in canonical `1234.56` form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Money(pub BigDecimal);

impl Money {
    pub fn amount(&self) -> &BigDecimal {
        &self.0
    }

    pub fn canonical(&self) -> String {
        money::canonical(&self.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&money::format_brl(&self.0))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.canonical())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Money(Money),
}

impl FieldValue {
    /// Text verbatim, money in canonical form.
    pub fn canonical(&self) -> String {
        match self {
            FieldValue::Text(text) => text.clone(),
            FieldValue::Money(amount) => amount.canonical(),
        }
    }
}

/// One item of one section.
///
/// Serializes flat: `posicao`, each field by name, and for every money field a
/// `<field>_formatado` display twin (`"R$ 1.234,56"`).
#[derive(Debug, Clone, PartialEq)]
pub struct SectionRecord {
    pub posicao: usize,
    pub fields: BTreeMap<FieldKey, FieldValue>,
}

impl Serialize for SectionRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let twins = self.fields.values().filter(|v| matches!(v, FieldValue::Money(_))).count();
        let mut map = serializer.serialize_map(Some(1 + self.fields.len() + twins))?;
        map.serialize_entry("posicao", &self.posicao)?;
        for (key, value) in &self.fields {
            map.serialize_entry(key.as_str(), value)?;
            if let FieldValue::Money(amount) = value {
                map.serialize_entry(&format!("{}_formatado", key), &amount.to_string())?;
            }
        }
        map.end()
    }
}

impl SectionRecord {
    pub fn text(&self, key: FieldKey) -> Option<&str> {
        match self.fields.get(&key)? {
            FieldValue::Text(text) => Some(text),
            FieldValue::Money(_) => None,
        }
    }

    pub fn money(&self, key: FieldKey) -> Option<&BigDecimal> {
        match self.fields.get(&key)? {
            FieldValue::Money(amount) => Some(amount.amount()),
            FieldValue::Text(_) => None,
        }
    }

    pub fn line_total(&self) -> Option<&BigDecimal> {
        self.money(FieldKey::ValorTotal)
    }
}

// --- Results ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MaterialFingerprint(pub String);

impl MaterialFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MaterialFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Non-fatal findings attached to an [`ExtractionResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionWarning {
    UnknownProductLine,
    SectionExtraction {
        section: SectionName,
        message: String,
    },
    MonetaryAnomaly {
        section: SectionName,
        posicao: usize,
        field: FieldKey,
        raw: String,
        anomaly: MonetaryAnomaly,
    },
    UnclassifiedItems {
        count: usize,
    },
    NoExtractableContent {
        requested: Vec<SectionName>,
    },
}

impl fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionWarning::UnknownProductLine => {
                write!(f, "product line not recognised, generic field mapping used")
            }
            ExtractionWarning::SectionExtraction { section, message } => {
                write!(f, "{}: {}", section, message)
            }
            ExtractionWarning::MonetaryAnomaly { section, posicao, field, raw, anomaly } => write!(
                f,
                "{} item {}: {} '{}' zeroed ({})",
                section, posicao, field, raw, anomaly
            ),
            ExtractionWarning::UnclassifiedItems { count } => {
                write!(f, "{} item(s) outside any known section were ignored", count)
            }
            ExtractionWarning::NoExtractableContent { requested } => {
                let names: Vec<&str> = requested.iter().map(|s| s.as_str()).collect();
                write!(f, "no records extracted for [{}]", names.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub linha_detectada: Option<String>,
    pub nome_ambiente: Option<String>,
    pub sections: BTreeMap<SectionName, Vec<SectionRecord>>,
    pub valor_total: Money,
    pub valor_total_formatado: String,
    pub fingerprint: Option<MaterialFingerprint>,
    pub low_confidence: bool,
    pub warnings: Vec<ExtractionWarning>,
}

impl ExtractionResult {
    pub fn records(&self, section: SectionName) -> &[SectionRecord] {
        self.sections.get(&section).map_or(&[], Vec::as_slice)
    }

    pub fn record_count(&self, section: SectionName) -> usize {
        self.records(section).len()
    }

    pub fn total_records(&self) -> usize {
        self.sections.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_records() == 0
    }
}

/// Outcome of the structural pre-flight pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub available_sections: BTreeSet<SectionName>,
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linha_detectada: Option<String>,
}

impl ValidationReport {
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            available_sections: BTreeSet::new(),
            errors: vec![error.into()],
            linha_detectada: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_names_parse_case_insensitively() {
        assert_eq!("CAIXA".parse::<SectionName>().unwrap(), SectionName::Caixa);
        assert_eq!(" Porta-Perfil ".parse::<SectionName>().unwrap(), SectionName::PortaPerfil);
        assert!(matches!(
            "gavetas".parse::<SectionName>(),
            Err(ExtractError::UnknownSection(name)) if name == "gavetas"
        ));
    }

    #[test]
    fn section_filter_accepts_list_and_json() {
        let from_list = SectionName::parse_filter("caixa, Portas").unwrap();
        let from_json = SectionName::parse_filter(r#"["PORTAS", "caixa"]"#).unwrap();
        assert_eq!(from_list, from_json);
        assert_eq!(from_list.len(), 2);
        assert!(SectionName::parse_filter("[caixa").is_err());
    }

    #[test]
    fn empty_section_filter_is_rejected() {
        for input in ["", "  ", "[]", " , ", "[ ]"] {
            assert!(
                matches!(SectionName::parse_filter(input), Err(ExtractError::InvalidSectionFilter(_))),
                "{:?}",
                input
            );
        }
    }

    #[test]
    fn ordering_matches_wire_names() {
        let mut names: Vec<&str> = SectionName::ALL.iter().map(|s| s.as_str()).collect();
        let declared = names.clone();
        names.sort();
        assert_eq!(names, declared);

        let mut fields: Vec<&str> = FieldKey::ALL.iter().map(|k| k.as_str()).collect();
        let declared = fields.clone();
        fields.sort();
        assert_eq!(fields, declared);
    }

    #[test]
    fn every_schema_requires_a_line_total() {
        for section in SectionName::ALL {
            assert!(section.schema().is_required(FieldKey::ValorTotal), "{}", section);
        }
    }

    #[test]
    fn records_serialize_flat() {
        let mut fields = BTreeMap::new();
        fields.insert(FieldKey::Descricao, FieldValue::Text("Balcão".into()));
        fields.insert(FieldKey::ValorTotal, FieldValue::Money(Money(BigDecimal::from(1500))));
        let record = SectionRecord { posicao: 0, fields };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["posicao"], 0);
        assert_eq!(json["descricao"], "Balcão");
        assert_eq!(json["valor_total"], "1500.00");
        assert_eq!(json["valor_total_formatado"], "R$ 1.500,00");
        assert!(json.get("descricao_formatado").is_none());
        assert_eq!(json.as_object().unwrap().len(), 4);
    }
}
